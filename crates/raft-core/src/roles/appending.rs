//! # appending
//!
//! why: keep follower logs consistent with the leader and give leader
//! appends the right previous term
//! relations: used by the role handlers, heart.rs reuses the history
//! check and commit rule
//! what: log_history_matches, handle_append_entries_request,
//! append_new_entry, append_new_entries

use tracing::warn;

use crate::commands::{LogCommand, ShipCommand};
use crate::error::{RaftError, Result};
use crate::log::{LogEntry, ReplicatedContent};
use crate::message::{AppendEntriesRequest, AppendEntriesResponse, RaftMessage};
use crate::outcome::Outcome;
use crate::state::ReadableRaftState;
use crate::types::{LogIndex, Member, Term};

/// Whether the local log agrees with the leader's history ending at
/// `prev_index`/`prev_term`. Empty history always matches, and so does
/// anything at or before our own compaction point.
pub fn log_history_matches<M, S>(state: &S, prev_index: LogIndex, prev_term: Term) -> bool
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let log = state.entry_log();
    prev_index == -1 || prev_index <= log.prev_index() || log.read_entry_term(prev_index) == prev_term
}

/// Emits a commit command when `min(leader_commit, index_of_last_new_entry)`
/// moves past the local commit index.
pub fn commit_to_log_on_update<M, S>(
    state: &S,
    index_of_last_new_entry: LogIndex,
    leader_commit: LogIndex,
    outcome: &mut Outcome<M>,
) where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let new_commit_index = leader_commit.min(index_of_last_new_entry);
    if new_commit_index > state.commit_index() {
        outcome.add_log_command(LogCommand::CommitCommand {
            commit_index: new_commit_index,
        });
    }
}

pub fn handle_append_entries_request<M, S>(
    state: &S,
    outcome: &mut Outcome<M>,
    request: &AppendEntriesRequest<M>,
) -> Result<()>
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let log = state.entry_log();
    let myself = state.myself().clone();

    if request.leader_term < state.term() {
        let response = AppendEntriesResponse {
            from: myself,
            term: state.term(),
            success: false,
            match_index: -1,
            append_index: log.append_index(),
        };
        outcome.add_outgoing_message(request.from.clone(), RaftMessage::AppendEntriesResponse(response));
        return Ok(());
    }

    outcome.renew_election_timeout();
    outcome.set_next_term(request.leader_term);
    outcome.set_leader(Some(request.from.clone()));
    outcome.set_leader_commit(request.leader_commit);

    if !log_history_matches(state, request.prev_log_index, request.prev_log_term) {
        let response = AppendEntriesResponse {
            from: myself,
            term: request.leader_term,
            success: false,
            match_index: -1,
            append_index: log.append_index(),
        };
        outcome.add_outgoing_message(request.from.clone(), RaftMessage::AppendEntriesResponse(response));
        return Ok(());
    }

    let base_index = request.prev_log_index + 1;
    let mut offset = 0;
    while offset < request.entries.len() {
        let log_index = base_index + offset as LogIndex;
        if log_index > log.append_index() {
            // past our log end, the rest is plain append
            break;
        }
        if log_index < log.prev_index() {
            // already compacted away
            offset += 1;
            continue;
        }

        let log_term = log.read_entry_term(log_index);
        if log_term != request.entries[offset].term {
            if log_index <= state.commit_index() {
                warn!(index = log_index, term = log_term, commit_index = state.commit_index(), "conflicting entry below commit index");
                return Err(RaftError::TruncateBelowCommit {
                    index: log_index,
                    term: log_term,
                    commit_index: state.commit_index(),
                });
            }
            outcome.add_log_command(LogCommand::TruncateLogCommand { from_index: log_index });
            break;
        }
        offset += 1;
    }

    if offset < request.entries.len() {
        outcome.add_log_command(LogCommand::BatchAppendLogEntries {
            base_index,
            offset,
            entries: request.entries.clone(),
        });
    }

    let end_match_index = request.prev_log_index + request.entries.len() as LogIndex;
    commit_to_log_on_update(state, end_match_index, request.leader_commit, outcome);

    let response = AppendEntriesResponse {
        from: myself,
        term: request.leader_term,
        success: true,
        match_index: end_match_index,
        append_index: end_match_index,
    };
    outcome.add_outgoing_message(request.from.clone(), RaftMessage::AppendEntriesResponse(response));
    Ok(())
}

/// Term of the entry preceding a new leader append. Entries appended since
/// this member became leader are known to carry the current term.
fn prev_log_term_for_append<M, S>(state: &S, outcome: &Outcome<M>, prev_log_index: LogIndex) -> Term
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if prev_log_index == -1 {
        -1
    } else if prev_log_index > outcome.last_log_index_before_we_became_leader() {
        outcome.term()
    } else {
        state.entry_log().read_entry_term(prev_log_index)
    }
}

/// Appends one entry at the current term. Returns its index.
pub fn append_new_entry<M, S>(state: &S, outcome: &mut Outcome<M>, content: ReplicatedContent) -> LogIndex
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let prev_log_index = state.entry_log().append_index();
    let prev_log_term = prev_log_term_for_append(state, outcome, prev_log_index);
    let entry = LogEntry::new(outcome.term(), content);

    outcome.add_ship_command(ShipCommand::NewEntries {
        prev_log_index,
        prev_log_term,
        entries: vec![entry.clone()],
    });
    outcome.add_log_command(LogCommand::AppendLogEntry {
        index: prev_log_index + 1,
        entry,
    });
    prev_log_index + 1
}

/// Appends a batch at the current term. Returns the index of the last entry.
pub fn append_new_entries<M, S>(
    state: &S,
    outcome: &mut Outcome<M>,
    contents: &[ReplicatedContent],
) -> LogIndex
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let prev_log_index = state.entry_log().append_index();
    if contents.is_empty() {
        return prev_log_index;
    }
    let prev_log_term = prev_log_term_for_append(state, outcome, prev_log_index);
    let entries: Vec<LogEntry> = contents
        .iter()
        .map(|content| LogEntry::new(outcome.term(), content.clone()))
        .collect();
    let last_index = prev_log_index + entries.len() as LogIndex;

    outcome.add_ship_command(ShipCommand::NewEntries {
        prev_log_index,
        prev_log_term,
        entries: entries.clone(),
    });
    outcome.add_log_command(LogCommand::BatchAppendLogEntries {
        base_index: prev_log_index + 1,
        offset: 0,
        entries,
    });
    last_index
}
