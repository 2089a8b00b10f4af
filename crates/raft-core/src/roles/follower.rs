//! # follower
//!
//! why: accept the leader's log, grant votes and campaign on timeout
//! relations: dispatched from Role::handle, uses appending.rs, heart.rs,
//! voting.rs and election.rs
//! what: follower handle, compaction info handling

use tracing::info;

use crate::error::Result;
use crate::message::{LogCompactionInfo, RaftMessage};
use crate::node::Role;
use crate::outcome::Outcome;
use crate::roles::{appending, election, handle_prune_request, heart, voting};
use crate::state::ReadableRaftState;
use crate::types::Member;

pub fn handle<M, S>(message: &RaftMessage<M>, state: &S) -> Result<Outcome<M>>
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let mut outcome = Outcome::new(Role::Follower, state);

    match message {
        RaftMessage::Heartbeat(heartbeat) => heart::beat(state, &mut outcome, heartbeat),
        RaftMessage::AppendEntriesRequest(request) => {
            appending::handle_append_entries_request(state, &mut outcome, request)?
        }
        RaftMessage::VoteRequest(request) => voting::handle_vote_request(state, &mut outcome, request),
        RaftMessage::ElectionTimeout => {
            if election::start(state, &mut outcome) {
                outcome.set_next_role(Role::Candidate);
                info!(member = ?state.myself(), term = outcome.term(), "moving to CANDIDATE state after election timeout");
            }
        }
        RaftMessage::LogCompactionInfo(info) => handle_leader_log_compaction(state, &mut outcome, info),
        RaftMessage::PruneRequest { prune_index } => handle_prune_request(&mut outcome, *prune_index),
        RaftMessage::VoteResponse(_)
        | RaftMessage::AppendEntriesResponse(_)
        | RaftMessage::HeartbeatResponse { .. }
        | RaftMessage::HeartbeatTimeout
        | RaftMessage::NewEntryRequest { .. }
        | RaftMessage::NewBatchRequest { .. } => {}
    }

    Ok(outcome)
}

/// The leader no longer has the entries we need; only a snapshot helps.
fn handle_leader_log_compaction<M, S>(state: &S, outcome: &mut Outcome<M>, info: &LogCompactionInfo<M>)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if info.leader_term < state.term() {
        return;
    }
    let append_index = state.entry_log().append_index();
    if append_index <= -1 || info.prev_index > append_index {
        outcome.mark_need_for_fresh_snapshot();
    }
}
