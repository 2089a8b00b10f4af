//! # leader
//!
//! why: replicate entries, advance commit and notice when to step down
//! relations: dispatched from Role::handle, uses appending.rs, heart.rs,
//! voting.rs and followers.rs
//! what: leader handle, heartbeats, append response handling

use tracing::{error, info};

use crate::commands::{LogCommand, ShipCommand};
use crate::error::{RaftError, Result};
use crate::message::{
    AppendEntriesResponse, Heartbeat, LogCompactionInfo, RaftMessage, VoteResponse,
};
use crate::node::Role;
use crate::outcome::Outcome;
use crate::roles::followers::{is_quorum, is_sole_voter, quorum_append_index};
use crate::roles::{appending, handle_prune_request, heart, voting};
use crate::state::{FollowerStates, ReadableRaftState};
use crate::types::{LogIndex, Member};

pub fn handle<M, S>(message: &RaftMessage<M>, state: &S) -> Result<Outcome<M>>
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let mut outcome = Outcome::new(Role::Leader, state);
    let myself = state.myself();

    match message {
        RaftMessage::Heartbeat(heartbeat) => {
            if heartbeat.from != *myself && heartbeat.leader_term >= state.term() {
                outcome.step_down();
                info!(member = ?myself, from = ?heartbeat.from, term = heartbeat.leader_term, "moving to FOLLOWER state after receiving heartbeat");
                heart::beat(state, &mut outcome, heartbeat);
            }
        }
        RaftMessage::HeartbeatTimeout => send_heartbeats(state, &mut outcome),
        RaftMessage::HeartbeatResponse { from } => outcome.add_heartbeat_response(from.clone()),
        RaftMessage::ElectionTimeout => {
            let responders = outcome
                .heartbeat_responses()
                .iter()
                .filter(|member| *member != myself && state.voting_members().contains(*member))
                .count();
            if !is_quorum(state.voting_members().len(), responders) {
                outcome.step_down();
                info!(member = ?myself, heartbeats = ?outcome.heartbeat_responses(), "moving to FOLLOWER state after missing heartbeat responses");
            }
            outcome.clear_heartbeat_responses();
        }
        RaftMessage::AppendEntriesRequest(request) => {
            if request.leader_term < state.term() {
                let response = AppendEntriesResponse {
                    from: myself.clone(),
                    term: state.term(),
                    success: false,
                    match_index: -1,
                    append_index: state.entry_log().append_index(),
                };
                outcome.add_outgoing_message(request.from.clone(), RaftMessage::AppendEntriesResponse(response));
            } else if request.leader_term == state.term() {
                error!(member = ?myself, other = ?request.from, term = state.term(), "two leaders in the same term");
                return Err(RaftError::TwoLeadersInSameTerm { term: state.term() });
            } else {
                outcome.step_down();
                info!(member = ?myself, from = ?request.from, term = request.leader_term, "moving to FOLLOWER state after append request from later term");
                appending::handle_append_entries_request(state, &mut outcome, request)?;
            }
        }
        RaftMessage::AppendEntriesResponse(response) => {
            handle_append_entries_response(state, &mut outcome, response)
        }
        RaftMessage::VoteRequest(request) => {
            if request.term > state.term() {
                outcome.step_down();
                info!(member = ?myself, term = request.term, "moving to FOLLOWER state after vote request from later term");
                voting::handle_vote_request(state, &mut outcome, request);
            } else {
                let response = VoteResponse {
                    from: myself.clone(),
                    term: state.term(),
                    vote_granted: false,
                };
                outcome.add_outgoing_message(request.from.clone(), RaftMessage::VoteResponse(response));
            }
        }
        RaftMessage::NewEntryRequest { content } => {
            let appended = appending::append_new_entry(state, &mut outcome, content.clone());
            commit_if_sole_voter(state, &mut outcome, appended);
        }
        RaftMessage::NewBatchRequest { contents } => {
            let appended = appending::append_new_entries(state, &mut outcome, contents);
            commit_if_sole_voter(state, &mut outcome, appended);
        }
        RaftMessage::PruneRequest { prune_index } => handle_prune_request(&mut outcome, *prune_index),
        RaftMessage::VoteResponse(_) | RaftMessage::LogCompactionInfo(_) => {}
    }

    Ok(outcome)
}

fn send_heartbeats<M, S>(state: &S, outcome: &mut Outcome<M>)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let myself = state.myself();
    let commit_index = state.commit_index();
    let heartbeat = Heartbeat {
        from: myself.clone(),
        leader_term: state.term(),
        commit_index,
        commit_index_term: state.entry_log().read_entry_term(commit_index),
    };
    for member in state.replication_members().iter().filter(|member| *member != myself) {
        outcome.add_outgoing_message(member.clone(), RaftMessage::Heartbeat(heartbeat.clone()));
    }
}

fn handle_append_entries_response<M, S>(
    state: &S,
    outcome: &mut Outcome<M>,
    response: &AppendEntriesResponse<M>,
) where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if response.term < state.term() {
        return;
    }
    if response.term > state.term() {
        outcome.set_next_term(response.term);
        outcome.step_down();
        outcome.replace_follower_states(FollowerStates::new());
        info!(member = ?state.myself(), from = ?response.from, term = response.term, "moving to FOLLOWER state after append response from later term");
        return;
    }

    let log = state.entry_log();
    if response.success {
        let follower = state.follower_states().get(&response.from);
        let follower_progressed = response.match_index > follower.match_index;

        outcome
            .follower_states_mut()
            .on_success_response(&response.from, response.match_index);
        outcome.add_ship_command(ShipCommand::Match {
            match_index: response.match_index,
            target: response.from.clone(),
        });

        // only entries of our own term may be committed by counting replicas
        let match_in_current_term = log.read_entry_term(response.match_index) == state.term();
        if follower_progressed && match_in_current_term {
            let quorum_index = quorum_append_index(state.voting_members(), state.myself(), outcome.follower_states());
            if quorum_index > state.commit_index() && log.read_entry_term(quorum_index) == state.term() {
                commit(outcome, quorum_index);
            }
        }
    } else if response.append_index > -1 && response.append_index >= log.prev_index() {
        outcome.add_ship_command(ShipCommand::Mismatch {
            append_index: response.append_index,
            target: response.from.clone(),
        });
    } else {
        let info = LogCompactionInfo {
            from: state.myself().clone(),
            leader_term: state.term(),
            prev_index: log.prev_index(),
        };
        outcome.add_outgoing_message(response.from.clone(), RaftMessage::LogCompactionInfo(info));
    }
}

fn commit<M: Member>(outcome: &mut Outcome<M>, commit_index: LogIndex) {
    outcome.set_leader_commit(commit_index);
    outcome.add_log_command(LogCommand::CommitCommand { commit_index });
    outcome.add_ship_command(ShipCommand::CommitUpdate);
}

/// A leader without other voters commits whatever it appends.
pub(crate) fn commit_if_sole_voter<M, S>(state: &S, outcome: &mut Outcome<M>, appended_index: LogIndex)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if is_sole_voter(state.voting_members(), state.myself()) && appended_index > state.commit_index() {
        commit(outcome, appended_index);
    }
}
