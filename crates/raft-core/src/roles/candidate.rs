//! # candidate
//!
//! why: collect votes and win, or give way to a leader or later term
//! relations: dispatched from Role::handle, uses followers.rs and
//! appending.rs for the leader barrier
//! what: candidate handle

use tracing::info;

use crate::error::Result;
use crate::log::ReplicatedContent;
use crate::message::{AppendEntriesResponse, RaftMessage, VoteResponse};
use crate::node::Role;
use crate::outcome::Outcome;
use crate::roles::followers::is_quorum;
use crate::roles::{appending, handle_prune_request, leader};
use crate::state::{FollowerStates, ReadableRaftState};
use crate::types::Member;

pub fn handle<M, S>(message: &RaftMessage<M>, state: &S) -> Result<Outcome<M>>
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let mut outcome = Outcome::new(Role::Candidate, state);
    let myself = state.myself();

    match message {
        RaftMessage::Heartbeat(heartbeat) => {
            if heartbeat.leader_term >= state.term() {
                outcome.set_next_term(heartbeat.leader_term);
                outcome.set_next_role(Role::Follower);
                outcome.add_outgoing_message(myself.clone(), message.clone());
                info!(member = ?myself, from = ?heartbeat.from, term = heartbeat.leader_term, "moving to FOLLOWER state after receiving heartbeat");
            }
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
            } else {
                outcome.set_next_term(request.leader_term);
                outcome.set_next_role(Role::Follower);
                outcome.add_outgoing_message(myself.clone(), message.clone());
                info!(member = ?myself, from = ?request.from, term = request.leader_term, "moving to FOLLOWER state after receiving append request");
            }
        }
        RaftMessage::VoteResponse(response) => {
            if response.term > state.term() {
                outcome.set_next_term(response.term);
                outcome.set_next_role(Role::Follower);
                info!(member = ?myself, term = response.term, "moving to FOLLOWER state after vote response from later term");
            } else if response.term < state.term() || !response.vote_granted {
                // stale or refused
            } else {
                if response.from != *myself {
                    outcome.add_vote_for_me(response.from.clone());
                }
                let votes = outcome
                    .votes_for_me()
                    .iter()
                    .filter(|voter| state.voting_members().contains(*voter))
                    .count();
                if is_quorum(state.voting_members().len(), votes) {
                    become_leader(state, &mut outcome);
                }
            }
        }
        RaftMessage::VoteRequest(request) => {
            if request.term > state.term() {
                outcome.clear_votes_for_me();
                outcome.set_next_term(request.term);
                outcome.set_next_role(Role::Follower);
                outcome.add_outgoing_message(myself.clone(), message.clone());
                info!(member = ?myself, term = request.term, "moving to FOLLOWER state after vote request from later term");
            } else {
                let response = VoteResponse {
                    from: myself.clone(),
                    term: outcome.term(),
                    vote_granted: false,
                };
                outcome.add_outgoing_message(request.from.clone(), RaftMessage::VoteResponse(response));
            }
        }
        RaftMessage::ElectionTimeout => {
            // the follower's next election timeout starts a fresh campaign
            outcome.set_next_role(Role::Follower);
            info!(member = ?myself, term = state.term(), "moving to FOLLOWER state after failing to win election");
        }
        RaftMessage::PruneRequest { prune_index } => handle_prune_request(&mut outcome, *prune_index),
        RaftMessage::AppendEntriesResponse(_)
        | RaftMessage::HeartbeatResponse { .. }
        | RaftMessage::LogCompactionInfo(_)
        | RaftMessage::HeartbeatTimeout
        | RaftMessage::NewEntryRequest { .. }
        | RaftMessage::NewBatchRequest { .. } => {}
    }

    Ok(outcome)
}

fn become_leader<M, S>(state: &S, outcome: &mut Outcome<M>)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let myself = state.myself();
    outcome.set_leader(Some(myself.clone()));
    outcome.replace_follower_states(FollowerStates::new());
    outcome.clear_heartbeat_responses();
    outcome.set_last_log_index_before_we_became_leader(state.entry_log().append_index());

    let barrier_index = appending::append_new_entry(state, outcome, ReplicatedContent::NewLeaderBarrier);
    leader::commit_if_sole_voter(state, outcome, barrier_index);

    outcome.set_next_role(Role::Leader);
    info!(member = ?myself, term = outcome.term(), votes = ?outcome.votes_for_me(), "moving to LEADER state");
}
