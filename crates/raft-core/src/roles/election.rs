//! # election
//!
//! why: move a follower into a new term and ask for votes
//! relations: called by follower.rs on election timeout, uses followers.rs
//! what: start

use tracing::{info, warn};

use crate::message::{RaftMessage, VoteRequest, VoteResponse};
use crate::outcome::Outcome;
use crate::roles::followers::is_sole_voter;
use crate::state::ReadableRaftState;
use crate::types::Member;

/// Moves to the next term and asks every other voting member for its vote.
/// Returns false, leaving the outcome untouched, when the local member is
/// not a voting member.
pub fn start<M, S>(state: &S, outcome: &mut Outcome<M>) -> bool
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    let myself = state.myself();
    if !state.voting_members().contains(myself) {
        warn!(member = ?myself, "not starting election, not a voting member");
        return false;
    }

    outcome.set_next_term(state.term() + 1);
    outcome.clear_votes_for_me();

    let log = state.entry_log();
    let request = VoteRequest {
        from: myself.clone(),
        term: outcome.term(),
        candidate: myself.clone(),
        last_log_index: log.append_index(),
        last_log_term: log.read_entry_term(log.append_index()),
    };
    for member in state.voting_members().iter().filter(|member| *member != myself) {
        outcome.add_outgoing_message(member.clone(), RaftMessage::VoteRequest(request.clone()));
    }
    outcome.set_voted_for(Some(myself.clone()));

    if is_sole_voter(state.voting_members(), myself) {
        let own_vote = VoteResponse {
            from: myself.clone(),
            term: outcome.term(),
            vote_granted: true,
        };
        outcome.add_outgoing_message(myself.clone(), RaftMessage::VoteResponse(own_vote));
    }

    info!(member = ?myself, term = outcome.term(), "election started");
    true
}
