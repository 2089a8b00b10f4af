//! # voting
//!
//! why: grant at most one vote per term, only to up-to-date candidates
//! relations: used by follower.rs and leader.rs
//! what: handle_vote_request, should_vote_for

use crate::message::{RaftMessage, VoteRequest, VoteResponse};
use crate::outcome::Outcome;
use crate::state::ReadableRaftState;
use crate::types::{LogIndex, Member, Term};

/// Answers a vote request, adopting a greater term first.
pub fn handle_vote_request<M, S>(state: &S, outcome: &mut Outcome<M>, request: &VoteRequest<M>)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if request.term > state.term() {
        outcome.set_next_term(request.term);
        outcome.set_voted_for(None);
    }

    let log = state.entry_log();
    let context_last_appended = log.append_index();
    let will_vote = should_vote_for(
        &request.candidate,
        outcome.term(),
        request.term,
        log.read_entry_term(context_last_appended),
        request.last_log_term,
        context_last_appended,
        request.last_log_index,
        outcome.voted_for(),
    );

    if will_vote {
        outcome.set_voted_for(Some(request.candidate.clone()));
        outcome.renew_election_timeout();
    }

    let response = VoteResponse {
        from: state.myself().clone(),
        term: outcome.term(),
        vote_granted: will_vote,
    };
    outcome.add_outgoing_message(request.from.clone(), RaftMessage::VoteResponse(response));
}

/// Whether a candidate deserves this member's vote: its term is current,
/// its log is at least as up to date, and no other candidate already got
/// the vote in that term.
#[allow(clippy::too_many_arguments)]
pub fn should_vote_for<M: Member>(
    candidate: &M,
    context_term: Term,
    request_term: Term,
    context_last_log_term: Term,
    request_last_log_term: Term,
    context_last_appended: LogIndex,
    request_last_log_index: LogIndex,
    voted_for: Option<&M>,
) -> bool {
    if request_term < context_term {
        return false;
    }

    let request_log_ends_at_higher_term = request_last_log_term > context_last_log_term;
    let logs_end_at_same_term = request_last_log_term == context_last_log_term;
    let request_log_at_least_as_long = request_last_log_index >= context_last_appended;
    let requester_log_up_to_date =
        request_log_ends_at_higher_term || (logs_end_at_same_term && request_log_at_least_as_long);

    let voted_for_other_in_same_term =
        request_term == context_term && voted_for.is_some_and(|voted| voted != candidate);

    requester_log_up_to_date && !voted_for_other_in_same_term
}
