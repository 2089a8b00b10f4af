//! # heart
//!
//! why: follow a live leader's term and commit index between appends
//! relations: used by follower.rs and leader.rs, reuses appending.rs
//! what: beat

use crate::message::{Heartbeat, RaftMessage};
use crate::outcome::Outcome;
use crate::roles::appending::{commit_to_log_on_update, log_history_matches};
use crate::state::ReadableRaftState;
use crate::types::Member;

/// Accepts a heartbeat from a current leader and follows its commit index
/// when our history agrees at that point.
pub fn beat<M, S>(state: &S, outcome: &mut Outcome<M>, heartbeat: &Heartbeat<M>)
where
    M: Member,
    S: ReadableRaftState<M> + ?Sized,
{
    if heartbeat.leader_term < state.term() {
        return;
    }

    outcome.renew_election_timeout();
    outcome.set_next_term(heartbeat.leader_term);
    outcome.set_leader(Some(heartbeat.from.clone()));
    outcome.set_leader_commit(heartbeat.commit_index);
    outcome.add_outgoing_message(
        heartbeat.from.clone(),
        RaftMessage::HeartbeatResponse {
            from: state.myself().clone(),
        },
    );

    if !log_history_matches(state, heartbeat.commit_index, heartbeat.commit_index_term) {
        return;
    }
    commit_to_log_on_update(state, heartbeat.commit_index, heartbeat.commit_index, outcome);
}
