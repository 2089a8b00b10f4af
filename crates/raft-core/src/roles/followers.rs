//! # followers
//!
//! why: majority decisions for elections and commits
//! relations: used by candidate.rs, leader.rs and election.rs
//! what: is_quorum, is_sole_voter, quorum_append_index

use std::collections::BTreeSet;

use crate::state::FollowerStates;
use crate::types::{LogIndex, Member};

/// Strict majority of `cluster_size`, counting the local member on top of
/// `count_not_including_self`.
pub fn is_quorum(cluster_size: usize, count_not_including_self: usize) -> bool {
    (count_not_including_self + 1) * 2 > cluster_size
}

/// True when `myself` is the only voting member.
pub fn is_sole_voter<M: Member>(voting_members: &BTreeSet<M>, myself: &M) -> bool {
    voting_members.len() == 1 && voting_members.contains(myself)
}

/// Highest index that a quorum of the voting members has appended. The
/// local member is assumed to hold everything; untracked followers count
/// as `-1`.
pub fn quorum_append_index<M: Member>(
    voting_members: &BTreeSet<M>,
    myself: &M,
    follower_states: &FollowerStates<M>,
) -> LogIndex {
    let mut match_indices: Vec<LogIndex> = voting_members
        .iter()
        .filter(|member| *member != myself)
        .map(|member| follower_states.get(member).match_index)
        .collect();
    match_indices.sort_unstable_by(|a, b| b.cmp(a));

    match_indices
        .iter()
        .enumerate()
        .find(|(position, _)| is_quorum(voting_members.len(), position + 1))
        .map_or(-1, |(_, index)| *index)
}
