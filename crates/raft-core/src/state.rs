//! # state
//!
//! why: hold everything a member remembers between events and apply each
//! outcome to it
//! relations: read by roles through ReadableRaftState, mutated only by
//! RaftState::update (called from node.rs)
//! what: FollowerState, FollowerStates, ReadableRaftState, RaftState

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{RaftError, Result};
use crate::log::{RaftLog, ReadableRaftLog};
use crate::outcome::Outcome;
use crate::types::{LogIndex, Member, Term};

/// What the leader knows about one follower's log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowerState {
    pub match_index: LogIndex,
}

impl Default for FollowerState {
    fn default() -> Self {
        Self { match_index: -1 }
    }
}

/// Leader's view of every follower. Untracked members report the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerStates<M: Member> {
    states: BTreeMap<M, FollowerState>,
}

impl<M: Member> Default for FollowerStates<M> {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }
}

impl<M: Member> FollowerStates<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, member: &M) -> FollowerState {
        self.states.get(member).copied().unwrap_or_default()
    }

    /// Records a successful append. The match index only ever grows.
    pub fn on_success_response(&mut self, member: &M, match_index: LogIndex) {
        let state = self.states.entry(member.clone()).or_default();
        state.match_index = state.match_index.max(match_index);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&M, &FollowerState)> {
        self.states.iter()
    }
}

/// Snapshot view role handlers decide from
pub trait ReadableRaftState<M: Member> {
    fn myself(&self) -> &M;
    fn voting_members(&self) -> &BTreeSet<M>;
    fn replication_members(&self) -> &BTreeSet<M>;
    fn term(&self) -> Term;
    fn leader(&self) -> Option<&M>;
    fn leader_commit(&self) -> LogIndex;
    fn voted_for(&self) -> Option<&M>;
    fn votes_for_me(&self) -> &BTreeSet<M>;
    fn heartbeat_responses(&self) -> &BTreeSet<M>;
    fn last_log_index_before_we_became_leader(&self) -> LogIndex;
    fn follower_states(&self) -> &FollowerStates<M>;
    fn entry_log(&self) -> &dyn ReadableRaftLog;

    fn commit_index(&self) -> LogIndex {
        self.entry_log().commit_index()
    }
}

/// Per-member consensus state, owned by the driver
#[derive(Debug)]
pub struct RaftState<M: Member, L: RaftLog> {
    myself: M,
    term: Term,
    voted_for: Option<M>,
    leader: Option<M>,
    leader_commit: LogIndex,
    votes_for_me: BTreeSet<M>,
    heartbeat_responses: BTreeSet<M>,
    last_log_index_before_we_became_leader: LogIndex,
    follower_states: FollowerStates<M>,
    voting_members: BTreeSet<M>,
    replication_members: BTreeSet<M>,
    entry_log: L,
}

impl<M: Member, L: RaftLog> RaftState<M, L> {
    /// Fresh state at term 0 with an empty membership
    pub fn new(myself: M, entry_log: L) -> Self {
        Self {
            myself,
            term: 0,
            voted_for: None,
            leader: None,
            leader_commit: -1,
            votes_for_me: BTreeSet::new(),
            heartbeat_responses: BTreeSet::new(),
            last_log_index_before_we_became_leader: -1,
            follower_states: FollowerStates::new(),
            voting_members: BTreeSet::new(),
            replication_members: BTreeSet::new(),
            entry_log,
        }
    }

    /// Restores durable term and vote after a restart
    pub fn with_term_and_vote(mut self, term: Term, voted_for: Option<M>) -> Self {
        self.term = term;
        self.voted_for = voted_for;
        self
    }

    /// Voting members are always replicated to as well
    pub fn set_members(
        &mut self,
        voting: impl IntoIterator<Item = M>,
        replication: impl IntoIterator<Item = M>,
    ) {
        self.voting_members = voting.into_iter().collect();
        self.replication_members = replication.into_iter().collect();
        self.replication_members
            .extend(self.voting_members.iter().cloned());
    }

    pub fn entry_log_mut(&mut self) -> &mut L {
        &mut self.entry_log
    }

    pub fn log(&self) -> &L {
        &self.entry_log
    }

    /// Refuses outcomes that would break term or vote monotonicity. Nothing
    /// is changed either way.
    pub fn validate(&self, outcome: &Outcome<M>) -> Result<()> {
        if outcome.term() < self.term {
            return Err(RaftError::TermDecreased {
                current: self.term,
                attempted: outcome.term(),
            });
        }
        if outcome.term() == self.term
            && self.voted_for.is_some()
            && outcome.voted_for() != self.voted_for.as_ref()
        {
            return Err(RaftError::VoteChangedInSameTerm { term: self.term });
        }
        Ok(())
    }

    /// Applies an outcome: durable fields first, then the log commands in
    /// order. Runs [`RaftState::validate`] first.
    pub fn update(&mut self, outcome: &Outcome<M>) -> Result<()> {
        self.validate(outcome)?;

        self.term = outcome.term();
        self.voted_for = outcome.voted_for().cloned();
        self.leader = outcome.leader().cloned();
        self.leader_commit = outcome.leader_commit();
        self.votes_for_me = outcome.votes_for_me().clone();
        self.heartbeat_responses = outcome.heartbeat_responses().clone();
        self.last_log_index_before_we_became_leader = outcome.last_log_index_before_we_became_leader();
        self.follower_states = outcome.follower_states().clone();

        for command in outcome.log_commands() {
            command.apply_to(&mut self.entry_log)?;
        }
        Ok(())
    }
}

impl<M: Member, L: RaftLog> ReadableRaftState<M> for RaftState<M, L> {
    fn myself(&self) -> &M {
        &self.myself
    }

    fn voting_members(&self) -> &BTreeSet<M> {
        &self.voting_members
    }

    fn replication_members(&self) -> &BTreeSet<M> {
        &self.replication_members
    }

    fn term(&self) -> Term {
        self.term
    }

    fn leader(&self) -> Option<&M> {
        self.leader.as_ref()
    }

    fn leader_commit(&self) -> LogIndex {
        self.leader_commit
    }

    fn voted_for(&self) -> Option<&M> {
        self.voted_for.as_ref()
    }

    fn votes_for_me(&self) -> &BTreeSet<M> {
        &self.votes_for_me
    }

    fn heartbeat_responses(&self) -> &BTreeSet<M> {
        &self.heartbeat_responses
    }

    fn last_log_index_before_we_became_leader(&self) -> LogIndex {
        self.last_log_index_before_we_became_leader
    }

    fn follower_states(&self) -> &FollowerStates<M> {
        &self.follower_states
    }

    fn entry_log(&self) -> &dyn ReadableRaftLog {
        &self.entry_log
    }
}

/// Builds a [`RaftState`] positioned anywhere in its lifetime. Used to set
/// up handler tests and by hosts restoring a member.
#[derive(Debug)]
pub struct RaftStateBuilder<M: Member, L: RaftLog> {
    state: RaftState<M, L>,
}

impl<M: Member, L: RaftLog> RaftStateBuilder<M, L> {
    pub fn new(myself: M, entry_log: L) -> Self {
        Self {
            state: RaftState::new(myself, entry_log),
        }
    }

    pub fn term(mut self, term: Term) -> Self {
        self.state.term = term;
        self
    }

    pub fn voted_for(mut self, voted_for: Option<M>) -> Self {
        self.state.voted_for = voted_for;
        self
    }

    pub fn leader(mut self, leader: Option<M>) -> Self {
        self.state.leader = leader;
        self
    }

    pub fn leader_commit(mut self, leader_commit: LogIndex) -> Self {
        self.state.leader_commit = leader_commit;
        self
    }

    pub fn votes_for_me(mut self, votes: impl IntoIterator<Item = M>) -> Self {
        self.state.votes_for_me = votes.into_iter().collect();
        self
    }

    pub fn last_log_index_before_we_became_leader(mut self, index: LogIndex) -> Self {
        self.state.last_log_index_before_we_became_leader = index;
        self
    }

    pub fn follower_match_index(mut self, member: M, match_index: LogIndex) -> Self {
        self.state
            .follower_states
            .on_success_response(&member, match_index);
        self
    }

    pub fn voting_members(mut self, members: impl IntoIterator<Item = M>) -> Self {
        let members: Vec<M> = members.into_iter().collect();
        let replication: Vec<M> = self.state.replication_members.iter().cloned().collect();
        self.state.set_members(members, replication);
        self
    }

    pub fn replication_members(mut self, members: impl IntoIterator<Item = M>) -> Self {
        let voting: Vec<M> = self.state.voting_members.iter().cloned().collect();
        self.state.set_members(voting, members);
        self
    }

    pub fn build(self) -> RaftState<M, L> {
        self.state
    }
}
