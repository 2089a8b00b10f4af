//! # node
//!
//! why: define the raft role state machine and drive events through it
//! relations: dispatches into roles/, applies outcome.rs to state.rs,
//! persists through storage.rs
//! what: Role enum, RaftNode driver, ConsensusOutput

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::ShipCommand;
use crate::config::RaftConfig;
use crate::error::Result;
use crate::log::RaftLog;
use crate::message::{Directed, RaftMessage};
use crate::outcome::Outcome;
use crate::roles::{candidate, follower, leader};
use crate::state::{RaftState, ReadableRaftState};
use crate::storage::StateStorage;
use crate::types::Member;

/// The three possible roles a Raft member can be in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Passive role - follows a leader, votes when asked
    #[default]
    Follower,
    /// Transitional role - requesting votes to become leader
    Candidate,
    /// Active role - accepts new entries, sends heartbeats
    Leader,
}

impl Role {
    /// Handles one event in this role. Never mutates `state`; every effect
    /// is described by the returned outcome.
    pub fn handle<M, S>(self, message: &RaftMessage<M>, state: &S) -> Result<Outcome<M>>
    where
        M: Member,
        S: ReadableRaftState<M> + ?Sized,
    {
        let mut outcome = match self {
            Role::Follower => follower::handle(message, state)?,
            Role::Candidate => candidate::handle(message, state)?,
            Role::Leader => leader::handle(message, state)?,
        };
        // votes only mean something while campaigning
        if outcome.role() != Role::Candidate {
            outcome.clear_votes_for_me();
        }
        Ok(outcome)
    }
}

/// Everything the host must act on after one call to [`RaftNode::handle`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOutput<M> {
    /// messages for other members, in emission order
    pub messages: Vec<Directed<M>>,
    /// instructions for the log shipper, in emission order
    pub ship_commands: Vec<ShipCommand<M>>,
    pub renew_election_timeout: bool,
    pub needs_fresh_snapshot: bool,
    pub stepped_down: bool,
    pub leader_changed: bool,
    /// role after the event was fully processed
    pub role: Role,
}

impl<M> Default for ConsensusOutput<M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            ship_commands: Vec::new(),
            renew_election_timeout: false,
            needs_fresh_snapshot: false,
            stepped_down: false,
            leader_changed: false,
            role: Role::Follower,
        }
    }
}

/// A single Raft member: its state, its role and its durable term/vote.
///
/// Processes one event at a time to completion. Messages a handler
/// addresses to this member are fed straight back in before `handle`
/// returns.
#[derive(Debug)]
pub struct RaftNode<M: Member, L: RaftLog, S: StateStorage<M>> {
    state: RaftState<M, L>,
    role: Role,
    config: RaftConfig,
    storage: S,
}

impl<M, L, S> RaftNode<M, L, S>
where
    M: Member,
    L: RaftLog,
    S: StateStorage<M>,
{
    /// Create a new member in Follower role, recovering term and vote
    pub fn new(myself: M, entry_log: L, storage: S, config: RaftConfig) -> Result<Self> {
        config.validate()?;
        let (term, voted_for) = storage.load_term_and_vote()?;
        debug!(member = ?myself, term, voted_for = ?voted_for, "recovered term and vote");
        debug!(
            member = ?myself,
            election_timeout_min = ?config.election_timeout_min(),
            election_timeout_max = ?config.election_timeout_max(),
            heartbeat_interval = ?config.heartbeat_interval(),
            "timers configured"
        );
        Ok(Self {
            state: RaftState::new(myself, entry_log).with_term_and_vote(term, voted_for),
            role: Role::Follower,
            config,
            storage,
        })
    }

    pub fn set_members(
        &mut self,
        voting: impl IntoIterator<Item = M>,
        replication: impl IntoIterator<Item = M>,
    ) {
        self.state.set_members(voting, replication);
    }

    pub fn handle(&mut self, message: RaftMessage<M>) -> Result<ConsensusOutput<M>> {
        let mut output = ConsensusOutput {
            role: self.role,
            ..ConsensusOutput::default()
        };

        if self.config.refuse_to_be_leader
            && self.role == Role::Follower
            && matches!(message, RaftMessage::ElectionTimeout)
        {
            debug!(member = ?self.state.myself(), "ignoring election timeout, refusing to be leader");
            return Ok(output);
        }

        let leader_before = self.state.leader().cloned();
        let mut pending = VecDeque::from([message]);

        while let Some(message) = pending.pop_front() {
            debug!(
                member = ?self.state.myself(),
                role = ?self.role,
                message = ?message.message_type(),
                from = ?message.from(),
                term = ?message.term(),
                "handling message"
            );
            let outcome = self.role.handle(&message, &self.state)?;
            self.apply(&outcome)?;

            output.renew_election_timeout |= outcome.is_renew_election_timeout();
            output.needs_fresh_snapshot |= outcome.needs_fresh_snapshot();
            output.stepped_down |= outcome.is_stepping_down();

            let (messages, ship_commands) = outcome.into_effects();
            output.ship_commands.extend(ship_commands);
            for directed in messages {
                if directed.to == *self.state.myself() {
                    pending.push_back(directed.message);
                } else {
                    output.messages.push(directed);
                }
            }
        }

        output.role = self.role;
        output.leader_changed = self.state.leader() != leader_before.as_ref();
        Ok(output)
    }

    /// Persists and applies one outcome. A refused outcome leaves both
    /// storage and state untouched.
    fn apply(&mut self, outcome: &Outcome<M>) -> Result<()> {
        self.state.validate(outcome)?;
        if outcome.term() != self.state.term() || outcome.voted_for() != self.state.voted_for() {
            self.storage
                .save_term_and_vote(outcome.term(), outcome.voted_for())?;
        }
        self.state.update(outcome)?;

        if outcome.role() != self.role {
            info!(member = ?self.state.myself(), from = ?self.role, to = ?outcome.role(), term = outcome.term(), "role changed");
            self.role = outcome.role();
        }
        Ok(())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn leader(&self) -> Option<&M> {
        self.state.leader()
    }

    pub fn state(&self) -> &RaftState<M, L> {
        &self.state
    }

    pub fn config(&self) -> &RaftConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{InMemoryRaftLog, ReadableRaftLog};
    use crate::error::RaftError;
    use crate::message::VoteResponse;
    use crate::state::RaftStateBuilder;
    use crate::storage::InMemoryStorage;

    fn node(myself: u64, members: &[u64]) -> RaftNode<u64, InMemoryRaftLog, InMemoryStorage<u64>> {
        let mut node = RaftNode::new(
            myself,
            InMemoryRaftLog::new(),
            InMemoryStorage::new(),
            RaftConfig::default(),
        )
        .unwrap();
        node.set_members(members.iter().copied(), members.iter().copied());
        node
    }

    #[test]
    fn new_node_starts_as_follower() {
        let node = node(1, &[1, 2, 3]);
        assert_eq!(node.role(), Role::Follower);
        assert_eq!(node.state().term(), 0);
        assert_eq!(node.state().voted_for(), None);
        assert_eq!(Role::default(), Role::Follower);
    }

    #[test]
    fn votes_are_cleared_outside_candidate_role() {
        let state = RaftStateBuilder::new(1u64, InMemoryRaftLog::new())
            .term(2)
            .voting_members([1, 2, 3])
            .votes_for_me([2])
            .build();
        let response = RaftMessage::VoteResponse(VoteResponse {
            from: 3,
            term: 3,
            vote_granted: false,
        });

        let outcome = Role::Candidate.handle(&response, &state).unwrap();

        assert_eq!(outcome.role(), Role::Follower);
        assert!(outcome.votes_for_me().is_empty());
    }

    #[test]
    fn sole_member_elects_itself_and_commits_barrier() {
        let mut node = node(1, &[1]);

        let output = node.handle(RaftMessage::ElectionTimeout).unwrap();

        assert_eq!(output.role, Role::Leader);
        assert!(output.leader_changed);
        assert!(output.messages.is_empty());
        assert_eq!(node.state().term(), 1);
        assert_eq!(node.leader(), Some(&1));
        assert_eq!(node.state().entry_log().append_index(), 0);
        assert_eq!(node.state().commit_index(), 0);
        assert_eq!(node.storage().load_term_and_vote().unwrap(), (1, Some(1)));
    }

    #[test]
    fn refusing_member_ignores_election_timeout() {
        let mut node = RaftNode::new(
            1u64,
            InMemoryRaftLog::new(),
            InMemoryStorage::new(),
            RaftConfig {
                refuse_to_be_leader: true,
                ..RaftConfig::default()
            },
        )
        .unwrap();
        node.set_members([1, 2, 3], [1, 2, 3]);

        let output = node.handle(RaftMessage::ElectionTimeout).unwrap();

        assert!(output.messages.is_empty());
        assert_eq!(node.role(), Role::Follower);
        assert_eq!(node.state().term(), 0);
    }

    #[test]
    fn refused_outcome_is_not_persisted() {
        let mut storage = InMemoryStorage::new();
        storage.save_term_and_vote(3, Some(&2)).unwrap();
        let mut node = RaftNode::new(1u64, InMemoryRaftLog::new(), storage, RaftConfig::default()).unwrap();
        let mut outcome = Outcome::new(Role::Follower, node.state());
        outcome.set_voted_for(Some(3));

        let result = node.apply(&outcome);

        assert!(matches!(result, Err(RaftError::VoteChangedInSameTerm { term: 3 })));
        assert_eq!(node.storage().saves(), 1);
        assert_eq!(node.storage().load_term_and_vote().unwrap(), (3, Some(2)));
        assert_eq!(node.state().voted_for(), Some(&2));
    }
}
