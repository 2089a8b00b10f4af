//! # outcome
//!
//! why: every event produces one value describing all of its effects, so
//! handlers stay pure and testable without a running node
//! relations: built by roles and helpers, applied by state.rs, drained by
//! node.rs
//! what: Outcome

use std::collections::BTreeSet;

use crate::commands::{LogCommand, ShipCommand};
use crate::message::{Directed, RaftMessage};
use crate::node::Role;
use crate::state::{FollowerStates, ReadableRaftState};
use crate::types::{LogIndex, Member, Term};

/// Effects of handling one event.
///
/// Starts as a copy of the member's current state; handlers override the
/// fields that change and append messages and commands.
#[derive(Debug, Clone)]
pub struct Outcome<M: Member> {
    role: Role,
    term: Term,
    leader: Option<M>,
    leader_commit: LogIndex,
    voted_for: Option<M>,
    votes_for_me: BTreeSet<M>,
    heartbeat_responses: BTreeSet<M>,
    last_log_index_before_we_became_leader: LogIndex,
    follower_states: FollowerStates<M>,
    renew_election_timeout: bool,
    stepping_down: bool,
    needs_fresh_snapshot: bool,
    outgoing_messages: Vec<Directed<M>>,
    log_commands: Vec<LogCommand>,
    ship_commands: Vec<ShipCommand<M>>,
}

impl<M: Member> Outcome<M> {
    pub fn new<S: ReadableRaftState<M> + ?Sized>(current_role: Role, state: &S) -> Self {
        Self {
            role: current_role,
            term: state.term(),
            leader: state.leader().cloned(),
            leader_commit: state.leader_commit(),
            voted_for: state.voted_for().cloned(),
            votes_for_me: state.votes_for_me().clone(),
            heartbeat_responses: state.heartbeat_responses().clone(),
            last_log_index_before_we_became_leader: state.last_log_index_before_we_became_leader(),
            follower_states: state.follower_states().clone(),
            renew_election_timeout: false,
            stepping_down: false,
            needs_fresh_snapshot: false,
            outgoing_messages: Vec::new(),
            log_commands: Vec::new(),
            ship_commands: Vec::new(),
        }
    }

    pub fn set_next_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Moves to a later term. Lower terms are ignored and a strictly
    /// greater term forgets the vote cast in the old one.
    pub fn set_next_term(&mut self, term: Term) {
        if term > self.term {
            self.term = term;
            self.voted_for = None;
        }
    }

    pub fn set_leader(&mut self, leader: Option<M>) {
        self.leader = leader;
    }

    pub fn set_leader_commit(&mut self, leader_commit: LogIndex) {
        self.leader_commit = leader_commit;
    }

    pub fn set_voted_for(&mut self, voted_for: Option<M>) {
        self.voted_for = voted_for;
    }

    pub fn add_vote_for_me(&mut self, voter: M) {
        self.votes_for_me.insert(voter);
    }

    pub fn clear_votes_for_me(&mut self) {
        self.votes_for_me.clear();
    }

    pub fn add_heartbeat_response(&mut self, from: M) {
        self.heartbeat_responses.insert(from);
    }

    pub fn clear_heartbeat_responses(&mut self) {
        self.heartbeat_responses.clear();
    }

    pub fn set_last_log_index_before_we_became_leader(&mut self, index: LogIndex) {
        self.last_log_index_before_we_became_leader = index;
    }

    pub fn replace_follower_states(&mut self, follower_states: FollowerStates<M>) {
        self.follower_states = follower_states;
    }

    pub fn follower_states_mut(&mut self) -> &mut FollowerStates<M> {
        &mut self.follower_states
    }

    pub fn renew_election_timeout(&mut self) {
        self.renew_election_timeout = true;
    }

    /// Leaves leadership: follower role and no known leader
    pub fn step_down(&mut self) {
        self.stepping_down = true;
        self.role = Role::Follower;
        self.leader = None;
    }

    pub fn mark_need_for_fresh_snapshot(&mut self) {
        self.needs_fresh_snapshot = true;
    }

    pub fn add_outgoing_message(&mut self, to: M, message: RaftMessage<M>) {
        self.outgoing_messages.push(Directed::new(to, message));
    }

    pub fn add_log_command(&mut self, command: LogCommand) {
        self.log_commands.push(command);
    }

    pub fn add_ship_command(&mut self, command: ShipCommand<M>) {
        self.ship_commands.push(command);
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn leader(&self) -> Option<&M> {
        self.leader.as_ref()
    }

    pub fn leader_commit(&self) -> LogIndex {
        self.leader_commit
    }

    pub fn voted_for(&self) -> Option<&M> {
        self.voted_for.as_ref()
    }

    pub fn votes_for_me(&self) -> &BTreeSet<M> {
        &self.votes_for_me
    }

    pub fn heartbeat_responses(&self) -> &BTreeSet<M> {
        &self.heartbeat_responses
    }

    pub fn last_log_index_before_we_became_leader(&self) -> LogIndex {
        self.last_log_index_before_we_became_leader
    }

    pub fn follower_states(&self) -> &FollowerStates<M> {
        &self.follower_states
    }

    pub fn is_renew_election_timeout(&self) -> bool {
        self.renew_election_timeout
    }

    pub fn is_stepping_down(&self) -> bool {
        self.stepping_down
    }

    pub fn needs_fresh_snapshot(&self) -> bool {
        self.needs_fresh_snapshot
    }

    pub fn outgoing_messages(&self) -> &[Directed<M>] {
        &self.outgoing_messages
    }

    pub fn log_commands(&self) -> &[LogCommand] {
        &self.log_commands
    }

    pub fn ship_commands(&self) -> &[ShipCommand<M>] {
        &self.ship_commands
    }

    /// Highest commit index emitted by this outcome, if any
    pub fn commit_index(&self) -> Option<LogIndex> {
        self.log_commands
            .iter()
            .filter_map(|command| match command {
                LogCommand::CommitCommand { commit_index } => Some(*commit_index),
                _ => None,
            })
            .max()
    }

    /// Splits off the parts the host delivers to collaborators
    pub fn into_effects(self) -> (Vec<Directed<M>>, Vec<ShipCommand<M>>) {
        (self.outgoing_messages, self.ship_commands)
    }
}
