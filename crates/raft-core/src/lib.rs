//! # raft-core
//!
//! why: decide what a raft member does with every event it sees, as pure
//! functions from (event, state) to an outcome
//! relations: used by raft-storage for durable term/vote; hosts drive it
//! through RaftNode and deliver its messages and ship commands
//! what: roles, outcome, state, log, commands, messages, driver, config

pub mod commands;
pub mod config;
pub mod error;
pub mod log;
pub mod message;
pub mod node;
pub mod outcome;
pub mod roles;
pub mod state;
pub mod storage;
pub mod types;

pub use commands::{LogCommand, ShipCommand};
pub use config::RaftConfig;
pub use error::{RaftError, Result};
pub use log::{InMemoryRaftLog, LogEntry, RaftLog, ReadableRaftLog, ReplicatedContent};
pub use message::{
    AppendEntriesRequest, AppendEntriesResponse, Directed, Heartbeat, LogCompactionInfo,
    MessageType, RaftMessage, VoteRequest, VoteResponse,
};
pub use node::{ConsensusOutput, RaftNode, Role};
pub use outcome::Outcome;
pub use state::{FollowerState, FollowerStates, RaftState, RaftStateBuilder, ReadableRaftState};
pub use storage::{InMemoryStorage, StateStorage};
pub use types::{LogIndex, Member, Term};
