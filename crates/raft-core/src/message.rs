//! # message
//!
//! why: define every event a role handler can receive, peer rpcs and
//! local timer/client events alike
//! relations: consumed by roles, produced into outcome.rs, serialized by
//! the external transport
//! what: rpc payload structs, RaftMessage, MessageType, Directed

use serde::{Deserialize, Serialize};

use crate::log::{LogEntry, ReplicatedContent};
use crate::types::{LogIndex, Term};

/// Request a vote during leader election
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest<M> {
    pub from: M,
    pub term: Term,
    pub candidate: M,
    pub last_log_index: LogIndex,
    pub last_log_term: Term,
}

/// Response to a vote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse<M> {
    pub from: M,
    pub term: Term,
    pub vote_granted: bool,
}

/// Replicate log entries following `prev_log_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEntriesRequest<M> {
    pub from: M,
    pub leader_term: Term,
    pub prev_log_index: LogIndex,
    pub prev_log_term: Term,
    pub entries: Vec<LogEntry>,
    pub leader_commit: LogIndex,
}

/// Response to AppendEntriesRequest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEntriesResponse<M> {
    pub from: M,
    pub term: Term,
    pub success: bool,
    pub match_index: LogIndex,
    pub append_index: LogIndex,
}

/// Leader liveness plus its commit point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat<M> {
    pub from: M,
    pub leader_term: Term,
    pub commit_index: LogIndex,
    pub commit_index_term: Term,
}

/// Leader telling a follower that its history starts after `prev_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCompactionInfo<M> {
    pub from: M,
    pub leader_term: Term,
    pub prev_index: LogIndex,
}

/// All events a member's role logic reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftMessage<M> {
    VoteRequest(VoteRequest<M>),
    VoteResponse(VoteResponse<M>),
    AppendEntriesRequest(AppendEntriesRequest<M>),
    AppendEntriesResponse(AppendEntriesResponse<M>),
    Heartbeat(Heartbeat<M>),
    HeartbeatResponse { from: M },
    LogCompactionInfo(LogCompactionInfo<M>),
    ElectionTimeout,
    HeartbeatTimeout,
    /// Client proposal
    NewEntryRequest { content: ReplicatedContent },
    NewBatchRequest { contents: Vec<ReplicatedContent> },
    /// Local request to discard history up to `prune_index`
    PruneRequest { prune_index: LogIndex },
}

/// Discriminant of [`RaftMessage`], handy for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    VoteRequest,
    VoteResponse,
    AppendEntriesRequest,
    AppendEntriesResponse,
    Heartbeat,
    HeartbeatResponse,
    LogCompactionInfo,
    ElectionTimeout,
    HeartbeatTimeout,
    NewEntryRequest,
    NewBatchRequest,
    PruneRequest,
}

impl<M> RaftMessage<M> {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::VoteRequest(_) => MessageType::VoteRequest,
            Self::VoteResponse(_) => MessageType::VoteResponse,
            Self::AppendEntriesRequest(_) => MessageType::AppendEntriesRequest,
            Self::AppendEntriesResponse(_) => MessageType::AppendEntriesResponse,
            Self::Heartbeat(_) => MessageType::Heartbeat,
            Self::HeartbeatResponse { .. } => MessageType::HeartbeatResponse,
            Self::LogCompactionInfo(_) => MessageType::LogCompactionInfo,
            Self::ElectionTimeout => MessageType::ElectionTimeout,
            Self::HeartbeatTimeout => MessageType::HeartbeatTimeout,
            Self::NewEntryRequest { .. } => MessageType::NewEntryRequest,
            Self::NewBatchRequest { .. } => MessageType::NewBatchRequest,
            Self::PruneRequest { .. } => MessageType::PruneRequest,
        }
    }

    /// Sending member, for peer messages
    pub fn from(&self) -> Option<&M> {
        match self {
            Self::VoteRequest(req) => Some(&req.from),
            Self::VoteResponse(res) => Some(&res.from),
            Self::AppendEntriesRequest(req) => Some(&req.from),
            Self::AppendEntriesResponse(res) => Some(&res.from),
            Self::Heartbeat(beat) => Some(&beat.from),
            Self::HeartbeatResponse { from } => Some(from),
            Self::LogCompactionInfo(info) => Some(&info.from),
            Self::ElectionTimeout
            | Self::HeartbeatTimeout
            | Self::NewEntryRequest { .. }
            | Self::NewBatchRequest { .. }
            | Self::PruneRequest { .. } => None,
        }
    }

    /// Term the sender was at, for peer messages that carry one
    pub fn term(&self) -> Option<Term> {
        match self {
            Self::VoteRequest(req) => Some(req.term),
            Self::VoteResponse(res) => Some(res.term),
            Self::AppendEntriesRequest(req) => Some(req.leader_term),
            Self::AppendEntriesResponse(res) => Some(res.term),
            Self::Heartbeat(beat) => Some(beat.leader_term),
            Self::LogCompactionInfo(info) => Some(info.leader_term),
            _ => None,
        }
    }
}

/// A message addressed to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directed<M> {
    pub to: M,
    pub message: RaftMessage<M>,
}

impl<M> Directed<M> {
    pub fn new(to: M, message: RaftMessage<M>) -> Self {
        Self { to, message }
    }
}
