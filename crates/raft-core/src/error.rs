//! # error
//!
//! why: separate fatal safety violations from the recoverable conditions
//! that role logic absorbs on its own
//! relations: returned by roles, commands, state and node
//! what: RaftError, Result alias

use thiserror::Error;

use crate::types::{LogIndex, Term};

/// Errors surfaced to the host. None of them are retryable.
#[derive(Error, Debug)]
pub enum RaftError {
    /// An AppendEntries request arrived at the leader's own term.
    #[error("two leaders in the same term {term}")]
    TwoLeadersInSameTerm { term: Term },

    /// A conflicting entry lies at or below the commit index.
    #[error("cannot truncate entry at index {index} with term {term} when commit index is at {commit_index}")]
    TruncateBelowCommit {
        index: LogIndex,
        term: Term,
        commit_index: LogIndex,
    },

    #[error("cannot truncate from index {from_index} beyond append index {append_index}")]
    TruncateBeyondAppendIndex {
        from_index: LogIndex,
        append_index: LogIndex,
    },

    #[error("term cannot decrease (current: {current}, attempted: {attempted})")]
    TermDecreased { current: Term, attempted: Term },

    /// A second, different vote was cast within one term.
    #[error("can only vote once per term (term {term})")]
    VoteChangedInSameTerm { term: Term },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("i/o error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RaftError>;
