//! # log
//!
//! why: describe the replicated log as role logic sees it (read-only) and
//! as the log applier sees it (single writer)
//! relations: read by state.rs and the helper algorithms, written only
//! through commands.rs
//! what: LogEntry, ReplicatedContent, ReadableRaftLog, RaftLog, InMemoryRaftLog

use serde::{Deserialize, Serialize};

use crate::error::{RaftError, Result};
use crate::types::{LogIndex, Term};

/// Payload carried by a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicatedContent {
    /// No-op appended by a new leader to get an entry of its own term committed
    NewLeaderBarrier,
    /// Opaque application command
    Data(Vec<u8>),
}

impl ReplicatedContent {
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Data(bytes.into())
    }
}

/// A single entry in the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The term when this entry was created
    pub term: Term,
    /// What gets replicated
    pub content: ReplicatedContent,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(term: Term, content: ReplicatedContent) -> Self {
        Self { term, content }
    }
}

/// Read-only view over the replicated log.
pub trait ReadableRaftLog {
    /// Index of the last entry, `-1` for an empty log.
    fn append_index(&self) -> LogIndex;

    /// Index just before the earliest retained entry. Everything at or
    /// below it has been compacted away.
    fn prev_index(&self) -> LogIndex;

    /// Highest index known to be committed.
    fn commit_index(&self) -> LogIndex;

    /// Term of the entry at `index`, `-1` when there is no such entry.
    /// The term at `prev_index` is remembered across compaction.
    fn read_entry_term(&self, index: LogIndex) -> Term;
}

/// Mutable side of the log. Only log commands call into it.
pub trait RaftLog: ReadableRaftLog {
    /// Appends after the current append index, returning the new one.
    fn append(&mut self, entries: &[LogEntry]) -> LogIndex;

    /// Removes every entry from `from_index` onwards.
    fn truncate(&mut self, from_index: LogIndex) -> Result<()>;

    /// Discards history up to `safe_index` (never past the commit index),
    /// returning the resulting prev index.
    fn prune(&mut self, safe_index: LogIndex) -> LogIndex;

    /// Jumps the log forward to `index`, as after installing a snapshot.
    /// Everything up to `index` counts as committed afterwards.
    fn skip(&mut self, index: LogIndex, term: Term);

    /// Raises the commit index. Lower values are ignored.
    fn commit(&mut self, commit_index: LogIndex);
}

/// Log kept entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRaftLog {
    entries: Vec<LogEntry>,
    prev_index: LogIndex,
    prev_term: Term,
    commit_index: LogIndex,
}

impl Default for InMemoryRaftLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            prev_index: -1,
            prev_term: -1,
            commit_index: -1,
        }
    }
}

impl InMemoryRaftLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry at `index`, if it is retained
    pub fn read_entry(&self, index: LogIndex) -> Option<&LogEntry> {
        self.offset_of(index).and_then(|offset| self.entries.get(offset))
    }

    /// Retained entries in `(from, to]`, clamped to what the log holds
    pub fn entries_between(&self, from: LogIndex, to: LogIndex) -> Vec<LogEntry> {
        ((from + 1).max(self.prev_index + 1)..=to.min(self.append_index()))
            .filter_map(|index| self.read_entry(index).cloned())
            .collect()
    }

    fn offset_of(&self, index: LogIndex) -> Option<usize> {
        if index <= self.prev_index || index > self.append_index() {
            return None;
        }
        usize::try_from(index - self.prev_index - 1).ok()
    }
}

impl ReadableRaftLog for InMemoryRaftLog {
    fn append_index(&self) -> LogIndex {
        self.prev_index + self.entries.len() as LogIndex
    }

    fn prev_index(&self) -> LogIndex {
        self.prev_index
    }

    fn commit_index(&self) -> LogIndex {
        self.commit_index
    }

    fn read_entry_term(&self, index: LogIndex) -> Term {
        if index == self.prev_index {
            return self.prev_term;
        }
        self.read_entry(index).map_or(-1, |entry| entry.term)
    }
}

impl RaftLog for InMemoryRaftLog {
    fn append(&mut self, entries: &[LogEntry]) -> LogIndex {
        self.entries.extend_from_slice(entries);
        self.append_index()
    }

    fn truncate(&mut self, from_index: LogIndex) -> Result<()> {
        if from_index <= self.commit_index || from_index <= self.prev_index {
            return Err(RaftError::TruncateBelowCommit {
                index: from_index,
                term: self.read_entry_term(from_index),
                commit_index: self.commit_index.max(self.prev_index),
            });
        }
        if from_index > self.append_index() {
            return Err(RaftError::TruncateBeyondAppendIndex {
                from_index,
                append_index: self.append_index(),
            });
        }
        let keep = usize::try_from(from_index - self.prev_index - 1).unwrap_or(0);
        self.entries.truncate(keep);
        Ok(())
    }

    fn prune(&mut self, safe_index: LogIndex) -> LogIndex {
        let safe_index = safe_index.min(self.commit_index).min(self.append_index());
        if safe_index > self.prev_index {
            let prev_term = self.read_entry_term(safe_index);
            let removed = usize::try_from(safe_index - self.prev_index).unwrap_or(0);
            self.entries.drain(..removed);
            self.prev_index = safe_index;
            self.prev_term = prev_term;
        }
        self.prev_index
    }

    fn skip(&mut self, index: LogIndex, term: Term) {
        if index > self.append_index() {
            self.entries.clear();
            self.prev_index = index;
            self.prev_term = term;
            self.commit_index = self.commit_index.max(index);
        }
    }

    fn commit(&mut self, commit_index: LogIndex) {
        self.commit_index = self.commit_index.max(commit_index);
    }
}
