//! # commands
//!
//! why: role logic never touches the log or the shipper directly, it
//! emits commands for them instead
//! relations: produced into outcome.rs, log commands applied by state.rs,
//! ship commands handed to the external log shipper
//! what: LogCommand, ShipCommand

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::log::{LogEntry, RaftLog};
use crate::types::{LogIndex, Term};

/// Instruction for the (single) log writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCommand {
    AppendLogEntry {
        index: LogIndex,
        entry: LogEntry,
    },
    /// Append `entries[offset..]` starting at `base_index + offset`
    BatchAppendLogEntries {
        base_index: LogIndex,
        offset: usize,
        entries: Vec<LogEntry>,
    },
    TruncateLogCommand { from_index: LogIndex },
    CommitCommand { commit_index: LogIndex },
    PruneLogCommand { prune_index: LogIndex },
}

impl LogCommand {
    pub fn apply_to<L: RaftLog + ?Sized>(&self, log: &mut L) -> Result<()> {
        match self {
            Self::AppendLogEntry { index, entry } => {
                if *index <= log.append_index() {
                    warn!(index, append_index = log.append_index(), "attempted to append over an existing entry");
                    return Ok(());
                }
                log.append(std::slice::from_ref(entry));
            }
            Self::BatchAppendLogEntries {
                base_index,
                offset,
                entries,
            } => {
                let first_index = base_index + *offset as LogIndex;
                if first_index <= log.append_index() {
                    warn!(first_index, append_index = log.append_index(), "attempted to append over an existing entry");
                    return Ok(());
                }
                log.append(entries.get(*offset..).unwrap_or_default());
            }
            Self::TruncateLogCommand { from_index } => log.truncate(*from_index)?,
            Self::CommitCommand { commit_index } => log.commit(*commit_index),
            Self::PruneLogCommand { prune_index } => {
                log.prune(*prune_index);
            }
        }
        debug!(command = ?self, append_index = log.append_index(), "applied log command");
        Ok(())
    }
}

/// Instruction for the external log shipper that streams entries to
/// followers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipCommand<M> {
    /// Fresh entries appended by the leader after `prev_log_index`
    NewEntries {
        prev_log_index: LogIndex,
        prev_log_term: Term,
        entries: Vec<LogEntry>,
    },
    /// `target` has everything up to `match_index`
    Match { match_index: LogIndex, target: M },
    /// `target` rejected an append; its log ends at `append_index`
    Mismatch { append_index: LogIndex, target: M },
    /// The leader's commit index moved
    CommitUpdate,
}
