//! # types
//!
//! why: give terms, indices and member identities one shared vocabulary
//! relations: used by every other module in raft-core
//! what: Term, LogIndex, Member bound

use std::fmt::Debug;
use std::hash::Hash;

/// Epoch number ordering leadership claims. Never decreases.
pub type Term = i64;

/// Position in the replicated log. `-1` means "no entry".
pub type LogIndex = i64;

/// Identity of a cluster member.
///
/// Role logic only compares, orders and copies members; it never looks
/// inside them, so anything from a `u64` to a transport address works.
pub trait Member: Clone + Eq + Ord + Hash + Debug {}

impl<T> Member for T where T: Clone + Eq + Ord + Hash + Debug {}
