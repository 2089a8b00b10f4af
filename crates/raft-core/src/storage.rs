//! # storage
//!
//! why: term and vote must survive a restart or a member could vote twice
//! in one term
//! relations: RaftNode persists through it; raft-storage provides the file
//! backed implementation
//! what: StateStorage trait, InMemoryStorage for tests and embedding

use crate::error::Result;
use crate::types::{Member, Term};

/// Durable storage of the current term and the vote cast in it.
///
/// Implementations must have made the write durable when
/// `save_term_and_vote` returns.
pub trait StateStorage<M: Member> {
    /// persist the current term and voted_for
    fn save_term_and_vote(&mut self, term: Term, voted_for: Option<&M>) -> Result<()>;

    /// load the persisted term and voted_for, `(0, None)` when nothing was saved
    fn load_term_and_vote(&self) -> Result<(Term, Option<M>)>;

    /// forget everything persisted so far
    fn clear(&mut self) -> Result<()>;
}

/// Volatile storage. Survives nothing but satisfies the driver.
#[derive(Debug, Clone)]
pub struct InMemoryStorage<M: Member> {
    term: Term,
    voted_for: Option<M>,
    saves: usize,
}

impl<M: Member> Default for InMemoryStorage<M> {
    fn default() -> Self {
        Self {
            term: 0,
            voted_for: None,
            saves: 0,
        }
    }
}

impl<M: Member> InMemoryStorage<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of completed saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl<M: Member> StateStorage<M> for InMemoryStorage<M> {
    fn save_term_and_vote(&mut self, term: Term, voted_for: Option<&M>) -> Result<()> {
        self.term = term;
        self.voted_for = voted_for.cloned();
        self.saves += 1;
        Ok(())
    }

    fn load_term_and_vote(&self) -> Result<(Term, Option<M>)> {
        Ok((self.term, self.voted_for.clone()))
    }

    fn clear(&mut self) -> Result<()> {
        self.term = 0;
        self.voted_for = None;
        Ok(())
    }
}
