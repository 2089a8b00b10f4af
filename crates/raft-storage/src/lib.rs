//! # raft-storage
//!
//! why: keep a member's term and vote on disk so a restart never lets it
//! vote twice in one term
//! relations: implements raft_core::StateStorage, handed to RaftNode::new
//! what: FileStorage

use std::fs::{self, File};
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use raft_core::{Member, Result, StateStorage, Term};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// file-based term/vote storage using std::fs
///
/// stores state in a directory as meta.json, replaced atomically on
/// every save
#[derive(Debug)]
pub struct FileStorage<M> {
    /// directory path for storing state files
    dir: PathBuf,
    _member: PhantomData<M>,
}

impl<M> FileStorage<M> {
    /// create a new filestorage at the given directory
    /// creates the directory if it doesn't exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _member: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join("meta.json")
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join("meta.tmp")
    }
}

/// metadata structure for term and vote
#[derive(Serialize, Deserialize)]
struct MetaData<M> {
    term: Term,
    voted_for: Option<M>,
}

impl<M> StateStorage<M> for FileStorage<M>
where
    M: Member + Serialize + DeserializeOwned,
{
    fn save_term_and_vote(&mut self, term: Term, voted_for: Option<&M>) -> Result<()> {
        let meta = MetaData { term, voted_for };
        let json = serde_json::to_string_pretty(&meta)?;

        // atomic write: write to temp file then rename
        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, self.meta_path())?;

        debug!(dir = %self.dir.display(), term, "saved term and vote");
        Ok(())
    }

    fn load_term_and_vote(&self) -> Result<(Term, Option<M>)> {
        let path = self.meta_path();
        if !path.exists() {
            return Ok((0, None)); // default for new members
        }

        let mut contents = String::new();
        File::open(&path)?.read_to_string(&mut contents)?;
        let meta: MetaData<M> = serde_json::from_str(&contents)?;

        Ok((meta.term, meta.voted_for))
    }

    fn clear(&mut self) -> Result<()> {
        for path in [self.meta_path(), self.temp_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
