//! # config
//!
//! why: timer bounds and election behaviour chosen by the host
//! relations: validated by RaftNode::new, durations read by the host's timers
//! what: RaftConfig

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RaftError, Result};

/// Timing and election settings for one member. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftConfig {
    /// lower bound of the randomized election timeout
    pub election_timeout_min: u64,
    /// upper bound of the randomized election timeout
    pub election_timeout_max: u64,
    /// how often a leader sends heartbeats
    pub heartbeat_interval: u64,
    /// never start an election; election timeouts are dropped while following
    pub refuse_to_be_leader: bool,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: 150,
            election_timeout_max: 300,
            heartbeat_interval: 50,
            refuse_to_be_leader: false,
        }
    }
}

impl RaftConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.election_timeout_min == 0 || self.heartbeat_interval == 0 {
            return Err(invalid("timeouts must be positive"));
        }
        if self.election_timeout_min > self.election_timeout_max {
            return Err(invalid(format!(
                "election_timeout_min ({}) exceeds election_timeout_max ({})",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        if self.heartbeat_interval >= self.election_timeout_min {
            return Err(invalid(format!(
                "heartbeat_interval ({}) must be below election_timeout_min ({})",
                self.heartbeat_interval, self.election_timeout_min
            )));
        }
        Ok(())
    }

    pub fn election_timeout_min(&self) -> Duration {
        Duration::from_millis(self.election_timeout_min)
    }

    pub fn election_timeout_max(&self) -> Duration {
        Duration::from_millis(self.election_timeout_max)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }
}

fn invalid(reason: impl Into<String>) -> RaftError {
    RaftError::InvalidConfig {
        reason: reason.into(),
    }
}
