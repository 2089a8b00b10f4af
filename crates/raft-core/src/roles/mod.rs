//! # roles
//!
//! why: decide, per role, what an incoming event means for this member
//! relations: dispatched from node.rs via Role::handle, reads state.rs,
//! writes outcome.rs
//! what: follower/candidate/leader handlers and the helper algorithms
//! they share (voting, election, appending, heart, followers)

pub mod appending;
pub mod candidate;
pub mod election;
pub mod follower;
pub mod followers;
pub mod heart;
pub mod leader;
pub mod voting;

use crate::commands::LogCommand;
use crate::outcome::Outcome;
use crate::types::{LogIndex, Member};

/// Asks the log writer to discard history up to `prune_index`. Identical in
/// every role.
fn handle_prune_request<M: Member>(outcome: &mut Outcome<M>, prune_index: LogIndex) {
    outcome.add_log_command(LogCommand::PruneLogCommand { prune_index });
}
