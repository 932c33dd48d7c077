// ABOUTME: Command module aggregator for the pullscope CLI.
// ABOUTME: Re-exports replay and pull command handlers.

mod follow;
mod pull;
mod replay;

pub use pull::{PullArgs, pull};
pub use replay::{ReplayArgs, replay};
