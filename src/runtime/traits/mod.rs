// ABOUTME: Capability traits for the container runtime that serves a pull.
// ABOUTME: Defines PullTransport (raw progress bytes) and RuntimeInfo (flavor, platform, digest).

mod image;
mod runtime_info;
pub(crate) mod sealed;

pub use image::{ImageError, PullOptions, PullTransport};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError, RuntimeMetadata};
