// ABOUTME: Library root for pullscope - exposes the pull progress engine and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pull;
pub mod runtime;
pub mod types;
