// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use pullscope::output::OutputMode;
use pullscope::runtime::RuntimeType;
use pullscope::types::{Digest, ImageRef, Platform};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pullscope")]
#[command(about = "Follow container image pulls as layer-by-layer snapshots")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output mode (overrides config)
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputMode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new pullscope.yml configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Replay a recorded progress stream (one JSON record per line)
    Replay {
        /// Recorded stream, or - for stdin
        file: PathBuf,

        /// OCI image manifest to order layers and enable completion fallback
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Resolved image digest (defaults to the manifest's config digest)
        #[arg(long)]
        digest: Option<Digest>,

        /// Progress dialect of the recording
        #[arg(long)]
        flavor: Option<RuntimeType>,

        /// Image the recording belongs to
        #[arg(long, default_value = "image:latest")]
        reference: ImageRef,
    },

    /// Pull an image and follow its progress
    Pull {
        /// Image reference, e.g. nginx:1.27 or ghcr.io/org/app@sha256:...
        image: ImageRef,

        /// OCI image manifest to use instead of asking the daemon
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Platform to pull, e.g. linux/arm64
        #[arg(long)]
        platform: Option<Platform>,

        /// Abort the pull after this long, e.g. 90s or 5m
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
}
