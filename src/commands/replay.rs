// ABOUTME: Replay command: feeds a recorded progress stream through the engine.
// ABOUTME: Works offline; the manifest and digest come from flags instead of a daemon.

use pullscope::config::Config;
use pullscope::error::{Error, Result};
use pullscope::output::Output;
use pullscope::pull::{ByteStream, FileManifestSource, Manifest, PullContext, read_chunks, track};
use pullscope::runtime::RuntimeType;
use pullscope::types::{Digest, ImageRef};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::follow::{conclude, follow};

pub struct ReplayArgs {
    pub file: PathBuf,
    pub manifest: Option<PathBuf>,
    pub digest: Option<Digest>,
    pub flavor: Option<RuntimeType>,
    pub reference: ImageRef,
}

pub async fn replay(config: &Config, args: ReplayArgs, output: &mut Output) -> Result<()> {
    let flavor = args.flavor.or(config.runtime).unwrap_or_default();

    let (manifest, resolved) = match args.manifest {
        Some(path) => {
            let mut source = FileManifestSource::new(path);
            if let Some(digest) = args.digest {
                source = source.with_digest(digest);
            }
            let resolved = source.load()?;
            (resolved.manifest, Some(resolved.digest))
        }
        None => (Manifest::default(), args.digest),
    };

    let mut context = PullContext::new(args.reference.clone(), manifest, flavor);
    if let Some(digest) = resolved {
        context = context.with_resolved(digest);
    }

    let source = open(&args.file).await?;
    // Replays are never cancelled; the sender only has to outlive the stream.
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    output.start_timer();
    output.progress(&format!("Replaying {} ({})", args.reference, flavor));
    let snapshots = track(source, context, config.driver_options(), cancel_rx);
    let last = follow(snapshots, output).await?;
    conclude(&args.reference.to_string(), last, output)
}

async fn open(path: &Path) -> Result<ByteStream> {
    if path == Path::new("-") {
        return Ok(read_chunks(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        Error::InvalidArgument(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(read_chunks(file))
}
