// ABOUTME: Snapshot stream driver: reads raw progress bytes and emits Pull snapshots.
// ABOUTME: One producer task per pull, bounded queue, cooperative watch-based cancellation.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use snafu::ResultExt;
use std::io;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::classify::classify_line;
use super::error::{ClassificationSnafu, StreamError, TransitionSnafu};
use super::event::{LayerEventKind, PullEvent};
use super::lines::LineFramer;
use super::state::{Pull, PullContext};

/// Raw progress bytes as delivered by a transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// One item of the snapshot queue.
pub type SnapshotResult = Result<Pull, StreamError>;

/// Tuning for the snapshot driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Snapshots buffered ahead of the consumer. 1 means the producer waits on every emission.
    pub queue_capacity: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { queue_capacity: 1 }
    }
}

/// Adapt any async reader (a file, stdin, a socket) into a `ByteStream`.
pub fn read_chunks<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    Box::pin(futures::stream::unfold(
        Some(reader),
        |reader| async move {
            let mut reader = reader?;
            let mut buf = BytesMut::with_capacity(8 * 1024);
            match reader.read_buf(&mut buf).await {
                Ok(0) => None,
                Ok(_) => Some((Ok(buf.freeze()), Some(reader))),
                Err(e) => Some((Err(e), None)),
            }
        },
    ))
}

/// Start tracking a pull on a background task.
///
/// Emits one snapshot per consumed line (the opening `Pulling from` line only creates
/// the pull), in arrival order. The queue closes exactly once: after a terminal
/// snapshot, after an error item, after cancellation, or when the input ends.
pub fn track<S>(
    source: S,
    context: PullContext,
    options: DriverOptions,
    cancel: watch::Receiver<bool>,
) -> SnapshotStream
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
    let task = tokio::spawn(run(source, Arc::new(context), tx, cancel));
    SnapshotStream { rx, task }
}

/// Fold a complete list of lines synchronously, applying the same rules as `track`.
///
/// Returns every snapshot that `track` would emit, or the first fatal error.
pub fn replay<'a, I>(context: PullContext, lines: I) -> Result<Vec<Pull>, StreamError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut engine = Engine::new(Arc::new(context));
    let mut snapshots = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(snapshot) = engine.consume(line.as_bytes())? {
            let terminal = snapshot.is_terminal();
            snapshots.push(snapshot);
            if terminal {
                return Ok(snapshots);
            }
        }
    }
    snapshots.extend(engine.finish());
    Ok(snapshots)
}

/// Ordered queue of snapshots produced by `track`.
///
/// Dropping it releases the producer task.
pub struct SnapshotStream {
    rx: mpsc::Receiver<SnapshotResult>,
    task: JoinHandle<()>,
}

impl SnapshotStream {
    /// Next snapshot, an error (after which the stream ends), or `None` once closed.
    pub async fn recv(&mut self) -> Option<SnapshotResult> {
        self.rx.recv().await
    }

    /// Drain the stream and return the final snapshot, or the first error.
    pub async fn last(mut self) -> Result<Option<Pull>, StreamError> {
        let mut last = None;
        while let Some(item) = self.recv().await {
            last = Some(item?);
        }
        Ok(last)
    }
}

impl Stream for SnapshotStream {
    type Item = SnapshotResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for SnapshotStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream").finish_non_exhaustive()
    }
}

/// Synchronous fold state shared by the async driver and `replay`.
struct Engine {
    context: Arc<PullContext>,
    current: Option<Pull>,
    line: usize,
}

impl Engine {
    fn new(context: Arc<PullContext>) -> Self {
        Self {
            context,
            current: None,
            line: 0,
        }
    }

    /// Classify and fold one non-blank line. `None` means nothing to emit.
    fn consume(&mut self, line: &[u8]) -> Result<Option<Pull>, StreamError> {
        self.line += 1;
        let line_no = self.line;

        let event = classify_line(line).context(ClassificationSnafu { line: line_no })?;

        let (next, emit) = match &self.current {
            None => {
                let pull = Pull::start(Arc::clone(&self.context), &event)
                    .context(TransitionSnafu { line: line_no })?;
                (pull, !matches!(event, PullEvent::Started))
            }
            Some(pull) => (
                pull.advance(&event)
                    .context(TransitionSnafu { line: line_no })?,
                true,
            ),
        };

        if let PullEvent::Layer(layer) = &event
            && let LayerEventKind::Error { message } = &layer.kind
        {
            tracing::debug!(layer = %layer.id, %message, "layer failed");
        }
        tracing::debug!(line = line_no, event = %event, status = %next.describe(), "folded progress event");

        self.current = Some(next.clone());
        Ok(emit.then_some(next))
    }

    /// End-of-input handling: the synthesized completion, if it applies.
    fn finish(&mut self) -> Option<Pull> {
        let pull = self.current.as_ref()?;
        if pull.is_terminal() {
            return None;
        }

        match pull.finalize() {
            Some(complete) => {
                tracing::info!(
                    reference = %pull.reference(),
                    "stream ended without a status line, all manifest layers present; completing"
                );
                self.current = Some(complete.clone());
                Some(complete)
            }
            None => {
                tracing::warn!(
                    reference = %pull.reference(),
                    status = %pull.describe(),
                    "stream ended before the pull finished"
                );
                None
            }
        }
    }
}

async fn run<S>(
    source: S,
    context: Arc<PullContext>,
    tx: mpsc::Sender<SnapshotResult>,
    mut cancel: watch::Receiver<bool>,
) where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    tracing::debug!(reference = %context.reference, flavor = %context.flavor, "tracking pull");

    let mut engine = Engine::new(context);
    let mut framer = LineFramer::new();
    let mut source = std::pin::pin!(source);

    loop {
        while let Some(line) = framer.next_line() {
            if handle_line(&mut engine, &line, &tx, &mut cancel)
                .await
                .is_break()
            {
                return;
            }
        }

        let chunk = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::debug!("pull tracking cancelled");
                return;
            }
            chunk = source.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => framer.push(&bytes),
            Some(Err(source)) => {
                emit(&tx, &mut cancel, Err(StreamError::Read { source })).await;
                return;
            }
            None => break,
        }
    }

    if let Some(line) = framer.finish()
        && handle_line(&mut engine, &line, &tx, &mut cancel)
            .await
            .is_break()
    {
        return;
    }

    if let Some(complete) = engine.finish() {
        emit(&tx, &mut cancel, Ok(complete)).await;
    }
}

async fn handle_line(
    engine: &mut Engine,
    line: &[u8],
    tx: &mpsc::Sender<SnapshotResult>,
    cancel: &mut watch::Receiver<bool>,
) -> ControlFlow<()> {
    match engine.consume(line) {
        Ok(Some(snapshot)) => {
            let terminal = snapshot.is_terminal();
            if !emit(tx, cancel, Ok(snapshot)).await || terminal {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }
        Ok(None) => ControlFlow::Continue(()),
        Err(e) => {
            tracing::error!(error = %e, "pull progress stream failed");
            emit(tx, cancel, Err(e)).await;
            ControlFlow::Break(())
        }
    }
}

/// Send one item, giving up if cancelled or if the consumer went away.
async fn emit(
    tx: &mpsc::Sender<SnapshotResult>,
    cancel: &mut watch::Receiver<bool>,
    item: SnapshotResult,
) -> bool {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Resolves once cancellation is requested; never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}
