// src/watch/watcher.rs

//! Line watcher: scans one monitor stream for patterns.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::engine::barrier::CompletionBarrier;
use crate::engine::notify::{Notifier, NotifyError};
use crate::watch::patterns::{PatternSet, trim_line_ending};
use crate::watch::reader::{MAX_LINE_LEN, is_read_canceled};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("read canceled before end of stream")]
    Canceled,

    #[error("reading monitor output: {0}")]
    Read(#[source] io::Error),

    #[error("writing monitor output: {0}")]
    Write(#[source] io::Error),

    #[error("copying monitor output: {0}")]
    Copy(#[source] io::Error),

    #[error("orchestrator stopped before taking match {0:?}")]
    OrchestratorGone(String),

    #[error("watcher task panicked")]
    Panicked,
}

impl WatchError {
    fn read(err: io::Error) -> Self {
        if is_read_canceled(&err) {
            WatchError::Canceled
        } else {
            WatchError::Read(err)
        }
    }
}

/// What a watcher saw before its stream ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub bytes: u64,
    pub lines: u64,
    pub matches: u64,
}

/// Scan `source` until end-of-stream, echoing every byte to `sink`.
///
/// With patterns defined, each line is tested (first matching pattern wins).
/// A line longer than [`MAX_LINE_LEN`] is cut into pieces of at most that
/// size, each scanned on its own. A match charges `barrier` by one and blocks
/// on `notifier` until the orchestrator takes it. The line's raw bytes, terminator included, are
/// written to `sink` afterwards whether or not it matched.
///
/// With no patterns, this is a plain byte copy with no notifications.
pub async fn watch<R, W>(
    source: R,
    sink: &mut W,
    notifier: &Notifier,
    patterns: &PatternSet,
    barrier: &CompletionBarrier,
) -> Result<WatchSummary, WatchError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    if !patterns.is_defined() {
        return forward(source, sink).await;
    }

    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut summary = WatchSummary::default();

    loop {
        line.clear();
        let n = (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)
            .await
            .map_err(WatchError::read)?;
        if n == 0 {
            break;
        }
        summary.bytes += n as u64;
        summary.lines += 1;

        if let Some(text) = patterns.find(trim_line_ending(&line)) {
            summary.matches += 1;
            debug!(matched = %text, "pattern matched; notifying orchestrator");
            barrier.add(1);
            if let Err(err) = notifier.notify(text).await {
                barrier.done();
                return Err(match err {
                    NotifyError::Canceled(_) => WatchError::Canceled,
                    NotifyError::Undelivered(text) => WatchError::OrchestratorGone(text),
                });
            }
        }

        sink.write_all(&line).await.map_err(WatchError::Write)?;
        sink.flush().await.map_err(WatchError::Write)?;
    }

    trace!(?summary, "watched stream reached end");
    Ok(summary)
}

async fn forward<R, W>(mut source: R, sink: &mut W) -> Result<WatchSummary, WatchError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = tokio::io::copy(&mut source, sink).await.map_err(|e| {
        if is_read_canceled(&e) {
            WatchError::Canceled
        } else {
            WatchError::Copy(e)
        }
    })?;
    sink.flush().await.map_err(WatchError::Write)?;
    debug!(bytes, "no patterns defined; forwarded stream unfiltered");
    Ok(WatchSummary {
        bytes,
        ..WatchSummary::default()
    })
}
