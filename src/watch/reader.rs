// src/watch/reader.rs

//! Byte sources feeding the line watchers.
//!
//! - [`CancellableReader`] refuses to read once the shared cancellation token
//!   has fired. Unlike a plain "check before read" wrapper it also wakes up a
//!   read that is pending inside the pipe, so a silent child cannot keep a
//!   watcher alive after shutdown was requested.
//! - [`Interleave`] merges a child's stdout and stderr into one source, whole
//!   lines at a time in the order they complete, for the case where both
//!   streams share a sink.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Returned (inside an `io::Error`) by reads attempted after cancellation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("read canceled before finishing read(s) from pipe")]
pub struct ReadCanceled;

/// The `io::Error` every canceled read fails with.
pub fn read_canceled() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, ReadCanceled)
}

/// Whether an I/O error was produced by a canceled read.
pub fn is_read_canceled(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<ReadCanceled>())
}

/// `AsyncRead` adapter that fails with [`ReadCanceled`] once `token` fires.
pub struct CancellableReader<R> {
    inner: R,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<R> CancellableReader<R> {
    pub fn new(inner: R, token: CancellationToken) -> Self {
        let cancelled = Box::pin(token.clone().cancelled_owned());
        Self {
            inner,
            token,
            cancelled,
        }
    }
}

impl<R> std::fmt::Debug for CancellableReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellableReader")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CancellableReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        // Polling the cancellation future also registers our waker, so a read
        // parked in the pipe below is woken when the token fires.
        if this.token.is_cancelled() || this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(read_canceled()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

/// Longest line handed on in one piece; longer ones are split.
pub const MAX_LINE_LEN: usize = 64 * 1024;

const CHUNK: usize = 8 * 1024;

/// Merges two readers line by line in the order lines complete.
///
/// Each input is buffered until it holds a whole line (or [`MAX_LINE_LEN`]
/// bytes, or its final unterminated bytes at end-of-stream), and only whole
/// segments are passed on, so a partial line from one stream is never
/// spliced into a line from the other. Preference alternates after every
/// segment so a chatty stream cannot starve the other one. End-of-stream is
/// reported only once both inputs are done.
pub struct Interleave<A, B> {
    first: Lane<A>,
    second: Lane<B>,
    prefer_second: bool,
}

impl<A, B> Interleave<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first: Lane::new(first),
            second: Lane::new(second),
            prefer_second: false,
        }
    }
}

/// Outcome of polling one side of an [`Interleave`].
enum Side {
    Data,
    Eof,
    Pending,
}

/// One buffered input of an [`Interleave`].
struct Lane<R> {
    reader: Option<R>,
    pending: Vec<u8>,
    /// Bytes at the front of `pending` forming a segment being emitted.
    ready: usize,
    /// Bytes at the front of `pending` known to hold no newline.
    scanned: usize,
}

impl<R> Lane<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            pending: Vec::new(),
            ready: 0,
            scanned: 0,
        }
    }

    /// Whether a segment has been partly emitted and must be finished first.
    fn in_segment(&self) -> bool {
        self.ready > 0
    }
}

impl<R: AsyncRead + Unpin> Lane<R> {
    fn find_segment(&mut self) {
        match self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(i) => {
                self.ready = (self.scanned + i + 1).min(MAX_LINE_LEN);
                self.scanned = 0;
            }
            None if self.pending.len() >= MAX_LINE_LEN => {
                self.ready = MAX_LINE_LEN;
                self.scanned = 0;
            }
            None => self.scanned = self.pending.len(),
        }
    }

    fn poll_segment(&mut self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> io::Result<Side> {
        loop {
            if self.ready == 0 && !self.pending.is_empty() {
                self.find_segment();
            }
            if self.ready > 0 {
                let n = self.ready.min(buf.remaining());
                buf.put_slice(&self.pending[..n]);
                self.pending.drain(..n);
                self.ready -= n;
                return Ok(Side::Data);
            }

            let Some(reader) = self.reader.as_mut() else {
                if self.pending.is_empty() {
                    return Ok(Side::Eof);
                }
                // Unterminated tail at end-of-stream.
                self.ready = self.pending.len();
                self.scanned = 0;
                continue;
            };

            let mut chunk = [0u8; CHUNK];
            let mut read = ReadBuf::new(&mut chunk);
            match Pin::new(reader).poll_read(cx, &mut read) {
                Poll::Pending => return Ok(Side::Pending),
                Poll::Ready(Err(e)) => return Err(e),
                Poll::Ready(Ok(())) if read.filled().is_empty() => self.reader = None,
                Poll::Ready(Ok(())) => self.pending.extend_from_slice(read.filled()),
            }
        }
    }
}

impl<A, B> AsyncRead for Interleave<A, B>
where
    A: AsyncRead + Unpin,
    B: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let first_preferred = if this.first.in_segment() {
            true
        } else if this.second.in_segment() {
            false
        } else {
            !this.prefer_second
        };

        let preferred = if first_preferred {
            this.first.poll_segment(cx, buf)?
        } else {
            this.second.poll_segment(cx, buf)?
        };
        if let Side::Data = preferred {
            this.prefer_second = first_preferred;
            return Poll::Ready(Ok(()));
        }

        let other = if first_preferred {
            this.second.poll_segment(cx, buf)?
        } else {
            this.first.poll_segment(cx, buf)?
        };

        match (preferred, other) {
            (_, Side::Data) => {
                this.prefer_second = !first_preferred;
                Poll::Ready(Ok(()))
            }
            (Side::Eof, Side::Eof) => Poll::Ready(Ok(())),
            _ => Poll::Pending,
        }
    }
}
