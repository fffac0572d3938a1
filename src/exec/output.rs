// src/exec/output.rs

//! Output destinations for the monitor and trigger commands.
//!
//! Resolution rules, per command:
//!
//! - An explicit file (`--*-output` truncates, `--*-append` appends; the
//!   truncating one wins if both are given) receives both of the command's
//!   streams. With `--*-tee` the same bytes also go to the command's default
//!   inherited stream.
//! - Without a file of its own, a command whose counterpart *does* have a
//!   file keeps its natural streams: stdout → stdout, stderr → stderr.
//! - Otherwise both streams go to the command's default stream: stdout for
//!   the monitor, stderr for the trigger.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll, ready};

use tokio::io::AsyncWrite;
use tracing::debug;

use crate::errors::{Result, TriggerError};

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One of this process's own standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl StdStream {
    pub fn writer(self) -> BoxedWriter {
        match self {
            StdStream::Stdout => Box::new(tokio::io::stdout()),
            StdStream::Stderr => Box::new(tokio::io::stderr()),
        }
    }

    fn stdio(self) -> Stdio {
        match self {
            StdStream::Stdout => Stdio::from(io::stdout()),
            StdStream::Stderr => Stdio::from(io::stderr()),
        }
    }
}

/// Which command an output belongs to; decides its default stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Monitor,
    Trigger,
}

impl Role {
    pub fn default_stream(self) -> StdStream {
        match self {
            Role::Monitor => StdStream::Stdout,
            Role::Trigger => StdStream::Stderr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// Output flags for one command, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub overwrite: Option<PathBuf>,
    pub append: Option<PathBuf>,
    pub tee: bool,
}

impl OutputOptions {
    /// The explicit file, if any. Truncation wins over appending.
    pub fn file(&self) -> Option<(&Path, WriteMode)> {
        if let Some(path) = &self.overwrite {
            return Some((path.as_path(), WriteMode::Truncate));
        }
        self.append
            .as_deref()
            .map(|path| (path, WriteMode::Append))
    }
}

/// An opened output file, kept together with its path for diagnostics.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    file: File,
}

impl OutputFile {
    pub fn open(path: &Path, mode: WriteMode) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(|source| TriggerError::OutputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?mode, "opened output file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_clone(&self) -> io::Result<File> {
        self.file.try_clone()
    }
}

/// A single destination for bytes.
#[derive(Debug)]
pub enum Sink {
    Inherited(StdStream),
    File {
        file: OutputFile,
        tee: Option<StdStream>,
    },
}

impl Sink {
    /// A fresh async writer onto this sink. File handles are duplicated, so
    /// the sink can hand out writers more than once (e.g. for each trigger run).
    pub fn writer(&self) -> io::Result<BoxedWriter> {
        match self {
            Sink::Inherited(stream) => Ok(stream.writer()),
            Sink::File { file, tee: None } => {
                Ok(Box::new(tokio::fs::File::from_std(file.try_clone()?)))
            }
            Sink::File {
                file,
                tee: Some(stream),
            } => Ok(Box::new(Tee::new(
                tokio::fs::File::from_std(file.try_clone()?),
                stream.writer(),
            ))),
        }
    }
}

impl std::fmt::Display for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Inherited(stream) => write!(f, "inherited {stream:?}"),
            Sink::File { file, tee: None } => write!(f, "{}", file.path().display()),
            Sink::File {
                file,
                tee: Some(stream),
            } => write!(f, "{} + inherited {stream:?}", file.path().display()),
        }
    }
}

/// Where a command's stdout and stderr go.
#[derive(Debug)]
pub enum Route {
    /// Both streams share one sink.
    Combined(Sink),
    /// stdout → inherited stdout, stderr → inherited stderr.
    Split,
}

/// How a child process should be wired to its route.
pub enum ChildOutput {
    /// Hand these descriptors straight to the child.
    Direct { stdout: Stdio, stderr: Stdio },
    /// Pipe both streams and copy them into this writer (tee'd sinks).
    Piped(BoxedWriter),
}

impl Route {
    pub fn child_output(&self) -> io::Result<ChildOutput> {
        match self {
            Route::Split => Ok(ChildOutput::Direct {
                stdout: Stdio::inherit(),
                stderr: Stdio::inherit(),
            }),
            Route::Combined(Sink::Inherited(stream)) => Ok(ChildOutput::Direct {
                stdout: stream.stdio(),
                stderr: stream.stdio(),
            }),
            Route::Combined(Sink::File { file, tee: None }) => Ok(ChildOutput::Direct {
                stdout: Stdio::from(file.try_clone()?),
                stderr: Stdio::from(file.try_clone()?),
            }),
            Route::Combined(sink) => Ok(ChildOutput::Piped(sink.writer()?)),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Combined(sink) => write!(f, "{sink}"),
            Route::Split => f.write_str("inherited Stdout/Stderr"),
        }
    }
}

/// Resolve both commands' routes, opening any output files.
///
/// Each command's decision depends on whether the other one has a file, so
/// both are resolved together.
pub fn resolve_routes(monitor: &OutputOptions, trigger: &OutputOptions) -> Result<(Route, Route)> {
    let monitor_route = resolve_route(Role::Monitor, monitor, trigger.file().is_some())?;
    let trigger_route = resolve_route(Role::Trigger, trigger, monitor.file().is_some())?;
    debug!(monitor = %monitor_route, trigger = %trigger_route, "resolved output routes");
    Ok((monitor_route, trigger_route))
}

fn resolve_route(role: Role, own: &OutputOptions, other_has_file: bool) -> Result<Route> {
    match own.file() {
        Some((path, mode)) => {
            let file = OutputFile::open(path, mode)?;
            let tee = own.tee.then(|| role.default_stream());
            Ok(Route::Combined(Sink::File { file, tee }))
        }
        None if other_has_file => Ok(Route::Split),
        None => Ok(Route::Combined(Sink::Inherited(role.default_stream()))),
    }
}

/// Writer duplicating everything written to `primary` into `secondary`.
///
/// Bytes accepted by `primary` are buffered until `secondary` has taken all
/// of them, so the two always see the same byte sequence.
pub struct Tee<A, B> {
    primary: A,
    secondary: B,
    pending: Vec<u8>,
    drained: usize,
}

impl<A, B> Tee<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self {
            primary,
            secondary,
            pending: Vec::new(),
            drained: 0,
        }
    }
}

impl<A, B> Tee<A, B>
where
    B: AsyncWrite + Unpin,
{
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.drained < self.pending.len() {
            let n = ready!(
                Pin::new(&mut self.secondary).poll_write(cx, &self.pending[self.drained..])
            )?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.drained += n;
        }
        self.pending.clear();
        self.drained = 0;
        Poll::Ready(Ok(()))
    }
}

impl<A, B> AsyncWrite for Tee<A, B>
where
    A: AsyncWrite + Unpin,
    B: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;

        let n = ready!(Pin::new(&mut this.primary).poll_write(cx, buf))?;
        this.pending.extend_from_slice(&buf[..n]);
        if let Poll::Ready(Err(e)) = this.poll_drain(cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        ready!(Pin::new(&mut this.primary).poll_flush(cx))?;
        Pin::new(&mut this.secondary).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        ready!(Pin::new(&mut this.primary).poll_shutdown(cx))?;
        Pin::new(&mut this.secondary).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn with_file(path: &Path) -> OutputOptions {
        OutputOptions {
            overwrite: Some(path.to_path_buf()),
            ..OutputOptions::default()
        }
    }

    #[test]
    fn no_files_use_role_defaults() {
        let (monitor, trigger) =
            resolve_routes(&OutputOptions::default(), &OutputOptions::default()).unwrap();
        assert!(matches!(monitor, Route::Combined(Sink::Inherited(StdStream::Stdout))));
        assert!(matches!(trigger, Route::Combined(Sink::Inherited(StdStream::Stderr))));
    }

    #[test]
    fn only_monitor_file_splits_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.log");
        let (monitor, trigger) =
            resolve_routes(&with_file(&path), &OutputOptions::default()).unwrap();

        assert!(matches!(monitor, Route::Combined(Sink::File { tee: None, .. })));
        assert!(matches!(trigger, Route::Split));
        assert!(path.exists());
    }

    #[test]
    fn tee_goes_to_own_default_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = with_file(&dir.path().join("m.log"));
        monitor.tee = true;
        let mut trigger = with_file(&dir.path().join("t.log"));
        trigger.tee = true;

        let (monitor, trigger) = resolve_routes(&monitor, &trigger).unwrap();
        assert!(matches!(
            monitor,
            Route::Combined(Sink::File {
                tee: Some(StdStream::Stdout),
                ..
            })
        ));
        assert!(matches!(
            trigger,
            Route::Combined(Sink::File {
                tee: Some(StdStream::Stderr),
                ..
            })
        ));
    }

    #[test]
    fn tee_without_file_is_ignored() {
        let monitor = OutputOptions {
            tee: true,
            ..OutputOptions::default()
        };
        let (monitor, _) = resolve_routes(&monitor, &OutputOptions::default()).unwrap();
        assert!(matches!(monitor, Route::Combined(Sink::Inherited(StdStream::Stdout))));
    }

    #[test]
    fn overwrite_wins_over_append() {
        let opts = OutputOptions {
            overwrite: Some(PathBuf::from("a")),
            append: Some(PathBuf::from("b")),
            tee: false,
        };
        assert_eq!(opts.file(), Some((Path::new("a"), WriteMode::Truncate)));
    }

    #[test]
    fn unopenable_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.log");
        let err = resolve_routes(&with_file(&path), &OutputOptions::default()).unwrap_err();
        match err {
            TriggerError::OutputOpen { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected OutputOpen, got {other:?}"),
        }
    }

    #[test]
    fn append_mode_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, b"old\n").unwrap();

        {
            use std::io::Write;
            let out = OutputFile::open(&path, WriteMode::Append).unwrap();
            out.try_clone().unwrap().write_all(b"new\n").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"old\nnew\n");

        OutputFile::open(&path, WriteMode::Truncate).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[tokio::test]
    async fn tee_duplicates_every_byte() {
        let mut tee = Tee::new(Vec::new(), Vec::new());
        tee.write_all(b"line one\n").await.unwrap();
        tee.write_all(b"line two\n").await.unwrap();
        tee.flush().await.unwrap();

        assert_eq!(tee.primary, b"line one\nline two\n");
        assert_eq!(tee.secondary, tee.primary);
    }
}
