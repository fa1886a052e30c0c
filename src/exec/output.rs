// src/exec/output.rs

//! Output capture for rule commands.
//!
//! Both streams are read line by line in their own tasks and merged into a
//! single ordered stream in arrival order. stderr lines carry
//! [`STDERR_MARKER`]. The full output is only available once both streams
//! reached EOF (or the pipe was told to stop), so a report command never sees
//! a partial capture.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

/// Prefix marking lines that came from stderr.
pub const STDERR_MARKER: &str = "! ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

impl OutputLine {
    /// The line as it appears in logs and report input.
    pub fn render(&self) -> String {
        match self.stream {
            Stream::Stdout => self.text.clone(),
            Stream::Stderr => format!("{STDERR_MARKER}{}", self.text),
        }
    }
}

/// Materialized combined output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    lines: Vec<OutputLine>,
}

impl CapturedOutput {
    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines, rendered and newline-terminated.
    pub fn combined(&self) -> String {
        self.prefixed("")
    }

    /// All lines with `prefix` in front of each one.
    pub fn prefixed(&self, prefix: &str) -> String {
        self.lines
            .iter()
            .map(|l| format!("{prefix}{}\n", l.render()))
            .collect()
    }
}

impl FromIterator<OutputLine> for CapturedOutput {
    fn from_iter<I: IntoIterator<Item = OutputLine>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

/// In-flight capture of a child's stdout/stderr.
pub struct OutputPipe {
    collector: JoinHandle<CapturedOutput>,
    stop: oneshot::Sender<()>,
}

impl OutputPipe {
    /// Start reading both streams. Missing streams count as already closed.
    pub fn spawn<O, E>(stdout: Option<O>, stderr: Option<E>) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<OutputLine>();
        let (stop, mut stop_rx) = oneshot::channel::<()>();

        if let Some(out) = stdout {
            tokio::spawn(pump_lines(out, Stream::Stdout, line_tx.clone()));
        }
        if let Some(err) = stderr {
            tokio::spawn(pump_lines(err, Stream::Stderr, line_tx.clone()));
        }
        drop(line_tx);

        let collector = tokio::spawn(async move {
            let mut lines = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    line = line_rx.recv() => match line {
                        Some(line) => lines.push(line),
                        None => break,
                    },
                    _ = &mut stop_rx => break,
                }
            }
            CapturedOutput { lines }
        });

        Self { collector, stop }
    }

    /// Wait until both streams hit EOF.
    pub async fn finish(self) -> CapturedOutput {
        let Self { collector, stop } = self;
        let output = join_collector(collector).await;
        drop(stop);
        output
    }

    /// Wait for EOF for at most `grace`, then keep whatever was read.
    ///
    /// Used after a timeout kill, when a grandchild may still hold the pipes.
    pub async fn finish_within(self, grace: Duration) -> CapturedOutput {
        let Self {
            mut collector,
            stop,
        } = self;

        match tokio::time::timeout(grace, &mut collector).await {
            Ok(res) => unwrap_join(res),
            Err(_) => {
                let _ = stop.send(());
                join_collector(collector).await
            }
        }
    }
}

async fn join_collector(collector: JoinHandle<CapturedOutput>) -> CapturedOutput {
    unwrap_join(collector.await)
}

fn unwrap_join(res: Result<CapturedOutput, tokio::task::JoinError>) -> CapturedOutput {
    res.unwrap_or_else(|e| {
        warn!(error = %e, "output collector failed; output lost");
        CapturedOutput::default()
    })
}

/// Forward complete lines from `reader`. A trailing line without `\n` is
/// sent once the stream ends.
async fn pump_lines<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(OutputLine { stream, text }).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(?stream, error = %e, "error reading command output");
                break;
            }
        }
    }
}
