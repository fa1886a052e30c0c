// src/exec/log_sink.rs

//! Shared, append-only sink for completed-run records.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::engine::Rule;
use crate::exec::output::CapturedOutput;
use crate::types::LogTarget;

/// Destination for run records, shared by all rules.
///
/// Each record is written with a single `write_all` while holding the lock,
/// so records from concurrent runs never interleave.
///
/// The `stdout` / `stderr` targets write through the locked std handle, the
/// same lock the diagnostics subscriber takes for each line, so a record and
/// a log line cannot interleave either.
#[derive(Debug)]
pub struct LogSink {
    target: LogTarget,
    lock: Mutex<()>,
}

impl LogSink {
    pub fn new(target: LogTarget) -> Self {
        Self {
            target,
            lock: Mutex::new(()),
        }
    }

    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    /// Append one complete record.
    pub async fn append(&self, record: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;

        match &self.target {
            LogTarget::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                file.write_all(record.as_bytes()).await?;
                file.flush().await
            }
            LogTarget::Stdout => write_std(record, StdStream::Stdout).await,
            LogTarget::Stderr => write_std(record, StdStream::Stderr).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StdStream {
    Stdout,
    Stderr,
}

async fn write_std(record: &str, stream: StdStream) -> std::io::Result<()> {
    let record = record.to_owned();
    tokio::task::spawn_blocking(move || {
        use std::io::Write;

        match stream {
            StdStream::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(record.as_bytes())?;
                out.flush()
            }
            StdStream::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(record.as_bytes())?;
                err.flush()
            }
        }
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Format the record for one completed run.
///
/// ```text
/// event="push", match="ref == refs/heads/main", exec="./deploy.sh"
/// Mon, 19 Oct 2026 10:00:00 +0200
/// Took 1532 ms
/// [push:72d3162e] deploying...
/// [push:72d3162e] ! warning: something
///
/// ```
pub fn format_record(
    rule: &Rule,
    at: DateTime<Local>,
    elapsed: Duration,
    output: &CapturedOutput,
    line_prefix: &str,
) -> String {
    format!(
        "{rule}\n{}\nTook {} ms\n{}\n",
        at.to_rfc2822(),
        elapsed.as_millis(),
        output.prefixed(line_prefix)
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::RuleConfig;
    use crate::exec::output::{OutputLine, Stream};

    fn rule() -> Rule {
        Rule::from_config(0, &RuleConfig::new("push", "ref == x", "echo hi")).unwrap()
    }

    #[test]
    fn record_layout() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let output: CapturedOutput = [OutputLine {
            stream: Stream::Stdout,
            text: "hi".into(),
        }]
        .into_iter()
        .collect();

        let record = format_record(&rule(), at, Duration::from_millis(12), &output, "[p] ");
        let lines: Vec<&str> = record.lines().collect();

        assert_eq!(lines[0], r#"event="push", match="ref == x", exec="echo hi""#);
        assert_eq!(lines[1], at.to_rfc2822());
        assert_eq!(lines[2], "Took 12 ms");
        assert_eq!(lines[3], "[p] hi");
        assert_eq!(lines[4], "");
        assert!(record.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn file_sink_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.log");
        let sink = LogSink::new(LogTarget::File(path.clone()));

        sink.append("first\n").await.unwrap();
        sink.append("second\n").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn std_stream_sinks_accept_records() {
        let sink = LogSink::new(LogTarget::Stderr);
        sink.append("").await.unwrap();
        assert_eq!(sink.target(), &LogTarget::Stderr);
    }

    #[tokio::test]
    async fn file_sink_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::new(LogTarget::File(dir.path().join("missing/dir/hooks.log")));
        assert!(sink.append("record\n").await.is_err());
    }
}
