//! Command executor: runs shell commands with live tail display, full output
//! logging and failure capture.

use std::{path::PathBuf, pin::Pin, process::Stdio, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::{stream, StreamExt};
use is_terminal::IsTerminal;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

use crate::logging::RunLog;

pub mod tail;

pub use tail::{LiveTail, TailView};

/// Exit code reported for commands killed by their timeout, as coreutils `timeout` does.
/// Timed commands run in their own process group and the whole group is killed.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Trailing output lines, already redacted.
    pub captured_output: Vec<String>,
    pub description: String,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// First captured line, trimmed; handy for version probes.
    pub fn first_line(&self) -> Option<&str> {
        self.captured_output
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    log: Arc<RunLog>,
    shell: String,
    tail_lines: usize,
    live: bool,
    workdir: Option<PathBuf>,
}

impl Executor {
    pub fn new(log: Arc<RunLog>, tail_lines: usize) -> Self {
        Self {
            log,
            shell: "/bin/sh".into(),
            tail_lines,
            live: std::io::stdout().is_terminal(),
            workdir: None,
        }
    }

    /// Force the live tail view on or off (it defaults to on for a TTY).
    pub fn with_live_view(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Executor running commands from `dir`.
    pub fn in_dir(&self, dir: impl Into<PathBuf>) -> Self {
        let mut e = self.clone();
        e.workdir = Some(dir.into());
        e
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub async fn run(&self, command: &str, description: &str) -> Result<ExecutionResult> {
        self.run_with_timeout(command, description, None).await
    }

    pub async fn run_with_timeout(
        &self,
        command: &str,
        description: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecutionResult> {
        let mut view = TailView::new(self.live);
        let result = self
            .execute(command, description, timeout, |tail| view.render(tail))
            .await;
        view.clear();
        let result = result?;

        if !result.success() {
            let header = if result.timed_out {
                format!("{} timed out: {}", description, command)
            } else {
                format!("{} failed (exit {}): {}", description, result.exit_code, command)
            };
            self.log.error_block(&header, &result.captured_output);
        }
        Ok(result)
    }

    /// Quiet run for read-only checks: no live view, no error log entry.
    pub async fn probe(&self, command: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        self.execute(command, "probe", timeout, |_| {}).await
    }

    async fn execute(
        &self,
        command: &str,
        description: &str,
        timeout: Option<Duration>,
        mut on_line: impl FnMut(&LiveTail),
    ) -> Result<ExecutionResult> {
        let redactor = self.log.redactor();
        log::debug!("exec [{}]: {}", description, redactor.apply(command));
        self.log.output(&format!("$ {}", command));

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        if timeout.is_some() {
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {} for: {}", self.shell, description))?;
        let stdout = child.stdout.take().context("no stdout")?;
        let stderr = child.stderr.take().context("no stderr")?;

        let mut lines = stream::select(line_stream(stdout), line_stream(stderr));
        let mut tail = LiveTail::new(self.tail_lines);

        let drive = async {
            while let Some(line) = lines.next().await {
                let line = redactor.apply(&line?);
                self.log.output(&line);
                tail.push(line);
                on_line(&tail);
            }
            child.wait().await
        };

        let (exit_code, timed_out) = match timeout {
            Some(limit) => match tokio::time::timeout(limit, drive).await {
                Ok(status) => (status?.code().unwrap_or(-1), false),
                Err(_) => {
                    if let Some(pid) = child.id() {
                        kill_group(pid).await;
                    }
                    let _ = child.kill().await;
                    (TIMEOUT_EXIT_CODE, true)
                }
            },
            None => (drive.await?.code().unwrap_or(-1), false),
        };

        self.log.output(&format!("exit {}", exit_code));
        Ok(ExecutionResult {
            exit_code,
            captured_output: tail.snapshot(),
            description: description.to_string(),
            timed_out,
        })
    }
}

type LineStream = Pin<Box<dyn Stream<Item = std::io::Result<String>> + Send>>;

fn line_stream<R>(reader: R) -> LineStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(try_stream! {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            yield decode_line(&buf);
        }
    })
}

/// Lossy UTF-8 decode without the line terminator.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// SIGKILL every process in the group led by `pid`.
async fn kill_group(pid: u32) {
    let group = format!("-{}", pid);
    let status = Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = status {
        log::warn!("could not kill process group {}: {}", pid, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"plain\n"), "plain");
        assert_eq!(decode_line(b"dos\r\n"), "dos");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{fffd}");
    }
}
