//! The runtime host bridge: a long-lived external JavaScript process
//! that receives compiled programs on stdin and answers with one JSON
//! frame per submission on stdout.
//!
//! There is no framing beyond "one line per response"; the bridge
//! writes a program, waits a settle interval, and reads exactly one
//! line back. This is the one genuinely fragile piece of the pipeline
//! (see the open question about timing-based synchronization) and is
//! kept isolated here rather than leaking its assumptions elsewhere.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::HostError;
use crate::pp::{self, HostFrame};

const DEFAULT_HOST_BIN: &str = "node";
const DEFAULT_SETTLE: Duration = Duration::from_millis(20);
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Where to find the host binary, and how long to wait for it.
///
/// Not part of the source spec proper; every compiler driver needs
/// somewhere to point at its external tool, and `WISP_HOST` /
/// `WISP_HOST_TIMEOUT_MS` are the env-var analogue of that.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host_bin: String,
    pub settle: Duration,
    pub timeout: Duration,
}

impl RuntimeConfig {
    /// Reads `WISP_HOST` and `WISP_HOST_TIMEOUT_MS` from the
    /// environment, falling back to sane defaults when unset or
    /// unparsable.
    pub fn from_env() -> Self {
        let host_bin =
            std::env::var("WISP_HOST").unwrap_or_else(|_| DEFAULT_HOST_BIN.to_string());
        let timeout = std::env::var("WISP_HOST_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self {
            host_bin,
            settle: DEFAULT_SETTLE,
            timeout,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host_bin: DEFAULT_HOST_BIN.to_string(),
            settle: DEFAULT_SETTLE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A spawned host process plus the pipe that feeds it.
///
/// `lines` delivers stdout lines from a dedicated reader thread so
/// `send` can enforce `timeout` with `recv_timeout` rather than
/// blocking forever on a bad or stuck host.
pub struct Runtime {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<std::io::Result<String>>,
    config: RuntimeConfig,
}

impl Runtime {
    /// Spawns the host process and primes it with `stdlib_source`
    /// (already-transpiled JavaScript), mirroring the original's
    /// priming send of the compiled stdlib before the first real
    /// submission.
    pub fn spawn(config: RuntimeConfig, stdlib_source: &str) -> Result<Self, HostError> {
        let mut child = Command::new(&config.host_bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(HostError::Spawn)?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                log::warn!("host stderr: {line}");
            }
        });

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut runtime = Self {
            child,
            stdin,
            lines: rx,
            config,
        };
        runtime.send(stdlib_source)?;
        Ok(runtime)
    }

    /// Writes `program` to the host's stdin, waits the settle
    /// interval, then reads exactly one response line.
    pub fn send(&mut self, program: &str) -> Result<HostFrame, HostError> {
        self.stdin
            .write_all(program.as_bytes())
            .map_err(HostError::Io)?;
        self.stdin.flush().map_err(HostError::Io)?;

        thread::sleep(self.config.settle);

        let start = Instant::now();
        let remaining = self
            .config
            .timeout
            .checked_sub(start.elapsed())
            .unwrap_or(Duration::ZERO);
        let line = self
            .lines
            .recv_timeout(remaining)
            .map_err(|_| HostError::Timeout {
                waited_ms: self.config.timeout.as_millis() as u64,
            })?
            .map_err(HostError::Io)?;

        pp::parse_frame(&line).map_err(|_| HostError::MalformedFrame { line })
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_node_with_no_timeout_override() {
        let config = RuntimeConfig::default();
        assert_eq!(config.host_bin, "node");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn from_env_falls_back_when_unset() {
        std::env::remove_var("WISP_HOST");
        std::env::remove_var("WISP_HOST_TIMEOUT_MS");
        let config = RuntimeConfig::from_env();
        assert_eq!(config.host_bin, "node");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
