use crate::GitError;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// How often the runner polls a still-running child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of one external command invocation.
///
/// A non-zero exit status is data, not an error: the caller decides whether a
/// failed invocation is fatal.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Exit code, if the process exited normally before any timeout.
    pub code: Option<i32>,
    /// True when the child was killed after exceeding the timeout.
    pub timed_out: bool,
    /// Merged stdout/stderr, in line arrival order.
    pub output: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }
}

/// Spawn an external process and stream its merged output.
///
/// stdout and stderr are piped and drained by dedicated threads, so draining
/// and exit-waiting are concurrent and the runner cannot deadlock on a child
/// that fills its pipes. Each completed line is forwarded to the log as it
/// arrives (unless `silent`) and collected into the merged output buffer.
///
/// When `timeout` is set and expires, the child is killed and the result is
/// marked `timed_out` instead of carrying an exit code.
pub fn run_streamed(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    silent: bool,
    timeout: Option<Duration>,
) -> Result<RunResult, GitError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|source| GitError::Spawn {
        program: program.to_owned(),
        source,
    })?;

    let lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(drain(stdout, Arc::clone(&lines), program.to_owned(), silent));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(drain(stderr, Arc::clone(&lines), program.to_owned(), silent));
    }

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if timeout.is_some_and(|limit| started.elapsed() >= limit) {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Io(err));
            }
        }
    };

    for handle in readers {
        let _ = handle.join();
    }

    let output = lines
        .lock()
        .map_or_else(|_| String::new(), |v| v.join("\n"));
    Ok(RunResult {
        code: status.and_then(|s| s.code()),
        timed_out: status.is_none(),
        output,
    })
}

fn drain(
    reader: impl Read + Send + 'static,
    sink: Arc<Mutex<Vec<String>>>,
    program: String,
    silent: bool,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if !silent && !line.trim().is_empty() {
                info!("[{program}] {line}");
            }
            if let Ok(mut buffer) = sink.lock() {
                buffer.push(line);
            }
        }
    })
}
