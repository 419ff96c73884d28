//! Subprocess execution utilities.
//!
//! Every child is waited on cooperatively so that an interrupt can stop it
//! without leaving it orphaned.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::util::cancel::CancelToken;

/// How long a cancelled child may take to exit before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of waiting on a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waited {
    /// The child exited on its own, possibly after a cancellation.
    Exited(ExitStatus),
    /// The wait was cancelled and the child had to be killed.
    Cancelled,
}

/// Output of a captured invocation.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// How the child ended
    pub waited: Waited,

    /// Interleaved stdout and stderr, in arrival order per line
    pub combined: String,

    /// Standard output alone
    pub stdout: String,
}

impl CapturedOutput {
    /// Check whether the child exited successfully.
    pub fn success(&self) -> bool {
        matches!(self.waited, Waited::Exited(status) if status.success())
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    echo: bool,
    grace_period: Duration,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            echo: true,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Forward captured output to stderr as it arrives.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set how long a cancelled child may take to exit.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment override.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run with inherited stdio, waiting cooperatively.
    pub fn run_inherited(&self, cancel: &CancelToken) -> io::Result<Waited> {
        tracing::debug!("exec: {}", self.display_command());
        let mut child = self
            .build_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        wait_cancellable(&mut child, cancel, self.grace_period)
    }

    /// Run with stdout and stderr captured into one buffer.
    ///
    /// When echo is on, lines are also forwarded to our stderr as they
    /// arrive, keeping our stdout free for the artifact.
    pub fn exec_captured(&self, cancel: &CancelToken) -> io::Result<CapturedOutput> {
        tracing::info!("exec: {}", self.display_command());
        let mut child = self
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let combined = Arc::new(Mutex::new(String::new()));
        let stdout = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::new();
        if let Some(out) = child.stdout.take() {
            let sinks = vec![Arc::clone(&combined), Arc::clone(&stdout)];
            readers.push(spawn_reader(out, sinks, self.echo));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(spawn_reader(err, vec![Arc::clone(&combined)], self.echo));
        }

        let waited = wait_cancellable(&mut child, cancel, self.grace_period)?;
        for reader in readers {
            let _ = reader.join();
        }

        Ok(CapturedOutput {
            waited,
            combined: take_buffer(combined),
            stdout: take_buffer(stdout),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn take_buffer(buffer: Arc<Mutex<String>>) -> String {
    match Arc::try_unwrap(buffer) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|e| e.into_inner()),
        Err(shared) => shared.lock().map(|s| s.clone()).unwrap_or_default(),
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    sinks: Vec<Arc<Mutex<String>>>,
    echo: bool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    if echo {
                        let _ = io::stderr().lock().write_all(line.as_bytes());
                    }
                    for sink in &sinks {
                        if let Ok(mut sink) = sink.lock() {
                            sink.push_str(&line);
                        }
                    }
                }
            }
        }
    })
}

/// Wait for a child, honoring cancellation.
///
/// Once cancelled the child gets `grace` to exit by itself (it normally
/// received the interrupt too) before it is killed. A child that exits
/// within the grace period reports its own status.
pub fn wait_cancellable(
    child: &mut Child,
    cancel: &CancelToken,
    grace: Duration,
) -> io::Result<Waited> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Waited::Exited(status));
        }
        if cancel.is_cancelled() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Ok(Waited::Exited(status));
        }
        thread::sleep(POLL_INTERVAL);
    }

    tracing::warn!("Child process {} did not exit in time; killing it", child.id());
    match child.kill() {
        Ok(()) => {}
        // Already exited between the last poll and the kill
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => return Err(e),
    }
    child.wait()?;
    Ok(Waited::Cancelled)
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
