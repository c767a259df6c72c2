//! Cancellable external process execution.
//!
//! Every external command (git, go, test binaries) runs through
//! [`run_command`], which polls the child and kills it as soon as the
//! [`CancelToken`] fires or the run deadline passes.

use std::env;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{BenchError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cooperative cancellation signal with an optional deadline.
///
/// Child tokens observe their parent: cancelling a child leaves the parent
/// untouched, cancelling the parent cancels every child.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::default()
        }
    }

    /// Derive a token that can be cancelled independently of `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: self.deadline,
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Shared flag, for wiring into signal handlers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    #[must_use]
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline_exceeded()
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Return the matching error if the token has fired.
    ///
    /// # Errors
    ///
    /// `DeadlineExceeded` once the deadline passed, `Cancelled` if the token
    /// or one of its ancestors was cancelled.
    pub fn check(&self) -> Result<()> {
        if self.deadline_exceeded() {
            return Err(BenchError::DeadlineExceeded);
        }
        if self.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Render a command line for logs and error messages.
#[must_use]
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run a command to completion, killing it if `cancel` fires.
///
/// Stdout and stderr are drained on helper threads so a chatty child never
/// blocks on a full pipe.
///
/// # Errors
///
/// Returns an I/O error if the process cannot be spawned, or the token's
/// error if the run was cancelled while the child was alive.
pub fn run_command(cmd: &mut Command, cancel: &CancelToken) -> Result<CommandOutput> {
    cancel.check()?;
    let description = describe(cmd);
    trace!(command = %description, "spawning");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            debug!(command = %description, "terminating process after cancellation");
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout.join();
            let _ = stderr.join();
            return Err(cancel.check().err().unwrap_or(BenchError::Cancelled));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Like [`run_command`], but a non-zero exit status is an error.
///
/// # Errors
///
/// Returns `CommandFailed` carrying stderr when the process exits
/// unsuccessfully, plus every error of [`run_command`].
pub fn run_checked(cmd: &mut Command, cancel: &CancelToken) -> Result<CommandOutput> {
    let output = run_command(cmd, cancel)?;
    if output.status.success() {
        return Ok(output);
    }
    Err(BenchError::CommandFailed {
        command: describe(cmd),
        status: output.status.to_string(),
        stderr: output.stderr_lossy().trim().to_string(),
    })
}

/// Locate an executable on `PATH`.
///
/// # Errors
///
/// Returns `MissingTool` if no matching executable is found.
pub fn require_tool(tool: &str) -> Result<PathBuf> {
    find_in_path(tool, env::var_os("PATH").as_deref()).ok_or_else(|| BenchError::MissingTool {
        tool: tool.to_string(),
    })
}

fn find_in_path(tool: &str, path: Option<&OsStr>) -> Option<PathBuf> {
    let path = path?;
    env::split_paths(path).find_map(|dir| {
        let candidate = dir.join(tool);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{tool}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
