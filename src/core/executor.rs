use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Exit code reported when a command exceeds its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What an external command did: exit code plus captured text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The sentinel returned when the deadline expires.
    pub fn timed_out() -> Self {
        Self::new(TIMEOUT_EXIT_CODE, "", "timed out")
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn is_timeout(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    /// stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands on behalf of the checks.
///
/// Implementations never fail: a non-zero exit is a normal result, and a
/// command that cannot be started is folded into a `CommandResult` with a
/// synthetic exit code and the fault text in `stderr`. This abstraction also
/// lets the scenarios be driven by a scripted fake in tests.
pub trait CommandExecutor {
    /// Runs `command` (program followed by its arguments) in `working_dir`,
    /// or in the project root when `None`, for at most `timeout`.
    fn execute(&self, command: &[&str], working_dir: Option<&Path>, timeout: Duration)
    -> CommandResult;
}

/// `CommandExecutor` backed by real child processes.
pub struct ProcessExecutor {
    project_root: PathBuf,
}

impl ProcessExecutor {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(
        &self,
        command: &[&str],
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> CommandResult {
        let Some((program, args)) = command.split_first() else {
            return CommandResult::new(1, "", "empty command");
        };
        let cwd = working_dir.unwrap_or(&self.project_root);
        let started = Instant::now();

        let spawned = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                tracing::debug!(command = %command.join(" "), error = %err, "failed to start");
                return fault_result(command, &err);
            }
        };

        // Pipes are drained on their own threads so a chatty child cannot
        // fill a pipe buffer and stall before the deadline.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // A timeout too large to add to `Instant` means no deadline at all.
        let waited = match started.checked_add(timeout) {
            Some(deadline) => wait_with_deadline(&mut child, deadline),
            None => child.wait().map(Some),
        };

        match waited {
            Ok(Some(status)) => {
                let result = CommandResult::new(exit_code(status), collect(stdout), collect(stderr));
                tracing::debug!(
                    command = %command.join(" "),
                    exit_code = result.exit_code,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "command finished"
                );
                result
            }
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipes open, so the reader
                // threads are detached rather than joined.
                tracing::warn!(
                    command = %command.join(" "),
                    timeout_ms = timeout.as_millis() as u64,
                    "command timed out"
                );
                CommandResult::timed_out()
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                fault_result(command, &err)
            }
        }
    }
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn fault_result(command: &[&str], err: &std::io::Error) -> CommandResult {
    let code = match err.kind() {
        ErrorKind::NotFound => 127,
        ErrorKind::PermissionDenied => 126,
        _ => 1,
    };
    CommandResult::new(
        code,
        "",
        format!("failed to run `{}`: {err}", command.join(" ")),
    )
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
