//! The supervisor handle: spawn, drive and reap one line-oriented child

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, trace, warn};

use crate::config::SpawnConfig;
use crate::error::{Result, SupervisorError};
use crate::mirror::MirrorHub;
use crate::reader::{drain_lines, ReadResult};

/// Bound on the blocking reap after a forced kill
const KILL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of the currently running child. Cleared once the child is
/// confirmed exited; the pipe ends are held separately so output the child
/// wrote before dying can still be drained after the reap.
struct RunningChild {
    child: Child,
    pid: u32,
}

/// Supervises one line-oriented command/response child process.
///
/// One handle drives one child at a time from one task; every operation takes
/// `&mut self`, so concurrent calls on a shared handle do not compile. A
/// handle may be relaunched after its previous child is confirmed dead.
///
/// The child is spawned with `kill_on_drop`, so a handle that is dropped
/// without [`Supervisor::shutdown`] still kills its child; `shutdown` is the
/// deterministic path that also reaps the exit status before returning.
pub struct Supervisor {
    config: SpawnConfig,
    running: Option<RunningChild>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    mirror: MirrorHub,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("command", &self.config.command)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Create a handle for `config`. No OS resources are allocated until
    /// [`Supervisor::spawn`].
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            running: None,
            stdin: None,
            stdout: None,
            mirror: MirrorHub::new(),
        }
    }

    /// Path of the supervised executable
    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Pid of the running child, if one is currently tracked
    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pid)
    }

    /// Line fan-out hub for this handle
    pub fn mirror(&self) -> &MirrorHub {
        &self.mirror
    }

    /// Mutable access to the fan-out hub, e.g. to toggle console echo
    pub fn mirror_mut(&mut self) -> &mut MirrorHub {
        &mut self.mirror
    }

    /// Spawn the configured child with piped stdin/stdout.
    ///
    /// On Unix the child runs in its own process group: a terminal interrupt
    /// aimed at the supervisor never reaches it, and teardown kills the whole
    /// group. Returns the child's pid.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::AlreadyRunning`] if a live child is still tracked,
    /// [`SupervisorError::SpawnFailed`] if the OS cannot start the command.
    pub fn spawn(&mut self) -> Result<u32> {
        if self.is_alive()? {
            return Err(SupervisorError::AlreadyRunning);
        }

        debug!(
            command = %self.config.command,
            args = ?self.config.args,
            "spawning child"
        );

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(SupervisorError::SpawnFailed)?;
        let pid = child
            .id()
            .ok_or_else(|| missing_after_spawn("child exited before its pid could be read"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| missing_after_spawn("child stdin pipe missing"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| missing_after_spawn("child stdout pipe missing"))?;

        info!(pid, command = %self.config.command, "child process started");
        self.running = Some(RunningChild { child, pid });
        self.stdin = Some(stdin);
        self.stdout = Some(stdout);
        Ok(pid)
    }

    /// Non-blocking liveness check.
    ///
    /// The first call after the child exits collects its status and clears
    /// the tracked pid; every later call returns `false` without error. The
    /// stdout pipe stays open across the reap, so output the child wrote
    /// before dying can still be read afterwards.
    pub fn is_alive(&mut self) -> Result<bool> {
        let Some(running) = self.running.as_mut() else {
            return Ok(false);
        };
        match running.child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) => {
                debug!(pid = running.pid, %status, "child exited");
                self.running = None;
                Ok(false)
            }
            Err(e) => Err(SupervisorError::WaitFailed(e)),
        }
    }

    /// Write one command to the child's stdin, terminated by exactly one
    /// `'\n'` (appended only when `text` does not already end with one).
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotRunning`] if no live child is tracked,
    /// [`SupervisorError::SendFailed`] if the write fails.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        if !self.is_alive()? {
            return Err(SupervisorError::NotRunning);
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SupervisorError::NotRunning);
        };

        let mut buf = text.as_bytes().to_vec();
        if !buf.ends_with(b"\n") {
            buf.push(b'\n');
        }
        stdin
            .write_all(&buf)
            .await
            .map_err(SupervisorError::SendFailed)?;
        stdin
            .flush()
            .await
            .map_err(SupervisorError::SendFailed)?;
        trace!(bytes = buf.len(), "command written");
        Ok(())
    }

    /// Read lines until the timeout elapses or the child closes its stdout.
    ///
    /// A zero `timeout` is substituted with the configured bounded default
    /// (never an infinite wait). Timeout and close are reported through
    /// [`ReadResult::outcome`], not as errors. The pipe outlives the child:
    /// lines written before an exit already collected by
    /// [`Supervisor::is_alive`] are still returned here, followed by
    /// `Closed`.
    pub async fn read_lines(&mut self, timeout: Duration) -> Result<ReadResult> {
        self.read_inner(timeout, None).await
    }

    /// Like [`Supervisor::read_lines`], but stop as soon as a line starting
    /// with `prefix` arrives (reported as [`ReadOutcome::Matched`]); bytes
    /// still in the pipe stay buffered for the next call. An empty `prefix`
    /// behaves like a plain read.
    ///
    /// [`ReadOutcome::Matched`]: crate::reader::ReadOutcome::Matched
    pub async fn read_until(&mut self, timeout: Duration, prefix: &str) -> Result<ReadResult> {
        let prefix = (!prefix.is_empty()).then_some(prefix);
        self.read_inner(timeout, prefix).await
    }

    async fn read_inner(&mut self, timeout: Duration, prefix: Option<&str>) -> Result<ReadResult> {
        let timeout = if timeout.is_zero() {
            self.config.default_read_timeout
        } else {
            timeout
        };
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(SupervisorError::NotRunning);
        };
        drain_lines(stdout, timeout, prefix, &self.mirror).await
    }

    /// Deterministic teardown: reap an already-exited child, or kill a
    /// running one and block until the OS confirms its exit, guaranteeing no
    /// process-table entry is leaked. Both pipe ends are closed. A no-op
    /// when nothing is tracked, so it is safe to call repeatedly.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stdin = None;
        self.stdout = None;
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };

        match running.child.try_wait() {
            Ok(Some(status)) => {
                // That wait collected the status; nothing left to reap.
                debug!(pid = running.pid, %status, "child already exited");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => return Err(SupervisorError::WaitFailed(e)),
        }

        debug!(pid = running.pid, "killing child");
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Err(e) = killpg(Pid::from_raw(running.pid as i32), Signal::SIGKILL) {
                warn!(pid = running.pid, error = %e, "killpg failed, killing child directly");
                running
                    .child
                    .start_kill()
                    .map_err(|e| SupervisorError::KillFailed(e.to_string()))?;
            }
        }
        #[cfg(not(unix))]
        running
            .child
            .start_kill()
            .map_err(|e| SupervisorError::KillFailed(e.to_string()))?;

        match tokio::time::timeout(KILL_WAIT_TIMEOUT, running.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = running.pid, %status, "child reaped");
                Ok(())
            }
            Ok(Err(e)) => Err(SupervisorError::WaitFailed(e)),
            Err(_) => Err(SupervisorError::KillFailed(format!(
                "child {} did not exit after SIGKILL",
                running.pid
            ))),
        }
    }
}

fn missing_after_spawn(what: &str) -> SupervisorError {
    SupervisorError::SpawnFailed(io::Error::new(io::ErrorKind::Other, what))
}
