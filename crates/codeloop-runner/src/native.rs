use codeloop_utils::RunnerError;
use std::io::Read;
use std::process::{Child, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{CommandSpec, ProcessOutput, ProcessRunner};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long stray processes may keep stderr open after the child exits or
/// is killed.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Runs commands directly with `std::process::Command`.
///
/// Stdout is discarded and stderr is captured. The child leads its own
/// process group on Unix and is placed in a Job Object on Windows, so a
/// timeout kills everything it started, not just the direct child. The
/// call returns within the timeout plus a short grace period even when a
/// grandchild holds on to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        #[cfg(windows)]
        let job = job::JobObject::new()?;

        let mut child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;

        let mut tree = ProcessTree {
            pid: child.id(),
            #[cfg(windows)]
            job: Some(job),
        };

        #[cfg(windows)]
        {
            if let Err(e) = tree.assign(&child) {
                tree.kill(&mut child);
                let _ = child.wait();
                return Err(e);
            }
        }

        let stderr = StderrCollector::start(&mut child);
        let deadline = Instant::now() + timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() >= deadline => break None,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    tree.kill(&mut child);
                    let _ = child.wait();
                    return Err(RunnerError::MonitorFailed {
                        reason: format!("Failed to wait for process: {e}"),
                    });
                }
            }
        };

        let Some(status) = status else {
            warn!(command = %cmd, timeout_secs = timeout.as_secs(), "Killing timed-out process group");
            tree.kill(&mut child);
            let _ = child.wait();
            stderr.wait(STDERR_GRACE);
            return Err(RunnerError::Timeout {
                timeout_seconds: timeout.as_secs(),
            });
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !stderr.wait(remaining.min(STDERR_GRACE)) {
            debug!(command = %cmd, "Killing leftover processes holding stderr");
            tree.kill(&mut child);
            stderr.wait(STDERR_GRACE);
        }

        Ok(ProcessOutput::new(stderr.into_bytes(), status.code()))
    }
}

/// A spawned child together with every process it starts.
struct ProcessTree {
    pid: u32,
    #[cfg(windows)]
    job: Option<job::JobObject>,
}

impl ProcessTree {
    #[cfg(windows)]
    fn assign(&self, child: &Child) -> Result<(), RunnerError> {
        match &self.job {
            Some(job) => job.assign(child),
            None => Ok(()),
        }
    }

    fn kill(&mut self, child: &mut Child) {
        #[cfg(unix)]
        {
            // SAFETY: killpg(2) has no memory-safety preconditions; a group
            // with no members left only produces ESRCH.
            unsafe {
                libc::killpg(self.pid as libc::pid_t, libc::SIGKILL);
            }
        }

        #[cfg(windows)]
        {
            // Closing the job terminates every process assigned to it.
            self.job.take();
        }

        #[cfg(not(unix))]
        {
            let _ = self.pid;
        }

        let _ = child.kill();
    }
}

/// Drains a child's stderr on a helper thread.
///
/// Bytes are collected incrementally, so whatever was read is still
/// available when the pipe is abandoned before EOF.
struct StderrCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl StderrCollector {
    fn start(child: &mut Child) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();

        if let Some(mut pipe) = child.stderr.take() {
            let sink = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut buf) = sink.lock() {
                                buf.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(_) => break,
                    }
                }
                let _ = tx.send(());
            });
        }

        Self { buffer, done }
    }

    /// Waits up to `limit` for the pipe to close. Returns `false` if it is
    /// still open.
    fn wait(&self, limit: Duration) -> bool {
        !matches!(
            self.done.recv_timeout(limit),
            Err(mpsc::RecvTimeoutError::Timeout)
        )
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

#[cfg(windows)]
mod job {
    use codeloop_utils::RunnerError;
    use std::process::Child;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};

    /// Job Object that kills its processes when the handle is closed.
    pub(super) struct JobObject {
        handle: HANDLE,
    }

    impl JobObject {
        pub(super) fn new() -> Result<Self, RunnerError> {
            use windows::Win32::System::JobObjects::{
                CreateJobObjectW, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
                JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JobObjectExtendedLimitInformation,
                SetInformationJobObject,
            };

            // SAFETY: `info` is a plain-data struct that is valid when zeroed,
            // and the job handle is owned by the returned value.
            unsafe {
                let handle = CreateJobObjectW(None, None).map_err(|e| {
                    RunnerError::MonitorFailed {
                        reason: format!("Failed to create Job Object: {e}"),
                    }
                })?;
                let job = Self { handle };

                let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = std::mem::zeroed();
                info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;

                SetInformationJobObject(
                    job.handle,
                    JobObjectExtendedLimitInformation,
                    (&raw const info).cast(),
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                )
                .map_err(|e| RunnerError::MonitorFailed {
                    reason: format!("Failed to configure Job Object: {e}"),
                })?;

                Ok(job)
            }
        }

        pub(super) fn assign(&self, child: &Child) -> Result<(), RunnerError> {
            use windows::Win32::System::JobObjects::AssignProcessToJobObject;
            use windows::Win32::System::Threading::{OpenProcess, PROCESS_ALL_ACCESS};

            // SAFETY: the process handle is closed on every path.
            unsafe {
                let process = OpenProcess(PROCESS_ALL_ACCESS, false, child.id()).map_err(|e| {
                    RunnerError::MonitorFailed {
                        reason: format!("Failed to open process for job assignment: {e}"),
                    }
                })?;
                let assigned = AssignProcessToJobObject(self.handle, process);
                let _ = CloseHandle(process);
                assigned.map_err(|e| RunnerError::MonitorFailed {
                    reason: format!("Failed to assign process to Job Object: {e}"),
                })
            }
        }
    }

    impl Drop for JobObject {
        fn drop(&mut self) {
            // SAFETY: the handle came from CreateJobObjectW and is closed once.
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }
}
