use crate::config::ShellConfig;
use crate::error::ShellError;
use std::fmt;
use std::io::{self, Write};

/// Unique identifier for a process
pub type ProcessId = u32;

/// Exit code reported while the process is still running
pub const RUNNING_EXIT_CODE: i32 = -1;

/// Exit code latched by `force_exit`
pub const FORCED_EXIT_CODE: i32 = 1;

/// Exit code reported for a child that did not exit normally (signal death)
pub const ABNORMAL_EXIT_CODE: i32 = 1;

/// Status of a process as observed by a liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process is currently running
    Running,
    /// Process exited normally with the given exit code
    Exited(i32),
    /// Process was terminated by the given signal (Unix only)
    Signaled(i32),
}

impl ProcessStatus {
    /// Normalized exit code, `None` while running
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessStatus::Running => None,
            ProcessStatus::Exited(code) => Some(*code),
            ProcessStatus::Signaled(_) => Some(ABNORMAL_EXIT_CODE),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }
}

/// Result of a process termination operation
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Termination request was delivered
    Success,
    /// Process was not found (already exited and reaped)
    ProcessNotFound,
    /// Permission denied (insufficient privileges)
    PermissionDenied,
    /// Operation failed with specific error message
    Failed(String),
}

impl TerminationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminationResult::Success)
    }
}

/// Information about a spawned process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub command: String,
    pub status: ProcessStatus,
}

/// Which output channel of the child a pump or buffer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Outcome of a single non-blocking read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the caller's buffer
    Data(usize),
    /// No data is available right now
    WouldBlock,
    /// End-of-stream or a definitive read error
    Closed,
}

/// Parent-side read end of an output channel
///
/// Implementations never block: when the pipe is empty they return
/// [`ReadOutcome::WouldBlock`]. Dropping the reader closes the channel end.
pub trait PipeReader: Send {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> ReadOutcome;
}

impl PipeReader for Box<dyn PipeReader> {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> ReadOutcome {
        (**self).read_nonblocking(buf)
    }
}

/// Trait representing a handle to a spawned process
pub trait ProcessHandle: Send {
    /// Get the process ID
    fn pid(&self) -> ProcessId;

    /// Try to get the exit status without blocking
    ///
    /// Returns `Ok(None)` while the process is running. Once an exit was
    /// observed the same status is returned on every later call.
    fn try_wait(&mut self) -> io::Result<Option<ProcessStatus>>;

    /// Wait for the process to exit (blocking)
    fn wait(&mut self) -> io::Result<ProcessStatus>;

    /// Politely ask the process to stop (SIGTERM on Unix)
    fn terminate_gracefully(&mut self) -> TerminationResult;

    /// Force kill the process (SIGKILL on Unix, TerminateProcess on Windows)
    fn force_kill(&mut self) -> TerminationResult;
}

/// Everything the platform layer hands over after a successful spawn
///
/// The child-side channel ends are already closed; the parent-side ends
/// below are owned exclusively and closed when dropped.
pub struct SpawnedProcess<H> {
    pub handle: H,
    pub stdin: Box<dyn Write + Send>,
    pub stdout: Box<dyn PipeReader>,
    pub stderr: Box<dyn PipeReader>,
}

/// Core trait for spawning shell processes on one platform
pub trait ProcessLifecycle: Send + Sync {
    /// The type of process handle this lifecycle manager produces
    type Handle: ProcessHandle;

    /// Spawn `config.command` through the platform shell with all three
    /// standard streams piped
    ///
    /// On failure nothing is left running and every channel created so far
    /// is closed.
    fn spawn_process(
        &self,
        config: &ShellConfig,
    ) -> Result<SpawnedProcess<Self::Handle>, ShellError>;
}

/// Factory trait for creating platform-specific process managers
pub trait ProcessManagerFactory {
    /// The type of process manager this factory creates
    type Manager: ProcessLifecycle;

    /// Create a process manager for the current platform
    fn create_process_manager() -> Self::Manager;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}
