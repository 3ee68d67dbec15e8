use std::io;
use std::time::Duration;
use thiserror::Error;

/// Core error types for shell process operations
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Failed to spawn process `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to process: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("Failed to query process state: {0}")]
    Wait(#[source] io::Error),

    #[error("Timed out after {0:?} waiting for process exit")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ShellError {
    pub fn spawn_failed(command: impl Into<String>, source: io::Error) -> Self {
        ShellError::SpawnFailed {
            command: command.into(),
            source,
        }
    }

    /// Check if this error means the child no longer accepts input
    ///
    /// A broken pipe on write usually means the process already exited or
    /// closed its standard input.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(
            self,
            ShellError::WriteFailed(e) if e.kind() == io::ErrorKind::BrokenPipe
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ShellError::SpawnFailed { .. } | ShellError::Configuration(_)
        ) || self.is_broken_pipe()
    }
}
