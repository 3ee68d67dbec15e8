use crate::factory::{PlatformHandle, PlatformProcessManagerFactory};
use shellpump_core::{
    ProcessId, ProcessInfo, ProcessManagerFactory, ProcessStatus, ShellConfig, ShellError,
    ShellProcess,
};
use std::time::Duration;
use tracing::debug;

/// A shell command running on the current platform with its output captured
///
/// All methods take `&self`, so a `Shell` can be wrapped in an `Arc` and
/// polled from several threads at once.
pub struct Shell {
    inner: ShellProcess<PlatformHandle>,
}

impl Shell {
    /// Spawn `command` through the platform shell with default settings
    pub fn new(command: impl Into<String>) -> Result<Self, ShellError> {
        Self::with_config(ShellConfig::new(command))
    }

    pub fn with_config(config: ShellConfig) -> Result<Self, ShellError> {
        debug!(
            platform = PlatformProcessManagerFactory::platform_name(),
            command = %config.command,
            "Starting shell"
        );
        let manager = PlatformProcessManagerFactory::create_process_manager();
        let inner = ShellProcess::spawn_with(&manager, config)?;
        Ok(Self { inner })
    }

    pub fn process_id(&self) -> ProcessId {
        self.inner.process_id()
    }

    pub fn config(&self) -> &ShellConfig {
        self.inner.config()
    }

    /// Everything written to stdout since the last call, possibly empty
    pub fn read_output(&self) -> String {
        self.inner.read_output()
    }

    /// Everything written to stderr since the last call, possibly empty
    pub fn read_error(&self) -> String {
        self.inner.read_error()
    }

    pub fn read_output_bytes(&self) -> Vec<u8> {
        self.inner.read_output_bytes()
    }

    pub fn read_error_bytes(&self) -> Vec<u8> {
        self.inner.read_error_bytes()
    }

    /// Send `input` to the child's stdin
    pub fn write(&self, input: &str) -> Result<(), ShellError> {
        self.inner.write(input)
    }

    pub fn write_bytes(&self, bytes: &[u8]) -> Result<(), ShellError> {
        self.inner.write_bytes(bytes)
    }

    pub fn close_input(&self) {
        self.inner.close_input()
    }

    /// Terminate the child and report it as exited with code 1 from now on
    pub fn force_exit(&self) {
        self.inner.force_exit()
    }

    pub fn has_exited(&self) -> bool {
        self.inner.has_exited()
    }

    pub fn exit_status(&self) -> Option<i32> {
        self.inner.exit_status()
    }

    /// Exit code, or `-1` while the child is running
    pub fn exit_code(&self) -> i32 {
        self.inner.exit_code()
    }

    pub fn status(&self) -> ProcessStatus {
        self.inner.status()
    }

    pub fn info(&self) -> ProcessInfo {
        self.inner.info()
    }

    pub fn wait(&self) -> Result<i32, ShellError> {
        self.inner.wait()
    }

    pub async fn wait_for_exit(&self, timeout: Option<Duration>) -> Result<i32, ShellError> {
        self.inner.wait_for_exit(timeout).await
    }
}
