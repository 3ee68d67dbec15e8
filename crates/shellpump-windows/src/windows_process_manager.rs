#[cfg(windows)]
mod windows_impl {
    use shellpump_core::{
        PipeReader, ProcessHandle, ProcessId, ProcessLifecycle, ProcessStatus, ReadOutcome,
        ShellConfig, ShellError, SpawnedProcess, TerminationResult, ABNORMAL_EXIT_CODE,
        FORCED_EXIT_CODE,
    };
    use std::io::{self, Read};
    use std::os::windows::io::AsRawHandle;
    use std::os::windows::process::CommandExt;
    use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
    use tracing::{debug, info, warn};
    use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, HANDLE};
    use windows::Win32::System::Pipes::PeekNamedPipe;
    use windows::Win32::System::Threading::{CREATE_NO_WINDOW, TerminateProcess};

    const DEFAULT_SHELL: &str = "cmd.exe";

    /// Parent-side read end of an anonymous pipe
    ///
    /// Anonymous pipes cannot be switched to non-blocking mode, so every read
    /// is preceded by a peek and only asks for the bytes already available.
    pub struct WindowsPipeReader<R> {
        pipe: R,
    }

    impl<R: Read + AsRawHandle> WindowsPipeReader<R> {
        pub fn new(pipe: R) -> Self {
            Self { pipe }
        }

        fn available(&self) -> windows::core::Result<u32> {
            let mut available = 0u32;
            unsafe {
                PeekNamedPipe(
                    HANDLE(self.pipe.as_raw_handle()),
                    None,
                    0,
                    None,
                    Some(&mut available as *mut u32),
                    None,
                )?;
            }
            Ok(available)
        }
    }

    impl<R: Read + AsRawHandle + Send> PipeReader for WindowsPipeReader<R> {
        fn read_nonblocking(&mut self, buf: &mut [u8]) -> ReadOutcome {
            // a failed peek means the write end is gone
            let available = match self.available() {
                Ok(0) => return ReadOutcome::WouldBlock,
                Ok(n) => n as usize,
                Err(e) => {
                    debug!(error = %e, "Pipe peek failed, closing stream");
                    return ReadOutcome::Closed;
                }
            };

            let len = available.min(buf.len());
            loop {
                match self.pipe.read(&mut buf[..len]) {
                    Ok(0) => return ReadOutcome::Closed,
                    Ok(n) => return ReadOutcome::Data(n),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(error = %e, "Pipe read failed, closing stream");
                        return ReadOutcome::Closed;
                    }
                }
            }
        }
    }

    /// Windows-specific process handle implementation
    pub struct WindowsProcessHandle {
        child: Child,
        command: String,
        exited: Option<ProcessStatus>,
    }

    impl WindowsProcessHandle {
        pub fn new(child: Child, command: String) -> Self {
            Self {
                child,
                command,
                exited: None,
            }
        }

        pub fn command(&self) -> &str {
            &self.command
        }

        fn terminate(&self) -> TerminationResult {
            if self.exited.is_some() {
                return TerminationResult::ProcessNotFound;
            }

            let pid = self.child.id();
            let result = unsafe {
                TerminateProcess(HANDLE(self.child.as_raw_handle()), FORCED_EXIT_CODE as u32)
            };
            match result {
                Ok(()) => {
                    info!(pid = %pid, "Terminated Windows process");
                    TerminationResult::Success
                }
                Err(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult() => {
                    warn!(pid = %pid, "Permission denied to terminate process");
                    TerminationResult::PermissionDenied
                }
                Err(e) => {
                    warn!(pid = %pid, error = %e, "Failed to terminate process");
                    TerminationResult::Failed(format!("TerminateProcess failed: {e}"))
                }
            }
        }

        fn record(&mut self, status: ExitStatus) -> ProcessStatus {
            let status = ProcessStatus::Exited(status.code().unwrap_or(ABNORMAL_EXIT_CODE));
            self.exited = Some(status);
            status
        }
    }

    impl ProcessHandle for WindowsProcessHandle {
        fn pid(&self) -> ProcessId {
            self.child.id()
        }

        fn try_wait(&mut self) -> io::Result<Option<ProcessStatus>> {
            if let Some(status) = self.exited {
                return Ok(Some(status));
            }
            Ok(self.child.try_wait()?.map(|status| self.record(status)))
        }

        fn wait(&mut self) -> io::Result<ProcessStatus> {
            if let Some(status) = self.exited {
                return Ok(status);
            }
            let status = self.child.wait()?;
            Ok(self.record(status))
        }

        // Windows has no polite termination request for console-less
        // children, both modes end the process outright.
        fn terminate_gracefully(&mut self) -> TerminationResult {
            self.terminate()
        }

        fn force_kill(&mut self) -> TerminationResult {
            self.terminate()
        }
    }

    /// Windows-specific process manager spawning commands through `cmd.exe /C`
    pub struct WindowsProcessManager;

    impl Default for WindowsProcessManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WindowsProcessManager {
        pub fn new() -> Self {
            debug!("Initializing Windows process manager");
            Self
        }

        fn take_pipes(
            child: &mut Child,
        ) -> io::Result<(
            ChildStdin,
            WindowsPipeReader<std::process::ChildStdout>,
            WindowsPipeReader<std::process::ChildStderr>,
        )> {
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| io::Error::other("stdin was not piped"))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| io::Error::other("stdout was not piped"))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| io::Error::other("stderr was not piped"))?;

            Ok((
                stdin,
                WindowsPipeReader::new(stdout),
                WindowsPipeReader::new(stderr),
            ))
        }
    }

    impl ProcessLifecycle for WindowsProcessManager {
        type Handle = WindowsProcessHandle;

        fn spawn_process(
            &self,
            config: &ShellConfig,
        ) -> Result<SpawnedProcess<Self::Handle>, ShellError> {
            let shell = config.shell.as_deref().unwrap_or(DEFAULT_SHELL);
            let mut cmd = Command::new(shell);
            // cmd.exe does its own parsing of the command line
            cmd.raw_arg("/C")
                .raw_arg(&config.command)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .creation_flags(CREATE_NO_WINDOW.0);

            if let Some(dir) = &config.working_directory {
                cmd.current_dir(dir);
            }

            for (key, value) in &config.env {
                cmd.env(key, value);
            }

            let mut child = cmd
                .spawn()
                .map_err(|e| ShellError::spawn_failed(config.command.clone(), e))?;
            let pid = child.id();

            let (stdin, stdout, stderr) = match Self::take_pipes(&mut child) {
                Ok(pipes) => pipes,
                Err(e) => {
                    warn!(pid = %pid, error = %e, "Failed to prepare pipes, killing process");
                    if let Err(e) = child.kill().and_then(|()| child.wait().map(drop)) {
                        warn!(pid = %pid, error = %e, "Failed to reap process");
                    }
                    return Err(ShellError::spawn_failed(config.command.clone(), e));
                }
            };

            info!(pid = %pid, shell, command = %config.command, "Spawned Windows process");

            Ok(SpawnedProcess {
                handle: WindowsProcessHandle::new(child, config.command.clone()),
                stdin: Box::new(stdin),
                stdout: Box::new(stdout),
                stderr: Box::new(stderr),
            })
        }
    }

}

// Re-export the Windows implementation when on Windows systems
#[cfg(windows)]
pub use windows_impl::{WindowsPipeReader, WindowsProcessHandle, WindowsProcessManager};

// Provide stub implementations for non-Windows systems
#[cfg(not(windows))]
pub struct WindowsPipeReader;

#[cfg(not(windows))]
pub struct WindowsProcessHandle;

#[cfg(not(windows))]
pub struct WindowsProcessManager;

#[cfg(not(windows))]
impl WindowsProcessManager {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(windows))]
impl Default for WindowsProcessManager {
    fn default() -> Self {
        Self::new()
    }
}
