#[cfg(unix)]
mod unix_impl {
    use nix::errno::Errno;
    use nix::fcntl::{FcntlArg, OFlag, fcntl};
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use shellpump_core::{
        ABNORMAL_EXIT_CODE, PipeReader, ProcessHandle, ProcessId, ProcessLifecycle,
        ProcessStatus, ReadOutcome, ShellConfig, ShellError, SpawnedProcess, TerminationResult,
    };
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::fd::{AsFd, OwnedFd};
    use std::os::unix::process::ExitStatusExt;
    use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
    use tracing::{debug, info, warn};

    const DEFAULT_SHELL: &str = "/bin/sh";

    /// Parent-side read end of a child's stdout or stderr pipe, in
    /// `O_NONBLOCK` mode
    pub struct UnixPipeReader {
        file: File,
    }

    impl UnixPipeReader {
        pub fn new(fd: impl Into<OwnedFd>) -> io::Result<Self> {
            let fd = fd.into();
            set_nonblocking(&fd)?;
            Ok(Self {
                file: File::from(fd),
            })
        }
    }

    impl PipeReader for UnixPipeReader {
        fn read_nonblocking(&mut self, buf: &mut [u8]) -> ReadOutcome {
            loop {
                match self.file.read(buf) {
                    Ok(0) => return ReadOutcome::Closed,
                    Ok(n) => return ReadOutcome::Data(n),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        return ReadOutcome::WouldBlock;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(error = %e, "Pipe read failed, closing stream");
                        return ReadOutcome::Closed;
                    }
                }
            }
        }
    }

    fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
        let flags = fcntl(fd.as_fd(), FcntlArg::F_GETFL)?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd.as_fd(), FcntlArg::F_SETFL(flags))?;
        Ok(())
    }

    /// Unix-specific process handle implementation
    pub struct UnixProcessHandle {
        child: Child,
        command: String,
        exited: Option<ProcessStatus>,
    }

    impl UnixProcessHandle {
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

        fn signal(&self, sig: Signal) -> TerminationResult {
            // never signal a reaped pid, it may already belong to someone else
            if self.exited.is_some() {
                return TerminationResult::ProcessNotFound;
            }

            let pid = self.child.id();
            match signal::kill(NixPid::from_raw(pid as i32), sig) {
                Ok(()) => {
                    info!(pid = %pid, signal = %sig, "Sent signal to process");
                    TerminationResult::Success
                }
                Err(Errno::ESRCH) => {
                    info!(pid = %pid, "Process not found (already terminated)");
                    TerminationResult::ProcessNotFound
                }
                Err(Errno::EPERM) => {
                    warn!(pid = %pid, signal = %sig, "Permission denied to signal process");
                    TerminationResult::PermissionDenied
                }
                Err(e) => {
                    warn!(pid = %pid, signal = %sig, error = %e, "Failed to signal process");
                    TerminationResult::Failed(format!("{sig} failed: {e}"))
                }
            }
        }

        fn record(&mut self, status: ExitStatus) -> ProcessStatus {
            let status = status_from(status);
            self.exited = Some(status);
            status
        }
    }

    fn status_from(status: ExitStatus) -> ProcessStatus {
        match (status.code(), status.signal()) {
            (Some(code), _) => ProcessStatus::Exited(code),
            (None, Some(sig)) => ProcessStatus::Signaled(sig),
            (None, None) => ProcessStatus::Exited(ABNORMAL_EXIT_CODE),
        }
    }

    impl ProcessHandle for UnixProcessHandle {
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

        fn terminate_gracefully(&mut self) -> TerminationResult {
            self.signal(Signal::SIGTERM)
        }

        fn force_kill(&mut self) -> TerminationResult {
            self.signal(Signal::SIGKILL)
        }
    }

    /// Unix-specific process manager spawning commands through `/bin/sh -c`
    pub struct UnixProcessManager;

    impl Default for UnixProcessManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UnixProcessManager {
        pub fn new() -> Self {
            debug!("Initializing Unix process manager");
            Self
        }

        fn take_pipes(child: &mut Child) -> io::Result<(ChildStdin, UnixPipeReader, UnixPipeReader)> {
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
                UnixPipeReader::new(stdout)?,
                UnixPipeReader::new(stderr)?,
            ))
        }
    }

    impl ProcessLifecycle for UnixProcessManager {
        type Handle = UnixProcessHandle;

        fn spawn_process(
            &self,
            config: &ShellConfig,
        ) -> Result<SpawnedProcess<Self::Handle>, ShellError> {
            let shell = config.shell.as_deref().unwrap_or(DEFAULT_SHELL);
            let mut cmd = Command::new(shell);
            cmd.arg("-c")
                .arg(&config.command)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            // Set working directory
            if let Some(dir) = &config.working_directory {
                cmd.current_dir(dir);
            }

            // Set environment variables
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

            info!(pid = %pid, shell, command = %config.command, "Spawned Unix process");

            Ok(SpawnedProcess {
                handle: UnixProcessHandle::new(child, config.command.clone()),
                stdin: Box::new(stdin),
                stdout: Box::new(stdout),
                stderr: Box::new(stderr),
            })
        }
    }

}

// Re-export the Unix implementation when on Unix systems
#[cfg(unix)]
pub use unix_impl::{UnixPipeReader, UnixProcessHandle, UnixProcessManager};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixPipeReader;

#[cfg(not(unix))]
pub struct UnixProcessHandle;

#[cfg(not(unix))]
pub struct UnixProcessManager;

#[cfg(not(unix))]
impl UnixProcessManager {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Default for UnixProcessManager {
    fn default() -> Self {
        Self::new()
    }
}
