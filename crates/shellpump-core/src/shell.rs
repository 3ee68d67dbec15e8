use crate::buffer::OutputBuffer;
use crate::config::{PumpSettings, ShellConfig, TerminationMode};
use crate::error::ShellError;
use crate::process::{
    FORCED_EXIT_CODE, PipeReader, ProcessHandle, ProcessId, ProcessInfo, ProcessLifecycle,
    ProcessStatus, RUNNING_EXIT_CODE, SpawnedProcess, StreamKind, TerminationResult,
};
use crate::pump::StreamPump;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A child process running one shell command, with its output captured in
/// the background
///
/// Construction spawns the child and starts one pump thread per output
/// stream. Every method takes `&self`; the lifecycle record, the process
/// handle and the input channel each sit behind their own lock, so the
/// process can be shared between threads. Dropping it stops and joins the
/// pumps and closes every channel end.
pub struct ShellProcess<H: ProcessHandle> {
    config: ShellConfig,
    pid: ProcessId,
    process: Mutex<H>,
    input: Mutex<Option<Box<dyn Write + Send>>>,
    stdout: Arc<OutputBuffer>,
    stderr: Arc<OutputBuffer>,
    stop: Arc<AtomicBool>,
    pumps: Vec<StreamPump>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    exit: Option<ExitRecord>,
}

#[derive(Debug, Clone, Copy)]
struct ExitRecord {
    code: i32,
    status: ProcessStatus,
    forced: bool,
    settled: bool,
}

impl<H: ProcessHandle> ShellProcess<H> {
    /// Spawn `config.command` through `manager` and start capturing its output
    pub fn spawn_with<M>(manager: &M, config: ShellConfig) -> Result<Self, ShellError>
    where
        M: ProcessLifecycle<Handle = H>,
    {
        config.validate()?;

        let SpawnedProcess {
            mut handle,
            stdin,
            stdout,
            stderr,
        } = manager.spawn_process(&config)?;
        let pid = handle.pid();

        let stdout_buffer = Arc::new(OutputBuffer::new(StreamKind::Stdout));
        let stderr_buffer = Arc::new(OutputBuffer::new(StreamKind::Stderr));
        let stop = Arc::new(AtomicBool::new(false));

        let pumps = match start_pumps(
            pid,
            [(stdout, &stdout_buffer), (stderr, &stderr_buffer)],
            &stop,
            &config.pump,
        ) {
            Ok(pumps) => pumps,
            Err(e) => {
                warn!(pid = %pid, error = %e, "Failed to start stream pumps, killing process");
                handle.force_kill();
                if let Err(e) = handle.wait() {
                    warn!(pid = %pid, error = %e, "Failed to reap process after pump failure");
                }
                return Err(ShellError::spawn_failed(config.command.clone(), e));
            }
        };

        debug!(pid = %pid, command = %config.command, "Shell process ready");

        Ok(Self {
            config,
            pid,
            process: Mutex::new(handle),
            input: Mutex::new(Some(stdin)),
            stdout: stdout_buffer,
            stderr: stderr_buffer,
            stop,
            pumps,
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub fn process_id(&self) -> ProcessId {
        self.pid
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Drain everything the child wrote to stdout since the last call
    pub fn read_output(&self) -> String {
        self.stdout.drain()
    }

    /// Drain everything the child wrote to stderr since the last call
    pub fn read_error(&self) -> String {
        self.stderr.drain()
    }

    pub fn read_output_bytes(&self) -> Vec<u8> {
        self.stdout.drain_bytes()
    }

    pub fn read_error_bytes(&self) -> Vec<u8> {
        self.stderr.drain_bytes()
    }

    /// Write `input` to the child's stdin, blocking until every byte is accepted
    pub fn write(&self, input: &str) -> Result<(), ShellError> {
        self.write_bytes(input.as_bytes())
    }

    pub fn write_bytes(&self, bytes: &[u8]) -> Result<(), ShellError> {
        let mut input = lock(&self.input);
        let writer = input.as_mut().ok_or_else(|| {
            ShellError::WriteFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "process input is closed",
            ))
        })?;

        writer
            .write_all(bytes)
            .and_then(|()| writer.flush())
            .map_err(ShellError::WriteFailed)
    }

    /// Close the child's stdin so it observes end-of-input
    pub fn close_input(&self) {
        if lock(&self.input).take().is_some() {
            debug!(pid = %self.pid, "Closed process input");
        }
    }

    /// Ask the OS to end the child and latch the exited state with
    /// [`FORCED_EXIT_CODE`]
    ///
    /// The state is latched even if the OS call fails. A process whose exit
    /// was already observed keeps its real exit code and is not signalled.
    pub fn force_exit(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.exit.is_some() {
            debug!(pid = %self.pid, "Process already exited, ignoring force_exit");
            return;
        }

        let result = {
            let mut process = lock(&self.process);
            match self.config.termination {
                TerminationMode::Graceful => process.terminate_gracefully(),
                TerminationMode::Kill => process.force_kill(),
            }
        };
        match result {
            TerminationResult::Success => {
                info!(pid = %self.pid, mode = ?self.config.termination, "Forced process exit");
            }
            other => {
                warn!(pid = %self.pid, result = ?other, "Termination request failed, latching exit anyway");
            }
        }

        lifecycle.exit = Some(ExitRecord {
            code: FORCED_EXIT_CODE,
            status: ProcessStatus::Exited(FORCED_EXIT_CODE),
            forced: true,
            settled: false,
        });
    }

    /// Non-blocking liveness check
    ///
    /// The first call that observes the exit latches the exit code and waits
    /// (at most `exit_grace_ms`) for both pumps to collect the remaining
    /// output. Later calls return `true` immediately.
    pub fn has_exited(&self) -> bool {
        match self.poll_exit() {
            Ok(Some(exit)) => {
                if !exit.settled {
                    self.settle_blocking();
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(pid = %self.pid, error = %e, "Liveness check failed");
                false
            }
        }
    }

    /// Latched exit code, or `None` while the process is running
    pub fn exit_status(&self) -> Option<i32> {
        if self.has_exited() {
            self.latched().map(|exit| exit.code)
        } else {
            None
        }
    }

    /// Latched exit code, or [`RUNNING_EXIT_CODE`] while the process is running
    pub fn exit_code(&self) -> i32 {
        self.exit_status().unwrap_or(RUNNING_EXIT_CODE)
    }

    pub fn status(&self) -> ProcessStatus {
        if self.has_exited() {
            self.latched()
                .map(|exit| exit.status)
                .unwrap_or(ProcessStatus::Running)
        } else {
            ProcessStatus::Running
        }
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            command: self.config.command.clone(),
            status: self.status(),
        }
    }

    /// Block the calling thread until the process exits and return its exit code
    pub fn wait(&self) -> Result<i32, ShellError> {
        loop {
            if let Some(exit) = self.poll_exit()? {
                if !exit.settled {
                    self.settle_blocking();
                }
                return Ok(exit.code);
            }
            thread::sleep(self.config.pump.poll_interval());
        }
    }

    /// Wait for the process to exit with optional timeout
    pub async fn wait_for_exit(&self, timeout: Option<Duration>) -> Result<i32, ShellError> {
        match timeout {
            Some(duration) => tokio::time::timeout(duration, self.poll_until_exit())
                .await
                .map_err(|_| ShellError::Timeout(duration))?,
            None => self.poll_until_exit().await,
        }
    }

    async fn poll_until_exit(&self) -> Result<i32, ShellError> {
        let poll_interval = self.config.pump.poll_interval();
        loop {
            if let Some(exit) = self.poll_exit()? {
                if !exit.settled {
                    let deadline = Instant::now() + self.config.pump.exit_grace();
                    while !self.pumps_finished() && Instant::now() < deadline {
                        tokio::time::sleep(poll_interval).await;
                    }
                    self.mark_settled();
                }
                return Ok(exit.code);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Latch the exit state if the OS reports the child as terminated
    fn poll_exit(&self) -> Result<Option<ExitRecord>, ShellError> {
        let mut lifecycle = lock(&self.lifecycle);
        if let Some(exit) = lifecycle.exit {
            return Ok(Some(exit));
        }

        let status = lock(&self.process).try_wait().map_err(ShellError::Wait)?;
        let Some(status) = status else {
            return Ok(None);
        };

        let code = status.exit_code().unwrap_or(RUNNING_EXIT_CODE);
        info!(pid = %self.pid, code, status = ?status, "Process exited");

        let exit = ExitRecord {
            code,
            status,
            forced: false,
            settled: false,
        };
        lifecycle.exit = Some(exit);
        Ok(Some(exit))
    }

    fn latched(&self) -> Option<ExitRecord> {
        lock(&self.lifecycle).exit
    }

    fn pumps_finished(&self) -> bool {
        self.pumps.iter().all(StreamPump::is_finished)
    }

    /// Give the pumps up to `exit_grace` to reach end-of-stream
    fn settle_blocking(&self) {
        let deadline = Instant::now() + self.config.pump.exit_grace();
        while !self.pumps_finished() && Instant::now() < deadline {
            thread::sleep(self.config.pump.poll_interval());
        }
        self.mark_settled();
    }

    fn mark_settled(&self) {
        if let Some(exit) = lock(&self.lifecycle).exit.as_mut() {
            exit.settled = true;
        }
    }
}

impl<H: ProcessHandle> Drop for ShellProcess<H> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        for pump in &mut self.pumps {
            pump.join();
        }

        let exit = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .exit;
        let forced = exit.is_some_and(|exit| exit.forced);
        if exit.is_some() && !forced {
            return;
        }

        let pid = self.pid;
        let process = self.process.get_mut().unwrap_or_else(PoisonError::into_inner);
        match process.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = %pid, status = ?status, "Reaped process during drop");
            }
            Ok(None) if self.config.kill_on_drop || forced => {
                warn!(pid = %pid, "Killing process still running at drop");
                process.force_kill();
                if let Err(e) = process.wait() {
                    warn!(pid = %pid, error = %e, "Failed to reap process during drop");
                }
            }
            Ok(None) => {
                debug!(pid = %pid, "Leaving process running after drop");
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Failed to check process state during drop");
            }
        }
    }
}

fn start_pumps(
    pid: ProcessId,
    streams: [(Box<dyn PipeReader>, &Arc<OutputBuffer>); 2],
    stop: &Arc<AtomicBool>,
    settings: &PumpSettings,
) -> io::Result<Vec<StreamPump>> {
    let mut pumps = Vec::with_capacity(streams.len());
    for (reader, buffer) in streams {
        match StreamPump::spawn(pid, reader, buffer.clone(), stop.clone(), settings) {
            Ok(pump) => pumps.push(pump),
            Err(e) => {
                stop.store(true, Ordering::Release);
                for pump in &mut pumps {
                    pump.join();
                }
                return Err(e);
            }
        }
    }
    Ok(pumps)
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
