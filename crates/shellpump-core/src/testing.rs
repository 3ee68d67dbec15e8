//! Scripted in-memory platform layer used by the unit tests

use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::process::{
    PipeReader, ProcessHandle, ProcessId, ProcessLifecycle, ProcessStatus, ReadOutcome,
    SpawnedProcess, TerminationResult,
};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Script {
    chunks: VecDeque<Vec<u8>>,
    closed: bool,
}

/// Reader that replays chunks pushed through its [`ScriptHandle`]
pub struct ScriptedReader(Arc<Mutex<Script>>);

#[derive(Clone)]
pub struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptedReader {
    pub fn new() -> (Self, ScriptHandle) {
        let script = Arc::new(Mutex::new(Script::default()));
        (Self(script.clone()), ScriptHandle(script))
    }
}

impl ScriptHandle {
    pub fn push(&self, bytes: &[u8]) {
        self.0.lock().unwrap().chunks.push_back(bytes.to_vec());
    }

    pub fn close(&self) {
        self.0.lock().unwrap().closed = true;
    }
}

impl PipeReader for ScriptedReader {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let mut script = self.0.lock().unwrap();
        match script.chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    script.chunks.push_front(chunk.split_off(n));
                }
                ReadOutcome::Data(n)
            }
            None if script.closed => ReadOutcome::Closed,
            None => ReadOutcome::WouldBlock,
        }
    }
}

#[derive(Debug)]
pub struct MockState {
    pub status: ProcessStatus,
    pub terminations: Vec<&'static str>,
    pub try_wait_calls: usize,
    pub termination_result: TerminationResult,
}

pub struct MockHandle {
    pid: ProcessId,
    state: Arc<Mutex<MockState>>,
}

impl ProcessHandle for MockHandle {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessStatus>> {
        let mut state = self.state.lock().unwrap();
        state.try_wait_calls += 1;
        Ok(match state.status {
            ProcessStatus::Running => None,
            status => Some(status),
        })
    }

    fn wait(&mut self) -> io::Result<ProcessStatus> {
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    // Termination is recorded but the mock only "dies" on force_kill, so the
    // tests can observe a latched forced state while the child is alive.
    fn terminate_gracefully(&mut self) -> TerminationResult {
        let mut state = self.state.lock().unwrap();
        state.terminations.push("graceful");
        state.termination_result.clone()
    }

    fn force_kill(&mut self) -> TerminationResult {
        let mut state = self.state.lock().unwrap();
        state.terminations.push("kill");
        state.status = ProcessStatus::Signaled(9);
        state.termination_result.clone()
    }
}

#[derive(Default)]
pub struct MockInput {
    pub written: Vec<u8>,
    pub broken: bool,
}

struct MockWriter(Arc<Mutex<MockInput>>);

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut input = self.0.lock().unwrap();
        if input.broken {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        input.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Test-side controls of a mock child
pub struct MockProcess {
    pub stdout: ScriptHandle,
    pub stderr: ScriptHandle,
    pub state: Arc<Mutex<MockState>>,
    pub input: Arc<Mutex<MockInput>>,
}

impl MockProcess {
    /// Simulate the child exiting: set the status and close both streams
    pub fn exit(&self, status: ProcessStatus) {
        self.stdout.close();
        self.stderr.close();
        self.state.lock().unwrap().status = status;
    }
}

/// Lifecycle manager handing out one prepared mock process
pub struct MockManager {
    prepared: Mutex<Option<SpawnedProcess<MockHandle>>>,
}

impl MockManager {
    pub fn new(pid: ProcessId) -> (Self, MockProcess) {
        let (stdout, stdout_script) = ScriptedReader::new();
        let (stderr, stderr_script) = ScriptedReader::new();
        let state = Arc::new(Mutex::new(MockState {
            status: ProcessStatus::Running,
            terminations: Vec::new(),
            try_wait_calls: 0,
            termination_result: TerminationResult::Success,
        }));
        let input = Arc::new(Mutex::new(MockInput::default()));

        let spawned = SpawnedProcess {
            handle: MockHandle {
                pid,
                state: state.clone(),
            },
            stdin: Box::new(MockWriter(input.clone())),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        };

        let controls = MockProcess {
            stdout: stdout_script,
            stderr: stderr_script,
            state,
            input,
        };
        (
            Self {
                prepared: Mutex::new(Some(spawned)),
            },
            controls,
        )
    }

    /// A manager whose spawn always fails
    pub fn failing() -> Self {
        Self {
            prepared: Mutex::new(None),
        }
    }
}

impl ProcessLifecycle for MockManager {
    type Handle = MockHandle;

    fn spawn_process(
        &self,
        config: &ShellConfig,
    ) -> Result<SpawnedProcess<Self::Handle>, ShellError> {
        self.prepared.lock().unwrap().take().ok_or_else(|| {
            ShellError::spawn_failed(
                config.command.clone(),
                io::Error::new(io::ErrorKind::NotFound, "mock shell unavailable"),
            )
        })
    }
}
