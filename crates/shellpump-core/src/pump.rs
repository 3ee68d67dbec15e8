use crate::buffer::OutputBuffer;
use crate::config::PumpSettings;
use crate::process::{PipeReader, ProcessId, ReadOutcome, StreamKind};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Background thread moving bytes from one output channel into its buffer
pub struct StreamPump {
    kind: StreamKind,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamPump {
    /// Start pumping `reader` into `buffer` until `stop` is raised or the
    /// channel closes
    pub fn spawn<R: PipeReader + 'static>(
        pid: ProcessId,
        reader: R,
        buffer: Arc<OutputBuffer>,
        stop: Arc<AtomicBool>,
        settings: &PumpSettings,
    ) -> io::Result<Self> {
        let kind = buffer.kind();
        let finished = Arc::new(AtomicBool::new(false));
        let poll_interval = settings.poll_interval();
        let chunk_size = settings.read_chunk_size;

        let thread = thread::Builder::new()
            .name(format!("shellpump-{pid}-{kind}"))
            .spawn({
                let finished = finished.clone();
                move || {
                    pump_loop(reader, &buffer, &stop, poll_interval, chunk_size);
                    buffer.mark_closed();
                    finished.store(true, Ordering::Release);
                    debug!(pid = %pid, stream = %kind, "Stream pump stopped");
                }
            })?;

        debug!(pid = %pid, stream = %kind, "Stream pump started");
        Ok(Self {
            kind,
            finished,
            thread: Some(thread),
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// True once the pump loop has returned
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Wait for the pump thread to return
    ///
    /// The caller must have raised the stop flag or the channel must be
    /// closing, otherwise this waits for the child to close its end.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(stream = %self.kind, "Stream pump panicked");
            }
        }
    }
}

fn pump_loop<R: PipeReader>(
    mut reader: R,
    buffer: &OutputBuffer,
    stop: &AtomicBool,
    poll_interval: Duration,
    chunk_size: usize,
) {
    let mut chunk = vec![0u8; chunk_size];

    while !stop.load(Ordering::Acquire) {
        match reader.read_nonblocking(&mut chunk) {
            ReadOutcome::Data(n) => buffer.append(&chunk[..n]),
            ReadOutcome::WouldBlock => thread::sleep(poll_interval),
            ReadOutcome::Closed => break,
        }
    }
}
