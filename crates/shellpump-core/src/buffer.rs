use crate::process::StreamKind;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Accumulator for one output stream of the child
///
/// The owning pump appends, any thread drains. Draining moves the contents
/// out and clears the buffer under a single lock acquisition, so no byte is
/// ever returned twice or lost.
pub struct OutputBuffer {
    kind: StreamKind,
    state: Mutex<BufferState>,
}

#[derive(Default)]
struct BufferState {
    bytes: Vec<u8>,
    closed: bool,
}

impl OutputBuffer {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            state: Mutex::new(BufferState::default()),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.lock().bytes.extend_from_slice(bytes);
    }

    /// Take everything buffered so far as raw bytes
    pub fn drain_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().bytes)
    }

    /// Take everything buffered so far as text
    ///
    /// A multi-byte character whose tail has not arrived yet stays in the
    /// buffer until the next drain. Invalid sequences become U+FFFD. Once the
    /// stream is closed nothing is held back.
    pub fn drain(&self) -> String {
        let mut state = self.lock();
        let flush = state.closed;
        take_utf8(&mut state.bytes, flush)
    }

    /// Mark the stream as finished; no further appends will happen
    pub fn mark_closed(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().bytes.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decode the longest complete UTF-8 prefix of `src` and remove it
fn take_utf8(src: &mut Vec<u8>, flush: bool) -> String {
    let mut out = String::with_capacity(src.len());
    let mut consumed = 0;

    while consumed < src.len() {
        match std::str::from_utf8(&src[consumed..]) {
            Ok(s) => {
                out.push_str(s);
                consumed = src.len();
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(
                    &src[consumed..consumed + valid],
                ));
                consumed += valid;

                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        consumed += len;
                    }
                    // incomplete sequence at the end
                    None if flush => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        consumed = src.len();
                    }
                    None => break,
                }
            }
        }
    }

    if consumed == src.len() {
        src.clear();
    } else {
        src.drain(..consumed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_clears() {
        let buffer = OutputBuffer::new(StreamKind::Stdout);
        assert_eq!(buffer.drain(), "");

        buffer.append(b"hello ");
        buffer.append(b"world");
        assert_eq!(buffer.len(), 11);
        assert_eq!(buffer.drain(), "hello world");
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), "");
    }

    #[test]
    fn test_sequential_drains_keep_order() {
        let buffer = OutputBuffer::new(StreamKind::Stderr);
        buffer.append(b"A");
        assert_eq!(buffer.drain(), "A");
        buffer.append(b"B");
        assert_eq!(buffer.drain(), "B");
    }

    #[test]
    fn test_split_multibyte_char_is_held_back() {
        let buffer = OutputBuffer::new(StreamKind::Stdout);
        let snowman = "☃".as_bytes();

        buffer.append(b"x");
        buffer.append(&snowman[..1]);
        assert_eq!(buffer.drain(), "x");
        assert_eq!(buffer.len(), 1);

        buffer.append(&snowman[1..]);
        assert_eq!(buffer.drain(), "☃");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let buffer = OutputBuffer::new(StreamKind::Stdout);
        buffer.append(b"ok\xFFok");
        assert_eq!(buffer.drain(), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_closed_stream_flushes_incomplete_tail() {
        let buffer = OutputBuffer::new(StreamKind::Stdout);
        buffer.append(&"é".as_bytes()[..1]);
        assert_eq!(buffer.drain(), "");

        buffer.mark_closed();
        assert!(buffer.is_closed());
        assert_eq!(buffer.drain(), "\u{FFFD}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_bytes_returns_raw_data() {
        let buffer = OutputBuffer::new(StreamKind::Stdout);
        buffer.append(&[0, 159, 146, 150]);
        assert_eq!(buffer.drain_bytes(), vec![0, 159, 146, 150]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_concurrent_drains_never_overlap_or_lose_bytes() {
        let buffer = Arc::new(OutputBuffer::new(StreamKind::Stdout));
        let total = 20_000;

        let writer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for i in 0..total {
                    buffer.append(format!("{i},").as_bytes());
                }
                buffer.mark_closed();
            })
        };

        let drainers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while !buffer.is_closed() || !buffer.is_empty() {
                        let chunk = buffer.drain();
                        seen.extend(
                            chunk
                                .split(',')
                                .filter(|s| !s.is_empty())
                                .map(|s| s.parse::<usize>().unwrap()),
                        );
                    }
                    seen
                })
            })
            .collect();

        writer.join().unwrap();
        let mut all: Vec<usize> = drainers
            .into_iter()
            .flat_map(|d| d.join().unwrap())
            .collect();
        all.sort_unstable();

        assert_eq!(all, (0..total).collect::<Vec<_>>());
    }
}
