//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::port::{Transport, Wait};

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

/// Cloned handles share state, so a test can keep one while the session owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    open: bool,
    read_buffer: VecDeque<u8>,
    written: Vec<u8>,
    line: Vec<u8>,
    lines: Vec<String>,
    responder: Option<Responder>,
    fail_after_sends: Option<usize>,
    sends: usize,
    close_calls: usize,
    blocked_reads: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                open: true,
                read_buffer: VecDeque::new(),
                written: Vec::new(),
                line: Vec::new(),
                lines: Vec::new(),
                responder: None,
                fail_after_sends: None,
                sends: 0,
                close_calls: 0,
                blocked_reads: 0,
            })),
        }
    }

    /// Every complete line the host sends is passed to `responder`; the
    /// returned lines become readable, CRLF-terminated.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let mock = Self::new();
        mock.inner.lock().unwrap().responder = Some(Box::new(responder));
        mock
    }

    pub fn inject(&self, data: &[u8]) {
        self.inner.lock().unwrap().read_buffer.extend(data);
    }

    /// Sends after the first `n` fail as if the device was unplugged.
    pub fn fail_after_sends(&self, n: usize) {
        self.inner.lock().unwrap().fail_after_sends = Some(n);
    }

    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().written.clone()
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.inner.lock().unwrap().lines.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.inner.lock().unwrap().close_calls
    }

    pub fn blocked_reads(&self) -> usize {
        self.inner.lock().unwrap().blocked_reads
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.open {
            return Err(Error::connection("mock", "port is closed"));
        }
        if inner.fail_after_sends.is_some_and(|n| inner.sends >= n) {
            return Err(Error::connection("mock", "device lost"));
        }
        inner.sends += 1;
        inner.written.extend_from_slice(payload);

        for &b in payload {
            match b {
                b'\r' => {}
                b'\n' => {
                    let line = String::from_utf8_lossy(&inner.line).into_owned();
                    inner.line.clear();
                    let replies = match inner.responder.as_mut() {
                        Some(respond) => respond(&line),
                        None => Vec::new(),
                    };
                    for reply in replies {
                        inner.read_buffer.extend(reply.as_bytes());
                        inner.read_buffer.extend(b"\r\n");
                    }
                    inner.lines.push(line);
                }
                _ => inner.line.push(b),
            }
        }
        Ok(payload.len())
    }

    fn receive(&mut self, max_bytes: usize, wait: Wait) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.open {
            return Err(Error::connection("mock", "port is closed"));
        }
        if inner.read_buffer.is_empty() {
            return match wait {
                Wait::Deadline(_) => Err(Error::Timeout),
                Wait::NonBlocking => Ok(Vec::new()),
                // Nothing will ever arrive; only an interrupt ends the wait.
                Wait::Forever => {
                    inner.blocked_reads += 1;
                    Err(Error::Interrupted)
                }
            };
        }
        let n = inner.read_buffer.len().min(max_bytes);
        Ok(inner.read_buffer.drain(..n).collect())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.close_calls += 1;
        inner.open = false;
    }

    fn is_open(&self) -> bool {
        self.inner.lock().unwrap().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blocking_receive_returns_what_is_there() {
        let mut mock = MockTransport::new();
        assert!(mock.receive(8, Wait::NonBlocking).unwrap().is_empty());
        mock.inject(b"abc");
        assert_eq!(mock.receive(2, Wait::NonBlocking).unwrap(), b"ab");
        assert_eq!(mock.receive(8, Wait::NonBlocking).unwrap(), b"c");
    }

    #[test]
    fn close_is_idempotent() {
        let mut mock = MockTransport::new();
        mock.close();
        mock.close();
        assert!(!mock.is_open());
        assert_eq!(mock.close_calls(), 2);
        assert!(mock.send(b"x").is_err());
    }
}
