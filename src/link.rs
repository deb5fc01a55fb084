//! CRLF line framing on top of a [`Transport`].

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port::{Transport, Wait};

const READ_CHUNK: usize = 64;
/// No protocol line comes close to this; longer input is noise.
const MAX_LINE: usize = 256;

pub struct Link<T: Transport> {
    transport: T,
    timeout: Option<Duration>,
    pending: VecDeque<u8>,
    partial: Vec<u8>,
    last_line: Vec<u8>,
    bytes_sent: u64,
    bytes_received: u64,
}

impl<T: Transport> Link<T> {
    /// `timeout` applies to every read; `None` waits forever.
    pub fn new(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            timeout,
            pending: VecDeque::new(),
            partial: Vec::new(),
            last_line: Vec::new(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    pub fn send_line(&mut self, text: &str) -> Result<()> {
        log::debug!("-->{}", text);
        let frame = format!("{text}\r\n");
        let n = self.transport.send(frame.as_bytes())?;
        self.bytes_sent += n as u64;
        if n != frame.len() {
            return Err(Error::Io(std::io::ErrorKind::WriteZero.into()));
        }
        Ok(())
    }

    /// Next line without its terminator; every `\r` is dropped.
    pub fn receive_line(&mut self) -> Result<String> {
        loop {
            while let Some(b) = self.pending.pop_front() {
                match b {
                    b'\r' => {}
                    b'\n' => return self.finish_line(),
                    _ if self.partial.len() >= MAX_LINE => {
                        self.partial.clear();
                        return Err(Error::Protocol(format!(
                            "line exceeds {MAX_LINE} bytes without a terminator"
                        )));
                    }
                    _ => self.partial.push(b),
                }
            }
            let chunk = self
                .transport
                .receive(READ_CHUNK, Wait::from_timeout(self.timeout))?;
            self.bytes_received += chunk.len() as u64;
            self.pending.extend(chunk);
        }
    }

    fn finish_line(&mut self) -> Result<String> {
        let raw = std::mem::take(&mut self.partial);
        self.last_line.clone_from(&raw);
        let line = String::from_utf8(raw)
            .ok()
            .filter(|s| s.is_ascii())
            .ok_or_else(|| Error::Protocol("received a non-ASCII line".into()))?;
        log::debug!("<--{}", line);
        Ok(line)
    }

    /// Drop buffered and already-arrived input, e.g. the rest of an aborted game.
    pub fn discard_pending(&mut self) -> Result<()> {
        self.pending.clear();
        self.partial.clear();
        loop {
            let stale = self.transport.receive(READ_CHUNK, Wait::NonBlocking)?;
            if stale.is_empty() {
                return Ok(());
            }
            self.bytes_received += stale.len() as u64;
            log::debug!("discarded {} stale bytes", stale.len());
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Raw bytes of the most recently completed line.
    pub fn last_line(&self) -> &[u8] {
        &self.last_line
    }

    pub fn close(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
        }
    }
}
