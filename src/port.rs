use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::mode::DeviceConfig;

/// Granularity of blocking reads; bounds how long an interrupt goes unnoticed.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MIN_POLL: Duration = Duration::from_millis(1);

/// How long a receive may wait for the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Deadline(Duration),
    Forever,
    NonBlocking,
}

impl Wait {
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or(Wait::Forever, Wait::Deadline)
    }
}

/// Byte-level access to the device.
pub trait Transport {
    /// Write the whole payload, returning the number of bytes written.
    fn send(&mut self, payload: &[u8]) -> Result<usize>;

    /// Read at most `max_bytes`. Only `Wait::NonBlocking` may return an empty buffer.
    fn receive(&mut self, max_bytes: usize, wait: Wait) -> Result<Vec<u8>>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    running: Arc<AtomicBool>,
}

impl SerialTransport {
    /// Open the device 8N1 without flow control.
    ///
    /// `running` is the process-wide interrupt flag; clearing it aborts any
    /// pending [`Transport::receive`].
    pub fn open(config: &DeviceConfig, running: Arc<AtomicBool>) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(POLL_INTERVAL)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| Error::connection(&config.port, e))?;

        log::debug!("opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            name: config.port.clone(),
            port: Some(port),
            running,
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let name = &self.name;
        self.port
            .as_mut()
            .ok_or_else(|| Error::connection(name, "port is closed"))
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let name = self.name.clone();
        let port = self.port_mut()?;
        port.write_all(payload)
            .and_then(|()| port.flush())
            .map_err(|e| classify(&name, e))?;
        Ok(payload.len())
    }

    fn receive(&mut self, max_bytes: usize, wait: Wait) -> Result<Vec<u8>> {
        let name = self.name.clone();
        let running = Arc::clone(&self.running);
        let port = self.port_mut()?;
        let mut buf = vec![0u8; max_bytes.max(1)];

        if wait == Wait::NonBlocking {
            let available = port.bytes_to_read().map_err(|e| Error::connection(&name, e))?;
            if available == 0 {
                return Ok(Vec::new());
            }
            let n = port.read(&mut buf).map_err(|e| classify(&name, e))?;
            buf.truncate(n);
            return Ok(buf);
        }

        let n = wait_for_data(wait, &running, &name, |poll| {
            port.set_timeout(poll)?;
            port.read(&mut buf)
        })?;
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("closed {}", self.name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Repeat `read` until it yields data, the deadline passes or `running` is cleared.
///
/// `read` gets the longest it may block and reports an empty poll as
/// `TimedOut`, the way a serial port with a read timeout does. No poll runs
/// past the deadline.
fn wait_for_data<F>(wait: Wait, running: &AtomicBool, name: &str, mut read: F) -> Result<usize>
where
    F: FnMut(Duration) -> io::Result<usize>,
{
    let start = Instant::now();
    loop {
        if !running.load(Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        let poll = match wait {
            Wait::Deadline(limit) => limit
                .saturating_sub(start.elapsed())
                .clamp(MIN_POLL, POLL_INTERVAL),
            _ => POLL_INTERVAL,
        };
        match read(poll) {
            Ok(n) if n > 0 => return Ok(n),
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(classify(name, e)),
        }
        if let Wait::Deadline(limit) = wait
            && start.elapsed() >= limit
        {
            return Err(Error::Timeout);
        }
    }
}

fn classify(name: &str, e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => Error::connection(name, format!("device lost ({e})")),
        _ => Error::Io(e),
    }
}
