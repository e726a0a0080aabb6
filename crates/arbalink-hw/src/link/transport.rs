//! Blocking serial transport.

use crate::{Error, Result};
use std::io::{Read, Write};
use std::time::Duration;
use tokio_serial::{DataBits, Parity, SerialPort, StopBits};
use tracing::debug;

/// Byte-oriented duplex channel to one device at a time.
///
/// Every read and write is bounded by the transport's timeout; a timeout
/// surfaces as an I/O error just like a disconnect.
pub trait LinkTransport {
    /// Opens the device at `path`, replacing any previous connection.
    fn open(&mut self, path: &str, baud_rate: u32) -> Result<()>;

    /// Closes the device. Calling this on a closed transport is a no-op.
    fn close(&mut self);

    /// Returns true while a device is open.
    fn is_open(&self) -> bool;

    /// Fills `buf` completely or fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Writes all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Flushes pending output.
    fn flush(&mut self) -> Result<()>;
}

/// Serial port transport (8N1, blocking, per-operation timeout).
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    timeout: Duration,
}

impl SerialTransport {
    /// Creates a closed transport with the given I/O timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            port: None,
            timeout,
        }
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            Error::SerialIo(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial port is closed",
            ))
        })
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new(crate::link::DEFAULT_TIMEOUT)
    }
}

impl LinkTransport for SerialTransport {
    fn open(&mut self, path: &str, baud_rate: u32) -> Result<()> {
        self.close();
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()?;
        debug!("Opened {} at {} baud", path, baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            debug!("Closing {}", port.name().unwrap_or_default());
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.port_mut()?.read_exact(buf)?;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port_mut()?.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port_mut()?.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_transport_rejects_io() {
        let mut transport = SerialTransport::default();
        assert!(!transport.is_open());

        let mut buf = [0u8; 1];
        assert!(transport.read_exact(&mut buf).is_err());
        assert!(transport.write_all(&[0x42]).is_err());
        transport.close();
        transport.close();
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut transport = SerialTransport::new(Duration::from_millis(10));
        assert!(transport
            .open("/dev/arbalink-does-not-exist", 115_200)
            .is_err());
        assert!(!transport.is_open());
    }

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_open_real_device() {
        let mut transport = SerialTransport::default();
        transport.open("/dev/ttyACM0", 1_000_000).unwrap();
        assert!(transport.is_open());
    }
}
