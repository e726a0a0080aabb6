//! Scripted transport for engine tests.

use super::LinkTransport;
use crate::{Error, Result};
use std::collections::{HashSet, VecDeque};
use std::io::{Error as IoError, ErrorKind};

/// Transport fed from a byte queue; running dry behaves like a read timeout.
#[derive(Default)]
pub struct MockTransport {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
    pub opened: Vec<String>,
    pub failing_paths: HashSet<String>,
    pub fail_writes: bool,
    pub closes: usize,
    open: bool,
}

impl MockTransport {
    pub fn with_input(bytes: &[u8]) -> Self {
        let mut mock = Self::default();
        mock.feed(bytes);
        mock
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    pub fn feed_u16(&mut self, value: u16) {
        self.feed(&value.to_le_bytes());
    }

    pub fn fail_path(&mut self, path: &str) {
        self.failing_paths.insert(path.to_string());
    }
}

impl LinkTransport for MockTransport {
    fn open(&mut self, path: &str, _baud_rate: u32) -> Result<()> {
        self.opened.push(path.to_string());
        if self.failing_paths.contains(path) {
            return Err(Error::SerialIo(IoError::new(ErrorKind::NotFound, path)));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if !self.open {
            return Err(Error::SerialIo(ErrorKind::NotConnected.into()));
        }
        if self.input.len() < buf.len() {
            self.input.clear();
            return Err(Error::SerialIo(ErrorKind::TimedOut.into()));
        }
        for byte in buf.iter_mut() {
            *byte = self.input.pop_front().unwrap_or_default();
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if !self.open || self.fail_writes {
            return Err(Error::SerialIo(ErrorKind::BrokenPipe.into()));
        }
        self.output.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
