//! Ordered device candidates with wrap-around fallback.

use crate::{Error, Result};

/// Ordered list of device paths and a cursor into it.
///
/// The cursor is always a valid index; advancing past the last candidate
/// wraps back to the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    paths: Vec<String>,
    current: usize,
}

impl DeviceSelector {
    /// Creates a selector starting at the first candidate.
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(Error::NoDevices);
        }
        Ok(Self { paths, current: 0 })
    }

    /// Path of the current candidate.
    pub fn current(&self) -> &str {
        &self.paths[self.current]
    }

    /// Index of the current candidate.
    pub fn cursor(&self) -> usize {
        self.current
    }

    /// Moves to the next candidate, wrapping around.
    pub fn advance(&mut self) -> &str {
        self.current = (self.current + 1) % self.paths.len();
        self.current()
    }

    /// All candidates in order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            DeviceSelector::new(Vec::<String>::new()),
            Err(Error::NoDevices)
        ));
    }

    #[test]
    fn test_wraps_after_full_cycle() {
        for n in 1..6 {
            let paths: Vec<String> = (0..n).map(|i| format!("/dev/ttyACM{}", i)).collect();
            let mut selector = DeviceSelector::new(paths).unwrap();
            selector.advance();
            let start = selector.cursor();
            for _ in 0..n {
                selector.advance();
                assert!(selector.cursor() < n);
            }
            assert_eq!(selector.cursor(), start);
        }
    }

    #[test]
    fn test_current_follows_cursor() {
        let mut selector = DeviceSelector::new(["COM3", "COM4"]).unwrap();
        assert_eq!(selector.current(), "COM3");
        assert_eq!(selector.advance(), "COM4");
        assert_eq!(selector.advance(), "COM3");
        assert_eq!(selector.paths().len(), 2);
    }
}
