//! Touch key frames.

use crate::link::is_key_noise;

/// One decoded touch frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchEvent {
    /// Frame/sequence token sent by the firmware.
    pub frame_id: u16,
    /// Filtered state of every touch key.
    pub keys: Vec<u16>,
}

/// Receives decoded touch frames.
pub trait TouchSink {
    fn create_event(&mut self, event: &TouchEvent);
}

impl<F> TouchSink for F
where
    F: FnMut(&TouchEvent),
{
    fn create_event(&mut self, event: &TouchEvent) {
        self(event)
    }
}

/// Last known-good reading per key, used to replace corrupted readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFilter {
    last_good: Vec<u16>,
}

impl KeyFilter {
    /// Creates a filter for `num_keys` keys, all starting at 0.
    pub fn new(num_keys: usize) -> Self {
        Self {
            last_good: vec![0; num_keys],
        }
    }

    /// Returns the reading to report for `key`.
    ///
    /// Readings in the noise band are replaced with the last good value;
    /// anything else is accepted and remembered.
    pub fn filter(&mut self, key: usize, raw: u16) -> u16 {
        let Some(last) = self.last_good.get_mut(key) else {
            return raw;
        };
        if is_key_noise(raw) {
            *last
        } else {
            *last = raw;
            raw
        }
    }

    /// Forgets all remembered readings.
    pub fn reset(&mut self) {
        self.last_good.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupted_reading_replaced() {
        let mut filter = KeyFilter::new(1);
        let decoded: Vec<u16> = [5, 20000, 7].iter().map(|&v| filter.filter(0, v)).collect();
        assert_eq!(decoded, vec![5, 5, 7]);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut filter = KeyFilter::new(2);
        assert_eq!(filter.filter(0, 40), 40);
        assert_eq!(filter.filter(1, 900), 900);
        assert_eq!(filter.filter(0, 5000), 40);
        assert_eq!(filter.filter(1, 59999), 900);
        assert_eq!(filter.filter(1, 60000), 60000);
        assert_eq!(filter.filter(1, 1001), 60000);
    }

    #[test]
    fn test_noise_before_any_good_reading() {
        let mut filter = KeyFilter::new(3);
        assert_eq!(filter.filter(2, 1500), 0);
        filter.filter(2, 12);
        filter.reset();
        assert_eq!(filter.filter(2, 1500), 0);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &TouchEvent| seen.push(event.frame_id);
            sink.create_event(&TouchEvent {
                frame_id: 3,
                keys: vec![],
            });
        }
        assert_eq!(seen, vec![3]);
    }
}
