//! Touch event printing.

use arbalink_hw::{TouchEvent, TouchSink};
use std::io::Write;

/// Prints every touch frame to stdout, one line per frame.
pub struct PrintSink {
    json: bool,
}

impl PrintSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn format(&self, event: &TouchEvent) -> String {
        if self.json {
            serde_json::json!({
                "frame_id": event.frame_id,
                "keys": event.keys,
            })
            .to_string()
        } else {
            let keys: Vec<String> = event.keys.iter().map(u16::to_string).collect();
            format!("frame {:5}: {}", event.frame_id, keys.join(" "))
        }
    }
}

impl TouchSink for PrintSink {
    fn create_event(&mut self, event: &TouchEvent) {
        let mut stdout = std::io::stdout().lock();
        // Closed stdout is ignored.
        let _ = writeln!(stdout, "{}", self.format(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> TouchEvent {
        TouchEvent {
            frame_id: 12,
            keys: vec![0, 300, 5],
        }
    }

    #[test]
    fn test_plain_format() {
        assert_eq!(PrintSink::new(false).format(&event()), "frame    12: 0 300 5");
    }

    #[test]
    fn test_json_format() {
        let line = PrintSink::new(true).format(&event());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["frame_id"], 12);
        assert_eq!(value["keys"], serde_json::json!([0, 300, 5]));
    }
}
