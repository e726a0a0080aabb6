//! Application poll loop around the protocol engine.

use arbalink_hw::{Error, FrameSource, LinkTransport, ProtocolEngine, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pacing and stop conditions for [`run_link`].
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Sleep between frame exchanges.
    pub frame_interval: Duration,
    /// Sleep after a failed connection attempt.
    pub reconnect_delay: Duration,
    /// Stop after this many frame exchanges.
    pub max_frames: Option<u64>,
    /// Stop after this many touch frames.
    pub max_touch_frames: Option<u64>,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub touch_frames: u64,
    pub reconnects: u64,
}

impl LoopStats {
    fn done(&self, options: &LoopOptions) -> bool {
        options.max_frames.is_some_and(|max| self.frames >= max)
            || options
                .max_touch_frames
                .is_some_and(|max| self.touch_frames >= max)
    }
}

/// Keeps the link up and pushes `frame` until a limit is hit or `stop` is set.
///
/// Link loss triggers a reconnect; protocol errors end the loop.
pub fn run_link<T, F>(
    engine: &mut ProtocolEngine<T>,
    frame: &F,
    options: &LoopOptions,
    stop: &AtomicBool,
) -> Result<LoopStats>
where
    T: LinkTransport,
    F: FrameSource + ?Sized,
{
    let mut stats = LoopStats::default();
    let mut was_connected = false;

    while !stop.load(Ordering::SeqCst) && !stats.done(options) {
        if !engine.is_connected() {
            if let Err(e) = engine.connect() {
                engine.close();
                return Err(e);
            }
            if !engine.is_connected() {
                std::thread::sleep(options.reconnect_delay);
                continue;
            }
            if was_connected {
                stats.reconnects += 1;
            }
            was_connected = true;
        }

        match engine.write_led_frame(frame) {
            Ok(data_follows) => {
                stats.frames += 1;
                if data_follows {
                    match engine.read_touch_frame() {
                        Ok(event) => {
                            stats.touch_frames += 1;
                            debug!("Touch frame {}", event.frame_id);
                        }
                        Err(e) => warn!("Touch frame lost: {}", e),
                    }
                }
            }
            Err(Error::LinkLost) => {
                warn!("Link lost, reconnecting");
                continue;
            }
            Err(e) => {
                engine.close();
                return Err(e);
            }
        }

        std::thread::sleep(options.frame_interval);
    }

    engine.close();
    info!(
        "Link loop finished: {} frames, {} touch frames, {} reconnects",
        stats.frames, stats.touch_frames, stats.reconnects
    );
    Ok(stats)
}
