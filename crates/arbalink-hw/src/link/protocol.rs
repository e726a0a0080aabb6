//! Wire protocol definitions.
//!
//! Handshake:
//! - peer → host: `HELLO`
//! - host → peer: `HELLO`
//! - peer → host: protocol version (1 byte)
//! - host → peer: cell count (u16 LE), LED pin (1 byte), touch key count (1 byte)
//! - peer → host: `CLIENT_INIT_SUCCESS` or `CLIENT_INIT_FAILURE`
//!
//! Steady state, once per frame:
//! - peer → host: ready token
//! - host → peer: `width * height * 3` bytes of RGB in LED order
//! - peer → host (after `BUFFER_READY_DATA_FOLLOWS`): touch frame id (u16 LE),
//!   then one u16 LE per touch key

use crate::{Error, Result};

/// Protocol version agreed with the firmware.
pub const PROTOCOL_VERSION: u8 = 2;

/// Default per-operation I/O timeout.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(3);

/// Bytes per cell in the serial frame buffer.
pub const BYTES_PER_CELL: usize = 3;

/// Value substituted for a 16-bit read that looks misaligned.
pub const RESYNC_SENTINEL: u16 = 1001;

/// Reads strictly inside this band are treated as byte-alignment artifacts.
pub const MISALIGNED_LOW: u16 = 17000;
pub const MISALIGNED_HIGH: u16 = 60000;

/// Key states strictly inside this band are treated as corrupted.
pub const KEY_NOISE_LOW: u16 = 1000;
pub const KEY_NOISE_HIGH: u16 = 60000;

/// Single-byte protocol opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Greeting, sent by both sides.
    Hello = b'H',
    /// Peer can accept a new frame.
    BufferReady = b'B',
    /// Peer can accept a new frame and will send a touch frame after it.
    BufferReadyDataFollows = b'D',
    /// Peer allocated its buffers.
    ClientInitSuccess = b'S',
    /// Peer could not allocate its buffers.
    ClientInitFailure = b'F',
}

impl Command {
    /// Converts a byte value to a Command.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'H' => Some(Command::Hello),
            b'B' => Some(Command::BufferReady),
            b'D' => Some(Command::BufferReadyDataFollows),
            b'S' => Some(Command::ClientInitSuccess),
            b'F' => Some(Command::ClientInitFailure),
            _ => None,
        }
    }
}

/// Dimensions and buffer sizing sent to the firmware during handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Pixel columns.
    pub width: usize,
    /// Pixel rows.
    pub height: usize,
    /// Output pin driving the LED strip.
    pub leds_pin_number: u8,
    /// Number of capacitive touch keys.
    pub num_touch_keys: u8,
}

impl Geometry {
    /// Total number of cells, as sent on the wire.
    pub fn cell_count(&self) -> Result<u16> {
        self.width
            .checked_mul(self.height)
            .and_then(|cells| u16::try_from(cells).ok())
            .ok_or_else(|| {
                Error::InvalidGeometry(format!(
                    "{}x{} does not fit in a 16-bit cell count",
                    self.width, self.height
                ))
            })
    }
}

/// Returns true if a raw 16-bit read is a suspected stray-byte artifact.
pub fn is_misaligned(value: u16) -> bool {
    value > MISALIGNED_LOW && value < MISALIGNED_HIGH
}

/// Returns true if a key state reading is in the corrupted band.
pub fn is_key_noise(value: u16) -> bool {
    value > KEY_NOISE_LOW && value < KEY_NOISE_HIGH
}
