//! Arbalink Hardware Library
//!
//! Host side of the serial link to Arbalet LED-matrix tables: device
//! fallback, versioned handshake, frame push and touch frame decoding.

pub mod error;
pub mod frame;
pub mod layout;
pub mod link;
pub mod touch;

pub use error::{Error, Result};
pub use frame::{parse_hex_color, Framebuffer, FrameSource, Rgb};
pub use layout::{LayoutKind, LedLayout, PixelMapping};
pub use link::{
    DeviceSelector, Geometry, LinkSettings, LinkState, LinkTransport, ProtocolEngine,
    SerialTransport,
};
pub use touch::{KeyFilter, TouchEvent, TouchSink};

/// Engine driving a real serial port.
pub type SerialEngine = ProtocolEngine<SerialTransport>;
