//! Serial link to the table controller.
//!
//! Provides the byte transport, device fallback and the protocol engine.

mod devices;
mod engine;
#[cfg(test)]
pub(crate) mod mock;
mod protocol;
mod transport;

pub use devices::DeviceSelector;
pub use engine::{LinkSettings, LinkState, ProtocolEngine, ResyncLatch};
pub use protocol::{
    is_key_noise, is_misaligned, Command, Geometry, BYTES_PER_CELL, DEFAULT_TIMEOUT,
    PROTOCOL_VERSION, RESYNC_SENTINEL,
};
pub use transport::{LinkTransport, SerialTransport};
