//! Error types for the Arbalink hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the table.
#[derive(Error, Debug)]
pub enum Error {
    /// No candidate device paths were configured.
    #[error("Device candidate list is empty")]
    NoDevices,

    /// Serial port could not be opened.
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Serial I/O error (includes read timeouts).
    #[error("Serial I/O error: {0}")]
    SerialIo(#[from] std::io::Error),

    /// The peer greeted with something other than HELLO.
    #[error("Expected HELLO (0x{expected:02X}) from hardware, got 0x{got:02X}")]
    UnexpectedGreeting { expected: u8, got: u8 },

    /// The peer sent HELLO again where the protocol version belongs.
    #[error(
        "Hardware has reset unexpectedly during handshake, check wiring and configuration file"
    )]
    UnexpectedReset,

    /// Firmware and host disagree on the protocol version.
    #[error("Hardware uses protocol v{peer}, host uses protocol v{host}")]
    VersionSkew { peer: u8, host: u8 },

    /// The peer could not allocate its frame buffers.
    #[error("Hardware could not allocate buffers, init failure")]
    InitFailure,

    /// The peer answered the geometry with an unknown byte.
    #[error("Expected CLIENT_INIT_SUCCESS or CLIENT_INIT_FAILURE, got 0x{0:02X}")]
    UnexpectedInitResult(u8),

    /// The link dropped mid-exchange; the transport has been closed.
    #[error("Link lost, reconnect required")]
    LinkLost,

    /// A frame operation was attempted before a successful handshake.
    #[error("Not connected")]
    NotConnected,

    /// Geometry cannot be described on the wire.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// LED layout is not a valid pixel to LED mapping.
    #[error("Invalid LED layout: {0}")]
    InvalidLayout(String),

    /// Frame size does not match the geometry agreed during handshake.
    #[error("Frame size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    FrameGeometry {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    /// Colour string could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

impl Error {
    /// Returns true for protocol failures that retrying will not fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedGreeting { .. }
                | Error::UnexpectedReset
                | Error::VersionSkew { .. }
                | Error::InitFailure
                | Error::UnexpectedInitResult(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::UnexpectedReset.is_fatal());
        assert!(Error::VersionSkew { peer: 1, host: 2 }.is_fatal());
        assert!(Error::UnexpectedInitResult(b'X').is_fatal());
        assert!(!Error::LinkLost.is_fatal());
        assert!(!Error::NotConnected.is_fatal());
    }

    #[test]
    fn test_messages_name_details() {
        let msg = Error::VersionSkew { peer: 1, host: 2 }.to_string();
        assert!(msg.contains("v1") && msg.contains("v2"));
        assert!(Error::UnexpectedInitResult(0x5A).to_string().contains("0x5A"));
    }
}
