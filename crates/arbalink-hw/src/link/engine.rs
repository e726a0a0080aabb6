//! Connection lifecycle, handshake and steady-state frame exchange.

use super::devices::DeviceSelector;
use super::protocol::{is_misaligned, Command, Geometry, PROTOCOL_VERSION, RESYNC_SENTINEL};
use super::transport::LinkTransport;
use crate::frame::{build_serial_frame, FrameSource};
use crate::layout::{validate_mapping, PixelMapping};
use crate::touch::{KeyFilter, TouchEvent, TouchSink};
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Link parameters fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSettings {
    /// Serial speed.
    pub baud_rate: u32,
    /// Geometry sent during handshake.
    pub geometry: Geometry,
    /// Colour scale factor in `[0, 1]`.
    pub brightness: f32,
}

/// Externally visible link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// One-shot resynchronization state of the 16-bit reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncLatch {
    /// Reads come from the transport.
    #[default]
    Normal,
    /// The next read returns the sentinel without touching the transport.
    ForceSentinelOnce,
}

/// Host side of the table link.
///
/// Owns the transport, the device cursor, the touch noise memory and the
/// resync latch. Calls are expected to come from a single thread.
pub struct ProtocolEngine<T: LinkTransport> {
    transport: T,
    devices: DeviceSelector,
    settings: LinkSettings,
    mapping: Box<dyn PixelMapping + Send>,
    touch_sink: Option<Box<dyn TouchSink + Send>>,
    key_filter: KeyFilter,
    latch: ResyncLatch,
    connected: bool,
    io_fault: bool,
}

impl<T: LinkTransport> ProtocolEngine<T> {
    /// Creates a disconnected engine.
    ///
    /// Fails if the geometry does not fit the wire format or the mapping is
    /// not a bijection onto the LEDs of the grid.
    pub fn new<M>(
        transport: T,
        devices: DeviceSelector,
        settings: LinkSettings,
        mapping: M,
    ) -> Result<Self>
    where
        M: PixelMapping + Send + 'static,
    {
        let geometry = settings.geometry;
        geometry.cell_count()?;
        validate_mapping(&mapping, geometry.width, geometry.height)?;

        Ok(Self {
            transport,
            devices,
            settings,
            mapping: Box::new(mapping),
            touch_sink: None,
            key_filter: KeyFilter::new(geometry.num_touch_keys as usize),
            latch: ResyncLatch::Normal,
            connected: false,
            io_fault: false,
        })
    }

    /// Sets the receiver of decoded touch frames.
    pub fn with_touch_sink<S>(mut self, sink: S) -> Self
    where
        S: TouchSink + Send + 'static,
    {
        self.touch_sink = Some(Box::new(sink));
        self
    }

    /// Opens the current candidate and runs the handshake.
    ///
    /// Returns `Ok(false)` for retriable failures (device absent or busy,
    /// I/O failure during handshake); an open failure also moves to the next
    /// candidate. Protocol failures are returned as errors.
    pub fn connect(&mut self) -> Result<bool> {
        if self.is_connected() {
            debug!("Keeping intact connection to {}", self.devices.current());
            return Ok(true);
        }
        if self.transport.is_open() {
            debug!("Closing former connection");
            self.transport.close();
        }
        self.connected = false;

        let device = self.devices.current().to_string();
        if let Err(e) = self.transport.open(&device, self.settings.baud_rate) {
            let next = self.devices.advance();
            warn!(
                "Connection to {} at {} baud failed: {} (next candidate: {})",
                device, self.settings.baud_rate, e, next
            );
            return Ok(false);
        }

        match self.handshake() {
            Ok(()) => {
                info!("Hardware initialization successful on {}", device);
                Ok(true)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Handshake failure on {}: {}", device, e);
                Ok(false)
            }
        }
    }

    /// Runs the handshake on an already open transport.
    pub fn handshake(&mut self) -> Result<()> {
        self.connected = false;
        self.io_fault = false;

        let hello = self.read_char();
        self.check_io()?;
        if hello != Command::Hello as u8 {
            return Err(Error::UnexpectedGreeting {
                expected: Command::Hello as u8,
                got: hello,
            });
        }
        self.write_char(Command::Hello as u8);

        let version = self.read_uint8();
        self.check_io()?;
        if version == Command::Hello as u8 {
            return Err(Error::UnexpectedReset);
        }
        if version != PROTOCOL_VERSION {
            return Err(Error::VersionSkew {
                peer: version,
                host: PROTOCOL_VERSION,
            });
        }

        let geometry = self.settings.geometry;
        self.write_short(geometry.cell_count()?);
        self.write_uint8(geometry.leds_pin_number);
        self.write_uint8(geometry.num_touch_keys);
        if let Err(e) = self.transport.flush() {
            self.mark_fault(&e);
        }
        self.check_io()?;

        let init_result = self.read_char();
        self.check_io()?;
        match Command::from_byte(init_result) {
            Some(Command::ClientInitSuccess) => {
                self.key_filter.reset();
                self.latch = ResyncLatch::Normal;
                self.connected = true;
                Ok(())
            }
            Some(Command::ClientInitFailure) => Err(Error::InitFailure),
            _ => Err(Error::UnexpectedInitResult(init_result)),
        }
    }

    /// Pushes one frame when the peer signals it is ready.
    ///
    /// Returns true when the peer announced that a touch frame follows.
    /// Unknown ready tokens are ignored and nothing is written.
    pub fn write_led_frame<F>(&mut self, frame: &F) -> Result<bool>
    where
        F: FrameSource + ?Sized,
    {
        self.ensure_connected()?;
        let geometry = self.settings.geometry;
        if frame.width() != geometry.width || frame.height() != geometry.height {
            return Err(Error::FrameGeometry {
                expected_width: geometry.width,
                expected_height: geometry.height,
                width: frame.width(),
                height: frame.height(),
            });
        }

        self.io_fault = false;
        let ready = self.read_char();
        if self.io_fault {
            return Err(self.drop_link());
        }

        match Command::from_byte(ready) {
            Some(command @ (Command::BufferReady | Command::BufferReadyDataFollows)) => {
                let buffer =
                    build_serial_frame(frame, &*self.mapping, self.settings.brightness);
                if let Err(e) = self.send(&buffer) {
                    warn!("Frame write failed: {}", e);
                    return Err(self.drop_link());
                }
                Ok(command == Command::BufferReadyDataFollows)
            }
            _ => {
                debug!("Skipping unexpected ready token 0x{:02X}", ready);
                Ok(false)
            }
        }
    }

    /// Reads one touch frame and forwards it to the sink.
    pub fn read_touch_frame(&mut self) -> Result<TouchEvent> {
        self.ensure_connected()?;
        self.io_fault = false;

        let frame_id = self.read_short();
        if self.io_fault {
            return Err(self.drop_link());
        }

        let num_keys = self.settings.geometry.num_touch_keys as usize;
        let mut keys = Vec::with_capacity(num_keys);
        for key in 0..num_keys {
            let raw = self.read_short();
            if self.io_fault {
                return Err(self.drop_link());
            }
            keys.push(self.key_filter.filter(key, raw));
        }

        let event = TouchEvent { frame_id, keys };
        if num_keys > 0 {
            if let Some(sink) = self.touch_sink.as_mut() {
                sink.create_event(&event);
            }
        }
        Ok(event)
    }

    /// Closes the transport and clears the connected flag.
    pub fn close(&mut self) {
        self.transport.close();
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.transport.is_open()
    }

    pub fn link_state(&self) -> LinkState {
        if self.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    /// Current state of the 16-bit reader latch.
    pub fn resync_latch(&self) -> ResyncLatch {
        self.latch
    }

    pub fn devices(&self) -> &DeviceSelector {
        &self.devices
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Reads one byte; 0 on failure.
    pub fn read_char(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        match self.transport.read_exact(&mut buf) {
            Ok(()) => buf[0],
            Err(e) => {
                self.mark_fault(&e);
                0
            }
        }
    }

    pub fn read_uint8(&mut self) -> u8 {
        self.read_char()
    }

    pub fn write_char(&mut self, value: u8) {
        if let Err(e) = self.transport.write_all(&[value]) {
            self.mark_fault(&e);
        }
    }

    pub fn write_uint8(&mut self, value: u8) {
        self.write_char(value)
    }

    /// Reads a little-endian u16; 0 on failure.
    ///
    /// A value in the misalignment band means a stray byte shifted the
    /// stream: one byte is dropped, this read and the next one both return
    /// [`RESYNC_SENTINEL`], and the next one consumes nothing.
    pub fn read_short(&mut self) -> u16 {
        if std::mem::take(&mut self.latch) == ResyncLatch::ForceSentinelOnce {
            return RESYNC_SENTINEL;
        }

        let mut buf = [0u8; 2];
        let value = match self.transport.read_exact(&mut buf) {
            Ok(()) => u16::from_le_bytes(buf),
            Err(e) => {
                self.mark_fault(&e);
                return 0;
            }
        };

        if is_misaligned(value) {
            debug!("Misaligned read {}, dropping one byte", value);
            self.read_char();
            self.latch = ResyncLatch::ForceSentinelOnce;
            return RESYNC_SENTINEL;
        }
        value
    }

    pub fn write_short(&mut self, value: u16) {
        if let Err(e) = self.transport.write_all(&value.to_le_bytes()) {
            self.mark_fault(&e);
        }
    }

    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        self.transport.write_all(buffer)?;
        self.transport.flush()
    }

    fn mark_fault(&mut self, e: &Error) {
        debug!("Link I/O failure: {}", e);
        self.io_fault = true;
        self.connected = false;
    }

    fn check_io(&self) -> Result<()> {
        if self.io_fault {
            Err(Error::LinkLost)
        } else {
            Ok(())
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn drop_link(&mut self) -> Error {
        warn!("Lost link to {}", self.devices.current());
        self.close();
        Error::LinkLost
    }
}
