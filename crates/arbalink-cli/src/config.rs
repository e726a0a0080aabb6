//! Configuration management.

use anyhow::{Context, Result};
use arbalink_hw::{
    DeviceSelector, Geometry, LayoutKind, LedLayout, LinkSettings, ProtocolEngine,
    SerialEngine, SerialTransport,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial speed in baud
    #[serde(default = "default_speed")]
    pub speed: u32,

    /// Per-operation serial timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Pixel columns
    #[serde(default = "default_width")]
    pub width: usize,

    /// Pixel rows
    #[serde(default = "default_height")]
    pub height: usize,

    /// Output pin driving the LED strip
    #[serde(default = "default_leds_pin")]
    pub leds_pin_number: u8,

    /// Frames per second pushed by the link loop
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Delay between connection attempts in milliseconds
    #[serde(default = "default_reconnect")]
    pub reconnect_ms: u64,

    /// Colour scale factor (0.0-1.0)
    #[serde(default = "default_brightness")]
    pub brightness: f32,

    /// Candidate device paths per platform family ("unix", "windows")
    #[serde(default = "default_devices")]
    pub devices: BTreeMap<String, Vec<String>>,

    /// Touch configuration
    #[serde(default)]
    pub touch: TouchConfig,

    /// LED wiring configuration
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// Touch key configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TouchConfig {
    /// Number of touch keys (0 disables touch)
    #[serde(default)]
    pub num_keys: u8,
}

/// Pixel to LED mapping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// row-major, serpentine, column-serpentine or table
    #[serde(default = "default_layout")]
    pub layout: String,

    /// LED index per cell, `table[row][col]`, for the table layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<Vec<usize>>>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            table: None,
        }
    }
}

// Default value functions
fn default_speed() -> u32 {
    1_000_000
}

fn default_timeout() -> u64 {
    3000
}

fn default_width() -> usize {
    15
}

fn default_height() -> usize {
    10
}

fn default_leds_pin() -> u8 {
    6
}

fn default_rate() -> u32 {
    20
}

fn default_reconnect() -> u64 {
    1000
}

fn default_brightness() -> f32 {
    1.0
}

fn default_layout() -> String {
    LayoutKind::default().to_string()
}

fn default_devices() -> BTreeMap<String, Vec<String>> {
    let unix = ["/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyUSB0", "/dev/ttyUSB1"];
    let windows = ["COM3", "COM4", "COM5", "COM6"];
    BTreeMap::from([
        ("unix".to_string(), unix.map(String::from).to_vec()),
        ("windows".to_string(), windows.map(String::from).to_vec()),
    ])
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Candidate device paths for a platform family.
    pub fn device_paths(&self, platform: &str) -> Result<&[String]> {
        self.devices
            .get(platform)
            .map(Vec::as_slice)
            .with_context(|| format!("No devices configured for platform '{}'", platform))
    }

    /// Device selector for a platform family.
    pub fn device_selector(&self, platform: &str) -> Result<DeviceSelector> {
        let paths = self.device_paths(platform)?;
        DeviceSelector::new(paths.iter().cloned())
            .with_context(|| format!("Device list for platform '{}' is empty", platform))
    }

    /// Geometry announced to the firmware.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            width: self.width,
            height: self.height,
            leds_pin_number: self.leds_pin_number,
            num_touch_keys: self.touch.num_keys,
        }
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.speed,
            geometry: self.geometry(),
            brightness: self.brightness,
        }
    }

    /// Builds the configured LED layout.
    pub fn led_layout(&self) -> Result<LedLayout> {
        let kind: LayoutKind = self.mapping.layout.parse()?;
        let layout = LedLayout::new(kind, self.width, self.height, self.mapping.table.clone())?;
        Ok(layout)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.rate.max(1)))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    /// Builds a serial engine over the given device candidates.
    pub fn build_engine(&self, devices: DeviceSelector) -> Result<SerialEngine> {
        let engine = ProtocolEngine::new(
            SerialTransport::new(self.timeout()),
            devices,
            self.link_settings(),
            self.led_layout()?,
        )
        .context("Invalid link configuration")?;
        Ok(engine)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            timeout_ms: default_timeout(),
            width: default_width(),
            height: default_height(),
            leds_pin_number: default_leds_pin(),
            rate: default_rate(),
            reconnect_ms: default_reconnect(),
            brightness: default_brightness(),
            devices: default_devices(),
            touch: TouchConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.speed, 1_000_000);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!((config.width, config.height), (15, 10));
        assert_eq!(config.touch.num_keys, 0);
        assert_eq!(config.led_layout().unwrap().kind(), LayoutKind::Serpentine);
        assert_eq!(config.device_paths("unix").unwrap()[0], "/dev/ttyACM0");
        assert_eq!(config.device_paths("windows").unwrap()[0], "COM3");
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            r#"
            speed = 115200
            width = 2
            height = 2
            leds_pin_number = 3
            rate = 50

            [devices]
            unix = ["/dev/ttyUSB3"]

            [touch]
            num_keys = 4

            [mapping]
            layout = "table"
            table = [[3, 2], [0, 1]]
            "#,
        )
        .unwrap();

        let geometry = config.geometry();
        assert_eq!(geometry.cell_count().unwrap(), 4);
        assert_eq!(geometry.num_touch_keys, 4);
        assert_eq!(config.link_settings().baud_rate, 115200);
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
        assert_eq!(config.led_layout().unwrap().kind(), LayoutKind::Table);

        let selector = config.device_selector("unix").unwrap();
        assert_eq!(selector.paths(), ["/dev/ttyUSB3".to_string()]);
        assert!(config.device_selector("windows").is_err());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let config = Config::parse("[mapping]\nlayout = \"spiral\"").unwrap();
        assert!(config.led_layout().is_err());

        let config = Config::parse("width = 2\nheight = 1\n[mapping]\nlayout = \"table\"").unwrap();
        assert!(config.led_layout().is_err());
    }

    #[test]
    fn test_empty_device_list_rejected() {
        let config = Config::parse("[devices]\nunix = []").unwrap();
        assert!(config.device_selector("unix").is_err());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.devices, config.devices);
        assert_eq!(parsed.mapping.layout, "serpentine");
    }
}
