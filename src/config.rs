//! Configuration for the vitalscope pipeline.
//!
//! ## Recording channel assignment
//!
//! Recordings are stereo float WAV files sampled at the frame rate. By
//! default the left channel carries the cardiac (green ROI mean) trace and
//! the right channel carries the respiration (shoulder motion) trace. Swap
//! them with `cardiac_channel` / `respiration_channel`:
//!
//! ```toml
//! [capture]
//! cardiac_channel = "right"
//! respiration_channel = "left"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_RATE_HISTORY, FALLBACK_FRAME_RATE};
use crate::error::{Result, VitalsError};
use crate::processing::{Channel, FrameSample};
use crate::signal_processing::FilterSpec;

/// Camera frame rate specification
///
/// Can be specified either as frames per second or as a frame interval in
/// milliseconds. Useful for cameras that advertise their frame period.
///
/// # Parsing formats
/// - `30` - frames per second (no suffix)
/// - `30fps` or `30FPS` - frames per second (explicit)
/// - `33.3ms` - frame interval in milliseconds
///
/// # Example
/// ```
/// use vitalscope::config::FrameRate;
///
/// let rate: FrameRate = "40ms".parse().unwrap();
/// assert!((rate.as_fps() - 25.0).abs() < 0.001);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameRate(f32);

impl FrameRate {
    /// Create from frames per second
    pub fn from_fps(fps: f32) -> Self {
        Self(fps)
    }

    /// Create from frame interval in milliseconds
    pub fn from_interval_ms(ms: f32) -> Self {
        Self(1000.0 / ms)
    }

    /// Get frames per second
    pub fn as_fps(&self) -> f32 {
        self.0
    }

    /// Get frame interval in milliseconds
    pub fn as_interval_ms(&self) -> f32 {
        1000.0 / self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::from_fps(FALLBACK_FRAME_RATE)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}fps", self.0)
    }
}

impl FromStr for FrameRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(num) = s.strip_suffix("ms") {
            let ms: f32 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid frame interval: {}", s))?;
            if ms <= 0.0 {
                return Err("frame interval must be positive".to_string());
            }
            return Ok(Self::from_interval_ms(ms));
        }

        let num = s
            .strip_suffix("fps")
            .or_else(|| s.strip_suffix("FPS"))
            .unwrap_or(s);

        let fps: f32 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frame rate: {}", s))?;
        if fps <= 0.0 {
            return Err("frame rate must be positive".to_string());
        }
        Ok(Self::from_fps(fps))
    }
}

/// Channel assignment for stereo recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// Left channel (index 0 in interleaved stereo)
    Left,
    /// Right channel (index 1 in interleaved stereo)
    Right,
}

/// System-wide configuration
///
/// Use `VitalsConfig::default()` for the values the pipeline was tuned with,
/// or load a partial TOML file where every missing field keeps its default.
///
/// # Example
/// ```
/// use vitalscope::config::VitalsConfig;
///
/// let config = VitalsConfig::from_toml_str("[smoothing]\nhistory_size = 15\n").unwrap();
/// assert_eq!(config.smoothing.history_size, 15);
/// assert_eq!(config.capture.buffer_size, 384);
/// ```
#[derive(Debug, Clone)]
pub struct VitalsConfig {
    /// Frame acquisition configuration
    pub capture: CaptureConfig,
    /// Cardiac (rPPG) channel configuration
    pub cardiac: ChannelConfig,
    /// Respiration (shoulder motion) channel configuration
    pub respiration: ChannelConfig,
    /// Displayed-rate smoothing
    pub smoothing: SmoothingConfig,
    /// Console output configuration
    pub output: OutputConfig,
}

/// Frame acquisition configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Camera frame rate in frames per second (the sampling rate of both channels)
    pub frame_rate: f32,
    /// Per-channel history length in frames. Estimation starts once it is full.
    pub buffer_size: usize,
    /// Which recording channel holds the cardiac trace
    pub cardiac_channel: ChannelRole,
    /// Which recording channel holds the respiration trace
    pub respiration_channel: ChannelRole,
}

/// Per-channel band and analysis parameters
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bandpass lower cutoff in Hz
    pub low_hz: f32,
    /// Bandpass upper cutoff in Hz
    pub high_hz: f32,
    /// Butterworth filter order
    pub filter_order: usize,
    /// Moving-average window used to remove slow drift, in seconds
    pub detrend_window_secs: f32,
    /// Minimum amount of filtered data (seconds) before a rate is estimated
    pub min_analysis_secs: f32,
}

/// Displayed-rate smoothing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    /// Number of recent positive estimates averaged for display
    pub history_size: usize,
}

/// Console output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Rate output frequency in Hz (in stream time, not wall time)
    pub output_rate_hz: f32,
}

impl ChannelConfig {
    /// Heart rate band: 0.75-4 Hz (45-240 BPM)
    pub fn cardiac() -> Self {
        Self {
            low_hz: 0.75,
            high_hz: 4.0,
            filter_order: 5,
            detrend_window_secs: 2.0,
            min_analysis_secs: 1.0,
        }
    }

    /// Breathing band: 0.1-0.8 Hz (6-48 breaths/min, light activity included)
    pub fn respiration() -> Self {
        Self {
            low_hz: 0.1,
            high_hz: 0.8,
            filter_order: 2,
            detrend_window_secs: 10.0,
            min_analysis_secs: 2.0,
        }
    }

    /// Validated filter parameters for this channel at the given frame rate
    pub fn filter_spec(&self, frame_rate: f32) -> Result<FilterSpec> {
        FilterSpec::new(frame_rate, self.low_hz, self.high_hz, self.filter_order)
    }
}

impl CaptureConfig {
    /// Build a frame sample from one stereo recording frame
    pub fn frame_from_stereo(&self, left: f32, right: f32) -> FrameSample {
        let pick = |role: ChannelRole| match role {
            ChannelRole::Left => left,
            ChannelRole::Right => right,
        };
        FrameSample {
            cardiac: pick(self.cardiac_channel),
            respiration: pick(self.respiration_channel),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_rate: FALLBACK_FRAME_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            cardiac_channel: ChannelRole::Left,
            respiration_channel: ChannelRole::Right,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_RATE_HISTORY,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_rate_hz: 1.0,
        }
    }
}

impl VitalsConfig {
    /// Parse a (possibly partial) TOML configuration
    ///
    /// Sections default independently; a partial `[respiration]` section keeps
    /// the breathing-band values for every field it leaves out.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| VitalsError::Config(e.to_string()))?;
        Ok(raw.into())
    }

    /// Read and parse a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parameters for one channel
    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::Cardiac => &self.cardiac,
            Channel::Respiration => &self.respiration,
        }
    }

    /// Check the invariants the pipeline relies on
    ///
    /// The pipeline itself never fails on a bad configuration (it degrades to
    /// unfiltered output), so this is the place to reject one up front.
    pub fn validate(&self) -> Result<()> {
        let fs = self.capture.frame_rate;
        if !fs.is_finite() || fs <= 0.0 {
            return Err(VitalsError::Config(format!(
                "frame rate must be positive, got {}",
                fs
            )));
        }

        for channel in [Channel::Cardiac, Channel::Respiration] {
            let cfg = self.channel(channel);
            cfg.filter_spec(fs)
                .map_err(|e| VitalsError::Config(format!("{} channel: {}", channel, e)))?;

            let needed = 3 * cfg.filter_order;
            if self.capture.buffer_size < needed {
                return Err(VitalsError::Config(format!(
                    "{} channel: buffer size {} is below the {} samples an order-{} filter needs",
                    channel, self.capture.buffer_size, needed, cfg.filter_order
                )));
            }

            if cfg.detrend_window_secs <= 0.0 || cfg.min_analysis_secs < 0.0 {
                return Err(VitalsError::Config(format!(
                    "{} channel: detrend window and analysis length must be positive",
                    channel
                )));
            }
        }

        if self.smoothing.history_size == 0 {
            return Err(VitalsError::Config(
                "smoothing history size must be at least 1".to_string(),
            ));
        }

        if self.output.output_rate_hz <= 0.0 {
            return Err(VitalsError::Config(
                "output rate must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Deserialization shim so the respiration section gets breathing-band defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    capture: CaptureConfig,
    cardiac: ChannelOverrides,
    respiration: ChannelOverrides,
    smoothing: SmoothingConfig,
    output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChannelOverrides {
    low_hz: Option<f32>,
    high_hz: Option<f32>,
    filter_order: Option<usize>,
    detrend_window_secs: Option<f32>,
    min_analysis_secs: Option<f32>,
}

impl ChannelOverrides {
    fn apply(self, defaults: ChannelConfig) -> ChannelConfig {
        ChannelConfig {
            low_hz: self.low_hz.unwrap_or(defaults.low_hz),
            high_hz: self.high_hz.unwrap_or(defaults.high_hz),
            filter_order: self.filter_order.unwrap_or(defaults.filter_order),
            detrend_window_secs: self
                .detrend_window_secs
                .unwrap_or(defaults.detrend_window_secs),
            min_analysis_secs: self.min_analysis_secs.unwrap_or(defaults.min_analysis_secs),
        }
    }
}

impl From<RawConfig> for VitalsConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            capture: raw.capture,
            cardiac: raw.cardiac.apply(ChannelConfig::cardiac()),
            respiration: raw.respiration.apply(ChannelConfig::respiration()),
            smoothing: raw.smoothing,
            output: raw.output,
        }
    }
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            cardiac: ChannelConfig::cardiac(),
            respiration: ChannelConfig::respiration(),
            smoothing: SmoothingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_from_fps() {
        let rate: FrameRate = "29.97".parse().unwrap();
        assert!((rate.as_fps() - 29.97).abs() < 0.001);
    }

    #[test]
    fn test_frame_rate_from_fps_explicit() {
        let rate: FrameRate = "30fps".parse().unwrap();
        assert!((rate.as_fps() - 30.0).abs() < 0.001);

        let rate: FrameRate = "60FPS".parse().unwrap();
        assert!((rate.as_fps() - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_frame_rate_from_interval_ms() {
        let rate: FrameRate = "33.333ms".parse().unwrap();
        assert!((rate.as_fps() - 30.0).abs() < 0.01);
        assert!((rate.as_interval_ms() - 33.333).abs() < 0.001);
    }

    #[test]
    fn test_frame_rate_invalid() {
        assert!("abc".parse::<FrameRate>().is_err());
        assert!("-30fps".parse::<FrameRate>().is_err());
        assert!("0ms".parse::<FrameRate>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = VitalsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cardiac.filter_order, 5);
        assert_eq!(config.respiration.filter_order, 2);
        assert!((config.respiration.high_hz - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_channel_defaults() {
        let config = VitalsConfig::from_toml_str(
            r#"
            [capture]
            frame_rate = 25.0
            buffer_size = 256

            [respiration]
            high_hz = 0.5
            "#,
        )
        .unwrap();

        assert!((config.capture.frame_rate - 25.0).abs() < f32::EPSILON);
        assert_eq!(config.capture.buffer_size, 256);
        assert!((config.respiration.high_hz - 0.5).abs() < f32::EPSILON);
        assert!((config.respiration.low_hz - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.respiration.filter_order, 2);
        assert!((config.cardiac.low_hz - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_toml_channel_roles() {
        let config = VitalsConfig::from_toml_str(
            "[capture]\ncardiac_channel = \"right\"\nrespiration_channel = \"left\"\n",
        )
        .unwrap();
        let frame = config.capture.frame_from_stereo(1.0, 2.0);
        assert_eq!(frame.cardiac, 2.0);
        assert_eq!(frame.respiration, 1.0);
    }

    #[test]
    fn test_toml_rejects_unknown_fields() {
        assert!(VitalsConfig::from_toml_str("[capture]\nfps = 30\n").is_err());
    }

    #[test]
    fn test_validate_rejects_band_above_nyquist() {
        let mut config = VitalsConfig::default();
        config.capture.frame_rate = 6.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cardiac"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_short_buffer_and_empty_history() {
        let mut config = VitalsConfig::default();
        config.capture.buffer_size = 10;
        assert!(config.validate().is_err());

        let mut config = VitalsConfig::default();
        config.smoothing.history_size = 0;
        assert!(config.validate().is_err());
    }
}
