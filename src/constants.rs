//! Numeric constants shared by the vital-sign pipeline
//!
//! Defaults here mirror the values the pipeline was tuned with on 30 fps
//! webcams. Everything tunable is also exposed through `VitalsConfig`.

/// Frame rate assumed when the capture device reports a missing or invalid rate.
pub const FALLBACK_FRAME_RATE: f32 = 30.0;

/// Default per-channel history length (~12.8 s at 30 fps).
pub const DEFAULT_BUFFER_SIZE: usize = 384;

/// Default number of positive rate estimates averaged for display.
pub const DEFAULT_RATE_HISTORY: usize = 5;

/// Smallest moving-average window the detrender will use.
pub const MIN_DETREND_WINDOW: usize = 3;

/// Seconds per minute, for Hz to per-minute rate conversion.
pub const SECONDS_PER_MINUTE: f32 = 60.0;

/// Spectral magnitudes at or below this are treated as "no energy in band".
pub const MIN_SPECTRAL_MAGNITUDE: f32 = 1e-12;
