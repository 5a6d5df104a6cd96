pub mod detrend;
pub mod iir_butterworth_bandpass;
pub mod rate_smoother;
pub mod sample_buffer;
pub mod spectrum;

pub use detrend::{Detrender, detrend};
pub use iir_butterworth_bandpass::{BandpassOutcome, FilterSpec};
pub use rate_smoother::RateSmoother;
pub use sample_buffer::SampleBuffer;
pub use spectrum::{SpectralRateEstimator, dominant_bin, hz_to_per_minute};
