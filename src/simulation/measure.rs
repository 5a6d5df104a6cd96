use crate::config::VitalsConfig;
use crate::processing::{Channel, FrameSample, VitalsProcessor};

use super::{NoiseConfig, generate_noisy_test_frames};

/// Rates observed while running a recording through the pipeline
#[derive(Debug, Clone, Default)]
pub struct RateMeasurement {
    /// Last smoothed cardiac rate
    pub bpm: f32,
    /// Last smoothed respiration rate
    pub rpm: f32,
    /// Every positive instantaneous cardiac estimate
    pub bpm_estimates: Vec<f32>,
    /// Every positive instantaneous respiration estimate
    pub rpm_estimates: Vec<f32>,
    /// Frame index of the first positive cardiac estimate
    pub first_cardiac_frame: Option<u64>,
    /// Frame index of the first positive respiration estimate
    pub first_respiration_frame: Option<u64>,
}

impl RateMeasurement {
    pub fn final_rate(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Cardiac => self.bpm,
            Channel::Respiration => self.rpm,
        }
    }

    pub fn estimates(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Cardiac => &self.bpm_estimates,
            Channel::Respiration => &self.rpm_estimates,
        }
    }
}

pub fn measure_rates(frames: &[FrameSample], config: &VitalsConfig) -> RateMeasurement {
    let mut processor = VitalsProcessor::new(config);
    let mut measurement = RateMeasurement::default();

    for (index, &frame) in frames.iter().enumerate() {
        let result = processor.process_frame(frame);

        if result.cardiac.rate > 0.0 {
            measurement.bpm_estimates.push(result.cardiac.rate);
            measurement.first_cardiac_frame.get_or_insert(index as u64);
        }
        if result.respiration.rate > 0.0 {
            measurement.rpm_estimates.push(result.respiration.rate);
            measurement
                .first_respiration_frame
                .get_or_insert(index as u64);
        }

        measurement.bpm = result.cardiac.smoothed_rate;
        measurement.rpm = result.respiration.smoothed_rate;
    }

    measurement
}

#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    /// Largest absolute error of the final smoothed rate
    pub max_error: f32,
    /// Mean absolute error of the final smoothed rate
    pub mean_error: f32,
    /// Test rates that produced no estimate at all
    pub missed: usize,
}

/// Run one noisy recording per expected rate and collect final-rate errors
///
/// Each recording holds `expected` on `channel` and a fixed mid-band rate on
/// the other channel (72 BPM or 15 RPM).
pub fn measure_error_across_rates(
    channel: Channel,
    expected_rates: &[f32],
    noise_config: &NoiseConfig,
    config: &VitalsConfig,
    duration_secs: f32,
) -> ErrorStats {
    let frame_rate = config.capture.frame_rate;
    let mut errors = Vec::new();
    let mut missed = 0;

    for &expected in expected_rates {
        let (bpm, rpm) = match channel {
            Channel::Cardiac => (expected, 15.0),
            Channel::Respiration => (72.0, expected),
        };
        let frames = generate_noisy_test_frames(duration_secs, frame_rate, bpm, rpm, noise_config);
        let measurement = measure_rates(&frames, config);

        let measured = measurement.final_rate(channel);
        if measured > 0.0 {
            errors.push((measured - expected).abs());
        } else {
            missed += 1;
        }
    }

    let mean_error = if errors.is_empty() {
        0.0
    } else {
        errors.iter().sum::<f32>() / errors.len() as f32
    };

    ErrorStats {
        max_error: errors.iter().fold(0.0f32, |a, &b| a.max(b)),
        mean_error,
        missed,
    }
}
