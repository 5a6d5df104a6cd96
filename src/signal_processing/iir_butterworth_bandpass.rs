use crate::error::{Result, VitalsError};
use iir_filters::filter::{DirectForm2Transposed, Filter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::zpk2sos;

/// Bandpass parameters for one channel
///
/// Invariant: `0 < low_hz < high_hz < sample_rate / 2`, checked by `new`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub sample_rate: f32,
    pub low_hz: f32,
    pub high_hz: f32,
    pub order: usize,
}

impl FilterSpec {
    /// Create a validated filter specification
    ///
    /// # Errors
    /// Returns `VitalsError::Config` if the order is zero or the band does
    /// not fit strictly between 0 Hz and Nyquist.
    pub fn new(sample_rate: f32, low_hz: f32, high_hz: f32, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(VitalsError::Config("filter order must be at least 1".into()));
        }
        if normalized_band(low_hz, high_hz, sample_rate).is_none() {
            return Err(VitalsError::Config(format!(
                "band {}-{} Hz does not fit below Nyquist ({} Hz)",
                low_hz,
                high_hz,
                sample_rate / 2.0
            )));
        }
        Ok(Self {
            sample_rate,
            low_hz,
            high_hz,
            order,
        })
    }

    /// Shortest input the filter accepts
    pub fn min_input_len(&self) -> usize {
        3 * self.order
    }

    /// Zero-phase filter `data` with this specification
    pub fn apply(&self, data: &[f32]) -> BandpassOutcome {
        apply(data, self.low_hz, self.high_hz, self.order, self.sample_rate)
    }
}

/// Result of a zero-phase bandpass pass
#[derive(Debug, Clone, PartialEq)]
pub enum BandpassOutcome {
    /// Filtered samples, same length as the input
    Filtered(Vec<f32>),
    /// Input shorter than `3 * order`; nothing to show yet
    TooShort,
    /// Invalid band or order, or numerical failure; the input is returned unchanged
    Unfiltered(Vec<f32>),
}

impl BandpassOutcome {
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered(_))
    }

    /// Samples carried by the outcome (empty for `TooShort`)
    pub fn into_samples(self) -> Vec<f32> {
        match self {
            Self::Filtered(samples) | Self::Unfiltered(samples) => samples,
            Self::TooShort => Vec::new(),
        }
    }
}

/// Zero-phase Butterworth bandpass over a finite window
///
/// Runs the filter forward and then backward over the window so the passband
/// keeps its timing relative to the raw trace. No state survives the call.
///
/// The window is extended at both ends by odd reflection before filtering,
/// and each pass starts from the filter's steady state for its first sample,
/// which keeps start-up transients out of the returned samples.
///
/// # Arguments
/// * `data` - Samples to filter
/// * `low_hz` - Lower cutoff frequency in Hz
/// * `high_hz` - Upper cutoff frequency in Hz
/// * `order` - Butterworth prototype order
/// * `sample_rate` - Sampling rate in Hz
pub fn apply(
    data: &[f32],
    low_hz: f32,
    high_hz: f32,
    order: usize,
    sample_rate: f32,
) -> BandpassOutcome {
    if data.is_empty() || data.len() < 3 * order {
        return BandpassOutcome::TooShort;
    }

    if order == 0 || normalized_band(low_hz, high_hz, sample_rate).is_none() {
        log::warn!(
            "Invalid order-{} bandpass {}-{} Hz at {} Hz sampling, passing data through",
            order,
            low_hz,
            high_hz,
            sample_rate
        );
        return BandpassOutcome::Unfiltered(data.to_vec());
    }

    let design = || IirButterworthBandpass::new(low_hz, high_hz, sample_rate, order);
    let (mut forward, mut backward) = match (design(), design()) {
        (Ok(f), Ok(b)) => (f, b),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("{}, passing data through", e);
            return BandpassOutcome::Unfiltered(data.to_vec());
        }
    };

    let pad = (3 * (2 * order + 1)).min(data.len() - 1);
    let extended = odd_extend(data, pad);

    let mut pass = forward.run_from_steady_state(&extended);
    pass.reverse();
    let mut output = backward.run_from_steady_state(&pass);
    output.reverse();

    let filtered: Vec<f32> = output[pad..pad + data.len()]
        .iter()
        .map(|&v| v as f32)
        .collect();

    if filtered.iter().any(|v| !v.is_finite()) {
        log::warn!(
            "Bandpass {}-{} Hz produced non-finite output, passing data through",
            low_hz,
            high_hz
        );
        return BandpassOutcome::Unfiltered(data.to_vec());
    }

    BandpassOutcome::Filtered(filtered)
}

/// Normalized (fraction of Nyquist) band edges, if strictly inside (0, 1)
pub fn normalized_band(low_hz: f32, high_hz: f32, sample_rate: f32) -> Option<(f64, f64)> {
    let nyquist = 0.5 * sample_rate as f64;
    let low = low_hz as f64 / nyquist;
    let high = high_hz as f64 / nyquist;
    (low > 0.0 && low < 1.0 && high > 0.0 && high < 1.0 && low < high).then_some((low, high))
}

/// `pad` odd-reflected samples, then `data`, then `pad` odd-reflected samples
fn odd_extend(data: &[f32], pad: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0] as f64;
    let last = data[n - 1] as f64;

    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - data[i] as f64));
    extended.extend(data.iter().map(|&v| v as f64));
    extended.extend((1..=pad).map(|i| 2.0 * last - data[n - 1 - i] as f64));
    extended
}

/// Butterworth IIR bandpass in second-order sections
///
/// Direct form II transposed, designed per call of `apply`.
struct IirButterworthBandpass {
    filter: DirectForm2Transposed,
}

impl IirButterworthBandpass {
    fn new(low_hz: f32, high_hz: f32, sample_rate: f32, order: usize) -> Result<Self> {
        let zpk = butter(
            order as u32,
            FilterType::BandPass(low_hz as f64, high_hz as f64),
            sample_rate as f64,
        )
        .map_err(|e| VitalsError::FilterDesign(format!("{:?}", e)))?;

        let sos =
            zpk2sos(&zpk, None).map_err(|e| VitalsError::FilterDesign(format!("{:?}", e)))?;

        Ok(Self {
            filter: DirectForm2Transposed::new(&sos),
        })
    }

    /// Filter `signal` as if the filter had settled on a constant `signal[0]`
    ///
    /// A bandpass has zero DC gain, so that steady state outputs zero and is
    /// reached from rest by filtering `signal - signal[0]`.
    fn run_from_steady_state(&mut self, signal: &[f64]) -> Vec<f64> {
        let Some(&x0) = signal.first() else {
            return Vec::new();
        };
        signal.iter().map(|&x| self.filter.filter(x - x0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const FS: f32 = 30.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / FS).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_filter_spec_validation() {
        assert!(FilterSpec::new(FS, 0.75, 4.0, 5).is_ok());
        assert!(FilterSpec::new(FS, 0.1, 0.8, 2).is_ok());
        assert!(FilterSpec::new(FS, 4.0, 0.75, 5).is_err());
        assert!(FilterSpec::new(FS, 0.75, 15.0, 5).is_err());
        assert!(FilterSpec::new(FS, 0.0, 4.0, 5).is_err());
        assert!(FilterSpec::new(FS, 0.75, 4.0, 0).is_err());
    }

    #[test]
    fn test_bandpass_passes_center_frequency() {
        let input = sine(2.0, 384);
        let output = apply(&input, 0.75, 4.0, 5, FS).into_samples();
        assert_eq!(output.len(), input.len());

        let mid = 96..288;
        let gain = rms(&output[mid.clone()]) / rms(&input[mid]);
        assert!(
            (gain - 1.0).abs() < 0.05,
            "Passband gain should be ~1, got {}",
            gain
        );
    }

    #[test]
    fn test_bandpass_is_zero_phase() {
        let input = sine(2.0, 384);
        let output = apply(&input, 0.75, 4.0, 5, FS).into_samples();

        let max_diff = input[96..288]
            .iter()
            .zip(&output[96..288])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(
            max_diff < 0.05,
            "In-band sine should stay time-aligned, max diff {}",
            max_diff
        );
    }

    #[test]
    fn test_bandpass_attenuates_out_of_band() {
        let input = sine(10.0, 384);
        let output = apply(&input, 0.75, 4.0, 5, FS).into_samples();

        let mid = 96..288;
        let gain = rms(&output[mid.clone()]) / rms(&input[mid]);
        assert!(gain < 0.05, "10 Hz should be rejected, gain {}", gain);
    }

    #[test]
    fn test_too_short_input() {
        let input = sine(2.0, 14);
        assert_eq!(apply(&input, 0.75, 4.0, 5, FS), BandpassOutcome::TooShort);
        assert_eq!(apply(&[], 0.1, 0.8, 2, FS), BandpassOutcome::TooShort);
        assert!(apply(&input[..6], 0.1, 0.8, 2, FS).is_filtered());
    }

    #[test]
    fn test_invalid_band_passes_input_through() {
        let input = sine(2.0, 64);

        let above_nyquist = apply(&input, 0.75, 20.0, 5, FS);
        assert_eq!(above_nyquist, BandpassOutcome::Unfiltered(input.clone()));

        let inverted = apply(&input, 4.0, 0.75, 5, FS);
        assert_eq!(inverted, BandpassOutcome::Unfiltered(input.clone()));

        let bad_rate = apply(&input, 0.75, 4.0, 5, 0.0);
        assert_eq!(bad_rate, BandpassOutcome::Unfiltered(input));
    }

    #[test]
    fn test_zero_order_passes_input_through() {
        let ramp = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            apply(&ramp, 0.75, 4.0, 0, FS),
            BandpassOutcome::Unfiltered(ramp.to_vec())
        );
        assert_eq!(apply(&[], 0.75, 4.0, 0, FS), BandpassOutcome::TooShort);
    }

    #[test]
    fn test_non_finite_input_passes_through() {
        let mut input = sine(2.0, 64);
        input[10] = f32::NAN;
        match apply(&input, 0.75, 4.0, 5, FS) {
            BandpassOutcome::Unfiltered(out) => {
                assert_eq!(out.len(), input.len());
                assert!(out[10].is_nan());
            }
            other => panic!("Expected unfiltered passthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_extend() {
        let extended = odd_extend(&[1.0, 2.0, 4.0], 2);
        assert_eq!(extended, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 6.0, 7.0]);
    }
}
