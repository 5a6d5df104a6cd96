use crate::constants::{MIN_SPECTRAL_MAGNITUDE, SECONDS_PER_MINUTE};
use num_complex::Complex;
use rustfft::FftPlanner;

/// Dominant-frequency rate estimator
///
/// Takes the FFT magnitude of a filtered window, restricts it to a frequency
/// band and reports the strongest bin as a rate per minute, rounded to one
/// decimal. `0.0` means "no estimate".
///
/// The planner caches FFT plans by length, so repeated calls on a
/// fixed-size buffer reuse the same plan.
pub struct SpectralRateEstimator {
    planner: FftPlanner<f32>,
}

impl SpectralRateEstimator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Estimate the dominant rate (per minute) of `filtered` within
    /// `[low_hz, high_hz]`
    ///
    /// # Arguments
    /// * `filtered` - Bandpassed window, oldest sample first
    /// * `sample_rate` - Sampling rate in Hz
    /// * `low_hz` / `high_hz` - Inclusive search band
    /// * `min_secs` - Shortest window (in seconds) worth analyzing
    ///
    /// # Returns
    /// Rate per minute, or `0.0` when the window is too short, no bin lies in
    /// the band, or the band holds no energy.
    pub fn estimate(
        &mut self,
        filtered: &[f32],
        sample_rate: f32,
        low_hz: f32,
        high_hz: f32,
        min_secs: f32,
    ) -> f32 {
        let n = filtered.len();
        if n == 0 || (n as f32) < sample_rate * min_secs {
            return 0.0;
        }

        let magnitudes = self.magnitude_spectrum(filtered);
        let bin_hz = sample_rate as f64 / n as f64;

        let in_band: Vec<(usize, f32)> = magnitudes
            .iter()
            .copied()
            .enumerate()
            .filter(|&(k, _)| {
                let freq = k as f64 * bin_hz;
                freq >= low_hz as f64 && freq <= high_hz as f64
            })
            .collect();

        let band_magnitudes: Vec<f32> = in_band.iter().map(|&(_, m)| m).collect();
        let Some(peak) = dominant_bin(&band_magnitudes) else {
            return 0.0;
        };

        let (bin, magnitude) = in_band[peak];
        if magnitude <= MIN_SPECTRAL_MAGNITUDE {
            return 0.0;
        }

        hz_to_per_minute((bin as f64 * bin_hz) as f32)
    }

    /// Magnitudes of the positive-frequency bins `0..n/2`
    pub fn magnitude_spectrum(&mut self, signal: &[f32]) -> Vec<f32> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let fft = self.planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex<f32>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        buffer[..n / 2].iter().map(|c| c.norm()).collect()
    }
}

impl Default for SpectralRateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the largest finite magnitude; the first one wins on ties
pub fn dominant_bin(magnitudes: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &m) in magnitudes.iter().enumerate() {
        if !m.is_finite() {
            continue;
        }
        match best {
            Some((_, best_m)) if m <= best_m => {}
            _ => best = Some((i, m)),
        }
    }
    best.map(|(i, _)| i)
}

/// Hz to cycles per minute, rounded to one decimal
pub fn hz_to_per_minute(freq_hz: f32) -> f32 {
    ((freq_hz as f64 * SECONDS_PER_MINUTE as f64 * 10.0).round() / 10.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    const FS: f32 = 30.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / FS).sin())
            .collect()
    }

    #[test]
    fn test_estimates_in_band_sine() {
        let mut estimator = SpectralRateEstimator::new();
        // 1.25 Hz is exactly bin 16 of a 384-point FFT at 30 Hz
        let rate = estimator.estimate(&sine(1.25, 384), FS, 0.75, 4.0, 1.0);
        assert_abs_diff_eq!(rate, 75.0, epsilon = 0.05);
    }

    #[test]
    fn test_off_bin_sine_within_one_bin() {
        let mut estimator = SpectralRateEstimator::new();
        let bin_per_minute = FS / 384.0 * 60.0;
        let rate = estimator.estimate(&sine(1.2, 384), FS, 0.75, 4.0, 1.0);
        assert!(
            (rate - 72.0).abs() <= bin_per_minute,
            "Expected ~72, got {}",
            rate
        );
    }

    #[test]
    fn test_ignores_peak_outside_band() {
        let mut estimator = SpectralRateEstimator::new();
        let signal: Vec<f32> = sine(0.3125, 384)
            .iter()
            .zip(sine(5.0, 384))
            .map(|(a, b)| 0.3 * a + b)
            .collect();

        let rate = estimator.estimate(&signal, FS, 0.1, 0.8, 2.0);
        assert_abs_diff_eq!(rate, 18.8, epsilon = 0.05);
    }

    #[test]
    fn test_short_window_returns_zero() {
        let mut estimator = SpectralRateEstimator::new();
        assert_eq!(estimator.estimate(&sine(1.25, 29), FS, 0.75, 4.0, 1.0), 0.0);
        assert_eq!(estimator.estimate(&sine(0.3, 59), FS, 0.1, 0.8, 2.0), 0.0);
        assert_eq!(estimator.estimate(&[], FS, 0.75, 4.0, 0.0), 0.0);
    }

    #[test]
    fn test_all_zero_returns_zero() {
        let mut estimator = SpectralRateEstimator::new();
        assert_eq!(estimator.estimate(&[0.0; 384], FS, 0.75, 4.0, 1.0), 0.0);
    }

    #[test]
    fn test_empty_band_returns_zero() {
        let mut estimator = SpectralRateEstimator::new();
        // 64 samples at 30 Hz: bins are 0.47 Hz apart, none falls in 0.5..0.9
        assert_eq!(estimator.estimate(&sine(0.7, 64), FS, 0.5, 0.9, 1.0), 0.0);
    }

    #[test]
    fn test_dominant_bin_first_wins() {
        assert_eq!(dominant_bin(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(dominant_bin(&[f32::NAN, 2.0, f32::INFINITY]), Some(1));
        assert_eq!(dominant_bin(&[f32::NAN]), None);
        assert_eq!(dominant_bin(&[]), None);
    }

    #[test]
    fn test_equal_peaks_resolve_to_lowest_bin() {
        let mut estimator = SpectralRateEstimator::new();
        // A unit impulse has a flat spectrum: every bin has magnitude 1
        let impulse = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let magnitudes = estimator.magnitude_spectrum(&impulse);
        assert!(magnitudes.iter().all(|&m| m == 1.0));

        // 8 samples at 8 Hz: bins 1, 2 and 3 Hz tie inside the band
        assert_eq!(estimator.estimate(&impulse, 8.0, 1.0, 3.0, 1.0), 60.0);
        assert_eq!(estimator.estimate(&impulse, 8.0, 1.5, 3.0, 1.0), 120.0);
    }

    #[test]
    fn test_repeatable_across_calls() {
        let mut estimator = SpectralRateEstimator::new();
        let signal = sine(1.6, 384);
        let first = estimator.estimate(&signal, FS, 0.75, 4.0, 1.0);
        let second = estimator.estimate(&signal, FS, 0.75, 4.0, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hz_to_per_minute_rounding() {
        assert_eq!(hz_to_per_minute(1.2), 72.0);
        assert_eq!(hz_to_per_minute(30.0 / 384.0 * 15.0), 70.3);
        assert_eq!(hz_to_per_minute(0.0), 0.0);
    }
}
