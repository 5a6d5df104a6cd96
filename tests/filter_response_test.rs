mod test_signals;

use approx::assert_abs_diff_eq;
use vitalscope::config::ChannelConfig;
use vitalscope::signal_processing::{RateSmoother, SpectralRateEstimator};

const FS: f32 = 30.0;
const N: usize = 384;

/// RMS gain over the middle half of the window, away from edge transients
fn mid_window_gain(config: &ChannelConfig, freq_hz: f32) -> f32 {
    let spec = config.filter_spec(FS).unwrap();
    let input = test_signals::generate_sine(N, FS, freq_hz, 1.0);
    let outcome = spec.apply(&input);
    assert!(outcome.is_filtered());

    let output = outcome.into_samples();
    let mid = N / 4..3 * N / 4;
    test_signals::rms(&output[mid.clone()]) / test_signals::rms(&input[mid])
}

#[test]
fn test_cardiac_passband() {
    let cardiac = ChannelConfig::cardiac();
    for freq in [1.0, 1.5, 2.0, 2.5] {
        let gain = mid_window_gain(&cardiac, freq);
        assert_abs_diff_eq!(gain, 1.0, epsilon = 0.1);
    }
}

#[test]
fn test_cardiac_rejects_drift_and_flicker() {
    let cardiac = ChannelConfig::cardiac();
    assert!(mid_window_gain(&cardiac, 0.2) < 0.01);
    assert!(mid_window_gain(&cardiac, 10.0) < 0.01);
}

#[test]
fn test_respiration_passband() {
    let respiration = ChannelConfig::respiration();
    let gain = mid_window_gain(&respiration, 0.4);
    assert_abs_diff_eq!(gain, 1.0, epsilon = 0.1);
}

#[test]
fn test_respiration_attenuates_cardiac_band() {
    let respiration = ChannelConfig::respiration();
    let gain = mid_window_gain(&respiration, 2.0);
    assert!(gain < 0.3, "2 Hz gain through breathing band: {}", gain);
}

/// Output/input spectral energy ratio over bins whose frequency satisfies `in_region`
fn noise_energy_ratio(config: &ChannelConfig, seed: u64, in_region: impl Fn(f32) -> bool) -> f32 {
    let noise = test_signals::white_noise(N, 1.0, seed);
    let filtered = config.filter_spec(FS).unwrap().apply(&noise);
    assert!(filtered.is_filtered());
    let filtered = filtered.into_samples();

    let mut estimator = SpectralRateEstimator::new();
    let input = estimator.magnitude_spectrum(&noise);
    let output = estimator.magnitude_spectrum(&filtered);

    let bin_hz = FS / N as f32;
    let energy = |mags: &[f32]| -> f32 {
        mags.iter()
            .enumerate()
            .filter(|&(k, _)| in_region(k as f32 * bin_hz))
            .map(|(_, m)| m * m)
            .sum()
    };
    energy(&output) / energy(&input)
}

#[test]
fn test_cardiac_rejects_white_noise_outside_band() {
    let cardiac = ChannelConfig::cardiac();
    for seed in [1, 2, 3] {
        let stop = noise_energy_ratio(&cardiac, seed, |f| f <= 0.2 || f >= 8.0);
        assert!(stop < 0.05, "seed {}: stopband energy ratio {}", seed, stop);

        let pass = noise_energy_ratio(&cardiac, seed, |f| (1.2..=3.2).contains(&f));
        assert!(pass > 0.7, "seed {}: passband energy ratio {}", seed, pass);
    }
}

#[test]
fn test_respiration_rejects_white_noise_above_band() {
    let respiration = ChannelConfig::respiration();
    for seed in [1, 2, 3] {
        let stop = noise_energy_ratio(&respiration, seed, |f| f >= 4.0);
        assert!(stop < 0.05, "seed {}: stopband energy ratio {}", seed, stop);
    }
}

#[test]
fn test_smoother_follows_last_estimates() {
    let mut smoother = RateSmoother::new(5);
    for _ in 0..5 {
        smoother.observe(60.0);
    }
    for _ in 0..5 {
        smoother.observe(90.0);
    }
    assert_abs_diff_eq!(smoother.current().unwrap(), 90.0);
}
