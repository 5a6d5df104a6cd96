use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use super::signal::{
    breathing_component, cardiac_trace, pulse_component, respiration_trace, zip_frames,
};
use crate::processing::FrameSample;

/// Noise applied to the physiological component of each channel
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub impulse: Option<ImpulseNoiseConfig>,
    pub dropout: Option<DropoutConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, snr_db: f32) -> Self {
        self.additive = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    pub fn with_impulse(mut self, rate_hz: f32, amplitude: f32, duration_frames: usize) -> Self {
        self.impulse = Some(ImpulseNoiseConfig {
            rate_hz,
            amplitude,
            duration_frames,
        });
        self
    }

    pub fn with_dropout(mut self, rate_hz: f32, duration_frames: usize) -> Self {
        self.dropout = Some(DropoutConfig {
            rate_hz,
            duration_frames,
        });
        self
    }
}

/// White Gaussian noise at a signal-to-noise ratio
///
/// The ratio is taken against the power of the physiological component
/// alone (pulse or breathing), not the baseline.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f32,
}

/// Motion artifacts: short constant offsets at random times
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImpulseNoiseConfig {
    pub rate_hz: f32,
    pub amplitude: f32,
    pub duration_frames: usize,
}

/// Tracking loss: stretches where the component reads zero
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DropoutConfig {
    pub rate_hz: f32,
    pub duration_frames: usize,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn signal_power(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f32>() / signal.len() as f32
}

fn apply_additive_noise(signal: &mut [f32], config: &AdditiveNoiseConfig, rng: &mut ChaCha8Rng) {
    let sig_power = signal_power(signal);
    if sig_power == 0.0 {
        return;
    }

    let snr_linear = 10.0_f32.powf(config.snr_db / 10.0);
    let noise_std = (sig_power / snr_linear).sqrt();

    let Ok(normal) = Normal::new(0.0, noise_std as f64) else {
        return;
    };

    for sample in signal.iter_mut() {
        *sample += normal.sample(rng) as f32;
    }
}

/// Start frames of randomly spaced events averaging `rate_hz`
fn event_starts(n: usize, rate_hz: f32, sample_rate: f32, rng: &mut ChaCha8Rng) -> Vec<usize> {
    if n == 0 || rate_hz <= 0.0 {
        return Vec::new();
    }

    let avg_frames_between = sample_rate / rate_hz;
    let mut starts = Vec::new();
    let mut pos = 0usize;
    loop {
        let interval = (rng.random::<f32>() * 2.0 * avg_frames_between) as usize;
        pos += interval.max(1);
        if pos >= n {
            break;
        }
        starts.push(pos);
    }
    starts
}

fn apply_impulse_noise(
    signal: &mut [f32],
    config: &ImpulseNoiseConfig,
    sample_rate: f32,
    rng: &mut ChaCha8Rng,
) {
    let n = signal.len();
    for pos in event_starts(n, config.rate_hz, sample_rate, rng) {
        let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
        let end = (pos + config.duration_frames).min(n);
        for sample in signal[pos..end].iter_mut() {
            *sample += sign * config.amplitude;
        }
    }
}

fn apply_dropout(
    signal: &mut [f32],
    config: &DropoutConfig,
    sample_rate: f32,
    rng: &mut ChaCha8Rng,
) {
    let n = signal.len();
    for pos in event_starts(n, config.rate_hz, sample_rate, rng) {
        let end = (pos + config.duration_frames).min(n);
        signal[pos..end].fill(0.0);
    }
}

fn apply_noise_with_rng(
    clean_signal: &[f32],
    config: &NoiseConfig,
    sample_rate: f32,
    rng: &mut ChaCha8Rng,
) -> Vec<f32> {
    let mut signal = clean_signal.to_vec();

    if let Some(ref additive_config) = config.additive {
        apply_additive_noise(&mut signal, additive_config, rng);
    }

    if let Some(ref impulse_config) = config.impulse {
        apply_impulse_noise(&mut signal, impulse_config, sample_rate, rng);
    }

    if let Some(ref dropout_config) = config.dropout {
        apply_dropout(&mut signal, dropout_config, sample_rate, rng);
    }

    signal
}

/// Zero-mean white Gaussian noise with standard deviation `std_dev`
pub fn white_noise(num_frames: usize, std_dev: f32, seed: u64) -> Vec<f32> {
    let mut rng = create_rng(Some(seed));
    let Ok(normal) = Normal::new(0.0, std_dev as f64) else {
        return vec![0.0; num_frames];
    };
    (0..num_frames).map(|_| normal.sample(&mut rng) as f32).collect()
}

/// Apply the configured noise to one channel's component
pub fn apply_noise(clean_signal: &[f32], config: &NoiseConfig, sample_rate: f32) -> Vec<f32> {
    let mut rng = create_rng(config.seed);
    apply_noise_with_rng(clean_signal, config, sample_rate, &mut rng)
}

/// Synthetic recording with noise on both physiological components
///
/// Both channels draw from one generator, cardiac first, so a seed fixes
/// the whole recording.
pub fn generate_noisy_test_frames(
    duration_secs: f32,
    frame_rate: f32,
    bpm: f32,
    rpm: f32,
    noise_config: &NoiseConfig,
) -> Vec<FrameSample> {
    let num_frames = (duration_secs * frame_rate) as usize;
    let mut rng = create_rng(noise_config.seed);

    let pulse = apply_noise_with_rng(
        &pulse_component(num_frames, frame_rate, bpm),
        noise_config,
        frame_rate,
        &mut rng,
    );
    let breathing = apply_noise_with_rng(
        &breathing_component(num_frames, frame_rate, rpm),
        noise_config,
        frame_rate,
        &mut rng,
    );

    zip_frames(
        &cardiac_trace(&pulse, frame_rate),
        &respiration_trace(&breathing, frame_rate),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::signal::generate_sine;

    #[test]
    fn test_additive_noise_changes_signal() {
        let clean = generate_sine(1000, 30.0, 1.2, 0.5);
        let config = NoiseConfig::default().with_seed(42).with_awgn(10.0);

        let noisy = apply_noise(&clean, &config, 30.0);

        assert_eq!(clean.len(), noisy.len());
        assert_ne!(clean, noisy);
    }

    #[test]
    fn test_additive_noise_power_matches_snr() {
        let clean = generate_sine(30000, 30.0, 1.2, 0.5);
        let config = NoiseConfig::default().with_seed(7).with_awgn(0.0);

        let noisy = apply_noise(&clean, &config, 30.0);
        let noise: Vec<f32> = noisy.iter().zip(&clean).map(|(n, c)| n - c).collect();
        let ratio = signal_power(&noise) / signal_power(&clean);
        assert!((ratio - 1.0).abs() < 0.05, "noise/signal power {}", ratio);
    }

    #[test]
    fn test_white_noise_statistics() {
        let noise = white_noise(20000, 2.0, 5);
        let mean = noise.iter().sum::<f32>() / noise.len() as f32;
        assert!(mean.abs() < 0.1, "mean {}", mean);
        assert!((signal_power(&noise) - 4.0).abs() < 0.3);
        assert_eq!(noise, white_noise(20000, 2.0, 5));
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let config = NoiseConfig::default()
            .with_seed(12345)
            .with_awgn(5.0)
            .with_impulse(0.2, 3.0, 10);

        let a = generate_noisy_test_frames(20.0, 30.0, 72.0, 15.0, &config);
        let b = generate_noisy_test_frames(20.0, 30.0, 72.0, 15.0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_impulse_noise_adds_spikes() {
        let clean = vec![0.0f32; 3000];
        let config = NoiseConfig::default().with_seed(42).with_impulse(0.5, 2.0, 5);

        let noisy = apply_noise(&clean, &config, 30.0);

        let spike_count = noisy.iter().filter(|&&x| x.abs() > 1.0).count();
        assert!(spike_count > 10);
        assert!(spike_count < 1000);
    }

    #[test]
    fn test_dropout_zeroes_stretches() {
        let clean = vec![1.0f32; 3000];
        let config = NoiseConfig::default().with_seed(3).with_dropout(0.2, 15);

        let noisy = apply_noise(&clean, &config, 30.0);
        let zeros = noisy.iter().filter(|&&x| x == 0.0).count();
        assert!(zeros >= 15);
        assert!(zeros < 1500);
    }

    #[test]
    fn test_noise_config_from_toml() {
        let config: NoiseConfig = toml::from_str(
            "seed = 9\n[additive]\nsnr_db = 6.0\n[impulse]\nrate_hz = 0.1\namplitude = 4.0\nduration_frames = 8\n",
        )
        .unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(config.additive.is_some());
        assert!(config.dropout.is_none());
    }
}
