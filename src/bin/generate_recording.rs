use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use vitalscope::save_recording;
use vitalscope::simulation::{
    AdditiveNoiseConfig, DropoutConfig, ImpulseNoiseConfig, NoiseConfig,
    generate_noisy_test_frames,
};

#[derive(Parser, Debug)]
#[command(name = "generate_recording")]
#[command(about = "Generate synthetic vital-sign recordings with configurable noise")]
struct Args {
    /// TOML noise configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Heart rates in BPM: comma-separated (e.g., "60,72,90") or range (e.g., "60-120:15")
    #[arg(long, default_value = "60-120:15")]
    heart_rates: String,

    /// Breathing rates in breaths/min, same format as heart rates
    #[arg(long, default_value = "15")]
    breathing_rates: String,

    /// Number of trials per rate pair
    #[arg(short, long, default_value_t = 3)]
    trials: u32,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Recording duration in seconds
    #[arg(short, long, default_value_t = 30.0)]
    duration: f32,

    /// Frame rate in frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Output filename prefix
    #[arg(long, default_value = "synth")]
    prefix: String,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,

    /// AWGN SNR in dB (CLI override)
    #[arg(long)]
    snr: Option<f32>,

    /// Motion artifact rate in Hz (CLI override)
    #[arg(long)]
    impulse_rate: Option<f32>,

    /// Tracking dropout rate in Hz (CLI override)
    #[arg(long)]
    dropout_rate: Option<f32>,
}

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    bpm: f32,
    rpm: f32,
    trial: u32,
    seed: u64,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    frame_rate: u32,
    duration: f32,
    files: Vec<ManifestEntry>,
}

fn parse_rates(s: &str) -> Result<Vec<f32>> {
    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid range format. Use 'start-end:step'");
        }
        let step: f32 = parts[1].parse().context("Invalid step value")?;
        if step <= 0.0 {
            anyhow::bail!("Range step must be positive");
        }
        let range_parts: Vec<&str> = parts[0].split('-').collect();
        if range_parts.len() != 2 {
            anyhow::bail!("Invalid range format. Use 'start-end:step'");
        }
        let start: f32 = range_parts[0].parse().context("Invalid start value")?;
        let end: f32 = range_parts[1].parse().context("Invalid end value")?;

        let mut rates = Vec::new();
        let mut r = start;
        while r <= end {
            rates.push(r);
            r += step;
        }
        Ok(rates)
    } else {
        s.split(',')
            .map(|p| p.trim().parse::<f32>().context("Invalid rate value"))
            .collect()
    }
}

fn load_noise_config(path: &PathBuf) -> Result<NoiseConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_noise_config(base: &NoiseConfig, args: &Args, seed: u64) -> NoiseConfig {
    let mut config = base.clone().with_seed(seed);

    if let Some(snr) = args.snr {
        config.additive = Some(AdditiveNoiseConfig { snr_db: snr });
    }

    if let Some(impulse_rate) = args.impulse_rate {
        config.impulse = Some(ImpulseNoiseConfig {
            rate_hz: impulse_rate,
            amplitude: 3.0,
            duration_frames: 10,
        });
    }

    if let Some(dropout_rate) = args.dropout_rate {
        config.dropout = Some(DropoutConfig {
            rate_hz: dropout_rate,
            duration_frames: 15,
        });
    }

    config
}

fn main() -> Result<()> {
    let args = Args::parse();

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let base_noise = match args.config {
        Some(ref config_path) => load_noise_config(config_path)?,
        None => NoiseConfig::default(),
    };

    let heart_rates = parse_rates(&args.heart_rates)?;
    let breathing_rates = parse_rates(&args.breathing_rates)?;
    let base_seed = args.seed.or(base_noise.seed).unwrap_or(0);

    let mut manifest_entries = Vec::new();
    let total_files = heart_rates.len() * breathing_rates.len() * args.trials as usize;
    let mut file_count = 0;

    for &bpm in &heart_rates {
        for &rpm in &breathing_rates {
            for trial in 0..args.trials {
                let seed = base_seed + trial as u64 * 100_000 + bpm as u64 * 100 + rpm as u64;
                let noise_config = build_noise_config(&base_noise, &args, seed);

                let frames = generate_noisy_test_frames(
                    args.duration,
                    args.fps as f32,
                    bpm,
                    rpm,
                    &noise_config,
                );

                let filename = format!(
                    "{}_hr{:03}_rr{:02}_t{:02}.wav",
                    args.prefix, bpm as i32, rpm as i32, trial
                );
                let filepath = args.output_dir.join(&filename);

                save_recording(&filepath, &frames, args.fps)
                    .with_context(|| format!("Failed to write {}", filepath.display()))?;

                manifest_entries.push(ManifestEntry {
                    file: filename,
                    bpm,
                    rpm,
                    trial,
                    seed,
                });

                file_count += 1;
                eprint!("\rGenerating: {}/{}", file_count, total_files);
            }
        }
    }
    eprintln!();

    if args.manifest {
        let manifest = Manifest {
            frame_rate: args.fps,
            duration: args.duration,
            files: manifest_entries,
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} files in {}",
        total_files,
        args.output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rates_comma_separated() {
        let rates = parse_rates("60, 72,90").unwrap();
        assert_eq!(rates, vec![60.0, 72.0, 90.0]);
    }

    #[test]
    fn test_parse_rates_range() {
        let rates = parse_rates("60-120:20").unwrap();
        assert_eq!(rates, vec![60.0, 80.0, 100.0, 120.0]);
    }

    #[test]
    fn test_parse_rates_rejects_bad_step() {
        assert!(parse_rates("60-120:0").is_err());
        assert!(parse_rates("60-120").is_err());
    }
}
