use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::path::{Path, PathBuf};

use vitalscope::config::{ChannelRole, FrameRate, VitalsConfig};
use vitalscope::processing::VitalsProcessor;
use vitalscope::source::{SampleSource, WavFileSource};

#[derive(Parser, Debug)]
#[command(name = "analyze_recording")]
#[command(about = "Analyze per-frame vital-sign recordings for rate statistics", long_about = None)]
struct Args {
    /// Recordings to analyze (stereo WAV, one sample per video frame)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Swap left/right channels
    #[arg(short = 's', long)]
    swap_channels: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Frame rate override (e.g., "29.97", "33.3ms"); default is the recording's rate
    #[arg(long)]
    fps: Option<FrameRate>,

    /// Per-channel buffer size in frames
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Ignore estimates before this many seconds of stream time
    #[arg(long, default_value = "0")]
    skip_secs: f32,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f32,
    std_dev: f32,
    min: f32,
    max: f32,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f32>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChannelAnalysis {
    instantaneous: Option<StatsSummary>,
    smoothed: Option<StatsSummary>,
    final_rate: Option<f32>,
    first_estimate_secs: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct FileAnalysis {
    filename: String,
    frame_rate: f32,
    frame_count: usize,
    duration_secs: f32,
    cardiac: Option<ChannelAnalysis>,
    respiration: Option<ChannelAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Accumulates one channel's rates across a recording
struct ChannelCollector {
    instantaneous: Stats<f32>,
    smoothed: Stats<f32>,
    final_rate: f32,
    first_estimate_secs: Option<f32>,
}

impl ChannelCollector {
    fn new() -> Self {
        Self {
            instantaneous: Stats::new(),
            smoothed: Stats::new(),
            final_rate: 0.0,
            first_estimate_secs: None,
        }
    }

    fn update(&mut self, time_secs: f32, rate: f32, smoothed: f32, counted: bool) {
        if rate > 0.0 {
            self.first_estimate_secs.get_or_insert(time_secs);
            if counted {
                self.instantaneous.update(rate);
            }
        }
        if smoothed > 0.0 && counted {
            self.smoothed.update(smoothed);
        }
        self.final_rate = smoothed;
    }

    fn finish(&self) -> ChannelAnalysis {
        ChannelAnalysis {
            instantaneous: StatsSummary::from_stats(&self.instantaneous),
            smoothed: StatsSummary::from_stats(&self.smoothed),
            final_rate: (self.final_rate > 0.0).then_some(self.final_rate),
            first_estimate_secs: self.first_estimate_secs,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => VitalsConfig::load(path)?,
        None => VitalsConfig::default(),
    };

    if let Some(buffer_size) = args.buffer_size {
        config.capture.buffer_size = buffer_size;
    }

    if args.swap_channels {
        config.capture.cardiac_channel = ChannelRole::Right;
        config.capture.respiration_channel = ChannelRole::Left;
    }

    let results: Vec<FileAnalysis> = args
        .files
        .iter()
        .map(|path| analyze_file(path, &config, args.fps, args.skip_secs))
        .collect();

    match args.format {
        OutputFormat::Text => print_text(&results, &config),
        OutputFormat::Csv => print_csv(&results),
        OutputFormat::Json => print_json(&results)?,
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn analyze_file(
    path: &Path,
    config: &VitalsConfig,
    fps: Option<FrameRate>,
    skip_secs: f32,
) -> FileAnalysis {
    match analyze_file_impl(path, config, fps, skip_secs) {
        Ok(analysis) => analysis,
        Err(e) => FileAnalysis {
            filename: display_name(path),
            frame_rate: 0.0,
            frame_count: 0,
            duration_secs: 0.0,
            cardiac: None,
            respiration: None,
            error: Some(format!("{:#}", e)),
        },
    }
}

fn analyze_file_impl(
    path: &Path,
    config: &VitalsConfig,
    fps: Option<FrameRate>,
    skip_secs: f32,
) -> anyhow::Result<FileAnalysis> {
    let mut source = WavFileSource::new(path, &config.capture)?;

    let mut config = config.clone();
    config.capture.frame_rate = match fps {
        Some(rate) => rate.as_fps(),
        None => source.frame_rate().unwrap_or(config.capture.frame_rate),
    };
    config.validate()?;

    let frame_rate = config.capture.frame_rate;
    let mut processor = VitalsProcessor::new(&config);
    let mut cardiac = ChannelCollector::new();
    let mut respiration = ChannelCollector::new();
    let mut frame_count = 0usize;

    while let Some(frame) = source.next_frame()? {
        let time_secs = frame_count as f32 / frame_rate;
        let counted = time_secs >= skip_secs;
        let result = processor.process_frame(frame);

        cardiac.update(
            time_secs,
            result.cardiac.rate,
            result.cardiac.smoothed_rate,
            counted,
        );
        respiration.update(
            time_secs,
            result.respiration.rate,
            result.respiration.smoothed_rate,
            counted,
        );
        frame_count += 1;
    }

    log::info!(
        "{}: {} frames at {:.2} fps",
        path.display(),
        frame_count,
        frame_rate
    );

    Ok(FileAnalysis {
        filename: display_name(path),
        frame_rate,
        frame_count,
        duration_secs: frame_count as f32 / frame_rate,
        cardiac: Some(cardiac.finish()),
        respiration: Some(respiration.finish()),
        error: None,
    })
}

fn fmt_opt(value: Option<f32>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn print_text(results: &[FileAnalysis], config: &VitalsConfig) {
    eprintln!(
        "Channels: Cardiac={:?}, Respiration={:?}; buffer {} frames",
        config.capture.cardiac_channel,
        config.capture.respiration_channel,
        config.capture.buffer_size
    );
    eprintln!();

    println!(
        "{:<40} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "File", "Secs", "BPM", "BPM std", "RPM", "RPM std", "Frames"
    );
    println!("{}", "-".repeat(95));

    for result in results {
        if let Some(ref err) = result.error {
            println!("{:<40} ERROR: {}", result.filename, err);
            continue;
        }

        let smoothed_mean = |c: &Option<ChannelAnalysis>| {
            c.as_ref()
                .and_then(|c| c.smoothed.as_ref())
                .map(|s| s.mean)
        };
        let instantaneous_std = |c: &Option<ChannelAnalysis>| {
            c.as_ref()
                .and_then(|c| c.instantaneous.as_ref())
                .map(|s| s.std_dev)
        };

        println!(
            "{:<40} {:>8.1} {:>8} {:>8} {:>8} {:>8} {:>8}",
            result.filename,
            result.duration_secs,
            fmt_opt(smoothed_mean(&result.cardiac), 1),
            fmt_opt(instantaneous_std(&result.cardiac), 2),
            fmt_opt(smoothed_mean(&result.respiration), 1),
            fmt_opt(instantaneous_std(&result.respiration), 2),
            result.frame_count
        );
    }

    for result in results {
        if result.error.is_some() {
            continue;
        }

        for (name, unit, channel) in [
            ("Heart rate", "BPM", &result.cardiac),
            ("Breathing rate", "RPM", &result.respiration),
        ] {
            let Some(channel) = channel else {
                continue;
            };
            eprintln!();
            eprintln!("{} for {}:", name, result.filename);
            eprintln!(
                "  First estimate: {}",
                channel
                    .first_estimate_secs
                    .map(|t| format!("{:.1} s", t))
                    .unwrap_or_else(|| "never".to_string())
            );
            if let Some(ref s) = channel.instantaneous {
                eprintln!(
                    "  Instantaneous: {:.1} ± {:.1} {} (min {:.1}, max {:.1}, {} estimates)",
                    s.mean, s.std_dev, unit, s.min, s.max, s.count
                );
            }
            eprintln!("  Final: {} {}", fmt_opt(channel.final_rate, 1), unit);
        }
    }
}

fn print_csv(results: &[FileAnalysis]) {
    println!(
        "filename,frame_rate,frame_count,bpm_mean,bpm_std,bpm_final,bpm_first_secs,rpm_mean,rpm_std,rpm_final,rpm_first_secs,error"
    );
    let columns = |c: &Option<ChannelAnalysis>| -> [String; 4] {
        let Some(c) = c else {
            return Default::default();
        };
        let field = |v: Option<f32>, p: usize| v.map(|v| format!("{:.*}", p, v)).unwrap_or_default();
        [
            field(c.smoothed.as_ref().map(|s| s.mean), 2),
            field(c.instantaneous.as_ref().map(|s| s.std_dev), 3),
            field(c.final_rate, 1),
            field(c.first_estimate_secs, 2),
        ]
    };

    for result in results {
        let [bpm_mean, bpm_std, bpm_final, bpm_first] = columns(&result.cardiac);
        let [rpm_mean, rpm_std, rpm_final, rpm_first] = columns(&result.respiration);
        let error = result.error.as_deref().unwrap_or("");

        println!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            result.filename,
            result.frame_rate,
            result.frame_count,
            bpm_mean,
            bpm_std,
            bpm_final,
            bpm_first,
            rpm_mean,
            rpm_std,
            rpm_final,
            rpm_first,
            error
        );
    }
}

fn print_json(results: &[FileAnalysis]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    println!("{}", json);
    Ok(())
}
