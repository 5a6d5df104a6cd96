mod csv;
mod json;
mod text;

use chrono::Utc;

use crate::session::VitalsUpdate;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One line of rate output
pub struct VitalsOutput {
    /// Stream time in seconds
    pub time_secs: f64,
    pub bpm: f32,
    pub bpm_raw: f32,
    pub rpm: f32,
    pub rpm_raw: f32,
    pub processing_fps: Option<f32>,
}

impl From<&VitalsUpdate> for VitalsOutput {
    fn from(update: &VitalsUpdate) -> Self {
        Self {
            time_secs: update.time_secs,
            bpm: update.bpm,
            bpm_raw: update.bpm_raw,
            rpm: update.rpm,
            rpm_raw: update.rpm_raw,
            processing_fps: update.processing_fps,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, output: &VitalsOutput) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VitalsOutput {
        VitalsOutput {
            time_secs: 12.5,
            bpm: 72.34,
            bpm_raw: 70.3,
            rpm: 0.0,
            rpm_raw: 0.0,
            processing_fps: None,
        }
    }

    #[test]
    fn test_text_formatter() {
        let line = TextFormatter::new(false).format(&sample());
        assert!(line.contains("72.3 BPM"));
        assert!(line.contains("-- RPM"));

        let verbose = TextFormatter::new(true).format(&sample());
        assert!(verbose.contains("(raw:  70.3)"));
        assert!(verbose.contains("fps: -"));
    }

    #[test]
    fn test_csv_formatter_matches_header() {
        let formatter = CsvFormatter;
        let header_fields = formatter.header().unwrap().split(',').count();
        let line = formatter.format(&sample());
        assert_eq!(line.split(',').count(), header_fields);
        assert!(line.contains(",12.500,72.3,70.3,"));
    }

    #[test]
    fn test_json_formatter_is_valid_json() {
        let line = JsonFormatter.format(&sample());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["bpm_raw"].as_f64(), Some(70.3));
        assert!(value["rpm"].is_null());
        assert!(value["processing_fps"].is_null());
    }
}
