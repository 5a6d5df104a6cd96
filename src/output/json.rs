use super::{Formatter, VitalsOutput, iso8601_timestamp};

pub struct JsonFormatter;

fn rate(value: f32) -> String {
    if value > 0.0 {
        format!("{:.1}", value)
    } else {
        "null".to_string()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, output: &VitalsOutput) -> String {
        let fps = output
            .processing_fps
            .map_or("null".to_string(), |f| format!("{:.1}", f));
        format!(
            r#"{{"ts":"{}","stream_secs":{:.3},"bpm":{},"bpm_raw":{},"rpm":{},"rpm_raw":{},"processing_fps":{}}}"#,
            iso8601_timestamp(),
            output.time_secs,
            rate(output.bpm),
            rate(output.bpm_raw),
            rate(output.rpm),
            rate(output.rpm_raw),
            fps
        )
    }
}
