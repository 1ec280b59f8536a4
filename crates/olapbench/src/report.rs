use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use olapbench_error::{Result, ResultExt};
use serde::Serialize;

use crate::recorder::DurationSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ReportFormat {
    /// One row per run: label, run number, duration in microseconds.
    #[default]
    Tsv,
    /// Metric records, durations in seconds.
    Json,
}

/// Extra information to include in json reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMetadata {
    pub platform: Option<String>,
    pub revision: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    revision: Option<&'a str>,
    platform: Option<&'a str>,
    result: Vec<JsonMetric<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonMetric<'a> {
    name: &'a str,
    value: f64,
    unit: &'static str,
    report: MetricReport,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum MetricReport {
    LowerIsBetter,
}

/// Write all samples to `path`, truncating any existing file.
pub fn write_report(
    path: impl AsRef<Path>,
    format: ReportFormat,
    metadata: &ReportMetadata,
    samples: &[DurationSample],
) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .context("Failed to open report file for write")?;
    let mut writer = BufWriter::new(file);

    match format {
        ReportFormat::Tsv => write_tsv(&mut writer, samples)?,
        ReportFormat::Json => write_json(&mut writer, metadata, samples)?,
    }

    writer.flush()?;

    Ok(())
}

fn write_tsv(writer: &mut impl Write, samples: &[DurationSample]) -> Result<()> {
    writeln!(writer, "label\trun\tduration_micros")?;
    for sample in samples {
        let (label, run) = sample
            .label
            .rsplit_once('/')
            .unwrap_or((sample.label.as_str(), ""));
        writeln!(writer, "{label}\t{run}\t{}", sample.duration.as_micros())?;
    }

    Ok(())
}

fn write_json(
    writer: &mut impl Write,
    metadata: &ReportMetadata,
    samples: &[DurationSample],
) -> Result<()> {
    let report = JsonReport {
        revision: metadata.revision.as_deref(),
        platform: metadata.platform.as_deref(),
        result: samples
            .iter()
            .map(|s| JsonMetric {
                name: &s.label,
                value: s.duration.as_secs_f64(),
                unit: "s",
                report: MetricReport::LowerIsBetter,
            })
            .collect(),
    };

    serde_json::to_writer_pretty(&mut *writer, &report).context("Failed to serialize report")?;
    writeln!(writer)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn samples() -> Vec<DurationSample> {
        vec![
            DurationSample {
                label: "Q0/1".to_string(),
                duration: Duration::from_micros(1500),
            },
            DurationSample {
                label: "Q0/2".to_string(),
                duration: Duration::from_micros(250),
            },
        ]
    }

    #[test]
    fn tsv() {
        let mut buf = Vec::new();
        write_tsv(&mut buf, &samples()).unwrap();

        assert_eq!(
            "label\trun\tduration_micros\nQ0\t1\t1500\nQ0\t2\t250\n",
            String::from_utf8(buf).unwrap()
        );
    }

    #[test]
    fn json() {
        let metadata = ReportMetadata {
            platform: Some("neon-staging".to_string()),
            revision: None,
        };

        let mut buf = Vec::new();
        write_json(&mut buf, &metadata, &samples()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!("neon-staging", value["platform"]);
        assert!(value["revision"].is_null());

        let result = value["result"].as_array().unwrap();
        assert_eq!(2, result.len());
        assert_eq!("Q0/1", result[0]["name"]);
        assert_eq!(0.0015, result[0]["value"]);
        assert_eq!("s", result[0]["unit"]);
        assert_eq!("lower_is_better", result[0]["report"]);
    }

    #[test]
    fn write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");

        write_report(&path, ReportFormat::Tsv, &ReportMetadata::default(), &samples()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(3, contents.lines().count());
    }
}
