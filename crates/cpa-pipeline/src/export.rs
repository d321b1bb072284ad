// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{DateTime, SecondsFormat, Utc};
use cpa_core::{AlgorithmResult, CpaError};
use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;

/// Export serialization format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Txt,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Txt),
            _ => Err(CpaError::invalid_input(format!(
                "unknown export format '{raw}'; expected one of: csv, json, txt"
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Download file name for an export: `changepoints_<dataset>.<ext>`, with
/// whitespace in the dataset name mapped to underscores.
pub fn export_file_name(dataset: &str, format: ExportFormat) -> String {
    let sanitized: String = dataset
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("changepoints_{sanitized}.{}", format.extension())
}

/// Serializes the full (unfiltered) result set into the requested format.
///
/// Pure serialization over explicit inputs; the export timestamp is a
/// parameter so callers own the clock. Writing the bytes anywhere is the
/// caller's responsibility.
pub fn export(
    dataset: &str,
    results: &[AlgorithmResult],
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>, CpaError> {
    match format {
        ExportFormat::Csv => export_csv(results),
        ExportFormat::Json => export_json(dataset, results, exported_at),
        ExportFormat::Txt => Ok(export_txt(dataset, results, exported_at).into_bytes()),
    }
}

fn export_csv(results: &[AlgorithmResult]) -> Result<Vec<u8>, CpaError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["algorithm", "index", "confidence", "type", "value"])
        .map_err(|err| CpaError::export(format!("writing CSV header: {err}")))?;

    for result in results {
        for cp in &result.change_points {
            let index = cp.index.to_string();
            let confidence = format!("{:.3}", cp.confidence);
            let value = format!("{:.3}", cp.value);
            writer
                .write_record([
                    result.algorithm.as_str(),
                    index.as_str(),
                    confidence.as_str(),
                    cp.kind.as_str(),
                    value.as_str(),
                ])
                .map_err(|err| CpaError::export(format!("writing CSV row: {err}")))?;
        }
    }

    writer
        .into_inner()
        .map_err(|err| CpaError::export(format!("flushing CSV buffer: {err}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    dataset: &'a str,
    timestamp: String,
    results: Vec<ExportResult<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResult<'a> {
    algorithm: &'a str,
    execution_time: f64,
    confidence: f64,
    change_points: Vec<ExportChangePoint>,
}

#[derive(Serialize)]
struct ExportChangePoint {
    index: usize,
    confidence: f64,
    #[serde(rename = "type")]
    kind: &'static str,
    value: f64,
}

fn export_json(
    dataset: &str,
    results: &[AlgorithmResult],
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>, CpaError> {
    let document = ExportDocument {
        dataset,
        timestamp: exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        results: results
            .iter()
            .map(|result| ExportResult {
                algorithm: result.algorithm.as_str(),
                execution_time: result.execution_time_ms,
                confidence: result.confidence,
                change_points: result
                    .change_points
                    .iter()
                    .map(|cp| ExportChangePoint {
                        index: cp.index,
                        confidence: cp.confidence,
                        kind: cp.kind.as_str(),
                        value: cp.value,
                    })
                    .collect(),
            })
            .collect(),
    };

    serde_json::to_vec_pretty(&document)
        .map_err(|err| CpaError::export(format!("serializing JSON document: {err}")))
}

const RULE_LINE: &str = "--------------------------------------------------";

fn export_txt(dataset: &str, results: &[AlgorithmResult], exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail; the Write results are discarded.
    let _ = writeln!(out, "Change-point detection report");
    let _ = writeln!(out, "Dataset: {dataset}");
    let _ = writeln!(
        out,
        "Generated: {}",
        exported_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let _ = writeln!(out, "Algorithms: {}", results.len());

    for result in results {
        let _ = writeln!(out, "{RULE_LINE}");
        let _ = writeln!(out, "Algorithm: {}", result.algorithm);
        let _ = writeln!(out, "Execution time: {:.3} ms", result.execution_time_ms);
        let _ = writeln!(out, "Average confidence: {:.3}", result.confidence);
        let _ = writeln!(out, "Change points: {}", result.change_points.len());
        if !result.change_points.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "index\tconfidence\ttype\tvalue");
            for cp in &result.change_points {
                let _ = writeln!(
                    out,
                    "{}\t{:.3}\t{}\t{:.3}",
                    cp.index,
                    cp.confidence,
                    cp.kind.as_str(),
                    cp.value
                );
            }
        }
    }

    out
}
