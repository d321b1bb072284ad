// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::registry::AlgorithmId;
use crate::CpaError;
use std::fmt;

/// Statistical character of a detected change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Mean,
    Trend,
    Variance,
    Periodicity,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Trend => "trend",
            Self::Variance => "variance",
            Self::Periodicity => "periodicity",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw {
            "mean" => Ok(Self::Mean),
            "trend" => Ok(Self::Trend),
            "variance" => Ok(Self::Variance),
            "periodicity" => Ok(Self::Periodicity),
            _ => Err(CpaError::invalid_input(format!(
                "unknown change kind '{raw}'"
            ))),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected change point. Produced by exactly one algorithm run;
/// immutable thereafter.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangePoint {
    pub index: usize,
    pub confidence: f64,
    pub kind: ChangeKind,
    pub value: f64,
}

/// Result of one algorithm over one series.
///
/// Construction enforces the result invariants: indices strictly ascending
/// and inside the series, confidence within [0, 1], finite non-negative
/// execution time. `confidence` is the mean over the change points, 0 when
/// none were found.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: AlgorithmId,
    pub change_points: Vec<ChangePoint>,
    pub execution_time_ms: f64,
    pub confidence: f64,
}

impl AlgorithmResult {
    pub fn new(
        algorithm: AlgorithmId,
        series_len: usize,
        change_points: Vec<ChangePoint>,
        execution_time_ms: f64,
    ) -> Result<Self, CpaError> {
        if !execution_time_ms.is_finite() || execution_time_ms < 0.0 {
            return Err(CpaError::invalid_input(format!(
                "execution_time_ms must be finite and >= 0; got {execution_time_ms}"
            )));
        }

        let mut previous: Option<usize> = None;
        for cp in &change_points {
            if cp.index >= series_len {
                return Err(CpaError::invalid_input(format!(
                    "change point index {} is outside the series (length {series_len})",
                    cp.index
                )));
            }
            if let Some(prev) = previous {
                if cp.index <= prev {
                    return Err(CpaError::invalid_input(format!(
                        "change point indices must be strictly ascending: {prev} then {}",
                        cp.index
                    )));
                }
            }
            if !cp.confidence.is_finite() || !(0.0..=1.0).contains(&cp.confidence) {
                return Err(CpaError::invalid_input(format!(
                    "confidence at index {} must be within [0, 1]; got {}",
                    cp.index, cp.confidence
                )));
            }
            if !cp.value.is_finite() {
                return Err(CpaError::invalid_input(format!(
                    "value at index {} must be finite; got {}",
                    cp.index, cp.value
                )));
            }
            previous = Some(cp.index);
        }

        let confidence = if change_points.is_empty() {
            0.0
        } else {
            change_points.iter().map(|cp| cp.confidence).sum::<f64>()
                / change_points.len() as f64
        };

        Ok(Self {
            algorithm,
            change_points,
            execution_time_ms,
            confidence,
        })
    }
}
