// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpa_core::{AlgorithmId, AlgorithmResult, ChangePoint, CpaError};

/// Which algorithms the filtered view includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    All,
    Only(AlgorithmId),
}

impl FilterMode {
    /// Parses `all` or any registered algorithm name.
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        AlgorithmId::parse(raw).map(Self::Only)
    }
}

/// A change point tagged with its source algorithm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourcedChangePoint {
    pub algorithm: AlgorithmId,
    pub change_point: ChangePoint,
}

/// Flattens `results` into the filtered comparison view.
///
/// Points below `confidence_threshold` are dropped. The relative order is
/// source result order, then index within each result — per-algorithm
/// clusters, not a global time sort. Pure over its inputs.
pub fn filter_results(
    results: &[AlgorithmResult],
    mode: FilterMode,
    confidence_threshold: f64,
) -> Result<Vec<SourcedChangePoint>, CpaError> {
    if !confidence_threshold.is_finite() || !(0.0..=1.0).contains(&confidence_threshold) {
        return Err(CpaError::invalid_input(format!(
            "confidence threshold must be within [0, 1]; got {confidence_threshold}"
        )));
    }

    let mut out = Vec::new();
    for result in results {
        if let FilterMode::Only(id) = mode {
            if result.algorithm != id {
                continue;
            }
        }
        for change_point in &result.change_points {
            if change_point.confidence >= confidence_threshold {
                out.push(SourcedChangePoint {
                    algorithm: result.algorithm,
                    change_point: *change_point,
                });
            }
        }
    }
    Ok(out)
}
