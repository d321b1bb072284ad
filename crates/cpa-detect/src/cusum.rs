// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classify::{classify_boundary, BOUNDARY_WINDOW};
use crate::stats::saturating_confidence;
use crate::Detector;
use cpa_core::{AlgorithmId, ChangePoint, CpaError, ResolvedParams, Series};

const MIN_POINTS: usize = 2;

/// Which excursions of the cumulative sums may fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Both,
    Positive,
    Negative,
}

impl Direction {
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw {
            "both" => Ok(Self::Both),
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            _ => Err(CpaError::invalid_parameter(
                "direction",
                format!("'{raw}' is not one of both, positive, negative"),
            )),
        }
    }
}

/// Configuration for [`Cusum`].
#[derive(Clone, Debug, PartialEq)]
pub struct CusumConfig {
    pub threshold: f64,
    pub drift: f64,
    pub direction: Direction,
}

impl CusumConfig {
    pub fn from_params(params: &ResolvedParams) -> Result<Self, CpaError> {
        let config = Self {
            threshold: params.number("threshold")?,
            drift: params.number("drift")?,
            direction: Direction::parse(params.choice("direction")?)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CpaError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(CpaError::invalid_parameter(
                "threshold",
                format!("must be finite and > 0; got {}", self.threshold),
            ));
        }
        if !self.drift.is_finite() || self.drift < 0.0 {
            return Err(CpaError::invalid_parameter(
                "drift",
                format!("must be finite and >= 0; got {}", self.drift),
            ));
        }
        Ok(())
    }
}

/// Self-starting two-sided CUSUM control chart.
///
/// The reference level is the running mean of the current segment; both
/// one-sided sums accumulate raw deviations minus `drift` and reset after
/// each detection, restarting the reference from the flagged observation.
#[derive(Debug)]
pub struct Cusum {
    config: CusumConfig,
}

impl Cusum {
    pub fn new(config: CusumConfig) -> Result<Self, CpaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CusumConfig {
        &self.config
    }
}

impl Detector for Cusum {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Cusum
    }

    fn detect(&self, series: &Series) -> Result<Vec<ChangePoint>, CpaError> {
        let values = series.values();
        if values.len() < MIN_POINTS {
            return Ok(vec![]);
        }

        let threshold = self.config.threshold;
        let drift = self.config.drift;

        let mut change_points = Vec::new();
        let mut reference = values[0];
        let mut segment_count = 1.0_f64;
        let mut sum_pos = 0.0_f64;
        let mut sum_neg = 0.0_f64;

        for (index, &value) in values.iter().enumerate().skip(1) {
            let deviation = value - reference;
            sum_pos = (sum_pos + deviation - drift).max(0.0);
            sum_neg = (sum_neg - deviation - drift).max(0.0);
            if !sum_pos.is_finite() || !sum_neg.is_finite() {
                return Err(CpaError::numerical_issue(format!(
                    "non-finite cumulative sum at index {index}: pos={sum_pos}, neg={sum_neg}"
                )));
            }

            let fired = match self.config.direction {
                Direction::Both => sum_pos.max(sum_neg),
                Direction::Positive => sum_pos,
                Direction::Negative => sum_neg,
            };

            if fired > threshold {
                change_points.push(ChangePoint {
                    index,
                    confidence: saturating_confidence(fired, threshold),
                    kind: classify_boundary(values, index, BOUNDARY_WINDOW),
                    value,
                });
                sum_pos = 0.0;
                sum_neg = 0.0;
                reference = value;
                segment_count = 1.0;
            } else {
                segment_count += 1.0;
                reference += (value - reference) / segment_count;
            }
        }

        Ok(change_points)
    }
}
