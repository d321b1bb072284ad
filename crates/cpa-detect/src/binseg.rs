// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classify::{classify_boundary, BOUNDARY_WINDOW};
use crate::penalty::{penalty_value, PenaltyCriterion};
use crate::stats::{saturating_confidence, PrefixStats, VAR_EPSILON};
use crate::Detector;
use cpa_core::{AlgorithmId, ChangePoint, CpaError, ResolvedParams, Series};

/// Model dof per segment under the mean-shift (L2) cost.
const L2_DOF: usize = 2;

/// Configuration for [`BinSeg`].
#[derive(Clone, Debug, PartialEq)]
pub struct BinSegConfig {
    pub penalty: PenaltyCriterion,
    pub min_segment_length: usize,
    pub max_change_points: usize,
}

impl BinSegConfig {
    pub fn from_params(params: &ResolvedParams) -> Result<Self, CpaError> {
        let config = Self {
            penalty: PenaltyCriterion::parse(params.choice("penalty")?)?,
            min_segment_length: params.number("min_segment_length")? as usize,
            max_change_points: params.number("max_change_points")? as usize,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CpaError> {
        if self.min_segment_length < 2 {
            return Err(CpaError::invalid_parameter(
                "min_segment_length",
                format!("must be >= 2; got {}", self.min_segment_length),
            ));
        }
        if self.max_change_points == 0 {
            return Err(CpaError::invalid_parameter(
                "max_change_points",
                format!("must be >= 1; got {}", self.max_change_points),
            ));
        }
        Ok(())
    }
}

/// Greedy best-first binary segmentation over the L2 cost, with split gains
/// normalized by the parent segment's variance.
///
/// Each round takes the split with the largest normalized cost reduction
/// across all current segments and accepts it while the reduction exceeds
/// the criterion penalty; recursion stops when no split improves the
/// criterion or the change budget is exhausted. Normalizing by the parent
/// segment keeps nested shifts detectable regardless of the whole-series
/// spread.
#[derive(Debug)]
pub struct BinSeg {
    config: BinSegConfig,
}

impl BinSeg {
    pub fn new(config: BinSegConfig) -> Result<Self, CpaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BinSegConfig {
        &self.config
    }
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    split: usize,
    gain: f64,
}

fn best_split(
    prefix: &PrefixStats,
    start: usize,
    end: usize,
    min_len: usize,
) -> Option<SplitCandidate> {
    if end.saturating_sub(start) < 2 * min_len {
        return None;
    }

    let whole = prefix.segment_sse(start, end);
    let norm = (whole / (end - start) as f64).max(VAR_EPSILON);
    let mut best: Option<SplitCandidate> = None;
    for split in (start + min_len)..=(end - min_len) {
        let gain =
            (whole - prefix.segment_sse(start, split) - prefix.segment_sse(split, end)) / norm;
        let improves = match best {
            None => true,
            Some(current) => gain > current.gain,
        };
        if improves {
            best = Some(SplitCandidate { split, gain });
        }
    }
    best
}

impl Detector for BinSeg {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::BinarySegmentation
    }

    fn detect(&self, series: &Series) -> Result<Vec<ChangePoint>, CpaError> {
        let values = series.values();
        let n = values.len();
        let min_len = self.config.min_segment_length;
        if n < 2 * min_len {
            return Ok(vec![]);
        }

        let prefix = PrefixStats::new(values);
        let beta = penalty_value(self.config.penalty, n, L2_DOF)?;

        let mut segments: Vec<(usize, usize)> = vec![(0, n)];
        let mut accepted: Vec<SplitCandidate> = Vec::new();

        while accepted.len() < self.config.max_change_points {
            let mut round_best: Option<(usize, SplitCandidate)> = None;
            for (slot, &(start, end)) in segments.iter().enumerate() {
                let Some(candidate) = best_split(&prefix, start, end, min_len) else {
                    continue;
                };
                if !candidate.gain.is_finite() {
                    return Err(CpaError::numerical_issue(format!(
                        "non-finite split gain in segment [{start}, {end})"
                    )));
                }
                let improves = match round_best {
                    None => true,
                    Some((_, current)) => {
                        candidate.gain > current.gain
                            || (candidate.gain == current.gain && candidate.split < current.split)
                    }
                };
                if improves {
                    round_best = Some((slot, candidate));
                }
            }

            let Some((slot, candidate)) = round_best else {
                break;
            };
            if candidate.gain <= beta {
                break;
            }

            let (start, end) = segments[slot];
            segments[slot] = (start, candidate.split);
            segments.insert(slot + 1, (candidate.split, end));
            accepted.push(candidate);
        }

        accepted.sort_by_key(|candidate| candidate.split);
        Ok(accepted
            .iter()
            .map(|candidate| ChangePoint {
                index: candidate.split,
                confidence: saturating_confidence(candidate.gain, beta),
                kind: classify_boundary(values, candidate.split, BOUNDARY_WINDOW.max(min_len)),
                value: values[candidate.split],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{BinSeg, BinSegConfig};
    use crate::penalty::PenaltyCriterion;
    use crate::Detector;
    use cpa_core::{ChangeKind, Series};

    fn detector(min_segment_length: usize, max_change_points: usize) -> BinSeg {
        BinSeg::new(BinSegConfig {
            penalty: PenaltyCriterion::Bic,
            min_segment_length,
            max_change_points,
        })
        .expect("config should be valid")
    }

    fn indices(series: &Series, binseg: &BinSeg) -> Vec<usize> {
        binseg
            .detect(series)
            .expect("detect should succeed")
            .iter()
            .map(|cp| cp.index)
            .collect()
    }

    #[test]
    fn step_up_and_back_down_yields_two_splits() {
        let mut values = vec![0.0; 10];
        values.extend(vec![10.0; 10]);
        values.extend(vec![0.0; 10]);
        let series = Series::from_values(&values).expect("series should build");

        assert_eq!(indices(&series, &detector(2, 10)), vec![10, 20]);
    }

    #[test]
    fn splits_carry_confidence_above_half_and_mean_kind() {
        let mut values = vec![0.0; 12];
        values.extend(vec![8.0; 12]);
        let series = Series::from_values(&values).expect("series should build");

        let found = detector(2, 10).detect(&series).expect("detect should succeed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 12);
        assert!(found[0].confidence > 0.5);
        assert_eq!(found[0].kind, ChangeKind::Mean);
        assert_eq!(found[0].value, 8.0);
    }

    #[test]
    fn max_change_points_caps_the_recursion() {
        let mut values = Vec::new();
        for level in [0.0, 10.0, 20.0, 30.0, 40.0] {
            values.extend(vec![level; 8]);
        }
        let series = Series::from_values(&values).expect("series should build");

        let unbounded = indices(&series, &detector(2, 10));
        assert_eq!(unbounded, vec![8, 16, 24, 32]);

        let capped = indices(&series, &detector(2, 2));
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn constant_series_yields_no_splits() {
        let series = Series::from_values(&[4.0; 30]).expect("series should build");
        assert!(indices(&series, &detector(2, 10)).is_empty());
    }

    #[test]
    fn short_series_returns_empty_not_error() {
        let series = Series::from_values(&[1.0, 9.0, 1.0]).expect("series should build");
        assert!(indices(&series, &detector(2, 10)).is_empty());

        let one = Series::from_values(&[1.0]).expect("series should build");
        assert!(indices(&one, &detector(2, 10)).is_empty());
    }

    #[test]
    fn min_segment_length_keeps_splits_away_from_the_edges() {
        let mut values = vec![0.0; 3];
        values.extend(vec![50.0; 21]);
        let series = Series::from_values(&values).expect("series should build");

        for split in indices(&series, &detector(6, 10)) {
            assert!(split >= 6 && split <= values.len() - 6, "split {split} too close to an edge");
        }
    }

    #[test]
    fn rejects_zero_change_budget() {
        let err = BinSeg::new(BinSegConfig {
            penalty: PenaltyCriterion::Bic,
            min_segment_length: 2,
            max_change_points: 0,
        })
        .expect_err("zero budget must fail");
        assert!(err.to_string().contains("max_change_points"));
    }
}
