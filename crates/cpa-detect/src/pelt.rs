// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classify::{classify_boundary, BOUNDARY_WINDOW};
use crate::penalty::{penalty_value, PenaltyCriterion};
use crate::stats::{saturating_confidence, PrefixStats};
use crate::Detector;
use cpa_core::{AlgorithmId, ChangePoint, CpaError, ResolvedParams, Series};

/// Model dof per segment under the Gaussian mean+variance cost.
const GAUSSIAN_DOF: usize = 2;

/// Configuration for [`Pelt`].
#[derive(Clone, Debug, PartialEq)]
pub struct PeltConfig {
    pub penalty: PenaltyCriterion,
    pub min_size: usize,
    pub jump_penalty: f64,
}

impl PeltConfig {
    pub fn from_params(params: &ResolvedParams) -> Result<Self, CpaError> {
        let config = Self {
            penalty: PenaltyCriterion::parse(params.choice("penalty")?)?,
            min_size: params.number("min_size")? as usize,
            jump_penalty: params.number("jump_penalty")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CpaError> {
        if self.min_size < 2 {
            return Err(CpaError::invalid_parameter(
                "min_size",
                format!("must be >= 2; got {}", self.min_size),
            ));
        }
        if !self.jump_penalty.is_finite() || self.jump_penalty < 0.0 {
            return Err(CpaError::invalid_parameter(
                "jump_penalty",
                format!("must be finite and >= 0; got {}", self.jump_penalty),
            ));
        }
        Ok(())
    }
}

/// Pruned Exact Linear Time detector over the Gaussian mean+variance cost.
///
/// Produces the exact minimal-cost partition for the resolved penalty; the
/// pruning step only discards candidates that provably cannot participate in
/// a future optimum.
#[derive(Debug)]
pub struct Pelt {
    config: PeltConfig,
}

impl Pelt {
    pub fn new(config: PeltConfig) -> Result<Self, CpaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PeltConfig {
        &self.config
    }
}

fn backtrack(n: usize, last_change: &[usize]) -> Result<Vec<usize>, CpaError> {
    let mut boundaries = Vec::new();
    let mut cursor = n;
    let mut hops = 0usize;

    while cursor > 0 {
        hops += 1;
        if hops > n + 1 {
            return Err(CpaError::invalid_input(
                "invalid DP backtrack state: cycle detected",
            ));
        }

        let tau = last_change[cursor];
        if tau == usize::MAX || tau >= cursor {
            return Err(CpaError::invalid_input(format!(
                "invalid DP backtrack state at t={cursor}"
            )));
        }
        if tau == 0 {
            break;
        }
        boundaries.push(tau);
        cursor = tau;
    }

    boundaries.reverse();
    Ok(boundaries)
}

impl Detector for Pelt {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Pelt
    }

    fn detect(&self, series: &Series) -> Result<Vec<ChangePoint>, CpaError> {
        let values = series.values();
        let n = values.len();
        let min_size = self.config.min_size;
        if n < 2 * min_size {
            return Ok(vec![]);
        }

        let prefix = PrefixStats::new(values);
        let beta = penalty_value(self.config.penalty, n, GAUSSIAN_DOF)? + self.config.jump_penalty;

        // F(t): optimal cost of [0, t) including one penalty per segment;
        // seeded at -beta so the first segment carries no penalty.
        let mut best = vec![f64::INFINITY; n + 1];
        let mut last_change = vec![usize::MAX; n + 1];
        best[0] = -beta;
        last_change[0] = 0;

        let mut candidates: Vec<usize> = vec![0];
        let mut scores: Vec<Option<f64>> = Vec::new();

        for t in min_size..=n {
            scores.clear();
            scores.resize(candidates.len(), None);

            let mut best_cost = f64::INFINITY;
            let mut best_tau = usize::MAX;
            for (slot, &tau) in candidates.iter().enumerate() {
                if t - tau < min_size {
                    continue;
                }
                let segment_cost = prefix.gaussian_cost(tau, t);
                if !segment_cost.is_finite() {
                    return Err(CpaError::numerical_issue(format!(
                        "non-finite segment cost at [{tau}, {t})"
                    )));
                }
                let score = best[tau] + segment_cost;
                scores[slot] = Some(score);

                let candidate = score + beta;
                if candidate < best_cost || (candidate == best_cost && tau < best_tau) {
                    best_cost = candidate;
                    best_tau = tau;
                }
            }

            if best_tau == usize::MAX {
                continue;
            }
            best[t] = best_cost;
            last_change[t] = best_tau;

            // Keep candidates that can still beat the current optimum, plus
            // those not yet scoreable at this t.
            let mut kept = Vec::with_capacity(candidates.len() + 1);
            for (slot, &tau) in candidates.iter().enumerate() {
                match scores[slot] {
                    Some(score) if score >= best_cost => {}
                    _ => kept.push(tau),
                }
            }
            if t < n {
                kept.push(t);
            }
            candidates = kept;
        }

        if !best[n].is_finite() {
            return Err(CpaError::invalid_input(
                "no feasible segmentation reached the end of the series",
            ));
        }

        let boundaries = backtrack(n, &last_change)?;
        let mut bounds = Vec::with_capacity(boundaries.len() + 2);
        bounds.push(0);
        bounds.extend_from_slice(&boundaries);
        bounds.push(n);

        let mut change_points = Vec::with_capacity(boundaries.len());
        for i in 1..bounds.len() - 1 {
            let (prev, here, next) = (bounds[i - 1], bounds[i], bounds[i + 1]);
            let gain = (prefix.gaussian_cost(prev, next)
                - prefix.gaussian_cost(prev, here)
                - prefix.gaussian_cost(here, next))
            .max(0.0);
            change_points.push(ChangePoint {
                index: here,
                confidence: saturating_confidence(gain, beta),
                kind: classify_boundary(values, here, BOUNDARY_WINDOW.max(min_size)),
                value: values[here],
            });
        }

        Ok(change_points)
    }
}

#[cfg(test)]
mod tests {
    use super::{Pelt, PeltConfig};
    use crate::penalty::PenaltyCriterion;
    use crate::Detector;
    use cpa_core::{ChangeKind, Series};

    fn detector(penalty: PenaltyCriterion, min_size: usize, jump_penalty: f64) -> Pelt {
        Pelt::new(PeltConfig {
            penalty,
            min_size,
            jump_penalty,
        })
        .expect("config should be valid")
    }

    fn indices(series: &Series, pelt: &Pelt) -> Vec<usize> {
        pelt.detect(series)
            .expect("detect should succeed")
            .iter()
            .map(|cp| cp.index)
            .collect()
    }

    #[test]
    fn single_mean_shift_is_found_exactly() {
        let mut values = vec![0.0; 12];
        values.extend(vec![30.0; 12]);
        let series = Series::from_values(&values).expect("series should build");

        let found = detector(PenaltyCriterion::Bic, 5, 0.0)
            .detect(&series)
            .expect("detect should succeed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 12);
        assert!(found[0].confidence > 0.9);
        assert_eq!(found[0].kind, ChangeKind::Mean);
    }

    #[test]
    fn two_shifts_are_both_recovered() {
        let mut values = vec![0.0; 10];
        values.extend(vec![12.0; 10]);
        values.extend(vec![-5.0; 10]);
        let series = Series::from_values(&values).expect("series should build");

        assert_eq!(
            indices(&series, &detector(PenaltyCriterion::Bic, 3, 0.0)),
            vec![10, 20]
        );
    }

    #[test]
    fn constant_series_yields_no_partition() {
        let series = Series::from_values(&[7.0; 40]).expect("series should build");
        assert!(indices(&series, &detector(PenaltyCriterion::Bic, 5, 0.0)).is_empty());
    }

    #[test]
    fn variance_change_is_detected_under_the_gaussian_cost() {
        let mut values: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { -0.5 } else { 0.5 })
            .collect();
        values.extend((0..20).map(|i| if i % 2 == 0 { -8.0 } else { 8.0 }));
        let series = Series::from_values(&values).expect("series should build");

        let found = detector(PenaltyCriterion::Bic, 5, 0.0)
            .detect(&series)
            .expect("detect should succeed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 20);
        assert_eq!(found[0].kind, ChangeKind::Variance);
    }

    #[test]
    fn short_series_returns_empty_not_error() {
        let series = Series::from_values(&[1.0, 2.0, 3.0]).expect("series should build");
        assert!(indices(&series, &detector(PenaltyCriterion::Bic, 5, 0.0)).is_empty());

        let one = Series::from_values(&[1.0]).expect("series should build");
        assert!(indices(&one, &detector(PenaltyCriterion::Bic, 5, 0.0)).is_empty());
    }

    #[test]
    fn min_size_suppresses_early_boundaries() {
        // The shift sits 4 points from the start; min_size 10 cannot place a
        // boundary there.
        let mut values = vec![0.0; 4];
        values.extend(vec![30.0; 26]);
        let series = Series::from_values(&values).expect("series should build");

        let found = indices(&series, &detector(PenaltyCriterion::Bic, 10, 0.0));
        assert!(!found.contains(&4), "boundary at 4 violates min_size: {found:?}");
    }

    #[test]
    fn jump_penalty_reduces_the_change_count() {
        let mut values = vec![0.0; 8];
        values.extend(vec![3.0; 8]);
        values.extend(vec![0.5; 8]);
        values.extend(vec![3.5; 8]);
        let series = Series::from_values(&values).expect("series should build");

        let plain = indices(&series, &detector(PenaltyCriterion::Bic, 3, 0.0));
        let damped = indices(&series, &detector(PenaltyCriterion::Bic, 3, 10.0));
        assert!(
            damped.len() <= plain.len(),
            "jump penalty must not add changes: {plain:?} vs {damped:?}"
        );
    }

    #[test]
    fn aic_is_at_least_as_permissive_as_mbic() {
        let mut values = vec![0.0; 10];
        values.extend(vec![2.0; 10]);
        values.extend(vec![-2.0; 10]);
        let series = Series::from_values(&values).expect("series should build");

        let aic = indices(&series, &detector(PenaltyCriterion::Aic, 3, 0.0));
        let mbic = indices(&series, &detector(PenaltyCriterion::Mbic, 3, 0.0));
        assert!(aic.len() >= mbic.len());
    }

    #[test]
    fn rejects_min_size_below_two() {
        let err = Pelt::new(PeltConfig {
            penalty: PenaltyCriterion::Bic,
            min_size: 1,
            jump_penalty: 0.0,
        })
        .expect_err("min_size 1 must fail");
        assert!(err.to_string().contains("min_size"));
    }
}
