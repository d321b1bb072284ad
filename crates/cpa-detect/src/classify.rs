// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Change-type classification from the statistics of the windows flanking a
//! flagged index.

use crate::stats::{detrended_variance, lag1_autocorrelation, mean, slope};
use cpa_core::ChangeKind;

/// Default flank width used by detectors without a natural window size.
pub const BOUNDARY_WINDOW: usize = 8;

/// Minimum |lag-1 autocorrelation shift| for a periodicity call.
const ACF_SHIFT_MIN: f64 = 0.5;
/// Minimum |ln variance ratio| for a variance call (a doubling).
const VAR_RATIO_MIN: f64 = std::f64::consts::LN_2;
/// Trend must beat the normalized mean shift by this margin.
const TREND_MARGIN: f64 = 1.5;
/// Minimum normalized trend statistic for a trend call.
const TREND_MIN: f64 = 0.5;

const SCALE_FLOOR: f64 = 1.0e-8;

/// Classifies the change at `index` from up to `window` points on each side.
///
/// Four boundary statistics compete: the mean shift over the pooled
/// detrended std, the slope shift accumulated over the flank length over the
/// same scale, the absolute log ratio of the detrended variances, and the
/// absolute lag-1 autocorrelation shift. Variance and periodicity calls need
/// their absolute thresholds and must not be beaten by the competing
/// statistics; a trend call needs a margin over the mean statistic; mean is
/// the fallback. Flanks shorter than two points always classify as mean.
pub fn classify_boundary(values: &[f64], index: usize, window: usize) -> ChangeKind {
    let window = window.max(2);
    let start = index.saturating_sub(window);
    let end = (index + window).min(values.len());
    if index <= start || end <= index {
        return ChangeKind::Mean;
    }

    let left = &values[start..index];
    let right = &values[index..end];
    if left.len() < 2 || right.len() < 2 {
        return ChangeKind::Mean;
    }

    let noise_left = detrended_variance(left);
    let noise_right = detrended_variance(right);
    let pooled = ((noise_left + noise_right) / 2.0).sqrt().max(SCALE_FLOOR);
    let flank = left.len().min(right.len()) as f64;

    let mean_stat = (mean(right) - mean(left)).abs() / pooled;
    let trend_stat = (slope(right) - slope(left)).abs() * flank / pooled;
    let var_stat = ((noise_right + SCALE_FLOOR) / (noise_left + SCALE_FLOOR))
        .ln()
        .abs();
    let acf_stat = (lag1_autocorrelation(right) - lag1_autocorrelation(left)).abs();

    if var_stat >= VAR_RATIO_MIN && var_stat >= mean_stat && var_stat >= trend_stat {
        ChangeKind::Variance
    } else if acf_stat >= ACF_SHIFT_MIN && acf_stat >= mean_stat {
        ChangeKind::Periodicity
    } else if trend_stat >= TREND_MIN && trend_stat >= TREND_MARGIN * mean_stat {
        ChangeKind::Trend
    } else {
        ChangeKind::Mean
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_boundary, BOUNDARY_WINDOW};
    use cpa_core::ChangeKind;

    #[test]
    fn level_shift_classifies_as_mean() {
        let mut values = vec![10.0; 12];
        values.extend(vec![50.0; 12]);
        assert_eq!(
            classify_boundary(&values, 12, BOUNDARY_WINDOW),
            ChangeKind::Mean
        );
    }

    #[test]
    fn spread_blowup_classifies_as_variance() {
        let mut values: Vec<f64> = (0..16)
            .map(|i| if i % 2 == 0 { -0.1 } else { 0.1 })
            .collect();
        values.extend((0..16).map(|i| if i % 2 == 0 { -4.0 } else { 4.0 }));
        assert_eq!(
            classify_boundary(&values, 16, BOUNDARY_WINDOW),
            ChangeKind::Variance
        );
    }

    #[test]
    fn slope_break_classifies_as_trend() {
        // Flat left flank meeting a clean steep ramp; both flanks are
        // noise-free after detrending, so the variance statistic stays flat.
        let mut values = vec![0.0; 16];
        values.extend((0..16).map(|i| (i as f64 - 7.5) * 2.0));
        assert_eq!(
            classify_boundary(&values, 16, BOUNDARY_WINDOW),
            ChangeKind::Trend
        );
    }

    #[test]
    fn autocorrelation_flip_classifies_as_periodicity() {
        // Period-4 square wave flipping to a period-2 alternation with the
        // same amplitude: variance and mean barely move, the lag-1
        // autocorrelation swings from positive to strongly negative.
        let mut values: Vec<f64> = (0..16)
            .map(|i| if (i / 2) % 2 == 0 { 0.6 } else { -0.6 })
            .collect();
        values.extend((0..16).map(|i| if i % 2 == 0 { 0.6 } else { -0.6 }));
        assert_eq!(
            classify_boundary(&values, 16, BOUNDARY_WINDOW),
            ChangeKind::Periodicity
        );
    }

    #[test]
    fn short_flanks_fall_back_to_mean() {
        let values = [1.0, 50.0];
        assert_eq!(classify_boundary(&values, 1, BOUNDARY_WINDOW), ChangeKind::Mean);
        assert_eq!(classify_boundary(&values, 0, BOUNDARY_WINDOW), ChangeKind::Mean);
    }
}
