// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The four detection algorithms of the cpa engine behind one [`Detector`]
//! trait: CUSUM, PELT, binary segmentation, and kernel change detection.
//!
//! Every detector is deterministic over identical inputs: no clocks, no
//! randomness. A series shorter than the algorithm's minimum working length
//! is a valid "no change points" outcome, never an error.

pub mod binseg;
pub mod classify;
pub mod cusum;
pub mod kernel;
pub mod penalty;
pub mod pelt;
pub mod stats;

pub use binseg::{BinSeg, BinSegConfig};
pub use classify::classify_boundary;
pub use cusum::{Cusum, CusumConfig, Direction};
pub use kernel::{KernelChange, KernelChangeConfig, KernelMethod};
pub use pelt::{Pelt, PeltConfig};
pub use penalty::{penalty_value, PenaltyCriterion};

use cpa_core::{AlgorithmConfig, AlgorithmId, ChangePoint, CpaError, Series};

/// Contract shared by the four detection algorithms.
///
/// `detect` returns change points sorted ascending by index with confidence
/// in [0, 1]; the caller wraps them into an `AlgorithmResult` with timing.
pub trait Detector {
    fn id(&self) -> AlgorithmId;
    fn detect(&self, series: &Series) -> Result<Vec<ChangePoint>, CpaError>;
}

/// Builds the detector for a validated config.
///
/// The catalogue is closed: exactly the four registered algorithms, no
/// runtime plugin dispatch.
pub fn build_detector(
    config: &AlgorithmConfig,
) -> Result<Box<dyn Detector + Send + Sync>, CpaError> {
    let params = config.params();
    Ok(match config.id {
        AlgorithmId::Cusum => Box::new(Cusum::new(CusumConfig::from_params(params)?)?),
        AlgorithmId::Pelt => Box::new(Pelt::new(PeltConfig::from_params(params)?)?),
        AlgorithmId::BinarySegmentation => {
            Box::new(BinSeg::new(BinSegConfig::from_params(params)?)?)
        }
        AlgorithmId::KernelChangeDetection => {
            Box::new(KernelChange::new(KernelChangeConfig::from_params(params)?)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::build_detector;
    use cpa_core::{AlgorithmConfig, AlgorithmId, Series};

    #[test]
    fn build_detector_covers_the_whole_catalogue() {
        for id in AlgorithmId::ALL {
            let config = AlgorithmConfig::with_defaults(id);
            let detector = build_detector(&config).expect("defaults should build");
            assert_eq!(detector.id(), id);
        }
    }

    #[test]
    fn default_detectors_handle_a_length_one_series() {
        let series = Series::from_values(&[1.0]).expect("series should build");
        for id in AlgorithmId::ALL {
            let detector =
                build_detector(&AlgorithmConfig::with_defaults(id)).expect("defaults should build");
            let found = detector
                .detect(&series)
                .expect("length-1 series must not fail");
            assert!(found.is_empty(), "{id} returned {found:?} on a length-1 series");
        }
    }

    #[test]
    fn default_detectors_agree_on_an_obvious_shift() {
        let mut values = vec![0.0; 40];
        values.extend(vec![25.0; 40]);
        let series = Series::from_values(&values).expect("series should build");

        for id in AlgorithmId::ALL {
            let detector =
                build_detector(&AlgorithmConfig::with_defaults(id)).expect("defaults should build");
            let found = detector.detect(&series).expect("detect should succeed");
            assert!(
                found.iter().any(|cp| cp.index.abs_diff(40) <= 4),
                "{id} missed the obvious shift: {found:?}"
            );
        }
    }
}
