// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classify::classify_boundary;
use crate::stats::{saturating_confidence, variance};
use crate::Detector;
use cpa_core::{AlgorithmId, ChangePoint, CpaError, ResolvedParams, Series};

/// Kernel used to compare the window halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelMethod {
    Gaussian,
    Linear,
    Polynomial,
}

impl KernelMethod {
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw {
            "gaussian" => Ok(Self::Gaussian),
            "linear" => Ok(Self::Linear),
            "polynomial" => Ok(Self::Polynomial),
            _ => Err(CpaError::invalid_parameter(
                "method",
                format!("'{raw}' is not one of gaussian, linear, polynomial"),
            )),
        }
    }
}

/// Configuration for [`KernelChange`].
#[derive(Clone, Debug, PartialEq)]
pub struct KernelChangeConfig {
    pub kernel_size: usize,
    pub method: KernelMethod,
    pub threshold: f64,
}

impl KernelChangeConfig {
    pub fn from_params(params: &ResolvedParams) -> Result<Self, CpaError> {
        let config = Self {
            kernel_size: params.number("kernel_size")? as usize,
            method: KernelMethod::parse(params.choice("method")?)?,
            threshold: params.number("threshold")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CpaError> {
        if self.kernel_size < 4 {
            return Err(CpaError::invalid_parameter(
                "kernel_size",
                format!("must be >= 4; got {}", self.kernel_size),
            ));
        }
        if self.kernel_size % 2 != 0 {
            return Err(CpaError::invalid_parameter(
                "kernel_size",
                format!("must be even; got {}", self.kernel_size),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(CpaError::invalid_parameter(
                "threshold",
                format!("must be finite and > 0; got {}", self.threshold),
            ));
        }
        Ok(())
    }

    fn half_window(&self) -> usize {
        self.kernel_size / 2
    }
}

/// Sliding-window kernel change detector.
///
/// Slides a window of `kernel_size` over the series and scores each center
/// with the biased MMD^2 statistic between the window halves. Scores are
/// z-scored across all centers; local maxima whose z-score exceeds
/// `threshold` are flagged, with peaks closer than half a window suppressed
/// in favor of the stronger one.
#[derive(Debug)]
pub struct KernelChange {
    config: KernelChangeConfig,
}

impl KernelChange {
    pub fn new(config: KernelChangeConfig) -> Result<Self, CpaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KernelChangeConfig {
        &self.config
    }
}

#[derive(Clone, Copy, Debug)]
enum ResolvedKernel {
    Gaussian { gamma: f64 },
    Linear,
    Polynomial,
}

fn kernel_value(kernel: ResolvedKernel, left: f64, right: f64) -> f64 {
    match kernel {
        ResolvedKernel::Gaussian { gamma } => {
            let delta = left - right;
            (-gamma * delta * delta).exp()
        }
        ResolvedKernel::Linear => left * right,
        ResolvedKernel::Polynomial => {
            let dot = left * right + 1.0;
            dot * dot
        }
    }
}

fn mean_kernel(kernel: ResolvedKernel, left: &[f64], right: &[f64]) -> f64 {
    let mut sum = 0.0;
    for &a in left {
        for &b in right {
            sum += kernel_value(kernel, a, b);
        }
    }
    sum / (left.len() * right.len()) as f64
}

/// Biased MMD^2 estimate between two samples.
fn mmd_squared(kernel: ResolvedKernel, left: &[f64], right: &[f64]) -> f64 {
    mean_kernel(kernel, left, left) + mean_kernel(kernel, right, right)
        - 2.0 * mean_kernel(kernel, left, right)
}

impl Detector for KernelChange {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::KernelChangeDetection
    }

    fn detect(&self, series: &Series) -> Result<Vec<ChangePoint>, CpaError> {
        let values = series.values();
        let n = values.len();
        let half = self.config.half_window();
        if n < self.config.kernel_size {
            return Ok(vec![]);
        }

        let series_variance = variance(values);
        if series_variance <= 0.0 {
            return Ok(vec![]);
        }
        let kernel = match self.config.method {
            KernelMethod::Gaussian => ResolvedKernel::Gaussian {
                gamma: 1.0 / (2.0 * series_variance),
            },
            KernelMethod::Linear => ResolvedKernel::Linear,
            KernelMethod::Polynomial => ResolvedKernel::Polynomial,
        };

        // One statistic per admissible window center.
        let centers: Vec<usize> = (half..=n - half).collect();
        let mut stats = Vec::with_capacity(centers.len());
        for &center in &centers {
            let left = &values[center - half..center];
            let right = &values[center..center + half];
            let stat = mmd_squared(kernel, left, right);
            if !stat.is_finite() {
                return Err(CpaError::numerical_issue(format!(
                    "non-finite window statistic at center {center}"
                )));
            }
            stats.push(stat);
        }

        let stat_mean = stats.iter().sum::<f64>() / stats.len() as f64;
        let stat_var = stats
            .iter()
            .map(|s| (s - stat_mean) * (s - stat_mean))
            .sum::<f64>()
            / stats.len() as f64;
        let stat_std = stat_var.sqrt();
        if stat_std <= 0.0 {
            return Ok(vec![]);
        }

        // Local maxima above the significance threshold.
        let mut peaks: Vec<(usize, f64)> = Vec::new();
        for (slot, &center) in centers.iter().enumerate() {
            let z = (stats[slot] - stat_mean) / stat_std;
            if z <= self.config.threshold {
                continue;
            }
            let left_ok = slot == 0 || stats[slot] >= stats[slot - 1];
            let right_ok = slot + 1 == stats.len() || stats[slot] >= stats[slot + 1];
            if left_ok && right_ok {
                peaks.push((center, z));
            }
        }

        // Strongest peak wins within half a window.
        peaks.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let mut accepted: Vec<(usize, f64)> = Vec::new();
        for (center, z) in peaks {
            if accepted
                .iter()
                .all(|&(kept, _)| center.abs_diff(kept) >= half)
            {
                accepted.push((center, z));
            }
        }
        accepted.sort_by_key(|&(center, _)| center);

        Ok(accepted
            .into_iter()
            .map(|(center, z)| ChangePoint {
                index: center,
                confidence: saturating_confidence(z, self.config.threshold),
                kind: classify_boundary(values, center, half),
                value: values[center],
            })
            .collect())
    }
}
