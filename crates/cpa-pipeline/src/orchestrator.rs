// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpa_core::{AlgorithmConfig, AlgorithmResult, CancelToken, CpaError, Series};
use cpa_detect::build_detector;
use rayon::prelude::*;
use std::time::Instant;

/// One analysis invocation: a series plus the ordered algorithm configs.
///
/// Consumed per run; results are terminal and only replaced by a later
/// run's output, never mutated.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub series: Series,
    pub configs: Vec<AlgorithmConfig>,
}

/// Runs every enabled config over the request's series.
///
/// Algorithms share no mutable state and read the same immutable series, so
/// they fan out across the rayon pool; the output keeps the config order.
/// Any algorithm failure aborts the whole run — downstream comparison
/// assumes one result per enabled algorithm, so partial sets are never
/// returned.
pub fn run(request: &RunRequest) -> Result<Vec<AlgorithmResult>, CpaError> {
    run_with_cancel(request, None)
}

/// Like [`run`], observing `cancel` before each algorithm starts.
///
/// Cancellation is coarse-grained: an algorithm that already started runs to
/// completion.
pub fn run_with_cancel(
    request: &RunRequest,
    cancel: Option<&CancelToken>,
) -> Result<Vec<AlgorithmResult>, CpaError> {
    let enabled: Vec<&AlgorithmConfig> = request
        .configs
        .iter()
        .filter(|config| config.enabled)
        .collect();
    log::debug!(
        "detection run: {} enabled of {} configured algorithms over {} points",
        enabled.len(),
        request.configs.len(),
        request.series.len()
    );

    let results = enabled
        .par_iter()
        .map(|&config| {
            if let Some(token) = cancel {
                token.check()?;
            }
            run_single(config, &request.series)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "detection run finished: {} change points across {} results",
        results
            .iter()
            .map(|result| result.change_points.len())
            .sum::<usize>(),
        results.len()
    );
    Ok(results)
}

fn run_single(config: &AlgorithmConfig, series: &Series) -> Result<AlgorithmResult, CpaError> {
    let detector =
        build_detector(config).map_err(|source| CpaError::detection(config.id, source))?;

    let started_at = Instant::now();
    let change_points = detector
        .detect(series)
        .map_err(|source| CpaError::detection(config.id, source))?;
    let execution_time_ms = started_at.elapsed().as_secs_f64() * 1.0e3;

    let result = AlgorithmResult::new(config.id, series.len(), change_points, execution_time_ms)
        .map_err(|source| CpaError::detection(config.id, source))?;
    log::debug!(
        "{} found {} change points in {:.3} ms",
        config.id,
        result.change_points.len(),
        result.execution_time_ms
    );
    Ok(result)
}
