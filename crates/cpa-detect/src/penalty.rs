// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpa_core::CpaError;

/// Model-selection criterion resolving to a per-change penalty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenaltyCriterion {
    Aic,
    Bic,
    /// Schwarz information criterion; identical to BIC.
    Sic,
    /// Modified BIC with an extra `ln n` per change.
    Mbic,
}

impl PenaltyCriterion {
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw {
            "aic" => Ok(Self::Aic),
            "bic" => Ok(Self::Bic),
            "sic" => Ok(Self::Sic),
            "mbic" => Ok(Self::Mbic),
            _ => Err(CpaError::invalid_parameter(
                "penalty",
                format!("'{raw}' is not one of aic, bic, sic, mbic"),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aic => "aic",
            Self::Bic => "bic",
            Self::Sic => "sic",
            Self::Mbic => "mbic",
        }
    }
}

/// Penalty value for one added change point: `2k` for AIC, `k ln n` for
/// BIC/SIC, `(k + 1) ln n` for MBIC, with `k` model dof per segment.
pub fn penalty_value(criterion: PenaltyCriterion, n: usize, dof: usize) -> Result<f64, CpaError> {
    if n < 2 {
        return Err(CpaError::invalid_input(format!(
            "penalty resolution requires n >= 2; got {n}"
        )));
    }
    if dof == 0 {
        return Err(CpaError::invalid_input("penalty dof must be >= 1; got 0"));
    }

    let k = dof as f64;
    let log_n = (n as f64).ln();
    let beta = match criterion {
        PenaltyCriterion::Aic => 2.0 * k,
        PenaltyCriterion::Bic | PenaltyCriterion::Sic => k * log_n,
        PenaltyCriterion::Mbic => (k + 1.0) * log_n,
    };
    if !beta.is_finite() || beta <= 0.0 {
        return Err(CpaError::numerical_issue(format!(
            "resolved penalty must be finite and > 0; got {beta}"
        )));
    }
    Ok(beta)
}
