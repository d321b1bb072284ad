// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::registry::AlgorithmId;
use thiserror::Error;

/// Unified error type for the analysis engine.
///
/// Ingestion and validation errors are fail-fast and block a run before the
/// orchestrator starts; `Detection` aborts an in-flight run. Partial result
/// sets are never returned silently.
#[derive(Debug, Error)]
pub enum CpaError {
    /// Ingestion produced zero valid points.
    #[error("ingestion produced no valid data points")]
    EmptyInput,

    /// A supplied parameter is unknown or violates its schema.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// Malformed input outside the parameter-validation path.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A computation produced a non-finite or otherwise unusable value.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),

    /// An algorithm failed during `detect`; aborts the whole run.
    #[error("algorithm {algorithm} failed: {source}")]
    Detection {
        algorithm: AlgorithmId,
        #[source]
        source: Box<CpaError>,
    },

    /// The run was cancelled between algorithm invocations.
    #[error("cancelled")]
    Cancelled,

    /// Serialization failed while producing an export document.
    #[error("export failed: {0}")]
    Export(String),
}

impl CpaError {
    pub fn invalid_parameter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn detection(algorithm: AlgorithmId, source: CpaError) -> Self {
        Self::Detection {
            algorithm,
            source: Box::new(source),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Stable machine-readable code, used by the CLI error surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::Detection { .. } => "detection_failed",
            Self::Cancelled => "cancelled",
            Self::Export(_) => "export_failed",
        }
    }
}
