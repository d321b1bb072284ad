// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::params::{ParamDef, ParamSpec, ParamValue, ParameterSchema, ResolvedParams};
use crate::CpaError;
use std::collections::BTreeMap;
use std::fmt;

/// Closed catalogue of the registered detection algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum AlgorithmId {
    Cusum,
    Pelt,
    BinarySegmentation,
    KernelChangeDetection,
}

impl AlgorithmId {
    pub const ALL: [AlgorithmId; 4] = [
        AlgorithmId::Cusum,
        AlgorithmId::Pelt,
        AlgorithmId::BinarySegmentation,
        AlgorithmId::KernelChangeDetection,
    ];

    /// Registered name, as it appears in exports and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cusum => "CUSUM",
            Self::Pelt => "PELT",
            Self::BinarySegmentation => "BinarySegmentation",
            Self::KernelChangeDetection => "KernelChangeDetection",
        }
    }

    /// Case-insensitive parse, accepting the short aliases `binseg` and
    /// `kernel`.
    pub fn parse(raw: &str) -> Result<Self, CpaError> {
        match raw.to_ascii_lowercase().as_str() {
            "cusum" => Ok(Self::Cusum),
            "pelt" => Ok(Self::Pelt),
            "binarysegmentation" | "binseg" => Ok(Self::BinarySegmentation),
            "kernelchangedetection" | "kernel" => Ok(Self::KernelChangeDetection),
            _ => Err(CpaError::invalid_input(format!(
                "unknown algorithm '{raw}'; expected one of: CUSUM, PELT, BinarySegmentation, KernelChangeDetection"
            ))),
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static CUSUM_SCHEMA: ParameterSchema = ParameterSchema {
    params: &[
        ParamDef {
            name: "threshold",
            spec: ParamSpec::Numeric {
                min: 1.0,
                max: 20.0,
                step: 0.5,
                default: 5.0,
            },
        },
        ParamDef {
            name: "drift",
            spec: ParamSpec::Numeric {
                min: 0.0,
                max: 5.0,
                step: 0.1,
                default: 1.0,
            },
        },
        ParamDef {
            name: "direction",
            spec: ParamSpec::Choice {
                options: &["both", "positive", "negative"],
                default: "both",
            },
        },
    ],
};

static PELT_SCHEMA: ParameterSchema = ParameterSchema {
    params: &[
        ParamDef {
            name: "penalty",
            spec: ParamSpec::Choice {
                options: &["bic", "aic", "mbic"],
                default: "bic",
            },
        },
        ParamDef {
            name: "min_size",
            spec: ParamSpec::Numeric {
                min: 2.0,
                max: 50.0,
                step: 1.0,
                default: 5.0,
            },
        },
        ParamDef {
            name: "jump_penalty",
            spec: ParamSpec::Numeric {
                min: 0.0,
                max: 10.0,
                step: 0.5,
                default: 0.0,
            },
        },
    ],
};

static BINSEG_SCHEMA: ParameterSchema = ParameterSchema {
    params: &[
        ParamDef {
            name: "penalty",
            spec: ParamSpec::Choice {
                options: &["bic", "aic", "sic"],
                default: "bic",
            },
        },
        ParamDef {
            name: "min_segment_length",
            spec: ParamSpec::Numeric {
                min: 2.0,
                max: 50.0,
                step: 1.0,
                default: 5.0,
            },
        },
        ParamDef {
            name: "max_change_points",
            spec: ParamSpec::Numeric {
                min: 1.0,
                max: 50.0,
                step: 1.0,
                default: 10.0,
            },
        },
    ],
};

static KERNEL_SCHEMA: ParameterSchema = ParameterSchema {
    params: &[
        ParamDef {
            name: "kernel_size",
            spec: ParamSpec::Numeric {
                min: 8.0,
                max: 200.0,
                step: 2.0,
                default: 24.0,
            },
        },
        ParamDef {
            name: "method",
            spec: ParamSpec::Choice {
                options: &["gaussian", "linear", "polynomial"],
                default: "gaussian",
            },
        },
        ParamDef {
            name: "threshold",
            spec: ParamSpec::Numeric {
                min: 0.5,
                max: 10.0,
                step: 0.1,
                default: 2.0,
            },
        },
    ],
};

/// Returns the static parameter schema of one algorithm.
pub fn schema(id: AlgorithmId) -> &'static ParameterSchema {
    match id {
        AlgorithmId::Cusum => &CUSUM_SCHEMA,
        AlgorithmId::Pelt => &PELT_SCHEMA,
        AlgorithmId::BinarySegmentation => &BINSEG_SCHEMA,
        AlgorithmId::KernelChangeDetection => &KERNEL_SCHEMA,
    }
}

/// Lists the registered algorithm identifiers.
pub fn list_algorithms() -> [AlgorithmId; 4] {
    AlgorithmId::ALL
}

/// Validated configuration of one algorithm for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct AlgorithmConfig {
    pub id: AlgorithmId,
    pub enabled: bool,
    params: ResolvedParams,
}

impl AlgorithmConfig {
    /// Builds an enabled config from schema defaults only.
    pub fn with_defaults(id: AlgorithmId) -> Self {
        Self {
            id,
            enabled: true,
            params: schema(id).defaults(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }
}

/// Validates supplied parameters for `id` and returns the ready-to-run
/// config. Unspecified parameters are filled with schema defaults.
pub fn validate(
    id: AlgorithmId,
    supplied: &BTreeMap<String, ParamValue>,
) -> Result<AlgorithmConfig, CpaError> {
    let params = schema(id).validate(supplied)?;
    Ok(AlgorithmConfig {
        id,
        enabled: true,
        params,
    })
}
