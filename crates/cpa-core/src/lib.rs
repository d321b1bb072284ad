// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core types and contracts for the cpa change-point analysis engine:
//! the immutable series model and delimited-text ingestion, per-algorithm
//! parameter schemas with validation, the closed algorithm registry,
//! change-point result types with construction-time invariants, and the
//! shared error taxonomy.

pub mod control;
pub mod error;
pub mod params;
pub mod registry;
pub mod result;
pub mod series;

pub use control::CancelToken;
pub use error::CpaError;
pub use params::{ParamDef, ParamSpec, ParamValue, ParameterSchema, ResolvedParams};
pub use registry::{list_algorithms, schema, validate, AlgorithmConfig, AlgorithmId};
pub use result::{AlgorithmResult, ChangeKind, ChangePoint};
pub use series::{Point, Series};
