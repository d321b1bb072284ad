// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Run orchestration for the cpa change-point analysis engine: parallel
//! fan-out over the enabled algorithms with per-algorithm timing and an
//! all-or-nothing error policy, the filtered comparison view, and the
//! CSV/JSON/TXT exporters.

pub mod aggregate;
pub mod export;
pub mod orchestrator;

pub use aggregate::{filter_results, FilterMode, SourcedChangePoint};
pub use export::{export, export_file_name, ExportFormat};
pub use orchestrator::{run, run_with_cancel, RunRequest};
