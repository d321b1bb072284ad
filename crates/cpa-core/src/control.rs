// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpaError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared by reference with a running
/// orchestrator.
///
/// Cancellation is coarse-grained: it is observed between algorithm
/// invocations, not inside one.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check(&self) -> Result<(), CpaError> {
        if self.is_cancelled() {
            return Err(CpaError::Cancelled);
        }
        Ok(())
    }
}
