use crate::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/* #region JK */

/// Tuning of the contraction drivers.
#[derive(Debug, Clone)]
pub struct JKConfig {
    /// Minimal number of consecutive outer pairs handed to one rayon task.
    pub chunk_size: usize,
    /// Dedicated pool size; `None` runs on the global rayon pool.
    pub num_threads: Option<usize>,
    /// Scan inputs for NaN or infinity before contracting.
    pub check_finite: bool,
    /// Set from another thread to abandon a running contraction.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for JKConfig {
    fn default() -> Self {
        Self { chunk_size: 4, num_threads: None, check_finite: false, cancel: None }
    }
}

impl JKConfig {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
pub struct JKResults {
    pub vj: Option<Tsr>,
    pub vk: Option<Tsr>,
}

/* #endregion */
