//! Staggered reveal of chart variants.
//!
//! All targets start hidden; target `i` fades in `i * step_ms` after the reveal starts.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealPlan {
    pub step_ms: f64,
}

impl RevealPlan {
    pub fn new(step_ms: f64) -> Self {
        Self {
            step_ms: step_ms.max(0.0),
        }
    }

    #[inline]
    pub fn delay_for(&self, index: usize) -> f64 {
        index as f64 * self.step_ms
    }
}
