use serde::{Deserialize, Serialize};

use crate::buffer::MAX_BLOCK_SIZE;
use crate::error::RenderError;

/// Tunables for a [`RenderCoordinator`](crate::RenderCoordinator).
///
/// Every field has a serde default so partial JSON files load cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Number of worker threads, each owning an interleaved share of the rows.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Block sizes of the progressive passes, coarsest first.
    #[serde(default = "default_pass_block_sizes")]
    pub pass_block_sizes: Vec<u8>,
    /// Emit a progress callback after this many block rows.
    #[serde(default = "default_progress_interval_rows")]
    pub progress_interval_rows: u32,
    /// Height of the row bands dealt round-robin to the workers.
    #[serde(default = "default_band_rows")]
    pub band_rows: u32,
}

fn default_worker_count() -> usize {
    2
}
fn default_pass_block_sizes() -> Vec<u8> {
    vec![16, 8, 4, 2, 1]
}
fn default_progress_interval_rows() -> u32 {
    3
}
fn default_band_rows() -> u32 {
    16
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            pass_block_sizes: default_pass_block_sizes(),
            progress_interval_rows: default_progress_interval_rows(),
            band_rows: default_band_rows(),
        }
    }
}

impl RenderSettings {
    /// Check the settings describe a renderable configuration.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |reason: String| Err(RenderError::InvalidSettings { reason });

        if self.worker_count == 0 {
            return invalid("worker_count must be >= 1".into());
        }
        if self.band_rows == 0 {
            return invalid("band_rows must be >= 1".into());
        }
        if self.progress_interval_rows == 0 {
            return invalid("progress_interval_rows must be >= 1".into());
        }
        let passes = &self.pass_block_sizes;
        if passes.last() != Some(&1) {
            return invalid(format!("pass_block_sizes must end with 1, got {passes:?}"));
        }
        if passes.iter().any(|&b| b == 0 || b > MAX_BLOCK_SIZE) {
            return invalid(format!(
                "pass block sizes must lie in 1..={MAX_BLOCK_SIZE}, got {passes:?}"
            ));
        }
        if passes.windows(2).any(|w| w[0] <= w[1]) {
            return invalid(format!(
                "pass_block_sizes must be strictly decreasing, got {passes:?}"
            ));
        }
        Ok(())
    }
}
