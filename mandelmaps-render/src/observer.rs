use std::ops::Range;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::job::JobId;
use crate::scheduler::Section;

/// Host callbacks raised by the render workers.
///
/// Called from worker threads, so implementations must be cheap and must
/// not call back into the coordinator. Every method defaults to a no-op.
pub trait RenderObserver: Send + Sync {
    /// Rows `rows` of `section` changed since the last call. Only raised
    /// for jobs started with progress enabled.
    fn rows_progressed(&self, section: Section, rows: Range<u32>) {
        let _ = (section, rows);
    }

    /// Every worker finished job `id` without being aborted.
    fn job_complete(&self, id: JobId, elapsed: Duration) {
        let _ = (id, elapsed);
    }

    /// Worker `worker` exited unexpectedly. Rendering continues on the
    /// remaining workers.
    fn worker_lost(&self, worker: usize) {
        let _ = worker;
    }
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RenderObserver for NullObserver {}

/// Reports notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl RenderObserver for LogObserver {
    fn rows_progressed(&self, section: Section, rows: Range<u32>) {
        debug!(%section, start = rows.start, end = rows.end, "Rows progressed");
    }

    fn job_complete(&self, id: JobId, elapsed: Duration) {
        info!(job = %id, elapsed_ms = elapsed.as_millis() as u64, "Render complete");
    }

    fn worker_lost(&self, worker: usize) {
        warn!(worker, "Render worker lost; continuing with reduced capacity");
    }
}
