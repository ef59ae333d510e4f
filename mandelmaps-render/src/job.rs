use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use mandelmaps_core::ViewportState;

use crate::buffer::PixelBuffer;
use crate::color::ColorMapper;
use crate::observer::RenderObserver;
use crate::scheduler::Section;

/// Identifies one `start()` call across all of its per-worker jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a render stands, as seen through a [`JobHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    /// Every section ran to the end; carries the wall time since `start()`.
    Completed(Duration),
    /// At least one section was aborted, abandoned or never ran.
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// How a single worker's share of a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Stop was requested at a row checkpoint.
    Aborted,
    /// The target buffer was dropped or replaced mid-render.
    Abandoned,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

struct TrackerState {
    remaining: usize,
    cancelled: bool,
    status: JobStatus,
}

/// Shared between a job's tickets and its handle; aggregates per-worker
/// outcomes into one [`JobStatus`].
pub(crate) struct JobTracker {
    id: JobId,
    started: Instant,
    state: Mutex<TrackerState>,
    finished: Condvar,
    observer: Arc<dyn RenderObserver>,
}

impl JobTracker {
    /// Create a tracker expecting `sections` tickets, plus the handle for it.
    pub(crate) fn new(
        id: JobId,
        sections: usize,
        observer: Arc<dyn RenderObserver>,
    ) -> (Arc<Self>, JobHandle) {
        let tracker = Arc::new(Self {
            id,
            started: Instant::now(),
            state: Mutex::new(TrackerState {
                remaining: sections,
                cancelled: false,
                status: JobStatus::Running,
            }),
            finished: Condvar::new(),
            observer,
        });
        let handle = JobHandle {
            tracker: Arc::clone(&tracker),
        };
        (tracker, handle)
    }

    pub(crate) fn ticket(self: &Arc<Self>) -> JobTicket {
        JobTicket {
            tracker: Arc::clone(self),
            reported: false,
        }
    }

    fn report(&self, completed: bool) {
        let finished_ok = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.status.is_finished() {
                return;
            }
            state.remaining = state.remaining.saturating_sub(1);
            state.cancelled |= !completed;
            if state.remaining > 0 {
                return;
            }
            let elapsed = self.started.elapsed();
            state.status = if state.cancelled {
                JobStatus::Cancelled
            } else {
                JobStatus::Completed(elapsed)
            };
            self.finished.notify_all();
            match state.status {
                JobStatus::Completed(elapsed) => Some(elapsed),
                _ => None,
            }
        };
        if let Some(elapsed) = finished_ok {
            self.observer.job_complete(self.id, elapsed);
        }
    }
}

/// One worker's obligation to report on a job.
///
/// Dropping a ticket without calling [`finish`](Self::finish) counts as a
/// cancellation, so jobs that die with their worker, or are never
/// delivered, still resolve their handle.
pub(crate) struct JobTicket {
    tracker: Arc<JobTracker>,
    reported: bool,
}

impl JobTicket {
    pub(crate) fn finish(mut self, outcome: JobOutcome) {
        self.reported = true;
        self.tracker.report(outcome == JobOutcome::Completed);
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        if !self.reported {
            self.tracker.report(false);
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Caller-side view of a started render.
#[derive(Clone)]
pub struct JobHandle {
    tracker: Arc<JobTracker>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.tracker.id
    }

    pub fn status(&self) -> JobStatus {
        self.tracker
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Block until every section has completed or been cancelled.
    pub fn wait(&self) -> JobStatus {
        let state = self.tracker.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self
            .tracker
            .finished
            .wait_while(state, |s| !s.status.is_finished())
            .unwrap_or_else(PoisonError::into_inner);
        state.status
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout` and returns
    /// the status at that moment, possibly [`JobStatus::Running`].
    pub fn wait_timeout(&self, timeout: Duration) -> JobStatus {
        let state = self.tracker.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .tracker
            .finished
            .wait_timeout_while(state, timeout, |s| !s.status.is_finished())
            .unwrap_or_else(PoisonError::into_inner);
        state.status
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One worker's share of a render: an owned viewport snapshot plus the rows
/// it may write.
pub struct RenderJob {
    pub(crate) id: JobId,
    pub(crate) viewport: ViewportState,
    pub(crate) section: Section,
    pub(crate) passes: Vec<u8>,
    pub(crate) show_progress: bool,
    pub(crate) progress_interval_rows: u32,
    /// Upgraded once per row; failure means the host replaced the buffer.
    pub(crate) buffer: Weak<PixelBuffer>,
    pub(crate) mapper: Arc<dyn ColorMapper>,
    pub(crate) ticket: JobTicket,
}

impl RenderJob {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// When the `start()` call that produced this job was made.
    pub fn started(&self) -> Instant {
        self.ticket.tracker.started
    }
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("id", &self.id)
            .field("section", &self.section)
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}
