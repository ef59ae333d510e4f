//! Render worker threads and the per-worker control block.
//!
//! A worker cycles `AwaitingJob → Computing → AwaitingJob` for the life of
//! the coordinator. The abort handshake is a stop flag the worker polls once
//! per block row, plus a condition variable the worker signals whenever it
//! parks, so [`WorkerControl::request_stop_and_wait`] can block until the
//! worker has provably stopped touching the pixel buffer.

use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::job::{JobOutcome, RenderJob};
use crate::observer::RenderObserver;
use crate::scheduler::{PassStats, ProgressiveBlockScheduler};

/// Lifecycle of a render worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned, not yet parked for the first time.
    Idle,
    /// Parked waiting for a dispatch. The only suspension point.
    AwaitingJob,
    Computing,
    /// The thread has exited, by shutdown or by panic. Terminal.
    Stopped,
}

struct Slot {
    state: WorkerState,
    job: Option<RenderJob>,
    shutdown: bool,
}

/// Control block shared by the coordinator and one worker thread.
pub(crate) struct WorkerControl {
    id: usize,
    stop_requested: AtomicBool,
    slot: Mutex<Slot>,
    /// Signalled when a job is dispatched or shutdown is requested.
    dispatched: Condvar,
    /// Signalled whenever the worker parks or stops.
    parked: Condvar,
}

impl WorkerControl {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            stop_requested: AtomicBool::new(false),
            slot: Mutex::new(Slot {
                state: WorkerState::Idle,
                job: None,
                shutdown: false,
            }),
            dispatched: Condvar::new(),
            parked: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot only holds plain flags and an owned job, so a poisoned lock is
        // still consistent.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.lock().state
    }

    pub(crate) fn is_alive(&self) -> bool {
        let slot = self.lock();
        slot.state != WorkerState::Stopped && !slot.shutdown
    }

    #[inline]
    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Clear the stop flag. Does not dispatch anything.
    pub(crate) fn resume(&self) {
        self.stop_requested.store(false, Ordering::Release);
    }

    /// Raise the stop flag without waiting.
    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Ask the worker to stop and block until it is parked or dead.
    ///
    /// A job that was dispatched but not yet picked up is withdrawn and
    /// cancelled. Returns immediately for a worker that has already exited.
    pub(crate) fn request_stop_and_wait(&self) {
        self.request_stop();
        let withdrawn = {
            let mut slot = self.lock();
            let withdrawn = slot.job.take();
            let _slot = self
                .parked
                .wait_while(slot, |s| {
                    matches!(s.state, WorkerState::Idle | WorkerState::Computing)
                })
                .unwrap_or_else(PoisonError::into_inner);
            withdrawn
        };
        // Dropping resolves the ticket, which may call the observer; keep
        // that outside the lock.
        if let Some(job) = withdrawn {
            debug!(worker = self.id, job = %job.id(), "Withdrew undelivered job");
        }
    }

    /// Hand a job to the worker. Gives the job back if the worker can no
    /// longer take it.
    pub(crate) fn dispatch(&self, job: RenderJob) -> Result<(), RenderJob> {
        let mut slot = self.lock();
        if slot.shutdown || slot.state == WorkerState::Stopped {
            return Err(job);
        }
        slot.job = Some(job);
        self.dispatched.notify_all();
        Ok(())
    }

    /// Ask the worker thread to exit once it is parked.
    pub(crate) fn shut_down(&self) {
        let withdrawn = {
            let mut slot = self.lock();
            slot.shutdown = true;
            self.dispatched.notify_all();
            slot.job.take()
        };
        drop(withdrawn);
    }

    /// Worker side: park until a job arrives. `None` means exit.
    fn next_job(&self) -> Option<RenderJob> {
        let mut slot = self.lock();
        slot.state = WorkerState::AwaitingJob;
        self.parked.notify_all();
        loop {
            if slot.shutdown {
                return None;
            }
            if let Some(job) = slot.job.take() {
                slot.state = WorkerState::Computing;
                return Some(job);
            }
            slot = self
                .dispatched
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn mark_stopped(&self) -> Option<RenderJob> {
        let mut slot = self.lock();
        slot.state = WorkerState::Stopped;
        self.parked.notify_all();
        slot.job.take()
    }
}

/// Marks the worker stopped however its thread exits, so an abort never
/// waits on a dead thread.
struct ExitGuard {
    control: Arc<WorkerControl>,
    observer: Arc<dyn RenderObserver>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        drop(self.control.mark_stopped());
        if thread::panicking() {
            warn!(worker = self.control.id(), "Render worker exited unexpectedly");
            self.observer.worker_lost(self.control.id());
        } else {
            debug!(worker = self.control.id(), "Render worker stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub(crate) struct RenderWorker {
    control: Arc<WorkerControl>,
    observer: Arc<dyn RenderObserver>,
}

impl RenderWorker {
    /// Start the thread `render-worker-{id}` serving `control`.
    pub(crate) fn spawn(
        control: Arc<WorkerControl>,
        observer: Arc<dyn RenderObserver>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("render-worker-{}", control.id()))
            .spawn(move || {
                let _guard = ExitGuard {
                    control: Arc::clone(&control),
                    observer: Arc::clone(&observer),
                };
                Self { control, observer }.serve();
            })
    }

    fn serve(&self) {
        while let Some(job) = self.control.next_job() {
            let outcome = self.run(&job);
            job.ticket.finish(outcome);
        }
    }

    /// Run every pass of `job` over its section, checking for a stop request
    /// before each block row.
    fn run(&self, job: &RenderJob) -> JobOutcome {
        let started = Instant::now();
        let scheduler = ProgressiveBlockScheduler::new(&job.passes, job.section, &job.viewport);
        let height = job.viewport.height();
        let mut total = PassStats::default();

        for &block_size in scheduler.passes() {
            let mut pending: Option<Range<u32>> = None;
            let mut rows_since_report = 0;

            for row in scheduler.block_rows(block_size) {
                if self.control.is_stop_requested() {
                    debug!(worker = self.control.id(), job = %job.id, block_size, row = row.top, "Render aborted");
                    return JobOutcome::Aborted;
                }
                let Some(buffer) = job.buffer.upgrade() else {
                    debug!(worker = self.control.id(), job = %job.id, "Pixel buffer gone; abandoning job");
                    return JobOutcome::Abandoned;
                };
                total += scheduler.render_row(row, &job.viewport, job.mapper.as_ref(), &buffer);

                if job.show_progress {
                    // Only rows this section writes; a gap starts a new report.
                    for span in job.section.owned_spans(row.rows(height)) {
                        pending = match pending.take() {
                            Some(p) if p.end == span.start => Some(p.start..span.end),
                            Some(p) => {
                                self.observer.rows_progressed(job.section, p);
                                Some(span)
                            }
                            None => Some(span),
                        };
                    }
                    rows_since_report += 1;
                    if rows_since_report >= job.progress_interval_rows {
                        if let Some(rows) = pending.take() {
                            self.observer.rows_progressed(job.section, rows);
                        }
                        rows_since_report = 0;
                    }
                }
            }
            if let Some(rows) = pending.take() {
                self.observer.rows_progressed(job.section, rows);
            }
        }

        debug!(
            worker = self.control.id(),
            job = %job.id,
            section = %job.section,
            computed = total.computed,
            skipped = total.skipped,
            borrowed = total.borrowed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Section finished"
        );
        JobOutcome::Completed
    }
}
