use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use mandelmaps_core::{FractalFamily, ViewportState};

use crate::buffer::PixelBuffer;
use crate::color::{default_mapper, ColorMapper};
use crate::error::RenderError;
use crate::job::{JobHandle, JobId, JobTracker, RenderJob};
use crate::observer::RenderObserver;
use crate::scheduler::Section;
use crate::settings::RenderSettings;
use crate::worker::{RenderWorker, WorkerControl, WorkerState};

struct WorkerSlot {
    control: Arc<WorkerControl>,
    thread: Option<JoinHandle<()>>,
}

/// Owns the render workers and the pixel buffer they share.
///
/// All control goes through `&mut self`, so only one caller drives the
/// start/abort handshake at a time. Dropping the coordinator aborts any
/// render and joins the workers.
pub struct RenderCoordinator {
    settings: RenderSettings,
    workers: Vec<WorkerSlot>,
    buffer: Arc<PixelBuffer>,
    mapper: Option<Arc<dyn ColorMapper>>,
    observer: Arc<dyn RenderObserver>,
    next_job: u64,
    /// Viewport whose results the buffer currently holds.
    last_viewport: Option<ViewportState>,
    current: Option<JobHandle>,
}

impl RenderCoordinator {
    /// Allocate a `width × height` buffer and spawn `settings.worker_count`
    /// parked workers.
    pub fn new(
        width: u32,
        height: u32,
        settings: RenderSettings,
        observer: Arc<dyn RenderObserver>,
    ) -> crate::Result<Self> {
        settings.validate()?;
        check_dimensions(width, height)?;

        let mut coordinator = Self {
            workers: Vec::with_capacity(settings.worker_count),
            buffer: Arc::new(PixelBuffer::new(width, height)),
            settings,
            mapper: None,
            observer,
            next_job: 1,
            last_viewport: None,
            current: None,
        };
        for id in 0..coordinator.settings.worker_count {
            let control = Arc::new(WorkerControl::new(id));
            // On error `coordinator` drops here and joins the workers already spawned.
            let thread = RenderWorker::spawn(Arc::clone(&control), Arc::clone(&coordinator.observer))
                .map_err(RenderError::WorkerSpawn)?;
            coordinator.workers.push(WorkerSlot {
                control,
                thread: Some(thread),
            });
        }
        info!(
            workers = coordinator.workers.len(),
            width, height, "Render coordinator ready"
        );
        Ok(coordinator)
    }

    /// Render `viewport` into the buffer, replacing any render in flight.
    ///
    /// Returns once the work is dispatched. Recorded block sizes are kept
    /// when `viewport` equals the previous one, so restarting an aborted
    /// render skips whatever was already refined.
    pub fn start(&mut self, viewport: ViewportState, show_progress: bool) -> crate::Result<JobHandle> {
        if viewport.width() != self.buffer.width() || viewport.height() != self.buffer.height() {
            return Err(RenderError::DimensionMismatch {
                width: self.buffer.width(),
                height: self.buffer.height(),
                actual_width: viewport.width(),
                actual_height: viewport.height(),
            });
        }

        self.abort();
        if self.last_viewport != Some(viewport) {
            self.buffer.invalidate();
            self.last_viewport = Some(viewport);
        }
        self.resume();

        let live: Vec<&WorkerSlot> = self.workers.iter().filter(|w| w.control.is_alive()).collect();
        if live.is_empty() {
            return Err(RenderError::NoLiveWorkers);
        }

        let id = JobId(self.next_job);
        self.next_job += 1;
        let sections = live.len() as u32;
        let (tracker, handle) = JobTracker::new(id, live.len(), Arc::clone(&self.observer));
        let mapper = self.mapper_for(viewport.fractal().family());

        debug!(
            job = %id,
            workers = sections,
            family = %viewport.fractal().family(),
            max_iterations = viewport.max_iterations(),
            pixel_size = viewport.pixel_size(),
            "Render started"
        );

        for (k, worker) in live.iter().enumerate() {
            let job = RenderJob {
                id,
                viewport,
                section: Section::for_worker(k as u32, sections, self.settings.band_rows),
                passes: self.settings.pass_block_sizes.clone(),
                show_progress,
                progress_interval_rows: self.settings.progress_interval_rows,
                buffer: Arc::downgrade(&self.buffer),
                mapper: Arc::clone(&mapper),
                ticket: tracker.ticket(),
            };
            if let Err(job) = worker.control.dispatch(job) {
                // Died since the liveness check; the job cancels on drop.
                warn!(worker = worker.control.id(), job = %job.id(), "Worker refused job");
            }
        }

        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Stop every worker and block until each has parked or exited.
    ///
    /// Afterwards no worker touches the buffer until the next `start()`.
    /// Leaves the stop flags raised; see [`resume`](Self::resume).
    pub fn abort(&mut self) {
        for worker in &self.workers {
            worker.control.request_stop();
        }
        for worker in &self.workers {
            worker.control.request_stop_and_wait();
        }
    }

    /// Clear the stop flags. Dispatches nothing.
    pub fn resume(&mut self) {
        for worker in &self.workers {
            worker.control.resume();
        }
    }

    /// Whether a stop has been requested and not yet cleared.
    pub fn is_aborting(&self) -> bool {
        self.workers.iter().any(|w| w.control.is_stop_requested())
    }

    /// Re-render after the content was dragged by `(dx, dy)` pixels.
    ///
    /// The overlapping part of the previous image, with its recorded block
    /// sizes, moves along with the drag so only the exposed strips and any
    /// unfinished cells are computed.
    pub fn pan(&mut self, dx: i32, dy: i32, show_progress: bool) -> crate::Result<JobHandle> {
        let last = self.last_viewport.ok_or(RenderError::NothingRendered)?;
        self.abort();
        let panned = last.panned(dx, dy);
        self.buffer.shift(dx, dy);
        self.last_viewport = Some(panned);
        debug!(dx, dy, "Buffer shifted for drag");
        self.start(panned, show_progress)
    }

    /// Replace the buffer with a fresh `width × height` one.
    ///
    /// Jobs still holding the old buffer find it gone and abandon.
    pub fn resize(&mut self, width: u32, height: u32) -> crate::Result<()> {
        check_dimensions(width, height)?;
        self.abort();
        self.buffer = Arc::new(PixelBuffer::new(width, height));
        self.last_viewport = None;
        self.current = None;
        debug!(width, height, "Pixel buffer resized");
        Ok(())
    }

    /// Override the colour scheme for both families, or `None` to go back
    /// to each family's default. Takes effect on the next `start()`, which
    /// then recomputes every cell.
    pub fn set_color_mapper(&mut self, mapper: Option<Arc<dyn ColorMapper>>) {
        self.mapper = mapper;
        self.last_viewport = None;
    }

    /// The scheme a render of `family` would use.
    pub fn mapper_for(&self, family: FractalFamily) -> Arc<dyn ColorMapper> {
        match &self.mapper {
            Some(mapper) => Arc::clone(mapper),
            None => default_mapper(family),
        }
    }

    pub fn buffer(&self) -> &Arc<PixelBuffer> {
        &self.buffer
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Viewport the buffer holds results for, if any.
    pub fn last_viewport(&self) -> Option<&ViewportState> {
        self.last_viewport.as_ref()
    }

    /// Handle of the most recent `start()`.
    pub fn current_job(&self) -> Option<&JobHandle> {
        self.current.as_ref()
    }

    /// Workers still able to take jobs.
    pub fn live_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.control.is_alive()).count()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(|w| w.control.state()).collect()
    }

    /// Abort, then stop and join every worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.abort();
        for worker in &self.workers {
            worker.control.shut_down();
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    debug!(worker = worker.control.id(), "Worker had panicked");
                }
            }
        }
    }
}

impl Drop for RenderCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn check_dimensions(width: u32, height: u32) -> crate::Result<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSettings {
            reason: format!("buffer dimensions must be > 0, got {width}×{height}"),
        });
    }
    Ok(())
}
