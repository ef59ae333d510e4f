//! Coarse-to-fine block scheduling.
//!
//! Each pass walks the image on a grid of `block_size` squares, computes one
//! representative pixel (the top-left corner) per square and fills the whole
//! square with its colour. A representative whose recorded block size is
//! already at most the pass's size is skipped, which is what makes a second
//! render of an unchanged (or merely panned) view cheap.
//!
//! Rows are shared out between workers as interleaved bands. A worker
//! computes only representatives on rows it owns and writes only rows it
//! owns, so concurrent workers never touch the same cell.

use std::fmt;
use std::ops::Range;

use mandelmaps_core::ViewportState;

use crate::buffer::{PixelBuffer, MAX_BLOCK_SIZE};
use crate::color::ColorMapper;

/// Iteration budgets above this coarsen the block grid.
pub const COARSENING_THRESHOLD: u32 = 10_000;

/// Each multiple of this many iterations widens a coarsened block by its
/// nominal size.
const ITERATIONS_PER_BLOCK_STEP: u32 = 5_000;

/// Coarsened blocks never exceed `width / MAX_BLOCKS_DIVISOR`.
const MAX_BLOCKS_DIVISOR: u32 = 17;

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// The rows of the image one worker is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Every row; the single-worker case.
    All,
    /// Worker `worker` of `workers` owns row `y` iff
    /// `(y / band_rows) % workers == worker`.
    Interleaved {
        worker: u32,
        workers: u32,
        band_rows: u32,
    },
}

impl Section {
    /// Section of worker `worker` when `workers` share the image.
    pub fn for_worker(worker: u32, workers: u32, band_rows: u32) -> Self {
        if workers <= 1 {
            Self::All
        } else {
            Self::Interleaved {
                worker,
                workers,
                band_rows: band_rows.max(1),
            }
        }
    }

    /// First half of a two-worker split.
    pub fn upper(band_rows: u32) -> Self {
        Self::for_worker(0, 2, band_rows)
    }

    /// Second half of a two-worker split.
    pub fn lower(band_rows: u32) -> Self {
        Self::for_worker(1, 2, band_rows)
    }

    #[inline]
    pub fn owns_row(&self, y: u32) -> bool {
        match *self {
            Self::All => true,
            Self::Interleaved {
                worker,
                workers,
                band_rows,
            } => (y / band_rows) % workers == worker,
        }
    }

    /// Maximal runs of `rows` that belong to this section, in order.
    pub fn owned_spans(self, rows: Range<u32>) -> impl Iterator<Item = Range<u32>> {
        let band_rows = match self {
            Self::All => u32::MAX,
            Self::Interleaved { band_rows, .. } => band_rows,
        };
        let next_band = move |y: u32| (y / band_rows).saturating_add(1).saturating_mul(band_rows);
        let mut y = rows.start;
        std::iter::from_fn(move || {
            while y < rows.end {
                let start = y;
                while y < rows.end && self.owns_row(y) {
                    y = next_band(y).min(rows.end);
                }
                if y > start {
                    return Some(start..y);
                }
                y = next_band(y).min(rows.end);
            }
            None
        })
    }

    /// Does any row of `rows` belong to this section?
    pub fn owns_any(&self, rows: Range<u32>) -> bool {
        match *self {
            Self::All => !rows.is_empty(),
            Self::Interleaved { band_rows, .. } => {
                // Checking the first row of each band the range touches is enough.
                let mut y = rows.start;
                while y < rows.end {
                    if self.owns_row(y) {
                        return true;
                    }
                    y = (y / band_rows + 1) * band_rows;
                }
                false
            }
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Interleaved {
                worker, workers, ..
            } => write!(f, "{}/{}", worker + 1, workers),
        }
    }
}

// ---------------------------------------------------------------------------
// Block sizes
// ---------------------------------------------------------------------------

/// The block size a pass actually uses.
///
/// Expensive budgets (`max_iterations > 10 000`) scale every pass except the
/// final single-pixel one by `max_iterations / 5000`, capped at `width / 17`
/// and at [`MAX_BLOCK_SIZE`], and never below the nominal size.
pub fn effective_block_size(block_size: u8, max_iterations: u32, width: u32) -> u8 {
    if block_size <= 1 || max_iterations <= COARSENING_THRESHOLD {
        return block_size;
    }
    let nominal = u32::from(block_size);
    let scaled = nominal.saturating_mul(max_iterations / ITERATIONS_PER_BLOCK_STEP);
    let eff = scaled
        .min(width / MAX_BLOCKS_DIVISOR)
        .max(nominal)
        .min(u32::from(MAX_BLOCK_SIZE));
    eff as u8
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// One row of blocks: representatives sit on row `top`, fills cover
/// `top..top + block_size` (clipped to the image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRow {
    pub top: u32,
    pub block_size: u8,
}

impl BlockRow {
    /// Image rows this block row fills.
    pub fn rows(&self, height: u32) -> Range<u32> {
        self.top..(self.top + u32::from(self.block_size)).min(height)
    }
}

/// Counters for one block row or a whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Representatives run through the kernel and recorded.
    pub computed: u64,
    /// Representatives skipped because they were already fine enough.
    pub skipped: u64,
    /// Representatives owned by another worker, coloured but not recorded.
    pub borrowed: u64,
}

impl std::ops::AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.computed += rhs.computed;
        self.skipped += rhs.skipped;
        self.borrowed += rhs.borrowed;
    }
}

/// Plans and executes the progressive passes of one worker's section.
#[derive(Debug, Clone)]
pub struct ProgressiveBlockScheduler {
    passes: Vec<u8>,
    section: Section,
    width: u32,
    height: u32,
}

impl ProgressiveBlockScheduler {
    /// Build a schedule for `viewport`, coarsening the nominal pass sizes
    /// for expensive budgets. Passes that coarsen to the same size as their
    /// predecessor are dropped.
    pub fn new(nominal_passes: &[u8], section: Section, viewport: &ViewportState) -> Self {
        let mut passes: Vec<u8> = nominal_passes
            .iter()
            .map(|&b| effective_block_size(b, viewport.max_iterations(), viewport.width()))
            .collect();
        passes.dedup();
        Self {
            passes,
            section,
            width: viewport.width(),
            height: viewport.height(),
        }
    }

    /// Effective block size of every pass, coarsest first.
    pub fn passes(&self) -> &[u8] {
        &self.passes
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Block rows of a pass this section has work in, top to bottom.
    pub fn block_rows(&self, block_size: u8) -> impl Iterator<Item = BlockRow> + '_ {
        let step = usize::from(block_size.max(1));
        (0..self.height)
            .step_by(step)
            .map(move |top| BlockRow { top, block_size })
            .filter(move |row| self.section.owns_any(row.rows(self.height)))
    }

    /// Compute and write one block row.
    ///
    /// Representatives on an owned row are skipped when their recorded block
    /// size is at most `row.block_size`; otherwise they are computed,
    /// recorded and filled. When the representative row belongs to another
    /// worker the colour is still computed, unless every owned cell of the
    /// block is already at most `row.block_size`, but only this section's
    /// rows are filled and nothing is recorded. Fills never overwrite a cell already
    /// computed at a finer size.
    pub fn render_row(
        &self,
        row: BlockRow,
        viewport: &ViewportState,
        mapper: &dyn ColorMapper,
        buffer: &PixelBuffer,
    ) -> PassStats {
        let bs = u32::from(row.block_size);
        let rows = row.rows(self.height);
        let owns_top = self.section.owns_row(row.top);
        let kernel = viewport.fractal();
        let max_iterations = viewport.max_iterations();
        let mut stats = PassStats::default();

        for x in (0..self.width).step_by(bs as usize) {
            let rep = buffer.index(x, row.top);
            if owns_top {
                if buffer.block_size_at(rep) <= row.block_size {
                    stats.skipped += 1;
                    continue;
                }
                stats.computed += 1;
            } else {
                let cols = x..(x + bs).min(self.width);
                if !self.needs_fill(buffer, rows.clone(), cols, row.block_size) {
                    stats.skipped += 1;
                    continue;
                }
                stats.borrowed += 1;
            }

            let result = kernel.iterate_pixel(x, row.top, viewport);
            let argb = mapper.color(result.iterations, max_iterations);

            let right = (x + bs).min(self.width);
            for y in rows.clone() {
                if !self.section.owns_row(y) {
                    continue;
                }
                for xx in x..right {
                    let idx = buffer.index(xx, y);
                    if idx == rep || buffer.block_size_at(idx) > row.block_size {
                        buffer.set_color(idx, argb);
                    }
                }
            }
            if owns_top {
                buffer.record_block_size(rep, row.block_size);
            }
        }
        stats
    }

    /// Is any owned cell of the block `rows × cols` still coarser than `block_size`?
    fn needs_fill(
        &self,
        buffer: &PixelBuffer,
        rows: Range<u32>,
        cols: Range<u32>,
        block_size: u8,
    ) -> bool {
        rows.filter(|&y| self.section.owns_row(y)).any(|y| {
            cols.clone()
                .any(|x| buffer.block_size_at(buffer.index(x, y)) > block_size)
        })
    }
}
