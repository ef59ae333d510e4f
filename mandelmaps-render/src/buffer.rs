use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use rayon::prelude::*;

/// Recorded block size of a cell no pass has computed yet.
pub const UNCOMPUTED: u8 = u8::MAX;

/// Largest block size a pass may use, kept below [`UNCOMPUTED`].
pub const MAX_BLOCK_SIZE: u8 = 128;

/// Shared output of a render: packed ARGB colours plus, per cell, the block
/// size at which that cell was last computed as a block representative.
///
/// Cells are atomics so the buffer can be shared with worker threads
/// without a lock. Workers never contend on a cell: each writes only the
/// rows of its own section. `Relaxed` ordering suffices because the
/// dispatch and completion handshakes already order job boundaries.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    colors: Box<[AtomicU32]>,
    block_sizes: Box<[AtomicU8]>,
}

impl PixelBuffer {
    /// Create a buffer with every colour zero and every cell uncomputed.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            colors: (0..len).map(|_| AtomicU32::new(0)).collect(),
            block_sizes: (0..len).map(|_| AtomicU8::new(UNCOMPUTED)).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn color(&self, x: u32, y: u32) -> u32 {
        self.color_at(self.index(x, y))
    }

    #[inline]
    pub fn block_size(&self, x: u32, y: u32) -> u8 {
        self.block_size_at(self.index(x, y))
    }

    #[inline]
    pub(crate) fn color_at(&self, idx: usize) -> u32 {
        self.colors[idx].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn block_size_at(&self, idx: usize) -> u8 {
        self.block_sizes[idx].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_color(&self, idx: usize, argb: u32) {
        self.colors[idx].store(argb, Ordering::Relaxed);
    }

    /// Record that the cell was computed at `block_size`. Never coarsens an
    /// existing record.
    #[inline]
    pub(crate) fn record_block_size(&self, idx: usize, block_size: u8) {
        self.block_sizes[idx].fetch_min(block_size, Ordering::Relaxed);
    }

    /// Forget every recorded block size so the next render recomputes all
    /// cells. Colours are kept on screen until overwritten.
    pub fn invalidate(&self) {
        self.block_sizes
            .par_iter()
            .for_each(|b| b.store(UNCOMPUTED, Ordering::Relaxed));
    }

    /// Reset colours to zero and every cell to uncomputed.
    pub fn clear(&self) {
        self.colors
            .par_iter()
            .for_each(|c| c.store(0, Ordering::Relaxed));
        self.invalidate();
    }

    /// Shift contents by a pixel offset, preserving the overlapping region.
    ///
    /// `dx > 0` moves content right (left edge exposed), `dy > 0` moves it
    /// down (top edge exposed). Exposed cells become black and uncomputed.
    /// Must only be called while no worker is writing.
    pub fn shift(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let colors = self.colors_snapshot();
        let sizes = self.block_sizes_snapshot();
        let w = self.width as i64;
        let h = self.height as i64;

        for y in 0..h {
            let src_y = y - dy as i64;
            for x in 0..w {
                let src_x = x - dx as i64;
                let dst = (y * w + x) as usize;
                if (0..w).contains(&src_x) && (0..h).contains(&src_y) {
                    let src = (src_y * w + src_x) as usize;
                    self.colors[dst].store(colors[src], Ordering::Relaxed);
                    self.block_sizes[dst].store(sizes[src], Ordering::Relaxed);
                } else {
                    self.colors[dst].store(0, Ordering::Relaxed);
                    self.block_sizes[dst].store(UNCOMPUTED, Ordering::Relaxed);
                }
            }
        }
    }

    /// Copy of the packed `0xAARRGGBB` colours, row-major.
    pub fn colors_snapshot(&self) -> Vec<u32> {
        self.colors
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    /// Copy of the recorded block sizes, row-major.
    pub fn block_sizes_snapshot(&self) -> Vec<u8> {
        self.block_sizes
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    /// Unpack the colours into RGBA bytes, 4 per pixel, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut pixels = vec![0u8; self.len() * 4];
        pixels
            .par_chunks_mut(4)
            .zip(self.colors.par_iter())
            .for_each(|(pixel, argb)| {
                let c = argb.load(Ordering::Relaxed);
                pixel[0] = (c >> 16) as u8;
                pixel[1] = (c >> 8) as u8;
                pixel[2] = c as u8;
                pixel[3] = (c >> 24) as u8;
            });
        pixels
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
