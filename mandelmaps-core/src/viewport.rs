use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;
use crate::fractal::{FractalFamily, FractalKernel};
use crate::iteration::{IterationBudget, IterationPolicy};

/// Immutable snapshot of everything a render job needs to know about the view.
///
/// Captured by value once per job so a worker never observes a half-updated
/// view. Pixel `(0, 0)` is the top-left corner and maps to `(x_min, y_max)`;
/// increasing pixel-y moves toward smaller imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    x_min: f64,
    y_max: f64,
    pixel_size: f64,
    width: u32,
    height: u32,
    max_iterations: u32,
    fractal: FractalKernel,
}

impl ViewportState {
    /// Create a viewport, rejecting degenerate geometry or budgets.
    pub fn new(
        x_min: f64,
        y_max: f64,
        pixel_size: f64,
        width: u32,
        height: u32,
        max_iterations: u32,
        fractal: FractalKernel,
    ) -> crate::Result<Self> {
        if !(pixel_size > 0.0 && pixel_size.is_finite()) {
            return Err(CoreError::InvalidPixelSize(pixel_size));
        }
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {width}×{height}"),
            });
        }
        if !x_min.is_finite() || !y_max.is_finite() {
            return Err(CoreError::InvalidViewport {
                reason: format!("corner must be finite, got ({x_min}, {y_max})"),
            });
        }
        if let FractalKernel::Julia { c } = fractal {
            if !c.re.is_finite() || !c.im.is_finite() {
                return Err(CoreError::InvalidViewport {
                    reason: format!("julia parameter must be finite, got {c}"),
                });
            }
        }
        Ok(Self {
            x_min,
            y_max,
            pixel_size,
            width,
            height,
            max_iterations,
            fractal,
        })
    }

    /// The family's home view: the whole set visible with a small margin,
    /// and an iteration budget from the family's default policy.
    pub fn home(fractal: FractalKernel, width: u32, height: u32) -> crate::Result<Self> {
        let (center, span_re, span_im) = match fractal.family() {
            // The Mandelbrot set fits in roughly [-2.0, 0.47] × [-1.12, 1.12].
            FractalFamily::Mandelbrot => (Complex::new(-0.75, 0.0), 3.6, 2.6),
            // Julia sets for |c| ≤ 2 fit within |z| < 2.
            FractalFamily::Julia => (Complex::ZERO, 4.2, 4.2),
        };
        let pixel_size = (span_re / width.max(1) as f64).max(span_im / height.max(1) as f64);
        let max_iterations = IterationPolicy::for_family(fractal.family()).max_iterations(pixel_size);
        Self::centered(center, pixel_size, width, height, max_iterations, fractal)
    }

    /// Build a viewport from its centre point instead of its top-left corner.
    pub fn centered(
        center: Complex,
        pixel_size: f64,
        width: u32,
        height: u32,
        max_iterations: u32,
        fractal: FractalKernel,
    ) -> crate::Result<Self> {
        let x_min = center.re - width as f64 / 2.0 * pixel_size;
        let y_max = center.im + height as f64 / 2.0 * pixel_size;
        Self::new(x_min, y_max, pixel_size, width, height, max_iterations, fractal)
    }

    #[inline]
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    #[inline]
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Plane units per pixel.
    #[inline]
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    #[inline]
    pub fn fractal(&self) -> FractalKernel {
        self.fractal
    }

    pub fn center(&self) -> Complex {
        Complex::new(
            self.x_min + self.width as f64 / 2.0 * self.pixel_size,
            self.y_max - self.height as f64 / 2.0 * self.pixel_size,
        )
    }

    /// Map an integer pixel to its plane coordinate.
    #[inline]
    pub fn pixel_to_plane(&self, px: u32, py: u32) -> Complex {
        self.point_to_plane(px as f64, py as f64)
    }

    /// Map a fractional pixel position (e.g. a touch point) to the plane.
    #[inline]
    pub fn point_to_plane(&self, px: f64, py: f64) -> Complex {
        Complex::new(
            self.x_min + px * self.pixel_size,
            self.y_max - py * self.pixel_size,
        )
    }

    /// Same view with a different iteration budget.
    pub fn with_max_iterations(&self, max_iterations: u32) -> crate::Result<Self> {
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        Ok(Self {
            max_iterations,
            ..*self
        })
    }

    /// Same view rendered with a different kernel.
    pub fn with_fractal(&self, fractal: FractalKernel) -> crate::Result<Self> {
        Self::new(
            self.x_min,
            self.y_max,
            self.pixel_size,
            self.width,
            self.height,
            self.max_iterations,
            fractal,
        )
    }

    /// Re-derive the iteration budget for the current zoom.
    pub fn with_budget<B: IterationBudget + ?Sized>(&self, budget: &B) -> crate::Result<Self> {
        self.with_max_iterations(budget.max_iterations(self.pixel_size))
    }

    /// The view after the image content was dragged by `(dx, dy)` pixels.
    ///
    /// Positive `dx` moves content right, positive `dy` moves it down, so the
    /// plane window moves the opposite way.
    pub fn panned(&self, dx: i32, dy: i32) -> Self {
        Self {
            x_min: self.x_min - dx as f64 * self.pixel_size,
            y_max: self.y_max + dy as f64 * self.pixel_size,
            ..*self
        }
    }

    /// Zoom by `factor` (> 1 zooms in) keeping the plane point under pixel
    /// `(anchor_x, anchor_y)` fixed.
    pub fn zoomed(&self, factor: f64, anchor_x: f64, anchor_y: f64) -> crate::Result<Self> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(CoreError::InvalidViewport {
                reason: format!("zoom factor must be positive and finite, got {factor}"),
            });
        }
        let pixel_size = self.pixel_size / factor;
        let limit = self.fractal.family().max_zoom_ln_pixel();
        let ln_pixel_size = pixel_size.ln();
        if ln_pixel_size < limit {
            debug!(ln_pixel_size, limit, "Zoom refused past the precision limit");
            return Err(CoreError::ZoomLimit {
                ln_pixel_size,
                limit,
            });
        }
        let anchor = self.point_to_plane(anchor_x, anchor_y);
        Self::new(
            anchor.re - anchor_x * pixel_size,
            anchor.im + anchor_y * pixel_size,
            pixel_size,
            self.width,
            self.height,
            self.max_iterations,
            self.fractal,
        )
    }

    /// Same top-left corner and zoom, new pixel dimensions.
    pub fn resized(&self, width: u32, height: u32) -> crate::Result<Self> {
        Self::new(
            self.x_min,
            self.y_max,
            self.pixel_size,
            width,
            height,
            self.max_iterations,
            self.fractal,
        )
    }
}

/// Plane coordinate under a (possibly fractional) pixel of `viewport`, for
/// seeding a Julia set from a point picked on a Mandelbrot view.
pub fn julia_parameter_for_pixel(px: f64, py: f64, viewport: &ViewportState) -> (f64, f64) {
    let c = viewport.point_to_plane(px, py);
    (c.re, c.im)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn classic() -> ViewportState {
        ViewportState::new(-2.5, 1.25, 0.00390625, 800, 600, 256, FractalKernel::Mandelbrot)
            .unwrap()
    }

    #[test]
    fn rejects_non_positive_pixel_size() {
        for ps in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let r = ViewportState::new(0.0, 0.0, ps, 10, 10, 10, FractalKernel::Mandelbrot);
            assert!(matches!(r, Err(CoreError::InvalidPixelSize(_))), "{ps}");
        }
    }

    #[test]
    fn rejects_zero_iterations() {
        let r = ViewportState::new(0.0, 0.0, 0.1, 10, 10, 0, FractalKernel::Mandelbrot);
        assert!(matches!(r, Err(CoreError::InvalidMaxIterations(0))));
        assert!(classic().with_max_iterations(0).is_err());
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(ViewportState::new(0.0, 0.0, 0.1, 0, 10, 10, FractalKernel::Mandelbrot).is_err());
        assert!(ViewportState::new(0.0, 0.0, 0.1, 10, 0, 10, FractalKernel::Mandelbrot).is_err());
    }

    #[test]
    fn rejects_non_finite_julia_parameter() {
        let r = ViewportState::new(0.0, 0.0, 0.1, 10, 10, 10, FractalKernel::julia(f64::NAN, 0.0));
        assert!(r.is_err());
    }

    #[test]
    fn pixel_to_plane_uses_top_left_corner() {
        let vp = classic();
        let tl = vp.pixel_to_plane(0, 0);
        assert!((tl.re + 2.5).abs() < EPSILON);
        assert!((tl.im - 1.25).abs() < EPSILON);
        let p = vp.pixel_to_plane(256, 128);
        assert!((p.re - (-2.5 + 1.0)).abs() < EPSILON);
        assert!((p.im - (1.25 - 0.5)).abs() < EPSILON);
    }

    #[test]
    fn julia_parameter_matches_plane_mapping() {
        let vp = classic();
        let (cx, cy) = julia_parameter_for_pixel(400.5, 300.25, &vp);
        assert!((cx - (-2.5 + 400.5 * 0.00390625)).abs() < EPSILON);
        assert!((cy - (1.25 - 300.25 * 0.00390625)).abs() < EPSILON);
    }

    #[test]
    fn centered_round_trips_center() {
        let vp = ViewportState::centered(
            Complex::new(-0.5, 0.25),
            0.01,
            200,
            100,
            64,
            FractalKernel::Mandelbrot,
        )
        .unwrap();
        let c = vp.center();
        assert!((c.re + 0.5).abs() < EPSILON);
        assert!((c.im - 0.25).abs() < EPSILON);
    }

    #[test]
    fn home_views_cover_the_sets() {
        let m = ViewportState::home(FractalKernel::Mandelbrot, 800, 600).unwrap();
        assert!(m.width() as f64 * m.pixel_size() >= 3.5);
        assert!(m.height() as f64 * m.pixel_size() >= 2.5);
        assert!(m.max_iterations() >= IterationPolicy::MIN_ITERATIONS);

        let j = ViewportState::home(FractalKernel::julia(-0.8, 0.156), 640, 480).unwrap();
        assert!(j.width() as f64 * j.pixel_size() >= 4.0);
        assert!(j.height() as f64 * j.pixel_size() >= 4.0);
        assert!(j.center().re.abs() < EPSILON);
    }

    #[test]
    fn panning_moves_window_against_drag() {
        let vp = classic();
        let p = vp.panned(10, -4);
        // Content dragged right by 10 px: what was at pixel 0 is now at pixel 10.
        let before = vp.pixel_to_plane(0, 4);
        let after = p.pixel_to_plane(10, 0);
        assert!((before.re - after.re).abs() < EPSILON);
        assert!((before.im - after.im).abs() < EPSILON);
        assert_eq!(p.pixel_size(), vp.pixel_size());
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let vp = classic();
        let z = vp.zoomed(4.0, 200.0, 150.0).unwrap();
        let a = vp.point_to_plane(200.0, 150.0);
        let b = z.point_to_plane(200.0, 150.0);
        assert!((a.re - b.re).abs() < EPSILON);
        assert!((a.im - b.im).abs() < EPSILON);
        assert!((z.pixel_size() - vp.pixel_size() / 4.0).abs() < 1e-15);
    }

    #[test]
    fn zoom_limit_is_enforced_per_family() {
        let julia = classic().with_fractal(FractalKernel::julia(0.0, 0.7)).unwrap();
        // ln(0.0039 / 1e7) ≈ -21.7, past the Julia limit but not the Mandelbrot one.
        assert!(matches!(
            julia.zoomed(1e7, 0.0, 0.0),
            Err(CoreError::ZoomLimit { .. })
        ));
        assert!(classic().zoomed(1e7, 0.0, 0.0).is_ok());
    }

    #[test]
    fn snapshots_are_values() {
        let vp = classic();
        let copy = vp;
        let changed = vp.with_max_iterations(1000).unwrap();
        assert_eq!(copy, vp);
        assert_ne!(changed, vp);
    }
}
