use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::viewport::ViewportState;
use crate::{julia, mandelbrot};

/// Orbits whose squared modulus exceeds this are known to diverge (`|z| > 2`).
pub const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Outcome of iterating a single point.
///
/// `iterations` is the zero-based step at which the orbit left the escape
/// radius, or `max_iterations` when it never did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeTime {
    pub iterations: u32,
    pub escaped: bool,
}

impl EscapeTime {
    #[inline]
    pub fn escaped_at(iterations: u32) -> Self {
        Self {
            iterations,
            escaped: true,
        }
    }

    #[inline]
    pub fn interior(max_iterations: u32) -> Self {
        Self {
            iterations: max_iterations,
            escaped: false,
        }
    }
}

/// The two escape-time fractal families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalFamily {
    Mandelbrot,
    Julia,
}

impl FractalFamily {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::Julia => "Julia",
        }
    }

    /// Deepest `ln(pixel_size)` at which `f64` coordinates still resolve
    /// neighbouring pixels for this family.
    pub fn max_zoom_ln_pixel(self) -> f64 {
        match self {
            Self::Mandelbrot => -31.0,
            Self::Julia => -20.0,
        }
    }
}

impl std::fmt::Display for FractalFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-pixel escape-time kernel, selected when a job is built.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalKernel {
    /// `z₀ = 0`, `c` is the pixel's plane coordinate.
    #[default]
    Mandelbrot,
    /// `z₀` is the pixel's plane coordinate, `c` is fixed.
    Julia { c: Complex },
}

impl FractalKernel {
    pub fn julia(cx: f64, cy: f64) -> Self {
        Self::Julia {
            c: Complex::new(cx, cy),
        }
    }

    pub fn family(&self) -> FractalFamily {
        match self {
            Self::Mandelbrot => FractalFamily::Mandelbrot,
            Self::Julia { .. } => FractalFamily::Julia,
        }
    }

    /// The Julia constant, if this is a Julia kernel.
    pub fn julia_c(&self) -> Option<Complex> {
        match self {
            Self::Mandelbrot => None,
            Self::Julia { c } => Some(*c),
        }
    }

    /// Iterate the plane point `point` for at most `max_iterations` steps.
    #[inline]
    pub fn escape_time(&self, point: Complex, max_iterations: u32) -> EscapeTime {
        match self {
            Self::Mandelbrot => mandelbrot::escape_time(point, max_iterations),
            Self::Julia { c } => julia::escape_time(point, *c, max_iterations),
        }
    }

    /// Iterate pixel `(px, py)` of `viewport`.
    #[inline]
    pub fn iterate_pixel(&self, px: u32, py: u32, viewport: &ViewportState) -> EscapeTime {
        self.escape_time(
            viewport.pixel_to_plane(px, py),
            viewport.max_iterations(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kernel_is_mandelbrot() {
        assert_eq!(FractalKernel::default(), FractalKernel::Mandelbrot);
    }

    #[test]
    fn family_of_kernel() {
        assert_eq!(FractalKernel::Mandelbrot.family(), FractalFamily::Mandelbrot);
        assert_eq!(FractalKernel::julia(-0.4, 0.6).family(), FractalFamily::Julia);
    }

    #[test]
    fn julia_c_only_for_julia() {
        assert_eq!(FractalKernel::Mandelbrot.julia_c(), None);
        assert_eq!(
            FractalKernel::julia(0.25, -0.5).julia_c(),
            Some(Complex::new(0.25, -0.5))
        );
    }

    #[test]
    fn julia_zoom_limit_is_shallower() {
        assert!(
            FractalFamily::Julia.max_zoom_ln_pixel() > FractalFamily::Mandelbrot.max_zoom_ln_pixel()
        );
    }

    #[test]
    fn kernel_serde_shape() {
        let json = serde_json::to_string(&FractalKernel::julia(0.5, 0.25)).unwrap();
        assert_eq!(json, r#"{"julia":{"c":{"re":0.5,"im":0.25}}}"#);
        let back: FractalKernel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FractalKernel::julia(0.5, 0.25));
        let m: FractalKernel = serde_json::from_str(r#""mandelbrot""#).unwrap();
        assert_eq!(m, FractalKernel::Mandelbrot);
    }
}
