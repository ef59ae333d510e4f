use crate::fractal::FractalFamily;

/// Chooses an iteration budget for a zoom level.
///
/// Lives outside the kernels so hosts can plug in their own policy.
pub trait IterationBudget {
    fn max_iterations(&self, pixel_size: f64) -> u32;
}

/// A budget that ignores zoom entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBudget(pub u32);

impl IterationBudget for FixedBudget {
    fn max_iterations(&self, _pixel_size: f64) -> u32 {
        self.0.max(1)
    }
}

/// Zoom-scaled budget: `contrast · factor · base^|ln(pixel_size)|`.
///
/// Deeper zooms get geometrically more iterations. `base` and
/// `constant_factor` are tuned per family; `contrast` is the user-facing
/// multiplier (1.0 is neutral).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationPolicy {
    pub base: f64,
    pub constant_factor: f64,
    pub contrast: f64,
}

impl IterationPolicy {
    /// Floor applied to every computed budget.
    pub const MIN_ITERATIONS: u32 = 10;

    pub const MANDELBROT: Self = Self {
        base: 1.24,
        constant_factor: 54.0,
        contrast: 1.0,
    };

    pub const JULIA: Self = Self {
        base: 1.58,
        constant_factor: 6.46,
        contrast: 1.0,
    };

    pub fn for_family(family: FractalFamily) -> Self {
        match family {
            FractalFamily::Mandelbrot => Self::MANDELBROT,
            FractalFamily::Julia => Self::JULIA,
        }
    }

    /// Return a copy with a different contrast multiplier.
    pub fn with_contrast(self, contrast: f64) -> Self {
        Self { contrast, ..self }
    }
}

impl IterationBudget for IterationPolicy {
    fn max_iterations(&self, pixel_size: f64) -> u32 {
        let depth = pixel_size.ln().abs();
        let raw = self.contrast * self.constant_factor * self.base.powf(depth);
        if !raw.is_finite() {
            return if raw > 0.0 { u32::MAX } else { Self::MIN_ITERATIONS };
        }
        // `as` saturates at u32::MAX for oversized values.
        (raw.round() as u32).max(Self::MIN_ITERATIONS)
    }
}
