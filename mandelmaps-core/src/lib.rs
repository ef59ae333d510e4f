pub mod complex;
pub mod error;
pub mod fractal;
pub mod iteration;
pub mod julia;
pub mod mandelbrot;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use error::CoreError;
pub use fractal::{EscapeTime, FractalFamily, FractalKernel, ESCAPE_RADIUS_SQ};
pub use iteration::{FixedBudget, IterationBudget, IterationPolicy};
pub use viewport::{julia_parameter_for_pixel, ViewportState};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
