use thiserror::Error;

/// Errors raised while constructing viewports and iteration budgets.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid pixel size: {0} (must be positive and finite)")]
    InvalidPixelSize(f64),

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },

    #[error("zoom limit reached: ln(pixel size) {ln_pixel_size:.2} is below {limit}")]
    ZoomLimit { ln_pixel_size: f64, limit: f64 },
}
