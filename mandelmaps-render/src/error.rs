use thiserror::Error;

/// Errors originating from the render engine.
///
/// Cancellation is deliberately absent: an aborted job is a normal outcome,
/// reported through [`JobStatus`](crate::JobStatus), never as an error.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render settings: {reason}")]
    InvalidSettings { reason: String },

    #[error("viewport is {actual_width}×{actual_height} but the pixel buffer is {width}×{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("no live render workers")]
    NoLiveWorkers,

    #[error("nothing has been rendered yet")]
    NothingRendered,

    #[error("failed to spawn render worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Core(#[from] mandelmaps_core::CoreError),
}
