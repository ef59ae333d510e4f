pub mod buffer;
pub mod color;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod job;
pub mod observer;
pub mod scheduler;
pub mod settings;
mod worker;

pub use buffer::{PixelBuffer, MAX_BLOCK_SIZE, UNCOMPUTED};
pub use color::{default_mapper, ColorMapper, CosineRamp, Spiral, OPAQUE_BLACK};
pub use coordinator::RenderCoordinator;
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use job::{JobHandle, JobId, JobOutcome, JobStatus, RenderJob};
pub use observer::{LogObserver, NullObserver, RenderObserver};
pub use scheduler::{effective_block_size, BlockRow, PassStats, ProgressiveBlockScheduler, Section};
pub use settings::RenderSettings;
pub use worker::WorkerState;

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
