//! Capture domain module.
//!
//! # Module Structure
//!
//! - `layer`: layer identity (`Direction`, `MapType`, `LayerKey`) and the `LayerMatrix`
//! - `source`: host seams (`ImageSource`, `ArtworkBoundsProvider`) and `PixelBuffer`
//! - `pool`: reusable capture buffers (`BufferPool`)
//! - `job`: the `CaptureJob` record
//! - `orchestrator`: `CaptureOrchestrator`, which walks the matrix

mod job;
mod layer;
mod orchestrator;
mod pool;
mod source;

pub use job::CaptureJob;
pub use layer::{Direction, LayerKey, LayerMatrix, MapType, MatrixPreset, StrengthTable};
pub use orchestrator::CaptureOrchestrator;
pub use pool::{BufferPool, DEFAULT_POOL_SIZE, PoolStats, PooledBuffer};
pub use source::{
    ArtworkBounds, ArtworkBoundsProvider, ImageSource, PixelBuffer, StaticBounds, ViewRequest,
};
