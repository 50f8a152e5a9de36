//! # Rendering
//!
//! Per-frame draw orchestration for the map.
//!
//! ## Architecture
//!
//! - **FrameDriver**: owns the GPU binding and runs the frame sequence
//! - **Surface lifecycle**: context creation and surface resize handling
//! - **MatrixSet**: view / projection matrices shared by all layers
//! - **TransientBufferPool**: scratch memory valid for one frame
//! - **LayerRenderer**: the contract every map layer implements
//!
//! Everything here runs on the rendering thread. Layer renderers never see
//! the driver itself, only the [`FrameContext`] it lends them.

pub mod buffer_pool;
pub mod frame_context;
pub mod frame_driver;
pub mod layer;
pub mod matrices;
pub mod surface;


pub use buffer_pool::{BufferItem, BufferLease, TransientBufferPool};
pub use frame_context::FrameContext;
pub use frame_driver::{tile_depth_offset, FrameDriver, FrameState};
pub use layer::{LayerRenderer, LayerState};
pub use matrices::MatrixSet;
pub use surface::{quad_indices, SharedQuad, SurfaceSize, MAX_QUADS, MAX_QUAD_CAPACITY};

/// Fixed-point scale of tile vertex coordinates
///
/// Tile geometry is stored as 16-bit integers; one map pixel spans this many
/// units.
pub const COORD_SCALE: f32 = 8.0;

/// Rendering error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A buffer lease was used after the frame that issued it ended
    #[error("stale buffer lease (lease epoch {lease_epoch}, pool epoch {pool_epoch})")]
    StaleLease {
        /// Epoch the lease was issued in
        lease_epoch: u64,
        /// Current pool epoch
        pool_epoch: u64,
    },

    /// More data was written into a scratch buffer than it can hold
    #[error("buffer overflow: write ends at byte {requested}, capacity is {capacity}")]
    BufferOverflow {
        /// End offset the write needed
        requested: usize,
        /// Buffer capacity in bytes
        capacity: usize,
    },

    /// An operation needed a GPU context and none is installed
    #[error("no gpu context: {0}")]
    ContextNotReady(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
