//! # Map Renderer
//!
//! Per-frame GPU draw orchestration for a tiled map view.
//!
//! ## Features
//!
//! - **Frame driver**: clear, view snapshot, layer passes and cleanup in a
//!   fixed order every frame
//! - **Surface lifecycle**: context loss and resize handling, shared quad
//!   buffers rebuilt once per context
//! - **Transient buffers**: scratch memory leased for exactly one frame
//! - **Backend agnostic**: all GPU access goes through [`gl::GlBinding`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use map_renderer::prelude::*;
//!
//! fn run<M: MapHost>(map: M) {
//!     let mut driver = FrameDriver::new(map, RendererConfig::default());
//!     driver.on_context_created(RecordingGl::new());
//!     driver.on_surface_changed(1280, 720);
//!     driver.on_draw_frame();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod gl;
pub mod map;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::{FrameTime, FrameTimer},
        },
        gl::{GlBinding, GlStateCache, RecordingGl},
        map::{MapHost, MapPosition, TileCoord, Viewport},
        render::{
            tile_depth_offset, BufferLease, FrameContext, FrameDriver, FrameState, LayerRenderer,
            LayerState, MatrixSet, RenderError, RenderResult, TransientBufferPool, COORD_SCALE,
        },
    };
}
