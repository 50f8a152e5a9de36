//! # Frame Driver
//!
//! Runs one frame of the map: clears the framebuffer, copies the view state,
//! drives every layer renderer and hands the scratch buffers back.
//!
//! ## Frame sequence
//!
//! 1. Timestamp the frame
//! 2. Apply a pending background color
//! 3. Clear color, depth and stencil with writes briefly enabled
//! 4. Reset the GL state cache to its baseline
//! 5. Advance view animations
//! 6. Under the viewport lock: copy position, extents and matrices
//! 7. Setup / update / render each layer renderer in order
//! 8. Shed cached GPU buffers if the GPU ran out of memory
//! 9. Schedule another frame if a renderer asked for one
//! 10. Release all transient buffers
//!
//! Step 10 runs for every frame, including frames skipped because there is no
//! surface yet.
//!
//! ## Threading
//!
//! All methods run on the rendering thread. The only shared state is the
//! viewport, whose lock is held for step 6 and never across GPU calls.

use super::buffer_pool::{BufferLease, TransientBufferPool};
use super::frame_context::FrameContext;
use super::matrices::MatrixSet;
use super::surface::SurfaceState;
use super::{RenderError, RenderResult};
use crate::config::RendererConfig;
use crate::foundation::time::{FrameTime, FrameTimer};
use crate::gl::utils::{check_gl_error, check_gl_out_of_memory, color_to_float};
use crate::gl::{BufferObjectTracker, ClearMask, GlBinding, GlStateCache};
use crate::map::{MapHost, MapPosition, TileCoord, Viewport};

/// Where the driver is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No GPU context, or a new one without a sized surface yet
    Uninitialized,
    /// Surface configured, no frame drawn on it yet
    SurfaceReady,
    /// A frame is being drawn
    FramePending,
    /// The last frame finished
    FrameComplete,
}

/// Per-frame draw orchestrator
///
/// Owns the GPU binding for the current context, the map it renders and all
/// frame-scoped resources. Layer renderers reach those resources through the
/// [`FrameContext`] they receive.
pub struct FrameDriver<G: GlBinding, M: MapHost> {
    pub(crate) config: RendererConfig,
    pub(crate) gl: Option<G>,
    pub(crate) map: M,

    pub(crate) position: MapPosition,
    pub(crate) matrices: MatrixSet,

    pub(crate) pool: TransientBufferPool,
    pub(crate) gl_state: GlStateCache,
    pub(crate) buffer_objects: BufferObjectTracker,
    pub(crate) surface: SurfaceState,
    pub(crate) timer: FrameTimer,

    pub(crate) clear_color: [f32; 4],
    pub(crate) update_color: bool,
    pub(crate) rerender: bool,
    pub(crate) frame_state: FrameState,
}

impl<G: GlBinding, M: MapHost> FrameDriver<G, M> {
    /// Create a driver for `map`
    ///
    /// Nothing is drawn until [`Self::on_context_created`] and
    /// [`Self::on_surface_changed`] have run.
    pub fn new(map: M, config: RendererConfig) -> Self {
        let config = config.validated();
        log::info!(
            "frame driver created (max quads {}, debug view {})",
            config.max_quads,
            config.debug_view
        );

        Self {
            pool: TransientBufferPool::new(config.min_scratch_bytes),
            buffer_objects: BufferObjectTracker::new(config.buffer_cache_limit_bytes),
            clear_color: color_to_float(config.background_color),
            update_color: true,
            config,
            gl: None,
            map,
            position: MapPosition::default(),
            matrices: MatrixSet::new(),
            gl_state: GlStateCache::new(),
            surface: SurfaceState::default(),
            timer: FrameTimer::new(),
            rerender: false,
            frame_state: FrameState::Uninitialized,
        }
    }

    /// Draw one frame
    ///
    /// Never fails: GPU errors are logged and out-of-memory is handled on a
    /// best-effort basis, so the render loop keeps going.
    pub fn on_draw_frame(&mut self) {
        self.draw();
        self.pool.release_all();
    }

    fn draw(&mut self) {
        let time = self.timer.tick();

        let Some(gl) = self.gl.as_mut() else {
            log::debug!("frame {} skipped: no gpu context", time.frame_index);
            return;
        };
        if self.frame_state == FrameState::Uninitialized {
            log::debug!("frame {} skipped: surface not ready", time.frame_index);
            return;
        }
        self.frame_state = FrameState::FramePending;

        if self.update_color {
            let [r, g, b, a] = self.clear_color;
            gl.clear_color(r, g, b, a);
            self.update_color = false;
        }

        // some implementations skip depth/stencil clears unless writes are on
        gl.depth_mask(true);
        gl.stencil_mask(0xFF);
        gl.clear(ClearMask::COLOR | ClearMask::DEPTH | ClearMask::STENCIL);
        gl.depth_mask(false);
        gl.stencil_mask(0);

        self.gl_state.reset_frame(&mut *gl);

        self.map.update_animation();

        let changed = {
            let viewport = self.map.viewport().lock();
            let changed = viewport.map_position(&mut self.position);
            if changed {
                viewport.map_extents(&mut self.matrices.plane, 0.0);
            }

            let m = &mut self.matrices;
            viewport.matrices(Some(&mut m.view), Some(&mut m.proj), Some(&mut m.viewproj));

            if self.config.debug_view {
                self.matrices.apply_debug_view();
            }
            changed
        };

        let position = self.position;
        let mut frame = FrameContext::new(
            &mut *gl,
            &mut self.pool,
            &mut self.gl_state,
            &mut self.buffer_objects,
            self.surface.quad,
            self.surface.size,
            time,
            &mut self.rerender,
        );

        let mut out_of_memory = false;
        for renderer in self.map.layer_renderers().iter_mut() {
            if !renderer.is_initialized() {
                renderer.setup(&mut frame);
                renderer.set_initialized(true);
            }

            renderer.update(&mut frame, &position, changed, &self.matrices);

            if renderer.is_ready() {
                renderer.render(&mut frame, &position, &mut self.matrices);
            }

            // out-of-memory must survive the per-layer drain
            if self.config.check_gl_errors && check_gl_out_of_memory(&mut *frame.gl, renderer.name()) {
                out_of_memory = true;
            }
        }
        drop(frame);

        if check_gl_out_of_memory(&mut *gl, "finish") || out_of_memory {
            let freed = self.buffer_objects.check_usage(&mut *gl, true);
            log::warn!("gpu out of memory, released {freed} cached buffers");
        }

        if self.rerender {
            self.map.render();
            self.rerender = false;
        }

        self.frame_state = FrameState::FrameComplete;
    }

    /// Set the background color (ARGB), applied at the start of the next frame
    pub fn set_background_color(&mut self, argb: u32) {
        self.clear_color = color_to_float(argb);
        self.update_color = true;
    }

    /// Draw another frame after the current one
    ///
    /// Animating layer renderers call this instead of asking the map to
    /// render, which would also refresh map state.
    pub fn request_rerender(&mut self) {
        self.rerender = true;
    }

    /// Whether a rerender is pending
    pub fn rerender_requested(&self) -> bool {
        self.rerender
    }

    /// Lifecycle state
    pub fn frame_state(&self) -> FrameState {
        self.frame_state
    }

    /// Timestamp of the last frame
    pub fn frame_time(&self) -> FrameTime {
        self.timer.last()
    }

    /// Matrices of the last frame
    pub fn matrices(&self) -> &MatrixSet {
        &self.matrices
    }

    /// Position of the last frame
    pub fn position(&self) -> &MapPosition {
        &self.position
    }

    /// Renderer configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Transient buffer pool
    pub fn pool(&self) -> &TransientBufferPool {
        &self.pool
    }

    /// Mutable transient buffer pool
    pub fn pool_mut(&mut self) -> &mut TransientBufferPool {
        &mut self.pool
    }

    /// Lease scratch memory for `count` 16-bit values
    ///
    /// Only valid until the end of the current frame.
    pub fn acquire_short_buffer(&mut self, count: usize) -> BufferLease {
        self.pool.acquire_shorts(count)
    }

    /// Lease scratch memory for `count` floats
    pub fn acquire_float_buffer(&mut self, count: usize) -> BufferLease {
        self.pool.acquire_floats(count)
    }

    /// Lease scratch memory for `count` 32-bit integers
    pub fn acquire_int_buffer(&mut self, count: usize) -> BufferLease {
        self.pool.acquire_ints(count)
    }

    /// Buffer object tracker
    pub fn buffer_objects(&self) -> &BufferObjectTracker {
        &self.buffer_objects
    }

    /// GPU binding of the current context
    pub fn gl(&self) -> Option<&G> {
        self.gl.as_ref()
    }

    /// Mutable GPU binding of the current context
    pub fn gl_mut(&mut self) -> Option<&mut G> {
        self.gl.as_mut()
    }

    /// Mutable GPU binding, or [`RenderError::ContextNotReady`] naming `op`
    pub fn try_gl_mut(&mut self, op: &str) -> RenderResult<&mut G> {
        self.gl
            .as_mut()
            .ok_or_else(|| RenderError::ContextNotReady(op.to_owned()))
    }

    /// The map being rendered
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Mutable access to the map being rendered
    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// Log pending GPU errors under `label`
    pub fn check_gl_error(&mut self, label: &str) -> bool {
        self.gl
            .as_mut()
            .is_some_and(|gl| check_gl_error(gl, label))
    }
}

/// Depth offset separating sibling tiles
///
/// Stable for a tile's position in its 4x4 neighbourhood and always in
/// `1..=16`, so adjacent tiles of the same zoom level never share a depth.
pub fn tile_depth_offset(tile: &TileCoord) -> i32 {
    tile.x.rem_euclid(4) + tile.y.rem_euclid(4) * 4 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_depth_offset_is_injective_on_local_grid() {
        let offsets: HashSet<i32> = (0..4)
            .flat_map(|x| (0..4).map(move |y| tile_depth_offset(&TileCoord::new(x, y, 12))))
            .collect();

        assert_eq!(offsets.len(), 16);
        assert!(offsets.iter().all(|o| (1..=16).contains(o)));
    }

    #[test]
    fn test_depth_offset_repeats_every_four_tiles() {
        let a = tile_depth_offset(&TileCoord::new(1, 2, 5));
        let b = tile_depth_offset(&TileCoord::new(1025, 6, 5));
        assert_eq!(a, b);
        assert_eq!(a, 1 + 8 + 1);
    }

    #[test]
    fn test_depth_offset_handles_negative_coordinates() {
        assert_eq!(tile_depth_offset(&TileCoord::new(-1, -1, 3)), 3 + 12 + 1);
    }

    #[test]
    fn test_depth_offset_negative_coordinates_stay_in_range() {
        for x in -9..0 {
            for y in -9..0 {
                let offset = tile_depth_offset(&TileCoord::new(x, y, 0));
                assert!((1..=16).contains(&offset));
            }
        }
    }
}
