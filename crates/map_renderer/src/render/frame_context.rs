//! Per-frame services handed to layer renderers

use super::buffer_pool::{BufferLease, TransientBufferPool};
use super::surface::{SharedQuad, SurfaceSize};
use crate::foundation::time::FrameTime;
use crate::gl::{utils, BufferObjectTracker, GlBinding, GlStateCache};

/// Everything a layer renderer may touch while the frame is running
///
/// Borrowed from the frame driver for the duration of the layer pass, so
/// nothing in here can outlive the frame.
pub struct FrameContext<'a> {
    /// GPU binding for the current context
    pub gl: &'a mut dyn GlBinding,

    /// Scratch buffers, returned when the frame ends
    pub pool: &'a mut TransientBufferPool,

    /// Blend / texture / program cache
    pub state: &'a mut GlStateCache,

    /// Long-lived GPU buffers
    pub buffer_objects: &'a mut BufferObjectTracker,

    quad: SharedQuad,
    surface: SurfaceSize,
    time: FrameTime,
    rerender: &'a mut bool,
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(
        gl: &'a mut dyn GlBinding,
        pool: &'a mut TransientBufferPool,
        state: &'a mut GlStateCache,
        buffer_objects: &'a mut BufferObjectTracker,
        quad: SharedQuad,
        surface: SurfaceSize,
        time: FrameTime,
        rerender: &'a mut bool,
    ) -> Self {
        Self {
            gl,
            pool,
            state,
            buffer_objects,
            quad,
            surface,
            time,
            rerender,
        }
    }

    /// Current surface size
    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    /// Timestamp of this frame
    pub fn time(&self) -> FrameTime {
        self.time
    }

    /// Shared quad buffers
    pub fn quad(&self) -> SharedQuad {
        self.quad
    }

    /// Ask for another frame once this one is done
    ///
    /// Use this to animate a renderer instead of asking the map to render.
    pub fn request_rerender(&mut self) {
        *self.rerender = true;
    }

    /// Bind the shared unit quad, see [`SharedQuad::bind_vertices`]
    pub fn bind_quad_vertex_vbo(&mut self, location: Option<u32>, bind: bool) {
        self.quad.bind_vertices(&mut *self.gl, location, bind);
    }

    /// Bind the shared quad indices, see [`SharedQuad::bind_indices`]
    pub fn bind_quad_indices_vbo(&mut self, bind: bool) {
        self.quad.bind_indices(&mut *self.gl, bind);
    }

    /// Lease scratch memory for `count` 16-bit values
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

    /// Log pending GPU errors under `label`
    pub fn check_gl_error(&mut self, label: &str) -> bool {
        utils::check_gl_error(&mut *self.gl, label)
    }
}
