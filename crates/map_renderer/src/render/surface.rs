//! Surface lifecycle
//!
//! A GPU context can disappear at any time (app sent to background, display
//! reconfigured). Everything uploaded to it is then gone, including the shared
//! quad geometry that layer renderers use for full-screen passes and texture
//! tiles. These methods rebuild that state when a new context arrives and
//! keep the fixed per-surface pipeline state in sync with the surface size.

use super::buffer_pool::TransientBufferPool;
use super::frame_driver::{FrameDriver, FrameState};
use super::RenderResult;
use crate::gl::{
    AttribType, BlendFactor, BufferId, BufferTarget, BufferUsage, Capability, Face, GlBinding,
    Winding,
};
use crate::map::{MapHost, Viewport};

/// Quads covered by the shared index buffer
pub const MAX_QUADS: usize = 64;

/// Unit quad as a triangle strip: `(-1,-1) (-1,1) (1,-1) (1,1)`
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0];

/// Size of the rendering surface in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Most quads a 16-bit index buffer can address
pub const MAX_QUAD_CAPACITY: usize = u16::MAX as usize / 4;

/// Index buffer contents for `max_quads` quads
///
/// Quad `i` uses vertices `4i..4i+4` as two triangles `0-1-2` and `2-1-3`.
/// Capped at [`MAX_QUAD_CAPACITY`] quads.
pub fn quad_indices(max_quads: usize) -> Vec<u16> {
    (0..max_quads.min(MAX_QUAD_CAPACITY))
        .filter_map(|quad| u16::try_from(quad * 4).ok())
        .flat_map(|base| [base, base + 1, base + 2, base + 2, base + 1, base + 3])
        .collect()
}

/// Names of the static quad buffers for the current context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedQuad {
    /// Index buffer built by [`quad_indices`]
    pub indices: Option<BufferId>,
    /// Vertex buffer holding [`QUAD_VERTICES`]
    pub vertices: Option<BufferId>,
}

impl SharedQuad {
    /// Bind the unit quad vertex buffer
    ///
    /// Draw it with a 4-vertex triangle strip. With a `location`, the
    /// attribute is configured as 2 floats per vertex; without one, the
    /// caller sets up its own attribute pointer. `bind = false` unbinds.
    pub fn bind_vertices(&self, gl: &mut dyn GlBinding, location: Option<u32>, bind: bool) {
        if !bind {
            gl.bind_buffer(BufferTarget::Array, None);
            return;
        }
        gl.bind_buffer(BufferTarget::Array, self.vertices);
        if let Some(location) = location {
            gl.vertex_attrib_pointer(location, 2, AttribType::Float, false, 0, 0);
        }
    }

    /// Bind the quad index buffer, or unbind it with `bind = false`
    ///
    /// Covers up to [`MAX_QUADS`] quads in one draw call. Don't forget to
    /// unbind.
    pub fn bind_indices(&self, gl: &mut dyn GlBinding, bind: bool) {
        gl.bind_buffer(BufferTarget::ElementArray, if bind { self.indices } else { None });
    }
}

/// Surface bookkeeping owned by the frame driver
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SurfaceState {
    pub(crate) size: SurfaceSize,
    pub(crate) new_surface: bool,
    pub(crate) quad: SharedQuad,
}

/// Upload `data` into buffer `id` from a freshly leased scratch item
fn upload_static<T: bytemuck::Pod>(
    pool: &mut TransientBufferPool,
    gl: &mut dyn GlBinding,
    target: BufferTarget,
    id: BufferId,
    data: &[T],
) -> RenderResult<()> {
    let lease = pool.acquire(std::mem::size_of_val(data));
    pool.item_mut(&lease)?.put(data)?;

    gl.bind_buffer(target, Some(id));
    pool.upload(gl, lease, target, BufferUsage::StaticDraw)?;
    gl.bind_buffer(target, None);
    Ok(())
}

impl<G: GlBinding, M: MapHost> FrameDriver<G, M> {
    /// A new GPU context was created
    ///
    /// Installs the binding resolved for it and drops every assumption about
    /// GPU state. Layer renderers are marked for setup, and the next
    /// [`Self::on_surface_changed`] rebuilds the shared quad buffers.
    pub fn on_context_created(&mut self, mut gl: G) {
        log::debug!("gpu context created");

        self.gl_state.init(&mut gl);
        self.buffer_objects
            .init(&mut gl, self.config.buffer_object_working_set);

        for renderer in self.map.layer_renderers() {
            renderer.on_context_created();
        }

        self.gl = Some(gl);
        self.surface.quad = SharedQuad::default();
        self.surface.new_surface = true;
        self.frame_state = FrameState::Uninitialized;
    }

    /// The surface was created or resized
    ///
    /// Non-positive dimensions are ignored. A plain resize only updates the
    /// per-surface state; the shared quad buffers are built once per context.
    pub fn on_surface_changed(&mut self, width: i32, height: i32) {
        log::debug!(
            "surface changed: new={}, {}x{}",
            self.surface.new_surface,
            width,
            height
        );

        if width <= 0 || height <= 0 {
            return;
        }

        let Some(gl) = self.gl.as_mut() else {
            log::warn!("surface changed before a gpu context was created");
            return;
        };

        let size = SurfaceSize {
            width: width as u32,
            height: height as u32,
        };
        self.surface.size = size;
        self.matrices.set_screen(size);

        self.map
            .viewport()
            .lock()
            .matrices(None, Some(&mut self.matrices.proj), None);

        gl.viewport(0, 0, width, height);
        gl.scissor(0, 0, width, height);
        gl.enable(Capability::ScissorTest);

        gl.clear_stencil(0);
        gl.clear_depth(1.0);

        // renderers that cull opt in; the winding is fixed for all of them
        gl.disable(Capability::CullFace);
        gl.blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
        gl.front_face(Winding::Clockwise);
        gl.cull_face(Face::Back);

        if self.frame_state == FrameState::Uninitialized {
            self.frame_state = FrameState::SurfaceReady;
        }

        if !self.surface.new_surface {
            self.map.update_map(false);
            return;
        }
        self.surface.new_surface = false;

        let ids = gl.gen_buffers(2);
        let quad = SharedQuad {
            indices: Some(ids[0]),
            vertices: Some(ids[1]),
        };

        let indices = quad_indices(self.config.max_quads);
        if let Err(err) = upload_static(
            &mut self.pool,
            &mut *gl,
            BufferTarget::ElementArray,
            ids[0],
            &indices,
        ) {
            log::error!("failed to upload quad indices: {err}");
        }
        if let Err(err) = upload_static(
            &mut self.pool,
            &mut *gl,
            BufferTarget::Array,
            ids[1],
            &QUAD_VERTICES,
        ) {
            log::error!("failed to upload quad vertices: {err}");
        }
        self.surface.quad = quad;

        self.update_color = true;
        self.gl_state.init(gl);

        self.map.update_map(true);
    }

    /// Bind the shared unit quad vertex buffer
    ///
    /// See [`SharedQuad::bind_vertices`].
    pub fn bind_quad_vertex_vbo(&mut self, location: Option<u32>, bind: bool) {
        if let Some(gl) = self.gl.as_mut() {
            self.surface.quad.bind_vertices(gl, location, bind);
        }
    }

    /// Bind the shared quad index buffer
    ///
    /// See [`SharedQuad::bind_indices`].
    pub fn bind_quad_indices_vbo(&mut self, bind: bool) {
        if let Some(gl) = self.gl.as_mut() {
            self.surface.quad.bind_indices(gl, bind);
        }
    }

    /// Current surface size
    pub fn surface_size(&self) -> SurfaceSize {
        self.surface.size
    }

    /// Current surface width in pixels
    pub fn screen_width(&self) -> u32 {
        self.surface.size.width
    }

    /// Current surface height in pixels
    pub fn screen_height(&self) -> u32 {
        self.surface.size.height
    }

    /// Shared quad buffer names for the current context
    pub fn shared_quad(&self) -> SharedQuad {
        self.surface.quad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_indices_pattern() {
        let indices = quad_indices(MAX_QUADS);
        assert_eq!(indices.len(), MAX_QUADS * 6);

        for (i, block) in indices.chunks_exact(6).enumerate() {
            let b = (4 * i) as u16;
            assert_eq!(block, [b, b + 1, b + 2, b + 2, b + 1, b + 3]);
        }
    }

    #[test]
    fn test_quad_indices_capped_at_capacity() {
        let indices = quad_indices(20_000);
        assert_eq!(indices.len(), MAX_QUAD_CAPACITY * 6);

        let last = (4 * (MAX_QUAD_CAPACITY - 1)) as u16;
        assert_eq!(&indices[indices.len() - 6..], &[last, last + 1, last + 2, last + 2, last + 1, last + 3]);
    }

    #[test]
    fn test_quad_indices_empty() {
        assert!(quad_indices(0).is_empty());
    }
}
