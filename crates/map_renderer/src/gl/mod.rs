//! GPU binding abstraction
//!
//! The renderer never talks to a vendor API directly. Desktop GL, Android GL
//! and the portable bindings each provide a [`GlBinding`]; the frame driver and
//! layer renderers only see this trait and the small value types below.
//!
//! GPU calls do not report failure through return values. Errors are queued
//! by the binding and drained with [`GlBinding::get_error`], which the driver
//! only does for diagnostics.

pub mod buffer_objects;
pub mod recording;
pub mod state;
pub mod utils;

pub use buffer_objects::{BufferObject, BufferObjectTracker};
pub use recording::{GlCall, RecordingGl};
pub use state::GlStateCache;

use bitflags::bitflags;

/// Name of a GPU buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Name of a GPU texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Name of a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

bitflags! {
    /// Framebuffer planes cleared by [`GlBinding::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        /// Color plane
        const COLOR = 0b001;
        /// Depth plane
        const DEPTH = 0b010;
        /// Stencil plane
        const STENCIL = 0b100;
    }
}

/// Buffer binding points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Index data
    ElementArray,
}

/// Upload usage hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times
    StaticDraw,
    /// Rewritten every few frames
    DynamicDraw,
    /// Rewritten every frame
    StreamDraw,
}

/// Toggleable pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Alpha blending
    Blend,
    /// Back/front face culling
    CullFace,
    /// Depth testing
    DepthTest,
    /// Scissor rectangle
    ScissorTest,
    /// Stencil testing
    StencilTest,
}

/// Blend equation factors used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source alpha
    SrcAlpha,
    /// `1 - source alpha`
    OneMinusSrcAlpha,
}

/// Polygon faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    /// Front-facing polygons
    Front,
    /// Back-facing polygons
    Back,
}

/// Winding order that defines a front face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    /// Clockwise
    Clockwise,
    /// Counter-clockwise
    CounterClockwise,
}

/// Vertex attribute component types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    /// 32-bit float
    Float,
    /// 16-bit signed integer
    Short,
    /// 8-bit unsigned integer
    UnsignedByte,
}

/// Errors reported by the GPU error query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    /// Enum argument out of range
    InvalidEnum,
    /// Numeric argument out of range
    InvalidValue,
    /// Operation illegal in the current state
    InvalidOperation,
    /// Framebuffer incomplete
    InvalidFramebufferOperation,
    /// Not enough memory left to execute the command
    OutOfMemory,
}

impl std::fmt::Display for GlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GlError::InvalidEnum => "invalid enum",
            GlError::InvalidValue => "invalid value",
            GlError::InvalidOperation => "invalid operation",
            GlError::InvalidFramebufferOperation => "invalid framebuffer operation",
            GlError::OutOfMemory => "out of memory",
        };
        f.write_str(name)
    }
}

/// GPU binding consumed by the renderer
///
/// Implementations wrap one concrete GL entry point. A binding is only valid
/// for the context it was resolved against; the frame driver receives a fresh
/// one from [`crate::render::FrameDriver::on_context_created`] whenever the
/// platform recreates the context.
///
/// All methods are called from the rendering thread only.
pub trait GlBinding {
    /// Set the color used by color clears
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    /// Set the value used by depth clears
    fn clear_depth(&mut self, depth: f32);

    /// Set the value used by stencil clears
    fn clear_stencil(&mut self, value: i32);

    /// Clear the selected framebuffer planes
    fn clear(&mut self, mask: ClearMask);

    /// Enable or disable depth writes
    fn depth_mask(&mut self, write: bool);

    /// Set the stencil write mask
    fn stencil_mask(&mut self, mask: u32);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Set the scissor rectangle
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Enable a capability
    fn enable(&mut self, cap: Capability);

    /// Disable a capability
    fn disable(&mut self, cap: Capability);

    /// Set the blend function
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Select which faces are culled
    fn cull_face(&mut self, face: Face);

    /// Select the winding of front faces
    fn front_face(&mut self, winding: Winding);

    /// Generate `count` buffer names
    fn gen_buffers(&mut self, count: usize) -> Vec<BufferId>;

    /// Delete buffer names and their storage
    fn delete_buffers(&mut self, ids: &[BufferId]);

    /// Bind a buffer to a target, `None` unbinds
    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>);

    /// Upload data into the buffer bound to `target`
    ///
    /// Implementations must not assume the caller keeps `data` unchanged after
    /// the call returns, but some drivers read it late anyway; see
    /// [`crate::render::TransientBufferPool`].
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Describe a vertex attribute sourced from the bound array buffer
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: AttribType,
        normalized: bool,
        stride: i32,
        offset: usize,
    );

    /// Bind a 2D texture to the active unit, `None` unbinds
    fn bind_texture_2d(&mut self, texture: Option<TextureId>);

    /// Make a program current, `None` clears it
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Pop the oldest queued error
    fn get_error(&mut self) -> Option<GlError>;
}
