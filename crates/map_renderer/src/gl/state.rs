//! GL state cache
//!
//! Layer renderers toggle blending and swap textures and programs many times
//! per frame. The cache skips calls that would not change anything. It starts
//! every frame from a known baseline so a renderer never inherits a stale
//! assumption from the previous frame or from a lost context.

use super::{Capability, GlBinding, ProgramId, TextureId};

/// Last known value of a cached piece of state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cached<T> {
    Unknown,
    Known(T),
}

/// Cache of blend / texture / program bindings
#[derive(Debug, Clone)]
pub struct GlStateCache {
    blend: Cached<bool>,
    texture: Cached<Option<TextureId>>,
    program: Cached<Option<ProgramId>>,
}

impl Default for GlStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GlStateCache {
    /// Create a cache that knows nothing yet
    pub fn new() -> Self {
        Self {
            blend: Cached::Unknown,
            texture: Cached::Unknown,
            program: Cached::Unknown,
        }
    }

    /// Forget everything and put the context into the renderer's defaults
    ///
    /// Called on context creation and after the surface is rebuilt.
    pub fn init(&mut self, gl: &mut dyn GlBinding) {
        *self = Self::new();

        gl.disable(Capability::DepthTest);
        gl.disable(Capability::StencilTest);
        self.blend(gl, false);
    }

    /// Reset to "blend off, nothing bound"
    ///
    /// Always issues all three calls: renderers may have changed GPU state
    /// through the binding directly, so the cache is not trusted here.
    pub fn reset_frame(&mut self, gl: &mut dyn GlBinding) {
        gl.disable(Capability::Blend);
        gl.bind_texture_2d(None);
        gl.use_program(None);

        self.blend = Cached::Known(false);
        self.texture = Cached::Known(None);
        self.program = Cached::Known(None);
    }

    /// Enable or disable blending
    pub fn blend(&mut self, gl: &mut dyn GlBinding, enable: bool) {
        if self.blend == Cached::Known(enable) {
            return;
        }
        if enable {
            gl.enable(Capability::Blend);
        } else {
            gl.disable(Capability::Blend);
        }
        self.blend = Cached::Known(enable);
    }

    /// Bind a 2D texture
    pub fn bind_tex_2d(&mut self, gl: &mut dyn GlBinding, texture: Option<TextureId>) {
        if self.texture == Cached::Known(texture) {
            return;
        }
        gl.bind_texture_2d(texture);
        self.texture = Cached::Known(texture);
    }

    /// Make a program current
    ///
    /// Returns `true` when the program changed, so the caller knows its
    /// uniforms need to be set again.
    pub fn use_program(&mut self, gl: &mut dyn GlBinding, program: Option<ProgramId>) -> bool {
        if self.program == Cached::Known(program) {
            return false;
        }
        gl.use_program(program);
        self.program = Cached::Known(program);
        true
    }

    /// Cached blend state, `None` when unknown
    pub fn blend_enabled(&self) -> Option<bool> {
        match self.blend {
            Cached::Known(enabled) => Some(enabled),
            Cached::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};

    #[test]
    fn test_redundant_calls_are_skipped() {
        let mut gl = RecordingGl::new();
        let mut state = GlStateCache::new();

        state.blend(&mut gl, true);
        state.blend(&mut gl, true);
        assert!(state.use_program(&mut gl, Some(ProgramId(3))));
        assert!(!state.use_program(&mut gl, Some(ProgramId(3))));

        assert_eq!(
            gl.calls(),
            &[GlCall::Enable(Capability::Blend), GlCall::UseProgram(Some(ProgramId(3)))]
        );
    }

    #[test]
    fn test_reset_frame_reaches_baseline() {
        let mut gl = RecordingGl::new();
        let mut state = GlStateCache::new();
        state.bind_tex_2d(&mut gl, Some(TextureId(7)));
        gl.take_calls();

        state.reset_frame(&mut gl);

        assert_eq!(
            gl.calls(),
            &[
                GlCall::Disable(Capability::Blend),
                GlCall::BindTexture2d(None),
                GlCall::UseProgram(None),
            ]
        );
        assert_eq!(state.blend_enabled(), Some(false));

        // cached calls after the reset are skipped again
        gl.take_calls();
        state.bind_tex_2d(&mut gl, None);
        assert!(!state.use_program(&mut gl, None));
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_reset_frame_repeats_unbind_at_baseline() {
        let mut gl = RecordingGl::new();
        let mut state = GlStateCache::new();
        state.reset_frame(&mut gl);

        // state changed behind the cache's back
        gl.bind_texture_2d(Some(TextureId(9)));
        gl.use_program(Some(ProgramId(9)));
        gl.take_calls();

        state.reset_frame(&mut gl);
        assert_eq!(
            gl.calls(),
            &[
                GlCall::Disable(Capability::Blend),
                GlCall::BindTexture2d(None),
                GlCall::UseProgram(None),
            ]
        );
    }

    #[test]
    fn test_init_forgets_cached_state() {
        let mut gl = RecordingGl::new();
        let mut state = GlStateCache::new();
        state.use_program(&mut gl, Some(ProgramId(1)));

        state.init(&mut gl);
        assert!(state.use_program(&mut gl, Some(ProgramId(1))));
    }
}
