//! Layer renderer contract
//!
//! Each map layer (tiles, labels, markers, overlays) brings its own renderer.
//! The frame driver walks them in order once per frame and drives a small
//! state machine per renderer:
//!
//! ```text
//! not initialized --setup()--> initialized --update()--> ready? --render()
//!         ^                                                   |
//!         +------------- new GPU context ---------------------+
//! ```

use super::{FrameContext, MatrixSet};
use crate::map::MapPosition;

/// Lifecycle flags every layer renderer carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerState {
    /// `setup` ran against the current GPU context
    pub initialized: bool,

    /// The renderer has something to draw this frame
    pub ready: bool,
}

/// A renderer driven by the frame driver
pub trait LayerRenderer {
    /// Lifecycle flags
    fn state(&self) -> &LayerState;

    /// Mutable lifecycle flags
    fn state_mut(&mut self) -> &mut LayerState;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// One-time GPU setup (shaders, static buffers)
    ///
    /// Runs again after every GPU context loss.
    fn setup(&mut self, frame: &mut FrameContext<'_>);

    /// Prepare the frame; set `ready` when there is something to render
    ///
    /// Called every frame, even when the position did not change.
    fn update(
        &mut self,
        frame: &mut FrameContext<'_>,
        pos: &MapPosition,
        changed: bool,
        matrices: &MatrixSet,
    );

    /// Issue draw calls
    ///
    /// Only `matrices.mvp` may be modified; the other matrices are shared
    /// with the renderers that follow.
    fn render(&mut self, frame: &mut FrameContext<'_>, pos: &MapPosition, matrices: &mut MatrixSet);

    /// The GPU context was recreated; everything this renderer uploaded is gone
    fn on_context_created(&mut self) {
        self.state_mut().initialized = false;
    }

    /// Whether `setup` ran against the current context
    fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Record that `setup` ran
    fn set_initialized(&mut self, initialized: bool) {
        self.state_mut().initialized = initialized;
    }

    /// Whether `render` should be called this frame
    fn is_ready(&self) -> bool {
        self.state().ready
    }
}
