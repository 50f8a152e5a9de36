//! Per-frame matrix set
//!
//! The view, projection and view-projection matrices are copied from the
//! viewport once per frame, before any layer renderer runs. Renderers must
//! treat them as read-only and compose their own transforms in `mvp`.

use crate::foundation::math::{Mat4, Mat4Ext};

use super::surface::SurfaceSize;

/// Matrices shared by all layer renderers for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSet {
    /// World to camera
    pub view: Mat4,

    /// Camera to clip space
    pub proj: Mat4,

    /// `proj * view`
    pub viewproj: Mat4,

    /// Corners of the visible map area, `[x0, y0, x1, y1, x2, y2, x3, y3]`
    pub plane: [f32; 8],

    /// Scratch transform for composing a renderer's model-view-projection
    pub mvp: Mat4,

    screen: SurfaceSize,
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixSet {
    /// Identity matrices for an unsized surface
    pub fn new() -> Self {
        Self {
            view: Mat4::identity(),
            proj: Mat4::identity(),
            viewproj: Mat4::identity(),
            plane: [0.0; 8],
            mvp: Mat4::identity(),
            screen: SurfaceSize::default(),
        }
    }

    /// Surface size the screen-space helper works in
    pub fn screen(&self) -> SurfaceSize {
        self.screen
    }

    pub(crate) fn set_screen(&mut self, screen: SurfaceSize) {
        self.screen = screen;
    }

    /// Set `mvp` so that coordinates are in screen pixels
    ///
    /// With `centered`, `(0, 0)` is the middle of the screen; otherwise it is
    /// the top left corner. `scale` divides incoming coordinates, e.g. `2.0`
    /// for data in half pixels.
    pub fn use_screen_coordinates(&mut self, centered: bool, scale: f32) {
        let width = self.screen.width as f32;
        let ratio = 1.0 / (scale * width);

        self.mvp = if centered {
            Mat4::from_scale(ratio, ratio, ratio)
        } else {
            let half_width = (self.screen.width / 2) as f32;
            let half_height = (self.screen.height / 2) as f32;
            Mat4::from_trans_scale(
                -half_width * ratio * scale,
                -half_height * ratio * scale,
                ratio,
            )
        };

        self.mvp.multiply_lhs(&self.proj);
    }

    /// Shrink view-projection and projection by half in x and y
    ///
    /// Debug aid: tiles selected for rendering stay the same, so the area
    /// around the visible map shows which tiles were actually drawn.
    pub(crate) fn apply_debug_view(&mut self) {
        self.mvp = Mat4::from_scale(0.5, 0.5, 1.0);
        self.viewproj.multiply_lhs(&self.mvp);
        self.proj.multiply_lhs(&self.mvp);
    }
}
