//! Map-side collaborators
//!
//! The renderer does not own the map model. It reads the view through the
//! [`Viewport`] trait and talks back to the map through [`MapHost`]. Both are
//! implemented by the embedding viewer.

use parking_lot::Mutex;

use crate::foundation::math::Mat4;
use crate::render::LayerRenderer;

/// Snapshot of the current view
///
/// `x` and `y` are normalized map coordinates in `[0, 1]`, `scale` is the
/// linear zoom factor (`2^zoom_level` times the fractional part).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPosition {
    /// Horizontal center in normalized map coordinates
    pub x: f64,
    /// Vertical center in normalized map coordinates
    pub y: f64,
    /// Linear scale factor
    pub scale: f64,
    /// Integer zoom level of the tiles in view
    pub zoom_level: i32,
    /// Rotation around the view axis in degrees
    pub bearing: f32,
    /// Tilt of the view plane in degrees
    pub tilt: f32,
}

impl Default for MapPosition {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            zoom_level: 0,
            bearing: 0.0,
            tilt: 0.0,
        }
    }
}

/// Address of a map tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Create a tile address
    pub fn new(x: i32, y: i32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

/// Read access to the map view
///
/// Called with the viewport lock held, so implementations must not block on
/// the rendering thread.
pub trait Viewport {
    /// Copy the current position into `pos`
    ///
    /// Returns `true` when it differs from what `pos` held before.
    fn map_position(&self, pos: &mut MapPosition) -> bool;

    /// Write the four corners of the visible map area into `plane`
    ///
    /// Coordinates are relative to the current position; `offset` widens the
    /// box by that many pixels on each side.
    fn map_extents(&self, plane: &mut [f32; 8], offset: f32);

    /// Write the requested view / projection / view-projection matrices
    fn matrices(&self, view: Option<&mut Mat4>, proj: Option<&mut Mat4>, viewproj: Option<&mut Mat4>);
}

/// The map a frame driver renders
pub trait MapHost {
    /// Viewport implementation shared with the input thread
    type View: Viewport;

    /// Lock shared with whatever thread pans, zooms and rotates the map
    fn viewport(&self) -> &Mutex<Self::View>;

    /// Advance running view animations by one tick
    fn update_animation(&mut self);

    /// Refresh map state after a surface change
    ///
    /// `redraw` is `true` when GPU resources were rebuilt and everything has
    /// to be drawn again.
    fn update_map(&mut self, redraw: bool);

    /// Schedule another frame
    fn render(&mut self);

    /// Ordered layer renderers, drawn first to last
    fn layer_renderers(&mut self) -> &mut [Box<dyn LayerRenderer>];
}
