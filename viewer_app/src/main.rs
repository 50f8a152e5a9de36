//! Headless map viewer
//!
//! Drives the frame driver against the recording GPU binding: a map that pans
//! and zooms by itself, a tile layer and a screen-space overlay. Useful for
//! profiling the frame loop and for checking renderer logs without a display.
//!
//! Usage: `headless_viewer [config.toml|config.ron] [frames]`

use std::collections::HashSet;

use map_renderer::foundation::logging;
use map_renderer::gl::{BufferTarget, BufferUsage, GlCall, ProgramId, RecordingGl};
use map_renderer::prelude::*;
use parking_lot::Mutex;

const SURFACE_WIDTH: i32 = 1280;
const SURFACE_HEIGHT: i32 = 720;
const TILE_SIZE: f64 = 256.0;
const DEFAULT_FRAMES: u64 = 120;

/// Viewport that pans east and zooms in a little every animation tick
struct AutoPanViewport {
    position: MapPosition,
    width: f32,
    height: f32,
}

impl AutoPanViewport {
    fn new(width: i32, height: i32) -> Self {
        Self {
            position: MapPosition {
                scale: 1024.0,
                zoom_level: 10,
                ..MapPosition::default()
            },
            width: width as f32,
            height: height as f32,
        }
    }

    fn advance(&mut self) {
        let pos = &mut self.position;
        pos.x = (pos.x + 0.5 / (pos.scale * TILE_SIZE)).fract();
        pos.scale *= 1.002;
        pos.zoom_level = pos.scale.log2().floor() as i32;
    }
}

impl Viewport for AutoPanViewport {
    fn map_position(&self, pos: &mut MapPosition) -> bool {
        let changed = *pos != self.position;
        *pos = self.position;
        changed
    }

    fn map_extents(&self, plane: &mut [f32; 8], offset: f32) {
        let w = self.width / 2.0 + offset;
        let h = self.height / 2.0 + offset;
        *plane = [-w, -h, w, -h, w, h, -w, h];
    }

    fn matrices(&self, view: Option<&mut Mat4>, proj: Option<&mut Mat4>, viewproj: Option<&mut Mat4>) {
        let (w, h) = (self.width / 2.0, self.height / 2.0);
        let projection = Mat4::new_orthographic(-w, w, h, -h, -1.0, 1.0);
        let rotation = Mat4::from_euler_angles(0.0, 0.0, self.position.bearing.to_radians());

        if let Some(view) = view {
            *view = rotation;
        }
        if let Some(proj) = proj {
            *proj = projection;
        }
        if let Some(viewproj) = viewproj {
            *viewproj = projection * rotation;
        }
    }
}

/// Tiles covering the visible area at the current zoom level
fn visible_tiles(pos: &MapPosition, plane: &[f32; 8]) -> Vec<TileCoord> {
    let zoom = pos.zoom_level.clamp(0, 20);
    let tiles_per_side = f64::from(1u32 << zoom);
    let pixel_scale = pos.scale / tiles_per_side * TILE_SIZE;

    let half_w = f64::from(plane[2]) / pixel_scale;
    let half_h = f64::from(plane[5]) / pixel_scale;
    let cx = pos.x * tiles_per_side;
    let cy = pos.y * tiles_per_side;

    let mut tiles = Vec::new();
    for y in (cy - half_h).floor() as i32..=(cy + half_h).floor() as i32 {
        for x in (cx - half_w).floor() as i32..=(cx + half_w).floor() as i32 {
            tiles.push(TileCoord::new(x, y, zoom as u8));
        }
    }
    tiles
}

/// Draws one textured quad per visible tile
struct TileLayer {
    state: LayerState,
    program: ProgramId,
    tiles: Vec<TileCoord>,
}

impl TileLayer {
    fn new() -> Self {
        Self {
            state: LayerState::default(),
            program: ProgramId(1),
            tiles: Vec::new(),
        }
    }
}

impl LayerRenderer for TileLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn name(&self) -> &str {
        "tiles"
    }

    fn setup(&mut self, _frame: &mut FrameContext<'_>) {
        log::info!("tile layer ready for a new context");
    }

    fn update(&mut self, _frame: &mut FrameContext<'_>, pos: &MapPosition, changed: bool, matrices: &MatrixSet) {
        if changed {
            self.tiles = visible_tiles(pos, &matrices.plane);
        }
        self.state.ready = !self.tiles.is_empty();
    }

    fn render(&mut self, frame: &mut FrameContext<'_>, _pos: &MapPosition, _matrices: &mut MatrixSet) {
        frame.state.use_program(&mut *frame.gl, Some(self.program));
        frame.state.blend(&mut *frame.gl, false);

        let extent = (TILE_SIZE as f32 * COORD_SCALE) as i16;
        let lease = frame.acquire_short_buffer(self.tiles.len() * 12);
        let Ok(item) = frame.pool.item_mut(&lease) else {
            return;
        };

        let mut depths = HashSet::new();
        for tile in &self.tiles {
            depths.insert(tile_depth_offset(tile));
            let z = tile_depth_offset(tile) as i16;
            let quad = [0, 0, z, extent, 0, z, 0, extent, z, extent, extent, z];
            if let Err(err) = item.put::<i16>(&quad) {
                log::warn!("tile geometry truncated: {err}");
                break;
            }
        }

        let data = item.contents();
        let mut bo = frame.buffer_objects.get(&mut *frame.gl, BufferTarget::Array, data.len());
        frame
            .buffer_objects
            .upload(&mut *frame.gl, &mut bo, BufferTarget::Array, data, BufferUsage::StreamDraw);

        // draw: tile vertices with the shared quad indices
        bo.bind(&mut *frame.gl, BufferTarget::Array);
        frame.bind_quad_indices_vbo(true);
        frame.bind_quad_indices_vbo(false);
        frame.buffer_objects.release(bo);

        log::trace!("{} tiles, {} depth levels", self.tiles.len(), depths.len());
    }
}

/// Screen-space overlay drawn on the shared quad, animating continuously
struct CompassLayer {
    state: LayerState,
    program: ProgramId,
}

impl LayerRenderer for CompassLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn name(&self) -> &str {
        "compass"
    }

    fn setup(&mut self, _frame: &mut FrameContext<'_>) {}

    fn update(&mut self, frame: &mut FrameContext<'_>, _pos: &MapPosition, _changed: bool, _matrices: &MatrixSet) {
        self.state.ready = true;
        // spins on its own, so keep frames coming
        frame.request_rerender();
    }

    fn render(&mut self, frame: &mut FrameContext<'_>, _pos: &MapPosition, matrices: &mut MatrixSet) {
        matrices.use_screen_coordinates(true, 1.0);
        let spin = (frame.time().millis() % 3600) as f32 / 10.0;
        matrices.mvp *= Mat4::from_euler_angles(0.0, 0.0, spin.to_radians());

        frame.state.use_program(&mut *frame.gl, Some(self.program));
        frame.state.blend(&mut *frame.gl, true);
        frame.bind_quad_vertex_vbo(Some(0), true);
        frame.bind_quad_vertex_vbo(None, false);
    }
}

struct HeadlessMap {
    viewport: Mutex<AutoPanViewport>,
    layers: Vec<Box<dyn LayerRenderer>>,
    pending_frames: u64,
}

impl MapHost for HeadlessMap {
    type View = AutoPanViewport;

    fn viewport(&self) -> &Mutex<AutoPanViewport> {
        &self.viewport
    }

    fn update_animation(&mut self) {
        self.viewport.lock().advance();
    }

    fn update_map(&mut self, redraw: bool) {
        log::debug!("map update (redraw: {redraw})");
        self.pending_frames += 1;
    }

    fn render(&mut self) {
        self.pending_frames += 1;
    }

    fn layer_renderers(&mut self) -> &mut [Box<dyn LayerRenderer>] {
        &mut self.layers
    }
}

fn load_config(path: Option<&str>) -> Result<RendererConfig, ConfigError> {
    match path {
        Some(path) => {
            log::info!("loading renderer config from {path}");
            RendererConfig::load_from_file(path)
        }
        None => Ok(RendererConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_filter("info");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, frames) = match args.as_slice() {
        [] => (None, DEFAULT_FRAMES),
        [arg] => match arg.parse() {
            Ok(frames) => (None, frames),
            Err(_) => (Some(arg.as_str()), DEFAULT_FRAMES),
        },
        [path, frames, ..] => (Some(path.as_str()), frames.parse()?),
    };
    let config = load_config(config_path)?;

    let map = HeadlessMap {
        viewport: Mutex::new(AutoPanViewport::new(SURFACE_WIDTH, SURFACE_HEIGHT)),
        layers: vec![
            Box::new(TileLayer::new()),
            Box::new(CompassLayer {
                state: LayerState::default(),
                program: ProgramId(2),
            }),
        ],
        pending_frames: 0,
    };

    let mut driver = FrameDriver::new(map, config);
    driver.on_context_created(RecordingGl::new());
    driver.on_surface_changed(SURFACE_WIDTH, SURFACE_HEIGHT);
    if driver.check_gl_error("surface setup") {
        log::warn!("gpu errors while configuring the surface");
    }

    let mut drawn = 0;
    while drawn < frames && driver.map().pending_frames > 0 {
        driver.map_mut().pending_frames -= 1;
        driver.on_draw_frame();
        drawn += 1;

        // simulate a rotation halfway through, which resizes the surface
        if drawn == frames / 2 {
            driver.map().viewport.lock().width = SURFACE_HEIGHT as f32;
            driver.map().viewport.lock().height = SURFACE_WIDTH as f32;
            driver.on_surface_changed(SURFACE_HEIGHT, SURFACE_WIDTH);
        }
    }

    let pool = driver.pool();
    log::info!(
        "drew {drawn} frames, {} scratch buffers, {} retained buffer bytes",
        pool.total_count(),
        driver.buffer_objects().retained_bytes()
    );

    if let Some(gl) = driver.gl() {
        let uploads = gl
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::BufferData { .. }))
            .count();
        log::info!(
            "{} gpu calls recorded, {uploads} buffer uploads, {} live buffers",
            gl.calls().len(),
            gl.live_buffer_count()
        );
    }

    Ok(())
}
