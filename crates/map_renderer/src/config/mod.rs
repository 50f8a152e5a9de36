//! Configuration system
//!
//! Renderer settings are plain serde structs loadable from TOML or RON files.
//! Everything has a default so a viewer can run without a config file.

pub use serde::{Serialize, Deserialize};

use crate::gl::buffer_objects::{BUFFER_CACHE_LIMIT_BYTES, BUFFER_OBJECT_WORKING_SET};
use crate::render::buffer_pool::MIN_SCRATCH_BYTES;
use crate::render::surface::{MAX_QUADS, MAX_QUAD_CAPACITY};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            Self::from_toml_str(&contents)
        } else if path.ends_with(".ron") {
            Self::from_ron_str(&contents)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Parse configuration from a TOML document
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from a RON document
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Dark gray, the viewer background until a theme sets its own
pub const DEFAULT_BACKGROUND_COLOR: u32 = 0xFF44_4444;

/// # Renderer Configuration
///
/// Tuning knobs for the frame driver. Missing fields in a config file fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of quads covered by the shared quad index buffer
    pub max_quads: usize,

    /// Smallest size a transient scratch buffer grows to, in bytes
    pub min_scratch_bytes: usize,

    /// Buffer ids pre-generated by the buffer object tracker on context creation
    pub buffer_object_working_set: usize,

    /// Retained buffer object bytes above which the tracker sheds storage
    pub buffer_cache_limit_bytes: usize,

    /// Query the GPU error state after every layer renderer
    pub check_gl_errors: bool,

    /// Shrink the rendered world to reveal tile selection boundaries
    pub debug_view: bool,

    /// Initial background color as ARGB
    pub background_color: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_quads: MAX_QUADS,
            min_scratch_bytes: MIN_SCRATCH_BYTES,
            buffer_object_working_set: BUFFER_OBJECT_WORKING_SET,
            buffer_cache_limit_bytes: BUFFER_CACHE_LIMIT_BYTES,
            check_gl_errors: cfg!(debug_assertions),
            debug_view: false,
            background_color: DEFAULT_BACKGROUND_COLOR,
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Set the shared quad capacity
    ///
    /// Clamped so every index still fits a 16-bit index buffer.
    pub fn with_max_quads(mut self, max_quads: usize) -> Self {
        self.max_quads = max_quads.clamp(1, MAX_QUAD_CAPACITY);
        self
    }

    /// Apply the builder bounds to values that bypassed the setters
    ///
    /// Config files are deserialized field by field, so a loaded
    /// `max_quads` or `min_scratch_bytes` may be out of range.
    pub fn validated(self) -> Self {
        let max_quads = self.max_quads;
        let min_scratch_bytes = self.min_scratch_bytes;
        let config = self
            .with_max_quads(max_quads)
            .with_min_scratch_bytes(min_scratch_bytes);
        if config.max_quads != max_quads {
            log::warn!("max_quads {max_quads} out of range, using {}", config.max_quads);
        }
        config
    }

    /// Set the minimum scratch buffer size
    pub fn with_min_scratch_bytes(mut self, bytes: usize) -> Self {
        self.min_scratch_bytes = bytes.max(4);
        self
    }

    /// Set the buffer object working set hint
    pub fn with_buffer_object_working_set(mut self, count: usize) -> Self {
        self.buffer_object_working_set = count;
        self
    }

    /// Set the retained buffer object limit
    pub fn with_buffer_cache_limit_bytes(mut self, bytes: usize) -> Self {
        self.buffer_cache_limit_bytes = bytes;
        self
    }

    /// Enable or disable per-renderer GPU error checks
    pub fn with_gl_error_checks(mut self, enable: bool) -> Self {
        self.check_gl_errors = enable;
        self
    }

    /// Enable or disable the shrunken debug view
    pub fn with_debug_view(mut self, enable: bool) -> Self {
        self.debug_view = enable;
        self
    }

    /// Set the initial background color (ARGB)
    pub fn with_background_color(mut self, argb: u32) -> Self {
        self.background_color = argb;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.max_quads, 64);
        assert_eq!(config.min_scratch_bytes, 1 << 15);
        assert_eq!(config.buffer_object_working_set, 200);
        assert_eq!(config.background_color, 0xFF44_4444);
        assert!(!config.debug_view);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = RendererConfig::from_toml_str(
            "debug_view = true\nmax_quads = 128\n",
        ).unwrap();

        assert!(config.debug_view);
        assert_eq!(config.max_quads, 128);
        assert_eq!(config.min_scratch_bytes, MIN_SCRATCH_BYTES);
    }

    #[test]
    fn test_loaded_max_quads_is_clamped_by_validation() {
        let config = RendererConfig::from_toml_str("max_quads = 20000").unwrap();
        assert_eq!(config.max_quads, 20_000);

        let config = config.validated();
        assert_eq!(config.max_quads, MAX_QUAD_CAPACITY);
        assert_eq!(RendererConfig::default().validated(), RendererConfig::default());
    }

    #[test]
    fn test_ron_parsing() {
        let config = RendererConfig::from_ron_str(
            "(check_gl_errors: false, background_color: 4278190080)",
        ).unwrap();

        assert!(!config.check_gl_errors);
        assert_eq!(config.background_color, 0xFF00_0000);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = RendererConfig::from_toml_str("max_quads = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = RendererConfig::default().save_to_file("renderer.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_builder_clamps_max_quads() {
        let config = RendererConfig::default().with_max_quads(1_000_000);
        assert_eq!(config.max_quads, MAX_QUAD_CAPACITY);
        assert_eq!(RendererConfig::default().with_max_quads(0).max_quads, 1);
    }
}
