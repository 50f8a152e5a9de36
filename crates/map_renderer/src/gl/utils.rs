//! GL diagnostics and color helpers

use super::{GlBinding, GlError};

/// Drain the error queue, logging every entry tagged with `label`
///
/// Returns `true` if any error was pending. Purely advisory: callers log and
/// carry on.
pub fn check_gl_error(gl: &mut dyn GlBinding, label: &str) -> bool {
    let mut any = false;
    while let Some(error) = gl.get_error() {
        log::error!("{label}: gl error {error}");
        any = true;
    }
    any
}

/// Drain the error queue and report whether the GPU ran out of memory
///
/// Other errors found on the way are logged, since draining discards them.
pub fn check_gl_out_of_memory(gl: &mut dyn GlBinding, label: &str) -> bool {
    let mut oom = false;
    while let Some(error) = gl.get_error() {
        if error == GlError::OutOfMemory {
            oom = true;
        } else {
            log::error!("{label}: gl error {error}");
        }
    }
    if oom {
        log::warn!("{label}: gl out of memory");
    }
    oom
}

/// Convert an ARGB color to normalized `[r, g, b, a]`
pub fn color_to_float(argb: u32) -> [f32; 4] {
    let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 / 255.0;
    [channel(16), channel(8), channel(0), channel(24)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::RecordingGl;
    use approx::assert_relative_eq;

    #[test]
    fn test_color_to_float() {
        let [r, g, b, a] = color_to_float(0x80FF_4400);
        assert_relative_eq!(r, 1.0);
        assert_relative_eq!(g, 0x44 as f32 / 255.0);
        assert_relative_eq!(b, 0.0);
        assert_relative_eq!(a, 0x80 as f32 / 255.0);
    }

    #[test]
    fn test_out_of_memory_detection_drains_queue() {
        let mut gl = RecordingGl::new();
        gl.push_error(GlError::InvalidValue);
        gl.push_error(GlError::OutOfMemory);

        assert!(check_gl_out_of_memory(&mut gl, "finish"));
        assert!(!check_gl_error(&mut gl, "after"));
    }

    #[test]
    fn test_check_without_errors() {
        let mut gl = RecordingGl::new();
        assert!(!check_gl_out_of_memory(&mut gl, "finish"));
    }
}
