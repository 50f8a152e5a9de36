//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types and matrix helpers
//! - Frame time management
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
