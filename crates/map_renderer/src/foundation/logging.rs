//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit filter
///
/// `filter` follows the `env_logger` syntax, e.g. `"info,map_renderer=debug"`.
/// A `RUST_LOG` variable still wins when set so a running viewer can be
/// made noisier without a rebuild.
pub fn init_with_filter(filter: &str) {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(env_filter) => builder.parse_filters(&env_filter),
        Err(_) => builder.parse_filters(filter),
    };

    // Ignore a second initialization, e.g. from tests sharing a process
    if builder.try_init().is_ok() {
        log::debug!("logging initialized");
    }
}
