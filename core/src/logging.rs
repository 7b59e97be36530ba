//! Logger setup for binaries, benches and tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialise `env_logger` once; later calls are ignored.
///
/// `filter` uses `env_logger` syntax (e.g. `"gpu_printf=debug,wgpu=warn"`).
/// Without it `RUST_LOG` is honoured, falling back to `info`.
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        // A logger installed elsewhere (e.g. by a test harness) wins.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(Some("warn"));
        init_logging(None);
        log::warn!("logger still usable");
    }
}
