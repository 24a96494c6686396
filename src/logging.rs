use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "silhouette=debug,wgpu_core=info"). When unset, `RUST_LOG` is used, and
/// when that is unset too the level is `info`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// wgpu internals are chatty at info; explicit filters can still lower these.
const QUIET_MODULES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Info);
        for module in QUIET_MODULES {
            builder.filter_module(module, log::LevelFilter::Warn);
        }

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        }

        builder.write_style(config.write_style);
        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            log::warn!("a global logger was already installed");
        }

        log::debug!("logging initialized");
    });
}
