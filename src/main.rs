use anyhow::Context;

use silhouette::{AppConfig, init_logging, run};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid command line")?;
    init_logging(config.logging.clone());

    log::info!(
        "starting {} ({}x{}, {}, camera {:?})",
        config.title,
        config.width,
        config.height,
        if config.composite { "composited" } else { "direct" },
        config.camera_mode
    );

    run(config).context("sandbox exited with an error")
}
