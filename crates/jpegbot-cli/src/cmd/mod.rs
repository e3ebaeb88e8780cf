pub mod config;
pub mod init;
pub mod run;
pub mod stats;

use anyhow::Context;
use jpegbot_core::config::Config;
use std::path::Path;

/// Load the config and layer environment credentials and the `--quality`
/// flag on top. Validation is left to the caller.
pub fn load_config(config_path: &Path, quality: Option<u8>) -> anyhow::Result<Config> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.apply_env_overrides();
    if let Some(q) = quality {
        config.quality = q;
    }
    Ok(config)
}
