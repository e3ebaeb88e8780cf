use super::load_config;
use crate::output::print_json;
use jpegbot_core::config::WarnLevel;
use std::path::Path;

pub fn validate(config_path: &Path, quality: Option<u8>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path, quality)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "config": config_path.display().to_string(),
            "quality": config.quality,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
