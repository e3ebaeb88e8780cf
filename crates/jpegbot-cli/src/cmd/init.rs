use anyhow::Context;
use jpegbot_core::config::Config;
use std::path::Path;

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("  exists:  {}", config_path.display());
        return Ok(());
    }

    Config::default()
        .save(config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!("  created: {}", config_path.display());
    println!();
    println!("Fill in the reddit and imgur credentials, then run: jpegbot validate");
    Ok(())
}
