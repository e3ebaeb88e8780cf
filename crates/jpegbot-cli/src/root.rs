use jpegbot_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config` flag / `JPEGBOT_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `jpegbot.yaml`
/// 3. Fall back to `cwd/jpegbot.yaml`
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd).unwrap_or_else(|| paths::config_path(&cwd))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(paths::config_path)
        .find(|candidate| candidate.is_file())
}

/// Directory that relative storage paths are resolved against.
pub fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
