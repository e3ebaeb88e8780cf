use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File and directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "jpegbot.yaml";
pub const DB_FILE: &str = "jpegbot.db";
pub const SCRATCH_DIR: &str = "temp";

/// Suffix appended to the file stem of a recompressed artifact.
pub const COMPRESSED_SUFFIX: &str = "_c.jpg";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path against the directory holding the config file.
/// Absolute paths are returned unchanged.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

/// Destination of a downloaded asset inside the scratch directory.
pub fn download_path(scratch: &Path, id: &str, extension: &str) -> PathBuf {
    scratch.join(format!("{id}.{extension}"))
}

/// Output path for the recompressed copy of `source`: same directory,
/// same stem, `_c.jpg` suffix.
pub fn compressed_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{COMPRESSED_SUFFIX}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
