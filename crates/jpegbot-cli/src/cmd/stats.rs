use super::load_config;
use crate::output::{print_json, print_table};
use crate::root::config_dir;
use anyhow::Context;
use jpegbot_core::{dedup::SqliteDedupStore, paths};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Stats {
    db_file: String,
    processed: u64,
}

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path, None)?;
    let db_path = paths::resolve(&config_dir(config_path), &config.storage.db_file);

    // A store that was never opened has processed nothing; don't create it.
    let processed = if db_path.exists() {
        SqliteDedupStore::open(&db_path)
            .and_then(|store| store.count())
            .with_context(|| format!("failed to read {}", db_path.display()))?
    } else {
        0
    };

    let stats = Stats {
        db_file: db_path.display().to_string(),
        processed,
    };
    if json {
        print_json(&stats)?;
    } else {
        print_table(
            &["db_file", "processed"],
            &[vec![stats.db_file, stats.processed.to_string()]],
        );
    }
    Ok(())
}
