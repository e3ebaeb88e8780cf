use super::load_config;
use crate::output::{print_json, print_table};
use crate::root::config_dir;
use anyhow::Context;
use jpegbot_core::{
    dedup::SqliteDedupStore,
    image_pipeline::ImagePipeline,
    imgur::ImgurClient,
    io, paths,
    reddit::RedditClient,
    reply::ReplyPipeline,
    retry::{Shutdown, ThreadSleeper},
    scan::{ScanReport, Scanner},
    BotError,
};
use std::path::Path;
use tracing::info;

pub fn run(config_path: &Path, quality: Option<u8>, once: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path, quality)?;
    config.ensure_valid()?;

    let root = config_dir(config_path);
    let db_path = paths::resolve(&root, &config.storage.db_file);
    let scratch = paths::resolve(&root, &config.storage.scratch_dir);

    let mut reddit = RedditClient::new(&config.reddit)?;
    reddit.authenticate()?;
    let imgur = ImgurClient::new(&config.imgur)?;
    imgur.authenticate()?;

    let store = SqliteDedupStore::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    io::ensure_dir(&scratch)
        .with_context(|| format!("failed to create {}", scratch.display()))?;
    info!(
        db = %db_path.display(),
        scratch = %scratch.display(),
        quality = config.quality,
        spaces = %config.space_query(),
        "starting"
    );

    let shutdown = Shutdown::new();
    watch_ctrl_c(shutdown.clone())?;

    let images = ImagePipeline::new(Box::new(imgur), scratch, config.quality);
    let replies = ReplyPipeline::new(&config, images);
    let mut scanner = Scanner::new(
        &config,
        Box::new(reddit),
        Box::new(store),
        replies,
        Box::new(ThreadSleeper::new(shutdown)),
    );

    if once {
        return match once_outcome(scanner.scan_once())? {
            Some(report) => print_report(&report, json),
            None => Ok(()),
        };
    }
    scanner.run()?;
    Ok(())
}

/// An interrupt during a single pass is a clean stop, not a failure.
fn once_outcome(result: Result<ScanReport, BotError>) -> anyhow::Result<Option<ScanReport>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(BotError::Interrupted) => {
            info!("interrupted, stopping");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Trip `shutdown` on the first Ctrl-C. The signal is awaited on its own
/// thread so the blocking scan loop never has to poll a runtime.
fn watch_ctrl_c(shutdown: Shutdown) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            rt.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, stopping after the current step");
                    shutdown.trigger();
                }
            })
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

fn print_report(report: &ScanReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    let rows: Vec<Vec<String>> = [
        ("submissions", report.submissions),
        ("unsupported_submissions", report.unsupported_submissions),
        ("comments", report.comments),
        ("deleted", report.deleted),
        ("duplicates", report.duplicates),
        ("filtered_authors", report.filtered_authors),
        ("unmatched", report.unmatched),
        ("replied", report.replied),
        ("unresolvable", report.unresolvable),
        ("failed", report.failed),
    ]
    .into_iter()
    .map(|(stage, count)| vec![stage.to_string(), count.to_string()])
    .collect();
    print_table(&["stage", "count"], &rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_pass_is_a_clean_stop() {
        assert!(once_outcome(Err(BotError::Interrupted)).unwrap().is_none());
    }

    #[test]
    fn completed_pass_yields_its_report() {
        let report = ScanReport {
            replied: 2,
            ..ScanReport::default()
        };
        assert_eq!(once_outcome(Ok(report.clone())).unwrap(), Some(report));
    }

    #[test]
    fn other_failures_still_surface() {
        let err = once_outcome(Err(BotError::Platform("503".into()))).unwrap_err();
        assert!(err.to_string().contains("503"), "{err}");
    }
}
