//! Poll loop: list new submissions, walk their comments, reply to matches.
//!
//! ```text
//!   Idle ──tick──▶ Scanning ──pass done / pass error──▶ Idle
//!     └──────────── interrupt ─────────────▶ stop
//! ```
//!
//! Per comment, in order: skip deleted authors, check-and-mark in the dedup
//! store, apply the author filter, match triggers, then reply. The dedup mark
//! is written before the reply is attempted, so a comment whose reply fails
//! is not retried on a later pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dedup::DedupStore;
use crate::error::{BotError, Result, Severity};
use crate::platform::{Comment, DiscussionPlatform, Submission};
use crate::reply::{truncate_for_log, ReplyOutcome, ReplyPipeline};
use crate::retry::Sleeper;
use crate::trigger::{AuthorFilter, TriggerSet};

// ---------------------------------------------------------------------------
// ScanReport
// ---------------------------------------------------------------------------

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub submissions: usize,
    pub unsupported_submissions: usize,
    pub comments: usize,
    pub deleted: usize,
    pub duplicates: usize,
    pub filtered_authors: usize,
    pub unmatched: usize,
    pub replied: usize,
    pub unresolvable: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Deleted,
    Duplicate,
    FilteredAuthor,
    Unmatched,
    Reply,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct Scanner<'c> {
    config: &'c Config,
    triggers: TriggerSet,
    authors: AuthorFilter,
    platform: Box<dyn DiscussionPlatform>,
    store: Box<dyn DedupStore>,
    replies: ReplyPipeline<'c>,
    sleeper: Box<dyn Sleeper>,
}

impl<'c> Scanner<'c> {
    pub fn new(
        config: &'c Config,
        platform: Box<dyn DiscussionPlatform>,
        store: Box<dyn DedupStore>,
        replies: ReplyPipeline<'c>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        let triggers = TriggerSet::from_config(config);
        if triggers.is_empty() {
            warn!("no trigger phrases configured, no comment will be answered");
        }
        Self {
            config,
            triggers,
            authors: AuthorFilter::from_config(&config.authors),
            platform,
            store,
            replies,
            sleeper,
        }
    }

    /// Poll until interrupted. Pass-level failures are logged and the loop
    /// waits for the next tick; only process-level errors other than an
    /// interrupt are returned.
    pub fn run(&mut self) -> Result<()> {
        let interval = self.config.poll_interval();
        loop {
            let started: DateTime<Utc> = Utc::now();
            match self.scan_once() {
                Ok(report) => info!(
                    started = %started.to_rfc3339(),
                    submissions = report.submissions,
                    comments = report.comments,
                    replied = report.replied,
                    failed = report.failed,
                    duplicates = report.duplicates,
                    "scan pass complete"
                ),
                Err(BotError::Interrupted) => {
                    info!("interrupted, stopping");
                    return Ok(());
                }
                Err(e) if e.severity() == Severity::Process => return Err(e),
                Err(e) => error!(error = %e, "scan pass failed"),
            }

            info!(secs = interval.as_secs(), "running again after poll interval");
            match self.sleeper.sleep(interval) {
                Ok(()) => {}
                Err(BotError::Interrupted) => {
                    info!("interrupted, stopping");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One pass over the newest submissions.
    pub fn scan_once(&mut self) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let space = self.config.space_query();
        info!(%space, "scanning");

        let submissions = self
            .platform
            .new_submissions(&space, self.config.max_submissions)?;
        for submission in &submissions {
            report.submissions += 1;
            debug!(
                submission_id = %submission.id,
                author = submission.author.as_deref().unwrap_or("[deleted]"),
                "parsing submission"
            );
            if !submission.url.contains(self.config.hosts.site.as_str()) {
                debug!(url = %submission.url, "submission not supported");
                report.unsupported_submissions += 1;
                continue;
            }
            self.scan_submission(submission, &mut report)?;
        }
        Ok(report)
    }

    fn scan_submission(&mut self, submission: &Submission, report: &mut ScanReport) -> Result<()> {
        let comments = self.platform.comments(submission)?;
        for comment in &comments {
            report.comments += 1;
            match self.judge(comment)? {
                Verdict::Deleted => report.deleted += 1,
                Verdict::Duplicate => report.duplicates += 1,
                Verdict::FilteredAuthor => report.filtered_authors += 1,
                Verdict::Unmatched => report.unmatched += 1,
                Verdict::Reply => {
                    match self.replies.reply(
                        self.platform.as_mut(),
                        self.sleeper.as_ref(),
                        submission,
                        comment,
                    ) {
                        Ok(ReplyOutcome::Replied { .. }) => report.replied += 1,
                        Ok(ReplyOutcome::Unresolvable) => report.unresolvable += 1,
                        Err(e) if e.severity() == Severity::Comment => {
                            warn!(comment_id = %comment.id, error = %e, "reply abandoned");
                            report.failed += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(())
    }

    fn judge(&mut self, comment: &Comment) -> Result<Verdict> {
        let Some(author) = comment.author.as_deref() else {
            debug!(comment_id = %comment.id, "comment deleted or removed, ignoring");
            return Ok(Verdict::Deleted);
        };
        debug!(
            comment_id = %comment.id,
            author,
            body = truncate_for_log(&comment.body),
            "parsing comment"
        );
        if self.store.has_been_processed(&comment.id)? {
            debug!(comment_id = %comment.id, "already processed, ignoring");
            return Ok(Verdict::Duplicate);
        }
        if !self.authors.allows(author) {
            debug!(author, "author filtered, ignoring comment");
            return Ok(Verdict::FilteredAuthor);
        }
        if !self.triggers.matches(&comment.body) {
            return Ok(Verdict::Unmatched);
        }
        Ok(Verdict::Reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
