use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::image_pipeline::{resolve_host_id, ImagePipeline};
use crate::platform::{Comment, DiscussionPlatform, Submission};
use crate::retry::{RetryPolicy, Sleeper};

/// Characters of a comment body kept in log lines.
pub const LOG_BODY_LEN: usize = 20;

pub fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(LOG_BODY_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The reply was accepted and links to `link`.
    Replied { link: String },
    /// The submission URL did not yield an image id; nothing was done.
    Unresolvable,
}

/// Turns a matched comment into a posted reply.
pub struct ReplyPipeline<'c> {
    config: &'c Config,
    images: ImagePipeline,
    retry: RetryPolicy,
}

impl<'c> ReplyPipeline<'c> {
    pub fn new(config: &'c Config, images: ImagePipeline) -> Self {
        Self {
            config,
            images,
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Fetch, recompress and publish the submission's image, then reply to
    /// `comment` with the link.
    ///
    /// Rate limits on the submit call are retried per the policy without
    /// rerunning the image stages. Every other failure is returned.
    pub fn reply(
        &mut self,
        platform: &mut dyn DiscussionPlatform,
        sleeper: &dyn Sleeper,
        submission: &Submission,
        comment: &Comment,
    ) -> Result<ReplyOutcome> {
        info!(
            comment_id = %comment.id,
            author = comment.author.as_deref().unwrap_or("[deleted]"),
            body = truncate_for_log(&comment.body),
            "replying to comment"
        );

        let Some(id) = resolve_host_id(&submission.url, &self.config.hosts) else {
            warn!(url = %submission.url, "could not resolve image id, skipping");
            return Ok(ReplyOutcome::Unresolvable);
        };

        let link = self.images.process(&id, &self.config.upload_title)?;
        let text = self.config.render_reply(&link);

        self.retry
            .run(sleeper, || platform.reply(comment, &text))?;
        info!(comment_id = %comment.id, %link, "reply submitted");
        Ok(ReplyOutcome::Replied { link })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
