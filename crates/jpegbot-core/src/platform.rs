//! Collaborator seams: the discussion platform the bot reads and replies on,
//! and the image host it downloads from and uploads to.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// A top-level post. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub url: String,
}

/// A reply under a submission. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// `None` when the comment or its account was deleted or removed.
    pub author: Option<String>,
    pub body: String,
}

pub trait DiscussionPlatform {
    /// Newest submissions in `space`, newest first, at most `limit`.
    fn new_submissions(&mut self, space: &str, limit: u32) -> Result<Vec<Submission>>;

    /// Comments under `submission`, in platform order.
    fn comments(&mut self, submission: &Submission) -> Result<Vec<Comment>>;

    /// Post `text` as a reply to `comment`.
    ///
    /// Returns [`BotError::RateLimited`](crate::BotError::RateLimited) when the
    /// platform asks the caller to wait before writing again.
    fn reply(&mut self, comment: &Comment, text: &str) -> Result<()>;
}

pub trait ImageHost {
    /// Download the asset `id` into `dir`, replacing any earlier download of
    /// the same asset. Returns the written path.
    fn download(&mut self, id: &str, dir: &Path) -> Result<PathBuf>;

    /// Upload `path` under `title` and return its public link.
    fn upload(&mut self, path: &Path, title: &str) -> Result<String>;
}
