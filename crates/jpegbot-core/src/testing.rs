//! In-memory collaborators for driving scan passes in unit tests.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::dedup::DedupStore;
use crate::error::{BotError, Result};
use crate::platform::{Comment, DiscussionPlatform, ImageHost, Submission};
use crate::retry::Sleeper;

pub fn submission(id: &str, url: &str) -> Submission {
    Submission {
        id: id.to_string(),
        author: Some("poster".to_string()),
        url: url.to_string(),
    }
}

pub fn comment(id: &str, author: Option<&str>, body: &str) -> Comment {
    Comment {
        id: id.to_string(),
        author: author.map(str::to_string),
        body: body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Rc<RefCell<Vec<Duration>>>,
    /// Interrupt once this many sleeps have been recorded.
    interrupt_after: Option<usize>,
}

impl RecordingSleeper {
    pub fn interrupting_after(n: usize) -> Self {
        Self {
            interrupt_after: Some(n),
            ..Self::default()
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Result<()> {
        let mut sleeps = self.sleeps.borrow_mut();
        if self.interrupt_after.is_some_and(|n| sleeps.len() >= n) {
            return Err(BotError::Interrupted);
        }
        sleeps.push(duration);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakePlatform
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PlatformState {
    pub threads: Vec<(Submission, Vec<Comment>)>,
    pub listed_spaces: Vec<(String, u32)>,
    /// Successful replies as `(comment id, text)`.
    pub replies: Vec<(String, String)>,
    pub reply_attempts: usize,
    /// Waits returned as rate limits by the next reply attempts.
    pub rate_limits: VecDeque<Duration>,
    pub fail_listing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    pub state: Rc<RefCell<PlatformState>>,
}

impl FakePlatform {
    pub fn with_threads(threads: Vec<(Submission, Vec<Comment>)>) -> Self {
        let platform = Self::default();
        platform.state.borrow_mut().threads = threads;
        platform
    }
}

impl DiscussionPlatform for FakePlatform {
    fn new_submissions(&mut self, space: &str, limit: u32) -> Result<Vec<Submission>> {
        let mut state = self.state.borrow_mut();
        if state.fail_listing {
            return Err(BotError::Platform("503 service unavailable".into()));
        }
        state.listed_spaces.push((space.to_string(), limit));
        Ok(state
            .threads
            .iter()
            .take(limit as usize)
            .map(|(s, _)| s.clone())
            .collect())
    }

    fn comments(&mut self, submission: &Submission) -> Result<Vec<Comment>> {
        let state = self.state.borrow();
        Ok(state
            .threads
            .iter()
            .find(|(s, _)| s.id == submission.id)
            .map(|(_, c)| c.clone())
            .unwrap_or_default())
    }

    fn reply(&mut self, comment: &Comment, text: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.reply_attempts += 1;
        if let Some(retry_after) = state.rate_limits.pop_front() {
            return Err(BotError::RateLimited { retry_after });
        }
        state.replies.push((comment.id.clone(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HostState {
    pub downloads: Vec<String>,
    /// Uploads as `(path, title)`.
    pub uploads: Vec<(PathBuf, String)>,
    pub fail_downloads: bool,
    pub fail_uploads: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    pub state: Rc<RefCell<HostState>>,
}

impl ImageHost for FakeHost {
    fn download(&mut self, id: &str, dir: &Path) -> Result<PathBuf> {
        let mut state = self.state.borrow_mut();
        if state.fail_downloads {
            return Err(BotError::Fetch(format!("{id}: 404 not found")));
        }
        state.downloads.push(id.to_string());
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
        let path = dir.join(format!("{id}.png"));
        img.save(&path)?;
        Ok(path)
    }

    fn upload(&mut self, path: &Path, title: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        if state.fail_uploads {
            return Err(BotError::Publish("500 internal error".into()));
        }
        state.uploads.push((path.to_path_buf(), title.to_string()));
        Ok(format!("https://i.imgur.com/up{}.jpg", state.uploads.len()))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub seen: Rc<RefCell<HashSet<String>>>,
    pub unavailable: Rc<RefCell<bool>>,
}

impl DedupStore for MemoryStore {
    fn has_been_processed(&mut self, id: &str) -> Result<bool> {
        if *self.unavailable.borrow() {
            return Err(BotError::StorageUnavailable("database is locked".into()));
        }
        Ok(!self.seen.borrow_mut().insert(id.to_string()))
    }
}
