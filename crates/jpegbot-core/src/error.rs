use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{service} rejected credentials: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    #[error("processed-comment store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("image fetch failed: {0}")]
    Fetch(String),

    #[error("image publish failed: {0}")]
    Publish(String),

    #[error("rate limited: retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("platform request failed: {0}")]
    Platform(String),

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// How far up the scan loop an error is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abandon the current reply; the pass continues with the next comment.
    Comment,
    /// Abandon the current pass; the loop resumes at the next tick.
    Pass,
    /// Stop the loop.
    Process,
}

impl BotError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Fetch(_) | Self::Publish(_) | Self::Image(_) | Self::Io(_) => Severity::Comment,
            Self::StorageUnavailable(_)
            | Self::Platform(_)
            | Self::Auth { .. }
            | Self::RateLimited { .. }
            | Self::Yaml(_)
            | Self::Json(_) => Severity::Pass,
            Self::Config(_) | Self::Interrupted => Severity::Process,
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
