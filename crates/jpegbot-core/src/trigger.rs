use std::collections::HashSet;

use crate::config::{AuthorsConfig, Config};

/// True if any trigger phrase occurs in `body`, ignoring case.
/// An empty trigger list never matches; an empty phrase matches every body.
pub fn matches<S: AsRef<str>>(body: &str, triggers: &[S]) -> bool {
    let body = body.to_lowercase();
    triggers
        .iter()
        .any(|t| body.contains(&t.as_ref().to_lowercase()))
}

/// Case-insensitive allow/deny check. An empty allow list admits everyone;
/// the deny list always wins.
pub fn author_allowed<S: AsRef<str>>(author: &str, allow: &[S], deny: &[S]) -> bool {
    let eq = |s: &S| s.as_ref().to_lowercase() == author.to_lowercase();
    if !allow.is_empty() && !allow.iter().any(eq) {
        return false;
    }
    !deny.iter().any(eq)
}

// ---------------------------------------------------------------------------
// TriggerSet
// ---------------------------------------------------------------------------

/// Trigger phrases, lowercased once at construction.
#[derive(Debug, Clone, Default)]
pub struct TriggerSet {
    phrases: Vec<String>,
}

impl TriggerSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.triggers)
    }

    pub fn matches(&self, body: &str) -> bool {
        let body = body.to_lowercase();
        self.phrases.iter().any(|p| body.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AuthorFilter
// ---------------------------------------------------------------------------

/// Allow/deny lists with names lowercased once at construction.
#[derive(Debug, Clone, Default)]
pub struct AuthorFilter {
    allow: HashSet<String>,
    deny: HashSet<String>,
}

impl AuthorFilter {
    pub fn new<S: AsRef<str>>(allow: &[S], deny: &[S]) -> Self {
        let lower = |names: &[S]| -> HashSet<String> {
            names.iter().map(|n| n.as_ref().to_lowercase()).collect()
        };
        Self {
            allow: lower(allow),
            deny: lower(deny),
        }
    }

    pub fn from_config(authors: &AuthorsConfig) -> Self {
        Self::new(authors.allow.as_slice(), authors.deny.as_slice())
    }

    pub fn allows(&self, author: &str) -> bool {
        let author = author.to_lowercase();
        if !self.allow.is_empty() && !self.allow.contains(&author) {
            return false;
        }
        !self.deny.contains(&author)
    }
}
