use crate::error::{BotError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder in `reply_template` replaced with the published image link.
pub const LINK_PLACEHOLDER: &str = "{link}";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// AuthorsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorsConfig {
    /// When non-empty, only these authors are answered.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Never answered, even when allow-listed.
    #[serde(default)]
    pub deny: Vec<String>,
}

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

/// Markers identifying links to the supported image host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Substring a submission URL must contain to be considered at all.
    #[serde(default = "default_site_marker")]
    pub site: String,
    /// Prefix (after the scheme) of a direct asset link, e.g. `i.imgur.com/ID.jpg`.
    #[serde(default = "default_direct_marker")]
    pub direct: String,
    /// Prefix (after the scheme) of an indirect page link, e.g. `imgur.com/ID`.
    #[serde(default = "default_indirect_marker")]
    pub indirect: String,
}

fn default_site_marker() -> String {
    "imgur.com".to_string()
}

fn default_direct_marker() -> String {
    "i.imgur.com/".to_string()
}

fn default_indirect_marker() -> String {
    "imgur.com/".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            site: default_site_marker(),
            direct: default_direct_marker(),
            indirect: default_indirect_marker(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_db_file() -> PathBuf {
    PathBuf::from(paths::DB_FILE)
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(paths::SCRATCH_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Submit attempts per reply while rate limited. `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

// ---------------------------------------------------------------------------
// Collaborator credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_reddit_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_reddit_api_url")]
    pub api_url: String,
}

fn default_user_agent() -> String {
    "MoreJPEGCompBot/0.1 by /u/Arwic".to_string()
}

fn default_reddit_auth_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_reddit_api_url() -> String {
    "https://oauth.reddit.com".to_string()
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            auth_url: default_reddit_auth_url(),
            api_url: default_reddit_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgurConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_imgur_api_url")]
    pub api_url: String,
}

fn default_imgur_api_url() -> String {
    "https://api.imgur.com".to_string()
}

impl Default for ImgurConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_url: default_imgur_api_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discussion spaces to poll; joined with `+` into one multi-space query.
    #[serde(default = "default_spaces")]
    pub spaces: Vec<String>,
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub authors: AuthorsConfig,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_submissions")]
    pub max_submissions: u32,
    /// JPEG quality, 0-100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_reply_template")]
    pub reply_template: String,
    #[serde(default = "default_upload_title")]
    pub upload_title: String,
    #[serde(default)]
    pub hosts: HostConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub imgur: ImgurConfig,
}

fn default_spaces() -> Vec<String> {
    vec!["Arwic".to_string()]
}

fn default_triggers() -> Vec<String> {
    [
        "needs more jpeg compression",
        "needs more jpg compression",
        "nice jpeg",
        "nice jpg",
        "needs more jpeg",
        "needs more jpg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_submissions() -> u32 {
    100
}

pub fn default_quality() -> u8 {
    5
}

fn default_reply_template() -> String {
    "\n[Here you go]({link})\n\n---\n\n\
     ^This ^message ^was ^created ^by ^a ^bot \
     [^[Contact ^author]](http://np.reddit.com/message/compose/?to=Arwic&amp;subject=MoreJPEGCompBot)\
     [^[Source ^code]](https://github.com/Arwic/RedditBots)\n"
        .to_string()
}

fn default_upload_title() -> String {
    "NEEDS MORE JPEG COMPRESSION".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spaces: default_spaces(),
            triggers: default_triggers(),
            authors: AuthorsConfig::default(),
            poll_interval_secs: default_poll_interval(),
            max_submissions: default_max_submissions(),
            quality: default_quality(),
            reply_template: default_reply_template(),
            upload_title: default_upload_title(),
            hosts: HostConfig::default(),
            storage: StorageConfig::default(),
            retry: RetryConfig::default(),
            reddit: RedditConfig::default(),
            imgur: ImgurConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BotError::Config(format!(
                "config file not found: {} (run 'jpegbot init')",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Multi-space query string, e.g. `pics+funny`.
    pub fn space_query(&self) -> String {
        self.spaces.join("+")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn render_reply(&self, link: &str) -> String {
        self.reply_template.replace(LINK_PLACEHOLDER, link)
    }

    /// Replace credentials with values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Replace credentials with values from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut String); 4] = [
            ("JPEGBOT_REDDIT_CLIENT_ID", &mut self.reddit.client_id),
            ("JPEGBOT_REDDIT_CLIENT_SECRET", &mut self.reddit.client_secret),
            ("JPEGBOT_REDDIT_REFRESH_TOKEN", &mut self.reddit.refresh_token),
            ("JPEGBOT_IMGUR_CLIENT_ID", &mut self.imgur.client_id),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.spaces.iter().all(|s| s.trim().is_empty()) {
            error("spaces must name at least one discussion space".to_string());
        }
        if self.quality > 100 {
            error(format!("quality={} is outside 0-100", self.quality));
        }
        if self.poll_interval_secs == 0 {
            error("poll_interval_secs must be greater than zero".to_string());
        }
        if self.max_submissions == 0 {
            error("max_submissions must be greater than zero".to_string());
        }
        if !self.reply_template.contains(LINK_PLACEHOLDER) {
            error(format!(
                "reply_template does not contain the {LINK_PLACEHOLDER} placeholder"
            ));
        }
        for (name, marker) in [
            ("hosts.site", &self.hosts.site),
            ("hosts.direct", &self.hosts.direct),
            ("hosts.indirect", &self.hosts.indirect),
        ] {
            if marker.trim().is_empty() {
                error(format!("{name} must not be empty"));
            }
        }

        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };

        if self.triggers.is_empty() {
            warn("triggers is empty: no comment will ever match".to_string());
        } else if self.triggers.iter().any(|t| t.trim().is_empty()) {
            warn("triggers contains a blank phrase: every comment will match".to_string());
        }
        if self.max_submissions > crate::reddit::MAX_LISTING {
            warn(format!(
                "max_submissions={} exceeds the listing page size; only the newest {} are scanned",
                self.max_submissions,
                crate::reddit::MAX_LISTING
            ));
        }
        for (name, value, env) in [
            (
                "reddit.client_id",
                &self.reddit.client_id,
                "JPEGBOT_REDDIT_CLIENT_ID",
            ),
            (
                "reddit.client_secret",
                &self.reddit.client_secret,
                "JPEGBOT_REDDIT_CLIENT_SECRET",
            ),
            (
                "reddit.refresh_token",
                &self.reddit.refresh_token,
                "JPEGBOT_REDDIT_REFRESH_TOKEN",
            ),
            (
                "imgur.client_id",
                &self.imgur.client_id,
                "JPEGBOT_IMGUR_CLIENT_ID",
            ),
        ] {
            if value.trim().is_empty() {
                warn(format!("{name} is empty; set it or export {env}"));
            }
        }
        for author in &self.authors.allow {
            if self
                .authors
                .deny
                .iter()
                .any(|d| d.eq_ignore_ascii_case(author))
            {
                warn(format!(
                    "author '{author}' is in both allow and deny lists; deny wins"
                ));
            }
        }

        warnings
    }

    /// Fail with [`BotError::Config`] if validation reports any error.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BotError::Config(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
