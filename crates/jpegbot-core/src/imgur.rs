//! Imgur implementation of [`ImageHost`] using anonymous (Client-ID) access.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tracing::info;

use crate::config::ImgurConfig;
use crate::error::{BotError, Result};
use crate::paths;
use crate::platform::ImageHost;

const SERVICE: &str = "imgur";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    link: String,
    #[serde(default, rename = "type")]
    mime: Option<String>,
}

/// File extension for a downloaded asset: the link's own extension, else the
/// MIME subtype, else `jpg`.
fn extension_for(link: &str, mime: Option<&str>) -> String {
    let path = link.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    if let Some((_, ext)) = file.rsplit_once('.') {
        if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_ascii_lowercase();
        }
    }
    mime.and_then(|m| m.split('/').nth(1))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

pub struct ImgurClient {
    http: Client,
    api_url: String,
}

impl ImgurClient {
    pub fn new(config: &ImgurConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Client-ID {}", config.client_id.trim()))
                .map_err(|e| BotError::Config(format!("invalid imgur.client_id: {e}")))?,
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::Config(format!("failed to build imgur client: {e}")))?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check the client id against the credits endpoint.
    pub fn authenticate(&self) -> Result<()> {
        info!("authenticating with imgur");
        let auth = |message: String| BotError::Auth {
            service: SERVICE,
            message,
        };
        let response = self
            .http
            .get(format!("{}/3/credits", self.api_url))
            .send()
            .map_err(|e| auth(format!("credits request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(auth(format!("credits endpoint returned {}", status.as_u16())));
        }
        info!("imgur authentication succeeded");
        Ok(())
    }

    fn image_info(&self, id: &str) -> Result<ImageData> {
        let response = self
            .http
            .get(format!("{}/3/image/{}", self.api_url, id))
            .send()
            .map_err(|e| BotError::Fetch(format!("{id}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Fetch(format!(
                "{id}: image info returned {}",
                status.as_u16()
            )));
        }
        let envelope: Envelope<ImageData> = response
            .json()
            .map_err(|e| BotError::Fetch(format!("{id}: unreadable image info: {e}")))?;
        Ok(envelope.data)
    }
}

impl ImageHost for ImgurClient {
    fn download(&mut self, id: &str, dir: &Path) -> Result<PathBuf> {
        let info = self.image_info(id)?;
        let response = self
            .http
            .get(&info.link)
            .send()
            .map_err(|e| BotError::Fetch(format!("{}: {e}", info.link)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Fetch(format!(
                "{}: download returned {}",
                info.link,
                status.as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| BotError::Fetch(format!("{}: {e}", info.link)))?;

        let extension = extension_for(&info.link, info.mime.as_deref());
        let path = paths::download_path(dir, id, &extension);
        crate::io::atomic_write(&path, &bytes)?;
        Ok(path)
    }

    fn upload(&mut self, path: &Path, title: &str) -> Result<String> {
        let encoded = BASE64.encode(std::fs::read(path)?);
        let response = self
            .http
            .post(format!("{}/3/image", self.api_url))
            .form(&[
                ("image", encoded.as_str()),
                ("type", "base64"),
                ("title", title),
            ])
            .send()
            .map_err(|e| BotError::Publish(format!("{}: {e}", path.display())))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BotError::Publish(format!(
                "upload returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        let envelope: Envelope<ImageData> = response
            .json()
            .map_err(|e| BotError::Publish(format!("unreadable upload response: {e}")))?;
        Ok(envelope.data.link)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
