use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::error::Result;
use crate::paths;
use crate::platform::ImageHost;

/// Extract the host's image id from a submission URL.
///
/// Direct asset links (`i.imgur.com/ID.ext`) lose their extension; indirect
/// page links (`imgur.com/ID`) are taken as-is. Either scheme is accepted.
/// Albums, galleries and anything else yield `None`.
pub fn resolve_host_id(url: &str, hosts: &HostConfig) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    // The direct marker usually contains the indirect one, so test it first.
    if let Some(asset) = rest.strip_prefix(hosts.direct.as_str()) {
        let (stem, _ext) = asset.rsplit_once('.')?;
        return valid_id(stem);
    }
    if let Some(page) = rest.strip_prefix(hosts.indirect.as_str()) {
        return valid_id(page.trim_end_matches('/'));
    }
    None
}

fn valid_id(candidate: &str) -> Option<String> {
    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Re-encode `source` as a JPEG at `quality` next to the original, replacing
/// any stale output. Returns the output path (`<stem>_c.jpg`).
///
/// The codec's lowest setting is 1, so 0 is treated as 1.
pub fn recompress(source: &Path, quality: u8) -> Result<PathBuf> {
    let target = paths::compressed_path(source);
    crate::io::remove_if_exists(&target)?;

    let decoded = image::open(source)?;
    // JPEG carries no alpha channel.
    let rgb = decoded.to_rgb8();

    let mut out = BufWriter::new(File::create(&target)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;
    drop(encoder);
    std::io::Write::flush(&mut out)?;

    debug!(source = %source.display(), target = %target.display(), quality, "recompressed");
    Ok(target)
}

// ---------------------------------------------------------------------------
// ImagePipeline
// ---------------------------------------------------------------------------

/// Fetch → recompress → publish, with one quality setting for the whole run.
pub struct ImagePipeline {
    host: Box<dyn ImageHost>,
    scratch_dir: PathBuf,
    quality: u8,
}

impl ImagePipeline {
    pub fn new(host: Box<dyn ImageHost>, scratch_dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            host,
            scratch_dir: scratch_dir.into(),
            quality,
        }
    }

    pub fn fetch(&mut self, id: &str) -> Result<PathBuf> {
        info!(id, "downloading image");
        let path = self.host.download(id, &self.scratch_dir)?;
        debug!(path = %path.display(), "downloaded");
        Ok(path)
    }

    pub fn recompress(&self, path: &Path) -> Result<PathBuf> {
        info!(path = %path.display(), quality = self.quality, "compressing image");
        recompress(path, self.quality)
    }

    pub fn publish(&mut self, path: &Path, title: &str) -> Result<String> {
        info!(path = %path.display(), "uploading image");
        let link = self.host.upload(path, title)?;
        info!(%link, "uploaded");
        Ok(link)
    }

    /// Run all three stages for `id` and return the published link.
    pub fn process(&mut self, id: &str, title: &str) -> Result<String> {
        let original = self.fetch(id)?;
        let compressed = self.recompress(&original)?;
        self.publish(&compressed, title)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
