//! Image resources referenced by panels.

use crate::error::{Error, Result};
use base64::Engine as _;
use image::DynamicImage;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Resolves an image URL into decoded pixels.
///
/// Loaders are called from a blocking worker thread.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, src: &Url) -> Result<DynamicImage>;
}

/// Loads `file:` and `data:` URLs from the local machine and fetches
/// `http:`/`https:` URLs over the network.
#[derive(Debug, Clone)]
pub struct DefaultResourceLoader {
    /// Timeout for network fetches
    pub timeout: Duration,
}

impl Default for DefaultResourceLoader {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn load(&self, src: &Url) -> Result<DynamicImage> {
        let bytes = match src.scheme() {
            "file" => read_file(src)?,
            "data" => decode_data_url(src)?,
            "http" | "https" => self.fetch(src)?,
            other => {
                return Err(Error::Resource(format!(
                    "unsupported scheme `{}` in {}",
                    other, src
                )))
            }
        };
        debug!(src = %src, bytes = bytes.len(), "resolved image resource");
        image::load_from_memory(&bytes).map_err(|e| Error::Resource(format!("{}: {}", src, e)))
    }
}

impl DefaultResourceLoader {
    fn fetch(&self, src: &Url) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Resource(format!("HTTP client: {}", e)))?;
        let response = client
            .get(src.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Resource(format!("{}: {}", src, e)))?;
        let body = response
            .bytes()
            .map_err(|e| Error::Resource(format!("{}: {}", src, e)))?;
        Ok(body.to_vec())
    }
}

fn read_file(src: &Url) -> Result<Vec<u8>> {
    let path = src
        .to_file_path()
        .map_err(|_| Error::Resource(format!("not a local path: {}", src)))?;
    std::fs::read(&path).map_err(|e| Error::Resource(format!("{}: {}", path.display(), e)))
}

/// Decode the payload of a `data:` URL (`data:[<media type>][;base64],<data>`).
pub(crate) fn decode_data_url(src: &Url) -> Result<Vec<u8>> {
    let body = src.path();
    let (meta, payload) = body
        .split_once(',')
        .ok_or_else(|| Error::Resource("malformed data URL".to_string()))?;
    let payload = urlencoding::decode_binary(payload.as_bytes());
    if meta.ends_with(";base64") {
        let compact: Vec<u8> = payload
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| Error::Resource(format!("data URL: {}", e)))
    } else {
        Ok(payload.into_owned())
    }
}

/// Whether `src` may be drawn into a panel hosted at `origin`.
///
/// `data:` URLs carry no origin of their own and are always allowed.
pub fn same_origin(origin: Option<&Url>, src: &Url) -> bool {
    if src.scheme() == "data" {
        return true;
    }
    match origin {
        Some(origin) => origin.origin() == src.origin(),
        None => false,
    }
}
