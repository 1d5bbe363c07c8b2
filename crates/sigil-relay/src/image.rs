//! Image reference resolution
//!
//! Turns any of the three accepted image shapes (inline base64, data-URL,
//! remote URL) into a canonical `{media_type, base64 data}` pair. The
//! data-URL and inline paths are pure; only remote URLs touch the network.

use crate::error::{Error, Result};
use crate::request::ImageRef;
use async_trait::async_trait;
use base64::Engine;

const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// Canonical resolved image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub media_type: String,
    pub data: String,
}

/// Resolves an image reference to inline base64 bytes
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, image: &ImageRef) -> Result<ResolvedImage>;
}

/// Resolver backed by a reqwest client for remote URLs
pub struct HttpImageResolver {
    client: reqwest::Client,
}

impl HttpImageResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageResolver for HttpImageResolver {
    async fn resolve(&self, image: &ImageRef) -> Result<ResolvedImage> {
        match image {
            ImageRef::Inline { data, media_type } => Ok(ResolvedImage {
                media_type: media_type.clone(),
                data: data.clone(),
            }),
            ImageRef::Url { url } if url.starts_with("data:") => parse_data_url(url),
            ImageRef::Url { url } => self.fetch(url).await,
        }
    }
}

impl HttpImageResolver {
    async fn fetch(&self, url: &str) -> Result<ResolvedImage> {
        tracing::debug!("fetching remote image: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Resolution(e.to_string()))?;

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Resolution(e.to_string()))?;

        Ok(ResolvedImage {
            media_type,
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}

/// Parse a `data:<media_type>;base64,<payload>` URL without decoding the
/// payload (the backend takes base64 as-is).
pub fn parse_data_url(url: &str) -> Result<ResolvedImage> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::Resolution(format!("not a data URL: {}", url)))?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Resolution("data URL has no payload separator".to_string()))?;

    let media_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::Resolution("data URL is not base64-encoded".to_string()))?;

    if media_type.is_empty() {
        return Err(Error::Resolution("data URL has no media type".to_string()));
    }

    Ok(ResolvedImage {
        media_type: media_type.to_string(),
        data: payload.to_string(),
    })
}
