use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

use crate::models::ResolvedImage;

/// Placeholder values some sources put where an image URL should be.
const SKIP_SENTINELS: &[&str] = &["", "n/a", "none"];

/// Returns true for image URLs that should not even be requested.
pub fn is_skippable_url(image_url: &str) -> bool {
    let trimmed = image_url.trim().to_ascii_lowercase();
    SKIP_SENTINELS.contains(&trimmed.as_str())
}

/// Determine the image subtype from the declared content type, falling back
/// to the URL's file extension. Returns e.g. "jpeg" or "png", never a full
/// MIME type. "pjpeg" is a legacy IE alias that mail clients do not
/// recognize, so it is normalized to "jpeg".
pub fn image_subtype(content_type: Option<&str>, image_url: &str) -> Option<String> {
    let mime = match content_type {
        Some(ct) => {
            let main = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            if main.starts_with("image/") {
                Some(main)
            } else {
                None
            }
        }
        None => None,
    };

    let mime = match mime {
        Some(m) => m,
        None => {
            let parsed = Url::parse(image_url).ok()?;
            let guess = mime_guess::from_path(parsed.path()).first()?;
            if guess.type_() != mime_guess::mime::IMAGE {
                return None;
            }
            guess.essence_str().to_ascii_lowercase()
        }
    };

    let subtype = mime.strip_prefix("image/")?.to_string();
    if subtype.is_empty() {
        return None;
    }

    Some(match subtype.as_str() {
        "pjpeg" | "jpg" => "jpeg".to_string(),
        _ => subtype,
    })
}

pub struct ImageResolver {
    client: Client,
}

impl ImageResolver {
    pub fn new() -> Result<Self> {
        // Some image hosts reject default HTTP clients, so present a
        // browser-ish user agent. Redirects are followed by default.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (compatible; NewsDigest/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Download and type an article's illustration. Never fails the
    /// pipeline: any error along the way means this article simply has no
    /// inline image.
    pub async fn resolve(&self, image_url: &str, ordinal: usize) -> Option<ResolvedImage> {
        if is_skippable_url(image_url) {
            return None;
        }

        match self.try_resolve(image_url, ordinal).await {
            Ok(image) => image,
            Err(e) => {
                eprintln!("⚠ Image download failed for {}: {}", image_url, e);
                None
            }
        }
    }

    async fn try_resolve(&self, image_url: &str, ordinal: usize) -> Result<Option<ResolvedImage>> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .context("Failed to send image request")?;

        let status = response.status();
        if !status.is_success() {
            eprintln!("⚠ Image host returned {} for {}", status, image_url);
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(subtype) = image_subtype(content_type.as_deref(), image_url) else {
            eprintln!("⚠ Could not determine image type for {}", image_url);
            return Ok(None);
        };

        let bytes = response
            .bytes()
            .await
            .context("Failed to read image body")?;

        Ok(Some(ResolvedImage {
            content_id: format!("image{}", ordinal),
            bytes: bytes.to_vec(),
            subtype,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_urls() {
        assert!(is_skippable_url(""));
        assert!(is_skippable_url("  "));
        assert!(is_skippable_url("n/a"));
        assert!(is_skippable_url("N/A"));
        assert!(is_skippable_url("none"));
        assert!(is_skippable_url("None"));
        assert!(!is_skippable_url("https://example.com/photo.jpg"));
    }

    #[test]
    fn test_declared_content_type_wins() {
        let subtype = image_subtype(Some("image/png"), "https://example.com/photo.jpg");
        assert_eq!(subtype.as_deref(), Some("png"));
    }

    #[test]
    fn test_content_type_parameters_stripped() {
        let subtype = image_subtype(Some("image/gif; charset=binary"), "https://example.com/x");
        assert_eq!(subtype.as_deref(), Some("gif"));
    }

    #[test]
    fn test_pjpeg_normalizes_to_jpeg() {
        let subtype = image_subtype(Some("image/pjpeg"), "https://example.com/x");
        assert_eq!(subtype.as_deref(), Some("jpeg"));
    }

    #[test]
    fn test_extension_fallback_when_no_content_type() {
        let subtype = image_subtype(None, "https://example.com/pics/photo.png?w=600");
        assert_eq!(subtype.as_deref(), Some("png"));

        let subtype = image_subtype(None, "https://example.com/pics/photo.jpg");
        assert_eq!(subtype.as_deref(), Some("jpeg"));
    }

    #[test]
    fn test_non_image_content_type_falls_back_to_extension() {
        let subtype = image_subtype(Some("text/html"), "https://example.com/photo.webp");
        assert_eq!(subtype.as_deref(), Some("webp"));
    }

    #[test]
    fn test_untypeable_image_is_rejected() {
        assert!(image_subtype(None, "https://example.com/photo").is_none());
        assert!(image_subtype(Some("text/html"), "https://example.com/page.html").is_none());
        assert!(image_subtype(None, "not a url").is_none());
    }
}
