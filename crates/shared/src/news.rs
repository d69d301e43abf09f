use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::models::Article;

const TOP_HEADLINES_URL: &str = "https://newsapi.org/v2/top-headlines";

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<RawArticle>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
}

impl RawArticle {
    /// Articles without a link cannot be rendered as headlines; everything
    /// else gets the documented fallbacks.
    fn normalize(self) -> Option<Article> {
        let url = self.url.filter(|u| !u.trim().is_empty())?;

        let title = match self.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => "Untitled".to_string(),
        };

        let author = self.author.filter(|a| {
            let a = a.trim();
            !a.is_empty() && !a.eq_ignore_ascii_case("n/a")
        });

        let description = match self.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => "No summary provided.".to_string(),
        };

        let image_url = self.url_to_image.filter(|u| !u.trim().is_empty());

        Some(Article {
            title,
            author,
            description,
            url,
            image_url,
        })
    }
}

pub struct NewsApiClient {
    client: Client,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    /// Fetch up to `count` top headlines for `country` in source order.
    /// One bounded request, no retry: a transient failure simply means an
    /// empty batch for this run.
    pub async fn fetch_top_headlines(&self, country: &str, count: usize) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(TOP_HEADLINES_URL)
            .query(&[
                ("country", country),
                ("pageSize", &count.to_string()),
                ("apiKey", &self.api_key),
            ])
            .send()
            .await
            .context("Failed to fetch headlines from NewsAPI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("NewsAPI returned error: {} - {}", status, error_text);
        }

        let news_response = response
            .json::<NewsApiResponse>()
            .await
            .context("Failed to parse NewsAPI response")?;

        if news_response.status != "ok" {
            anyhow::bail!(
                "NewsAPI reported failure: {} - {}",
                news_response.code.unwrap_or_else(|| "unknown".to_string()),
                news_response
                    .message
                    .unwrap_or_else(|| "no message".to_string())
            );
        }

        let articles: Vec<Article> = news_response
            .articles
            .into_iter()
            .filter_map(RawArticle::normalize)
            .collect();

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawArticle {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_keeps_complete_article() {
        let article = raw(
            r#"{"title":"Big News","author":"Jane Doe","description":"Something happened.",
                "url":"https://example.com/a","urlToImage":"https://example.com/a.jpg"}"#,
        )
        .normalize()
        .unwrap();

        assert_eq!(article.title, "Big News");
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert_eq!(article.description, "Something happened.");
        assert_eq!(article.image_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[test]
    fn test_normalize_drops_article_without_url() {
        let article = raw(r#"{"title":"Orphan","description":"No link."}"#).normalize();
        assert!(article.is_none());
    }

    #[test]
    fn test_normalize_sentinel_author_becomes_none() {
        let article = raw(r#"{"title":"T","author":"N/A","url":"https://example.com"}"#)
            .normalize()
            .unwrap();
        assert!(article.author.is_none());

        let article = raw(r#"{"title":"T","author":"  ","url":"https://example.com"}"#)
            .normalize()
            .unwrap();
        assert!(article.author.is_none());
    }

    #[test]
    fn test_normalize_empty_description_gets_fallback() {
        let article = raw(r#"{"title":"T","description":"","url":"https://example.com"}"#)
            .normalize()
            .unwrap();
        assert_eq!(article.description, "No summary provided.");
    }

    #[test]
    fn test_normalize_missing_title_gets_placeholder() {
        let article = raw(r#"{"url":"https://example.com"}"#).normalize().unwrap();
        assert_eq!(article.title, "Untitled");
    }
}
