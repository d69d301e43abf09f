use serde::{Deserialize, Serialize};

/// One news item as delivered by the source. Immutable once fetched;
/// identified by its position in the fetched batch (1-based for display).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
}

/// The two independently generated rewrites of an article's description.
/// Never absent, only degraded: a failed provider call leaves its fixed
/// fallback text in place of prose.
#[derive(Debug, Clone)]
pub struct SummaryPair {
    pub primary: String,
    pub secondary: String,
}

/// A downloaded illustration image, typed and keyed for inline embedding.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub content_id: String,
    pub bytes: Vec<u8>,
    pub subtype: String,
}

/// Everything the composer needs for one article, in fetch order.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub article: Article,
    pub summaries: SummaryPair,
    pub image: Option<ResolvedImage>,
}

/// The final artifact: built once, sent once, then discarded.
#[derive(Debug, Clone)]
pub struct DigestDocument {
    pub subject: String,
    pub html_body: String,
    pub inline_images: Vec<ResolvedImage>,
}

/// How a single digest run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Sent,
    SkippedEmpty,
    DeliveryFailed,
}
