use chrono::Local;
use std::time::Duration;

use crate::digest::DigestComposer;
use crate::images::ImageResolver;
use crate::mailer::DigestSender;
use crate::models::{DigestDocument, DigestEntry, RunOutcome, SummaryPair};
use crate::news::NewsApiClient;
use crate::summarizer::{GeminiSummarizer, OpenAiSummarizer};

/// Pause between article task groups so neither provider throttles us.
const ARTICLE_PACING: Duration = Duration::from_secs(1);

/// Drives one digest run: fetch once, process each article in fetch order,
/// compose once, deliver once. Per-article failures degrade that article's
/// entry; only delivery failure surfaces in the outcome.
pub struct DigestOrchestrator<S: DigestSender> {
    news: NewsApiClient,
    images: ImageResolver,
    gemini: GeminiSummarizer,
    openai: OpenAiSummarizer,
    sender: S,
    country: String,
    batch_size: usize,
}

impl<S: DigestSender> DigestOrchestrator<S> {
    pub fn new(
        news: NewsApiClient,
        images: ImageResolver,
        gemini: GeminiSummarizer,
        openai: OpenAiSummarizer,
        sender: S,
        country: String,
        batch_size: usize,
    ) -> Self {
        Self {
            news,
            images,
            gemini,
            openai,
            sender,
            country,
            batch_size,
        }
    }

    pub async fn run(&self) -> RunOutcome {
        println!("\n📰 Fetching top headlines...");
        let articles = match self
            .news
            .fetch_top_headlines(&self.country, self.batch_size)
            .await
        {
            Ok(articles) => articles,
            Err(e) => {
                eprintln!("⚠ Headline fetch failed: {}", e);
                Vec::new()
            }
        };

        if articles.is_empty() {
            println!("No articles to digest this run.");
            return RunOutcome::SkippedEmpty;
        }

        println!("✓ Found {} articles", articles.len());

        println!("\n🤖 Summarizing and fetching images...");
        let mut entries = Vec::with_capacity(articles.len());
        let last_index = articles.len() - 1;

        for (index, article) in articles.into_iter().enumerate() {
            let ordinal = index + 1;
            println!("  [{}] {}", ordinal, article.title);

            // The image download and the two summarizations are independent
            // reads against independent services; issue them together and
            // join before composing this article's entry.
            let (image, primary, secondary) = tokio::join!(
                async {
                    match &article.image_url {
                        Some(url) => self.images.resolve(url, ordinal).await,
                        None => None,
                    }
                },
                self.gemini.summarize(&article.title, &article.description),
                self.openai.summarize(&article.title, &article.description),
            );

            if !primary.is_text() {
                eprintln!("  ⚠ Gemini summary degraded for article {}", ordinal);
            }
            if !secondary.is_text() {
                eprintln!("  ⚠ OpenAI summary degraded for article {}", ordinal);
            }

            let summaries = SummaryPair {
                primary: primary.display_text("Gemini"),
                secondary: secondary.display_text("OpenAI"),
            };

            entries.push(DigestEntry {
                article,
                summaries,
                image,
            });

            if index < last_index {
                tokio::time::sleep(ARTICLE_PACING).await;
            }
        }

        println!("\n📝 Composing digest...");
        let document = DigestComposer::compose(&entries, Local::now());
        println!(
            "✓ {} articles, {} inline images",
            entries.len(),
            document.inline_images.len()
        );

        println!("\n📧 Sending digest...");
        deliver(&self.sender, &document).await
    }
}

/// Hand the composed digest to the transport. One attempt: a delivery
/// failure is reported, not retried.
pub async fn deliver<S: DigestSender>(sender: &S, document: &DigestDocument) -> RunOutcome {
    match sender.send(document).await {
        Ok(()) => {
            println!("✓ Digest sent: {}", document.subject);
            RunOutcome::Sent
        }
        Err(e) => {
            eprintln!("✗ Delivery failed: {:#}", e);
            RunOutcome::DeliveryFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingSender {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl DigestSender for FailingSender {
        async fn send(&self, _document: &DigestDocument) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("535 authentication failed")
        }
    }

    struct CountingSender {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl DigestSender for CountingSender {
        async fn send(&self, _document: &DigestDocument) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn document() -> DigestDocument {
        DigestDocument {
            subject: "Daily News Digest - November 3rd, 2025".to_string(),
            html_body: "<html><body></body></html>".to_string(),
            inline_images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported_not_retried() {
        let sender = FailingSender {
            attempts: AtomicU32::new(0),
        };

        let outcome = deliver(&sender, &document()).await;

        assert_eq!(outcome, RunOutcome::DeliveryFailed);
        assert_eq!(sender.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_delivery_sends_once() {
        let sender = CountingSender {
            attempts: AtomicU32::new(0),
        };

        let outcome = deliver(&sender, &document()).await;

        assert_eq!(outcome, RunOutcome::Sent);
        assert_eq!(sender.attempts.load(Ordering::SeqCst), 1);
    }
}
