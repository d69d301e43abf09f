use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-3.5-turbo";

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
const MAX_OUTPUT_TOKENS: u32 = 256;
const SECONDARY_MAX_TOKENS: u32 = 150;
const SAMPLING_TEMPERATURE: f32 = 0.5;

/// Phrases that mark a "successful" response as an overload apology in
/// disguise. This is a heuristic, not a guarantee: the upstream services do
/// not expose a structured status for this state, so we match a fixed
/// phrase list and treat hits as retryable.
const OVERLOAD_PHRASES: &[&str] = &["overloaded", "try again"];

pub fn looks_overloaded(text: &str) -> bool {
    let lower = text.to_lowercase();
    OVERLOAD_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// What a single provider call produced, before retry policy is applied.
#[derive(Debug, Clone)]
pub enum ProviderReply {
    Text(String),
    /// The provider refused on content-safety grounds. Not transient.
    Blocked(String),
}

/// Final result of a summarization, tracked explicitly so the orchestrator
/// can log blocked vs. failed without matching on the display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Text(String),
    Blocked(String),
    Failed,
}

impl SummaryOutcome {
    /// The user-visible text for this outcome. Failure sentinels are fixed
    /// strings so a degraded digest still reads cleanly.
    pub fn display_text(&self, provider: &str) -> String {
        match self {
            SummaryOutcome::Text(text) => text.clone(),
            SummaryOutcome::Blocked(reason) => format!(
                "Summary withheld by {} content policy ({}).",
                provider, reason
            ),
            SummaryOutcome::Failed => {
                format!("Summary could not be generated by {}.", provider)
            }
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SummaryOutcome::Text(_))
    }
}

/// Retry loop for the primary provider: up to `MAX_ATTEMPTS` calls with
/// exponential backoff (2s, then 4s, none after the last attempt).
/// Overload-looking text and transport errors are retried; a policy block
/// is terminal on the spot.
async fn generate_with_retry<F, Fut>(provider: &str, mut call: F) -> SummaryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProviderReply>>,
{
    let mut delay = RETRY_BASE_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match call().await {
            Ok(ProviderReply::Text(text)) => {
                let text = text.trim().to_string();
                if !text.is_empty() && !looks_overloaded(&text) {
                    return SummaryOutcome::Text(text);
                }
                eprintln!(
                    "⚠ {} attempt {}/{} returned an overload notice instead of a summary",
                    provider, attempt, MAX_ATTEMPTS
                );
            }
            Ok(ProviderReply::Blocked(reason)) => {
                eprintln!("⚠ {} blocked the request: {}", provider, reason);
                return SummaryOutcome::Blocked(reason);
            }
            Err(e) => {
                eprintln!(
                    "⚠ {} attempt {}/{} failed: {}",
                    provider, attempt, MAX_ATTEMPTS, e
                );
            }
        }

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    SummaryOutcome::Failed
}

/// Single-shot wrapper for the secondary provider: one call, any failure
/// or empty reply degrades to the fallback.
async fn generate_once<Fut>(provider: &str, call: Fut) -> SummaryOutcome
where
    Fut: Future<Output = Result<ProviderReply>>,
{
    match call.await {
        Ok(ProviderReply::Text(text)) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                eprintln!("⚠ {} returned an empty summary", provider);
                SummaryOutcome::Failed
            } else {
                SummaryOutcome::Text(text)
            }
        }
        Ok(ProviderReply::Blocked(reason)) => {
            eprintln!("⚠ {} blocked the request: {}", provider, reason);
            SummaryOutcome::Blocked(reason)
        }
        Err(e) => {
            eprintln!("⚠ {} summary failed: {}", provider, e);
            SummaryOutcome::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// Gemini (primary)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Primary summarizer. Rewrites an article's description via Gemini,
/// treating the supplied text as ground truth so the rewrite cannot
/// contradict the source.
pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
}

impl GeminiSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    pub async fn summarize(&self, title: &str, base_summary: &str) -> SummaryOutcome {
        let system = "You are a news summarization assistant. Rewrite the summary you are \
                      given in your own words as one concise, strictly neutral, factual \
                      paragraph. Treat the supplied summary as ground truth: do not \
                      fact-check it against outside knowledge and do not contradict it.";
        let prompt = format!(
            "Headline: {}\n\nSummary: {}\n\nRewrite the summary above as one neutral paragraph.",
            title, base_summary
        );

        generate_with_retry("Gemini", || self.try_generate(Some(system), &prompt)).await
    }

    /// Startup probe: one tiny request to confirm the key works.
    pub async fn check(&self) -> Result<()> {
        match self.try_generate(None, "Hello").await? {
            ProviderReply::Text(text) if !text.trim().is_empty() => Ok(()),
            ProviderReply::Text(_) => anyhow::bail!("Gemini returned an empty response"),
            ProviderReply::Blocked(reason) => {
                anyhow::bail!("Gemini blocked the probe request: {}", reason)
            }
        }
    }

    async fn try_generate(&self, system: Option<&str>, prompt: &str) -> Result<ProviderReply> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: system.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: text.to_string(),
                }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: SAMPLING_TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(GEMINI_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Gemini API error: {} - {}", status, error_text);
        }

        let gemini_response = response
            .json::<GeminiResponse>()
            .await
            .context("Failed to parse Gemini API response")?;

        if let Some(reason) = gemini_response
            .prompt_feedback
            .and_then(|f| f.block_reason)
        {
            return Ok(ProviderReply::Blocked(reason));
        }

        let Some(candidate) = gemini_response.candidates.into_iter().next() else {
            anyhow::bail!("Gemini returned no candidates");
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if matches!(reason, "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST") {
                return Ok(ProviderReply::Blocked(reason.to_string()));
            }
        }

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(ProviderReply::Text(text))
    }
}

// ---------------------------------------------------------------------------
// OpenAI (secondary)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Secondary summarizer. One attempt per article; any failure degrades to
/// the fixed fallback rather than retrying.
pub struct OpenAiSummarizer {
    client: Client,
    api_key: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    pub async fn summarize(&self, title: &str, base_summary: &str) -> SummaryOutcome {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: "You are a news summarization assistant. You will be given a news \
                          headline and a summary. Rewrite that summary in your own words, \
                          maintaining a concise and strictly neutral, factual tone."
                    .to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!(
                    "Please provide a one-paragraph, neutral summary based on the following \
                     information:\n\nHeadline: {}\n\nSummary: {}",
                    title, base_summary
                ),
            },
        ];

        generate_once("OpenAI", self.try_generate(messages, SECONDARY_MAX_TOKENS)).await
    }

    /// Startup probe: one tiny request to confirm the key works.
    pub async fn check(&self) -> Result<()> {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: "Hello".to_string(),
        }];

        match self.try_generate(messages, 5).await? {
            ProviderReply::Text(text) if !text.trim().is_empty() => Ok(()),
            ProviderReply::Text(_) => anyhow::bail!("OpenAI returned an empty response"),
            ProviderReply::Blocked(reason) => {
                anyhow::bail!("OpenAI blocked the probe request: {}", reason)
            }
        }
    }

    async fn try_generate(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<ProviderReply> {
        let request = ChatRequest {
            model: OPENAI_MODEL.to_string(),
            messages,
            max_tokens,
            temperature: SAMPLING_TEMPERATURE,
        };

        let response = self
            .client
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("OpenAI API error: {} - {}", status, error_text);
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse OpenAI API response")?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(ProviderReply::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_heuristic() {
        assert!(looks_overloaded("The model is overloaded. Please try again later."));
        assert!(looks_overloaded("Model OVERLOADED"));
        assert!(looks_overloaded("Please try again in a moment"));
        assert!(!looks_overloaded("Markets closed higher on Tuesday."));
    }

    #[test]
    fn test_display_text_sentinels() {
        assert_eq!(
            SummaryOutcome::Failed.display_text("Gemini"),
            "Summary could not be generated by Gemini."
        );
        assert_eq!(
            SummaryOutcome::Blocked("SAFETY".to_string()).display_text("Gemini"),
            "Summary withheld by Gemini content policy (SAFETY)."
        );
        assert_eq!(
            SummaryOutcome::Text("Fine prose.".to_string()).display_text("Gemini"),
            "Fine prose."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_overload_with_backoff() {
        let start = tokio::time::Instant::now();
        let mut calls = 0u32;
        let mut stamps = Vec::new();

        let outcome = generate_with_retry("Gemini", || {
            calls += 1;
            stamps.push(start.elapsed());
            let reply = if calls < 3 {
                ProviderReply::Text("Model overloaded, try again".to_string())
            } else {
                ProviderReply::Text("A calm, factual paragraph.".to_string())
            };
            async move { Ok(reply) }
        })
        .await;

        assert_eq!(outcome, SummaryOutcome::Text("A calm, factual paragraph.".to_string()));
        assert_eq!(calls, 3);
        // Backoff of 2s after attempt 1, then 4s after attempt 2.
        assert_eq!(stamps[0], Duration::ZERO);
        assert_eq!(stamps[1], Duration::from_secs(2));
        assert_eq!(stamps[2], Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_block_stops_retrying() {
        let mut calls = 0u32;

        let outcome = generate_with_retry("Gemini", || {
            calls += 1;
            async { Ok(ProviderReply::Blocked("SAFETY".to_string())) }
        })
        .await;

        assert_eq!(outcome, SummaryOutcome::Blocked("SAFETY".to_string()));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fall_back() {
        let mut calls = 0u32;

        let outcome = generate_with_retry("Gemini", || {
            calls += 1;
            async { anyhow::bail!("connection reset") }
        })
        .await;

        assert_eq!(outcome, SummaryOutcome::Failed);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_secondary_is_single_shot() {
        let mut calls = 0u32;
        let call = async {
            calls += 1;
            anyhow::bail!("connection refused")
        };

        let outcome = generate_once("OpenAI", call).await;

        assert_eq!(outcome, SummaryOutcome::Failed);
        assert_eq!(calls, 1);
        assert_eq!(
            outcome.display_text("OpenAI"),
            "Summary could not be generated by OpenAI."
        );
    }

    #[tokio::test]
    async fn test_secondary_empty_reply_falls_back() {
        let outcome =
            generate_once("OpenAI", async { Ok(ProviderReply::Text("  ".to_string())) }).await;
        assert_eq!(outcome, SummaryOutcome::Failed);
    }
}
