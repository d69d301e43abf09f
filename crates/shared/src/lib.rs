// Public modules
pub mod config;
pub mod digest;
pub mod images;
pub mod mailer;
pub mod models;
pub mod news;
pub mod pipeline;
pub mod summarizer;

// Re-export commonly used types
pub use config::Config;
pub use digest::DigestComposer;
pub use images::ImageResolver;
pub use mailer::{DigestMailer, DigestSender};
pub use models::{Article, DigestDocument, DigestEntry, ResolvedImage, RunOutcome, SummaryPair};
pub use news::NewsApiClient;
pub use pipeline::DigestOrchestrator;
pub use summarizer::{GeminiSummarizer, OpenAiSummarizer, SummaryOutcome};
