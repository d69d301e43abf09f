use anyhow::Result;
use clap::Parser;
use shared::{
    Config, DigestMailer, DigestOrchestrator, GeminiSummarizer, ImageResolver, NewsApiClient,
    OpenAiSummarizer, RunOutcome,
};

#[derive(Parser)]
#[command(name = "news-digest")]
#[command(about = "Fetch top headlines, summarize them twice, and email the digest")]
struct Args {
    /// Country code for the top-headlines feed
    #[arg(short = 'c', long, default_value = "us")]
    country: String,

    /// Number of headlines to include in the digest
    #[arg(short = 'n', long, default_value = "5")]
    count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    // Construct every external handle once, up front; the pipeline reuses
    // them read-only for the whole run.
    let news = NewsApiClient::new(config.news_api_key.clone())?;
    let images = ImageResolver::new()?;
    let gemini = GeminiSummarizer::new(config.gemini_api_key.clone())?;
    let openai = OpenAiSummarizer::new(config.openai_api_key.clone())?;
    let mailer = DigestMailer::new(&config);

    // Precondition gate: both providers must answer a probe before we spend
    // any quota on the real run.
    println!("🔑 Checking provider credentials...");
    let gemini_ok = match gemini.check().await {
        Ok(()) => {
            println!("✓ Gemini API check: SUCCESS");
            true
        }
        Err(e) => {
            eprintln!("✗ Gemini API check FAILED: {:#}", e);
            false
        }
    };
    let openai_ok = match openai.check().await {
        Ok(()) => {
            println!("✓ OpenAI API check: SUCCESS");
            true
        }
        Err(e) => {
            eprintln!("✗ OpenAI API check FAILED: {:#}", e);
            false
        }
    };

    if !gemini_ok || !openai_ok {
        anyhow::bail!("One or more provider checks failed. Check your keys and network.");
    }

    let orchestrator = DigestOrchestrator::new(
        news,
        images,
        gemini,
        openai,
        mailer,
        args.country,
        args.count,
    );

    match orchestrator.run().await {
        RunOutcome::Sent => println!("\n✅ Digest delivered."),
        RunOutcome::SkippedEmpty => println!("\nNothing to send this run."),
        RunOutcome::DeliveryFailed => println!("\n⚠ Digest composed but delivery failed."),
    }

    Ok(())
}
