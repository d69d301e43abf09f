use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub news_api_key: String,
    pub gemini_api_key: String,
    pub openai_api_key: String,
    pub sender_email: String,
    pub recipient_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_app_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let news_api_key = Self::required("NEWS_API_KEY")?;
        let gemini_api_key = Self::required("GEMINI_API_KEY")?;
        let openai_api_key = Self::required("OPENAI_API_KEY")?;
        let sender_email = Self::required("SENDER_EMAIL")?;
        let recipient_email = Self::required("RECIPIENT_EMAIL")?;
        let smtp_host = Self::required("SMTP_HOST")?;
        let smtp_app_password = Self::required("SMTP_APP_PASSWORD")?;

        let smtp_port = Self::required("SMTP_PORT")?
            .parse::<u16>()
            .context("SMTP_PORT must be a port number (e.g. 587 for STARTTLS)")?;

        Ok(Self {
            news_api_key,
            gemini_api_key,
            openai_api_key,
            sender_email,
            recipient_email,
            smtp_host,
            smtp_port,
            smtp_app_password,
        })
    }

    fn required(key: &str) -> Result<String> {
        env::var(key).with_context(|| {
            format!(
                "{} not found.\n\n\
                To fix this, create ~/.config/news-digest/.env with:\n  \
                NEWS_API_KEY=...        (https://newsapi.org/account)\n  \
                GEMINI_API_KEY=...      (https://aistudio.google.com/apikey)\n  \
                OPENAI_API_KEY=...      (https://platform.openai.com/api-keys)\n  \
                SENDER_EMAIL=you@gmail.com\n  \
                RECIPIENT_EMAIL=them@example.com\n  \
                SMTP_HOST=smtp.gmail.com\n  \
                SMTP_PORT=587\n  \
                SMTP_APP_PASSWORD=...   (Gmail app password, not your account password)",
                key
            )
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}
