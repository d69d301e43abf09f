use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::models::DigestDocument;

/// Delivery seam for the orchestrator: anything that can ship a composed
/// digest. The real implementation talks SMTP; tests substitute a stub.
#[async_trait]
pub trait DigestSender {
    async fn send(&self, document: &DigestDocument) -> Result<()>;
}

/// SMTP sender for composed digests. Connects with STARTTLS and
/// authenticates with the sender address plus an app password.
pub struct DigestMailer {
    sender: String,
    recipient: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_password: String,
}

impl DigestMailer {
    pub fn new(config: &Config) -> Self {
        Self {
            sender: config.sender_email.clone(),
            recipient: config.recipient_email.clone(),
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            smtp_password: config.smtp_app_password.clone(),
        }
    }

    /// Build the multipart/related message: the HTML part first, then one
    /// inline attachment per resolved image keyed by its content id.
    fn build_message(&self, document: &DigestDocument) -> Result<Message> {
        let from: Mailbox = self
            .sender
            .parse()
            .context("Invalid sender email address")?;

        let to: Mailbox = self
            .recipient
            .parse()
            .context("Invalid recipient email address")?;

        let mut related = MultiPart::related().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(document.html_body.clone()),
        );

        for image in &document.inline_images {
            let content_type = ContentType::parse(&format!("image/{}", image.subtype))
                .with_context(|| format!("Invalid image content type: {}", image.subtype))?;
            related = related.singlepart(
                Attachment::new_inline(image.content_id.clone())
                    .body(image.bytes.clone(), content_type),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(document.subject.clone())
            .multipart(related)
            .context("Failed to build email message")
    }
}

#[async_trait]
impl DigestSender for DigestMailer {
    async fn send(&self, document: &DigestDocument) -> Result<()> {
        let email = self.build_message(document)?;

        let creds = Credentials::new(self.sender.clone(), self.smtp_password.clone());

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)
                .context("Failed to create SMTP transport")?
                .port(self.smtp_port)
                .credentials(creds)
                .build();

        mailer.send(email).await.context(
            "Failed to send digest email (check the sender address and SMTP app password)",
        )?;

        Ok(())
    }
}
