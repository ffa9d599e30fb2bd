// Outbound mail transport

use crate::config::SmtpConfig;
use crate::errors::MailError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

/// Confirmation string recorded on a job when delivery succeeds.
pub const SEND_CONFIRMATION: &str = "Email sent successfully";

/// Plain-text mail delivery to a single recipient.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Returns the transport's confirmation message on success.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, MailError>;
}

/// SMTP transport over STARTTLS with credential authentication.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from_name = config.from_name.as_deref().unwrap_or("Weather Bot");
        let from: Mailbox = format!("{} <{}>", from_name, config.from_address)
            .parse()
            .map_err(|e| MailError::InvalidAddress {
                address: config.from_address.clone(),
                reason: format!("{}", e),
            })?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::TransportFailed(format!("SMTP relay setup failed: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    #[instrument(skip(self, body), fields(to = %to, subject = %subject))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, MailError> {
        let to_mailbox: Mailbox = to.parse().map_err(|e| MailError::InvalidAddress {
            address: to.to_string(),
            reason: format!("{}", e),
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(message).await?;

        info!("Email delivered");
        Ok(SEND_CONFIRMATION.to_string())
    }
}
