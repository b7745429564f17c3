//! Mail delivery: an outgoing-message model behind a trait seam, plus the
//! SMTP implementation.
//!
//! [`MailSender`] is the only thing the notification pipeline knows about
//! mail. The shipped [`SmtpMailer`] authenticates over an implicit-TLS
//! session and sends a multipart message: a plain-text body and, when
//! present, one binary attachment with the original filename in its
//! `Content-Disposition` header (base64 transfer encoding is handled by
//! lettre).

use crate::config::SmtpSettings;
use crate::error::DispatchError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// A file to attach to an outgoing message.
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    /// Filename presented to the recipient.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An assembled notification message, transport-agnostic.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PdfAttachment>,
}

/// Sends a message over an authenticated, encrypted channel.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver one message. Errors are transport failures and may be retried
    /// by the caller.
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError>;
}

/// SMTP implementation of [`MailSender`] using lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from SMTP settings.
    ///
    /// The connection itself is established lazily on the first send.
    pub fn new(settings: &SmtpSettings) -> Result<Self, DispatchError> {
        let credentials = Credentials::new(
            settings.sender_email.clone(),
            settings.sender_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_server)?
            .port(settings.smtp_port)
            .credentials(credentials)
            .build();

        let sender: Mailbox = settings.sender_email.parse()?;

        Ok(Self { transport, sender })
    }

    fn build_message(&self, message: &OutgoingMessage) -> Result<Message, DispatchError> {
        let to: Mailbox = message.to.parse()?;

        let builder = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(message.subject.clone());

        let body = SinglePart::plain(message.body.clone());

        let multipart = match &message.attachment {
            Some(att) => {
                let content_type = ContentType::parse("application/octet-stream")
                    .map_err(|e| DispatchError::Internal(format!("content type: {e}")))?;
                let part = Attachment::new(att.filename.clone())
                    .body(att.bytes.clone(), content_type);
                MultiPart::mixed().singlepart(body).singlepart(part)
            }
            None => MultiPart::mixed().singlepart(body),
        };

        Ok(builder.multipart(multipart)?)
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError> {
        let mail = self.build_message(message)?;
        debug!(to = %message.to, subject = %message.subject, "sending mail");
        self.transport.send(mail).await?;
        Ok(())
    }
}
