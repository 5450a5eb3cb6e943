//! Dispatch client traits and the SMTP implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::error::DispatchError;
use crate::models::{Artifact, MailCredentials};

use super::classify::{SmtpFailure, classify};

/// An open, authenticated mail session.
///
/// Credentials are bound when the session is opened by a [`DispatchConnector`].
#[async_trait]
pub trait DispatchClient: Send + Sync {
    /// Checks that the server accepts the session credentials.
    async fn verify(&self) -> Result<(), DispatchError>;

    /// Sends `artifact` as a PDF attachment to `recipient`.
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        artifact: &Artifact,
    ) -> Result<(), DispatchError>;
}

/// Session parameters fixed for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Reuse pooled connections across recipients.
    pub reuse_session: bool,
    /// Maximum pooled connections.
    pub max_connections: usize,
    /// Socket timeout for every SMTP command.
    pub timeout: Duration,
}

impl SessionOptions {
    /// Session options for a batch run with `settings`.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            reuse_session: settings.reuse_session,
            max_connections: settings.dispatch_concurrency,
            timeout: settings.send_timeout(),
        }
    }
}

/// Opens mail sessions. Only called for live runs.
#[async_trait]
pub trait DispatchConnector: Send + Sync {
    /// Opens a session authenticated with `credentials`.
    async fn connect(
        &self,
        credentials: &MailCredentials,
        options: SessionOptions,
    ) -> Result<Arc<dyn DispatchClient>, DispatchError>;
}

/// Connector for SMTP relays with STARTTLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpConnector;

#[async_trait]
impl DispatchConnector for SmtpConnector {
    async fn connect(
        &self,
        credentials: &MailCredentials,
        options: SessionOptions,
    ) -> Result<Arc<dyn DispatchClient>, DispatchError> {
        Ok(Arc::new(SmtpDispatchClient::new(credentials.clone(), options)?))
    }
}

/// SMTP client sharing one pooled transport across sends.
///
/// If the pooled session fails at the connection level, the client switches to
/// a fresh connection per message for the rest of the batch.
pub struct SmtpDispatchClient {
    credentials: MailCredentials,
    sender: Mailbox,
    options: SessionOptions,
    pooled: AsyncSmtpTransport<Tokio1Executor>,
    per_message: AtomicBool,
}

impl SmtpDispatchClient {
    /// Builds the client. No connection is made until the first command.
    pub fn new(
        credentials: MailCredentials,
        options: SessionOptions,
    ) -> Result<Self, DispatchError> {
        if credentials.sender_address.is_empty() || credentials.sender_secret().is_empty() {
            return Err(DispatchError::Auth {
                message: "sender address and secret are required".to_string(),
            });
        }

        let sender: Mailbox = credentials
            .sender_address
            .parse()
            .map_err(|e: lettre::address::AddressError| DispatchError::Auth {
                message: format!("invalid sender address: {e}"),
            })?;

        let pooled = build_transport(&credentials, options.max_connections, options.timeout)?;

        Ok(Self {
            credentials,
            sender,
            options,
            pooled,
            per_message: AtomicBool::new(!options.reuse_session),
        })
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        artifact: &Artifact,
    ) -> Result<Message, DispatchError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| DispatchError::AddressRejected {
                address: recipient.to_string(),
                message: e.to_string(),
            })?;

        let pdf = ContentType::parse("application/pdf").map_err(|e| {
            DispatchError::InvalidMessage {
                message: e.to_string(),
            }
        })?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(
                        Attachment::new(artifact.file_name().to_string())
                            .body(artifact.bytes().to_vec(), pdf),
                    ),
            )
            .map_err(|e| DispatchError::InvalidMessage {
                message: e.to_string(),
            })
    }
}

fn build_transport(
    credentials: &MailCredentials,
    max_connections: usize,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchError> {
    let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&credentials.host)
        .map_err(|e| classify(SmtpFailure::from_error(&e), ""))?;

    let max_size = u32::try_from(max_connections.max(1)).unwrap_or(u32::MAX);
    Ok(builder
        .port(credentials.port)
        .credentials(Credentials::new(
            credentials.sender_address.clone(),
            credentials.sender_secret().to_string(),
        ))
        .timeout(Some(timeout))
        .pool_config(PoolConfig::new().max_size(max_size))
        .build())
}

/// True when the failure came from the connection rather than a server reply.
fn is_session_failure(error: &lettre::transport::smtp::Error) -> bool {
    error.is_transport_shutdown()
        || (error.status().is_none() && !error.is_timeout() && !error.is_tls())
}

#[async_trait]
impl DispatchClient for SmtpDispatchClient {
    async fn verify(&self) -> Result<(), DispatchError> {
        match self.pooled.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DispatchError::TransientNetwork {
                message: format!("{} did not accept the connection", self.credentials.host),
            }),
            Err(e) => Err(classify(SmtpFailure::from_error(&e), "")),
        }
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        artifact: &Artifact,
    ) -> Result<(), DispatchError> {
        let message = self.build_message(recipient, subject, body, artifact)?;

        if !self.per_message.load(Ordering::Relaxed) {
            match self.pooled.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) if is_session_failure(&e) => {
                    warn!(
                        error = %e,
                        "Pooled SMTP session failed, switching to one session per message"
                    );
                    self.per_message.store(true, Ordering::Relaxed);
                }
                Err(e) => return Err(classify(SmtpFailure::from_error(&e), recipient)),
            }
        }

        debug!(recipient = %recipient, "Sending over a dedicated SMTP session");
        let transport = build_transport(&self.credentials, 1, self.options.timeout)?;
        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| classify(SmtpFailure::from_error(&e), recipient))
    }
}
