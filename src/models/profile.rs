//! Company profile and mail credentials.

use std::fmt;
use std::sync::Arc;

/// Default SMTP relay used when the profile does not name one.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Credentials and endpoint for the outgoing mail session.
///
/// The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct MailCredentials {
    /// Address messages are sent from; also the login name.
    pub sender_address: String,
    sender_secret: String,
    /// SMTP relay host.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
}

impl MailCredentials {
    /// Creates credentials, stripping whitespace from the secret.
    ///
    /// Provider app passwords are commonly copied with spaces between groups.
    ///
    /// # Examples
    ///
    /// ```
    /// use payslip_engine::models::MailCredentials;
    ///
    /// let creds = MailCredentials::new("hr@acme.test", "abcd efgh ijkl mnop", "smtp.acme.test", 587);
    /// assert_eq!(creds.sender_secret(), "abcdefghijklmnop");
    /// ```
    pub fn new(
        sender_address: impl Into<String>,
        sender_secret: impl AsRef<str>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            sender_address: sender_address.into(),
            sender_secret: sender_secret
                .as_ref()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
            host: host.into(),
            port,
        }
    }

    /// Returns the login secret.
    pub fn sender_secret(&self) -> &str {
        &self.sender_secret
    }
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("sender_address", &self.sender_address)
            .field("sender_secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Company identity printed on every payslip, plus the mail session credentials.
///
/// The engine only reads a profile; it never writes one back.
#[derive(Debug, Clone)]
pub struct CompanyProfile {
    /// Company name in the header.
    pub name: String,
    /// Disclaimer text printed under the deductions table.
    pub footer_text: String,
    /// Form/document control number printed at the page foot.
    pub document_id: Option<String>,
    /// Effectivity date label printed at the page foot.
    pub effectivity_date: Option<String>,
    /// Raw PNG or JPEG logo bytes.
    pub logo: Option<Arc<[u8]>>,
    /// Mail session credentials.
    pub mail: MailCredentials,
}
