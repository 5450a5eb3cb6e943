//! Configuration types for the payslip engine.
//!
//! This module contains the strongly-typed structures deserialized from the
//! company profile document and the engine settings file.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dispatch::MessageTemplate;
use crate::models::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, LineItem};
use crate::validation::{DuplicatePolicy, ValidationRules};

/// On-disk shape of the company profile.
///
/// ```yaml
/// company_name: Acme Corp
/// footer_text: This payslip is confidential.
/// document_id: HR-FORM-012
/// effectivity_date: January 1, 2025
/// logo: logo.png
/// smtp:
///   email: hr@acme.test
///   password: abcd efgh ijkl mnop
/// ```
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileDocument {
    pub company_name: String,
    #[serde(default)]
    pub footer_text: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub effectivity_date: Option<String>,
    /// Logo path, relative to the profile document.
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub smtp: SmtpSection,
}

/// Mail section of the profile document.
#[derive(Clone, Deserialize)]
pub(crate) struct SmtpSection {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

impl Default for SmtpSection {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            host: default_smtp_host(),
            port: default_smtp_port(),
        }
    }
}

impl std::fmt::Debug for SmtpSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSection")
            .field("email", &self.email)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

/// Retry behaviour for failed sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry of a network failure, in milliseconds.
    pub base_delay_ms: u64,
    /// Delay before the first retry of a rate-limited send, in milliseconds.
    pub rate_limit_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            rate_limit_delay_ms: 5_000,
            max_delay_ms: 30_000,
        }
    }
}

/// Tunables for a batch run.
///
/// Every field has a default, so an empty settings file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Documents rendered in parallel.
    pub render_workers: usize,
    /// Sends in flight at once.
    pub dispatch_concurrency: usize,
    /// Limit for a single send attempt, in seconds.
    pub send_timeout_secs: u64,
    /// Retry behaviour for transient send failures.
    pub retry: RetrySettings,
    /// Reuse one pooled SMTP session across recipients.
    pub reuse_session: bool,
    /// Repeated employee id handling.
    pub duplicate_policy: DuplicatePolicy,
    /// Maximum allowed `|gross - deductions - net|`; off when absent.
    pub net_pay_tolerance: Option<Decimal>,
    /// Line items printed even when zero.
    pub pinned_line_items: Vec<LineItem>,
    /// Message subject and body.
    pub message: MessageTemplate,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            render_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            dispatch_concurrency: 2,
            send_timeout_secs: 30,
            retry: RetrySettings::default(),
            reuse_session: true,
            duplicate_policy: DuplicatePolicy::default(),
            net_pay_tolerance: None,
            pinned_line_items: Vec::new(),
            message: MessageTemplate::default(),
        }
    }
}

impl EngineSettings {
    /// The per-attempt send timeout, never shorter than one second.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs.max(1))
    }

    /// Row rules for the validator.
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            duplicate_policy: self.duplicate_policy,
            net_pay_tolerance: self.net_pay_tolerance,
        }
    }
}
