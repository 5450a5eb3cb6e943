//! Mapping of SMTP failures onto [`DispatchError`] classes.

use lettre::transport::smtp;

use crate::error::DispatchError;

/// The parts of a transport failure that decide its class.
#[derive(Debug, Clone, Default)]
pub(crate) struct SmtpFailure {
    /// Three-digit reply code, when the server answered.
    pub code: Option<u16>,
    /// Server reply or transport message.
    pub message: String,
}

impl SmtpFailure {
    pub(crate) fn from_error(error: &smtp::Error) -> Self {
        Self {
            code: error.status().map(u16::from),
            message: error.to_string(),
        }
    }
}

/// Classifies a failed send to `recipient`.
///
/// | Reply                                     | Class              |
/// |-------------------------------------------|--------------------|
/// | `5.4.5`, or a sender sending-limit notice | `QuotaExceeded`    |
/// | 530, 534, 535, 538                        | `Auth`             |
/// | 421, 452, or "too many"                   | `RateLimited`      |
/// | other 4xx, or no reply at all             | `TransientNetwork` |
/// | other 5xx, including a full mailbox       | `AddressRejected`  |
///
/// A recipient's full mailbox (`552`, `5.2.2`) only fails that recipient.
pub(crate) fn classify(failure: SmtpFailure, recipient: &str) -> DispatchError {
    let lowered = failure.message.to_ascii_lowercase();
    let message = failure.message;

    let mailbox_full = failure.code == Some(552) || lowered.contains("5.2.2");
    if !mailbox_full && is_sender_quota(&lowered) {
        return DispatchError::QuotaExceeded { message };
    }

    match failure.code {
        Some(530 | 534 | 535 | 538) => DispatchError::Auth { message },
        Some(421 | 452) => DispatchError::RateLimited { message },
        Some(400..=499) if lowered.contains("too many") || lowered.contains("rate limit") => {
            DispatchError::RateLimited { message }
        }
        Some(400..=499) | None => DispatchError::TransientNetwork { message },
        Some(_) => DispatchError::AddressRejected {
            address: recipient.to_string(),
            message,
        },
    }
}

fn is_sender_quota(lowered: &str) -> bool {
    lowered.contains("5.4.5")
        || lowered.contains("sending limit")
        || lowered.contains("sending quota")
}
