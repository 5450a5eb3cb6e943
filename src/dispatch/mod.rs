//! Mail delivery of rendered payslips.
//!
//! A [`DispatchConnector`] opens one authenticated [`DispatchClient`] session per
//! batch. Failures are classified into [`DispatchError`](crate::error::DispatchError)
//! classes; [`RetryPolicy`] retries the transient ones with backoff.

mod classify;
mod client;
mod message;
mod retry;

pub use client::{
    DispatchClient, DispatchConnector, SessionOptions, SmtpConnector, SmtpDispatchClient,
};
pub use message::MessageTemplate;
pub use retry::RetryPolicy;
