//! Configuration loading for the payslip engine.
//!
//! This module loads the company profile (identity, footer, logo, SMTP account)
//! and the engine settings (concurrency, retries, validation rules, message
//! template) from YAML or JSON files.
//!
//! # Example
//!
//! ```no_run
//! use payslip_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/acme").unwrap();
//! println!("Loaded profile: {}", config.profile().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineSettings, RetrySettings};
