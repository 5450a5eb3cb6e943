//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the company profile
//! and engine settings from YAML or JSON files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{CompanyProfile, MailCredentials};

use super::types::{EngineSettings, ProfileDocument};

/// Loads and provides access to the company profile and engine settings.
///
/// # Directory Structure
///
/// ```text
/// config/acme/
/// ├── profile.yaml    # Company identity and SMTP account (or profile.json)
/// ├── settings.yaml   # Engine tunables (optional)
/// └── logo.png        # Referenced from profile.yaml (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use payslip_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/acme")?;
/// println!("Company: {}", loader.profile().name);
/// println!("Render workers: {}", loader.settings().render_workers);
/// # Ok::<(), payslip_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    profile: CompanyProfile,
    settings: EngineSettings,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// `profile.yaml` (or `profile.json`) is required. `settings.yaml` is optional;
    /// defaults apply when it is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let yaml_profile = path.join("profile.yaml");
        let json_profile = path.join("profile.json");
        let profile_path = if !yaml_profile.exists() && json_profile.exists() {
            json_profile
        } else {
            yaml_profile
        };
        let profile = Self::load_profile(&profile_path)?;

        let settings_path = path.join("settings.yaml");
        let settings = if settings_path.exists() {
            Self::load_settings(&settings_path)?
        } else {
            EngineSettings::default()
        };

        Ok(Self { profile, settings })
    }

    /// Loads a company profile document, reading the logo it references.
    ///
    /// The format is chosen by extension: `.json` is parsed as JSON, anything
    /// else as YAML. The logo path is resolved relative to the document.
    pub fn load_profile<P: AsRef<Path>>(path: P) -> EngineResult<CompanyProfile> {
        let path = path.as_ref();
        let document: ProfileDocument = Self::load_document(path)?;

        if document.company_name.trim().is_empty() {
            return Err(EngineError::InvalidProfile {
                field: "company_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if document.smtp.port == 0 {
            return Err(EngineError::InvalidProfile {
                field: "smtp.port".to_string(),
                message: "must be between 1 and 65535".to_string(),
            });
        }

        let logo = match &document.logo {
            Some(logo) => {
                let logo_path = resolve_relative(path, logo);
                Some(Self::load_logo(logo_path)?)
            }
            None => None,
        };

        let smtp = document.smtp;
        Ok(CompanyProfile {
            name: document.company_name.trim().to_string(),
            footer_text: document.footer_text,
            document_id: document.document_id.filter(|s| !s.trim().is_empty()),
            effectivity_date: document.effectivity_date.filter(|s| !s.trim().is_empty()),
            logo,
            mail: MailCredentials::new(smtp.email.trim(), smtp.password, smtp.host, smtp.port),
        })
    }

    /// Reads logo bytes. Decoding happens at render time.
    pub fn load_logo<P: AsRef<Path>>(path: P) -> EngineResult<Arc<[u8]>> {
        let path = path.as_ref();
        fs::read(path)
            .map(Arc::from)
            .map_err(|_| EngineError::ConfigNotFound {
                path: path.display().to_string(),
            })
    }

    /// Loads and checks engine settings.
    pub fn load_settings<P: AsRef<Path>>(path: P) -> EngineResult<EngineSettings> {
        let settings: EngineSettings = Self::load_document(path.as_ref())?;
        Self::check_settings(&settings)?;
        Ok(settings)
    }

    fn check_settings(settings: &EngineSettings) -> EngineResult<()> {
        let invalid = |field: &str, message: &str| EngineError::InvalidSettings {
            field: field.to_string(),
            message: message.to_string(),
        };

        if settings.render_workers == 0 {
            return Err(invalid("render_workers", "must be at least 1"));
        }
        if settings.dispatch_concurrency == 0 {
            return Err(invalid("dispatch_concurrency", "must be at least 1"));
        }
        if settings.send_timeout_secs == 0 {
            return Err(invalid("send_timeout_secs", "must be at least 1"));
        }
        if settings
            .net_pay_tolerance
            .is_some_and(|t| t < Decimal::ZERO)
        {
            return Err(invalid("net_pay_tolerance", "must not be negative"));
        }
        Ok(())
    }

    /// Loads and parses a YAML or JSON file.
    fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let parsed = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| EngineError::ConfigParseError {
            path: path_str,
            message,
        })
    }

    /// Returns the company profile.
    pub fn profile(&self) -> &CompanyProfile {
        &self.profile
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Consumes the loader, returning the profile and settings.
    pub fn into_parts(self) -> (CompanyProfile, EngineSettings) {
        (self.profile, self.settings)
    }
}

fn resolve_relative(document: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    document
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf())
}
