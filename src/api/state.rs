//! Application state for the payslip batch API.

use std::sync::Arc;

use crate::batch::BatchOrchestrator;
use crate::config::{ConfigLoader, EngineSettings};
use crate::dispatch::DispatchConnector;
use crate::models::CompanyProfile;

/// Shared application state.
///
/// Holds the company profile and the orchestrator every request runs against.
#[derive(Clone)]
pub struct AppState {
    profile: Arc<CompanyProfile>,
    orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    /// Creates state that delivers live batches over SMTP.
    pub fn new(config: ConfigLoader) -> Self {
        let (profile, settings) = config.into_parts();
        Self {
            profile: Arc::new(profile),
            orchestrator: Arc::new(BatchOrchestrator::new(settings)),
        }
    }

    /// Creates state whose live batches go through `connector`.
    pub fn with_connector(
        profile: CompanyProfile,
        settings: EngineSettings,
        connector: Arc<dyn DispatchConnector>,
    ) -> Self {
        Self {
            profile: Arc::new(profile),
            orchestrator: Arc::new(BatchOrchestrator::with_connector(settings, connector)),
        }
    }

    /// The company profile.
    pub fn profile(&self) -> Arc<CompanyProfile> {
        self.profile.clone()
    }

    /// The batch orchestrator.
    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }
}
