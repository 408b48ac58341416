//! Application state assembly from configuration.
//!
//! [`build_state`] loads the scenario seed and the content cache, then
//! builds the collaborator. An LLM backend that cannot be built is not
//! fatal: the server logs a warning and runs on the deterministic
//! collaborator alone.

use counterfact_core::collaborator::Resilient;
use counterfact_core::config::{AppConfig, ConfigError, LlmConfig};
use counterfact_core::content::ContentCache;
use counterfact_core::error::SeedError;
use counterfact_core::fallback::DeterministicCollaborator;
use counterfact_core::seed;
use counterfact_runner::LlmCollaborator;
use tracing::{info, warn};

use crate::state::{AppState, ServerCollaborator};

/// Errors that can occur while assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The scenario seed could not be loaded.
    #[error("scenario error: {0}")]
    Seed(#[from] SeedError),

    /// The content cache could not be loaded.
    #[error("content cache error: {0}")]
    Content(#[from] ConfigError),
}

/// Build the shared application state described by `config`.
///
/// # Errors
///
/// Returns [`StartupError::Seed`] if the configured scenario cannot be
/// loaded and [`StartupError::Content`] if the content cache cannot be
/// read.
pub fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let scenario = match &config.scenario.seed_path {
        Some(path) => seed::load_scenario(path)?,
        None => seed::builtin_scenario()?,
    };
    info!(
        title = %scenario.title,
        events = scenario.events.len(),
        catalog = scenario.catalog.len(),
        "scenario loaded"
    );

    let content = match &config.content.cache_path {
        Some(path) => ContentCache::load(path)?,
        None => ContentCache::new(),
    };
    info!(entries = content.len(), "content cache loaded");

    let fallback = DeterministicCollaborator::new(scenario);
    Ok(AppState::new(build_collaborator(&config.llm, fallback), content))
}

/// The resilient collaborator for the `llm` configuration section.
pub fn build_collaborator(
    config: &LlmConfig,
    fallback: DeterministicCollaborator,
) -> ServerCollaborator {
    if !config.enabled {
        info!("LLM disabled, using deterministic collaborator");
        return Resilient::fallback_only(fallback);
    }

    match LlmCollaborator::from_config(config) {
        Ok(primary) => Resilient::new(Some(primary), fallback),
        Err(e) => {
            warn!(
                error = %e,
                backend = %config.backend,
                "LLM collaborator unavailable, using deterministic collaborator"
            );
            Resilient::fallback_only(fallback)
        }
    }
}
