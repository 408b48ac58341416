//! The deterministic collaborator.
//!
//! This is the guaranteed-available path: every capability answers from
//! local data and fixed rules, and never fails for well-formed input. Fork
//! requests are served from the scenario's branch catalog when the
//! description matches a pre-generated branch, and from keyword-driven
//! change categories otherwise.

mod catalog;
mod categories;
mod prose;
mod voice;

pub use catalog::{BranchCatalog, MIN_KEYWORD_MATCHES};
pub use categories::ChangeCategory;

use counterfact_types::{ForkProposal, Scenario, VoiceIntent};

use crate::collaborator::{Collaborator, ForkRequest, NarrationRequest};
use crate::error::{CollaboratorError, SeedError};
use crate::seed;

/// Collaborator backed by a scenario's catalog and fixed rules.
#[derive(Debug, Clone)]
pub struct DeterministicCollaborator {
    scenario: Scenario,
    catalog: BranchCatalog,
}

impl DeterministicCollaborator {
    /// Serve forks from the given scenario's catalog.
    pub fn new(scenario: Scenario) -> Self {
        let catalog = BranchCatalog::new(&scenario.catalog);
        Self { scenario, catalog }
    }

    /// Serve forks from the built-in scenario.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the embedded scenario does not parse.
    pub fn builtin() -> Result<Self, SeedError> {
        seed::builtin_scenario().map(Self::new)
    }

    /// The pre-generated branch catalog.
    pub const fn catalog(&self) -> &BranchCatalog {
        &self.catalog
    }

    /// The fork proposal for a request. Infallible.
    pub fn propose(&self, request: &ForkRequest) -> ForkProposal {
        request
            .event_index
            .and_then(|index| self.catalog.propose(index, &request.description))
            .unwrap_or_else(|| categories::propose(request))
    }

    /// The scenario served for a topic: the seed scenario retitled.
    pub fn scenario_for(&self, topic: &str) -> Scenario {
        let mut scenario = self.scenario.clone();
        let topic = topic.trim();
        if !topic.is_empty() {
            scenario.title = topic.to_owned();
        }
        scenario
    }
}

impl Collaborator for DeterministicCollaborator {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn execute_fork(&self, request: &ForkRequest) -> Result<ForkProposal, CollaboratorError> {
        Ok(self.propose(request))
    }

    async fn generate_narration(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        Ok(prose::narration(request))
    }

    async fn parse_voice_command(&self, transcript: &str) -> Result<VoiceIntent, CollaboratorError> {
        Ok(voice::parse(transcript))
    }

    async fn generate_image_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        Ok(prose::image_prompt(request))
    }

    async fn generate_video_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        Ok(prose::video_prompt(request))
    }

    async fn generate_scenario(&self, topic: &str) -> Result<Scenario, CollaboratorError> {
        Ok(self.scenario_for(topic))
    }
}
