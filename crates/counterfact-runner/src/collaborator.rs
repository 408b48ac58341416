//! The LLM-backed [`Collaborator`].
//!
//! Each capability renders its template, sends it to the configured backend,
//! and parses the reply. Fork proposals are validated against the
//! collaborator contract before they are returned.

use std::time::Instant;

use counterfact_core::collaborator::{
    Collaborator, ForkRequest, NarrationRequest, validate_proposal,
};
use counterfact_core::config::LlmConfig;
use counterfact_core::error::CollaboratorError;
use counterfact_types::{CausalVar, ForkProposal, Scenario, VoiceIntent};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::RunnerError;
use crate::llm::LlmBackend;
use crate::parse;
use crate::prompt::{PromptEngine, PromptKind};

/// Collaborator that delegates to an LLM backend.
#[derive(Debug)]
pub struct LlmCollaborator {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl LlmCollaborator {
    /// A collaborator over an existing backend and prompt engine.
    pub const fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self { backend, prompts }
    }

    /// Build the backend and prompt engine from the `llm` configuration
    /// section.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if the backend cannot be built and
    /// [`RunnerError::Template`] if the templates cannot be loaded.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RunnerError> {
        let backend = LlmBackend::from_config(config)?;
        let prompts = PromptEngine::load(config.templates_dir.as_deref())?;
        info!(
            backend = backend.name(),
            model = backend.model(),
            templates = ?config.templates_dir,
            "LLM collaborator ready"
        );
        Ok(Self::new(backend, prompts))
    }

    /// Render, send, and return the raw reply.
    async fn ask(&self, kind: PromptKind, context: &Value) -> Result<String, RunnerError> {
        let prompt = self.prompts.render(kind, context)?;
        let started = Instant::now();
        let reply = self.backend.complete(&prompt).await;
        debug!(
            backend = self.backend.name(),
            prompt = kind.template_name(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok = reply.is_ok(),
            "LLM call finished"
        );
        reply
    }
}

fn fork_context(request: &ForkRequest) -> Result<Value, RunnerError> {
    Ok(json!({
        "description": request.description,
        "world": serde_json::to_string_pretty(&request.world_state)?,
        "upcoming": request.upcoming_events,
        "causal_vars": CausalVar::ALL.map(CausalVar::as_str),
    }))
}

fn narration_context(request: &NarrationRequest) -> Result<Value, RunnerError> {
    Ok(json!({
        "title": request.event_spec.title,
        "description": request.event_spec.description,
        "category": request.event_spec.category,
        "date": request.timestamp.format("%-d %B %Y").to_string(),
        "is_branch": request.is_branch,
        "world": serde_json::to_string_pretty(&request.world_state)?,
        "escalation": request.world_state.causal_var(CausalVar::Escalation),
    }))
}

impl Collaborator for LlmCollaborator {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    async fn execute_fork(&self, request: &ForkRequest) -> Result<ForkProposal, CollaboratorError> {
        let reply = self.ask(PromptKind::Fork, &fork_context(request)?).await?;
        let mut proposal: ForkProposal = parse::parse_json(&reply)?;
        // Content keys name pre-generated catalog media, which a live
        // proposal never has.
        proposal.content_key = None;
        validate_proposal(&proposal)?;
        Ok(proposal)
    }

    async fn generate_narration(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        let reply = self
            .ask(PromptKind::Narration, &narration_context(request)?)
            .await?;
        Ok(parse::parse_text(&reply)?)
    }

    async fn parse_voice_command(&self, transcript: &str) -> Result<VoiceIntent, CollaboratorError> {
        let reply = self
            .ask(PromptKind::Voice, &json!({ "transcript": transcript }))
            .await?;
        Ok(parse::parse_voice_intent(&reply)?)
    }

    async fn generate_image_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        let reply = self
            .ask(PromptKind::Image, &narration_context(request)?)
            .await?;
        Ok(parse::parse_text(&reply)?)
    }

    async fn generate_video_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<String, CollaboratorError> {
        let reply = self
            .ask(PromptKind::Video, &narration_context(request)?)
            .await?;
        Ok(parse::parse_text(&reply)?)
    }

    async fn generate_scenario(&self, topic: &str) -> Result<Scenario, CollaboratorError> {
        let context = json!({
            "topic": topic,
            "causal_vars": CausalVar::ALL.map(CausalVar::as_str),
        });
        let reply = self.ask(PromptKind::Scenario, &context).await?;
        Ok(parse::parse_scenario(&reply)?)
    }
}
