//! The collaborator seam and its resilient wrapper.
//!
//! A [`Collaborator`] provides every capability the simulation delegates:
//! fork deltas, narration, voice-command parsing, image and video prompts,
//! and whole scenarios. Two implementations exist: a reasoning backend
//! (`counterfact-runner`) and the deterministic
//! [`DeterministicCollaborator`](crate::fallback::DeterministicCollaborator).
//!
//! [`Resilient`] is chosen at construction time. It tries the primary
//! collaborator when one is configured and, on any failure, answers from the
//! fallback instead, reporting that through [`Assisted::fallback_used`].

use std::future::Future;

use chrono::NaiveDate;
use counterfact_types::{
    CONTINUATION_COUNT, EventSpec, ForkProposal, Scenario, VoiceIntent,
};
use counterfact_world::WorldState;
use serde::Serialize;
use tracing::warn;

use crate::error::CollaboratorError;

/// Input of a fork-delta request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkRequest {
    /// World snapshot at the fork point.
    pub world_state: WorldState,
    /// The user's free-text description of the change.
    pub description: String,
    /// Up to two mainline events following the fork point.
    pub upcoming_events: Vec<EventSpec>,
    /// Mainline index of the fork point, when it lies on the mainline.
    pub event_index: Option<usize>,
}

/// Input of narration and media-prompt requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    /// The event to narrate.
    pub event_spec: EventSpec,
    /// Whether the event lies on an alternate branch.
    pub is_branch: bool,
    /// In-world date of the event.
    pub timestamp: NaiveDate,
    /// World snapshot after the event.
    pub world_state: WorldState,
}

/// Every capability the simulation delegates to a collaborator.
///
/// Methods return `Send` futures so that callers can run them inside
/// request handlers on a multi-threaded runtime.
pub trait Collaborator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Propose the delta, continuation events, and scores for a fork.
    fn execute_fork(
        &self,
        request: &ForkRequest,
    ) -> impl Future<Output = Result<ForkProposal, CollaboratorError>> + Send;

    /// Write two or three sentences of narration for an event.
    fn generate_narration(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;

    /// Interpret a spoken command.
    fn parse_voice_command(
        &self,
        transcript: &str,
    ) -> impl Future<Output = Result<VoiceIntent, CollaboratorError>> + Send;

    /// Prompt for an image generator.
    fn generate_image_prompt(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;

    /// Prompt for a video generator.
    fn generate_video_prompt(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;

    /// Produce a scenario seed for a topic.
    fn generate_scenario(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Scenario, CollaboratorError>> + Send;
}

/// Check a fork proposal against the collaborator contract: exactly
/// [`CONTINUATION_COUNT`] continuation events and scores within 0-100.
///
/// # Errors
///
/// Returns [`CollaboratorError::Malformed`] describing the first violation.
pub fn validate_proposal(proposal: &ForkProposal) -> Result<(), CollaboratorError> {
    if proposal.continuation_events.len() != CONTINUATION_COUNT {
        return Err(CollaboratorError::Malformed(format!(
            "expected {CONTINUATION_COUNT} continuation events, got {}",
            proposal.continuation_events.len()
        )));
    }
    if !proposal.branch_scores.in_range() {
        return Err(CollaboratorError::Malformed(String::from(
            "branch scores must lie within 0-100",
        )));
    }
    if proposal.delta.event_spec.title.trim().is_empty() {
        return Err(CollaboratorError::Malformed(String::from(
            "fork event has no title",
        )));
    }
    Ok(())
}

/// A collaborator answer together with whether the fallback produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assisted<T> {
    /// The answer.
    pub value: T,
    /// `true` when the deterministic fallback answered.
    pub fallback_used: bool,
}

/// Primary collaborator with a deterministic fallback.
#[derive(Debug, Clone)]
pub struct Resilient<P, F> {
    primary: Option<P>,
    fallback: F,
}

impl<P: Collaborator, F: Collaborator> Resilient<P, F> {
    /// Wrap an optional primary collaborator and a fallback.
    pub const fn new(primary: Option<P>, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Only the fallback.
    pub const fn fallback_only(fallback: F) -> Self {
        Self {
            primary: None,
            fallback,
        }
    }

    /// Whether a primary collaborator is configured.
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// The fallback collaborator.
    pub const fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Fork delta, validated when it comes from the primary.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn execute_fork(
        &self,
        request: &ForkRequest,
    ) -> Result<Assisted<ForkProposal>, CollaboratorError> {
        let primary = self.primary.as_ref().map(|p| async move {
            let proposal = p.execute_fork(request).await?;
            validate_proposal(&proposal)?;
            Ok(proposal)
        });
        self.attempt("execute_fork", primary, self.fallback.execute_fork(request))
            .await
    }

    /// Narration for an event.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn generate_narration(
        &self,
        request: &NarrationRequest,
    ) -> Result<Assisted<String>, CollaboratorError> {
        let primary = self.primary.as_ref().map(|p| async move {
            non_blank(p.generate_narration(request).await?, "narration")
        });
        self.attempt(
            "generate_narration",
            primary,
            self.fallback.generate_narration(request),
        )
        .await
    }

    /// Voice-command interpretation.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn parse_voice_command(
        &self,
        transcript: &str,
    ) -> Result<Assisted<VoiceIntent>, CollaboratorError> {
        let primary = self
            .primary
            .as_ref()
            .map(|p| p.parse_voice_command(transcript));
        self.attempt(
            "parse_voice_command",
            primary,
            self.fallback.parse_voice_command(transcript),
        )
        .await
    }

    /// Image prompt for an event.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn generate_image_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<Assisted<String>, CollaboratorError> {
        let primary = self.primary.as_ref().map(|p| async move {
            non_blank(p.generate_image_prompt(request).await?, "image prompt")
        });
        self.attempt(
            "generate_image_prompt",
            primary,
            self.fallback.generate_image_prompt(request),
        )
        .await
    }

    /// Video prompt for an event.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn generate_video_prompt(
        &self,
        request: &NarrationRequest,
    ) -> Result<Assisted<String>, CollaboratorError> {
        let primary = self.primary.as_ref().map(|p| async move {
            non_blank(p.generate_video_prompt(request).await?, "video prompt")
        });
        self.attempt(
            "generate_video_prompt",
            primary,
            self.fallback.generate_video_prompt(request),
        )
        .await
    }

    /// Scenario seed for a topic.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error if the fallback fails too.
    pub async fn generate_scenario(
        &self,
        topic: &str,
    ) -> Result<Assisted<Scenario>, CollaboratorError> {
        let primary = self.primary.as_ref().map(|p| async move {
            let scenario = p.generate_scenario(topic).await?;
            if scenario.events.is_empty() {
                return Err(CollaboratorError::Malformed(String::from(
                    "scenario has no events",
                )));
            }
            Ok(scenario)
        });
        self.attempt(
            "generate_scenario",
            primary,
            self.fallback.generate_scenario(topic),
        )
        .await
    }

    /// Await the primary if present; on its failure (or absence) await the
    /// fallback. Futures are lazy, so the fallback does no work unless used.
    async fn attempt<T>(
        &self,
        capability: &'static str,
        primary: Option<impl Future<Output = Result<T, CollaboratorError>>>,
        fallback: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<Assisted<T>, CollaboratorError> {
        if let Some(primary) = primary {
            match primary.await {
                Ok(value) => {
                    return Ok(Assisted {
                        value,
                        fallback_used: false,
                    });
                }
                Err(e) => warn!(
                    capability,
                    collaborator = self.primary.as_ref().map_or("none", Collaborator::name),
                    error = %e,
                    "primary collaborator failed, answering from fallback"
                ),
            }
        }

        let value = fallback.await?;
        Ok(Assisted {
            value,
            fallback_used: true,
        })
    }
}

fn non_blank(text: String, what: &str) -> Result<String, CollaboratorError> {
    if text.trim().is_empty() {
        Err(CollaboratorError::Malformed(format!("empty {what}")))
    } else {
        Ok(text)
    }
}
