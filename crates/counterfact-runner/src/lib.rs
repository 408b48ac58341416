//! LLM-backed collaborator for the Counterfact simulation.
//!
//! [`LlmCollaborator`] implements the
//! [`Collaborator`](counterfact_core::collaborator::Collaborator) seam over
//! an HTTP LLM backend. It is always used as the primary of a
//! [`Resilient`](counterfact_core::collaborator::Resilient) wrapper, so any
//! error here is absorbed by the deterministic fallback.
//!
//! # Modules
//!
//! - [`llm`] -- OpenAI-compatible and Anthropic backends (enum dispatch)
//! - [`prompt`] -- `minijinja` templates, built in or loaded from disk
//! - [`parse`] -- Tolerant parsing of JSON and text replies
//! - [`collaborator`] -- The collaborator implementation
//! - [`error`] -- [`RunnerError`](error::RunnerError)

pub mod collaborator;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;

pub use collaborator::LlmCollaborator;
pub use error::RunnerError;
