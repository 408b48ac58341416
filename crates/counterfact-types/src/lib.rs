//! Shared type definitions for the Counterfact simulation.
//!
//! This crate is the single source of truth for the data exchanged between
//! the world model, the story graph, the collaborators, and the HTTP
//! surface. Types flow downstream to `TypeScript` via `ts-rs` for the
//! timeline viewer.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (UUID-backed and string-keyed)
//! - [`enums`] -- Causal variables, fact kinds, diff kinds, voice intents
//! - [`structs`] -- Entities, facts, events, scores, render packs, projections
//! - [`delta`] -- Deltas and the fork proposal payload
//! - [`scenario`] -- Scenario seeds and content-key naming

pub mod delta;
pub mod enums;
pub mod ids;
pub mod scenario;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use delta::{
    CONTINUATION_COUNT, CausalVarChange, ContinuationEvent, Delta, EntityChange, FactChange,
    ForkDelta, ForkProposal,
};
pub use enums::{CausalVar, ChangeKind, FactKind, VoiceIntentKind};
pub use ids::{BranchId, MAIN_BRANCH, NodeId, RenderPackId, SessionId};
pub use scenario::{
    CatalogBranch, CatalogEntry, Scenario, SeedEvent, WorldSeed, branch_content_key,
    continuation_content_key, mainline_content_key,
};
pub use structs::{
    BranchScores, BranchSummary, DEFAULT_FACT_CONFIDENCE, Entity, EventSpec, Fact,
    PregeneratedContent, RenderPack, StateChange, TimelineEntry, VoiceIntent,
};
