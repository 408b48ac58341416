//! World snapshots and the delta algebra for the Counterfact simulation.
//!
//! This crate models the state of the world at a single point on a branch:
//! entities, facts, and five bounded causal variables. Snapshots are
//! immutable values; change happens only by applying a
//! [`Delta`](counterfact_types::Delta), which yields a new snapshot.
//!
//! # Modules
//!
//! - [`state`] -- [`WorldState`] construction, accessors, `apply_delta`, `diff`.
//! - `apply` -- per-change application rules (entity synthesis, fact
//!   deletion/update/replacement, causal clamping).
//! - `diff` -- structural comparison of two snapshots.

mod apply;
mod diff;
pub mod state;

pub use state::WorldState;
