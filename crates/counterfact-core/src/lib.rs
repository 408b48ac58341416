//! Story graph, fork pipeline, and collaborator fallback for Counterfact.
//!
//! This crate turns world snapshots into a branching history: a session
//! holds a story graph seeded from a scenario, and the fork pipeline grows
//! it one branch at a time with help from a collaborator.
//!
//! # Modules
//!
//! - [`node`] -- [`EventNode`]: one point in time on one branch.
//! - [`graph`] -- [`StoryGraph`]: node/branch registry, traversal, timeline
//!   reconstruction, and the `fork` commit.
//! - [`collaborator`] -- The [`Collaborator`] trait and the [`Resilient`]
//!   primary-with-fallback wrapper.
//! - [`fallback`] -- The deterministic collaborator and its branch catalog.
//! - [`fork`] -- [`ForkPipeline`]: the eight-step fork execution.
//! - [`session`] -- Sessions and the process-wide [`SessionStore`].
//! - [`seed`] -- Scenario loading and mainline construction.
//! - [`content`] -- The pre-generated content cache.
//! - [`config`] -- Configuration loading from `counterfact-config.yaml`.
//! - [`error`] -- Error types.
//!
//! [`EventNode`]: node::EventNode
//! [`StoryGraph`]: graph::StoryGraph
//! [`Collaborator`]: collaborator::Collaborator
//! [`Resilient`]: collaborator::Resilient
//! [`ForkPipeline`]: fork::ForkPipeline
//! [`SessionStore`]: session::SessionStore

pub mod collaborator;
pub mod config;
pub mod content;
pub mod error;
pub mod fallback;
pub mod fork;
pub mod graph;
pub mod node;
pub mod seed;
pub mod session;
