//! Type-safe identifier wrappers.
//!
//! Sessions and render packs are identified by [`Uuid`] v7 values generated
//! app-side. Event nodes and branches use string keys instead: seed
//! scenarios name their mainline nodes (`main-0`, `main-1`, ...) and the
//! mainline branch is always the literal `main`, so those identifiers must
//! be able to carry human-authored text.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around [`String`] for human-readable keys.
///
/// `generate()` produces a fresh, collision-free key with the given prefix
/// followed by a UUID v7 in simple (hyphen-less) form.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing key.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Generate a new unique key.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::now_v7().simple()))
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a simulation session.
    SessionId
}

define_id! {
    /// Unique identifier for a render pack (narration/image bundle).
    RenderPackId
}

define_key! {
    /// Identifier of an event node in the story graph.
    NodeId, "node"
}

define_key! {
    /// Identifier of a branch in the story graph.
    BranchId, "branch"
}

/// The literal id of the mainline branch.
pub const MAIN_BRANCH: &str = "main";

impl BranchId {
    /// The mainline branch id.
    pub fn main() -> Self {
        Self::new(MAIN_BRANCH)
    }

    /// Whether this is the mainline branch.
    pub fn is_main(&self) -> bool {
        self.0 == MAIN_BRANCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let session = SessionId::new();
        let pack = RenderPackId::new();
        assert_ne!(session.into_inner(), Uuid::nil());
        assert_ne!(pack.into_inner(), Uuid::nil());
    }

    #[test]
    fn generated_keys_are_unique_and_prefixed() {
        let a = BranchId::generate();
        let b = BranchId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("branch-"));
        assert!(NodeId::generate().as_str().starts_with("node-"));
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let id = NodeId::new("main-3");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"main-3\"");
        let restored: Result<NodeId, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(id));
    }

    #[test]
    fn main_branch_is_recognised() {
        assert!(BranchId::main().is_main());
        assert!(!BranchId::generate().is_main());
    }
}
