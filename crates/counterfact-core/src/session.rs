//! Sessions and the process-wide session store.
//!
//! A session owns one story graph and the render packs of its nodes. The
//! store is created once at startup and passed to request handlers; entries
//! are never evicted. Each session sits behind its own lock, so work on one
//! session never blocks another.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use counterfact_types::{
    NodeId, RenderPack, RenderPackId, Scenario, SessionId, mainline_content_key,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::content::ContentCache;
use crate::error::{SeedError, StoreError};
use crate::graph::StoryGraph;
use crate::seed;

/// Descriptive data about a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Scenario title.
    pub title: String,
    /// Scenario summary.
    pub description: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// One simulation session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id.
    pub id: SessionId,
    /// The story graph.
    pub graph: StoryGraph,
    /// Render packs by the node they render.
    pub render_packs: BTreeMap<NodeId, RenderPack>,
    /// Descriptive data.
    pub metadata: SessionMetadata,
}

impl Session {
    /// Build a session from a scenario: the mainline graph plus one render
    /// pack per mainline node, keyed `main-<index>` in the content cache.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the mainline cannot be built.
    pub fn from_scenario(scenario: &Scenario, content: &ContentCache) -> Result<Self, SeedError> {
        let mut graph = seed::build_graph(scenario)?;

        let packs: Vec<RenderPack> = graph
            .get_mainline()
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let key = mainline_content_key(index);
                let cached = content.get(&key).cloned().unwrap_or_default();
                RenderPack {
                    id: RenderPackId::new(),
                    event_node_id: node.id.clone(),
                    content_key: Some(key),
                    narration_text: cached.narration_text,
                    audio_url: cached.audio_url,
                    anchor_image_url: cached.anchor_image_url,
                    image_prompt: None,
                    video_prompt: None,
                }
            })
            .collect();

        let mut render_packs = BTreeMap::new();
        for pack in packs {
            graph.attach_render_pack(&pack.event_node_id, pack.id)?;
            render_packs.insert(pack.event_node_id.clone(), pack);
        }

        Ok(Self {
            id: SessionId::new(),
            graph,
            render_packs,
            metadata: SessionMetadata {
                title: scenario.title.clone(),
                description: scenario.description.clone(),
                created_at: Utc::now(),
            },
        })
    }

    /// Store a render pack and point its node at it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`](crate::error::GraphError) if the
    /// pack's node does not exist.
    pub fn add_render_pack(&mut self, pack: RenderPack) -> Result<(), StoreError> {
        self.graph.attach_render_pack(&pack.event_node_id, pack.id)?;
        self.render_packs.insert(pack.event_node_id.clone(), pack);
        Ok(())
    }
}

/// Shared handle to one session.
pub type SessionHandle = Arc<RwLock<Session>>;

/// Keyed container of live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<BTreeMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its id, returning the id.
    pub async fn create(&self, session: Session) -> SessionId {
        let id = session.id;
        info!(
            session_id = %id,
            title = %session.metadata.title,
            nodes = session.graph.node_count(),
            "session created"
        );
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(session)));
        id
    }

    /// The session with this id.
    pub async fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Store a render pack in a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionNotFound`] for an unknown session and
    /// [`StoreError::Graph`] if the pack's node does not exist.
    pub async fn add_render_pack(&self, id: SessionId, pack: RenderPack) -> Result<(), StoreError> {
        let session = self.get(id).await.ok_or(StoreError::SessionNotFound(id))?;
        let mut session = session.write().await;
        session.add_render_pack(pack)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions exist.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use counterfact_types::PregeneratedContent;

    use super::*;
    use crate::error::GraphError;

    fn content() -> ContentCache {
        ContentCache::from_entries(BTreeMap::from([(
            String::from("main-1"),
            PregeneratedContent {
                narration_text: Some(String::from("France falls.")),
                audio_url: None,
                anchor_image_url: Some(String::from("/media/france.jpg")),
            },
        )]))
    }

    #[test]
    fn mainline_nodes_get_render_packs() {
        let scenario = seed::builtin_scenario().unwrap();
        let session = Session::from_scenario(&scenario, &content()).unwrap();

        assert_eq!(session.render_packs.len(), scenario.events.len());
        let node = session.graph.get_node(&NodeId::new("main-1")).unwrap();
        let pack = session.render_packs.get(&node.id).unwrap();
        assert_eq!(node.render_pack_id, Some(pack.id));
        assert_eq!(pack.content_key.as_deref(), Some("main-1"));
        assert_eq!(pack.narration_text.as_deref(), Some("France falls."));

        let other = session.render_packs.get(&NodeId::new("main-0")).unwrap();
        assert!(other.narration_text.is_none());
        assert_eq!(session.metadata.title, scenario.title);
    }

    #[tokio::test]
    async fn store_round_trip() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let scenario = seed::builtin_scenario().unwrap();
        let session = Session::from_scenario(&scenario, &ContentCache::new()).unwrap();
        let id = store.create(session).await;
        assert_eq!(store.len().await, 1);
        assert!(store.get(id).await.is_some());
        assert!(store.get(SessionId::new()).await.is_none());

        let pack = RenderPack {
            id: RenderPackId::new(),
            event_node_id: NodeId::new("main-2"),
            content_key: None,
            narration_text: Some(String::from("Replaced.")),
            audio_url: None,
            anchor_image_url: None,
            image_prompt: None,
            video_prompt: None,
        };
        store.add_render_pack(id, pack.clone()).await.unwrap();
        let handle = store.get(id).await.unwrap();
        let session = handle.read().await;
        assert_eq!(
            session.graph.get_node(&NodeId::new("main-2")).unwrap().render_pack_id,
            Some(pack.id)
        );
    }

    #[tokio::test]
    async fn add_render_pack_errors() {
        let store = SessionStore::new();
        let pack = RenderPack {
            id: RenderPackId::new(),
            event_node_id: NodeId::new("nowhere"),
            content_key: None,
            narration_text: None,
            audio_url: None,
            anchor_image_url: None,
            image_prompt: None,
            video_prompt: None,
        };
        let missing = SessionId::new();
        assert_eq!(
            store.add_render_pack(missing, pack.clone()).await,
            Err(StoreError::SessionNotFound(missing))
        );

        let scenario = seed::builtin_scenario().unwrap();
        let id = store
            .create(Session::from_scenario(&scenario, &ContentCache::new()).unwrap())
            .await;
        assert_eq!(
            store.add_render_pack(id, pack).await,
            Err(StoreError::Graph(GraphError::NodeNotFound(NodeId::new("nowhere"))))
        );
    }
}
