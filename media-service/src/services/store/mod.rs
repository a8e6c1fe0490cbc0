//! Storage seam.
//!
//! Every same-key race in the service (duplicate registration, concurrent
//! likes, refresh-token rotation, playlist membership) is settled here by an
//! atomic operation of the backing store: a unique index or a conditional
//! single-document update. Nothing above this layer takes a lock.

mod memory;
mod mongo;

pub use memory::{InMemoryCollection, InMemoryStore};
pub use mongo::{MongoCollection, MongoDb};

use async_trait::async_trait;
use mongodb::bson::Document;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::services::ownership::Owned;
use crate::models::{
    Comment, EdgeKey, Playlist, ProfileUpdate, RelationKind, RelationshipEdge, Tweet, User, Video,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Duplicate key")]
    Duplicate,

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Filter for the simple listings the service exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    Owner(String),
    Video(String),
    /// Items of `owner_id` that `viewer_id` may see.
    VisibleTo { owner_id: String, viewer_id: String },
}

/// Scalar written by an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Set(&'static str, FieldValue),
    /// Append to an array field unless already present.
    AddToSet(&'static str, String),
    /// Remove every occurrence from an array field.
    Pull(&'static str, String),
}

/// Precondition the stored document must satisfy for an [`Update`] to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Equals(&'static str, FieldValue),
    Contains(&'static str, String),
}

/// Field-level edit applied by the store as one atomic operation.
///
/// Only the named fields are written (plus `updated_at`), so concurrent
/// edits to different fields of one document never overwrite each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub edits: Vec<FieldEdit>,
    pub guards: Vec<Guard>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.edits.push(FieldEdit::Set(field, value.into()));
        self
    }

    pub fn add_to_set(mut self, field: &'static str, value: &str) -> Self {
        self.edits.push(FieldEdit::AddToSet(field, value.to_string()));
        self
    }

    pub fn pull(mut self, field: &'static str, value: &str) -> Self {
        self.edits.push(FieldEdit::Pull(field, value.to_string()));
        self
    }

    pub fn when_equals(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.guards.push(Guard::Equals(field, value.into()));
        self
    }

    pub fn when_contains(mut self, field: &'static str, value: &str) -> Self {
        self.guards.push(Guard::Contains(field, value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Everything, for internal aggregation.
    pub fn all() -> Self {
        Self {
            page: 1,
            limit: u64::MAX,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A document kind stored by [`ResourceStore`].
pub trait Resource:
    Owned + Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static
{
    const COLLECTION: &'static str;
    /// Human label used in error messages.
    const LABEL: &'static str;

    fn id(&self) -> &str;
    fn matches(&self, filter: &ListFilter) -> bool;

    /// The Mongo query equivalent of [`Resource::matches`].
    fn filter_doc(filter: &ListFilter) -> Document;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Duplicate`] when username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Exact match on the stored (lowercased) username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Any user whose username or email matches.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Returns the updated user, or `None` when it does not exist.
    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError>;

    /// Unconditionally set (or clear, with `None`) the refresh token digest.
    async fn set_refresh_token_hash(
        &self,
        id: &str,
        digest: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Atomically replace the stored digest only if it still equals `expected`.
    ///
    /// Returns false when the user is gone or holds a different digest, which
    /// is how a superseded or revoked refresh token is detected.
    async fn swap_refresh_token_hash(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the key already has an edge.
    async fn insert_edge(&self, edge: &RelationshipEdge) -> Result<(), StoreError>;

    /// Atomically find and delete the edge for `key`.
    async fn take_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, StoreError>;

    async fn count_edges(&self, key: &EdgeKey) -> Result<u64, StoreError>;

    /// Edges created by `actor_id` of the given kind.
    async fn edges_from(
        &self,
        actor_id: &str,
        kind: RelationKind,
    ) -> Result<Vec<RelationshipEdge>, StoreError>;

    /// Edges of the given kind pointing at `target_id`.
    async fn edges_to(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<Vec<RelationshipEdge>, StoreError>;

    /// Number of edges of `kind` pointing at any of `target_ids`.
    async fn count_edges_to(
        &self,
        kind: RelationKind,
        target_ids: &[String],
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ResourceStore<T: Resource>: Send + Sync {
    async fn insert(&self, item: &T) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Apply `update` to the document with this id and owner, if its guards
    /// hold, and return the document as stored afterwards.
    ///
    /// `None` means nothing matched: the document is gone, belongs to someone
    /// else, or failed a guard. The owner is part of the match so an update can
    /// never reassign it.
    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        update: &Update,
    ) -> Result<Option<T>, StoreError>;

    /// Delete by id, only if still owned by `owner_id`.
    async fn delete(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;

    async fn list(&self, filter: &ListFilter, page: Page) -> Result<Vec<T>, StoreError>;
}

/// Handles to every collection the service uses.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub edges: Arc<dyn EdgeStore>,
    pub videos: Arc<dyn ResourceStore<Video>>,
    pub comments: Arc<dyn ResourceStore<Comment>>,
    pub tweets: Arc<dyn ResourceStore<Tweet>>,
    pub playlists: Arc<dyn ResourceStore<Playlist>>,
}

impl Store {
    pub fn mongo(db: &MongoDb) -> Self {
        Self {
            users: Arc::new(db.clone()),
            edges: Arc::new(db.clone()),
            videos: Arc::new(db.resource::<Video>()),
            comments: Arc::new(db.resource::<Comment>()),
            tweets: Arc::new(db.resource::<Tweet>()),
            playlists: Arc::new(db.resource::<Playlist>()),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            edges: store,
            videos: Arc::new(InMemoryCollection::<Video>::new()),
            comments: Arc::new(InMemoryCollection::<Comment>::new()),
            tweets: Arc::new(InMemoryCollection::<Tweet>::new()),
            playlists: Arc::new(InMemoryCollection::<Playlist>::new()),
        }
    }

    /// Whether the target of an edge kind exists.
    pub async fn target_exists(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<bool, StoreError> {
        let exists = match kind {
            RelationKind::Video => self.videos.find(target_id).await?.is_some(),
            RelationKind::Comment => self.comments.find(target_id).await?.is_some(),
            RelationKind::Tweet => self.tweets.find(target_id).await?.is_some(),
            RelationKind::Channel => self.users.find_user_by_id(target_id).await?.is_some(),
        };
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps_limit_and_page() {
        let page = Page::new(Some(0), Some(1_000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.skip(), 0);

        let page = Page::new(Some(3), Some(20));
        assert_eq!(page.skip(), 40);
    }

    #[tokio::test]
    async fn test_target_exists_per_kind() {
        let store = Store::in_memory();
        let user = User::new("alice", "alice@example.com", "Alice", "hash".into());
        store.users.insert_user(&user).await.unwrap();
        let video = Video::new(
            user.id.clone(),
            "https://cdn/v.mp4".into(),
            "https://cdn/t.png".into(),
            "title".into(),
            "desc".into(),
        );
        store.videos.insert(&video).await.unwrap();

        assert!(store.target_exists(RelationKind::Video, &video.id).await.unwrap());
        assert!(store.target_exists(RelationKind::Channel, &user.id).await.unwrap());
        assert!(!store.target_exists(RelationKind::Tweet, &video.id).await.unwrap());
        assert!(!store.target_exists(RelationKind::Comment, "missing").await.unwrap());
    }
}
