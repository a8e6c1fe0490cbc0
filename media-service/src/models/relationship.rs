//! Relationship edges: likes and subscriptions.
//!
//! An edge's existence is the relationship state. Each collection carries a
//! unique index on `(actor_id, kind, target_id)` so a key can never hold two
//! edges, whatever the interleaving of concurrent toggles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// What an edge points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Like on a video.
    Video,
    /// Like on a comment.
    Comment,
    /// Like on a tweet.
    Tweet,
    /// Subscription to a channel (another user).
    Channel,
}

/// Physical collection an edge kind is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCollection {
    Likes,
    Subscriptions,
}

impl EdgeCollection {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeCollection::Likes => "likes",
            EdgeCollection::Subscriptions => "subscriptions",
        }
    }
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Video => "video",
            RelationKind::Comment => "comment",
            RelationKind::Tweet => "tweet",
            RelationKind::Channel => "channel",
        }
    }

    pub fn collection(&self) -> EdgeCollection {
        match self {
            RelationKind::Channel => EdgeCollection::Subscriptions,
            _ => EdgeCollection::Likes,
        }
    }

    /// Parse a likeable kind from a route segment. Channels are not likeable.
    pub fn parse_likeable(s: &str) -> Option<Self> {
        match s.parse::<RelationKind>() {
            Ok(RelationKind::Channel) | Err(_) => None,
            Ok(kind) => Some(kind),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" | "videos" => Ok(RelationKind::Video),
            "comment" | "comments" => Ok(RelationKind::Comment),
            "tweet" | "tweets" => Ok(RelationKind::Tweet),
            "channel" | "channels" => Ok(RelationKind::Channel),
            _ => Err(format!("Invalid relation kind: {}", s)),
        }
    }
}

/// Uniqueness key of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub actor_id: String,
    pub kind: RelationKind,
    pub target_id: String,
}

impl EdgeKey {
    pub fn new(actor_id: impl Into<String>, kind: RelationKind, target_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            kind,
            target_id: target_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelationshipEdge {
    #[serde(rename = "_id")]
    pub id: String,
    /// Liker or subscriber.
    pub actor_id: String,
    pub kind: RelationKind,
    /// Liked resource, or subscribed channel.
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

impl RelationshipEdge {
    pub fn new(key: &EdgeKey) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: key.actor_id.clone(),
            kind: key.kind,
            target_id: key.target_id.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.actor_id.clone(), self.kind, self.target_id.clone())
    }
}

/// Result state of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    Added,
    Removed,
}
