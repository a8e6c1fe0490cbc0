use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use mongodb::bson::{doc, Document};

use crate::services::{ownership::Owned, store::{ListFilter, Resource}};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub videos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(owner_id: String, name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name,
            description,
            videos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for Playlist {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Resource for Playlist {
    const COLLECTION: &'static str = "playlists";
    const LABEL: &'static str = "Playlist";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        match filter {
            ListFilter::Owner(owner_id) | ListFilter::VisibleTo { owner_id, .. } => {
                &self.owner_id == owner_id
            }
            ListFilter::Video(video_id) => self.videos.iter().any(|v| v == video_id),
        }
    }

    fn filter_doc(filter: &ListFilter) -> Document {
        match filter {
            ListFilter::Owner(owner_id) | ListFilter::VisibleTo { owner_id, .. } => {
                doc! { "owner_id": owner_id.as_str() }
            }
            // Equality on an array field matches membership.
            ListFilter::Video(video_id) => doc! { "videos": video_id.as_str() },
        }
    }
}
