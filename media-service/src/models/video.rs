use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use mongodb::bson::{doc, Document};

use crate::services::{ownership::Owned, store::{ListFilter, Resource}};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

impl Video {
    pub fn new(
        owner_id: String,
        video_file: String,
        thumbnail: String,
        title: String,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            video_file,
            thumbnail,
            title,
            description,
            duration: 0.0,
            views: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for Video {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Resource for Video {
    const COLLECTION: &'static str = "videos";
    const LABEL: &'static str = "Video";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        match filter {
            ListFilter::Owner(owner_id) => &self.owner_id == owner_id,
            ListFilter::Video(_) => false,
            ListFilter::VisibleTo { owner_id, viewer_id } => {
                &self.owner_id == owner_id && (self.is_published || owner_id == viewer_id)
            }
        }
    }

    fn filter_doc(filter: &ListFilter) -> Document {
        match filter {
            ListFilter::Owner(owner_id) => doc! { "owner_id": owner_id.as_str() },
            // Videos carry no video_id, so this matches nothing.
            ListFilter::Video(video_id) => doc! { "video_id": video_id.as_str() },
            ListFilter::VisibleTo { owner_id, viewer_id } if owner_id == viewer_id => {
                doc! { "owner_id": owner_id.as_str() }
            }
            ListFilter::VisibleTo { owner_id, .. } => {
                doc! { "owner_id": owner_id.as_str(), "is_published": true }
            }
        }
    }
}
