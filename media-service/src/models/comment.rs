use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use mongodb::bson::{doc, Document};

use crate::services::{ownership::Owned, store::{ListFilter, Resource}};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(owner_id: String, video_id: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            video_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Resource for Comment {
    const COLLECTION: &'static str = "comments";
    const LABEL: &'static str = "Comment";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        match filter {
            ListFilter::Owner(owner_id) | ListFilter::VisibleTo { owner_id, .. } => {
                &self.owner_id == owner_id
            }
            ListFilter::Video(video_id) => &self.video_id == video_id,
        }
    }

    fn filter_doc(filter: &ListFilter) -> Document {
        match filter {
            ListFilter::Owner(owner_id) | ListFilter::VisibleTo { owner_id, .. } => {
                doc! { "owner_id": owner_id.as_str() }
            }
            ListFilter::Video(video_id) => doc! { "video_id": video_id.as_str() },
        }
    }
}
