use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{RelationshipEdge, ToggleState};

/// Multipart body of `POST /videos`. Documentation only; the handler reads
/// the parts directly.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct VideoUploadForm {
    pub title: String,
    pub description: String,
    #[schema(value_type = String, format = Binary)]
    pub video_file: Vec<u8>,
    #[schema(value_type = String, format = Binary)]
    pub thumbnail: Vec<u8>,
}

/// Multipart body of the avatar and cover-image routes. The file part is
/// named `avatar` or `coverImage` respectively.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub avatar: Vec<u8>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    /// Channel whose videos to list
    pub user_id: String,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContentRequest {
    #[validate(length(min = 1, max = 5000, message = "Content is required"))]
    #[schema(example = "Great video!")]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Favourites")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePlaylistRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    pub state: ToggleState,
    /// The edge that was created or removed.
    pub edge: RelationshipEdge,
}

/// Public view of a channel with its subscription counts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChannelProfile {
    pub id: String,
    #[schema(example = "alice")]
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub subscribers_count: u64,
    /// Channels this user subscribes to.
    pub subscribed_to_count: u64,
    /// Whether the caller subscribes to this channel.
    pub is_subscribed: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ChannelStats {
    pub total_videos: u64,
    pub total_views: i64,
    pub total_subscribers: u64,
    /// Likes received across the channel's videos.
    pub total_likes: u64,
}
