//! Videos, comments, tweets, playlists and the channel dashboard.
//!
//! Every mutation goes through [`ContentService::fetch_owned`] and then a
//! single store write that matches on the owner as well as the id and touches
//! only the fields it changes.

use std::path::Path;
use std::sync::Arc;

use crate::{
    dtos::content::{ChannelStats, UpdatePlaylistRequest, UpdateVideoRequest},
    models::{Comment, Playlist, RelationKind, Tweet, Video},
    services::{
        ownership::enforce_owner,
        store::{ListFilter, Page, Resource, ResourceStore, Store, Update},
        MediaUploader, ServiceError,
    },
};

/// Compare-and-set attempts for a publish flip racing another flip.
const MAX_PUBLISH_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct ContentService {
    store: Store,
    uploader: Arc<dyn MediaUploader>,
}

impl ContentService {
    pub fn new(store: Store, uploader: Arc<dyn MediaUploader>) -> Self {
        Self { store, uploader }
    }

    async fn fetch<T: Resource>(
        collection: &dyn ResourceStore<T>,
        id: &str,
    ) -> Result<T, ServiceError> {
        collection
            .find(id)
            .await?
            .ok_or(ServiceError::NotFound(T::LABEL))
    }

    async fn fetch_owned<T: Resource>(
        collection: &dyn ResourceStore<T>,
        id: &str,
        identity_id: &str,
    ) -> Result<T, ServiceError> {
        let item = Self::fetch(collection, id).await?;
        enforce_owner(&item, identity_id)?;
        Ok(item)
    }

    async fn update_owned<T: Resource>(
        collection: &dyn ResourceStore<T>,
        id: &str,
        identity_id: &str,
        update: &Update,
    ) -> Result<T, ServiceError> {
        Self::fetch_owned(collection, id, identity_id).await?;
        // No match here means it was deleted after we fetched it.
        collection
            .update(id, identity_id, update)
            .await?
            .ok_or(ServiceError::NotFound(T::LABEL))
    }

    async fn remove_owned<T: Resource>(
        collection: &dyn ResourceStore<T>,
        id: &str,
        identity_id: &str,
    ) -> Result<T, ServiceError> {
        let item = Self::fetch_owned(collection, id, identity_id).await?;
        if !collection.delete(id, identity_id).await? {
            return Err(ServiceError::NotFound(T::LABEL));
        }
        tracing::info!(id = %id, owner_id = %identity_id, "{} deleted", T::LABEL);
        Ok(item)
    }

    // ---- videos ----

    pub async fn publish_video(
        &self,
        identity_id: &str,
        title: String,
        description: String,
        video_file: &Path,
        thumbnail: &Path,
    ) -> Result<Video, ServiceError> {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Title and description are required".to_string(),
            ));
        }

        let video_media = self.uploader.upload(video_file).await;
        let thumbnail_media = self.uploader.upload(thumbnail).await;
        let video_media = video_media.map_err(ServiceError::Upload)?;
        let thumbnail_media = thumbnail_media.map_err(ServiceError::Upload)?;

        let mut video = Video::new(
            identity_id.to_string(),
            video_media.url,
            thumbnail_media.url,
            title.trim().to_string(),
            description.trim().to_string(),
        );
        video.duration = video_media.duration.unwrap_or_default();

        self.store.videos.insert(&video).await?;
        tracing::info!(video_id = %video.id, owner_id = %identity_id, "Video published");
        Ok(video)
    }

    /// Unpublished videos are visible to their owner only.
    pub async fn get_video(&self, viewer_id: &str, video_id: &str) -> Result<Video, ServiceError> {
        let video = Self::fetch(self.store.videos.as_ref(), video_id).await?;
        if !video.is_published && video.owner_id != viewer_id {
            return Err(ServiceError::NotFound(Video::LABEL));
        }
        Ok(video)
    }

    pub async fn list_videos(
        &self,
        viewer_id: &str,
        owner_id: &str,
        page: Page,
    ) -> Result<Vec<Video>, ServiceError> {
        if self.store.users.find_user_by_id(owner_id).await?.is_none() {
            return Err(ServiceError::NotFound("User"));
        }
        let filter = ListFilter::VisibleTo {
            owner_id: owner_id.to_string(),
            viewer_id: viewer_id.to_string(),
        };
        Ok(self.store.videos.list(&filter, page).await?)
    }

    pub async fn update_video(
        &self,
        identity_id: &str,
        video_id: &str,
        req: UpdateVideoRequest,
    ) -> Result<Video, ServiceError> {
        let mut update = Update::new();
        if let Some(title) = req.title {
            update = update.set("title", require_text(title, "Title")?);
        }
        if let Some(description) = req.description {
            update = update.set("description", description.trim().to_string());
        }
        if update.is_empty() {
            return Err(ServiceError::Validation(
                "At least one of title or description is required".to_string(),
            ));
        }

        Self::update_owned(self.store.videos.as_ref(), video_id, identity_id, &update).await
    }

    pub async fn delete_video(&self, identity_id: &str, video_id: &str) -> Result<Video, ServiceError> {
        Self::remove_owned(self.store.videos.as_ref(), video_id, identity_id).await
    }

    /// Flip `is_published`, conditional on the value it was read with so a
    /// concurrent flip is never undone silently.
    pub async fn toggle_publish(&self, identity_id: &str, video_id: &str) -> Result<Video, ServiceError> {
        for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
            let video = Self::fetch_owned(self.store.videos.as_ref(), video_id, identity_id).await?;
            let flip = Update::new()
                .when_equals("is_published", video.is_published)
                .set("is_published", !video.is_published);
            if let Some(video) = self.store.videos.update(video_id, identity_id, &flip).await? {
                tracing::info!(video_id = %video_id, published = video.is_published, "Publish state toggled");
                return Ok(video);
            }
            tracing::debug!(attempt, "Publish state changed underneath us, retrying");
        }

        Err(ServiceError::Internal(anyhow::anyhow!(
            "publish toggle on {} did not settle after {} attempts",
            video_id,
            MAX_PUBLISH_ATTEMPTS
        )))
    }

    // ---- comments ----

    pub async fn list_comments(&self, video_id: &str, page: Page) -> Result<Vec<Comment>, ServiceError> {
        Self::fetch(self.store.videos.as_ref(), video_id).await?;
        Ok(self
            .store
            .comments
            .list(&ListFilter::Video(video_id.to_string()), page)
            .await?)
    }

    pub async fn add_comment(
        &self,
        identity_id: &str,
        video_id: &str,
        content: String,
    ) -> Result<Comment, ServiceError> {
        let content = require_text(content, "Content")?;
        Self::fetch(self.store.videos.as_ref(), video_id).await?;

        let comment = Comment::new(identity_id.to_string(), video_id.to_string(), content);
        self.store.comments.insert(&comment).await?;
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        identity_id: &str,
        comment_id: &str,
        content: String,
    ) -> Result<Comment, ServiceError> {
        let update = Update::new().set("content", require_text(content, "Content")?);
        Self::update_owned(self.store.comments.as_ref(), comment_id, identity_id, &update).await
    }

    pub async fn delete_comment(
        &self,
        identity_id: &str,
        comment_id: &str,
    ) -> Result<Comment, ServiceError> {
        Self::remove_owned(self.store.comments.as_ref(), comment_id, identity_id).await
    }

    // ---- tweets ----

    pub async fn create_tweet(&self, identity_id: &str, content: String) -> Result<Tweet, ServiceError> {
        let tweet = Tweet::new(identity_id.to_string(), require_text(content, "Content")?);
        self.store.tweets.insert(&tweet).await?;
        Ok(tweet)
    }

    pub async fn list_tweets(&self, owner_id: &str, page: Page) -> Result<Vec<Tweet>, ServiceError> {
        Ok(self
            .store
            .tweets
            .list(&ListFilter::Owner(owner_id.to_string()), page)
            .await?)
    }

    pub async fn update_tweet(
        &self,
        identity_id: &str,
        tweet_id: &str,
        content: String,
    ) -> Result<Tweet, ServiceError> {
        let update = Update::new().set("content", require_text(content, "Content")?);
        Self::update_owned(self.store.tweets.as_ref(), tweet_id, identity_id, &update).await
    }

    pub async fn delete_tweet(&self, identity_id: &str, tweet_id: &str) -> Result<Tweet, ServiceError> {
        Self::remove_owned(self.store.tweets.as_ref(), tweet_id, identity_id).await
    }

    // ---- playlists ----

    pub async fn create_playlist(
        &self,
        identity_id: &str,
        name: String,
        description: String,
    ) -> Result<Playlist, ServiceError> {
        let playlist = Playlist::new(
            identity_id.to_string(),
            require_text(name, "Name")?,
            description.trim().to_string(),
        );
        self.store.playlists.insert(&playlist).await?;
        Ok(playlist)
    }

    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Playlist, ServiceError> {
        Self::fetch(self.store.playlists.as_ref(), playlist_id).await
    }

    pub async fn list_playlists(&self, owner_id: &str, page: Page) -> Result<Vec<Playlist>, ServiceError> {
        Ok(self
            .store
            .playlists
            .list(&ListFilter::Owner(owner_id.to_string()), page)
            .await?)
    }

    pub async fn update_playlist(
        &self,
        identity_id: &str,
        playlist_id: &str,
        req: UpdatePlaylistRequest,
    ) -> Result<Playlist, ServiceError> {
        let mut update = Update::new();
        if let Some(name) = req.name {
            update = update.set("name", require_text(name, "Name")?);
        }
        if let Some(description) = req.description {
            update = update.set("description", description.trim().to_string());
        }
        if update.is_empty() {
            return Err(ServiceError::Validation(
                "At least one of name or description is required".to_string(),
            ));
        }

        Self::update_owned(self.store.playlists.as_ref(), playlist_id, identity_id, &update).await
    }

    pub async fn delete_playlist(
        &self,
        identity_id: &str,
        playlist_id: &str,
    ) -> Result<Playlist, ServiceError> {
        Self::remove_owned(self.store.playlists.as_ref(), playlist_id, identity_id).await
    }

    /// Append a video. Adding one that is already present is a no-op.
    pub async fn add_to_playlist(
        &self,
        identity_id: &str,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<Playlist, ServiceError> {
        Self::fetch(self.store.videos.as_ref(), video_id).await?;
        let update = Update::new().add_to_set("videos", video_id);
        Self::update_owned(self.store.playlists.as_ref(), playlist_id, identity_id, &update).await
    }

    pub async fn remove_from_playlist(
        &self,
        identity_id: &str,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<Playlist, ServiceError> {
        let update = Update::new()
            .when_contains("videos", video_id)
            .pull("videos", video_id);
        match Self::update_owned(self.store.playlists.as_ref(), playlist_id, identity_id, &update)
            .await
        {
            // The playlist is there and ours, so the guard is what failed.
            Err(ServiceError::NotFound(_)) => {
                Self::fetch_owned(self.store.playlists.as_ref(), playlist_id, identity_id).await?;
                Err(ServiceError::NotFound(Video::LABEL))
            }
            result => result,
        }
    }

    // ---- dashboard ----

    pub async fn channel_stats(&self, identity_id: &str) -> Result<ChannelStats, ServiceError> {
        let videos = self
            .store
            .videos
            .list(&ListFilter::Owner(identity_id.to_string()), Page::all())
            .await?;
        let video_ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();

        let total_subscribers = self
            .store
            .edges
            .edges_to(RelationKind::Channel, identity_id)
            .await?
            .len() as u64;
        let total_likes = self
            .store
            .edges
            .count_edges_to(RelationKind::Video, &video_ids)
            .await?;

        Ok(ChannelStats {
            total_videos: videos.len() as u64,
            total_views: videos.iter().map(|v| v.views).sum(),
            total_subscribers,
            total_likes,
        })
    }

    pub async fn channel_videos(&self, identity_id: &str, page: Page) -> Result<Vec<Video>, ServiceError> {
        Ok(self
            .store
            .videos
            .list(&ListFilter::Owner(identity_id.to_string()), page)
            .await?)
    }
}

fn require_text(value: String, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
