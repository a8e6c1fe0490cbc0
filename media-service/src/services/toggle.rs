use crate::{
    dtos::content::ChannelProfile,
    models::{user::normalize_username, EdgeKey, RelationKind, RelationshipEdge, ToggleState},
    services::{
        store::{Store, StoreError},
        ServiceError,
    },
};

/// Insert attempts before giving up on a key that keeps flipping underneath us.
const MAX_TOGGLE_ATTEMPTS: usize = 3;

/// Flips the existence of a like or subscription edge.
///
/// The store's unique key on `(actor, kind, target)` is the only
/// serialization point: whatever the interleaving of concurrent toggles on
/// one key, at most one edge exists afterwards.
#[derive(Clone)]
pub struct ToggleRelationship {
    store: Store,
}

impl ToggleRelationship {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn toggle(
        &self,
        identity_id: &str,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<(ToggleState, RelationshipEdge), ServiceError> {
        if kind == RelationKind::Channel && identity_id == target_id {
            return Err(ServiceError::Validation(
                "Cannot subscribe to your own channel".to_string(),
            ));
        }

        if !self.store.target_exists(kind, target_id).await? {
            return Err(ServiceError::NotFound(target_label(kind)));
        }

        let key = EdgeKey::new(identity_id, kind, target_id);
        let (state, edge) = self.flip(&key).await?;

        metrics::counter!(
            "relationship_toggles_total",
            "kind" => kind.as_str(),
            "state" => state_label(state)
        )
        .increment(1);
        tracing::info!(
            actor_id = %identity_id,
            kind = %kind,
            target_id = %target_id,
            state = state_label(state),
            "Relationship toggled"
        );

        Ok((state, edge))
    }

    async fn flip(&self, key: &EdgeKey) -> Result<(ToggleState, RelationshipEdge), ServiceError> {
        for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
            let edge = RelationshipEdge::new(key);
            match self.store.edges.insert_edge(&edge).await {
                Ok(()) => return Ok((ToggleState::Added, edge)),
                Err(StoreError::Duplicate) => {
                    if let Some(removed) = self.store.edges.take_edge(key).await? {
                        return Ok((ToggleState::Removed, removed));
                    }
                    // Someone removed it between our insert and delete.
                    tracing::debug!(attempt, "Edge vanished during toggle, retrying insert");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Internal(anyhow::anyhow!(
            "toggle on {}:{}:{} did not settle after {} attempts",
            key.actor_id,
            key.kind,
            key.target_id,
            MAX_TOGGLE_ATTEMPTS
        )))
    }

    pub async fn liked_videos(&self, identity_id: &str) -> Result<Vec<RelationshipEdge>, ServiceError> {
        Ok(self
            .store
            .edges
            .edges_from(identity_id, RelationKind::Video)
            .await?)
    }

    pub async fn subscribers(&self, channel_id: &str) -> Result<Vec<RelationshipEdge>, ServiceError> {
        Ok(self
            .store
            .edges
            .edges_to(RelationKind::Channel, channel_id)
            .await?)
    }

    pub async fn subscriptions(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<RelationshipEdge>, ServiceError> {
        Ok(self
            .store
            .edges
            .edges_from(subscriber_id, RelationKind::Channel)
            .await?)
    }

    /// A channel looked up by username, with subscription counts as seen by
    /// `viewer_id`.
    pub async fn channel_profile(
        &self,
        viewer_id: &str,
        username: &str,
    ) -> Result<ChannelProfile, ServiceError> {
        let channel = self
            .store
            .users
            .find_user_by_username(&normalize_username(username))
            .await?
            .ok_or(ServiceError::NotFound("Channel"))?;

        let subscribers_count = self
            .store
            .edges
            .count_edges_to(RelationKind::Channel, std::slice::from_ref(&channel.id))
            .await?;
        let subscribed_to_count = self
            .store
            .edges
            .edges_from(&channel.id, RelationKind::Channel)
            .await?
            .len() as u64;
        let is_subscribed = self
            .store
            .edges
            .count_edges(&EdgeKey::new(viewer_id, RelationKind::Channel, channel.id.clone()))
            .await?
            > 0;

        Ok(ChannelProfile {
            id: channel.id,
            username: channel.username,
            full_name: channel.full_name,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscribers_count,
            subscribed_to_count,
            is_subscribed,
        })
    }
}

fn state_label(state: ToggleState) -> &'static str {
    match state {
        ToggleState::Added => "added",
        ToggleState::Removed => "removed",
    }
}

fn target_label(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Video => "Video",
        RelationKind::Comment => "Comment",
        RelationKind::Tweet => "Tweet",
        RelationKind::Channel => "Channel",
    }
}
