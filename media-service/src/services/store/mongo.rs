use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::marker::PhantomData;

use super::{
    EdgeStore, FieldEdit, FieldValue, Guard, ListFilter, Page, Resource, ResourceStore,
    StoreError, Update, UserStore,
};
use crate::models::{
    Comment, EdgeCollection, EdgeKey, Playlist, ProfileUpdate, RelationKind, RelationshipEdge,
    Tweet, User, Video,
};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for media-service");

        let users = self.users();
        for field in ["username", "email"] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(format!("{}_unique", field))
                        .build(),
                )
                .build();
            users.create_index(index, None).await.map_err(|e| {
                tracing::error!("Failed to create {} index on users collection: {}", field, e);
                AppError::from(e)
            })?;
            tracing::info!("Created unique index on users.{}", field);
        }

        for collection in [EdgeCollection::Likes, EdgeCollection::Subscriptions] {
            let edge_key = IndexModel::builder()
                .keys(doc! { "actor_id": 1, "kind": 1, "target_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("edge_key_unique".to_string())
                        .build(),
                )
                .build();
            self.edges(collection)
                .create_index(edge_key, None)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to create edge key index on {} collection: {}",
                        collection.name(),
                        e
                    );
                    AppError::from(e)
                })?;

            // Reverse lookups: subscribers of a channel, likes on a video.
            let target_index = IndexModel::builder()
                .keys(doc! { "kind": 1, "target_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("target_lookup".to_string())
                        .build(),
                )
                .build();
            self.edges(collection)
                .create_index(target_index, None)
                .await
                .map_err(AppError::from)?;
            tracing::info!("Created indexes on {}", collection.name());
        }

        let owner_index = |name: &str| {
            IndexModel::builder()
                .keys(doc! { "owner_id": 1 })
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };
        self.collection::<Video>()
            .create_index(owner_index("owner_id_lookup"), None)
            .await
            .map_err(AppError::from)?;
        self.collection::<Tweet>()
            .create_index(owner_index("owner_id_lookup"), None)
            .await
            .map_err(AppError::from)?;
        self.collection::<Playlist>()
            .create_index(owner_index("owner_id_lookup"), None)
            .await
            .map_err(AppError::from)?;

        let comment_video_index = IndexModel::builder()
            .keys(doc! { "video_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("video_id_lookup".to_string())
                    .build(),
            )
            .build();
        self.collection::<Comment>()
            .create_index(comment_video_index, None)
            .await
            .map_err(AppError::from)?;
        tracing::info!("Created owner and video indexes on content collections");

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn edges(&self, collection: EdgeCollection) -> Collection<RelationshipEdge> {
        self.db.collection(collection.name())
    }

    pub fn collection<T: Resource>(&self) -> Collection<T> {
        self.db.collection(T::COLLECTION)
    }

    pub fn resource<T: Resource>(&self) -> MongoCollection<T> {
        MongoCollection {
            collection: self.collection::<T>(),
            _marker: PhantomData,
        }
    }
}

/// Unique index violations surface either as a write error or, for
/// find-and-modify, as a command error. Both carry code 11000.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

fn map_err(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate
    } else {
        StoreError::Backend(anyhow::Error::new(err))
    }
}

fn now_bson() -> Result<bson::Bson, StoreError> {
    bson::to_bson(&Utc::now()).map_err(|e| StoreError::Backend(anyhow::Error::new(e)))
}

fn bson_value(value: &FieldValue) -> bson::Bson {
    match value {
        FieldValue::Text(text) => bson::Bson::String(text.clone()),
        FieldValue::Flag(flag) => bson::Bson::Boolean(*flag),
    }
}

/// Owner-scoped filter plus the update's guards. Equality on an array field
/// matches membership, which is what `Guard::Contains` needs.
fn update_filter(id: &str, owner_id: &str, update: &Update) -> Document {
    let mut filter = doc! { "_id": id, "owner_id": owner_id };
    for guard in &update.guards {
        match guard {
            Guard::Equals(field, value) => {
                filter.insert(*field, bson_value(value));
            }
            Guard::Contains(field, member) => {
                filter.insert(*field, member.as_str());
            }
        }
    }
    filter
}

fn update_modifications(update: &Update) -> Result<Document, StoreError> {
    let mut set = doc! { "updated_at": now_bson()? };
    let mut add_to_set = Document::new();
    let mut pull = Document::new();
    for edit in &update.edits {
        match edit {
            FieldEdit::Set(field, value) => {
                set.insert(*field, bson_value(value));
            }
            FieldEdit::AddToSet(field, member) => {
                add_to_set.insert(*field, member.as_str());
            }
            FieldEdit::Pull(field, member) => {
                pull.insert(*field, member.as_str());
            }
        }
    }

    let mut modifications = doc! { "$set": set };
    if !add_to_set.is_empty() {
        modifications.insert("$addToSet", add_to_set);
    }
    if !pull.is_empty() {
        modifications.insert("$pull", pull);
    }
    Ok(modifications)
}

fn edge_filter(key: &EdgeKey) -> Document {
    doc! {
        "actor_id": key.actor_id.as_str(),
        "kind": key.kind.as_str(),
        "target_id": key.target_id.as_str(),
    }
}

#[async_trait]
impl UserStore for MongoDb {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                map_err(e)
            })?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users().insert_one(user, None).await.map_err(map_err)?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(map_err)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "username": username }, None)
            .await
            .map_err(map_err)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(
                doc! { "$or": [ { "username": username }, { "email": email } ] },
                None,
            )
            .await
            .map_err(map_err)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut set = doc! { "updated_at": now_bson()? };
        if let Some(full_name) = &update.full_name {
            set.insert("full_name", full_name.clone());
        }
        if let Some(email) = &update.email {
            set.insert("email", email.clone());
        }
        if let Some(avatar) = &update.avatar {
            set.insert("avatar", avatar.clone());
        }
        if let Some(cover_image) = &update.cover_image {
            set.insert("cover_image", cover_image.clone());
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await
            .map_err(map_err)
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password_hash": password_hash, "updated_at": now_bson()? } },
                None,
            )
            .await
            .map_err(map_err)?;
        Ok(result.matched_count == 1)
    }

    async fn set_refresh_token_hash(
        &self,
        id: &str,
        digest: Option<&str>,
    ) -> Result<bool, StoreError> {
        let update = match digest {
            Some(digest) => doc! { "$set": { "refresh_token_hash": digest } },
            None => doc! { "$unset": { "refresh_token_hash": "" } },
        };
        let result = self
            .users()
            .update_one(doc! { "_id": id }, update, None)
            .await
            .map_err(map_err)?;
        Ok(result.matched_count == 1)
    }

    async fn swap_refresh_token_hash(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        // Single-document conditional update: of two concurrent rotations
        // presenting the same token, exactly one matches.
        let result = self
            .users()
            .update_one(
                doc! { "_id": id, "refresh_token_hash": expected },
                doc! { "$set": { "refresh_token_hash": replacement } },
                None,
            )
            .await
            .map_err(map_err)?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl EdgeStore for MongoDb {
    async fn insert_edge(&self, edge: &RelationshipEdge) -> Result<(), StoreError> {
        self.edges(edge.kind.collection())
            .insert_one(edge, None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn take_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, StoreError> {
        self.edges(key.kind.collection())
            .find_one_and_delete(edge_filter(key), None)
            .await
            .map_err(map_err)
    }

    async fn count_edges(&self, key: &EdgeKey) -> Result<u64, StoreError> {
        self.edges(key.kind.collection())
            .count_documents(edge_filter(key), None)
            .await
            .map_err(map_err)
    }

    async fn edges_from(
        &self,
        actor_id: &str,
        kind: RelationKind,
    ) -> Result<Vec<RelationshipEdge>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self
            .edges(kind.collection())
            .find(doc! { "actor_id": actor_id, "kind": kind.as_str() }, options)
            .await
            .map_err(map_err)?;
        cursor.try_collect().await.map_err(map_err)
    }

    async fn edges_to(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<Vec<RelationshipEdge>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self
            .edges(kind.collection())
            .find(doc! { "kind": kind.as_str(), "target_id": target_id }, options)
            .await
            .map_err(map_err)?;
        cursor.try_collect().await.map_err(map_err)
    }

    async fn count_edges_to(
        &self,
        kind: RelationKind,
        target_ids: &[String],
    ) -> Result<u64, StoreError> {
        if target_ids.is_empty() {
            return Ok(0);
        }
        self.edges(kind.collection())
            .count_documents(
                doc! { "kind": kind.as_str(), "target_id": { "$in": target_ids.to_vec() } },
                None,
            )
            .await
            .map_err(map_err)
    }
}

/// Typed collection for one [`Resource`].
#[derive(Clone)]
pub struct MongoCollection<T: Resource> {
    collection: Collection<T>,
    _marker: PhantomData<T>,
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for MongoCollection<T> {
    async fn insert(&self, item: &T) -> Result<(), StoreError> {
        self.collection.insert_one(item, None).await.map_err(map_err)?;
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(map_err)
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        update: &Update,
    ) -> Result<Option<T>, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(
                update_filter(id, owner_id, update),
                update_modifications(update)?,
                options,
            )
            .await
            .map_err(map_err)
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await
            .map_err(map_err)?;
        Ok(result.deleted_count == 1)
    }

    async fn list(&self, filter: &ListFilter, page: Page) -> Result<Vec<T>, StoreError> {
        let query = T::filter_doc(filter);
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(page.skip())
            .limit(i64::try_from(page.limit).unwrap_or(i64::MAX))
            .build();
        let cursor = self.collection.find(query, options).await.map_err(map_err)?;
        cursor.try_collect().await.map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running MongoDB: MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored
    async fn connect() -> MongoDb {
        let uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db = MongoDb::connect(&uri, &format!("media_test_{}", uuid::Uuid::new_v4().simple()))
            .await
            .unwrap();
        db.initialize_indexes().await.unwrap();
        db
    }

    #[tokio::test]
    #[ignore]
    async fn test_unique_username_rejects_second_insert() {
        let db = connect().await;
        let first = User::new("alice", "alice@example.com", "Alice", "hash".into());
        let second = User::new("Alice", "other@example.com", "Alice", "hash".into());

        db.insert_user(&first).await.unwrap();
        assert!(matches!(
            db.insert_user(&second).await,
            Err(StoreError::Duplicate)
        ));
        db.database_for_tests().drop(None).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_swap_refresh_hash_only_matches_current_digest() {
        let db = connect().await;
        let user = User::new("bob", "bob@example.com", "Bob", "hash".into());
        db.insert_user(&user).await.unwrap();
        db.set_refresh_token_hash(&user.id, Some("a")).await.unwrap();

        assert!(db.swap_refresh_token_hash(&user.id, "a", "b").await.unwrap());
        assert!(!db.swap_refresh_token_hash(&user.id, "a", "c").await.unwrap());
        db.database_for_tests().drop(None).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_edge_key_is_unique() {
        let db = connect().await;
        let key = EdgeKey::new("u1", RelationKind::Video, "v1");
        db.insert_edge(&RelationshipEdge::new(&key)).await.unwrap();
        assert!(matches!(
            db.insert_edge(&RelationshipEdge::new(&key)).await,
            Err(StoreError::Duplicate)
        ));
        assert!(db.take_edge(&key).await.unwrap().is_some());
        assert!(db.take_edge(&key).await.unwrap().is_none());
        db.database_for_tests().drop(None).await.unwrap();
    }

    #[test]
    fn test_update_writes_only_named_fields() {
        let update = Update::new()
            .when_contains("videos", "v1")
            .set("name", "Mix".to_string())
            .pull("videos", "v1");

        let filter = update_filter("p1", "owner", &update);
        assert_eq!(filter.get_str("_id").unwrap(), "p1");
        assert_eq!(filter.get_str("owner_id").unwrap(), "owner");
        assert_eq!(filter.get_str("videos").unwrap(), "v1");

        let modifications = update_modifications(&update).unwrap();
        let set = modifications.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Mix");
        assert!(set.contains_key("updated_at"));
        assert!(!set.contains_key("videos"));
        assert_eq!(
            modifications.get_document("$pull").unwrap().get_str("videos").unwrap(),
            "v1"
        );
        assert!(!modifications.contains_key("$addToSet"));
    }

    #[test]
    fn test_visible_filter_hides_drafts_from_others() {
        let others = Video::filter_doc(&ListFilter::VisibleTo {
            owner_id: "owner".into(),
            viewer_id: "viewer".into(),
        });
        assert_eq!(others, doc! { "owner_id": "owner", "is_published": true });

        let own = Video::filter_doc(&ListFilter::VisibleTo {
            owner_id: "owner".into(),
            viewer_id: "owner".into(),
        });
        assert_eq!(own, doc! { "owner_id": "owner" });
        assert_eq!(
            Playlist::filter_doc(&ListFilter::Video("v1".into())),
            doc! { "videos": "v1" }
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_concurrent_add_to_set_keeps_both_members() {
        let db = connect().await;
        let playlists = db.resource::<Playlist>();
        let playlist = Playlist::new("owner".into(), "Mix".into(), "".into());
        playlists.insert(&playlist).await.unwrap();

        let first = Update::new().add_to_set("videos", "v1");
        let second = Update::new().add_to_set("videos", "v2");
        let (a, b) = tokio::join!(
            playlists.update(&playlist.id, "owner", &first),
            playlists.update(&playlist.id, "owner", &second)
        );
        a.unwrap();
        b.unwrap();

        let stored = playlists.find(&playlist.id).await.unwrap().unwrap();
        assert_eq!(stored.videos.len(), 2);
        db.database_for_tests().drop(None).await.unwrap();
    }

    impl MongoDb {
        fn database_for_tests(&self) -> &Database {
            &self.db
        }
    }
}
