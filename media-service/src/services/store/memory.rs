//! In-process store for tests and local runs without MongoDB.
//!
//! Each operation holds the mutex for its whole read-modify-write, which gives
//! the same atomicity the unique indexes and conditional updates give in Mongo.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use subtle::ConstantTimeEq;

use serde_json::{Map, Value};

use super::{
    EdgeStore, FieldEdit, FieldValue, Guard, ListFilter, Page, Resource, ResourceStore,
    StoreError, Update, UserStore,
};
use crate::models::{EdgeKey, ProfileUpdate, RelationKind, RelationshipEdge, User};
use crate::services::ownership::Owned;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store mutex poisoned")))
}

fn backend(err: serde_json::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err))
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Flag(flag) => Value::Bool(*flag),
    }
}

fn guard_holds(doc: &Map<String, Value>, guard: &Guard) -> bool {
    match guard {
        Guard::Equals(field, value) => doc.get(*field) == Some(&json_value(value)),
        Guard::Contains(field, member) => doc
            .get(*field)
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|i| i.as_str() == Some(member.as_str()))),
    }
}

/// Edits the serialized document the way Mongo's `$set`, `$addToSet` and
/// `$pull` would. Returns `None` when a guard fails.
fn apply_update<T: Resource>(item: &T, update: &Update) -> Result<Option<T>, StoreError> {
    let mut value = serde_json::to_value(item).map_err(backend)?;
    let Some(doc) = value.as_object_mut() else {
        return Err(StoreError::Backend(anyhow::anyhow!(
            "{} did not serialize to an object",
            T::LABEL
        )));
    };
    if !update.guards.iter().all(|g| guard_holds(doc, g)) {
        return Ok(None);
    }

    for edit in &update.edits {
        match edit {
            FieldEdit::Set(field, value) => {
                doc.insert(field.to_string(), json_value(value));
            }
            FieldEdit::AddToSet(field, member) => {
                let slot = doc
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(items) = slot {
                    if !items.iter().any(|i| i.as_str() == Some(member.as_str())) {
                        items.push(Value::String(member.clone()));
                    }
                }
            }
            FieldEdit::Pull(field, member) => {
                if let Some(Value::Array(items)) = doc.get_mut(*field) {
                    items.retain(|i| i.as_str() != Some(member.as_str()));
                }
            }
        }
    }
    doc.insert(
        "updated_at".to_string(),
        serde_json::to_value(chrono::Utc::now()).map_err(backend)?,
    );

    serde_json::from_value(value).map(Some).map_err(backend)
}

fn digests_match(stored: Option<&str>, presented: &str) -> bool {
    stored.is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(presented.as_bytes())))
}

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, User>>,
    edges: Mutex<HashMap<EdgeKey, RelationshipEdge>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        lock(&self.users).map(|_| ())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = lock(&self.users)?;
        let taken = users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken || users.contains_key(&user.id) {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut users = lock(&self.users)?;
        if let Some(email) = &update.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate);
            }
        }
        Ok(users.get_mut(id).map(|user| {
            update.apply(user);
            user.clone()
        }))
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = lock(&self.users)?;
        Ok(match users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_refresh_token_hash(
        &self,
        id: &str,
        digest: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut users = lock(&self.users)?;
        Ok(match users.get_mut(id) {
            Some(user) => {
                user.refresh_token_hash = digest.map(str::to_string);
                true
            }
            None => false,
        })
    }

    async fn swap_refresh_token_hash(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let mut users = lock(&self.users)?;
        Ok(match users.get_mut(id) {
            Some(user) if digests_match(user.refresh_token_hash.as_deref(), expected) => {
                user.refresh_token_hash = Some(replacement.to_string());
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl EdgeStore for InMemoryStore {
    async fn insert_edge(&self, edge: &RelationshipEdge) -> Result<(), StoreError> {
        let mut edges = lock(&self.edges)?;
        let key = edge.key();
        if edges.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        edges.insert(key, edge.clone());
        Ok(())
    }

    async fn take_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, StoreError> {
        Ok(lock(&self.edges)?.remove(key))
    }

    async fn count_edges(&self, key: &EdgeKey) -> Result<u64, StoreError> {
        Ok(u64::from(lock(&self.edges)?.contains_key(key)))
    }

    async fn edges_from(
        &self,
        actor_id: &str,
        kind: RelationKind,
    ) -> Result<Vec<RelationshipEdge>, StoreError> {
        let mut found: Vec<_> = lock(&self.edges)?
            .values()
            .filter(|e| e.actor_id == actor_id && e.kind == kind)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn edges_to(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> Result<Vec<RelationshipEdge>, StoreError> {
        let mut found: Vec<_> = lock(&self.edges)?
            .values()
            .filter(|e| e.target_id == target_id && e.kind == kind)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_edges_to(
        &self,
        kind: RelationKind,
        target_ids: &[String],
    ) -> Result<u64, StoreError> {
        let count = lock(&self.edges)?
            .values()
            .filter(|e| e.kind == kind && target_ids.contains(&e.target_id))
            .count();
        Ok(count as u64)
    }
}

/// Insertion-ordered collection of one [`Resource`].
pub struct InMemoryCollection<T: Resource> {
    items: Mutex<Vec<T>>,
}

impl<T: Resource> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Resource> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for InMemoryCollection<T> {
    async fn insert(&self, item: &T) -> Result<(), StoreError> {
        let mut items = lock(&self.items)?;
        if items.iter().any(|i| i.id() == item.id()) {
            return Err(StoreError::Duplicate);
        }
        items.push(item.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(lock(&self.items)?.iter().find(|i| i.id() == id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        update: &Update,
    ) -> Result<Option<T>, StoreError> {
        let mut items = lock(&self.items)?;
        let Some(slot) = items
            .iter_mut()
            .find(|i| i.id() == id && i.owner_id() == owner_id)
        else {
            return Ok(None);
        };
        let updated = apply_update(slot, update)?;
        if let Some(updated) = &updated {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut items = lock(&self.items)?;
        let before = items.len();
        items.retain(|i| !(i.id() == id && i.owner_id() == owner_id));
        Ok(items.len() < before)
    }

    async fn list(&self, filter: &ListFilter, page: Page) -> Result<Vec<T>, StoreError> {
        let items = lock(&self.items)?;
        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        // Newest first, like the Mongo listing.
        Ok(items
            .iter()
            .rev()
            .filter(|i| i.matches(filter))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}
