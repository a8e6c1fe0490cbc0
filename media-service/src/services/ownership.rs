//! Ownership checks for user-authored content.
//!
//! Mutations on videos, comments, tweets and playlists are allowed only when
//! the authenticated identity is the resource's owner. Reads are not gated.

use super::error::ServiceError;

/// A resource with a single owning identity, fixed at creation.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

pub fn is_owner<T: Owned + ?Sized>(resource: &T, identity_id: &str) -> bool {
    resource.owner_id() == identity_id
}

/// Fail with [`ServiceError::Forbidden`] unless `identity_id` owns `resource`.
pub fn enforce_owner<T: Owned + ?Sized>(resource: &T, identity_id: &str) -> Result<(), ServiceError> {
    if is_owner(resource, identity_id) {
        Ok(())
    } else {
        tracing::warn!(identity_id = %identity_id, "Ownership check failed");
        Err(ServiceError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Playlist};

    #[test]
    fn test_owner_passes() {
        let comment = Comment::new("u1".into(), "v1".into(), "nice".into());
        assert!(is_owner(&comment, "u1"));
        assert!(enforce_owner(&comment, "u1").is_ok());
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let playlist = Playlist::new("u1".into(), "mix".into(), "".into());
        assert!(!is_owner(&playlist, "u2"));
        assert!(matches!(
            enforce_owner(&playlist, "u2"),
            Err(ServiceError::Forbidden)
        ));
    }
}
