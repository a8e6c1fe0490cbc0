pub mod comment;
pub mod playlist;
pub mod relationship;
pub mod tweet;
pub mod user;
pub mod video;

pub use comment::Comment;
pub use playlist::Playlist;
pub use relationship::{EdgeCollection, EdgeKey, RelationKind, RelationshipEdge, ToggleState};
pub use tweet::Tweet;
pub use user::{ProfileUpdate, SanitizedUser, User};
pub use video::Video;
