pub mod content;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod ownership;
pub mod session;
pub mod store;
pub mod toggle;
pub mod uploader;

pub use content::ContentService;
pub use credentials::{CredentialStore, ProfileImage};
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims};
pub use ownership::{enforce_owner, is_owner, Owned};
pub use session::{digest_token, SessionIssuer};
pub use store::{MongoDb, Store};
pub use toggle::ToggleRelationship;
pub use uploader::{HttpUploader, MediaUploader, MockUploader, UploadedMedia};
