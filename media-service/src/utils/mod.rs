pub mod multipart;
pub mod password;
pub mod validation;

pub use multipart::StagedForm;
pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;
