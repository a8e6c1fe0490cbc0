pub mod auth;
pub mod content;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::store::Page;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Invalid or expired token")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logged out")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Page size, at most 100
    #[param(example = 10)]
    pub limit: Option<u64>,
}

impl From<&PageQuery> for Page {
    fn from(q: &PageQuery) -> Self {
        Page::new(q.page, q.limit)
    }
}
