//! Request/response types for session endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::store::SessionRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub access_token: String,
}

/// Projection of the server session exposed to clients.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub is_admin: bool,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SessionResponse {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            is_admin: false,
            email: None,
            first_name: None,
            last_name: None,
        }
    }
}

impl From<SessionRecord> for SessionResponse {
    fn from(record: SessionRecord) -> Self {
        Self {
            is_admin: record.is_admin,
            email: Some(record.email),
            first_name: record.first_name,
            last_name: record.last_name,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub(crate) fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
