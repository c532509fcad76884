//! Wire types for the session endpoints, client side.

use serde::{Deserialize, Serialize};

/// Session projection as reported by `GET /api/admin/session`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProjection {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SessionProjection {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.email.is_some()
    }

    /// Enforce `is_admin => email present`; a projection claiming admin
    /// without an email is folded in as a non-admin.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.email.as_deref().is_some_and(|email| email.trim().is_empty()) {
            self.email = None;
        }
        if self.email.is_none() {
            self.is_admin = false;
        }
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExchangeRequest<'a> {
    pub(crate) access_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) message: Option<String>,
}
