//! Access/refresh token lifecycle state.

use chrono::{DateTime, Duration, Utc};

/// Window before expiry within which a proactive refresh is triggered.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// One account's token pair plus the scope identifiers that come back
/// from the refresh endpoint.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expire_time: DateTime<Utc>,
    pub user_id: String,
    pub drive_id: String,
}

impl TokenState {
    /// Whether the access token is inside the refresh margin (or past
    /// expiry) at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expire_time - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }

    /// Value for the outbound `Authorization` header. Must be re-derived
    /// whenever either component changes.
    pub fn auth_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
