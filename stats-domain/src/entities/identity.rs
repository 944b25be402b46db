use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account id meaning "this game identifier is not linked to any account".
pub const UNLINKED_ACCOUNT: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub guid: String,
    pub smf_id: i64,
    pub last_known_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl IdentityInfo {
    pub fn is_verified(smf_id: i64, confirmed_at: Option<DateTime<Utc>>) -> bool {
        smf_id > UNLINKED_ACCOUNT && confirmed_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRegistration {
    pub guid: String,
    pub smf_id: i64,
    #[serde(default)]
    pub player_name: String,
}
