use serde::{Deserialize, Serialize};

use crate::models::{ChannelMember, Role};

// -- Users --

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub search: String,
}

/// A user record as supplied by a seed file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: Option<String>,
}

// -- Classes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    #[serde(flatten)]
    pub member: ChannelMember,
    pub email: String,
    pub name: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
