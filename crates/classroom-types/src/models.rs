use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory role of a user. Serialized as the lowercase name.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Staff,
    #[default]
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Teacher, Role::Staff, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Staff => "staff",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "staff" => Ok(Self::Staff),
            "student" => Ok(Self::Student),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_status")]
    pub status: String,
}

/// True if `email` contains `term`, ignoring case (full Unicode lowercase).
pub fn email_contains(email: &str, term: &str) -> bool {
    email.to_lowercase().contains(&term.to_lowercase())
}

fn default_status() -> String {
    "active".to_string()
}

/// A class (chat room). Field names on the wire follow the web client:
/// `class_id` and `className`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "class_id")]
    pub sequence_id: i64,
    #[serde(rename = "className")]
    pub display_name: String,
    #[serde(default)]
    pub teacher_emails: Vec<String>,
    #[serde(default)]
    pub student_emails: Vec<String>,
    #[serde(default)]
    pub staff_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Channel {
    pub fn emails(&self, role: Role) -> &[String] {
        match role {
            Role::Teacher => &self.teacher_emails,
            Role::Staff => &self.staff_emails,
            Role::Student => &self.student_emails,
        }
    }
}

/// Payload for creating a class.
///
/// `class_id` is the id the client computed from the classes it last saw.
/// The server assigns the stored id itself and returns it in the created
/// [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannel {
    #[serde(rename = "class_id", default)]
    pub sequence_id: i64,
    #[serde(rename = "className")]
    pub display_name: String,
    #[serde(default)]
    pub teacher_emails: Vec<String>,
    #[serde(default)]
    pub student_emails: Vec<String>,
    #[serde(default)]
    pub staff_emails: Vec<String>,
}

impl NewChannel {
    pub fn emails(&self, role: Role) -> &[String] {
        match role {
            Role::Teacher => &self.teacher_emails,
            Role::Staff => &self.staff_emails,
            Role::Student => &self.student_emails,
        }
    }
}

/// Membership link between a class and a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub channel_id: i64,
    pub user_id: i64,
    pub role: Role,
}
