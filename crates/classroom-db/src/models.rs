//! Database row types — these map directly to SQLite rows.
//! Distinct from classroom-types API models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use classroom_types::{Channel, Role, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        let role = self
            .role
            .parse::<Role>()
            .with_context(|| format!("corrupt role on user {}", self.id))?;
        Ok(User {
            id: self.id,
            username: self.username,
            name: self.name,
            email: self.email,
            role,
            status: self.status,
        })
    }
}

pub struct ChannelRow {
    pub id: i64,
    pub class_id: i64,
    pub name: String,
    pub created_at: String,
}

impl ChannelRow {
    /// Build the API record with empty member lists.
    pub fn into_channel(self) -> Channel {
        Channel {
            sequence_id: self.class_id,
            display_name: self.name,
            teacher_emails: Vec::new(),
            student_emails: Vec::new(),
            staff_emails: Vec::new(),
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

pub struct MemberRow {
    pub channel_id: i64,
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Result of a channel create that did not hit an infrastructure error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateChannelOutcome {
    Created(Channel),
    DuplicateName,
    UnknownEmail(String),
    RoleMismatch {
        email: String,
        expected: Role,
        actual: Role,
    },
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}
