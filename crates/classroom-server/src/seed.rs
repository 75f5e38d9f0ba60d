use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use classroom_db::Database;
use classroom_types::api::NewUser;

/// Upsert every user in a JSON array file. Returns how many were written.
pub fn load_users(db: &Database, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let users: Vec<NewUser> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;

    for user in &users {
        db.upsert_user(user)?;
    }

    info!("Seeded {} users from {}", users.len(), path.display());
    Ok(users.len())
}
