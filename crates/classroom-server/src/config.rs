use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// JSON array of users to upsert at startup.
    pub seed_users: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("CLASSROOM_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match get("CLASSROOM_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CLASSROOM_PORT is not a port number: {}", raw))?,
            None => 3000,
        };
        let db_path = get("CLASSROOM_DB_PATH")
            .unwrap_or_else(|| "classroom.db".into())
            .into();
        let seed_users = get("CLASSROOM_SEED_USERS")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            db_path,
            seed_users,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
