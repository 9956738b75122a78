//! Static user directory.
//!
//! Loaded once from a JSON file at startup and never modified.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::roles::Role;

/// One entry of the user file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Read-only set of known users.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
}

impl UserDirectory {
    pub const fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    /// Load the directory from a JSON array of `{ username, password, role }`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading user file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing user file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let users: Vec<UserRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(users))
    }

    /// Find the user matching both `username` and `password`.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&UserRecord> {
        self.users
            .iter()
            .find(|u| u.username == username && u.password == password)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
