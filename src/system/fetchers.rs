// src/system/fetchers.rs

use crate::constants::HOST_USERS_FILE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid user ID, email or login: '{0}'")]
    NotFound(String),
    #[error("Could not read user table '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("User table '{path}' is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A host account as exported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUser {
    pub id: u64,
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

impl HostUser {
    /// Matches the way users identify accounts on the command line: a number is
    /// an ID, something with an `@` is an email, anything else is a login.
    fn matches(&self, ident: &str) -> bool {
        if let Ok(id) = ident.parse::<u64>() {
            self.id == id
        } else if ident.contains('@') {
            self.email.eq_ignore_ascii_case(ident)
        } else {
            self.login == ident
        }
    }
}

/// Looks up host users by an identifier given on the command line.
pub trait UserFetcher: fmt::Debug {
    fn get(&self, ident: &str) -> Result<HostUser, FetchError>;
}

/// An in-memory user table.
#[derive(Debug, Clone, Default)]
pub struct StaticUserFetcher {
    users: Vec<HostUser>,
}

impl StaticUserFetcher {
    pub fn new(users: Vec<HostUser>) -> Self {
        Self { users }
    }
}

impl UserFetcher for StaticUserFetcher {
    fn get(&self, ident: &str) -> Result<HostUser, FetchError> {
        self.users
            .iter()
            .find(|user| user.matches(ident))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(ident.to_string()))
    }
}

/// Reads the user table the host exports under its root. A host without the
/// table has no users to offer.
#[derive(Debug, Clone)]
pub struct HostUserFetcher {
    root: PathBuf,
}

impl HostUserFetcher {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn load(&self) -> Result<Vec<HostUser>, FetchError> {
        let path = self.root.join(HOST_USERS_FILE);
        if !path.is_file() {
            log::debug!("No user table at '{}'.", path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| FetchError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| FetchError::Malformed {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl UserFetcher for HostUserFetcher {
    fn get(&self, ident: &str) -> Result<HostUser, FetchError> {
        StaticUserFetcher::new(self.load()?).get(ident)
    }
}
