use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Release of the review server, compared component-wise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: 0,
        }
    }
}

impl FromStr for ServerVersion {
    type Err = ModelError;

    /// Accepts `2.14`, `2.14.1` and suffixed builds such as `3.4.1-rc2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidVersion(s.to_string());
        let core = s.trim().split(['-', '+']).next().unwrap_or_default();
        let mut parts = core.split('.');

        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The account a diff session is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account identifier (server URL + user, or any opaque string).
    pub id: String,
    /// `false` for anonymous, read-only sessions.
    pub authenticated: bool,
    /// Version advertised by the server the account belongs to.
    pub server_version: ServerVersion,
}

impl Account {
    pub fn new(id: impl Into<String>, authenticated: bool, server_version: ServerVersion) -> Self {
        Self {
            id: id.into(),
            authenticated,
            server_version,
        }
    }

    pub fn anonymous(id: impl Into<String>, server_version: ServerVersion) -> Self {
        Self::new(id, false, server_version)
    }

    pub fn has_authenticated_access(&self) -> bool {
        self.authenticated
    }
}
