use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod anime;
mod profile;

pub use anime::*;
pub use profile::*;

/// Admission key for rate limiting, derived from the client's address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Identity shared by every request whose address cannot be determined
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let trimmed = identity.trim();
        if trimmed.is_empty() {
            Self::unknown()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
