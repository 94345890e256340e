//! Credential gate for the chat gateway
//!
//! A single shared (username, password) pair guards the deployment. The gate
//! refuses to construct when either secret is missing, so a misconfigured
//! process fails loudly at startup instead of silently denying every login.

use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::{Error, Result};

/// Identity granted to an authenticated connection.
///
/// There is exactly one identity class in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identifier: String,
    pub role: String,
    pub provider: String,
}

impl Identity {
    fn admin() -> Self {
        Self {
            identifier: "admin".to_string(),
            role: "admin".to_string(),
            provider: "credentials".to_string(),
        }
    }
}

/// Validates submitted credentials against the configured secrets.
#[derive(Debug, Clone)]
pub struct CredentialGate {
    username: String,
    password: String,
}

impl CredentialGate {
    /// Create a gate from configuration.
    ///
    /// Both secrets must be present; otherwise the gate cannot operate and
    /// construction fails with a configuration error.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.username.is_empty() || config.password.is_empty() {
            return Err(Error::Config(
                "Username or password not set. Please set DOCENT_USERNAME and \
                 DOCENT_PASSWORD environment variables."
                    .to_string(),
            ));
        }

        Ok(Self {
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Check a submitted credential pair.
    ///
    /// Returns the admin identity on an exact match of both fields, `None`
    /// on any mismatch. The caller is responsible for rejecting the
    /// connection when no identity is granted.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Identity> {
        if username == self.username && password == self.password {
            Some(Identity::admin())
        } else {
            None
        }
    }
}
