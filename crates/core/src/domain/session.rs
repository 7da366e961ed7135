// Session: the identity a client speaks to the backend with

use crate::port::IdProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Restored from a stored access token
    Authenticated { access_token: String },
    /// Ephemeral identity when no stored session exists
    Guest { guest_id: String },
}

/// Explicit session object threaded into the gateway at construction.
/// There is no process-wide current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
}

impl Session {
    /// Restore a session from a stored token, falling back to a guest identity
    pub fn restore(stored_token: Option<String>, ids: &dyn IdProvider) -> Self {
        match stored_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(access_token) => Self::authenticated(access_token),
            None => Self::guest(ids.generate_id()),
        }
    }

    pub fn authenticated(access_token: impl Into<String>) -> Self {
        Self {
            identity: Identity::Authenticated {
                access_token: access_token.into(),
            },
        }
    }

    pub fn guest(guest_id: impl Into<String>) -> Self {
        Self {
            identity: Identity::Guest {
                guest_id: guest_id.into(),
            },
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.identity, Identity::Guest { .. })
    }

    /// Value for the `Authorization: Bearer` header, if any
    pub fn bearer_token(&self) -> Option<&str> {
        match &self.identity {
            Identity::Authenticated { access_token } => Some(access_token),
            Identity::Guest { .. } => None,
        }
    }
}
