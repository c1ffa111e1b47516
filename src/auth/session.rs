//! Session state for the signed-in user

use serde::{Deserialize, Serialize};

/// Identity issued by the external auth service. This client only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Opaque user id, also the owner key for chat rows
    #[serde(default)]
    pub id: String,

    /// GitHub login, when the account is linked
    #[serde(default)]
    pub handle: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserIdentity {
    /// Handle sent to the agent backend: the GitHub login, else the email
    /// local part, else "unknown".
    pub fn display_handle(&self) -> String {
        if let Some(handle) = &self.handle {
            if !handle.is_empty() {
                return handle.clone();
            }
        }
        if let Some(email) = &self.email {
            if let Some((local, _)) = email.split_once('@') {
                if !local.is_empty() {
                    return local.to_string();
                }
            }
        }
        "unknown".to_string()
    }

    /// True when no identity is configured (the signed-out state)
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// The current session, read by every view
#[derive(Debug, Clone)]
pub struct Session {
    user: UserIdentity,
}

impl Session {
    pub fn new(user: UserIdentity) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}
