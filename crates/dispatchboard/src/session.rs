//! The session user and its subscription plan.
//!
//! Plans are free-text labels; nothing here talks to a billing system.

use serde::{Deserialize, Serialize};

/// Plan assigned to every new user.
pub const FREE_PLAN: &str = "Free";

/// Plan label set when a trial is started.
pub const TRIAL_PLAN: &str = "Professional (Trial)";

/// Paid plan for single teams.
pub const PROFESSIONAL_PLAN: &str = "Professional";

/// Paid plan for whole organizations.
pub const ENTERPRISE_PLAN: &str = "Enterprise";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Subscription plan label.
    pub plan: String,
    /// Optional avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Create a user on the free plan.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            plan: FREE_PLAN.to_string(),
            avatar: None,
        }
    }

    /// Create a user named after the local part of their email address.
    #[must_use]
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email);
        Self::new(name, email)
    }

    /// Check if the user is on anything other than the free plan.
    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.plan != FREE_PLAN
    }
}

/// Who is using the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Nobody is signed in.
    #[default]
    Anonymous,
    /// A user is signed in.
    Authenticated(User),
}

impl Session {
    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Consume the session, yielding the user if any.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Check if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The plan label to display, `Free` for anonymous sessions.
    #[must_use]
    pub fn plan(&self) -> &str {
        self.user().map_or(FREE_PLAN, |u| u.plan.as_str())
    }
}

impl From<Option<User>> for Session {
    fn from(user: Option<User>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }
}
