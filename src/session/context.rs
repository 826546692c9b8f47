use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Portal role. The lowercased name doubles as the role segment in portal URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dev,
    Po,
    Qa,
    Sa,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dev => "dev",
            Role::Po => "po",
            Role::Qa => "qa",
            Role::Sa => "sa",
        }
    }

    /// Parse a URL role segment. Case-sensitive: portal URLs are lowercase.
    pub fn from_segment(segment: &str) -> Option<Role> {
        match segment {
            "dev" => Some(Role::Dev),
            "po" => Some(Role::Po),
            "qa" => Some(Role::Qa),
            "sa" => Some(Role::Sa),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the authenticated principal was established.
///
/// An explicit tag instead of runtime inspection of the context object, so the
/// reconciler can tell provider-based logins apart without downcasting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum AuthOrigin {
    Password,
    Provider { provider: String },
}

impl AuthOrigin {
    pub fn is_provider(&self) -> bool {
        matches!(self, AuthOrigin::Provider { .. })
    }
}

/// The authenticated principal attached to a session.
///
/// Exactly one context is active per session; at most one more is saved while
/// an administrator impersonates another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub username: String,
    /// Role order comes from the upstream role provider and is treated as
    /// opaque but deterministic; the first role is the canonical one for
    /// navigation redirects.
    pub roles: Vec<Role>,
    pub origin: AuthOrigin,
    pub authenticated: bool,
}

impl AuthContext {
    pub fn password(username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            username: username.into(),
            roles,
            origin: AuthOrigin::Password,
            authenticated: true,
        }
    }

    pub fn provider(
        username: impl Into<String>,
        roles: Vec<Role>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            roles,
            origin: AuthOrigin::Provider {
                provider: provider.into(),
            },
            authenticated: true,
        }
    }

    /// Canonical role for building navigation URLs.
    pub fn navigation_role(&self) -> Option<Role> {
        self.roles.first().copied()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// A user record with no persistent identity yet, held in the session while a
/// provider-based signup is mid-flight. A persistent id is assigned once
/// profile completion succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientUser {
    pub id: Option<Uuid>,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub provider: String,
}

impl TransientUser {
    pub fn new(username: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
            display_name: None,
            provider: provider.into(),
        }
    }

    /// Profile completion is still pending while no persistent id exists.
    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }
}
