use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity established by the upstream authenticator for the current
/// request. Rolegate never verifies credentials itself; it trusts the
/// authentication layer in front of it to supply a stable subject id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    subject: Uuid,
}

impl AuthenticatedUser {
    /// Creates an authenticated identity from the upstream subject id.
    #[must_use]
    pub fn new(subject: Uuid) -> Self {
        Self { subject }
    }

    /// Returns the stable subject id for the current user.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }
}

impl std::fmt::Display for AuthenticatedUser {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.subject)
    }
}
