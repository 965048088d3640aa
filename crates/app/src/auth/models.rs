//! Auth models.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uuids::TypedUuid;

/// Marker for user identifiers.
#[derive(Debug)]
pub struct User;

pub type UserUuid = TypedUuid<User>;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uuid: UserUuid,
    pub email: String,
}

impl Identity {
    #[must_use]
    pub fn new(uuid: UserUuid, email: impl Into<String>) -> Self {
        Self {
            uuid,
            email: email.into(),
        }
    }

    /// Identity with a stable uuid derived from the normalised email address.
    #[must_use]
    pub fn from_email(email: &str) -> Self {
        let email = email.trim().to_lowercase();

        Self {
            uuid: UserUuid::from_name(&Uuid::NAMESPACE_URL, &format!("mailto:{email}")),
            email,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.uuid)
    }
}
