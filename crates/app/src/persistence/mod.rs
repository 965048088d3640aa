//! Cart persistence.
//!
//! Carts are stored per scope: one device-local guest cart, and one cart per signed-in user.

mod file;
mod memory;
mod split;

use std::{fmt, io};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use trolley::items::LineItem;

use crate::auth::UserUuid;

pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use split::SplitBackend;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io error")]
    Io(#[from] io::Error),

    #[error("stored cart could not be encoded or decoded")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Which stored cart to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The device-local cart used while signed out.
    Guest,

    /// The remote cart of a signed-in user.
    User(UserUuid),

    /// A device-local copy of a user's cart whose remote write failed.
    Pending(UserUuid),
}

impl ScopeKey {
    /// Name the cart is stored under.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Guest => "cart-guest".to_string(),
            Self::User(uuid) => format!("cart-user-{uuid}"),
            Self::Pending(uuid) => format!("cart-pending-{uuid}"),
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// Whether the scope lives on this device.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::User(_))
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Durable storage for cart lines.
#[automock]
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Read the lines stored for `scope`. `Ok(None)` means nothing was ever stored.
    async fn read(&self, scope: &ScopeKey) -> Result<Option<Vec<LineItem>>, PersistenceError>;

    /// Replace the lines stored for `scope`.
    async fn write(&self, scope: &ScopeKey, items: &[LineItem]) -> Result<(), PersistenceError>;
}
