//! User notifications.

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use tracing::{info, warn};
use trolley::{cart::CartError, limits::MAX_QUANTITY_PER_ITEM};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A short message shown to the user after a cart operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn item_added(name: &str) -> Self {
        Self::new(NotificationLevel::Success, format!("{name} added to cart"))
    }

    #[must_use]
    pub fn item_removed(name: &str) -> Self {
        Self::new(NotificationLevel::Info, format!("{name} removed from cart"))
    }

    #[must_use]
    pub fn cart_cleared() -> Self {
        Self::new(NotificationLevel::Info, "Cart cleared")
    }

    /// Message for a rejected cart operation.
    ///
    /// Signed-out callers are sent to the login prompt rather than notified, so
    /// [`CartError::AuthRequired`] only gets the generic message.
    #[must_use]
    pub fn rejected(error: &CartError) -> Self {
        match error {
            CartError::Validation(_) => {
                Self::new(NotificationLevel::Error, "Invalid product details")
            }
            CartError::ProductNotFound(_) => {
                Self::new(NotificationLevel::Error, "Product not found")
            }
            CartError::InsufficientStock { .. } => {
                Self::new(NotificationLevel::Error, "Insufficient stock")
            }
            CartError::CartFull { max, .. } => Self::new(
                NotificationLevel::Warning,
                format!("Maximum {max} items allowed in cart"),
            ),
            CartError::QuantityLimitExceeded { .. } => Self::new(
                NotificationLevel::Warning,
                format!("Maximum {MAX_QUANTITY_PER_ITEM} items per product"),
            ),
            CartError::EmptyCart => Self::new(NotificationLevel::Warning, "Your cart is empty"),
            CartError::AuthRequired
            | CartError::NotReady
            | CartError::CatalogUnavailable
            | CartError::PersistenceFailure => Self::new(
                NotificationLevel::Error,
                "Something went wrong. Please try again.",
            ),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Delivers notifications to the user. Delivery is best-effort.
#[automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Notifier that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(level = ?notification.level, "{notification}");
            }
            NotificationLevel::Warning | NotificationLevel::Error => {
                warn!(level = ?notification.level, "{notification}");
            }
        }
    }
}
