//! Auth

mod models;
mod session;

use async_trait::async_trait;
use mockall::automock;
use tokio::sync::watch;

pub use models::{Identity, User, UserUuid};
pub use session::SessionAuth;

/// Source of the signed-in identity.
#[automock]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The identity signed in right now, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Ask the user to sign in before performing `action`.
    async fn require_login(&self, action: &str);

    /// Identity change events. The current value is the signed-in identity.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}
