//! In-process session.

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::info;

use super::{AuthProvider, Identity};

/// Holds the signed-in identity for the lifetime of the process and publishes changes.
#[derive(Debug)]
pub struct SessionAuth {
    identity: watch::Sender<Option<Identity>>,
    prompts: Mutex<Vec<String>>,
}

impl SessionAuth {
    #[must_use]
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            identity: watch::Sender::new(identity),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A session with nobody signed in.
    #[must_use]
    pub fn guest() -> Self {
        Self::new(None)
    }

    pub fn sign_in(&self, identity: Identity) {
        info!(user = %identity, "signed in");

        self.identity.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.identity.send_replace(None) {
            info!(user = %previous, "signed out");
        }
    }

    /// Actions the user was asked to sign in for, oldest first.
    pub async fn login_prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::guest()
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    async fn require_login(&self, action: &str) {
        info!(action, "login required");

        self.prompts.lock().await.push(action.to_string());
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn sign_in_and_out_publish_identity() -> TestResult {
        let auth = SessionAuth::guest();
        let mut events = auth.subscribe();

        assert!(auth.current_identity().is_none());

        let identity = Identity::from_email("shopper@example.com");
        auth.sign_in(identity.clone());

        events.changed().await?;
        assert_eq!(*events.borrow_and_update(), Some(identity.clone()));
        assert_eq!(auth.current_identity(), Some(identity));

        auth.sign_out();

        events.changed().await?;
        assert!(events.borrow_and_update().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn require_login_records_prompt() {
        let auth = SessionAuth::guest();

        auth.require_login("add items to cart").await;

        assert_eq!(auth.login_prompts().await, vec!["add items to cart"]);
    }
}
