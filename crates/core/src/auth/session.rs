//! Current signed-in account, observable
//!
//! [`SessionState`] owns a watch channel. Readers take a snapshot with
//! [`SessionState::current`]; observers hold a [`SessionSubscription`],
//! and dropping it is the unsubscribe.

use std::sync::Arc;

use tokio::sync::watch;

use super::Account;
use crate::errors::{PromptShareError, Result};

#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<Option<Account>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Account> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Account id of the signed-in user, or `Unauthenticated`
    pub fn require(&self) -> Result<Account> {
        self.current().ok_or(PromptShareError::Unauthenticated)
    }

    pub(crate) fn set(&self, account: Option<Account>) {
        let uid = account.as_ref().map(|a| a.uid.clone());
        self.tx.send_replace(account);
        tracing::debug!(?uid, "session changed");
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Live subscriptions
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct SessionSubscription {
    rx: watch::Receiver<Option<Account>>,
}

impl SessionSubscription {
    /// Wait for the next sign-in or sign-out
    pub async fn changed(&mut self) -> Result<Option<Account>> {
        self.rx
            .changed()
            .await
            .map_err(|_| PromptShareError::Other("session closed".into()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    pub fn current(&self) -> Option<Account> {
        self.rx.borrow().clone()
    }
}
