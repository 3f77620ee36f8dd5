//! Application context shared by commands and the server
//!
//! [`App`] is shared by every client. [`Session`] is per client: each
//! WebSocket connection owns one, so signing in on one connection never
//! signs in another.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    auth::{Account, AccountProvider, AuthService, LocalAccountProvider, SessionState},
    config::{Config, StoreBackend},
    errors::Result,
    feed::StarSet,
    prompts::PromptService,
    store::{DocumentStore, MemoryStore, SqliteStore},
    usernames::UsernameIndex,
};

pub struct App {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub usernames: UsernameIndex,
    pub prompts: PromptService,
    pub auth: AuthService,
}

impl App {
    /// Open the configured store and wire the services on top of it
    pub async fn open(config: Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                tracing::info!(path = %config.database_path.display(), "opening sqlite store");
                Arc::new(SqliteStore::open(&config.database_path).await?)
            }
        };
        Ok(Self::with_store(config, store))
    }

    /// In-memory store with default settings
    pub fn in_memory() -> Self {
        let config = Config {
            store: StoreBackend::Memory,
            ..Config::default()
        };
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Accounts kept in `store` next to the prompts
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let provider = LocalAccountProvider::new(store.clone())
            .with_iterations(config.password_iterations);
        Self::with_parts(config, store, Arc::new(provider))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn AccountProvider>,
    ) -> Self {
        let usernames = UsernameIndex::new(store.clone());
        let prompts = PromptService::new(store.clone(), usernames.clone())
            .with_policy(config.batch_policy)
            .with_timeout(config.request_timeout());
        let auth = AuthService::new(provider, usernames.clone()).with_pacing(config.pacing_delay());

        Self {
            config,
            store,
            usernames,
            prompts,
            auth,
        }
    }

    /// UX pacing delay before a write is processed
    pub async fn pace(&self) {
        let delay = self.config.pacing_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// One client's signed-in account and stars
#[derive(Default)]
pub struct Session {
    pub account: SessionState,
    pub stars: Mutex<StarSet>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in account, or `Unauthenticated`
    pub fn require_account(&self) -> Result<Account> {
        self.account.require()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PromptShareError;

    #[test]
    fn test_new_session_is_signed_out() {
        let session = Session::new();
        assert!(matches!(
            session.require_account(),
            Err(PromptShareError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_in_memory_accounts_use_the_app_store() {
        let app = App::in_memory();
        let session = Session::new();
        app.auth
            .sign_up(
                &session.account,
                &serde_json::json!({
                    "name": "Ada",
                    "username": "ada",
                    "email": "ada@example.com",
                    "password": "Secret123",
                }),
            )
            .await
            .unwrap();

        let stored = app
            .store
            .get(crate::store::CREDENTIALS, "ada@example.com")
            .await
            .unwrap();
        assert!(stored.is_some());
    }
}
