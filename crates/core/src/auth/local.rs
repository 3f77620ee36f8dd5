//! Store-backed account provider
//!
//! Credentials are documents in the [`CREDENTIALS`] collection keyed by the
//! normalized email, so accounts persist with whatever backend the prompts
//! use. Passwords are kept as PBKDF2-HMAC-SHA256 digests together with the
//! salt and iteration count they were derived with. Five wrong passwords in
//! a row lock the account out of sign-in for [`LOCKOUT`].

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{forms::is_valid_email, Account, AccountProvider};
use crate::{
    errors::{AuthErrorCode, PromptShareError, Result},
    store::{new_document_id, Document, DocumentStore, DocumentWrite, Fields, Query, CREDENTIALS},
    util::{ct_eq, generate_token, password_digest},
};

/// Shortest password the provider accepts
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Stored form of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    #[serde(flatten)]
    account: Account,
    salt: String,
    digest: String,
    iterations: u32,
}

impl Credential {
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(PromptShareError::Store("credential is not an object".into())),
        }
    }

    fn from_document(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc.data))?)
    }
}

#[derive(Default)]
struct Attempts {
    failures: u32,
    locked_until: Option<Instant>,
}

pub struct LocalAccountProvider {
    store: Arc<dyn DocumentStore>,
    iterations: u32,
    attempts: Mutex<HashMap<String, Attempts>>,
    resets: Mutex<Vec<String>>,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(PromptShareError::auth(AuthErrorCode::InvalidEmail, "malformed email address"))
    }
}

fn not_found() -> PromptShareError {
    PromptShareError::auth(AuthErrorCode::UserNotFound, "no account for email")
}

/// Runs on the blocking pool
async fn digest(salt: String, password: String, iterations: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || password_digest(&salt, &password, iterations))
        .await
        .map_err(|e| PromptShareError::Other(format!("password hashing failed: {}", e)))
}

impl LocalAccountProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            iterations: DEFAULT_ITERATIONS,
            attempts: Mutex::new(HashMap::new()),
            resets: Mutex::new(Vec::new()),
        }
    }

    /// PBKDF2 rounds for new digests; existing ones keep their own count
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Emails that were sent a reset link, oldest first
    pub async fn sent_resets(&self) -> Vec<String> {
        self.resets.lock().await.clone()
    }

    async fn load_by_uid(&self, uid: &str) -> Result<Option<(String, Credential)>> {
        let query = Query::new().where_eq("uid", uid).limit(1);
        match self.store.query(CREDENTIALS, &query).await?.into_iter().next() {
            Some(doc) => {
                let key = doc.id.clone();
                Ok(Some((key, Credential::from_document(doc)?)))
            }
            None => Ok(None),
        }
    }

    async fn check_lockout(&self, key: &str) -> Result<()> {
        let attempts = self.attempts.lock().await;
        let locked = attempts
            .get(key)
            .and_then(|a| a.locked_until)
            .is_some_and(|until| until > Instant::now());
        if locked {
            return Err(PromptShareError::auth(
                AuthErrorCode::TooManyRequests,
                "account temporarily locked",
            ));
        }
        Ok(())
    }

    async fn record_failure(&self, key: &str, uid: &str) {
        let mut attempts = self.attempts.lock().await;
        let entry = attempts.entry(key.to_string()).or_default();
        entry.failures += 1;
        if entry.failures >= MAX_FAILED_ATTEMPTS {
            entry.failures = 0;
            entry.locked_until = Some(Instant::now() + LOCKOUT);
            tracing::warn!(uid, "sign-in locked out");
        }
    }
}

#[async_trait]
impl AccountProvider for LocalAccountProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Account> {
        check_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PromptShareError::auth(
                AuthErrorCode::WeakPassword,
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        let salt = generate_token(SALT_LEN);
        let credential = Credential {
            account: Account {
                uid: new_document_id(),
                email: email.trim().to_string(),
                display_name: None,
                photo_url: None,
            },
            digest: digest(salt.clone(), password.to_string(), self.iterations).await?,
            salt,
            iterations: self.iterations,
        };

        let write = DocumentWrite::new(credential.to_fields()?).with_server_timestamp("createdAt");
        if !self
            .store
            .create_if_absent(CREDENTIALS, &email_key(email), write)
            .await?
        {
            return Err(PromptShareError::auth(
                AuthErrorCode::EmailAlreadyInUse,
                "email already registered",
            ));
        }

        tracing::info!(uid = %credential.account.uid, "account created");
        Ok(credential.account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account> {
        check_email(email)?;
        let key = email_key(email);

        let credential = match self.store.get(CREDENTIALS, &key).await? {
            Some(doc) => Credential::from_document(doc)?,
            None => return Err(not_found()),
        };
        self.check_lockout(&key).await?;

        let attempt = digest(
            credential.salt.clone(),
            password.to_string(),
            credential.iterations,
        )
        .await?;
        if !ct_eq(&attempt, &credential.digest) {
            self.record_failure(&key, &credential.account.uid).await;
            return Err(PromptShareError::auth(AuthErrorCode::WrongPassword, "wrong password"));
        }

        self.attempts.lock().await.remove(&key);
        tracing::info!(uid = %credential.account.uid, "signed in");
        Ok(credential.account)
    }

    async fn update_profile(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Account> {
        let (key, mut credential) = self
            .load_by_uid(uid)
            .await?
            .ok_or_else(|| PromptShareError::auth(AuthErrorCode::UserNotFound, "no such account"))?;

        if let Some(name) = display_name {
            credential.account.display_name = Some(name.to_string());
        }
        if let Some(url) = photo_url {
            credential.account.photo_url = Some(url.to_string());
        }

        let write = DocumentWrite::new(credential.to_fields()?).with_server_timestamp("updatedAt");
        self.store.set(CREDENTIALS, &key, write).await?;
        Ok(credential.account)
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        check_email(email)?;
        let key = email_key(email);
        if self.store.get(CREDENTIALS, &key).await?.is_none() {
            return Err(not_found());
        }

        tracing::info!("password reset requested");
        self.resets.lock().await.push(key);
        Ok(())
    }

    async fn delete_account(&self, uid: &str) -> Result<()> {
        if let Some((key, _)) = self.load_by_uid(uid).await? {
            self.store.delete(CREDENTIALS, &key).await?;
            self.attempts.lock().await.remove(&key);
        }
        tracing::info!(uid, "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};

    const TEST_ITERATIONS: u32 = 1_000;

    fn provider() -> LocalAccountProvider {
        LocalAccountProvider::new(Arc::new(MemoryStore::new())).with_iterations(TEST_ITERATIONS)
    }

    fn code(err: PromptShareError) -> AuthErrorCode {
        match err {
            PromptShareError::Auth { code, .. } => code,
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let provider = provider();
        let account = provider.create_account("ada@example.com", "Secret123").await.unwrap();
        assert!(account.display_name.is_none());

        let again = provider.sign_in("ADA@example.com", "Secret123").await.unwrap();
        assert_eq!(again, account);
    }

    #[tokio::test]
    async fn test_stores_digest_not_password() {
        let store = Arc::new(MemoryStore::new());
        let provider = LocalAccountProvider::new(store.clone()).with_iterations(TEST_ITERATIONS);
        provider.create_account("Ada@Example.com", "Secret123").await.unwrap();

        let doc = store.get(CREDENTIALS, "ada@example.com").await.unwrap().unwrap();
        assert_eq!(doc.get_str("email"), Some("Ada@Example.com"));
        assert_eq!(doc.get("iterations"), Some(&serde_json::json!(TEST_ITERATIONS)));
        let digest = doc.get_str("digest").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(!doc.to_value().to_string().contains("Secret123"));
    }

    #[tokio::test]
    async fn test_digest_keeps_its_iteration_count() {
        let store = Arc::new(MemoryStore::new());
        LocalAccountProvider::new(store.clone())
            .with_iterations(TEST_ITERATIONS)
            .create_account("ada@example.com", "Secret123")
            .await
            .unwrap();

        let stronger = LocalAccountProvider::new(store).with_iterations(TEST_ITERATIONS * 2);
        stronger.sign_in("ada@example.com", "Secret123").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_errors() {
        let provider = provider();
        provider.create_account("ada@example.com", "Secret123").await.unwrap();

        let dup = provider.create_account(" ADA@example.com", "Other123").await.unwrap_err();
        assert_eq!(code(dup), AuthErrorCode::EmailAlreadyInUse);

        let bad = provider.create_account("not-an-email", "Secret123").await.unwrap_err();
        assert_eq!(code(bad), AuthErrorCode::InvalidEmail);

        let weak = provider.create_account("bob@example.com", "abc").await.unwrap_err();
        assert_eq!(code(weak), AuthErrorCode::WeakPassword);
    }

    #[tokio::test]
    async fn test_sign_in_errors_and_lockout() {
        let provider = provider();
        provider.create_account("ada@example.com", "Secret123").await.unwrap();

        let missing = provider.sign_in("bob@example.com", "Secret123").await.unwrap_err();
        assert_eq!(code(missing), AuthErrorCode::UserNotFound);

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let wrong = provider.sign_in("ada@example.com", "nope").await.unwrap_err();
            assert_eq!(code(wrong), AuthErrorCode::WrongPassword);
        }

        // Correct password is refused while locked
        let locked = provider.sign_in("ada@example.com", "Secret123").await.unwrap_err();
        assert_eq!(code(locked), AuthErrorCode::TooManyRequests);
    }

    #[tokio::test]
    async fn test_update_profile_persists() {
        let provider = provider();
        let account = provider.create_account("ada@example.com", "Secret123").await.unwrap();

        let updated = provider
            .update_profile(&account.uid, Some("ada_l"), None)
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("ada_l"));
        assert!(updated.photo_url.is_none());

        let signed_in = provider.sign_in("ada@example.com", "Secret123").await.unwrap();
        assert_eq!(signed_in.display_name.as_deref(), Some("ada_l"));

        let missing = provider.update_profile("nobody", Some("x"), None).await.unwrap_err();
        assert_eq!(code(missing), AuthErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn test_password_reset_and_delete() {
        let provider = provider();
        let account = provider.create_account("ada@example.com", "Secret123").await.unwrap();

        provider.send_password_reset("ada@example.com").await.unwrap();
        assert_eq!(provider.sent_resets().await, vec!["ada@example.com".to_string()]);

        provider.delete_account(&account.uid).await.unwrap();

        let gone = provider.send_password_reset("ada@example.com").await.unwrap_err();
        assert_eq!(code(gone), AuthErrorCode::UserNotFound);

        // The email is free again
        provider.create_account("ada@example.com", "Secret123").await.unwrap();
    }

    #[tokio::test]
    async fn test_accounts_survive_provider_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");

        let uid = {
            let store = Arc::new(SqliteStore::open(&path).await.unwrap());
            let provider = LocalAccountProvider::new(store).with_iterations(TEST_ITERATIONS);
            provider.create_account("ada@example.com", "Secret123").await.unwrap().uid
        };

        let store = Arc::new(SqliteStore::open(&path).await.unwrap());
        let provider = LocalAccountProvider::new(store).with_iterations(TEST_ITERATIONS);
        let account = provider.sign_in("ada@example.com", "Secret123").await.unwrap();
        assert_eq!(account.uid, uid);
    }
}
