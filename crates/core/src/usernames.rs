//! Username index: handle claims and reverse resolution
//!
//! `usernames/{handle}` holds `{ uid }` and is the uniqueness authority.
//! `accounts/{uid}` holds `{ username }` so that resolving an account to
//! its handle is a key lookup. Entries written before the reverse index
//! existed are still found through an equality query on `uid`.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::{
    errors::{PromptShareError, Result},
    store::{DocumentStore, DocumentWrite, Fields, Query, ACCOUNTS, USERNAMES},
};

/// Rendered when an account has no claimed handle
pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Clone)]
pub struct UsernameIndex {
    store: Arc<dyn DocumentStore>,
}

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Lowercased, trimmed form used as the index key
pub fn normalize(handle: &str) -> String {
    handle.trim().to_lowercase()
}

impl UsernameIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolve an account id to its handle
    ///
    /// Never fails: misses and store faults both yield [`UNKNOWN_USER`].
    pub async fn resolve(&self, account_id: &str) -> String {
        match self.lookup(account_id).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::debug!(account_id, "no username indexed for account");
                UNKNOWN_USER.to_string()
            }
            Err(err) => {
                tracing::warn!(account_id, error = %err, "failed to fetch username");
                UNKNOWN_USER.to_string()
            }
        }
    }

    async fn lookup(&self, account_id: &str) -> Result<Option<String>> {
        if let Some(doc) = self.store.get(ACCOUNTS, account_id).await? {
            if let Some(handle) = doc.get_str("username") {
                return Ok(Some(handle.to_string()));
            }
        }

        // Entries without a reverse record
        let query = Query::new().where_eq("uid", account_id).limit(1);
        let docs = self.store.query(USERNAMES, &query).await?;
        Ok(docs.into_iter().next().map(|d| d.id))
    }

    /// Advisory check for form feedback; [`Self::claim`] is authoritative
    pub async fn is_available(&self, handle: &str) -> Result<bool> {
        let key = normalize(handle);
        Ok(self.store.get(USERNAMES, &key).await?.is_none())
    }

    /// Claim `handle` for `account_id`
    ///
    /// The claim is a single create-if-absent, so of two concurrent claims
    /// for the same handle exactly one wins. Returns the normalized handle.
    pub async fn claim(&self, handle: &str, account_id: &str) -> Result<String> {
        let key = normalize(handle);

        let claim = DocumentWrite::new(fields(json!({ "uid": account_id })));
        let created = self.store.create_if_absent(USERNAMES, &key, claim).await?;
        if !created {
            return Err(PromptShareError::UsernameTaken(key));
        }

        self.store
            .set(
                ACCOUNTS,
                account_id,
                DocumentWrite::new(fields(json!({ "username": key }))),
            )
            .await?;

        tracing::info!(handle = %key, account_id, "username claimed");
        Ok(key)
    }

    /// Drop a claim, only if it still belongs to `account_id`
    pub async fn release(&self, handle: &str, account_id: &str) -> Result<()> {
        let key = normalize(handle);
        if let Some(doc) = self.store.get(USERNAMES, &key).await? {
            if doc.get_str("uid") == Some(account_id) {
                self.store.delete(USERNAMES, &key).await?;
                self.store.delete(ACCOUNTS, account_id).await?;
            }
        }
        Ok(())
    }
}
