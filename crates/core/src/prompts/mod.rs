//! Prompt access layer
//!
//! The three operations here never return `Err`. Every fault is trapped,
//! classified as validation or store, logged, and folded into an
//! [`ActionResult`] with a user-facing message.

pub mod mapper;

use std::{future::Future, str::FromStr, sync::Arc, time::Duration};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    errors::{PromptShareError, Result},
    schema::{self, NewPrompt, PromptWithAuthor, ValidationErrors},
    store::{Direction, Document, DocumentStore, DocumentWrite, Query, PROMPTS},
    usernames::UsernameIndex,
};

const CREATE_INVALID: &str = "Please check your input data and try again.";
const CREATE_FAILED: &str = "Failed to save prompt. Please try again.";
const FETCH_INVALID: &str = "Invalid prompt data format.";
const FETCH_PUBLIC_FAILED: &str = "Failed to fetch public prompts. Please try again.";
const FETCH_ALL_FAILED: &str = "Failed to fetch prompts. Please try again.";
const FETCH_OWNER_FAILED: &str = "Failed to fetch your prompts. Please try again.";

/// What to do when one record in a fetched batch fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Fail the whole batch
    #[default]
    Strict,
    /// Drop the invalid records and log a warning
    SkipInvalid,
}

impl FromStr for BatchPolicy {
    type Err = PromptShareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(BatchPolicy::Strict),
            "skip_invalid" | "skip-invalid" => Ok(BatchPolicy::SkipInvalid),
            other => Err(PromptShareError::Config(format!("unknown batch policy '{}'", other))),
        }
    }
}

/// Which prompts the feed shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedScope {
    Public,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Store,
}

/// Uniform `{ success, data?, error? }` outcome of an access-layer call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<ValidationErrors>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            field_errors: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: Some(kind),
            field_errors: None,
        }
    }

    pub fn is_validation_failure(&self) -> bool {
        self.kind == Some(FailureKind::Validation)
    }

    pub fn is_store_failure(&self) -> bool {
        self.kind == Some(FailureKind::Store)
    }

    /// Transform the payload, keeping failure details as they are
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        ActionResult {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            kind: self.kind,
            field_errors: self.field_errors,
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

/// Emitted after a prompt is written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCreated {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub is_public: bool,
}

pub struct PromptService {
    store: Arc<dyn DocumentStore>,
    usernames: UsernameIndex,
    policy: BatchPolicy,
    timeout: Option<Duration>,
    events: broadcast::Sender<PromptCreated>,
}

impl PromptService {
    pub fn new(store: Arc<dyn DocumentStore>, usernames: UsernameIndex) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            usernames,
            policy: BatchPolicy::Strict,
            timeout: None,
            events,
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    /// Receive a [`PromptCreated`] for every successful write
    pub fn subscribe(&self) -> broadcast::Receiver<PromptCreated> {
        self.events.subscribe()
    }

    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| PromptShareError::Timeout(limit.as_millis() as u64))?,
            None => fut.await,
        }
    }

    /// Validate `input` and store it as a new prompt owned by `owner_id`
    ///
    /// `owner_id` always wins over any `userId` in the input. Returns the
    /// store-assigned id.
    pub async fn create(&self, input: &Value, owner_id: &str) -> ActionResult<String> {
        match self.try_create(input, owner_id).await {
            Ok(created) => {
                tracing::info!(id = %created.id, owner_id, "prompt created");
                let id = created.id.clone();
                // No receivers is fine
                let _ = self.events.send(created);
                ActionResult::ok(id)
            }
            Err(err) => classify(err, "create prompt", CREATE_INVALID, CREATE_FAILED),
        }
    }

    async fn try_create(&self, input: &Value, owner_id: &str) -> Result<PromptCreated> {
        let mut body = match input {
            Value::Object(map) => map.clone(),
            _ => return Err(ValidationErrors::single("_root", "Expected an object.").into()),
        };
        body.insert("userId".into(), Value::String(owner_id.to_string()));

        let prompt = NewPrompt::parse(&Value::Object(body))?;
        let write = DocumentWrite::new(prompt.to_document())
            .with_server_timestamp("createdAt")
            .with_server_timestamp("updatedAt");

        let id = self.guarded(self.store.add(PROMPTS, write)).await?;

        Ok(PromptCreated {
            id,
            user_id: prompt.user_id.clone(),
            title: prompt.title.clone(),
            is_public: prompt.visibility(),
        })
    }

    /// Public feed, newest first
    pub async fn fetch_all(&self) -> ActionResult<Vec<PromptWithAuthor>> {
        self.fetch_feed(FeedScope::Public).await
    }

    pub async fn fetch_feed(&self, scope: FeedScope) -> ActionResult<Vec<PromptWithAuthor>> {
        let mut query = Query::new();
        if scope == FeedScope::Public {
            query = query.where_eq("isPublic", true);
        }
        let query = query.order_by("createdAt", Direction::Descending);

        let store_msg = match scope {
            FeedScope::Public => FETCH_PUBLIC_FAILED,
            FeedScope::All => FETCH_ALL_FAILED,
        };

        match self.load(&query).await {
            Ok(prompts) => {
                tracing::debug!(count = prompts.len(), ?scope, "fetched feed");
                ActionResult::ok(prompts)
            }
            Err(err) => classify(err, "fetch feed", FETCH_INVALID, store_msg),
        }
    }

    /// Every prompt owned by `owner_id`, regardless of visibility
    ///
    /// Records without `createdAt` are listed after the dated ones.
    pub async fn fetch_by_owner(&self, owner_id: &str) -> ActionResult<Vec<PromptWithAuthor>> {
        let query = Query::new()
            .where_eq("userId", owner_id)
            .order_by("createdAt", Direction::Descending)
            .keep_unordered();

        match self.load(&query).await {
            Ok(prompts) => {
                tracing::debug!(count = prompts.len(), owner_id, "fetched prompts for owner");
                ActionResult::ok(prompts)
            }
            Err(err) => classify(err, "fetch owner prompts", FETCH_INVALID, FETCH_OWNER_FAILED),
        }
    }

    async fn load(&self, query: &Query) -> Result<Vec<PromptWithAuthor>> {
        let docs: Vec<Document> = self.guarded(self.store.query(PROMPTS, query)).await?;

        let projections =
            join_all(docs.iter().map(|doc| mapper::to_display(doc, &self.usernames))).await;

        match self.policy {
            BatchPolicy::Strict => Ok(schema::parse_display_list(&projections)?),
            BatchPolicy::SkipInvalid => Ok(projections
                .iter()
                .filter_map(|value| match PromptWithAuthor::parse(value) {
                    Ok(prompt) => Some(prompt),
                    Err(errors) => {
                        let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
                        tracing::warn!(id, %errors, "skipping invalid prompt record");
                        None
                    }
                })
                .collect()),
        }
    }
}

fn classify<T>(
    err: PromptShareError,
    operation: &str,
    validation_msg: &str,
    store_msg: &str,
) -> ActionResult<T> {
    match err {
        PromptShareError::Validation(errors) => {
            tracing::warn!(operation, %errors, "validation error");
            let mut result = ActionResult::failure(FailureKind::Validation, validation_msg);
            result.field_errors = Some(errors);
            result
        }
        other => {
            tracing::error!(operation, error = %other, category = other.category(), "store error");
            ActionResult::failure(FailureKind::Store, store_msg)
        }
    }
}
