//! Shared fixtures for unit tests

use async_trait::async_trait;

use crate::{
    errors::{PromptShareError, Result},
    store::{Document, DocumentStore, DocumentWrite, Query},
};

/// A store whose every call fails, for exercising degraded paths
pub struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(PromptShareError::Store("store unavailable".into()))
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn add(&self, _: &str, _: DocumentWrite) -> Result<String> {
        unavailable()
    }

    async fn get(&self, _: &str, _: &str) -> Result<Option<Document>> {
        unavailable()
    }

    async fn set(&self, _: &str, _: &str, _: DocumentWrite) -> Result<()> {
        unavailable()
    }

    async fn create_if_absent(&self, _: &str, _: &str, _: DocumentWrite) -> Result<bool> {
        unavailable()
    }

    async fn delete(&self, _: &str, _: &str) -> Result<()> {
        unavailable()
    }

    async fn query(&self, _: &str, _: &Query) -> Result<Vec<Document>> {
        unavailable()
    }
}
