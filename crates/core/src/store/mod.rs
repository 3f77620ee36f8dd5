//! Document store abstraction
//!
//! Collections of JSON documents keyed by a store-assigned or caller-chosen
//! id, queried by field equality and a single ordering field. Two backends:
//! [`MemoryStore`] for tests and ephemeral runs, [`SqliteStore`] for
//! persistence.

mod memory;
mod sqlite;

use std::{
    cmp::Ordering,
    sync::atomic::{AtomicI64, Ordering as AtomicOrdering},
};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::errors::Result;

/// Collection holding prompt records
pub const PROMPTS: &str = "prompts";
/// Handle -> `{ uid }` index
pub const USERNAMES: &str = "usernames";
/// Account id -> `{ username }` reverse index
pub const ACCOUNTS: &str = "accounts";
/// Normalized email -> account and password digest
pub const CREDENTIALS: &str = "credentials";

pub type Fields = Map<String, Value>;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self { id: id.into(), data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Document body with its id merged in as `"id"`
    pub fn to_value(&self) -> Value {
        let mut data = self.data.clone();
        data.insert("id".into(), Value::String(self.id.clone()));
        Value::Object(data)
    }
}

/// Body of a write plus the fields the store stamps itself
#[derive(Debug, Clone, Default)]
pub struct DocumentWrite {
    pub data: Fields,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new(data: Fields) -> Self {
        Self {
            data,
            server_timestamps: Vec::new(),
        }
    }

    /// Have the store set `field` to its own clock at write time
    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }

    /// Materialize server timestamps into the body
    pub fn resolve(mut self) -> Fields {
        if !self.server_timestamps.is_empty() {
            let stamp = Value::String(format_timestamp(server_timestamp()));
            for field in self.server_timestamps.drain(..) {
                self.data.insert(field, stamp.clone());
            }
        }
        self.data
    }
}

static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Store clock; strictly increasing within the process so that
/// `createdAt` ordering is total
pub fn server_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_STAMP_MICROS.load(AtomicOrdering::SeqCst);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_STAMP_MICROS.compare_exchange(
            last,
            next,
            AtomicOrdering::SeqCst,
            AtomicOrdering::SeqCst,
        ) {
            Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
            Err(actual) => last = actual,
        }
    }
}

/// Fixed-width RFC 3339, so lexical order matches chronological order
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, optional ordering and limit
///
/// Ordering on a field excludes documents that lack it, unless
/// [`Query::keep_unordered`] is set; those then sort last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub keep_unordered: bool,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    /// Keep documents missing the ordering field, after the ordered ones
    pub fn keep_unordered(mut self) -> Self {
        self.keep_unordered = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let filtered = self
            .filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected));
        let ordered = match &self.order_by {
            Some((field, _)) if !self.keep_unordered => ordered_value(doc, field).is_some(),
            _ => true,
        };
        filtered && ordered
    }

    /// Evaluate against a full collection scan
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some((field, direction)) = &self.order_by {
            out.sort_by(|a, b| match (ordered_value(a, field), ordered_value(b, field)) {
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (x, y) => {
                    let ord = compare_values(x, y);
                    match direction {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    }
                }
            });
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn ordered_value<'a>(doc: &'a Document, field: &str) -> Option<&'a Value> {
    doc.get(field).filter(|v| !v.is_null())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// The document-database collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert with a store-assigned id; returns the id
    async fn add(&self, collection: &str, write: DocumentWrite) -> Result<String>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create or overwrite the document at `id`
    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<()>;

    /// Atomically create `id` only if it does not exist; `false` when it did
    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<bool>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;
}

/// Store-assigned document id
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_query_filters_and_orders() {
        let docs = vec![
            doc("a", json!({"isPublic": true, "createdAt": "2025-01-01T00:00:00.000000Z"})),
            doc("b", json!({"isPublic": false, "createdAt": "2025-01-02T00:00:00.000000Z"})),
            doc("c", json!({"isPublic": true, "createdAt": "2025-01-03T00:00:00.000000Z"})),
        ];

        let query = Query::new()
            .where_eq("isPublic", true)
            .order_by("createdAt", Direction::Descending);
        let ids: Vec<String> = query.apply(docs).into_iter().map(|d| d.id).collect();

        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_order_by_excludes_missing_field() {
        let docs = vec![
            doc("a", json!({"n": 2})),
            doc("b", json!({})),
            doc("c", json!({"n": 1})),
        ];
        let out = Query::new().order_by("n", Direction::Ascending).apply(docs);
        let ids: Vec<&str> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_keep_unordered_sorts_missing_last() {
        let docs = vec![
            doc("a", json!({"n": 2})),
            doc("b", json!({})),
            doc("c", json!({"n": 1})),
            doc("d", json!({"n": null})),
        ];
        let out = Query::new()
            .order_by("n", Direction::Descending)
            .keep_unordered()
            .apply(docs);
        let ids: Vec<&str> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(&ids[..2], &["a", "c"]);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_limit() {
        let docs = vec![doc("a", json!({})), doc("b", json!({}))];
        assert_eq!(Query::new().limit(1).apply(docs).len(), 1);
    }

    #[test]
    fn test_server_timestamps_strictly_increase() {
        let a = server_timestamp();
        let b = server_timestamp();
        assert!(b > a);
        assert!(format_timestamp(b) > format_timestamp(a));
    }

    #[test]
    fn test_write_resolves_timestamps() {
        let write = DocumentWrite::new(Fields::new())
            .with_server_timestamp("createdAt")
            .with_server_timestamp("updatedAt");
        let data = write.resolve();
        assert_eq!(data["createdAt"], data["updatedAt"]);
        assert!(data["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_document_to_value_includes_id() {
        let d = doc("p1", json!({"title": "x"}));
        assert_eq!(d.to_value()["id"], json!("p1"));
    }
}
