//! Prompt record shapes and their validators
//!
//! One base definition, three derived shapes:
//! - [`Prompt`]: the stored record, with store-assigned id and timestamps
//! - [`NewPrompt`]: creation input, no server-assigned fields
//! - [`PromptWithAuthor`]: display projection with the resolved handle
//!
//! [`PromptForm`] is the looser shape the create form submits; the owner id
//! is injected from the session before it becomes a [`NewPrompt`].

mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use validation::{ObjectValidator, ValidationErrors};

pub const TITLE_REQUIRED: &str = "Prompt Title is required.";
pub const USER_ID_REQUIRED: &str = "Prompt UserId is required.";
pub const CONTENT_REQUIRED: &str = "Prompt Content is required.";

const TITLE_MIN: usize = 2;
const USER_ID_MIN: usize = 2;
const CONTENT_MIN: usize = 1;

/// Stored prompt record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
    pub user_id: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Creation input: everything the owner supplies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// What the create form submits; owner comes from the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptForm {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
}

/// Display projection: a prompt plus its author's handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptWithAuthor {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub author: Author,
}

fn base_fields(
    v: &mut ObjectValidator<'_>,
) -> (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
) {
    let title = v.string("title", TITLE_MIN, TITLE_REQUIRED);
    let description = v.optional_string("description");
    let content = v.string("content", CONTENT_MIN, CONTENT_REQUIRED);
    let user_id = v.string("userId", USER_ID_MIN, USER_ID_REQUIRED);
    (title, description, content, user_id)
}

impl Prompt {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);
        let id = v.string("id", 1, "Prompt id is required.");
        let (title, description, content, user_id) = base_fields(&mut v);
        let is_public = v.optional_bool("isPublic");
        let created_at = v.optional_timestamp("createdAt");
        let updated_at = v.optional_timestamp("updatedAt");

        v.finish(|| {
            Some(Prompt {
                id: id?,
                title: title?,
                description,
                content: content?,
                user_id: user_id?,
                is_public: is_public.unwrap_or(false),
                created_at,
                updated_at,
            })
        })
    }
}

impl NewPrompt {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);
        let (title, description, content, user_id) = base_fields(&mut v);
        let is_public = v.optional_bool("isPublic");

        v.finish(|| {
            Some(NewPrompt {
                title: title?,
                description,
                content: content?,
                user_id: user_id?,
                is_public,
            })
        })
    }

    /// Visibility with the private default applied
    pub fn visibility(&self) -> bool {
        self.is_public.unwrap_or(false)
    }

    /// Document body written to the store, timestamps excluded
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("title".into(), Value::String(self.title.clone()));
        if let Some(description) = &self.description {
            doc.insert("description".into(), Value::String(description.clone()));
        }
        doc.insert("content".into(), Value::String(self.content.clone()));
        doc.insert("userId".into(), Value::String(self.user_id.clone()));
        doc.insert("isPublic".into(), Value::Bool(self.visibility()));
        doc
    }
}

impl PromptForm {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);
        let title = v.string("title", TITLE_MIN, TITLE_REQUIRED);
        let description = v.optional_string("description");
        let content = v.string("content", CONTENT_MIN, CONTENT_REQUIRED);
        let user_id = v.optional_string("userId");
        let is_public = v.optional_bool("isPublic");

        v.finish(|| {
            Some(PromptForm {
                title: title?,
                description,
                content: content?,
                user_id,
                is_public,
            })
        })
    }
}

impl PromptWithAuthor {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let prompt = Prompt::parse(value);
        let mut v = ObjectValidator::new(value);
        let author = v.nested("author", |author| {
            let mut a = ObjectValidator::new(author);
            let username = a.string("username", 1, "Author username is required.");
            a.finish(|| Some(Author { username: username? }))
        });

        let mut errors = match &prompt {
            Ok(_) => ValidationErrors::new(),
            Err(errors) => errors.clone(),
        };
        if let Err(author_errors) = v.finish(|| Some(())) {
            for (field, message) in author_errors.iter() {
                errors.add(field, message);
            }
        }
        errors.into_result()?;

        match (prompt, author) {
            (Ok(prompt), Some(author)) => Ok(PromptWithAuthor { prompt, author }),
            _ => Err(ValidationErrors::single("_root", "Invalid object.")),
        }
    }

    pub fn id(&self) -> &str {
        &self.prompt.id
    }
}

/// Validate a whole batch; any failing element fails the batch
///
/// Errors are keyed `"<index>.<field>"`.
pub fn parse_display_list(values: &[Value]) -> Result<Vec<PromptWithAuthor>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut parsed = Vec::with_capacity(values.len());

    for (index, value) in values.iter().enumerate() {
        match PromptWithAuthor::parse(value) {
            Ok(p) => parsed.push(p),
            Err(e) => errors.extend_prefixed(&index.to_string(), e),
        }
    }

    errors.into_result()?;
    Ok(parsed)
}
