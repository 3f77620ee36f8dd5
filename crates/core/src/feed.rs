//! View-side helpers over an already fetched prompt list
//!
//! Search, visibility filtering, pagination and stats all run on the
//! in-memory result of a fetch; nothing here touches the store. Stars are
//! session-scoped and never persisted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::schema::PromptWithAuthor;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Case-insensitive match on title, description or content
///
/// A blank term matches everything.
pub fn matches_search(prompt: &PromptWithAuthor, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    let p = &prompt.prompt;
    p.title.to_lowercase().contains(&term)
        || p.description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
        || p.content.to_lowercase().contains(&term)
}

pub fn search<'a>(prompts: &'a [PromptWithAuthor], term: &str) -> Vec<&'a PromptWithAuthor> {
    prompts.iter().filter(|p| matches_search(p, term)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityFilter {
    #[default]
    All,
    Public,
    Private,
}

impl VisibilityFilter {
    pub fn allows(&self, is_public: bool) -> bool {
        match self {
            VisibilityFilter::All => true,
            VisibilityFilter::Public => is_public,
            VisibilityFilter::Private => !is_public,
        }
    }
}

/// Filters for the owner's prompt table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFilter {
    /// Substring of the title, case-insensitive
    pub title: Option<String>,
    pub visibility: VisibilityFilter,
}

impl FeedFilter {
    pub fn apply<'a>(&self, prompts: &'a [PromptWithAuthor]) -> Vec<&'a PromptWithAuthor> {
        let title = self
            .title
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        prompts
            .iter()
            .filter(|p| self.visibility.allows(p.prompt.is_public))
            .filter(|p| match &title {
                Some(t) => p.prompt.title.to_lowercase().contains(t),
                None => true,
            })
            .collect()
    }
}

/// One page of a list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Slice `items` into page `page_index` (zero-based)
///
/// Out-of-range indexes clamp to the last page. An empty list has one empty
/// page.
pub fn paginate<T: Clone>(items: &[T], page_index: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let page_count = total.div_ceil(page_size).max(1);
    let page_index = page_index.min(page_count - 1);

    let start = page_index * page_size;
    let end = (start + page_size).min(total);
    let items = if start < total {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page_index,
        page_size,
        page_count,
        total,
        has_previous: page_index > 0,
        has_next: page_index + 1 < page_count,
    }
}

/// Session-local starred prompt ids
#[derive(Debug, Clone, Default)]
pub struct StarSet {
    starred: HashSet<String>,
}

impl StarSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the star on `prompt_id`; returns the new state
    pub fn toggle(&mut self, prompt_id: &str) -> bool {
        if self.starred.remove(prompt_id) {
            false
        } else {
            self.starred.insert(prompt_id.to_string());
            true
        }
    }

    pub fn is_starred(&self, prompt_id: &str) -> bool {
        self.starred.contains(prompt_id)
    }

    pub fn clear(&mut self) {
        self.starred.clear();
    }

    pub fn len(&self) -> usize {
        self.starred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starred.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptStats {
    pub total_prompts: usize,
    pub public_prompts: usize,
    pub private_prompts: usize,
    pub starred_prompts: usize,
}

impl PromptStats {
    pub fn from_prompts(prompts: &[PromptWithAuthor], stars: &StarSet) -> Self {
        let public = prompts.iter().filter(|p| p.prompt.is_public).count();
        let starred = prompts.iter().filter(|p| stars.is_starred(p.id())).count();
        Self {
            total_prompts: prompts.len(),
            public_prompts: public,
            private_prompts: prompts.len() - public,
            starred_prompts: starred,
        }
    }
}

/// Link text copied by the share action
pub fn share_link(base_url: &str, prompt_id: &str) -> String {
    format!("{}/prompts/{}", base_url.trim_end_matches('/'), prompt_id)
}
