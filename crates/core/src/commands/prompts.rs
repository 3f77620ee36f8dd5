//! `prompts.*` commands
//!
//! Access-layer calls return their `{ success, data, error }` result as
//! the command value, so a failed fetch is still an `Ok` response here.
//! Only missing sessions and malformed arguments are command errors.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_args;
use crate::{
    app::{App, Session},
    errors::Result,
    feed::{self, paginate, FeedFilter, PromptStats, VisibilityFilter},
    prompts::FeedScope,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageArgs {
    page: usize,
    page_size: Option<usize>,
}

impl PageArgs {
    fn size(&self, app: &App) -> usize {
        self.page_size.unwrap_or(app.config.page_size)
    }
}

/// Create a prompt owned by the signed-in account
pub fn create<'a>(
    app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let owner = session.require_account()?;
        app.pace().await;
        let result = app.prompts.create(&args, &owner.uid).await;
        Ok(serde_json::to_value(result)?)
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ListArgs {
    scope: Option<FeedScope>,
    #[serde(flatten)]
    paging: PageArgs,
}

/// Public feed by default; `scope: "all"` needs a session
pub fn list<'a>(
    app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: ListArgs = parse_args("prompts.list", args)?;
        let scope = args.scope.unwrap_or(FeedScope::Public);
        if scope == FeedScope::All {
            session.require_account()?;
        }

        let size = args.paging.size(app);
        let result = app
            .prompts
            .fetch_feed(scope)
            .await
            .map(|items| paginate(&items, args.paging.page, size));
        Ok(serde_json::to_value(result)?)
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MineArgs {
    title: Option<String>,
    visibility: VisibilityFilter,
    #[serde(flatten)]
    paging: PageArgs,
}

/// The signed-in account's prompts, filtered and paged
pub fn mine<'a>(
    app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: MineArgs = parse_args("prompts.mine", args)?;
        let owner = session.require_account()?;

        let filter = FeedFilter {
            title: args.title,
            visibility: args.visibility,
        };
        let size = args.paging.size(app);
        let result = app.prompts.fetch_by_owner(&owner.uid).await.map(|items| {
            let filtered: Vec<_> = filter.apply(&items).into_iter().cloned().collect();
            paginate(&filtered, args.paging.page, size)
        });
        Ok(serde_json::to_value(result)?)
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchArgs {
    term: String,
    #[serde(flatten)]
    paging: PageArgs,
}

/// Search the public feed
pub fn search<'a>(
    app: &'a App,
    _session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: SearchArgs = parse_args("prompts.search", args)?;
        let size = args.paging.size(app);
        let result = app.prompts.fetch_all().await.map(|items| {
            let hits: Vec<_> = feed::search(&items, &args.term).into_iter().cloned().collect();
            paginate(&hits, args.paging.page, size)
        });
        Ok(serde_json::to_value(result)?)
    })
}

pub fn stats<'a>(
    app: &'a App,
    session: &'a Session,
    _args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let owner = session.require_account()?;
        let fetched = app.prompts.fetch_by_owner(&owner.uid).await;
        let stars = session.stars.lock().await;
        let result = fetched.map(|items| PromptStats::from_prompts(&items, &stars));
        Ok(serde_json::to_value(result)?)
    })
}

#[derive(Debug, Default, Deserialize)]
struct IdArgs {
    id: String,
}

/// Toggle a star for this session
pub fn star<'a>(
    _app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: IdArgs = parse_args("prompts.star", args)?;
        let starred = session.stars.lock().await.toggle(&args.id);
        Ok(json!({ "id": args.id, "starred": starred }))
    })
}

pub fn share_link<'a>(
    app: &'a App,
    _session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: IdArgs = parse_args("prompts.share_link", args)?;
        let link = feed::share_link(&app.config.share_base_url, &args.id);
        Ok(json!({ "id": args.id, "link": link }))
    })
}
