//! `auth.*` commands
//!
//! Sign-in state changes apply to the calling client's session only.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_args;
use crate::{
    app::{App, Session},
    errors::Result,
    usernames::normalize,
};

pub fn sign_up<'a>(
    app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let account = app.auth.sign_up(&session.account, &args).await?;
        Ok(json!({ "account": account }))
    })
}

pub fn sign_in<'a>(
    app: &'a App,
    session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let account = app.auth.sign_in(&session.account, &args).await?;
        Ok(json!({ "account": account }))
    })
}

/// Signing out also forgets the session's stars
pub fn sign_out<'a>(
    app: &'a App,
    session: &'a Session,
    _args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        app.auth.sign_out(&session.account);
        session.stars.lock().await.clear();
        Ok(json!({ "signedOut": true }))
    })
}

pub fn session<'a>(
    _app: &'a App,
    session: &'a Session,
    _args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let account = session.account.current();
        Ok(json!({
            "signedIn": account.is_some(),
            "account": account,
        }))
    })
}

pub fn forgot_password<'a>(
    app: &'a App,
    _session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        app.auth.forgot_password(&args).await?;
        Ok(json!({ "sent": true }))
    })
}

#[derive(Debug, Default, Deserialize)]
struct UsernameArgs {
    username: String,
}

pub fn username_available<'a>(
    app: &'a App,
    _session: &'a Session,
    args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let args: UsernameArgs = parse_args("auth.username_available", args)?;
        let available = app.auth.username_available(&args.username).await?;
        Ok(json!({
            "username": normalize(&args.username),
            "available": available,
        }))
    })
}
