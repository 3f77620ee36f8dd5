//! Command registry and dispatch system
//!
//! This module provides a static registry of commands callable over the
//! WebSocket server. Commands are registered as "category.action" (e.g.,
//! "auth.sign_in", "prompts.create") and dispatched to handler functions.
//!
//! ## Adding a new command
//!
//! 1. Create handler: `pub fn my_command<'a>(app: &'a App, session: &'a Session, args: Value) -> BoxFuture<'a, Result<Value>>`
//! 2. Register in `REGISTRY`: `("category.action", my_command as CommandHandler)`
//! 3. Add tests for the command

pub mod auth;
pub mod prompts;

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    app::{App, Session},
    errors::{PromptShareError, Result},
};

/// Type alias for command handler functions
///
/// Handlers borrow the shared application context and the calling
/// client's session, and take the JSON arguments
pub type CommandHandler = for<'a> fn(&'a App, &'a Session, Value) -> BoxFuture<'a, Result<Value>>;

/// Static command registry
///
/// Maps command names to handler functions. Initialized lazily on first access.
static REGISTRY: Lazy<HashMap<&'static str, CommandHandler>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert("ping", ping as CommandHandler);
    map.insert("commands", commands as CommandHandler);

    map.insert("auth.sign_up", auth::sign_up as CommandHandler);
    map.insert("auth.sign_in", auth::sign_in as CommandHandler);
    map.insert("auth.sign_out", auth::sign_out as CommandHandler);
    map.insert("auth.session", auth::session as CommandHandler);
    map.insert("auth.forgot_password", auth::forgot_password as CommandHandler);
    map.insert("auth.username_available", auth::username_available as CommandHandler);

    map.insert("prompts.create", prompts::create as CommandHandler);
    map.insert("prompts.list", prompts::list as CommandHandler);
    map.insert("prompts.mine", prompts::mine as CommandHandler);
    map.insert("prompts.search", prompts::search as CommandHandler);
    map.insert("prompts.stats", prompts::stats as CommandHandler);
    map.insert("prompts.star", prompts::star as CommandHandler);
    map.insert("prompts.share_link", prompts::share_link as CommandHandler);

    map
});

/// Dispatch a command by name on behalf of `session`
///
/// # Returns
/// Command result as JSON Value, or error if command not found
pub async fn dispatch(app: &App, session: &Session, command: &str, args: Value) -> Result<Value> {
    match REGISTRY.get(command) {
        Some(handler) => {
            tracing::debug!(command, "dispatching command");
            handler(app, session, args).await
        }
        None => Err(PromptShareError::CommandNotFound(command.to_string())),
    }
}

/// List all available commands, sorted
pub fn list_commands() -> Vec<String> {
    let mut commands: Vec<String> = REGISTRY.keys().map(|&k| k.to_string()).collect();
    commands.sort();
    commands
}

/// Deserialize command arguments; `null` means all defaults
pub(crate) fn parse_args<T: DeserializeOwned + Default>(command: &str, args: Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| PromptShareError::InvalidArgs {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

/// Ping command - echoes the arguments with an added "pong" field
///
/// # Example
/// ```json
/// // Input:  {"message": "hello"}
/// // Output: {"message": "hello", "pong": true}
/// ```
fn ping<'a>(_app: &'a App, _session: &'a Session, args: Value) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move {
        let mut result = match args {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        result.insert("pong".to_string(), Value::Bool(true));
        Ok(Value::Object(result))
    })
}

fn commands<'a>(
    _app: &'a App,
    _session: &'a Session,
    _args: Value,
) -> BoxFuture<'a, Result<Value>> {
    Box::pin(async move { Ok(serde_json::json!({ "commands": list_commands() })) })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_dispatch_ping() {
        let app = App::in_memory();
        let value = dispatch(&app, &Session::new(), "ping", json!({"message": "hello"}))
            .await
            .unwrap();

        assert_eq!(value["pong"], json!(true));
        assert_eq!(value["message"], json!("hello"));
    }

    #[tokio::test]
    async fn test_dispatch_ping_with_non_object() {
        let app = App::in_memory();
        let value = dispatch(&app, &Session::new(), "ping", json!(42)).await.unwrap();
        assert_eq!(value, json!({"pong": true}));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let app = App::in_memory();
        match dispatch(&app, &Session::new(), "unknown.command", json!({})).await {
            Err(PromptShareError::CommandNotFound(cmd)) => assert_eq!(cmd, "unknown.command"),
            other => panic!("Expected CommandNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_list_commands_is_sorted_and_complete() {
        let commands = list_commands();
        let mut sorted = commands.clone();
        sorted.sort();
        assert_eq!(commands, sorted);

        for name in ["ping", "auth.sign_up", "prompts.create", "prompts.mine"] {
            assert!(commands.contains(&name.to_string()), "missing {name}");
        }
    }

    #[test]
    fn test_parse_args_errors_name_the_command() {
        #[derive(Debug, Default, serde::Deserialize)]
        struct Args {
            #[allow(dead_code)]
            id: String,
        }

        assert!(parse_args::<Args>("x", Value::Null).is_ok());
        match parse_args::<Args>("prompts.star", json!({"id": 5})) {
            Err(PromptShareError::InvalidArgs { command, .. }) => {
                assert_eq!(command, "prompts.star")
            }
            other => panic!("Expected InvalidArgs, got {other:?}"),
        }
    }
}
