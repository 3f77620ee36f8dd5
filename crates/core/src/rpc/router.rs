//! JSON-RPC message routing
//!
//! Every method name is a command in [`crate::commands`]. Command errors
//! become JSON-RPC error objects; validation failures carry their field
//! errors in `data.fieldErrors`.

use serde_json::{json, Value};

use super::{ErrorObject, Notification, Request, Response};
use crate::{
    app::{App, Session},
    commands,
    errors::{PromptShareError, Result},
};

/// Parse and route incoming text message
///
/// Returns:
/// - Some(json_response) for requests (must send response)
/// - None for notifications (no response needed)
pub async fn handle_text(app: &App, session: &Session, text: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("jsonrpc").is_none() {
        return Err(PromptShareError::Other(
            "Unknown message format - missing jsonrpc field".into(),
        ));
    }

    if value.get("id").is_some() {
        let request: Request = serde_json::from_value(value)?;
        let response = handle_request(app, session, request).await;
        Ok(Some(serde_json::to_string(&response)?))
    } else {
        let notification: Notification = serde_json::from_value(value)?;
        handle_notification(app, session, notification).await?;
        Ok(None)
    }
}

/// Route a JSON-RPC request to the command registry
pub async fn handle_request(app: &App, session: &Session, req: Request) -> Response {
    match commands::dispatch(app, session, &req.method, req.params).await {
        Ok(value) => Response::success(req.id, value),
        Err(err) => {
            tracing::debug!(method = %req.method, error = %err, "request failed");
            Response::failure(req.id, error_object(&err))
        }
    }
}

/// Handle a JSON-RPC notification; no response is produced
pub async fn handle_notification(
    app: &App,
    session: &Session,
    notif: Notification,
) -> Result<()> {
    commands::dispatch(app, session, &notif.method, notif.params).await?;
    Ok(())
}

pub fn error_object(err: &PromptShareError) -> ErrorObject {
    let mut data = json!({ "category": err.category() });
    if let PromptShareError::Validation(errors) = err {
        data["fieldErrors"] = json!(errors);
    }

    ErrorObject {
        code: err.to_jsonrpc_code(),
        message: err.user_message(),
        data: Some(data),
    }
}

/// Error response for a message that could not be read as a request
pub fn parse_error_response(err: &PromptShareError) -> String {
    json!({
        "jsonrpc": super::VERSION,
        "id": null,
        "error": {
            "code": -32700,
            "message": err.to_string(),
        },
    })
    .to_string()
}
