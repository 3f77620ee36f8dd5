use serde_json::{json, Value};

use crate::{store::Document, usernames::UsernameIndex};

/// Join a stored prompt with its owner's handle
///
/// Copies every stored field, adds `id`, nests `author.username`. Does not
/// validate; the caller checks the projection.
pub async fn to_display(doc: &Document, usernames: &UsernameIndex) -> Value {
    let owner = doc.get_str("userId").unwrap_or_default();
    let username = usernames.resolve(owner).await;

    let mut value = doc.to_value();
    if let Value::Object(map) = &mut value {
        map.insert("author".into(), json!({ "username": username }));
    }
    value
}
