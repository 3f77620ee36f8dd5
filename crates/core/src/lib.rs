//! promptshare: a library of shareable AI prompts
//!
//! Users sign up with a unique handle, write prompts, and keep each prompt
//! private or publish it to a public feed where it is shown with its
//! author's handle.
//!
//! ## Architecture
//!
//! - **schema**: prompt shapes and field-level validation
//! - **store**: document store trait with in-memory and SQLite backends
//! - **usernames**: handle claims and account-to-handle resolution
//! - **prompts**: access layer returning uniform `{ success, data, error }`
//! - **auth**: account provider, session and form flows
//! - **feed**: search, filters, pagination, stats and stars over a fetch
//! - **commands / rpc / server**: JSON-RPC over an authenticated WebSocket

pub mod app;
pub mod auth;
pub mod commands;
pub mod config;
pub mod errors;
pub mod feed;
pub mod logging;
pub mod prompts;
pub mod rpc;
pub mod runtime;
pub mod schema;
pub mod server;
pub mod store;
pub mod usernames;
pub mod util;

#[cfg(test)]
mod test_support;

pub use app::{App, Session};
pub use errors::{PromptShareError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modules_exist() {
        let _error: errors::PromptShareError = "test".into();
    }
}
