//! Error types for promptshare
//!
//! Every fallible operation in the crate returns [`Result`]. The access
//! layer in [`crate::prompts`] never lets these escape to callers; it folds
//! them into an [`crate::prompts::ActionResult`] with a user-facing message.

use thiserror::Error;

use crate::schema::ValidationErrors;

/// Result type alias for promptshare operations
pub type Result<T> = std::result::Result<T, PromptShareError>;

/// Main error type for promptshare
#[derive(Debug, Error)]
pub enum PromptShareError {
    /// Input failed schema constraints
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Document store failure (network, permission, unavailability)
    #[error("Store error: {0}")]
    Store(String),

    /// SQLite backend error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Handle already claimed in the username index
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Account provider rejected the request
    #[error("Auth error ({code}): {message}")]
    Auth { code: AuthErrorCode, message: String },

    /// Operation requires a signed-in session
    #[error("Not signed in")]
    Unauthenticated,

    /// Command not found in registry
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Invalid command arguments
    #[error("Invalid arguments for command '{command}': {reason}")]
    InvalidArgs { command: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store call exceeded the configured timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Generic error (catch-all)
    #[error("{0}")]
    Other(String),
}

/// Account provider failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    WeakPassword,
    TooManyRequests,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValidationErrors> for PromptShareError {
    fn from(errors: ValidationErrors) -> Self {
        PromptShareError::Validation(errors)
    }
}

impl From<anyhow::Error> for PromptShareError {
    fn from(err: anyhow::Error) -> Self {
        PromptShareError::Other(err.to_string())
    }
}

impl From<String> for PromptShareError {
    fn from(err: String) -> Self {
        PromptShareError::Other(err)
    }
}

impl From<&str> for PromptShareError {
    fn from(err: &str) -> Self {
        PromptShareError::Other(err.to_string())
    }
}

impl PromptShareError {
    pub fn auth(code: AuthErrorCode, message: impl Into<String>) -> Self {
        PromptShareError::Auth {
            code,
            message: message.into(),
        }
    }

    /// True for input-shaped failures, false for everything the store or
    /// runtime produced
    pub fn is_validation(&self) -> bool {
        matches!(self, PromptShareError::Validation(_))
    }

    /// Store-side failures, including the SQLite backend and timeouts
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            PromptShareError::Store(_)
                | PromptShareError::Database(_)
                | PromptShareError::Timeout(_)
        )
    }

    /// Get user-friendly error message for display
    pub fn user_message(&self) -> String {
        match self {
            PromptShareError::Validation(_) => {
                "Please check your input data and try again.".to_string()
            }
            PromptShareError::UsernameTaken(_) => "This username is already taken.".to_string(),
            PromptShareError::Auth { code, .. } => match code {
                AuthErrorCode::EmailAlreadyInUse => "This email is already registered.".to_string(),
                AuthErrorCode::InvalidEmail => "Invalid email format.".to_string(),
                AuthErrorCode::UserNotFound | AuthErrorCode::WrongPassword => {
                    "Invalid email or password".to_string()
                }
                AuthErrorCode::WeakPassword => "Password is too weak.".to_string(),
                AuthErrorCode::TooManyRequests => {
                    "Too many attempts. Try again later.".to_string()
                }
            },
            PromptShareError::Unauthenticated => "Please sign in to continue.".to_string(),
            PromptShareError::CommandNotFound(cmd) => format!(
                "Command '{}' not found. Call 'commands' for available commands.",
                cmd
            ),
            PromptShareError::InvalidArgs { command, reason } => {
                format!("Invalid arguments for '{}': {}", command, reason)
            }
            PromptShareError::Store(_)
            | PromptShareError::Database(_)
            | PromptShareError::Timeout(_) => "Something went wrong. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            PromptShareError::Validation(_) => "validation",
            PromptShareError::Store(_) => "store",
            PromptShareError::Database(_) => "database",
            PromptShareError::Serde(_) => "serialization",
            PromptShareError::Io(_) => "io",
            PromptShareError::UsernameTaken(_) => "username",
            PromptShareError::Auth { .. } => "auth",
            PromptShareError::Unauthenticated => "session",
            PromptShareError::CommandNotFound(_) => "command",
            PromptShareError::InvalidArgs { .. } => "arguments",
            PromptShareError::Config(_) => "config",
            PromptShareError::Timeout(_) => "timeout",
            PromptShareError::Other(_) => "other",
        }
    }

    /// JSON-RPC 2.0 error code for this error
    pub fn to_jsonrpc_code(&self) -> i32 {
        match self {
            PromptShareError::CommandNotFound(_) => -32601,
            PromptShareError::InvalidArgs { .. } | PromptShareError::Validation(_) => -32602,
            PromptShareError::Serde(_) => -32700,
            PromptShareError::Unauthenticated => -32001,
            PromptShareError::Auth { .. } | PromptShareError::UsernameTaken(_) => -32002,
            _ => -32603,
        }
    }
}
