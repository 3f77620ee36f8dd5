//! Accounts, session and the auth form flows
//!
//! The account provider is a collaborator behind [`AccountProvider`] that
//! owns credentials. Who is signed in is per client: each connection holds
//! its own [`SessionState`], which [`AuthService`] updates. Handles live in
//! the username index and are claimed by [`AuthService::sign_up`].

pub mod forms;
pub mod local;
pub mod service;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use forms::{ForgotPasswordForm, SignInForm, SignUpForm};
pub use local::LocalAccountProvider;
pub use service::AuthService;
pub use session::{SessionState, SessionSubscription};

use crate::errors::Result;

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Credential store
///
/// Failures surface as [`crate::errors::PromptShareError::Auth`] with an
/// [`crate::errors::AuthErrorCode`].
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Register a new account
    async fn create_account(&self, email: &str, password: &str) -> Result<Account>;

    /// Check credentials and return the matching account
    async fn sign_in(&self, email: &str, password: &str) -> Result<Account>;

    /// Replace the given profile fields; `None` leaves a field unchanged
    async fn update_profile(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Account>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    async fn delete_account(&self, uid: &str) -> Result<()>;
}
