//! Sign-up, sign-in and password-reset flows
//!
//! Provider error codes that belong to a form field come back as
//! [`PromptShareError::Validation`] keyed by that field, so callers can
//! render them next to the input. Everything else is passed through.
//!
//! The service is shared; each flow takes the caller's [`SessionState`]
//! and updates only that.

use std::{sync::Arc, time::Duration};

use serde_json::Value;

use super::{
    forms::{ForgotPasswordForm, SignInForm, SignUpForm},
    Account, AccountProvider, SessionState,
};
use crate::{
    errors::{AuthErrorCode, PromptShareError, Result},
    schema::ValidationErrors,
    usernames::UsernameIndex,
};

const USERNAME_TAKEN: &str = "This username is already taken.";

fn field_error(field: &str, message: &str) -> PromptShareError {
    ValidationErrors::single(field, message).into()
}

fn auth_code(err: &PromptShareError) -> Option<AuthErrorCode> {
    match err {
        PromptShareError::Auth { code, .. } => Some(*code),
        _ => None,
    }
}

pub struct AuthService {
    provider: Arc<dyn AccountProvider>,
    usernames: UsernameIndex,
    pacing: Duration,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AccountProvider>, usernames: UsernameIndex) -> Self {
        Self {
            provider,
            usernames,
            pacing: Duration::ZERO,
        }
    }

    /// Fixed delay before each form submission is processed
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }

    pub async fn username_available(&self, handle: &str) -> Result<bool> {
        self.usernames.is_available(handle).await
    }

    /// Register an account, claim its handle and sign it in to `session`
    ///
    /// If the handle is lost to a concurrent sign-up after the account was
    /// created, the account is deleted again and `session` is untouched.
    pub async fn sign_up(&self, session: &SessionState, input: &Value) -> Result<Account> {
        let form = SignUpForm::parse(input)?;
        self.pace().await;

        if !self.usernames.is_available(&form.username).await? {
            return Err(field_error("username", USERNAME_TAKEN));
        }

        let account = self
            .provider
            .create_account(&form.email, &form.password)
            .await
            .map_err(|err| match auth_code(&err) {
                Some(AuthErrorCode::EmailAlreadyInUse) => {
                    field_error("email", "This email is already registered.")
                }
                Some(AuthErrorCode::InvalidEmail) => field_error("email", "Invalid email format."),
                _ => err,
            })?;

        if let Err(err) = self.usernames.claim(&form.username, &account.uid).await {
            self.rollback(&account).await;
            return Err(match err {
                PromptShareError::UsernameTaken(_) => field_error("username", USERNAME_TAKEN),
                other => other,
            });
        }

        let account = self
            .provider
            .update_profile(&account.uid, Some(&form.username), None)
            .await?;
        tracing::info!(uid = %account.uid, "account created");
        session.set(Some(account.clone()));
        Ok(account)
    }

    async fn rollback(&self, account: &Account) {
        tracing::warn!(uid = %account.uid, "handle claim failed, deleting account");
        if let Err(err) = self.provider.delete_account(&account.uid).await {
            tracing::error!(uid = %account.uid, error = %err, "failed to roll back account");
        }
    }

    pub async fn sign_in(&self, session: &SessionState, input: &Value) -> Result<Account> {
        let form = SignInForm::parse(input)?;
        self.pace().await;

        let account = self
            .provider
            .sign_in(&form.email, &form.password)
            .await
            .map_err(|err| match auth_code(&err) {
                Some(AuthErrorCode::UserNotFound | AuthErrorCode::WrongPassword) => {
                    field_error("password", "Invalid email or password")
                }
                Some(AuthErrorCode::InvalidEmail) => field_error("email", "Invalid email"),
                _ => err,
            })?;
        session.set(Some(account.clone()));
        Ok(account)
    }

    pub fn sign_out(&self, session: &SessionState) {
        session.set(None);
    }

    pub async fn forgot_password(&self, input: &Value) -> Result<()> {
        let form = ForgotPasswordForm::parse(input)?;
        self.pace().await;

        self.provider
            .send_password_reset(&form.email)
            .await
            .map_err(|err| match auth_code(&err) {
                Some(AuthErrorCode::UserNotFound) => {
                    field_error("email", "No account found with this email.")
                }
                Some(AuthErrorCode::InvalidEmail) => field_error("email", "Invalid email address."),
                _ => err,
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{auth::LocalAccountProvider, store::MemoryStore};

    fn service() -> (Arc<LocalAccountProvider>, UsernameIndex, AuthService) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(LocalAccountProvider::new(store.clone()).with_iterations(1_000));
        let usernames = UsernameIndex::new(store);
        let service = AuthService::new(provider.clone(), usernames.clone());
        (provider, usernames, service)
    }

    fn sign_up_input(username: &str, email: &str) -> Value {
        json!({
            "name": "Ada",
            "username": username,
            "email": email,
            "password": "Secret123",
        })
    }

    fn field(err: PromptShareError, name: &str) -> Option<String> {
        match err {
            PromptShareError::Validation(errors) => errors.get(name).map(String::from),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_sign_up_claims_handle() {
        let (_, usernames, service) = service();
        let session = SessionState::new();

        let account = service
            .sign_up(&session, &sign_up_input("Ada_L", "ada@example.com"))
            .await
            .unwrap();

        assert_eq!(account.display_name.as_deref(), Some("Ada_L"));
        assert_eq!(usernames.resolve(&account.uid).await, "ada_l");
        assert!(!service.username_available("ada_l").await.unwrap());
        assert_eq!(session.require().unwrap().uid, account.uid);
    }

    #[tokio::test]
    async fn test_sign_up_taken_handle_and_email() {
        let (_, _, service) = service();
        let session = SessionState::new();
        service
            .sign_up(&session, &sign_up_input("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = service
            .sign_up(&session, &sign_up_input("ADA", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(field(err, "username").as_deref(), Some(USERNAME_TAKEN));

        let err = service
            .sign_up(&session, &sign_up_input("someone", "ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            field(err, "email").as_deref(),
            Some("This email is already registered.")
        );
    }

    #[tokio::test]
    async fn test_concurrent_sign_up_one_winner() {
        let (provider, _, service) = service();
        let (first_session, second_session) = (SessionState::new(), SessionState::new());

        let first = sign_up_input("racer", "a@example.com");
        let second = sign_up_input("racer", "b@example.com");
        let (a, b) = tokio::join!(
            service.sign_up(&first_session, &first),
            service.sign_up(&second_session, &second)
        );
        assert!(a.is_ok() ^ b.is_ok());

        // The loser keeps no account and no session behind
        let (loser, loser_session) = if a.is_ok() {
            ("b@example.com", &second_session)
        } else {
            ("a@example.com", &first_session)
        };
        assert!(!loser_session.is_signed_in());
        let err = provider.sign_in(loser, "Secret123").await.unwrap_err();
        assert!(matches!(
            err,
            PromptShareError::Auth {
                code: AuthErrorCode::UserNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sign_in_maps_provider_errors() {
        let (_, _, service) = service();
        let session = SessionState::new();
        service
            .sign_up(&session, &sign_up_input("ada", "ada@example.com"))
            .await
            .unwrap();
        service.sign_out(&session);
        assert!(matches!(session.require(), Err(PromptShareError::Unauthenticated)));

        let err = service
            .sign_in(&session, &json!({"email": "ada@example.com", "password": "wrong"}))
            .await
            .unwrap_err();
        assert_eq!(
            field(err, "password").as_deref(),
            Some("Invalid email or password")
        );
        assert!(!session.is_signed_in());

        let account = service
            .sign_in(&session, &json!({"email": "ada@example.com", "password": "Secret123"}))
            .await
            .unwrap();
        assert_eq!(session.require().unwrap(), account);
        assert_eq!(account.display_name.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (_, _, service) = service();
        let (ada, other) = (SessionState::new(), SessionState::new());

        service
            .sign_up(&ada, &sign_up_input("ada", "ada@example.com"))
            .await
            .unwrap();
        assert!(ada.is_signed_in());
        assert!(!other.is_signed_in());

        service.sign_out(&other);
        assert!(ada.is_signed_in());
    }

    #[tokio::test]
    async fn test_forgot_password() {
        let (provider, _, service) = service();
        service
            .sign_up(&SessionState::new(), &sign_up_input("ada", "ada@example.com"))
            .await
            .unwrap();

        service
            .forgot_password(&json!({"email": "ada@example.com"}))
            .await
            .unwrap();
        assert_eq!(provider.sent_resets().await.len(), 1);

        let err = service
            .forgot_password(&json!({"email": "nobody@example.com"}))
            .await
            .unwrap_err();
        assert_eq!(
            field(err, "email").as_deref(),
            Some("No account found with this email.")
        );
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_provider() {
        let (provider, _, service) = service();
        let session = SessionState::new();
        let err = service
            .sign_up(
                &session,
                &json!({"name": "Ada", "username": "a", "email": "x", "password": "y"}),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(provider.sent_resets().await.is_empty());
        assert!(!session.is_signed_in());
    }
}
