//! Sign-up, sign-in and forgot-password form validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::{ObjectValidator, ValidationErrors};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("username pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// At least one lowercase, one uppercase and one digit
fn is_mixed_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn email_field(v: &mut ObjectValidator<'_>, required: &str, invalid: &str) -> Option<String> {
    let email = v.string("email", 1, required)?;
    if is_valid_email(&email) {
        Some(email.trim().to_string())
    } else {
        v.fail("email", invalid);
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignUpForm {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);

        let name = v.string("name", 1, "Name is required");

        let username = v
            .string("username", 1, "Username is required")
            .and_then(|username| {
                let len = username.chars().count();
                if len < USERNAME_MIN {
                    v.fail("username", "Username must be at least 3 characters.");
                    None
                } else if len > USERNAME_MAX {
                    v.fail("username", "Username must not exceed 20 characters.");
                    None
                } else if !USERNAME.is_match(&username) {
                    v.fail(
                        "username",
                        "Only letters, numbers, underscores, and hyphens allowed.",
                    );
                    None
                } else {
                    Some(username)
                }
            });

        let email = email_field(&mut v, "Email is required", "Please enter a valid email address.");

        let password = v
            .string("password", 1, "Password is required")
            .and_then(|password| {
                if password.chars().count() < PASSWORD_MIN {
                    v.fail("password", "Password must be at least 8 characters.");
                    None
                } else if !is_mixed_password(&password) {
                    v.fail(
                        "password",
                        "Password must contain uppercase, lowercase letter, and number.",
                    );
                    None
                } else {
                    Some(password)
                }
            });

        v.finish(|| {
            Some(SignUpForm {
                name: name?,
                username: username?,
                email: email?,
                password: password?,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);
        let email = email_field(&mut v, "Email is required.", "Please enter a valid email.");
        let password = v.string("password", 1, "Password is required.");
        v.finish(|| {
            Some(SignInForm {
                email: email?,
                password: password?,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut v = ObjectValidator::new(value);
        let email = email_field(&mut v, "Email is required", "Please enter a valid email address.");
        v.finish(|| Some(ForgotPasswordForm { email: email? }))
    }
}
