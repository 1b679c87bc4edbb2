//! Form checks a caller runs before handing input to the store.
//!
//! The store itself accepts anything; these mirror the rules the web forms
//! enforce so every front end rejects the same input.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::NoterError;
use crate::repository::EntryDraft;

pub const TITLE_MAX_CHARS: usize = 100;
pub const NAME_MAX_CHARS: usize = 255;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PERMITTED_TTL_DAYS: [u32; 3] = [1, 7, 365];

static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid email regex")
});

/// Per-field messages (first one wins) plus messages not tied to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub fields: BTreeMap<&'static str, String>,
    pub non_field: Vec<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn add_field_error(&mut self, key: &'static str, message: impl Into<String>) {
        self.fields.entry(key).or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn check(&mut self, ok: bool, key: &'static str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), NoterError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(NoterError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(key, msg)| format!("{key}: {msg}"))
            .collect();
        parts.extend(self.non_field.iter().cloned());
        f.write_str(&parts.join("; "))
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RX.is_match(value)
}

impl EntryDraft {
    pub fn validate(&self) -> Result<(), NoterError> {
        let mut errors = FieldErrors::default();
        errors.check(not_blank(&self.title), "title", "This field cannot be blank");
        errors.check(
            max_chars(&self.title, TITLE_MAX_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        errors.check(not_blank(&self.body), "body", "This field cannot be blank");
        errors.check(
            permitted_value(&self.ttl_days, &PERMITTED_TTL_DAYS),
            "ttl_days",
            "This field must equal 1, 7 or 365",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), NoterError> {
        let mut errors = FieldErrors::default();
        errors.check(not_blank(&self.name), "name", "This field cannot be blank");
        errors.check(
            max_chars(&self.name, NAME_MAX_CHARS),
            "name",
            "This field cannot be more than 255 characters long",
        );
        errors.check(not_blank(&self.email), "email", "This field cannot be blank");
        errors.check(is_email(&self.email), "email", "This field must be a valid email address");
        errors.check(not_blank(&self.password), "password", "This field cannot be blank");
        errors.check(
            min_chars(&self.password, PASSWORD_MIN_CHARS),
            "password",
            "This field must be at least 8 characters long",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), NoterError> {
        let mut errors = FieldErrors::default();
        errors.check(not_blank(&self.email), "email", "This field cannot be blank");
        errors.check(is_email(&self.email), "email", "This field must be a valid email address");
        errors.check(not_blank(&self.password), "password", "This field cannot be blank");
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirmation: String,
}

impl PasswordChangeForm {
    pub fn validate(&self) -> Result<(), NoterError> {
        let mut errors = FieldErrors::default();
        errors.check(
            not_blank(&self.current_password),
            "current_password",
            "This field cannot be blank",
        );
        errors.check(not_blank(&self.new_password), "new_password", "This field cannot be blank");
        errors.check(
            min_chars(&self.new_password, PASSWORD_MIN_CHARS),
            "new_password",
            "This field must be at least 8 characters long",
        );
        errors.check(
            self.confirmation == self.new_password,
            "confirmation",
            "Passwords do not match",
        );
        errors.into_result()
    }
}
