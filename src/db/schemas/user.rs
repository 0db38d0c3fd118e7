//! User document schema
//!
//! Stores login credentials. Users own members.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Validation message for a duplicate e-mail
pub const EMAIL_TAKEN: &str = "Email has already been taken";

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 128;

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login e-mail, normalized to lower case
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(email: &str, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email: normalize_email(email),
            password_hash,
        }
    }
}

/// Trim and lower-case an e-mail for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check sign-up fields, returning one full message per failed rule
pub fn validate_credentials(email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let email = email.trim();

    if email.is_empty() {
        errors.push("Email can't be blank".to_string());
    } else if !looks_like_email(email) {
        errors.push("Email is invalid".to_string());
    }

    let length = password.chars().count();
    if password.is_empty() {
        errors.push("Password can't be blank".to_string());
    } else if length < PASSWORD_MIN {
        errors.push(format!(
            "Password is too short (minimum is {} characters)",
            PASSWORD_MIN
        ));
    } else if length > PASSWORD_MAX {
        errors.push(format!(
            "Password is too long (maximum is {} characters)",
            PASSWORD_MAX
        ));
    }

    errors
}

/// `local@domain` with no whitespace and exactly one `@`
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_email() {
        let user = UserDoc::new("  Ada@Example.COM ", "hash".into());
        assert_eq!(user.email, "ada@example.com");
        assert!(user.metadata.created_at.is_some());
    }

    #[test]
    fn test_valid_credentials() {
        assert!(validate_credentials("ada@example.com", "secret1").is_empty());
    }

    #[test]
    fn test_blank_fields() {
        assert_eq!(
            validate_credentials("", ""),
            vec!["Email can't be blank", "Password can't be blank"]
        );
    }

    #[test]
    fn test_invalid_email_and_short_password() {
        assert_eq!(
            validate_credentials("not-an-email", "abc"),
            vec![
                "Email is invalid",
                "Password is too short (minimum is 6 characters)"
            ]
        );
        assert_eq!(
            validate_credentials("a b@example.com", "secret1"),
            vec!["Email is invalid"]
        );
        assert_eq!(
            validate_credentials("a@b@c", "secret1"),
            vec!["Email is invalid"]
        );
    }

    #[test]
    fn test_long_password() {
        let long = "x".repeat(129);
        assert_eq!(
            validate_credentials("ada@example.com", &long),
            vec!["Password is too long (maximum is 128 characters)"]
        );
    }

    #[test]
    fn test_unique_email_index() {
        let indices = UserDoc::into_indices();
        assert_eq!(indices.len(), 1);
        assert!(indices[0].0.contains_key("email"));
    }
}
