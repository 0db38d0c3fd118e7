//! Member document schema
//!
//! A member is a contact owned by exactly one user.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for members
pub const MEMBER_COLLECTION: &str = "members";

/// Member document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MemberDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    pub first_name: String,

    pub last_name: String,
}

/// Writable member fields as sent by clients
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MemberPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl MemberDoc {
    /// Build a new member for `user_id` from client fields
    pub fn new(user_id: ObjectId, patch: MemberPatch) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            first_name: patch.first_name.unwrap_or_default(),
            last_name: patch.last_name.unwrap_or_default(),
        }
    }

    /// Overwrite the fields present in `patch`
    pub fn apply(&mut self, patch: MemberPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        self.metadata.touch();
    }

    /// Presence checks, one full message per failed rule
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.first_name.trim().is_empty() {
            errors.push("First name can't be blank".to_string());
        }
        if self.last_name.trim().is_empty() {
            errors.push("Last name can't be blank".to_string());
        }
        errors
    }
}

impl IntoIndexes for MemberDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("user_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MemberDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
