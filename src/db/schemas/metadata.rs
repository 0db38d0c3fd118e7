//! Timestamps and the soft-delete flag carried by every stored document
//!
//! Mongo queries go through [`Metadata::live`] so soft-deleted documents are
//! invisible to every read and write.

use bson::{doc, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Dotted path of the soft-delete flag inside a stored document
pub const DELETED_FLAG: &str = "metadata.is_deleted";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Metadata {
    /// Metadata for a document stored now
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            created_at: Some(now),
            updated_at: Some(now),
            deleted_at: None,
        }
    }

    /// Bump `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }

    /// Narrow `filter` to documents that are not soft-deleted
    pub fn live(mut filter: Document) -> Document {
        filter.insert(DELETED_FLAG, doc! { "$ne": true });
        filter
    }

    /// `$set` the given fields and bump `updated_at`
    pub fn touched_set(mut fields: Document) -> Document {
        fields.insert("metadata.updated_at", DateTime::now());
        doc! { "$set": fields }
    }

    /// Update that marks a document soft-deleted
    pub fn soft_delete_update() -> Document {
        let now = DateTime::now();
        doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": now,
                "metadata.updated_at": now,
            }
        }
    }
}
