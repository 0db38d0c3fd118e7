//! Fact document schema
//!
//! A fact is a note attached to one member, with a like count.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for facts
pub const FACT_COLLECTION: &str = "facts";

/// Fact document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FactDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning member
    pub member_id: ObjectId,

    pub fact_text: String,

    #[serde(default)]
    pub likes: i64,
}

/// Writable fact fields as sent by clients
#[derive(Deserialize, Clone, Debug, Default)]
pub struct FactPatch {
    #[serde(default)]
    pub fact_text: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
}

impl FactDoc {
    /// Build a new fact under `member_id`; likes default to zero
    pub fn new(member_id: ObjectId, patch: FactPatch) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            member_id,
            fact_text: patch.fact_text.unwrap_or_default(),
            likes: patch.likes.unwrap_or(0),
        }
    }

    /// Overwrite the fields present in `patch`
    pub fn apply(&mut self, patch: FactPatch) {
        if let Some(fact_text) = patch.fact_text {
            self.fact_text = fact_text;
        }
        if let Some(likes) = patch.likes {
            self.likes = likes;
        }
        self.metadata.touch();
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.fact_text.trim().is_empty() {
            errors.push("Fact text can't be blank".to_string());
        }
        if self.likes < 0 {
            errors.push("Likes must be greater than or equal to 0".to_string());
        }
        errors
    }
}

impl IntoIndexes for FactDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "member_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("member_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for FactDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likes_default_to_zero() {
        let fact = FactDoc::new(
            ObjectId::new(),
            FactPatch {
                fact_text: Some("Counted to infinity. Twice.".into()),
                likes: None,
            },
        );
        assert_eq!(fact.likes, 0);
        assert!(fact.validate().is_empty());
    }

    #[test]
    fn test_invalid_fact() {
        let fact = FactDoc::new(
            ObjectId::new(),
            FactPatch {
                fact_text: None,
                likes: Some(-1),
            },
        );
        assert_eq!(
            fact.validate(),
            vec![
                "Fact text can't be blank",
                "Likes must be greater than or equal to 0"
            ]
        );
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut fact = FactDoc::new(
            ObjectId::new(),
            FactPatch {
                fact_text: Some("This is a fact.".into()),
                likes: Some(15),
            },
        );
        fact.apply(FactPatch {
            fact_text: Some("This is another fact.".into()),
            likes: None,
        });
        assert_eq!(fact.fact_text, "This is another fact.");
        assert_eq!(fact.likes, 15);
    }
}
