//! Fact CRUD under /api/v1/members/:member_id/facts
//!
//! The member is loaded and ownership-checked first; facts are then looked
//! up within that member only.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::info;

use crate::auth::access::{load_owned_member, load_scoped_fact};
use crate::auth::Identity;
use crate::db::schemas::{to_sentence, FactDoc, FactPatch, MemberDoc};
use crate::routes::response::{json_response, message_response, parse_body, timestamp};
use crate::server::AppState;
use crate::types::{FactbookError, Result};

/// Fact as rendered to clients
#[derive(Debug, Serialize)]
pub struct FactView {
    pub id: String,
    pub member_id: String,
    pub fact_text: String,
    pub likes: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&FactDoc> for FactView {
    fn from(fact: &FactDoc) -> Self {
        Self {
            id: fact._id.map(|id| id.to_hex()).unwrap_or_default(),
            member_id: fact.member_id.to_hex(),
            fact_text: fact.fact_text.clone(),
            likes: fact.likes,
            created_at: timestamp(fact.metadata.created_at),
            updated_at: timestamp(fact.metadata.updated_at),
        }
    }
}

async fn owned_member(state: &AppState, identity: &Identity, member_id: &str) -> Result<MemberDoc> {
    load_owned_member(state.store.as_ref(), identity, member_id).await
}

fn member_oid(member: &MemberDoc) -> Result<bson::oid::ObjectId> {
    member
        ._id
        .ok_or_else(|| FactbookError::Internal("Member has no id".into()))
}

/// GET /api/v1/members/:member_id/facts
///
/// Returns a bare array, oldest first.
pub async fn list(
    state: &AppState,
    identity: &Identity,
    member_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let member = owned_member(state, identity, member_id).await?;
    let facts = state.store.list_facts(&member_oid(&member)?).await?;
    let views: Vec<FactView> = facts.iter().map(FactView::from).collect();

    Ok(json_response(StatusCode::OK, &views))
}

/// POST /api/v1/members/:member_id/facts
pub async fn create(
    state: &AppState,
    identity: &Identity,
    member_id: &str,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>> {
    let member = owned_member(state, identity, member_id).await?;
    let patch: FactPatch = parse_body(body, "fact")?;
    let fact = FactDoc::new(member_oid(&member)?, patch);

    let errors = fact.validate();
    if !errors.is_empty() {
        return Err(FactbookError::BadRequest(format!(
            "The fact entry could not be created. {}",
            to_sentence(&errors)
        )));
    }

    let fact = state.store.insert_fact(fact).await?;
    info!(member_id = %fact.member_id, fact_id = ?fact._id, "Fact created");

    Ok(json_response(StatusCode::CREATED, &FactView::from(&fact)))
}

/// GET /api/v1/members/:member_id/facts/:id
pub async fn show(
    state: &AppState,
    identity: &Identity,
    member_id: &str,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let member = owned_member(state, identity, member_id).await?;
    let fact = load_scoped_fact(state.store.as_ref(), &member, id).await?;

    Ok(json_response(StatusCode::OK, &FactView::from(&fact)))
}

/// PUT or PATCH /api/v1/members/:member_id/facts/:id
pub async fn update(
    state: &AppState,
    identity: &Identity,
    member_id: &str,
    id: &str,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>> {
    let member = owned_member(state, identity, member_id).await?;
    let mut fact = load_scoped_fact(state.store.as_ref(), &member, id).await?;
    let patch: FactPatch = parse_body(body, "fact")?;

    fact.apply(patch);
    let errors = fact.validate();
    if !errors.is_empty() {
        return Err(FactbookError::BadRequest(format!(
            "Unable to update fact: {}",
            to_sentence(&errors)
        )));
    }

    state.store.update_fact(&fact).await?;
    Ok(message_response(
        StatusCode::OK,
        "Fact record successfully updated.",
    ))
}

/// DELETE /api/v1/members/:member_id/facts/:id
pub async fn delete(
    state: &AppState,
    identity: &Identity,
    member_id: &str,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let member = owned_member(state, identity, member_id).await?;
    let fact = load_scoped_fact(state.store.as_ref(), &member, id).await?;

    if let Some(fact_id) = fact._id {
        state.store.delete_fact(&fact.member_id, &fact_id).await?;
        info!(member_id = %fact.member_id, fact_id = %fact_id, "Fact deleted");
    }

    Ok(message_response(
        StatusCode::OK,
        "Fact record successfully deleted.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::db::schemas::MemberPatch;
    use crate::db::MemoryStore;
    use bson::oid::ObjectId;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;

    struct Fixture {
        state: AppState,
        owner: Identity,
        member_id: String,
    }

    async fn fixture() -> Fixture {
        let state = AppState::new(Args::for_tests(), Arc::new(MemoryStore::new()));
        let owner = Identity {
            user_id: ObjectId::new(),
            email: "owner@example.com".into(),
        };
        let member = state
            .store
            .insert_member(MemberDoc::new(
                owner.user_id,
                MemberPatch {
                    first_name: Some("Ada".into()),
                    last_name: Some("Lovelace".into()),
                },
            ))
            .await
            .unwrap();

        Fixture {
            state,
            owner,
            member_id: member._id.unwrap().to_hex(),
        }
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let f = fixture().await;
        let body = Bytes::from(r#"{"fact":{"fact_text":"This is a fact.","likes":15}}"#);

        let created = create(&f.state, &f.owner, &f.member_id, &body).await.unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = body_json(list(&f.state, &f.owner, &f.member_id).await.unwrap()).await;
        let facts = listed.as_array().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0]["fact_text"], "This is a fact.");
        assert_eq!(facts[0]["likes"], 15);
    }

    #[tokio::test]
    async fn test_create_error_sentence() {
        let f = fixture().await;
        let err = create(&f.state, &f.owner, &f.member_id, &Bytes::from(r#"{"likes":-2}"#))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FactbookError::BadRequest(ref m)
                if m == "The fact entry could not be created. Fact text can't be blank and Likes must be greater than or equal to 0"
        ));
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let f = fixture().await;
        let created = create(
            &f.state,
            &f.owner,
            &f.member_id,
            &Bytes::from(r#"{"fact_text":"This is a fact.","likes":15}"#),
        )
        .await
        .unwrap();
        let id = body_json(created).await["id"].as_str().unwrap().to_string();

        update(&f.state, &f.owner, &f.member_id, &id, &Bytes::from(r#"{"likes":16}"#))
            .await
            .unwrap();

        let shown = body_json(show(&f.state, &f.owner, &f.member_id, &id).await.unwrap()).await;
        assert_eq!(shown["likes"], 16);
        assert_eq!(shown["fact_text"], "This is a fact.");
    }

    #[tokio::test]
    async fn test_missing_member_is_not_found() {
        let f = fixture().await;
        let err = list(&f.state, &f.owner, "not-an-id").await.unwrap_err();
        assert!(matches!(err, FactbookError::NotFound(ref m) if m == "Couldn't find Member with 'id'=not-an-id"));
    }

    #[tokio::test]
    async fn test_stranger_cannot_list() {
        let f = fixture().await;
        let stranger = Identity {
            user_id: ObjectId::new(),
            email: "stranger@example.com".into(),
        };
        let err = list(&f.state, &stranger, &f.member_id).await.unwrap_err();
        assert!(matches!(err, FactbookError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture().await;
        let created = create(
            &f.state,
            &f.owner,
            &f.member_id,
            &Bytes::from(r#"{"fact_text":"Short-lived."}"#),
        )
        .await
        .unwrap();
        let id = body_json(created).await["id"].as_str().unwrap().to_string();

        delete(&f.state, &f.owner, &f.member_id, &id).await.unwrap();
        let err = show(&f.state, &f.owner, &f.member_id, &id).await.unwrap_err();
        assert!(matches!(err, FactbookError::NotFound(ref m) if *m == format!("Couldn't find Fact with 'id'={}", id)));
    }
}
