//! Member CRUD under /api/v1/members
//!
//! Every handler runs for an authenticated [`Identity`]; single-member
//! routes load through [`load_owned_member`] so another user's member is
//! rejected before anything is read or written.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::auth::access::load_owned_member;
use crate::auth::Identity;
use crate::db::schemas::{to_sentence, MemberDoc, MemberPatch};
use crate::routes::response::{json_response, message_response, parse_body, timestamp};
use crate::server::AppState;
use crate::types::{FactbookError, Result};

/// Member as rendered to clients
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&MemberDoc> for MemberView {
    fn from(member: &MemberDoc) -> Self {
        Self {
            id: member._id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: member.user_id.to_hex(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            created_at: timestamp(member.metadata.created_at),
            updated_at: timestamp(member.metadata.updated_at),
        }
    }
}

/// GET /api/v1/members
pub async fn list(state: &AppState, identity: &Identity) -> Result<Response<Full<Bytes>>> {
    let members = state.store.list_members(&identity.user_id).await?;
    let views: Vec<MemberView> = members.iter().map(MemberView::from).collect();

    Ok(json_response(StatusCode::OK, &json!({ "members": views })))
}

/// POST /api/v1/members
pub async fn create(
    state: &AppState,
    identity: &Identity,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>> {
    let patch: MemberPatch = parse_body(body, "member")?;
    let member = MemberDoc::new(identity.user_id, patch);

    let errors = member.validate();
    if !errors.is_empty() {
        return Err(FactbookError::BadRequest(format!(
            "Unable to create member: {}",
            to_sentence(&errors)
        )));
    }

    let member = state.store.insert_member(member).await?;
    info!(user_id = %identity.user_id, member_id = ?member._id, "Member created");

    Ok(json_response(StatusCode::CREATED, &MemberView::from(&member)))
}

/// GET /api/v1/members/:id
pub async fn show(
    state: &AppState,
    identity: &Identity,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let member = load_owned_member(state.store.as_ref(), identity, id).await?;
    Ok(json_response(StatusCode::OK, &MemberView::from(&member)))
}

/// PUT or PATCH /api/v1/members/:id
///
/// Only the fields present in the body change.
pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: &str,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>> {
    let mut member = load_owned_member(state.store.as_ref(), identity, id).await?;
    let patch: MemberPatch = parse_body(body, "member")?;

    member.apply(patch);
    let errors = member.validate();
    if !errors.is_empty() {
        return Err(FactbookError::BadRequest(format!(
            "Unable to update member: {}",
            to_sentence(&errors)
        )));
    }

    state.store.update_member(&member).await?;
    Ok(message_response(
        StatusCode::OK,
        "Member record successfully updated.",
    ))
}

/// DELETE /api/v1/members/:id
///
/// Removes the member's facts along with it.
pub async fn delete(
    state: &AppState,
    identity: &Identity,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let member = load_owned_member(state.store.as_ref(), identity, id).await?;
    let member_id = member
        ._id
        .ok_or_else(|| FactbookError::Internal("Member has no id".into()))?;

    let facts = state.store.delete_member(&member_id).await?;
    info!(member_id = %member_id, facts, "Member deleted");

    Ok(message_response(
        StatusCode::OK,
        "Member record successfully deleted.",
    ))
}
