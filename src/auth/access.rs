//! Resource ownership checks
//!
//! Both resource controllers walk the same chain: the signed-in user owns a
//! member, the member owns its facts. [`check_access`] is the single
//! predicate for every link of that chain.

use bson::oid::ObjectId;

use crate::auth::session::Session;
use crate::db::schemas::{FactDoc, MemberDoc};
use crate::db::RecordStore;
use crate::types::{FactbookError, Result};

/// Message returned when a record belongs to someone else
pub const NOT_AUTHORIZED: &str = "The current user is not authorized for that data.";

/// The signed-in user behind a request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: ObjectId,
    pub email: String,
}

impl From<&Session> for Identity {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email.clone(),
        }
    }
}

/// A record that belongs to exactly one parent
pub trait Owned {
    /// Model name used in error messages
    const MODEL: &'static str;

    /// Id of the owning record
    fn owner_id(&self) -> ObjectId;
}

impl Owned for MemberDoc {
    const MODEL: &'static str = "Member";

    fn owner_id(&self) -> ObjectId {
        self.user_id
    }
}

impl Owned for FactDoc {
    const MODEL: &'static str = "Fact";

    fn owner_id(&self) -> ObjectId {
        self.member_id
    }
}

/// Reject access unless `resource` belongs to `owner`
pub fn check_access<R: Owned>(resource: &R, owner: &ObjectId) -> Result<()> {
    if resource.owner_id() == *owner {
        Ok(())
    } else {
        Err(FactbookError::Unauthorized(NOT_AUTHORIZED.to_string()))
    }
}

/// Parse a path id; malformed ids are reported as missing records
pub fn parse_id<R: Owned>(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| not_found::<R>(raw))
}

fn not_found<R: Owned>(raw: &str) -> FactbookError {
    FactbookError::NotFound(format!("Couldn't find {} with 'id'={}", R::MODEL, raw))
}

/// Load a member and verify the caller owns it
pub async fn load_owned_member(
    store: &dyn RecordStore,
    identity: &Identity,
    raw_id: &str,
) -> Result<MemberDoc> {
    let id = parse_id::<MemberDoc>(raw_id)?;
    let member = store
        .find_member(&id)
        .await?
        .ok_or_else(|| not_found::<MemberDoc>(raw_id))?;

    check_access(&member, &identity.user_id)?;
    Ok(member)
}

/// Load a fact through its already-authorized member
pub async fn load_scoped_fact(
    store: &dyn RecordStore,
    member: &MemberDoc,
    raw_id: &str,
) -> Result<FactDoc> {
    let member_id = member
        ._id
        .ok_or_else(|| FactbookError::Internal("Member has no id".into()))?;
    let id = parse_id::<FactDoc>(raw_id)?;

    let fact = store
        .find_fact(&member_id, &id)
        .await?
        .ok_or_else(|| not_found::<FactDoc>(raw_id))?;

    check_access(&fact, &member_id)?;
    Ok(fact)
}
