//! Record store abstraction
//!
//! Handlers only see [`RecordStore`]. MongoDB backs it in production,
//! [`MemoryStore`](crate::db::MemoryStore) in dev mode and tests.

use bson::oid::ObjectId;

use crate::db::schemas::{FactDoc, MemberDoc, UserDoc};
use crate::types::{FactbookError, Result};

/// Persistence for users, members, and facts
///
/// Fact lookups always take the owning member id, so a fact can only be
/// reached through its member.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;

    /// Human-readable backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Insert a user, assigning its id
    ///
    /// A duplicate e-mail fails with a validation error.
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc>;

    /// Find a user by normalized e-mail
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    /// All members owned by `user_id`, oldest first
    async fn list_members(&self, user_id: &ObjectId) -> Result<Vec<MemberDoc>>;

    /// Find a member by id regardless of owner
    async fn find_member(&self, id: &ObjectId) -> Result<Option<MemberDoc>>;

    async fn insert_member(&self, member: MemberDoc) -> Result<MemberDoc>;

    /// Persist the name fields of an existing member
    async fn update_member(&self, member: &MemberDoc) -> Result<()>;

    /// Delete a member and every fact under it. Returns the number of facts removed.
    async fn delete_member(&self, id: &ObjectId) -> Result<u64>;

    /// All facts under `member_id`, oldest first
    async fn list_facts(&self, member_id: &ObjectId) -> Result<Vec<FactDoc>>;

    /// Find a fact by id within one member
    async fn find_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<Option<FactDoc>>;

    /// Insert a fact under a live member
    ///
    /// Fails with not-found when the member is gone, including when it is
    /// deleted while the insert is in flight.
    async fn insert_fact(&self, fact: FactDoc) -> Result<FactDoc>;

    /// Persist the text and likes of an existing fact
    async fn update_fact(&self, fact: &FactDoc) -> Result<()>;

    /// Delete a fact within one member. Returns false if nothing matched.
    async fn delete_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<bool>;
}

/// Error for a fact written under a member that no longer exists
pub fn missing_member(id: &ObjectId) -> FactbookError {
    FactbookError::NotFound(format!("Couldn't find Member with 'id'={}", id))
}
