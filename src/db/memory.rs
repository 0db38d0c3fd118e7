//! In-memory record store
//!
//! Used in dev mode when MongoDB is unavailable, and by tests.

use bson::oid::ObjectId;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::db::schemas::{FactDoc, MemberDoc, Metadata, UserDoc, EMAIL_TAKEN};
use crate::db::store::{missing_member, RecordStore};
use crate::types::{FactbookError, Result};

/// Record store kept in concurrent maps
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    /// email -> user id, for uniqueness
    emails: DashMap<String, ObjectId>,
    members: DashMap<ObjectId, MemberDoc>,
    facts: DashMap<ObjectId, FactDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored facts across all members
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }
}

/// Object ids sort by creation time, then by per-process counter
fn sorted_by_id<T>(mut items: Vec<(ObjectId, T)>) -> Vec<T> {
    items.sort_by(|a, b| a.0.bytes().cmp(&b.0.bytes()));
    items.into_iter().map(|(_, item)| item).collect()
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = ObjectId::new();
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(FactbookError::Validation(vec![EMAIL_TAKEN.to_string()]))
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        user._id = Some(id);
        user.metadata = Metadata::new();
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        Ok(self
            .emails
            .get(email)
            .and_then(|id| self.users.get(&*id).map(|u| u.clone())))
    }

    async fn list_members(&self, user_id: &ObjectId) -> Result<Vec<MemberDoc>> {
        let owned = self
            .members
            .iter()
            .filter(|m| m.user_id == *user_id)
            .map(|m| (*m.key(), m.value().clone()))
            .collect();
        Ok(sorted_by_id(owned))
    }

    async fn find_member(&self, id: &ObjectId) -> Result<Option<MemberDoc>> {
        Ok(self.members.get(id).map(|m| m.clone()))
    }

    async fn insert_member(&self, mut member: MemberDoc) -> Result<MemberDoc> {
        let id = ObjectId::new();
        member._id = Some(id);
        member.metadata = Metadata::new();
        self.members.insert(id, member.clone());
        Ok(member)
    }

    async fn update_member(&self, member: &MemberDoc) -> Result<()> {
        let id = member
            ._id
            .ok_or_else(|| FactbookError::Internal("Member has no id".into()))?;

        if let Some(mut stored) = self.members.get_mut(&id) {
            stored.first_name = member.first_name.clone();
            stored.last_name = member.last_name.clone();
            stored.metadata.touch();
        }
        Ok(())
    }

    async fn delete_member(&self, id: &ObjectId) -> Result<u64> {
        // Once the member is gone no insert_fact can land under it
        self.members.remove(id);

        let before = self.facts.len();
        self.facts.retain(|_, fact| fact.member_id != *id);
        Ok(before.saturating_sub(self.facts.len()) as u64)
    }

    async fn list_facts(&self, member_id: &ObjectId) -> Result<Vec<FactDoc>> {
        let owned = self
            .facts
            .iter()
            .filter(|f| f.member_id == *member_id)
            .map(|f| (*f.key(), f.value().clone()))
            .collect();
        Ok(sorted_by_id(owned))
    }

    async fn find_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<Option<FactDoc>> {
        Ok(self
            .facts
            .get(id)
            .filter(|f| f.member_id == *member_id)
            .map(|f| f.clone()))
    }

    async fn insert_fact(&self, mut fact: FactDoc) -> Result<FactDoc> {
        // Holding the member's shard blocks a concurrent delete_member
        let Some(_member) = self.members.get(&fact.member_id) else {
            return Err(missing_member(&fact.member_id));
        };

        let id = ObjectId::new();
        fact._id = Some(id);
        fact.metadata = Metadata::new();
        self.facts.insert(id, fact.clone());
        Ok(fact)
    }

    async fn update_fact(&self, fact: &FactDoc) -> Result<()> {
        let id = fact
            ._id
            .ok_or_else(|| FactbookError::Internal("Fact has no id".into()))?;

        if let Some(mut stored) = self.facts.get_mut(&id) {
            if stored.member_id == fact.member_id {
                stored.fact_text = fact.fact_text.clone();
                stored.likes = fact.likes;
                stored.metadata.touch();
            }
        }
        Ok(())
    }

    async fn delete_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<bool> {
        Ok(self
            .facts
            .remove_if(id, |_, fact| fact.member_id == *member_id)
            .is_some())
    }
}
