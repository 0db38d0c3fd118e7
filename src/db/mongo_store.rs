//! MongoDB-backed record store
//!
//! Deletes are soft: a deleted member and its facts keep their documents
//! with `metadata.is_deleted` set, and every query skips them.

use bson::{doc, oid::ObjectId, Document};
use tracing::{debug, info, warn};

use crate::db::mongo::{is_duplicate_key, MongoClient, MongoCollection};
use crate::db::schemas::{
    FactDoc, MemberDoc, Metadata, UserDoc, EMAIL_TAKEN, FACT_COLLECTION, MEMBER_COLLECTION,
    USER_COLLECTION,
};
use crate::db::store::{missing_member, RecordStore};
use crate::types::{FactbookError, Result};

/// Record store over three MongoDB collections
pub struct MongoStore {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
    members: MongoCollection<MemberDoc>,
    facts: MongoCollection<FactDoc>,
}

impl MongoStore {
    /// Open the collections and apply their indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        let members = client.collection::<MemberDoc>(MEMBER_COLLECTION).await?;
        let facts = client.collection::<FactDoc>(FACT_COLLECTION).await?;

        info!("MongoDB collections ready in '{}'", client.db_name());

        Ok(Self {
            client,
            users,
            members,
            facts,
        })
    }

    async fn member_is_live(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.members.find_one(by_id(id)).await?.is_some())
    }
}

fn by_id(id: &ObjectId) -> Document {
    doc! { "_id": *id }
}

/// Every fact under one member
fn member_facts(member_id: &ObjectId) -> Document {
    doc! { "member_id": *member_id }
}

/// One fact, matched only within its member
fn scoped_fact(member_id: &ObjectId, id: &ObjectId) -> Document {
    doc! { "_id": *id, "member_id": *member_id }
}

fn member_update(member: &MemberDoc) -> Document {
    Metadata::touched_set(doc! {
        "first_name": member.first_name.as_str(),
        "last_name": member.last_name.as_str(),
    })
}

fn fact_update(fact: &FactDoc) -> Document {
    Metadata::touched_set(doc! {
        "fact_text": fact.fact_text.as_str(),
        "likes": fact.likes,
    })
}

#[async_trait::async_trait]
impl RecordStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        match self.users.insert_one(user.clone()).await {
            Ok(id) => {
                user._id = Some(id);
                Ok(user)
            }
            Err(e) if is_duplicate_key(&e) => {
                Err(FactbookError::Validation(vec![EMAIL_TAKEN.to_string()]))
            }
            Err(e) => Err(e),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn list_members(&self, user_id: &ObjectId) -> Result<Vec<MemberDoc>> {
        self.members.find_many(doc! { "user_id": *user_id }).await
    }

    async fn find_member(&self, id: &ObjectId) -> Result<Option<MemberDoc>> {
        self.members.find_one(by_id(id)).await
    }

    async fn insert_member(&self, mut member: MemberDoc) -> Result<MemberDoc> {
        member._id = Some(self.members.insert_one(member.clone()).await?);
        Ok(member)
    }

    async fn update_member(&self, member: &MemberDoc) -> Result<()> {
        let id = member
            ._id
            .ok_or_else(|| FactbookError::Internal("Member has no id".into()))?;

        self.members.update_one(by_id(&id), member_update(member)).await?;
        Ok(())
    }

    async fn delete_member(&self, id: &ObjectId) -> Result<u64> {
        // Member first: if the fact sweep fails, the leftovers are unreachable
        self.members.soft_delete(by_id(id)).await?;
        let facts = self.facts.soft_delete_many(member_facts(id)).await?;

        debug!(member_id = %id, facts = facts.modified_count, "Member deleted");
        Ok(facts.modified_count)
    }

    async fn list_facts(&self, member_id: &ObjectId) -> Result<Vec<FactDoc>> {
        self.facts.find_many(member_facts(member_id)).await
    }

    async fn find_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<Option<FactDoc>> {
        self.facts.find_one(scoped_fact(member_id, id)).await
    }

    async fn insert_fact(&self, mut fact: FactDoc) -> Result<FactDoc> {
        let member_id = fact.member_id;
        if !self.member_is_live(&member_id).await? {
            return Err(missing_member(&member_id));
        }

        let id = self.facts.insert_one(fact.clone()).await?;

        // The member delete marks the member before sweeping its facts, so a
        // sweep that ran ahead of this insert is visible here
        if !self.member_is_live(&member_id).await? {
            warn!(member_id = %member_id, fact_id = %id, "Member deleted during fact insert");
            self.facts.soft_delete(scoped_fact(&member_id, &id)).await?;
            return Err(missing_member(&member_id));
        }

        fact._id = Some(id);
        Ok(fact)
    }

    async fn update_fact(&self, fact: &FactDoc) -> Result<()> {
        let id = fact
            ._id
            .ok_or_else(|| FactbookError::Internal("Fact has no id".into()))?;

        self.facts
            .update_one(scoped_fact(&fact.member_id, &id), fact_update(fact))
            .await?;
        Ok(())
    }

    async fn delete_fact(&self, member_id: &ObjectId, id: &ObjectId) -> Result<bool> {
        let result = self.facts.soft_delete(scoped_fact(member_id, id)).await?;
        Ok(result.modified_count > 0)
    }
}
