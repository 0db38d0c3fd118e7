//! Database layer for factbook
//!
//! [`RecordStore`] is the seam between handlers and storage. MongoDB is the
//! production backend; the in-memory store serves dev mode and tests.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection};
pub use mongo_store::MongoStore;
pub use schemas::{FactDoc, MemberDoc, Metadata, UserDoc};
pub use store::RecordStore;
