//! Persistence client for the todo collection.
//!
//! Handlers only see [`TodoStore`]; `main` decides which implementation backs
//! it and hands it to the router as shared state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Todo, TodoId};
use thiserror::Error;

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

pub type SharedStore = Arc<dyn TodoStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("malformed document {id}: {reason}")]
    Decode { id: String, reason: String },
}

/// The mutable fields of a document, written on insert and on update.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoFields {
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Inserts a new document under a freshly assigned id.
    async fn insert(&self, fields: TodoFields) -> Result<Todo, StoreError>;

    /// Every document in the collection, in no particular order. Documents
    /// that cannot be decoded are left out.
    async fn find_all(&self) -> Result<Vec<Todo>, StoreError>;

    async fn find_one(&self, id: TodoId) -> Result<Option<Todo>, StoreError>;

    /// Overwrites the fields of an existing document. Returns the number of
    /// documents modified; a missing id is not created.
    async fn update_one(&self, id: TodoId, fields: TodoFields) -> Result<u64, StoreError>;

    /// Returns the number of documents removed.
    async fn delete_one(&self, id: TodoId) -> Result<u64, StoreError>;
}
