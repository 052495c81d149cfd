use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::{Todo, TodoId};
use tokio::sync::RwLock;

use super::{StoreError, TodoFields, TodoStore};

/// In-process collection, used when no Redis server is wanted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<HashMap<TodoId, Todo>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert(&self, fields: TodoFields) -> Result<Todo, StoreError> {
        let mut docs = self.docs.write().await;
        let mut id = TodoId::new();
        while docs.contains_key(&id) {
            id = TodoId::new();
        }
        let todo = Todo {
            id,
            title: fields.title,
            completed: fields.completed,
            created_at: fields.created_at,
        };
        docs.insert(id, todo.clone());
        Ok(todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.docs.read().await.values().cloned().collect())
    }

    async fn find_one(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    async fn update_one(&self, id: TodoId, fields: TodoFields) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(todo) = docs.get_mut(&id) else {
            return Ok(0);
        };
        todo.title = fields.title;
        todo.completed = fields.completed;
        todo.created_at = fields.created_at;
        Ok(1)
    }

    async fn delete_one(&self, id: TodoId) -> Result<u64, StoreError> {
        let removed = self.docs.write().await.remove(&id);
        Ok(removed.map_or(0, |_| 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn fields(title: &str, completed: bool) -> TodoFields {
        TodoFields {
            title: title.to_string(),
            completed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.insert(fields("a", false)).await.unwrap();
        let b = store.insert(fields("b", true)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_never_creates_documents() {
        let store = MemoryStore::new();
        let modified = store.update_one(TodoId::new(), fields("ghost", true)).await.unwrap();
        assert_eq!(modified, 0);
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_fields_but_keeps_id() {
        let store = MemoryStore::new();
        let created = store.insert(fields("before", false)).await.unwrap();

        let mut changes = fields("after", true);
        changes.created_at = created.created_at + Duration::seconds(5);
        assert_eq!(store.update_one(created.id, changes.clone()).await.unwrap(), 1);

        let stored = store.find_one(created.id).await.unwrap().unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.title, "after");
        assert!(stored.completed);
        assert_eq!(stored.created_at, changes.created_at);
    }

    #[tokio::test]
    async fn delete_reports_how_many_were_removed() {
        let store = MemoryStore::new();
        let created = store.insert(fields("bye", false)).await.unwrap();
        assert_eq!(store.delete_one(created.id).await.unwrap(), 1);
        assert_eq!(store.delete_one(created.id).await.unwrap(), 0);
        assert!(store.find_one(created.id).await.unwrap().is_none());
    }
}
