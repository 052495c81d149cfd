use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, FromRedisValue, Script, Value};
use shared::{Todo, TodoId};

use super::{StoreError, TodoFields, TodoStore};

// Only touches a document that already exists, so an update never upserts.
const UPDATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'title', ARGV[1], 'completed', ARGV[2], 'createdAt', ARGV[3])
return 1
";

/// Todo collection kept in Redis.
///
/// The collection name is a SET of document ids, and each document is a
/// HASH at `<collection>:<id>`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    collection: String,
    update_script: Script,
}

impl RedisStore {
    /// Opens the connection eagerly so an unreachable server fails startup.
    pub async fn connect(url: &str, collection: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            collection: collection.to_string(),
            update_script: Script::new(UPDATE_SCRIPT),
        })
    }

    fn document_key(&self, id: impl std::fmt::Display) -> String {
        format!("{}:{}", self.collection, id)
    }
}

#[async_trait]
impl TodoStore for RedisStore {
    async fn insert(&self, fields: TodoFields) -> Result<Todo, StoreError> {
        let mut conn = self.conn.clone();
        let id = TodoId::new();
        let created_at = fields.created_at.to_rfc3339();

        redis::pipe()
            .atomic()
            .hset_multiple(
                self.document_key(id),
                &[
                    ("title", fields.title.as_str()),
                    ("completed", encode_bool(fields.completed)),
                    ("createdAt", created_at.as_str()),
                ],
            )
            .ignore()
            .sadd(&self.collection, id.to_string())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(Todo {
            id,
            title: fields.title,
            completed: fields.completed,
            created_at: fields.created_at,
        })
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(&self.collection).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.document_key(id));
        }
        // Raw replies, so one unreadable document cannot fail the whole batch.
        let replies: Vec<Value> = pipe.query_async(&mut conn).await?;

        Ok(decode_documents(&self.collection, &ids, replies))
    }

    async fn find_one(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> = conn.hgetall(self.document_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_document(&id.to_string(), &fields).map(Some)
    }

    async fn update_one(&self, id: TodoId, fields: TodoFields) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let modified: u64 = self
            .update_script
            .key(self.document_key(id))
            .arg(fields.title)
            .arg(encode_bool(fields.completed))
            .arg(fields.created_at.to_rfc3339())
            .invoke_async(&mut conn)
            .await?;
        Ok(modified)
    }

    async fn delete_one(&self, id: TodoId) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let (deleted,): (u64,) = redis::pipe()
            .atomic()
            .del(self.document_key(id))
            .srem(&self.collection, id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(deleted)
    }
}

fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Pairs each id from the collection index with its HGETALL reply and keeps
/// the documents that decode. The rest are logged and dropped.
fn decode_documents(collection: &str, ids: &[String], replies: Vec<Value>) -> Vec<Todo> {
    let mut todos = Vec::with_capacity(ids.len());
    for (id, reply) in ids.iter().zip(replies) {
        let decoded = HashMap::<String, Vec<u8>>::from_redis_value(&reply)
            .map_err(|e| StoreError::Decode {
                id: id.clone(),
                reason: e.to_string(),
            })
            .and_then(|fields| decode_document(id, &fields));
        match decoded {
            Ok(todo) => todos.push(todo),
            Err(e) => tracing::warn!(collection, error = %e, "skipping document"),
        }
    }
    todos
}

fn decode_document(id: &str, fields: &HashMap<String, Vec<u8>>) -> Result<Todo, StoreError> {
    let malformed = |reason: &str| StoreError::Decode {
        id: id.to_string(),
        reason: reason.to_string(),
    };
    let text = |name: &str| field_text(fields, name).map_err(|reason| malformed(&reason));

    let todo_id: TodoId = id.parse().map_err(|_| malformed("bad id"))?;
    let title = text("title")?.to_string();
    let completed = match text("completed")? {
        "true" => true,
        "false" => false,
        _ => return Err(malformed("bad completed flag")),
    };
    let created_at = DateTime::parse_from_rfc3339(text("createdAt")?)
        .map_err(|_| malformed("bad createdAt"))?
        .with_timezone(&Utc);

    Ok(Todo {
        id: todo_id,
        title,
        completed,
        created_at,
    })
}

fn field_text<'a>(fields: &'a HashMap<String, Vec<u8>>, name: &str) -> Result<&'a str, String> {
    let raw = fields.get(name).ok_or_else(|| format!("missing {name}"))?;
    std::str::from_utf8(raw).map_err(|_| format!("non-UTF-8 {name}"))
}
