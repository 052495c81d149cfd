use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::Json,
};
use chrono::Utc;
use shared::{DeleteTodoResponse, Todo, TodoId, TodoPayload, UpdateTodoResponse};

use crate::error::ApiError;
use crate::store::{SharedStore, TodoFields};

fn parse_id(raw: &str) -> Result<TodoId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidInput(format!("Invalid todo id: {raw}")))
}

/// `:id` path segment. Every way it can be bad, including broken percent
/// encoding, is reported as the usual JSON 400.
pub struct TodoIdParam(pub TodoId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TodoIdParam {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
        parse_id(&raw).map(Self)
    }
}

// Bodies are decoded by hand so every malformed payload is a 400, whatever
// the content type or the kind of serde failure.
fn parse_payload(body: &[u8]) -> Result<TodoPayload, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected todo payload");
        ApiError::InvalidInput("Invalid request payload".to_string())
    })
}

fn stamped(payload: TodoPayload) -> TodoFields {
    TodoFields {
        title: payload.title,
        completed: payload.completed,
        created_at: Utc::now(),
    }
}

pub async fn create_todo(
    State(store): State<SharedStore>,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let payload = parse_payload(&body)?;
    let todo = store.insert(stamped(payload)).await?;
    tracing::info!(id = %todo.id, "created todo");
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn list_todos(State(store): State<SharedStore>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = store.find_all().await?;
    Ok(Json(todos))
}

pub async fn get_todo(
    State(store): State<SharedStore>,
    TodoIdParam(id): TodoIdParam,
) -> Result<Json<Todo>, ApiError> {
    let todo = store.find_one(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(todo))
}

/// Responds with the document as it was before the update.
pub async fn update_todo(
    State(store): State<SharedStore>,
    TodoIdParam(id): TodoIdParam,
    body: Bytes,
) -> Result<Json<UpdateTodoResponse>, ApiError> {
    let payload = parse_payload(&body)?;

    let previous = store.find_one(id).await?.ok_or(ApiError::NotFound)?;
    let updated_count = store.update_one(id, stamped(payload)).await?;
    tracing::info!(%id, updated_count, "updated todo");

    Ok(Json(UpdateTodoResponse {
        updated_count,
        updated_todo: previous,
    }))
}

pub async fn delete_todo(
    State(store): State<SharedStore>,
    TodoIdParam(id): TodoIdParam,
) -> Result<Json<DeleteTodoResponse>, ApiError> {
    let deleted_count = store.delete_one(id).await?;
    tracing::info!(%id, deleted_count, "deleted todo");
    Ok(Json(DeleteTodoResponse { deleted_count }))
}
