use axum::extract::{Path, Query, State};
use axum::Json;
use mindpet_shared::constants::{codes, GRATITUDE_MAX_LENGTH};
use mindpet_shared::pagination::{CursorQuery, Page};
use mindpet_shared::validation::validate_text;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Jsonb;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::crypto::{CryptoError, EncryptedField, FieldCipher};
use crate::error::{AppError, AppResult};
use crate::response::{ApiResponse, Created};
use crate::AppState;

#[derive(Debug, sqlx::FromRow)]
struct GratitudeRow {
    id: Uuid,
    content: Jsonb<EncryptedField>,
    is_deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct GratitudeEntry {
    pub id: Uuid,
    pub content: String,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct GratitudeRequest {
    pub content: String,
}

impl GratitudeRow {
    fn decrypt(self, cipher: &FieldCipher) -> Result<GratitudeEntry, CryptoError> {
        Ok(GratitudeEntry {
            id: self.id,
            content: cipher.decrypt(&self.content)?,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn entry_not_found() -> AppError {
    AppError::not_found(codes::ENTRY_NOT_FOUND, "Gratitude entry not found")
}

pub async fn create_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GratitudeRequest>,
) -> AppResult<Created<GratitudeEntry>> {
    validate_text("content", &request.content, GRATITUDE_MAX_LENGTH)?;

    let row = sqlx::query_as::<_, GratitudeRow>(
        "INSERT INTO gratitude_entries (id, owner_id, content) VALUES ($1, $2, $3) \
         RETURNING id, content, is_deleted, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(Jsonb(state.cipher.encrypt(&request.content)?))
    .fetch_one(&state.pool)
    .await?;

    info!("🙏 User {} added gratitude entry {}", user.user_id, row.id);
    Ok(ApiResponse::created("Gratitude entry created", row.decrypt(&state.cipher)?))
}

/// Newest first. `lastEntryId` resumes after the given entry.
pub async fn list_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CursorQuery>,
) -> AppResult<Json<ApiResponse<Page<GratitudeEntry>>>> {
    let rows = sqlx::query_as::<_, GratitudeRow>(
        r#"
        SELECT id, content, is_deleted, created_at, updated_at
        FROM gratitude_entries
        WHERE owner_id = $1
          AND NOT is_deleted
          AND ($2::uuid IS NULL OR (created_at, id) < (
              SELECT created_at, id FROM gratitude_entries WHERE id = $2 AND owner_id = $1
          ))
        ORDER BY created_at DESC, id DESC
        LIMIT $3
        "#,
    )
    .bind(user.user_id)
    .bind(query.last_entry_id)
    .bind(query.fetch_limit())
    .fetch_all(&state.pool)
    .await?;

    let page = Page::from_overfetch(rows, query.effective_limit(), |row| row.id);
    let items = page
        .items
        .into_iter()
        .map(|row| row.decrypt(&state.cipher))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApiResponse::ok(
        "Gratitude entries retrieved",
        Page {
            items,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        },
    ))
}

pub async fn get_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<GratitudeEntry>>> {
    let row = sqlx::query_as::<_, GratitudeRow>(
        "SELECT id, content, is_deleted, created_at, updated_at \
         FROM gratitude_entries WHERE id = $1 AND owner_id = $2",
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(entry_not_found)?;

    Ok(ApiResponse::ok("Gratitude entry retrieved", row.decrypt(&state.cipher)?))
}

pub async fn update_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<GratitudeRequest>,
) -> AppResult<Json<ApiResponse<GratitudeEntry>>> {
    validate_text("content", &request.content, GRATITUDE_MAX_LENGTH)?;

    let row = sqlx::query_as::<_, GratitudeRow>(
        r#"
        UPDATE gratitude_entries SET content = $3, updated_at = NOW()
        WHERE id = $1 AND owner_id = $2 AND NOT is_deleted
        RETURNING id, content, is_deleted, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(Jsonb(state.cipher.encrypt(&request.content)?))
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(entry_not_found)?;

    Ok(ApiResponse::ok("Gratitude entry updated", row.decrypt(&state.cipher)?))
}

pub async fn soft_delete_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let result = sqlx::query(
        "UPDATE gratitude_entries SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND owner_id = $2 AND NOT is_deleted",
    )
    .bind(id)
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(entry_not_found());
    }
    Ok(ApiResponse::ok("Gratitude entry deleted", id))
}

pub async fn hard_delete_gratitude(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let result = sqlx::query("DELETE FROM gratitude_entries WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(entry_not_found());
    }
    info!("🗑️ User {} permanently deleted gratitude entry {}", user.user_id, id);
    Ok(ApiResponse::ok("Gratitude entry permanently deleted", id))
}
