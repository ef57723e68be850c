use axum::extract::{Path, Query, State};
use axum::Json;
use mindpet_shared::constants::{codes, JOURNAL_CONTENT_MAX_LENGTH, JOURNAL_MOOD_MAX_LENGTH, JOURNAL_TITLE_MAX_LENGTH};
use mindpet_shared::pagination::{CursorQuery, Page};
use mindpet_shared::validation::{validate_optional_text, validate_text};
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

const JOURNAL_COLUMNS: &str = "id, title, content, mood, is_deleted, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct JournalRow {
    id: Uuid,
    title: Jsonb<EncryptedField>,
    content: Jsonb<EncryptedField>,
    mood: Option<String>,
    is_deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateJournalRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJournalRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl JournalRow {
    fn decrypt(self, cipher: &FieldCipher) -> Result<JournalEntry, CryptoError> {
        Ok(JournalEntry {
            id: self.id,
            title: cipher.decrypt(&self.title)?,
            content: cipher.decrypt(&self.content)?,
            mood: self.mood,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn entry_not_found() -> AppError {
    AppError::not_found(codes::ENTRY_NOT_FOUND, "Journal entry not found")
}

fn seal(cipher: &FieldCipher, text: Option<&str>) -> Result<Option<Jsonb<EncryptedField>>, CryptoError> {
    text.map(|text| cipher.encrypt(text).map(Jsonb)).transpose()
}

pub async fn create_journal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateJournalRequest>,
) -> AppResult<Created<JournalEntry>> {
    validate_text("title", &request.title, JOURNAL_TITLE_MAX_LENGTH)?;
    validate_text("content", &request.content, JOURNAL_CONTENT_MAX_LENGTH)?;
    validate_optional_text("mood", request.mood.as_deref(), JOURNAL_MOOD_MAX_LENGTH)?;

    let row = sqlx::query_as::<_, JournalRow>(&format!(
        "INSERT INTO journal_entries (id, owner_id, title, content, mood) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        JOURNAL_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(Jsonb(state.cipher.encrypt(&request.title)?))
    .bind(Jsonb(state.cipher.encrypt(&request.content)?))
    .bind(request.mood.as_deref())
    .fetch_one(&state.pool)
    .await?;

    info!("📓 User {} wrote journal entry {}", user.user_id, row.id);
    Ok(ApiResponse::created("Journal entry created", row.decrypt(&state.cipher)?))
}

pub async fn list_journals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CursorQuery>,
) -> AppResult<Json<ApiResponse<Page<JournalEntry>>>> {
    let rows = sqlx::query_as::<_, JournalRow>(&format!(
        r#"
        SELECT {}
        FROM journal_entries
        WHERE owner_id = $1
          AND NOT is_deleted
          AND ($2::uuid IS NULL OR (created_at, id) < (
              SELECT created_at, id FROM journal_entries WHERE id = $2 AND owner_id = $1
          ))
        ORDER BY created_at DESC, id DESC
        LIMIT $3
        "#,
        JOURNAL_COLUMNS
    ))
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
        "Journal entries retrieved",
        Page {
            items,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        },
    ))
}

/// Fetches one entry by id, including soft-deleted ones.
pub async fn get_journal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<JournalEntry>>> {
    let row = sqlx::query_as::<_, JournalRow>(&format!(
        "SELECT {} FROM journal_entries WHERE id = $1 AND owner_id = $2",
        JOURNAL_COLUMNS
    ))
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(entry_not_found)?;

    Ok(ApiResponse::ok("Journal entry retrieved", row.decrypt(&state.cipher)?))
}

pub async fn update_journal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateJournalRequest>,
) -> AppResult<Json<ApiResponse<JournalEntry>>> {
    if let Some(title) = &request.title {
        validate_text("title", title, JOURNAL_TITLE_MAX_LENGTH)?;
    }
    if let Some(content) = &request.content {
        validate_text("content", content, JOURNAL_CONTENT_MAX_LENGTH)?;
    }
    validate_optional_text("mood", request.mood.as_deref(), JOURNAL_MOOD_MAX_LENGTH)?;

    let row = sqlx::query_as::<_, JournalRow>(&format!(
        r#"
        UPDATE journal_entries SET
            title = COALESCE($3, title),
            content = COALESCE($4, content),
            mood = COALESCE($5, mood),
            updated_at = NOW()
        WHERE id = $1 AND owner_id = $2 AND NOT is_deleted
        RETURNING {}
        "#,
        JOURNAL_COLUMNS
    ))
    .bind(id)
    .bind(user.user_id)
    .bind(seal(&state.cipher, request.title.as_deref())?)
    .bind(seal(&state.cipher, request.content.as_deref())?)
    .bind(request.mood.as_deref())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(entry_not_found)?;

    Ok(ApiResponse::ok("Journal entry updated", row.decrypt(&state.cipher)?))
}

pub async fn soft_delete_journal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let result = sqlx::query(
        "UPDATE journal_entries SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND owner_id = $2 AND NOT is_deleted",
    )
    .bind(id)
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(entry_not_found());
    }
    Ok(ApiResponse::ok("Journal entry deleted", id))
}

pub async fn hard_delete_journal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(entry_not_found());
    }
    info!("🗑️ User {} permanently deleted journal entry {}", user.user_id, id);
    Ok(ApiResponse::ok("Journal entry permanently deleted", id))
}
