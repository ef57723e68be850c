use axum::extract::{Path, Query, State};
use axum::Json;
use mindpet_shared::constants::{codes, MOOD_NOTE_MAX_LENGTH};
use mindpet_shared::mood::{mood_history_limit, MoodKind};
use mindpet_shared::quest::day_bounds;
use mindpet_shared::validation::{validate_intensity, validate_optional_text};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::response::{ApiResponse, Created};
use crate::services::local_now;
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MoodCheckin {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub mood: MoodKind,
    pub intensity: i32,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateMoodRequest {
    pub mood: MoodKind,
    pub intensity: i32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodHistoryQuery {
    pub limit: Option<i64>,
}

pub async fn create_mood(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateMoodRequest>,
) -> AppResult<Created<MoodCheckin>> {
    validate_intensity(request.intensity)?;
    validate_optional_text("note", request.note.as_deref(), MOOD_NOTE_MAX_LENGTH)?;
    let note = request.note.as_deref().map(str::trim).filter(|note| !note.is_empty());

    let checkin = sqlx::query_as::<_, MoodCheckin>(
        "INSERT INTO mood_checkins (id, owner_id, mood, intensity, note) VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, mood, intensity, note, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(request.mood.as_ref())
    .bind(request.intensity)
    .bind(note)
    .fetch_one(&state.pool)
    .await?;

    info!("🌤️ User {} checked in feeling {}", user.user_id, checkin.mood);
    Ok(ApiResponse::created("Mood recorded", checkin))
}

pub async fn list_moods(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MoodHistoryQuery>,
) -> AppResult<Json<ApiResponse<Vec<MoodCheckin>>>> {
    let checkins = sqlx::query_as::<_, MoodCheckin>(
        "SELECT id, mood, intensity, note, created_at FROM mood_checkins \
         WHERE owner_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user.user_id)
    .bind(mood_history_limit(query.limit))
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Mood history retrieved", checkins))
}

pub async fn todays_moods(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<MoodCheckin>>>> {
    let today = day_bounds(local_now());
    let checkins = sqlx::query_as::<_, MoodCheckin>(
        "SELECT id, mood, intensity, note, created_at FROM mood_checkins \
         WHERE owner_id = $1 AND created_at BETWEEN $2 AND $3 ORDER BY created_at",
    )
    .bind(user.user_id)
    .bind(today.start)
    .bind(today.end)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Today's moods retrieved", checkins))
}

pub async fn delete_mood(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let result = sqlx::query("DELETE FROM mood_checkins WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(codes::ENTRY_NOT_FOUND, "Mood check-in not found"));
    }
    Ok(ApiResponse::ok("Mood check-in deleted", id))
}
