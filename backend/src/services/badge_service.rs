use axum::extract::State;
use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AwardedBadge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub awarded_at: OffsetDateTime,
}

pub async fn list_badges(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Badge>>>> {
    let badges = sqlx::query_as::<_, Badge>("SELECT id, name, description, icon FROM badges ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::ok("Badges retrieved", badges))
}

pub async fn my_badges(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<AwardedBadge>>>> {
    let badges = sqlx::query_as::<_, AwardedBadge>(
        r#"
        SELECT b.id, b.name, b.description, b.icon, ub.awarded_at
        FROM user_badges ub
        JOIN badges b ON b.id = ub.badge_id
        WHERE ub.user_id = $1
        ORDER BY ub.awarded_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Your badges retrieved", badges))
}
