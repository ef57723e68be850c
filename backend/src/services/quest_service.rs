use axum::extract::{Path, State};
use axum::Json;
use mindpet_shared::constants::{codes, QUEST_DESCRIPTION_MAX_LENGTH, QUEST_NAME_MAX_LENGTH};
use mindpet_shared::pet::Reward;
use mindpet_shared::quest::{
    check_claimable, day_bounds, missing_daily_quests, QuestClaimError, QuestRewardType, QuestStatus,
    QuestStatusCounts,
};
use mindpet_shared::validation::{validate_non_negative, validate_optional_text, validate_text};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::PetResponse;
use crate::response::{ApiResponse, Created};
use crate::services::food_service::{add_to_inventory, find_food};
use crate::services::local_now;
use crate::services::pet_service::{lock_or_create_pet, save_pet};
use crate::AppState;

/// A user quest joined with its definition.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserQuestView {
    pub id: Uuid,
    pub daily_quest_id: Uuid,
    pub quest_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: QuestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub claimed_at: Option<OffsetDateTime>,
    pub name: String,
    pub description: String,
    pub reward_money: i32,
    pub reward_experience: i32,
    pub reward_hunger: i32,
    #[sqlx(try_from = "String")]
    pub reward_type: QuestRewardType,
    pub reward_food_id: Option<Uuid>,
    pub tag: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ClaimTarget {
    owner_id: Uuid,
    #[sqlx(try_from = "String")]
    status: QuestStatus,
    expires_at: OffsetDateTime,
    reward_money: i32,
    reward_experience: i32,
    reward_hunger: i32,
    #[sqlx(try_from = "String")]
    reward_type: QuestRewardType,
    reward_food_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ClaimedReward {
    pub money: i32,
    pub experience: i32,
    pub hunger: i32,
    pub food_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub user_quest_id: Uuid,
    pub reward: ClaimedReward,
    pub leveled_up: bool,
    pub pet: PetResponse,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct QuestDefinition {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub reward_money: i32,
    pub reward_experience: i32,
    pub reward_hunger: i32,
    #[sqlx(try_from = "String")]
    pub reward_type: QuestRewardType,
    pub reward_food_id: Option<Uuid>,
    pub tag: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reward_money: i32,
    #[serde(default)]
    pub reward_experience: i32,
    #[serde(default)]
    pub reward_hunger: i32,
    #[serde(default)]
    pub reward_type: Option<QuestRewardType>,
    #[serde(default)]
    pub reward_food_id: Option<Uuid>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueDailyQuestRequest {
    pub quest_id: Uuid,
    #[serde(default)]
    pub target_user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailyQuest {
    pub id: Uuid,
    pub quest_id: Uuid,
    pub target_user_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

/// Today's quests for `owner_id`, creating any missing user quests first.
/// Only active quests get new instances; instances that already exist are
/// listed even after their quest is deactivated.
/// Safe to call concurrently: the `(owner_id, daily_quest_id)` unique index
/// makes the insert a no-op for rows another request already created.
pub async fn quests_for_today(pool: &PgPool, owner_id: Uuid, now: OffsetDateTime) -> Result<Vec<UserQuestView>, sqlx::Error> {
    let today = day_bounds(now);

    let issued = sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        SELECT dq.id, q.is_active
        FROM daily_quests dq
        JOIN quests q ON q.id = dq.quest_id
        WHERE dq.issued_at BETWEEN $1 AND $2
          AND (dq.target_user_id IS NULL OR dq.target_user_id = $3)
        ORDER BY dq.issued_at
        "#,
    )
    .bind(today.start)
    .bind(today.end)
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    if issued.is_empty() {
        return Ok(Vec::new());
    }

    let daily_ids: Vec<Uuid> = issued.iter().map(|(id, _)| *id).collect();
    let active_ids: Vec<Uuid> = issued.iter().filter(|(_, active)| *active).map(|(id, _)| *id).collect();

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT daily_quest_id FROM user_quests WHERE owner_id = $1 AND daily_quest_id = ANY($2)",
    )
    .bind(owner_id)
    .bind(&daily_ids)
    .fetch_all(pool)
    .await?;

    let mut created = 0;
    for daily_quest_id in missing_daily_quests(&active_ids, &existing) {
        created += sqlx::query(
            r#"
            INSERT INTO user_quests (id, owner_id, daily_quest_id, quest_id, status, expires_at)
            SELECT $1, $2, dq.id, dq.quest_id, $4, $5
            FROM daily_quests dq
            WHERE dq.id = $3
            ON CONFLICT (owner_id, daily_quest_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(daily_quest_id)
        .bind(QuestStatus::Pending.as_ref())
        .bind(today.end)
        .execute(pool)
        .await?
        .rows_affected();
    }
    if created > 0 {
        info!("📜 Created {} quests for user {}", created, owner_id);
    }

    sqlx::query_as::<_, UserQuestView>(
        r#"
        SELECT uq.id, uq.daily_quest_id, uq.quest_id, uq.status, uq.expires_at, uq.claimed_at,
               q.name, q.description, q.reward_money, q.reward_experience, q.reward_hunger,
               q.reward_type, q.reward_food_id, q.tag
        FROM user_quests uq
        JOIN quests q ON q.id = uq.quest_id
        WHERE uq.owner_id = $1 AND uq.daily_quest_id = ANY($2)
        ORDER BY uq.created_at, uq.id
        "#,
    )
    .bind(owner_id)
    .bind(&daily_ids)
    .fetch_all(pool)
    .await
}

pub async fn get_todays_quests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<UserQuestView>>>> {
    let quests = quests_for_today(&state.pool, user.user_id, local_now()).await?;
    Ok(ApiResponse::ok("Quests retrieved", quests))
}

pub async fn get_quest_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<QuestStatusCounts>>> {
    let quests = quests_for_today(&state.pool, user.user_id, local_now()).await?;
    let counts = QuestStatusCounts::tally(quests.iter().map(|quest| quest.status));
    Ok(ApiResponse::ok("Quest stats retrieved", counts))
}

pub async fn claim_quest(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_quest_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ClaimResponse>>> {
    let mut tx = state.pool.begin().await?;

    let target = sqlx::query_as::<_, ClaimTarget>(
        r#"
        SELECT uq.owner_id, uq.status, uq.expires_at,
               q.reward_money, q.reward_experience, q.reward_hunger, q.reward_type, q.reward_food_id
        FROM user_quests uq
        JOIN quests q ON q.id = uq.quest_id
        WHERE uq.id = $1
        FOR UPDATE OF uq
        "#,
    )
    .bind(user_quest_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(QuestClaimError::NotFound)?;

    let now = OffsetDateTime::now_utc();
    if let Err(e) = check_claimable(user.user_id, target.owner_id, target.status, target.expires_at, now) {
        debug!("🚫 Claim of quest {} by {} rejected: {}", user_quest_id, user.user_id, e);
        return Err(e.into());
    }

    let mut pet = lock_or_create_pet(&mut tx, user.user_id).await?;
    let mut vitals = pet.vitals();
    let leveled_up = vitals.apply_reward(Reward {
        money: target.reward_money,
        experience: target.reward_experience,
        hunger: target.reward_hunger,
    });
    pet.apply(vitals, now);
    save_pet(&mut tx, &pet).await?;

    let food_id = match (target.reward_type, target.reward_food_id) {
        (QuestRewardType::Food, Some(food_id)) => {
            add_to_inventory(&mut tx, user.user_id, food_id, 1).await?;
            Some(food_id)
        }
        _ => None,
    };

    let updated = sqlx::query("UPDATE user_quests SET status = $2, claimed_at = $3 WHERE id = $1 AND status = $4")
        .bind(user_quest_id)
        .bind(QuestStatus::Claimed.as_ref())
        .bind(now)
        .bind(QuestStatus::Complete.as_ref())
        .execute(&mut *tx)
        .await?;
    if updated.rows_affected() != 1 {
        return Err(QuestClaimError::AlreadyClaimed.into());
    }

    tx.commit().await?;
    info!("🎁 User {} claimed quest {}", user.user_id, user_quest_id);

    Ok(ApiResponse::ok(
        "Quest reward claimed",
        ClaimResponse {
            user_quest_id,
            reward: ClaimedReward {
                money: target.reward_money,
                experience: target.reward_experience,
                hunger: target.reward_hunger,
                food_id,
            },
            leveled_up,
            pet: pet.to_response(now),
        },
    ))
}

pub async fn create_quest(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateQuestRequest>,
) -> AppResult<Created<QuestDefinition>> {
    validate_text("name", &request.name, QUEST_NAME_MAX_LENGTH)?;
    validate_optional_text("description", request.description.as_deref(), QUEST_DESCRIPTION_MAX_LENGTH)?;
    validate_non_negative("reward_money", request.reward_money)?;
    validate_non_negative("reward_experience", request.reward_experience)?;
    validate_non_negative("reward_hunger", request.reward_hunger)?;

    let reward_type = request.reward_type.unwrap_or(QuestRewardType::Standard);
    let mut tx = state.pool.begin().await?;
    match (reward_type, request.reward_food_id) {
        (QuestRewardType::Food, None) => {
            return Err(AppError::bad_request(
                codes::VALIDATION_ERROR,
                "reward_food_id is required for food rewards",
            ));
        }
        (_, Some(food_id)) => {
            find_food(&mut tx, food_id)
                .await?
                .ok_or_else(|| AppError::not_found(codes::FOOD_NOT_FOUND, "Food not found"))?;
        }
        (QuestRewardType::Standard, None) => {}
    }

    let quest = sqlx::query_as::<_, QuestDefinition>(
        r#"
        INSERT INTO quests (id, name, description, reward_money, reward_experience, reward_hunger,
                            reward_type, reward_food_id, tag)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, name, description, reward_money, reward_experience, reward_hunger,
                  reward_type, reward_food_id, tag, is_active
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.name.trim())
    .bind(request.description.as_deref().unwrap_or_default())
    .bind(request.reward_money)
    .bind(request.reward_experience)
    .bind(request.reward_hunger)
    .bind(reward_type.as_ref())
    .bind(request.reward_food_id)
    .bind(request.tag.as_deref())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("📜 Admin {} created quest {}", user.user_id, quest.name);
    Ok(ApiResponse::created("Quest created", quest))
}

pub async fn issue_daily_quest(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<IssueDailyQuestRequest>,
) -> AppResult<Created<DailyQuest>> {
    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM quests WHERE id = $1")
        .bind(request.quest_id)
        .fetch_optional(&state.pool)
        .await?;
    if active != Some(true) {
        return Err(QuestClaimError::NotFound.into());
    }

    let daily = sqlx::query_as::<_, DailyQuest>(
        r#"
        INSERT INTO daily_quests (id, quest_id, target_user_id, issued_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, quest_id, target_user_id, issued_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.quest_id)
    .bind(request.target_user_id)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&state.pool)
    .await?;

    info!(
        "📜 Admin {} issued quest {} to {}",
        user.user_id,
        request.quest_id,
        request.target_user_id.map_or_else(|| "everyone".to_string(), |id| id.to_string())
    );
    Ok(ApiResponse::created("Daily quest issued", daily))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db::{has_test_db, issue_to, new_user, seed_food, seed_quest, test_state};

    async fn owned_quest_count(pool: &PgPool, owner_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_quests WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn mark_complete(pool: &PgPool, user_quest_id: Uuid) {
        sqlx::query("UPDATE user_quests SET status = 'complete' WHERE id = $1")
            .bind(user_quest_id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_daily_quests_created_once() {
        if !has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
        let state = test_state().await;
        let user = new_user();
        let now = local_now();
        for _ in 0..3 {
            let quest_id = seed_quest(&state.pool, None).await;
            issue_to(&state.pool, quest_id, user.user_id, now).await;
        }

        let first = quests_for_today(&state.pool, user.user_id, now).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|quest| quest.status == QuestStatus::Pending));
        assert_eq!(owned_quest_count(&state.pool, user.user_id).await, 3);

        let second = quests_for_today(&state.pool, user.user_id, now).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(owned_quest_count(&state.pool, user.user_id).await, 3);
        let first_ids: Vec<Uuid> = first.iter().map(|quest| quest.id).collect();
        let second_ids: Vec<Uuid> = second.iter().map(|quest| quest.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn test_deactivated_quest_stays_listed() {
        if !has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
        let state = test_state().await;
        let user = new_user();
        let now = local_now();
        let kept = seed_quest(&state.pool, None).await;
        issue_to(&state.pool, kept, user.user_id, now).await;

        let listed = quests_for_today(&state.pool, user.user_id, now).await.unwrap();
        assert_eq!(listed.len(), 1);
        mark_complete(&state.pool, listed[0].id).await;

        // Deactivate the quest the user already holds and issue one that
        // was inactive before the user ever saw it.
        let never_seen = seed_quest(&state.pool, None).await;
        issue_to(&state.pool, never_seen, user.user_id, now).await;
        sqlx::query("UPDATE quests SET is_active = FALSE WHERE id = ANY($1)")
            .bind(vec![kept, never_seen])
            .execute(&state.pool)
            .await
            .unwrap();

        let listed = quests_for_today(&state.pool, user.user_id, now).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].quest_id, kept);
        assert_eq!(listed[0].status, QuestStatus::Complete);
        assert_eq!(owned_quest_count(&state.pool, user.user_id).await, 1);

        let counts = QuestStatusCounts::tally(listed.iter().map(|quest| quest.status));
        assert_eq!(counts, QuestStatusCounts::tally([QuestStatus::Complete]));
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        if !has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
        let state = test_state().await;
        let user = new_user();
        let now = local_now();
        let food_id = seed_food(&state.pool, 10).await;
        let quest_id = seed_quest(&state.pool, Some(food_id)).await;
        issue_to(&state.pool, quest_id, user.user_id, now).await;
        let user_quest_id = quests_for_today(&state.pool, user.user_id, now).await.unwrap()[0].id;

        let err = claim_quest(State(state.clone()), user, Path(user_quest_id)).await.unwrap_err();
        assert_eq!(err.code, codes::QUEST_NOT_COMPLETE);

        mark_complete(&state.pool, user_quest_id).await;
        let Json(claimed) = claim_quest(State(state.clone()), user, Path(user_quest_id)).await.unwrap();
        let claimed = claimed.data.unwrap();
        assert_eq!(claimed.reward.money, 10);
        assert_eq!(claimed.reward.food_id, Some(food_id));
        assert_eq!(claimed.pet.stats.coin, 10);

        let err = claim_quest(State(state.clone()), user, Path(user_quest_id)).await.unwrap_err();
        assert_eq!(err.code, codes::QUEST_ALREADY_CLAIMED);

        let quantity = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM inventory_items WHERE owner_id = $1 AND food_id = $2",
        )
        .bind(user.user_id)
        .bind(food_id)
        .fetch_one(&state.pool)
        .await
        .unwrap();
        assert_eq!(quantity, 1);
    }
}
