use axum::extract::State;
use axum::Json;
use mindpet_shared::constants::codes;
use mindpet_shared::pet::{PetRuleError, PetVitals, DEFAULT_SPECIES};
use mindpet_shared::validation::validate_pet_name;
use serde::Deserialize;
use sqlx::PgConnection;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{Pet, PetResponse, PET_COLUMNS};
use crate::response::{ApiResponse, Created};
use crate::services::food_service::{consume_inventory, find_food};
use crate::AppState;

const DEFAULT_PET_NAME: &str = "Mochi";

#[derive(Debug, Deserialize)]
pub struct PetNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub food_id: Uuid,
}

pub(crate) fn pet_not_found() -> AppError {
    AppError::not_found(codes::PET_NOT_FOUND, "You don't have a pet yet")
}

fn checked_pet_name(raw: &str) -> AppResult<String> {
    validate_pet_name(raw).map_err(|e| {
        let message = e.message.map(|m| m.into_owned()).unwrap_or_default();
        AppError::bad_request(codes::INVALID_PET_NAME, message)
    })
}

/// Locks the owner's pet row for the rest of the transaction.
pub(crate) async fn lock_pet(conn: &mut PgConnection, owner_id: Uuid) -> Result<Option<Pet>, sqlx::Error> {
    sqlx::query_as::<_, Pet>(&format!(
        "SELECT {} FROM pets WHERE owner_id = $1 FOR UPDATE",
        PET_COLUMNS
    ))
    .bind(owner_id)
    .fetch_optional(conn)
    .await
}

async fn insert_pet(conn: &mut PgConnection, owner_id: Uuid, name: &str, ignore_conflict: bool) -> Result<u64, sqlx::Error> {
    let vitals = PetVitals::hatchling();
    let conflict = if ignore_conflict { " ON CONFLICT (owner_id) DO NOTHING" } else { "" };
    let result = sqlx::query(&format!(
        "INSERT INTO pets (id, owner_id, name, species, level, experience, age_stage, mood, coin, \
         energy, hunger, cleanliness, happiness) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13){}",
        conflict
    ))
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(name)
    .bind(DEFAULT_SPECIES)
    .bind(vitals.level)
    .bind(vitals.experience)
    .bind(vitals.age_stage.as_ref())
    .bind(vitals.mood.as_ref())
    .bind(vitals.coin)
    .bind(vitals.energy)
    .bind(vitals.hunger)
    .bind(vitals.cleanliness)
    .bind(vitals.happiness)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Locks the owner's pet, hatching a default one first if none exists.
pub(crate) async fn lock_or_create_pet(conn: &mut PgConnection, owner_id: Uuid) -> Result<Pet, sqlx::Error> {
    if insert_pet(&mut *conn, owner_id, DEFAULT_PET_NAME, true).await? > 0 {
        info!("🥚 Hatched default pet for user {}", owner_id);
    }
    lock_pet(conn, owner_id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub(crate) async fn save_pet(conn: &mut PgConnection, pet: &Pet) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pets SET
            level = $2,
            experience = $3,
            age_stage = $4,
            mood = $5,
            coin = $6,
            energy = $7,
            hunger = $8,
            cleanliness = $9,
            happiness = $10,
            sleep_until = $11,
            last_interaction_at = $12
        WHERE id = $1
        "#,
    )
    .bind(pet.id)
    .bind(pet.level)
    .bind(pet.experience)
    .bind(pet.age_stage.as_ref())
    .bind(pet.mood.as_ref())
    .bind(pet.coin)
    .bind(pet.energy)
    .bind(pet.hunger)
    .bind(pet.cleanliness)
    .bind(pet.happiness)
    .bind(pet.sleep_until)
    .bind(pet.last_interaction_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Runs one pet action under a row lock and persists the result.
async fn run_action<F>(state: &AppState, owner_id: Uuid, action: &'static str, apply: F) -> AppResult<Pet>
where
    F: FnOnce(&mut PetVitals, OffsetDateTime) -> Result<(), PetRuleError>,
{
    let mut tx = state.pool.begin().await?;
    let mut pet = lock_pet(&mut tx, owner_id).await?.ok_or_else(pet_not_found)?;

    let now = OffsetDateTime::now_utc();
    let mut vitals = pet.vitals();
    if let Err(e) = apply(&mut vitals, now) {
        debug!("🚫 {} rejected for pet {}: {}", action, pet.id, e);
        return Err(e.into());
    }

    pet.apply(vitals, now);
    save_pet(&mut tx, &pet).await?;
    tx.commit().await?;

    info!("🐾 {} for pet {} (coin {}, energy {})", action, pet.id, pet.coin, pet.energy);
    Ok(pet)
}

pub async fn get_pet_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let mut tx = state.pool.begin().await?;
    let mut pet = lock_or_create_pet(&mut tx, user.user_id).await?;

    // Rows written before a level-curve change are healed on read
    let mut vitals = pet.vitals();
    if vitals.update_level() {
        pet.level = vitals.level;
        pet.age_stage = vitals.age_stage;
        save_pet(&mut tx, &pet).await?;
    }
    tx.commit().await?;

    let now = OffsetDateTime::now_utc();
    Ok(ApiResponse::ok("Pet stats retrieved", pet.to_response(now)))
}

pub async fn create_pet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PetNameRequest>,
) -> AppResult<Created<PetResponse>> {
    let name = checked_pet_name(&request.name)?;

    let mut conn = state.pool.acquire().await?;
    insert_pet(&mut conn, user.user_id, &name, false)
        .await
        .map_err(|e| AppError::from_unique_violation(e, codes::PET_ALREADY_EXISTS, "You already have a pet"))?;
    let pet = sqlx::query_as::<_, Pet>(&format!("SELECT {} FROM pets WHERE owner_id = $1", PET_COLUMNS))
        .bind(user.user_id)
        .fetch_one(&mut *conn)
        .await?;

    info!("🥚 User {} adopted {}", user.user_id, pet.name);
    Ok(ApiResponse::created("Pet created", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn rename_pet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PetNameRequest>,
) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let name = checked_pet_name(&request.name)?;

    let pet = sqlx::query_as::<_, Pet>(&format!(
        "UPDATE pets SET name = $2 WHERE owner_id = $1 RETURNING {}",
        PET_COLUMNS
    ))
    .bind(user.user_id)
    .bind(&name)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(pet_not_found)?;

    Ok(ApiResponse::ok("Pet renamed", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn pet_pet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let pet = run_action(&state, user.user_id, "Pet", |vitals, now| vitals.pet(now)).await?;
    Ok(ApiResponse::ok("Your pet loved that", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn sleep_pet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let pet = run_action(&state, user.user_id, "Sleep", |vitals, now| vitals.sleep(now).map(|_| ())).await?;
    Ok(ApiResponse::ok("Your pet is asleep", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn wake_pet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let pet = run_action(&state, user.user_id, "Wake", |vitals, now| vitals.wake(now)).await?;
    Ok(ApiResponse::ok("Your pet woke up", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn bath_pet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let pet = run_action(&state, user.user_id, "Bath", |vitals, now| vitals.bath(now)).await?;
    Ok(ApiResponse::ok("Squeaky clean", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn bounce_pet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let pet = run_action(&state, user.user_id, "Bounce", |vitals, now| vitals.bounce(now)).await?;
    Ok(ApiResponse::ok("Boing!", pet.to_response(OffsetDateTime::now_utc())))
}

pub async fn feed_pet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FeedRequest>,
) -> AppResult<Json<ApiResponse<PetResponse>>> {
    let mut tx = state.pool.begin().await?;

    let food = find_food(&mut tx, request.food_id)
        .await?
        .ok_or_else(|| AppError::not_found(codes::FOOD_NOT_FOUND, "Food not found"))?;
    let mut pet = lock_pet(&mut tx, user.user_id).await?.ok_or_else(pet_not_found)?;

    let now = OffsetDateTime::now_utc();
    let mut vitals = pet.vitals();
    let leveled = vitals.feed(food.effect(), now)?;

    if !consume_inventory(&mut tx, user.user_id, food.id).await? {
        debug!("🚫 User {} has no {} to feed", user.user_id, food.name);
        return Err(AppError::bad_request(
            codes::FOOD_NOT_IN_INVENTORY,
            format!("You don't have any {} left", food.name),
        ));
    }

    pet.apply(vitals, now);
    save_pet(&mut tx, &pet).await?;
    tx.commit().await?;

    if leveled {
        info!("⭐ Pet {} reached level {}", pet.id, pet.level);
    }
    info!("🍖 Pet {} ate {}", pet.id, food.name);
    Ok(ApiResponse::ok("Yum!", pet.to_response(now)))
}
