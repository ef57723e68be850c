use axum::extract::State;
use axum::Json;
use mindpet_shared::constants::codes;
use mindpet_shared::validation::validate_purchase_quantity;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{Food, InventoryEntry, PetResponse};
use crate::response::ApiResponse;
use crate::services::pet_service::{lock_pet, pet_not_found, save_pet};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub food_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub food_id: Uuid,
    pub quantity_owned: i32,
    pub spent: i32,
    pub pet: PetResponse,
}

pub(crate) async fn find_food(conn: &mut PgConnection, food_id: Uuid) -> Result<Option<Food>, sqlx::Error> {
    sqlx::query_as::<_, Food>(
        "SELECT id, name, description, price, hunger_fill, xp_gain, is_active \
         FROM foods WHERE id = $1 AND is_active",
    )
    .bind(food_id)
    .fetch_optional(conn)
    .await
}

/// Adds `quantity` units to the owner's stack and returns the new total.
pub(crate) async fn add_to_inventory(
    conn: &mut PgConnection,
    owner_id: Uuid,
    food_id: Uuid,
    quantity: i32,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO inventory_items (id, owner_id, food_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (owner_id, food_id)
        DO UPDATE SET quantity = inventory_items.quantity + EXCLUDED.quantity, updated_at = NOW()
        RETURNING quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(food_id)
    .bind(quantity)
    .fetch_one(conn)
    .await
}

/// Removes one unit; the row is deleted when the last unit goes. Returns
/// `false` if the owner had none.
pub(crate) async fn consume_inventory(conn: &mut PgConnection, owner_id: Uuid, food_id: Uuid) -> Result<bool, sqlx::Error> {
    let item = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT id, quantity FROM inventory_items WHERE owner_id = $1 AND food_id = $2 FOR UPDATE",
    )
    .bind(owner_id)
    .bind(food_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((item_id, quantity)) = item else {
        return Ok(false);
    };

    if quantity <= 1 {
        sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(item_id)
            .execute(conn)
            .await?;
    } else {
        sqlx::query("UPDATE inventory_items SET quantity = quantity - 1, updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .execute(conn)
            .await?;
    }
    Ok(true)
}

pub async fn get_food_catalog(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Food>>>> {
    let foods = sqlx::query_as::<_, Food>(
        "SELECT id, name, description, price, hunger_fill, xp_gain, is_active \
         FROM foods WHERE is_active ORDER BY price, name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Food catalog retrieved", foods))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<InventoryEntry>>>> {
    let items = sqlx::query_as::<_, InventoryEntry>(
        r#"
        SELECT i.food_id, f.name, f.description, f.hunger_fill, f.xp_gain, i.quantity
        FROM inventory_items i
        JOIN foods f ON f.id = i.food_id
        WHERE i.owner_id = $1
        ORDER BY f.name
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Inventory retrieved", items))
}

pub async fn purchase_food(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PurchaseRequest>,
) -> AppResult<Json<ApiResponse<PurchaseResponse>>> {
    validate_purchase_quantity(request.quantity)?;

    let mut tx = state.pool.begin().await?;
    let food = find_food(&mut tx, request.food_id)
        .await?
        .ok_or_else(|| AppError::not_found(codes::FOOD_NOT_FOUND, "Food not found"))?;
    let mut pet = lock_pet(&mut tx, user.user_id).await?.ok_or_else(pet_not_found)?;

    let mut vitals = pet.vitals();
    let cost = food.price.checked_mul(request.quantity);
    if !cost.is_some_and(|cost| vitals.spend_coin(cost)) {
        debug!("🚫 User {} cannot afford {} x{}", user.user_id, food.name, request.quantity);
        return Err(AppError::bad_request(
            codes::INSUFFICIENT_COINS,
            format!("You need more coins to buy {} {}", request.quantity, food.name),
        ));
    }
    let spent = cost.unwrap_or_default();

    let now = OffsetDateTime::now_utc();
    pet.apply(vitals, now);
    save_pet(&mut tx, &pet).await?;
    let quantity_owned = add_to_inventory(&mut tx, user.user_id, food.id, request.quantity).await?;
    tx.commit().await?;

    info!("🛒 User {} bought {} x{} for {} coins", user.user_id, food.name, request.quantity, spent);
    Ok(ApiResponse::ok(
        "Purchase complete",
        PurchaseResponse {
            food_id: food.id,
            quantity_owned,
            spent,
            pet: pet.to_response(now),
        },
    ))
}
