//! Postgres helpers for tests that exercise the SQL paths. Tests that use
//! them return early when `TEST_DATABASE_URL` is not set.
//!
//! The database is shared across parallel tests, so each test works on a
//! fresh user id and its own seeded rows instead of truncating tables.

use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::test_support::TEST_SECRET;
use crate::auth::{AuthUser, Role};
use crate::config::Config;
use crate::AppState;

pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set")
}

/// Connects and applies migrations. The migrator takes an advisory lock,
/// so concurrent tests can all call this.
pub async fn test_state() -> AppState {
    let database_url = test_db_url();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let config = Config {
        database_url,
        redis_url: "redis://127.0.0.1:1".into(),
        jwt_secret: TEST_SECRET.into(),
        field_encryption_key: [7; 32],
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        allowed_origins: Vec::new(),
        db_max_connections: 5,
    };
    let redis = RedisClient::open(config.redis_url.as_str()).unwrap();
    AppState::new(pool, redis, config)
}

pub fn new_user() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::User,
    }
}

pub async fn seed_food(pool: &PgPool, hunger_fill: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO foods (id, name, price, hunger_fill, xp_gain) VALUES ($1, $2, 5, $3, 10)")
        .bind(id)
        .bind(format!("Test snack {}", id))
        .bind(hunger_fill)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// A quest paying 10 coins, or one unit of `reward_food_id` when given.
pub async fn seed_quest(pool: &PgPool, reward_food_id: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    let reward_type = if reward_food_id.is_some() { "food" } else { "standard" };
    sqlx::query(
        "INSERT INTO quests (id, name, reward_money, reward_type, reward_food_id) VALUES ($1, $2, 10, $3, $4)",
    )
    .bind(id)
    .bind(format!("Test quest {}", id))
    .bind(reward_type)
    .bind(reward_food_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn issue_to(pool: &PgPool, quest_id: Uuid, owner_id: Uuid, issued_at: OffsetDateTime) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO daily_quests (id, quest_id, target_user_id, issued_at) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(quest_id)
        .bind(owner_id)
        .bind(issued_at)
        .execute(pool)
        .await
        .unwrap();
    id
}
