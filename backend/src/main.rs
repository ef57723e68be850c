use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{extract::State, middleware, Json, Router};
use mindpet_shared::constants::codes;
use mindpet_shared::rate_limit::{get_rate_limit_key, RateLimitCheck, RateLimitType};
use redis::{AsyncCommands, Client as RedisClient};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::{require_admin, require_auth, AuthUser};
use crate::config::Config;
use crate::crypto::FieldCipher;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::services::{
    badge_service, flip_feel_service, food_service, gratitude_service, journal_service, mood_service,
    pet_service, quest_service,
};

mod auth;
mod config;
mod crypto;
mod error;
mod logging;
mod models;
mod response;
mod services;
#[cfg(test)]
mod test_db;

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    redis: RedisClient,
    config: Arc<Config>,
    cipher: Arc<FieldCipher>,
}

impl AppState {
    pub fn new(pool: PgPool, redis: RedisClient, config: Config) -> Self {
        let cipher = FieldCipher::new(&config.field_encryption_key);
        Self {
            pool,
            redis,
            config: Arc::new(config),
            cipher: Arc::new(cipher),
        }
    }
}

pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    ApiResponse::ok("Service is healthy", "OK")
}

/// Counts one API hit against `key`. The window starts with the first hit.
async fn record_api_hit(conn: &mut redis::aio::Connection, key: &str) -> redis::RedisResult<u32> {
    let count: u32 = conn.incr(key, 1u32).await?;
    if count == 1 {
        let _: () = conn.expire(key, RateLimitType::Api.get_window().as_secs() as _).await?;
    }
    Ok(count)
}

/// Per-user request counter in Redis. Runs after `require_auth` so the caller
/// is known; if Redis is unreachable the request is let through.
async fn api_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: middleware::Next,
) -> Result<Response, AppError> {
    let user_id = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.user_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let rate_limit_key = get_rate_limit_key(RateLimitType::Api, &user_id);

    if let Ok(mut conn) = state.redis.get_async_connection().await {
        match record_api_hit(&mut conn, &rate_limit_key).await {
            Ok(count) => {
                let check = RateLimitCheck::new(count.saturating_sub(1), RateLimitType::Api);
                if check.is_locked {
                    warn!("🚦 Rate limit hit for user {}", user_id);
                    return Err(AppError::new(
                        StatusCode::TOO_MANY_REQUESTS,
                        codes::RATE_LIMITED,
                        RateLimitType::Api.get_error_message(),
                    ));
                }
            }
            Err(e) => debug!("Rate limit counter unavailable: {}", e),
        }
    }

    Ok(next.run(request).await)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, HeaderName::from_static("x-requested-with")])
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/quests", post(quest_service::create_quest))
        .route("/api/admin/daily-quests", post(quest_service::issue_daily_quest))
        .route("/api/admin/flip-feel/questions", post(flip_feel_service::create_question))
        .layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .route(
            "/api/pet",
            get(pet_service::get_pet_stats)
                .post(pet_service::create_pet)
                .patch(pet_service::rename_pet),
        )
        .route("/api/pet/pet", post(pet_service::pet_pet))
        .route("/api/pet/sleep", post(pet_service::sleep_pet))
        .route("/api/pet/wake", post(pet_service::wake_pet))
        .route("/api/pet/bath", post(pet_service::bath_pet))
        .route("/api/pet/bounce", post(pet_service::bounce_pet))
        .route("/api/pet/feed", post(pet_service::feed_pet))
        .route("/api/foods", get(food_service::get_food_catalog))
        .route("/api/foods/purchase", post(food_service::purchase_food))
        .route("/api/inventory", get(food_service::get_inventory))
        .route("/api/quests", get(quest_service::get_todays_quests))
        .route("/api/quests/stats", get(quest_service::get_quest_stats))
        .route("/api/quests/:id/claim", post(quest_service::claim_quest))
        .route(
            "/api/journals",
            get(journal_service::list_journals).post(journal_service::create_journal),
        )
        .route(
            "/api/journals/:id",
            get(journal_service::get_journal)
                .put(journal_service::update_journal)
                .delete(journal_service::soft_delete_journal),
        )
        .route("/api/journals/:id/permanent", delete(journal_service::hard_delete_journal))
        .route(
            "/api/gratitude",
            get(gratitude_service::list_gratitude).post(gratitude_service::create_gratitude),
        )
        .route(
            "/api/gratitude/:id",
            get(gratitude_service::get_gratitude)
                .put(gratitude_service::update_gratitude)
                .delete(gratitude_service::soft_delete_gratitude),
        )
        .route("/api/gratitude/:id/permanent", delete(gratitude_service::hard_delete_gratitude))
        .route("/api/moods", get(mood_service::list_moods).post(mood_service::create_mood))
        .route("/api/moods/today", get(mood_service::todays_moods))
        .route("/api/moods/:id", delete(mood_service::delete_mood))
        .route("/api/flip-feel/questions", get(flip_feel_service::list_questions))
        .route("/api/flip-feel/submit", post(flip_feel_service::submit_session))
        .route(
            "/api/flip-feel/sessions",
            get(flip_feel_service::list_sessions).post(flip_feel_service::start_session),
        )
        .route("/api/flip-feel/sessions/:id", get(flip_feel_service::get_session))
        .route("/api/flip-feel/sessions/:id/responses", post(flip_feel_service::answer_question))
        .route("/api/flip-feel/sessions/:id/finish", post(flip_feel_service::finish_session))
        .route("/api/badges", get(badge_service::list_badges))
        .route("/api/badges/mine", get(badge_service::my_badges))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), api_rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cache_control_layer =
        SetResponseHeaderLayer::if_not_present(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Router::new()
        .route("/api/health_check", get(health_check))
        .merge(protected_routes)
        .layer(cache_control_layer)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = Config::from_env()?;
    info!("Starting with {:?}", config);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied");

    let redis = RedisClient::open(config.redis_url.as_str())?;
    let addr = config.bind_addr;
    let app = create_router(AppState::new(pool, redis, config));

    info!("listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
