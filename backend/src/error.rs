use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mindpet_shared::constants::{codes, INTERNAL_ERROR_MESSAGE};
use mindpet_shared::pet::PetRuleError;
use mindpet_shared::quest::QuestClaimError;
use mindpet_shared::validation::ValidationError;
use tracing::error;

use crate::auth::AuthError;
use crate::crypto::CryptoError;
use crate::response::ApiResponse;

/// Application error carried to the HTTP boundary.
///
/// Operational errors are expected rule violations and are returned to the
/// caller as-is. Anything else is logged and reported as a generic 500.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub operational: bool,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            operational: true,
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: codes::INTERNAL_ERROR,
            message: detail.into(),
            operational: false,
        }
    }

    /// Maps a unique-constraint violation to a domain conflict; other
    /// database errors stay internal.
    pub fn from_unique_violation(err: sqlx::Error, code: &'static str, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::conflict(code, message),
            _ => err.into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(format!("Database error: {}", err))
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let message = err
            .message
            .clone()
            .map(|m| m.into_owned())
            .unwrap_or_else(|| err.code.to_string());
        Self::bad_request(codes::VALIDATION_ERROR, message)
    }
}

impl From<PetRuleError> for AppError {
    fn from(err: PetRuleError) -> Self {
        let status = match err {
            PetRuleError::InsufficientEnergy { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::CONFLICT,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<QuestClaimError> for AppError {
    fn from(err: QuestClaimError) -> Self {
        let status = match err {
            QuestClaimError::NotFound => StatusCode::NOT_FOUND,
            QuestClaimError::NotOwned => StatusCode::FORBIDDEN,
            QuestClaimError::AlreadyClaimed | QuestClaimError::Expired => StatusCode::CONFLICT,
            QuestClaimError::NotComplete => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => Self::unauthorized("Authentication required"),
            AuthError::TokenExpired => Self::unauthorized("Token has expired"),
            AuthError::InvalidToken | AuthError::InvalidSignature | AuthError::JWT(_) => {
                Self::unauthorized("Invalid token")
            }
            AuthError::Forbidden => Self::forbidden("You do not have access to this resource"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.operational {
            error!("{} - {}", self.code, self.message);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(codes::INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE)),
            )
                .into_response();
        }

        (self.status, Json(ApiResponse::failure(self.code, self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_operational_error_envelope() {
        let response = AppError::from(QuestClaimError::NotComplete).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], codes::QUEST_NOT_COMPLETE);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_internal_error_is_masked() {
        let response = AppError::from(CryptoError::Decrypt).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], codes::INTERNAL_ERROR);
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_pet_rule_statuses() {
        let err = AppError::from(PetRuleError::SleepNotCompleted { remaining_minutes: 12 });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, codes::SLEEP_NOT_COMPLETED);
        assert!(err.message.contains("12"));

        let err = AppError::from(PetRuleError::InsufficientEnergy { required: 10, current: 3 });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_unique_database_error_stays_internal() {
        let err = AppError::from_unique_violation(sqlx::Error::RowNotFound, codes::DUPLICATE_QUESTION, "dup");
        assert!(!err.operational);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
