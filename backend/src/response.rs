use axum::http::StatusCode;
use axum::Json;
use mindpet_shared::constants::codes;
use serde::Serialize;

/// Envelope wrapped around every response body, errors included.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
    pub data: Option<T>,
}

pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            code: codes::OK,
            message: message.into(),
            data: Some(data),
        })
    }

    pub fn created(message: impl Into<String>, data: T) -> Created<T> {
        (
            StatusCode::CREATED,
            Json(Self {
                success: true,
                code: codes::CREATED,
                message: message.into(),
                data: Some(data),
            }),
        )
    }
}

impl ApiResponse<()> {
    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            data: None,
        }
    }
}
