use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_WINDOW: Duration = Duration::from_secs(60);
pub const API_MAX_REQUESTS: u32 = 3000;

pub const API_RATE_LIMIT_ERROR: &str = "Too many requests. Please slow down.";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitType {
    Api,
}

impl RateLimitType {
    pub fn get_window(&self) -> Duration {
        match self {
            Self::Api => API_WINDOW,
        }
    }

    pub fn get_max_attempts(&self) -> u32 {
        match self {
            Self::Api => API_MAX_REQUESTS,
        }
    }

    pub fn get_error_message(&self) -> &'static str {
        match self {
            Self::Api => API_RATE_LIMIT_ERROR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitCheck {
    pub current_attempts: u32,
    pub is_locked: bool,
}

impl RateLimitCheck {
    pub fn new(attempts: u32, limit_type: RateLimitType) -> Self {
        Self {
            current_attempts: attempts,
            is_locked: attempts >= limit_type.get_max_attempts(),
        }
    }
}

pub fn get_rate_limit_key(limit_type: RateLimitType, identifier: &str) -> String {
    format!(
        "rate_limit:{}:{}",
        match limit_type {
            RateLimitType::Api => "api",
        },
        identifier
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_threshold() {
        assert!(!RateLimitCheck::new(API_MAX_REQUESTS - 1, RateLimitType::Api).is_locked);
        assert!(RateLimitCheck::new(API_MAX_REQUESTS, RateLimitType::Api).is_locked);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(get_rate_limit_key(RateLimitType::Api, "abc"), "rate_limit:api:abc");
    }
}
