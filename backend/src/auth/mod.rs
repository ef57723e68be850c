use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

pub mod middleware;

pub use middleware::{require_admin, require_auth, AuthUser};

/// Tokens are issued by the identity service; this backend only verifies them.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    JWT(jsonwebtoken::errors::Error),
    InvalidToken,
    TokenExpired,
    InvalidSignature,
    Forbidden,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing bearer token"),
            Self::JWT(e) => write!(f, "JWT error: {}", e),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::InvalidSignature => write!(f, "Invalid signature"),
            Self::Forbidden => write!(f, "Insufficient role"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::JWT(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::JWT(err)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::JWT(e),
        })?;

    let user_id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
    Ok(AuthUser {
        user_id,
        role: token_data.claims.role,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "test-secret";

    pub fn token_for(user_id: Uuid, role: Role, ttl_secs: i64) -> String {
        let exp = time::OffsetDateTime::now_utc().unix_timestamp() + ttl_secs;
        encode(
            &Header::default(),
            &Claims {
                sub: user_id.to_string(),
                role,
                exp: exp.max(0) as usize,
            },
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_valid_token() {
        let id = Uuid::new_v4();
        let user = validate_jwt(&token_for(id, Role::Admin, 600), TEST_SECRET).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_expired_token() {
        let token = token_for(Uuid::new_v4(), Role::User, -3600);
        assert!(matches!(validate_jwt(&token, TEST_SECRET), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = token_for(Uuid::new_v4(), Role::User, 600);
        assert!(matches!(validate_jwt(&token, "other"), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_role_defaults_to_user() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"x","exp":1}"#).unwrap();
        assert_eq!(claims.role, Role::User);
    }
}
