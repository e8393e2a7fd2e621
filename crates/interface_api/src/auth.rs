//! Authentication
//!
//! Reviewers present a JWT whose `sub` is their reviewer id and whose first
//! `roles` entry is the role they act under. Role membership itself is owned
//! by the user-management layer that issues the token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::ReviewerId;
use domain_workflow::{ReviewerRef, RoleName};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (reviewer ID)
    pub sub: String,
    /// Reviewer's roles; the first is the acting role
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// The reviewer these claims identify
    pub fn reviewer(&self) -> Result<ReviewerRef, AuthError> {
        let id: ReviewerId = self.sub.parse().map_err(|_| AuthError::InvalidSubject(self.sub.clone()))?;
        let role = self.roles.first().ok_or(AuthError::MissingRole)?;
        Ok(ReviewerRef::new(id, RoleName::new(role.as_str())))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject '{0}' is not a reviewer id")]
    InvalidSubject(String),
    #[error("Token carries no role")]
    MissingRole,
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `reviewer_id` - Reviewer identifier
/// * `roles` - Reviewer's roles, acting role first
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    reviewer_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: reviewer_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
