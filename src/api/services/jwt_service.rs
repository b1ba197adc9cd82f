//! JWT Service for token generation and validation.
//!
//! API clients normally authenticate with HTTP Basic (email + API key).
//! Clients that prefer not to send the API key on every request exchange it
//! for time-scoped JWT tokens:
//! - Access tokens: Short-lived (15 minutes) for API requests
//! - Refresh tokens: Longer-lived (7 days) for obtaining new access tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

const DEVELOPMENT_SECRET: &str = "dev-secret-do-not-use-in-production-change-me-now";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Realm the user belongs to
    pub realm_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token type: "access" or "refresh"
    pub token_type: TokenType,
    /// Session ID (for tracking/revocation)
    pub session_id: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token pair returned after authentication
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: i64,
    pub refresh_token_expires_at: i64,
    pub token_type: String,
}

/// JWT Service configuration
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl JwtService {
    /// Create a new JWT service with the given secret
    ///
    /// # Arguments
    /// * `secret` - The secret key for signing tokens (should be at least 32 bytes)
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(7),
        }
    }

    /// Create a JWT service from the JWT_SECRET environment variable.
    ///
    /// Returns an error if JWT_SECRET is not set or is too short in production.
    /// In development, falls back to an insecure default secret with a warning.
    pub fn try_from_env(is_development: bool) -> Result<Self, String> {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) => {
                if is_development {
                    warn!(
                        "JWT_SECRET not set! Using default secret for development. DO NOT USE IN PRODUCTION!"
                    );
                    DEVELOPMENT_SECRET.to_string()
                } else {
                    return Err(
                        "JWT_SECRET environment variable is required in production".to_string()
                    );
                }
            }
        };

        if secret.len() < 32 {
            if is_development {
                warn!("JWT_SECRET is less than 32 characters. Consider using a longer secret.");
            } else {
                return Err("JWT_SECRET must be at least 32 characters in production".to_string());
            }
        }

        Ok(Self::new(&secret))
    }

    /// Generate a token pair (access + refresh) for a user
    pub fn generate_token_pair(
        &self,
        user_id: i64,
        email: &str,
        realm_id: i64,
        session_id: &str,
    ) -> Result<TokenPair, String> {
        let now = Utc::now();

        let claims_for = |token_type: TokenType, exp: i64| Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            realm_id,
            exp,
            iat: now.timestamp(),
            token_type,
            session_id: session_id.to_string(),
        };

        // Access token
        let access_exp = now + self.access_token_duration;
        let access_token = encode(
            &Header::default(),
            &claims_for(TokenType::Access, access_exp.timestamp()),
            &self.encoding_key,
        )
        .map_err(|e| format!("Failed to encode access token: {}", e))?;

        // Refresh token
        let refresh_exp = now + self.refresh_token_duration;
        let refresh_token = encode(
            &Header::default(),
            &claims_for(TokenType::Refresh, refresh_exp.timestamp()),
            &self.encoding_key,
        )
        .map_err(|e| format!("Failed to encode refresh token: {}", e))?;

        info!(
            "Generated token pair for user {} (session: {}), access expires: {}, refresh expires: {}",
            user_id, session_id, access_exp, refresh_exp
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp.timestamp(),
            refresh_token_expires_at: refresh_exp.timestamp(),
            token_type: "Bearer".to_string(),
        })
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, String> {
        let token_data = self.decode_token(token)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err("Invalid token type: expected access token".to_string());
        }

        Ok(token_data.claims)
    }

    /// Validate a refresh token and return the claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, String> {
        let token_data = self.decode_token(token)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err("Invalid token type: expected refresh token".to_string());
        }

        Ok(token_data.claims)
    }

    /// Decode and validate a token (checks signature and expiration)
    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>, String> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidToken => "Invalid token format".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                "Invalid token signature".to_string()
            }
            _ => format!("Token validation failed: {}", e),
        })
    }

    /// Generate a new token pair from a valid refresh token
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, String> {
        let claims = self.validate_refresh_token(refresh_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| "Invalid subject claim".to_string())?;

        // Generate new token pair with same session ID
        self.generate_token_pair(user_id, &claims.email, claims.realm_id, &claims.session_id)
    }
}

/// Shared JWT service for use across the application
pub type SharedJwtService = Arc<JwtService>;
