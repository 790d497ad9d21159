//! Session verification and admin authorization.
//!
//! Authentication itself is delegated to a hosted identity provider; this
//! module only verifies the HS256 session tokens it issues and exposes the
//! resulting identity to handlers. Admin authorization is a static
//! allow-list comparison against configuration ([`AdminAllowList`]), not a
//! role stored in the database: mutating admin routes use the throwing
//! [`AdminUser`] extractor, read-only branches use the boolean
//! [`is_admin`] form and degrade to "treat as non-admin".

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AdminAllowList, AppConfig};
use crate::AppState;

/// Claim structure of identity-provider session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (identity-provider user id)
    pub email: Option<String>, // User's email
    pub name: Option<String>,  // User's display name
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
}

/// Authenticated user data extracted from a verified session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Verifies session tokens issued by the hosted identity provider.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.session_secret,
            &config.session_issuer,
            &config.session_audience,
        )
    }

    /// Validate a session token and extract the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        Ok(claims)
    }
}

/// Authorization error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session token has expired")]
    TokenExpired,

    #[error("Admin access required")]
    NotAdmin,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, &str) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid session token",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Session token has expired",
            ),
            Self::NotAdmin => (
                StatusCode::FORBIDDEN,
                "AUTH_NOT_ADMIN",
                "Admin access required",
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Boolean admin query: treats verification failure as non-admin.
pub fn is_admin(allow_list: &AdminAllowList, user: Option<&AuthUser>) -> bool {
    user.map_or(false, |u| allow_list.contains(&u.user_id))
}

/// Extract a session identity from request headers, if one was supplied
fn extract_session(
    headers: &HeaderMap,
    verifier: &SessionVerifier,
) -> Option<Result<AuthUser, AuthError>> {
    let auth_value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_value.strip_prefix("Bearer ")?.trim();

    Some(verifier.verify(token).map(|claims| AuthUser {
        user_id: claims.sub,
        email: claims.email,
        name: claims.name,
    }))
}

/// Middleware that verifies a session token, when present, and stores the
/// identity in request extensions. Requests without credentials pass through
/// untouched; public endpoints accept them, protected extractors reject them.
/// A token that is present but invalid fails the request immediately.
pub async fn session_middleware(
    State(verifier): State<Arc<SessionVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_session(request.headers(), &verifier) {
        Some(Ok(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Some(Err(err)) => err.into_response(),
        None => next.run(request).await,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Optional identity for endpoints that serve both anonymous and
/// authenticated callers (e.g. coupon preview validation).
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthUser>().cloned()))
    }
}

/// Throwing admin guard: 401 without a session, 403 when the identity is
/// not on the configured allow-list. Every mutating admin route takes this.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)?;

        let app = AppState::from_ref(state);
        if !app.config.admin_allow_list.contains(&user.user_id) {
            return Err(AuthError::NotAdmin);
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_session_secret_that_is_long_enough_000";
    const ISSUER: &str = "storefront-identity";
    const AUDIENCE: &str = "storefront-api";

    fn mint(sub: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("user@example.com".to_string()),
            name: None,
            iat: now,
            exp: now + exp_offset_secs,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn verifies_valid_session_token() {
        let verifier = SessionVerifier::new(SECRET, ISSUER, AUDIENCE);
        let claims = verifier.verify(&mint("user_42", 3600)).expect("valid");
        assert_eq!(claims.sub, "user_42");
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = SessionVerifier::new(SECRET, ISSUER, AUDIENCE);
        let err = verifier.verify(&mint("user_42", -3600)).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let verifier = SessionVerifier::new("another_secret_that_is_long_enough_x", ISSUER, AUDIENCE);
        let err = verifier.verify(&mint("user_42", 3600)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn boolean_form_degrades_to_non_admin() {
        let allow = AdminAllowList::parse("admin_1");
        let admin = AuthUser {
            user_id: "admin_1".into(),
            email: None,
            name: None,
        };
        let visitor = AuthUser {
            user_id: "user_2".into(),
            email: None,
            name: None,
        };
        assert!(is_admin(&allow, Some(&admin)));
        assert!(!is_admin(&allow, Some(&visitor)));
        assert!(!is_admin(&allow, None));
    }
}
