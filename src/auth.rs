/// Authentication extractors and utilities
///
/// Tokens are issued by the identity provider; this service only verifies
/// HS256 bearer tokens and reads the `sub` claim as the actor id.
use crate::{
    admin::Role,
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims this service relies on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Bearer token verifier
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry, returning the actor id
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Authentication("Invalid token signature".to_string())
                }
                _ => AppError::Authentication(format!("Invalid token: {}", e)),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Authentication(
                "Invalid token: empty 'sub' claim".to_string(),
            ));
        }

        Ok(data.claims.sub)
    }
}

/// Authenticated actor
#[derive(Debug, Clone)]
pub struct Actor {
    pub uid: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let uid = state.token_verifier.verify(&token)?;

        Ok(Actor { uid })
    }
}

/// Actor if a valid token was presented; anonymous otherwise
#[derive(Debug, Clone)]
pub struct OptionalActor(pub Option<Actor>);

#[async_trait]
impl FromRequestParts<AppContext> for OptionalActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let actor = extract_bearer_token(&parts.headers)
            .and_then(|token| state.token_verifier.verify(&token).ok())
            .map(|uid| Actor { uid });

        Ok(OptionalActor(actor))
    }
}

/// Authenticated actor holding at least the `Moderator` role
#[derive(Debug, Clone)]
pub struct AdminActor {
    pub uid: String,
    pub role: Role,
}

impl AdminActor {
    pub fn require(&self, required: Role) -> AppResult<()> {
        if !self.role.can_act_as(required) {
            return Err(AppError::Forbidden(format!(
                "Requires {} role or higher",
                required.as_str()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let Actor { uid } = Actor::from_request_parts(parts, state).await?;

        let role = state.roles.effective_role(&uid).await?.ok_or_else(|| {
            tracing::warn!(uid = %uid, "admin endpoint called without a role");
            AppError::Forbidden("Admin role required".to_string())
        })?;

        Ok(AdminActor { uid, role })
    }
}
