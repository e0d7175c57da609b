use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use riskwatch_common::types::Identity;
use serde::{Deserialize, Serialize};

use crate::api::error_response;
use crate::config::AuthConfig;
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingToken,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::Expired => "token_expired",
            _ => "unauthorized",
        }
    }
}

/// Turns a bearer token into a verified [`Identity`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// HS256 JWT verification against a shared secret.
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

impl JwtIdentityProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
        }
    }

    /// Mints a token for `identity`, valid for `expire_secs`.
    pub fn issue_token(&self, identity: &Identity, expire_secs: u64) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: identity.subject.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + expire_secs,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::Invalid("empty subject".into()));
        }
        if self.issuer.is_some() && data.claims.iss != self.issuer {
            return Err(AuthError::Invalid("issuer mismatch".into()));
        }

        Ok(Identity {
            subject: data.claims.sub,
            email: data.claims.email,
            display_name: data.claims.name,
        })
    }
}

fn bearer_token(req: &Request<Body>) -> Result<&str, AuthError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::Invalid("invalid authorization header".into())),
    }
}

/// Verifies the bearer token and stores the caller's [`Identity`] in
/// request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    // No borrow of the request may cross the await.
    let token = bearer_token(&req).map(str::to_string);
    let verified = match token {
        Ok(token) => state.identity.verify(&token).await,
        Err(e) => Err(e),
    };

    match verified {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request");
            error_response(StatusCode::UNAUTHORIZED, &trace_id, e.code(), &e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(issuer: Option<&str>) -> JwtIdentityProvider {
        JwtIdentityProvider::new(&AuthConfig {
            jwt_secret: "test-secret".into(),
            issuer: issuer.map(String::from),
            token_expire_secs: 60,
        })
    }

    fn alice() -> Identity {
        Identity {
            subject: "alice".into(),
            email: Some("alice@example.com".into()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn issued_token_verifies() {
        let p = provider(Some("riskwatch"));
        let token = p.issue_token(&alice(), 60).unwrap();
        let identity = p.verify(&token).await.unwrap();
        assert_eq!(identity, alice());
    }

    #[tokio::test]
    async fn wrong_secret_or_issuer_is_rejected() {
        let token = provider(None).issue_token(&alice(), 60).unwrap();
        let other = JwtIdentityProvider::new(&AuthConfig {
            jwt_secret: "other".into(),
            ..AuthConfig::default()
        });
        assert!(matches!(
            other.verify(&token).await,
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            provider(Some("riskwatch")).verify(&token).await,
            Err(AuthError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let p = provider(None);
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "alice".into(),
            email: None,
            name: None,
            iss: None,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &p.encoding_key).unwrap();
        assert!(matches!(p.verify(&token).await, Err(AuthError::Expired)));
    }
}
