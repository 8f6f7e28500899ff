use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Verified identity extracted from a bearer token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant: String,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
}

/// Token verification fails closed: any defect in the token surfaces as a
/// distinct variant rather than a silently-empty claim set.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token expired")]
    Expired,
    #[error("insufficient scope: need {needed:?}")]
    InsufficientScope { needed: Vec<String> },
}

impl AuthError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing_token",
            Self::Malformed(_) => "malformed_token",
            Self::Expired => "token_expired",
            Self::InsufficientScope { .. } => "insufficient_scope",
        }
    }
}

/// Wire shape of the token payload. `exp` is consumed by validation and not
/// carried into [`Claims`].
#[derive(Debug, Deserialize)]
struct TokenPayload {
    sub: String,
    #[serde(default = "default_tenant")]
    tenant: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    scopes: Vec<String>,
}

fn default_tenant() -> String {
    "default".to_string()
}

/// Decode and validate an HS256 token. `exp` and `sub` are mandatory.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if token.is_empty() {
        return Err(AuthError::Missing);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed(e.to_string()),
    })?;

    Ok(Claims {
        sub: data.claims.sub,
        tenant: data.claims.tenant,
        roles: data.claims.roles,
        scopes: data.claims.scopes,
    })
}

/// Require every needed scope to be granted (exact subset match).
pub fn require_scopes(claims: &Claims, needed: &[&str]) -> Result<(), AuthError> {
    let granted: HashSet<&str> = claims.scopes.iter().map(String::as_str).collect();
    if needed.iter().all(|s| granted.contains(s)) {
        Ok(())
    } else {
        Err(AuthError::InsufficientScope {
            needed: needed.iter().map(|s| s.to_string()).collect(),
        })
    }
}
