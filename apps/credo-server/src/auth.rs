//! Bearer-token authentication: scopes, caller context, token codec.
//!
//! Token issuance belongs to the fronting identity provider; this module
//! only verifies HS256-signed bearer tokens against the shared secret and
//! produces the caller context the guard checks run against. The
//! `Authenticator` trait exists so tests can substitute the verifier.

use std::collections::HashSet;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use credo_storage::AccountId;

use crate::error::ApiError;
use crate::server::CredoServer;

/// Named permission grants carried by user tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    ReadGeneral,
    ManageAccount,
}

impl Scope {
    fn parse(value: &str) -> Option<Scope> {
        match value {
            "read-general" => Some(Scope::ReadGeneral),
            "manage-account" => Some(Scope::ManageAccount),
            _ => None,
        }
    }
}

/// An authenticated end user and the scopes its token grants.
#[derive(Clone, Debug)]
pub struct UserIdentity {
    pub account_id: AccountId,
    pub scopes: HashSet<Scope>,
}

impl UserIdentity {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// Caller context produced by the authenticator.
#[derive(Clone, Debug)]
pub enum AuthContext {
    /// Trusted client application; carries no end-user identity.
    Client,
    /// End user authenticated via a scoped token.
    User(UserIdentity),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Maps a presented bearer token to a caller context.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by credo bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// "client" for client-credential tokens, "user" for end-user tokens.
    #[serde(rename = "use")]
    pub token_use: String,
    /// Account id, required for user tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Granted scope names; unknown names are ignored at verification.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Unix-seconds expiry; absent means no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// HS256 verifier/issuer over base64url-without-padding segments.
pub struct HmacAuthenticator {
    secret: Vec<u8>,
}

impl HmacAuthenticator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Encode claims as a signed token. Used by the operator CLI and tests.
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthError::Encode(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| AuthError::Encode(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Encode(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::InvalidToken);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|_| AuthError::InvalidToken)?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_json).map_err(|_| AuthError::InvalidToken)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        serde_json::from_slice(&claims_json).map_err(|_| AuthError::InvalidToken)
    }
}

impl Authenticator for HmacAuthenticator {
    fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.decode(token)?;

        if let Some(exp) = claims.exp {
            if exp < Utc::now().timestamp() {
                return Err(AuthError::Expired);
            }
        }

        match claims.token_use.as_str() {
            "client" => Ok(AuthContext::Client),
            "user" => {
                let sub = claims.sub.ok_or(AuthError::InvalidToken)?;
                let id = Uuid::try_parse(&sub).map_err(|_| AuthError::InvalidToken)?;
                let scopes = claims
                    .scopes
                    .iter()
                    .filter_map(|s| Scope::parse(s))
                    .collect();
                Ok(AuthContext::User(UserIdentity {
                    account_id: AccountId(id),
                    scopes,
                }))
            }
            _ => Err(AuthError::InvalidToken),
        }
    }
}

#[async_trait]
impl FromRequestParts<CredoServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CredoServer,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;
        state
            .authenticator
            .authenticate(token)
            .map_err(|_| ApiError::Unauthenticated)
    }
}
