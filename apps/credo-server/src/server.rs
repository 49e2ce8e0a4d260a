//! Shared server state and guard helpers.

use std::sync::Arc;

use credo_storage::{Account, AccountId, Store, StoreError};

use crate::auth::{AuthContext, Authenticator, Scope};
use crate::config::ServerConfig;
use crate::email::{EmailProvider, TokenGenerator};
use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// Outbound email dispatch bundle: provider plus sender identity.
pub struct Mailer {
    pub provider: Arc<dyn EmailProvider>,
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Clone)]
pub struct CredoServer {
    pub store: Arc<dyn Store>,
    pub authenticator: Arc<dyn Authenticator>,
    pub mailer: Option<Arc<Mailer>>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub config: Arc<ServerConfig>,
}

impl CredoServer {
    pub fn new(
        store: Arc<dyn Store>,
        authenticator: Arc<dyn Authenticator>,
        mailer: Option<Arc<Mailer>>,
        tokens: Arc<dyn TokenGenerator>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            store,
            authenticator,
            mailer,
            tokens,
            config,
        }
    }

    /// Operations restricted to trusted client applications.
    pub fn require_client(&self, ctx: &AuthContext) -> Result<(), ApiError> {
        match ctx {
            AuthContext::Client => Ok(()),
            AuthContext::User(_) => Err(ApiError::Unauthenticated),
        }
    }

    /// Resolve the calling user identity to its live account.
    ///
    /// A syntactically valid token whose account no longer exists is an
    /// authentication failure, not a 404.
    pub async fn require_user(&self, ctx: &AuthContext) -> Result<Account, ApiError> {
        let identity = match ctx {
            AuthContext::User(identity) => identity,
            AuthContext::Client => return Err(ApiError::Unauthenticated),
        };
        match self.store.get_account(&identity.account_id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(ApiError::Unauthenticated),
            Err(err) => Err(err.into()),
        }
    }

    /// Authentication first (401), then the scope on the token (403), then
    /// the caller's account is loaded.
    pub async fn require_scope(
        &self,
        ctx: &AuthContext,
        scope: Scope,
    ) -> Result<Account, ApiError> {
        let identity = match ctx {
            AuthContext::User(identity) => identity,
            AuthContext::Client => return Err(ApiError::Unauthenticated),
        };
        if !identity.has_scope(scope) {
            return Err(ApiError::Forbidden("Invalid scopes provided."));
        }
        self.require_user(ctx).await
    }

    /// Resolve a path-supplied target; missing or tombstoned → 404.
    pub async fn get_live_account(&self, id: &AccountId) -> Result<Account, ApiError> {
        self.store.get_account(id).await.map_err(ApiError::from)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }
}
