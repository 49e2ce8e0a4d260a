//! Storage abstraction for credo.
//!
//! Backend crates (e.g., credo-store-sqlite) implement this trait so the
//! server doesn't depend on any specific database engine or schema details.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Strongly-typed account identifier (avoid mixing strings arbitrarily).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(pub Uuid);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Email verification state of an account.
///
/// `Unverified` is the sole initial state; the only way back from
/// `Verified` is an email change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    Unverified,
    Verified,
}

impl VerificationStatus {
    pub fn is_verified(self) -> bool {
        matches!(self, VerificationStatus::Verified)
    }
}

/// Account record.
///
/// `verification_token` is `Some` exactly while the account is unverified;
/// `deleted_at` is the soft-delete tombstone and tombstoned rows are
/// excluded from every read path.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub verified: VerificationStatus,
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for creating an account.
///
/// The store assigns the id and timestamps. New accounts always start
/// unverified and non-admin; the caller supplies the initial verification
/// token alongside the already-hashed secret.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: String,
}

/// Optional filters for listing accounts.
#[derive(Clone, Debug, Default)]
pub struct AccountFilter {
    pub verified: Option<bool>,
    pub is_admin: Option<bool>,
}

/// The storage trait the server depends on.
///
/// Every method is a single-row atomic read or write; there is no
/// transaction surface. Email uniqueness among live rows is enforced by the
/// backend at write time (`AlreadyExists`), which backstops any
/// check-then-write race in the caller.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Create a new account (returns the persisted record).
    async fn create_account(&self, params: &NewAccount) -> Result<Account, StoreError>;

    /// Get a live account by id.
    async fn get_account(&self, id: &AccountId) -> Result<Account, StoreError>;

    /// Get the live account holding this verification token.
    async fn get_account_by_verification_token(&self, token: &str)
        -> Result<Account, StoreError>;

    /// List live accounts in creation order.
    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError>;

    /// Whether a live account other than `exclude` already holds this email.
    async fn email_in_use(
        &self,
        email: &str,
        exclude: Option<&AccountId>,
    ) -> Result<bool, StoreError>;

    /// Persist the mutable columns of the given record and bump `updated_at`.
    async fn update_account(&self, account: &Account) -> Result<Account, StoreError>;

    /// Soft-delete an account. Deleting an already-deleted or unknown
    /// account fails with `NotFound` (destroy is not idempotent).
    async fn delete_account(&self, id: &AccountId) -> Result<(), StoreError>;
}
