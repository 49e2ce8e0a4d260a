//! Handler modules for the accounts HTTP surface
//!
//! This module contains handler functions organized by domain:
//! - accounts: create, list, show, update, destroy, me
//! - verification: verify, resend
//!
//! The router below is the only place routes and handlers meet; every
//! guard check runs inside the handlers as an ordered checklist.

pub mod accounts;
pub mod verification;

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use credo_storage::Account;

use crate::server::CredoServer;

/// Outward projection of an account. The password hash and verification
/// token never leave the service.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub identifier: String,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub is_admin: bool,
    pub registered_at: DateTime<Utc>,
    pub last_change: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_date: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            identifier: account.id.to_string(),
            name: account.name,
            email: account.email,
            is_verified: account.verified.is_verified(),
            is_admin: account.is_admin,
            registered_at: account.created_at,
            last_change: account.updated_at,
            deleted_date: account.deleted_at,
        }
    }
}

/// Confirmation envelope for verify/resend.
#[derive(Clone, Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub code: u16,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            code: 200,
        }
    }
}

pub fn router(server: CredoServer) -> Router {
    Router::new()
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route("/accounts/me", get(accounts::me))
        .route("/accounts/verify/:token", get(verification::verify))
        .route(
            "/accounts/:id",
            get(accounts::show)
                .put(accounts::update)
                .delete(accounts::destroy),
        )
        .route("/accounts/:id/resend", get(verification::resend))
        .with_state(server)
}
