//! Account lifecycle handlers: create, list, show, update, destroy, me.
//!
//! Each handler runs its guard checklist in order (caller context, scope,
//! target resolution, ability) before touching the account, and validates
//! every supplied field before any mutation. Updates are all-or-nothing:
//! the diff is computed in memory and persisted in a single write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use credo_storage::{AccountFilter, AccountId, NewAccount, StoreError, VerificationStatus};

use crate::auth::{AuthContext, Scope};
use crate::authz;
use crate::error::{ApiError, ValidationErrors};
use crate::password;
use crate::server::CredoServer;

use super::AccountResponse;

const MAX_FIELD_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub is_verified: Option<bool>,
    pub is_admin: Option<bool>,
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain, no
/// whitespace.
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    } else if name.len() > MAX_FIELD_LEN {
        errors.add("name", "The name may not be greater than 255 characters.");
    }
}

fn validate_email_shape(email: &str, errors: &mut ValidationErrors) {
    if email.is_empty() {
        errors.add("email", "The email field is required.");
        return;
    }
    if email.len() > MAX_FIELD_LEN {
        errors.add("email", "The email may not be greater than 255 characters.");
    }
    if !is_valid_email(email) {
        errors.add("email", "The email must be a valid email address.");
    }
}

fn email_taken() -> ApiError {
    let mut errors = ValidationErrors::default();
    errors.add("email", "The email has already been taken.");
    ApiError::Validation(errors)
}

fn hash_or_internal(password: &str) -> Result<String, ApiError> {
    password::hash_password(password).map_err(|err| {
        tracing::error!("password hashing failed: {err}");
        ApiError::Internal
    })
}

pub async fn create(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Json(body): Json<CreateAccountBody>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    server.require_client(&ctx)?;

    let mut errors = ValidationErrors::default();

    let name = body.name.as_deref().unwrap_or("").trim().to_string();
    validate_name(&name, &mut errors);

    let email = body
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    validate_email_shape(&email, &mut errors);
    if is_valid_email(&email) && server.store.email_in_use(&email, None).await? {
        errors.add("email", "The email has already been taken.");
    }

    let password = body.password.as_deref().unwrap_or("");
    if password.is_empty() {
        errors.add("password", "The password field is required.");
    } else {
        if password.len() < MIN_PASSWORD_LEN {
            errors.add("password", "The password must be at least 6 characters.");
        }
        if body.password_confirmation.as_deref() != Some(password) {
            errors.add("password", "The password confirmation does not match.");
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_or_internal(password)?;
    let verification_token = server.tokens.generate();

    let account = match server
        .store
        .create_account(&NewAccount {
            name,
            email,
            password_hash,
            verification_token,
        })
        .await
    {
        Ok(account) => account,
        // Lost the race to a concurrent create; same outcome as the
        // pre-write check.
        Err(StoreError::AlreadyExists) => return Err(email_taken()),
        Err(err) => return Err(err.into()),
    };

    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn list(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    server.require_scope(&ctx, Scope::ReadGeneral).await?;

    let accounts = server
        .store
        .list_accounts(&AccountFilter {
            verified: query.is_verified,
            is_admin: query.is_admin,
        })
        .await?;

    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

pub async fn show(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    let caller = server.require_scope(&ctx, Scope::ManageAccount).await?;
    let target = server.get_live_account(&AccountId(id)).await?;

    if !authz::can_view(&caller, &target) {
        return Err(ApiError::Forbidden("This action is unauthorized."));
    }

    Ok(Json(target.into()))
}

pub async fn update(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAccountBody>,
) -> Result<Json<AccountResponse>, ApiError> {
    let caller = server.require_scope(&ctx, Scope::ManageAccount).await?;
    let target = server.get_live_account(&AccountId(id)).await?;

    if !authz::can_update(&caller, &target) {
        return Err(ApiError::Forbidden("This action is unauthorized."));
    }

    // Validate every supplied field before mutating anything.
    let mut errors = ValidationErrors::default();

    let name = body.name.as_deref().map(|raw| {
        let name = raw.trim().to_string();
        validate_name(&name, &mut errors);
        name
    });

    let email = match body.email.as_deref() {
        Some(raw) => {
            let email = raw.trim().to_lowercase();
            validate_email_shape(&email, &mut errors);
            if is_valid_email(&email)
                && server.store.email_in_use(&email, Some(&target.id)).await?
            {
                errors.add("email", "The email has already been taken.");
            }
            Some(email)
        }
        None => None,
    };

    if let Some(password) = body.password.as_deref() {
        if password.len() < MIN_PASSWORD_LEN {
            errors.add("password", "The password must be at least 6 characters.");
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // The admin field is gated twice: on the acting identity and on the
    // target's verification state. Both run before anything is applied, so
    // a rejected admin write leaves every other requested field unapplied.
    if body.is_admin.is_some() {
        if !caller.is_admin {
            return Err(ApiError::Forbidden("This action is unauthorized."));
        }
        if !target.verified.is_verified() {
            return Err(ApiError::Conflict(
                "Only verified users can modify the admin field.",
            ));
        }
    }

    let mut updated = target.clone();
    let mut dirty = false;

    if let Some(name) = name {
        if name != target.name {
            updated.name = name;
            dirty = true;
        }
    }

    // An email different from the stored value re-enters the unverified
    // state with a fresh token, even if the address was held before.
    if let Some(email) = email {
        if email != target.email {
            updated.email = email;
            updated.verified = VerificationStatus::Unverified;
            updated.verification_token = Some(server.tokens.generate());
            dirty = true;
        }
    }

    if let Some(password) = body.password.as_deref() {
        updated.password_hash = hash_or_internal(password)?;
        dirty = true;
    }

    if let Some(is_admin) = body.is_admin {
        if is_admin != target.is_admin {
            updated.is_admin = is_admin;
            dirty = true;
        }
    }

    if !dirty {
        return Err(ApiError::Unprocessable(
            "You need to specify a different value to update",
        ));
    }

    let account = match server.store.update_account(&updated).await {
        Ok(account) => account,
        Err(StoreError::AlreadyExists) => return Err(email_taken()),
        Err(err) => return Err(err.into()),
    };

    Ok(Json(account.into()))
}

pub async fn destroy(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller = server.require_user(&ctx).await?;
    let target = server.get_live_account(&AccountId(id)).await?;

    if !authz::can_delete(&caller, &target) {
        return Err(ApiError::Forbidden("This action is unauthorized."));
    }

    server.store.delete_account(&target.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(server): State<CredoServer>,
    ctx: AuthContext,
) -> Result<Json<AccountResponse>, ApiError> {
    let caller = server.require_scope(&ctx, Scope::ManageAccount).await?;
    Ok(Json(caller.into()))
}
