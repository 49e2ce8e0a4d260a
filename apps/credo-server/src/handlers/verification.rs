//! Email verification handlers: verify, resend.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use credo_storage::{AccountId, StoreError, VerificationStatus};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::retry::dispatch_with_retry;
use crate::server::CredoServer;

use super::MessageResponse;

/// Consume a verification token.
///
/// Unauthenticated by design: the token itself is the credential. The
/// transition clears the token, so a second verify with the same token
/// falls into the not-found arm.
pub async fn verify(
    State(server): State<CredoServer>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut account = match server.store.get_account_by_verification_token(&token).await {
        Ok(account) => account,
        Err(StoreError::NotFound) => {
            return Err(ApiError::NotFound(
                "Does not exist any user with the specified identificator.",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    account.verified = VerificationStatus::Verified;
    account.verification_token = None;
    server.store.update_account(&account).await?;

    Ok(Json(MessageResponse::new(
        "The account has been successfully verified",
    )))
}

/// Re-dispatch the verification email for an unverified account.
///
/// Dispatch happens strictly after the conflict check and mutates no
/// account state; only retry exhaustion surfaces as a failure.
pub async fn resend(
    State(server): State<CredoServer>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    server.require_client(&ctx)?;

    let target = server.get_live_account(&AccountId(id)).await?;
    if target.verified.is_verified() {
        return Err(ApiError::Conflict("This user is already verified"));
    }

    let Some(mailer) = server.mailer.clone() else {
        tracing::error!("resend requested but no email provider is configured");
        return Err(ApiError::Dispatch);
    };

    let token = target.verification_token.clone().ok_or_else(|| {
        tracing::error!(account = %target.id, "unverified account has no verification token");
        ApiError::Internal
    })?;
    let verify_url = format!(
        "{}/accounts/verify/{}",
        server.config.verify_base_url.trim_end_matches('/'),
        token
    );

    let result = dispatch_with_retry(server.retry_policy(), || {
        let mailer = mailer.clone();
        let to = target.email.clone();
        let name = target.name.clone();
        let verify_url = verify_url.clone();
        async move {
            mailer
                .provider
                .send_verification(
                    &to,
                    &name,
                    &verify_url,
                    &mailer.from_address,
                    mailer.from_name.as_deref(),
                )
                .await
        }
    })
    .await;

    if let Err(err) = result {
        tracing::warn!(
            account = %target.id,
            "verification email dispatch exhausted retries: {err}"
        );
        return Err(ApiError::Dispatch);
    }

    Ok(Json(MessageResponse::new(
        "The verification token has been resend",
    )))
}
