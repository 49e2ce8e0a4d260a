//! Verification flow tests: verify, resend, and the dispatch retry path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use credo_storage::VerificationStatus;

use super::super::common::*;
use crate::error::ApiError;
use crate::handlers::verification;

// ───────────────────────────────────── Verify ─────────────────────────────────────

#[tokio::test]
async fn verify_unknown_token_is_not_found() {
    let (server, _) = test_server().await;

    let err = verification::verify(
        State(server.clone()),
        Path("no-such-token".to_string()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_consumes_the_token_exactly_once() {
    let (server, _) = test_server().await;
    let ann = create_account(&server, "Ann", "ann@example.com").await;
    let token = ann.verification_token.clone().unwrap();

    let Json(resp) = verification::verify(State(server.clone()), Path(token.clone()))
        .await
        .unwrap();
    assert_eq!(resp.message, "The account has been successfully verified");
    assert_eq!(resp.code, 200);

    let stored = refresh(&server, &ann).await;
    assert_eq!(stored.verified, VerificationStatus::Verified);
    assert!(stored.verification_token.is_none());

    // The now-stale token no longer resolves.
    let err = verification::verify(State(server.clone()), Path(token))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// ───────────────────────────────────── Resend ─────────────────────────────────────

#[tokio::test]
async fn resend_requires_client_credentials() {
    let (server, provider) = test_server().await;
    let ann = create_account(&server, "Ann", "ann@example.com").await;

    let err = verification::resend(
        State(server.clone()),
        manage_ctx(&ann),
        Path(ann.id.0),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated);
    assert_eq!(provider.attempts(), 0);
}

#[tokio::test]
async fn resend_unknown_account_is_not_found() {
    let (server, provider) = test_server().await;

    let err = verification::resend(
        State(server.clone()),
        client_ctx(),
        Path(Uuid::now_v7()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(provider.attempts(), 0);
}

#[tokio::test]
async fn resend_on_verified_account_conflicts_without_dispatch() {
    let (server, provider) = test_server().await;
    let ann = mark_verified(&server, &create_account(&server, "Ann", "ann@example.com").await).await;

    let err = verification::resend(State(server.clone()), client_ctx(), Path(ann.id.0))
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Conflict("This user is already verified"));
    assert_eq!(provider.attempts(), 0);
}

#[tokio::test]
async fn resend_dispatches_once_on_success() {
    let (server, provider) = test_server().await;
    let ann = create_account(&server, "Ann", "ann@example.com").await;
    let token = ann.verification_token.clone().unwrap();

    let Json(resp) = verification::resend(State(server.clone()), client_ctx(), Path(ann.id.0))
        .await
        .unwrap();
    assert_eq!(resp.message, "The verification token has been resend");

    assert_eq!(provider.attempts(), 1);
    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ann@example.com");
    assert_eq!(
        sent[0].verify_url,
        format!("http://localhost:8080/accounts/verify/{token}")
    );
}

#[tokio::test(start_paused = true)]
async fn resend_retries_transient_failures() {
    let (server, provider) = test_server_with_provider(MockEmailProvider::failing(2)).await;
    let ann = create_account(&server, "Ann", "ann@example.com").await;

    let Json(resp) = verification::resend(State(server.clone()), client_ctx(), Path(ann.id.0))
        .await
        .unwrap();
    assert_eq!(resp.message, "The verification token has been resend");

    // Two failed attempts, then the one that lands.
    assert_eq!(provider.attempts(), 3);
    assert_eq!(provider.sent_count(), 1);

    // The account's own state is untouched by dispatch.
    let stored = refresh(&server, &ann).await;
    assert_eq!(stored.verified, VerificationStatus::Unverified);
    assert_eq!(stored.verification_token, ann.verification_token);
}

#[tokio::test(start_paused = true)]
async fn resend_exhausts_after_five_attempts() {
    let (server, provider) = test_server_with_provider(MockEmailProvider::failing(usize::MAX)).await;
    let ann = create_account(&server, "Ann", "ann@example.com").await;

    let err = verification::resend(State(server.clone()), client_ctx(), Path(ann.id.0))
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Dispatch);
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.attempts(), 5);
    assert_eq!(provider.sent_count(), 0);
}
