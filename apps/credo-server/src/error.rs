//! API error taxonomy and the `{"error": …, "code": …}` response envelope.
//!
//! Validation and authorization failures are produced before any mutation;
//! store backend failures are logged and reported generically.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use credo_storage::StoreError;

/// Per-field validation messages, serialized as `{field: [messages]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    /// 422: per-field constraint violations on create/update.
    Validation(ValidationErrors),
    /// 401: missing or invalid caller identity.
    Unauthenticated,
    /// 403: valid identity lacking the required scope or ability.
    Forbidden(&'static str),
    /// 404: target account or verification token does not resolve.
    NotFound(&'static str),
    /// 409: transition rejected by the account's current state.
    Conflict(&'static str),
    /// 422: update request yields no field difference from stored state.
    Unprocessable(&'static str),
    /// 500: notification retries exhausted.
    Dispatch,
    /// 500: unexpected failure, reported generically.
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Dispatch | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => {
                ApiError::NotFound("Does not exist any user with the specified identificator.")
            }
            // Uniqueness races are handled where they can occur; anything
            // reaching this point is a programming error.
            StoreError::AlreadyExists => {
                tracing::error!("unhandled uniqueness violation from store");
                ApiError::Internal
            }
            StoreError::Backend(detail) => {
                tracing::error!("store backend error: {detail}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Unauthenticated => json!("Unauthenticated."),
            ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unprocessable(msg) => json!(msg),
            ApiError::Dispatch => {
                json!("The verification message could not be delivered. Please try again later")
            }
            ApiError::Internal => {
                json!("We are facing an unespected problem. Please try again later")
            }
        };
        let body = json!({ "error": error, "code": status.as_u16() });
        (status, Json(body)).into_response()
    }
}
