//! Response constructors and the error → status mapping.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::Error;

/// Every response, success or error, carries this content type.
pub(crate) const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// A successful read: canonical entity bytes or a query result object.
pub(crate) fn json_response(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response()
}

/// A successful mutation: the literal `{}`. The benchmark client closes the
/// connection after every POST, so the server says so up front.
pub(crate) fn mutation_response() -> Response {
    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE_JSON),
            (header::CONNECTION, "close"),
        ],
        "{}",
    )
        .into_response()
}

/// Error wrapper carrying the resolved status code. Bodies are empty; the
/// status is the contract.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
}

impl ApiError {
    /// 404 without an engine error behind it (bad path id, unknown route).
    pub(crate) fn not_found() -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
        }
    }

    /// Mapping for the create-visit path, where a dangling user or location
    /// reference is a client error rather than a missing resource.
    pub(crate) fn for_create(err: Error) -> Self {
        match err {
            Error::NotFound => ApiError {
                status: StatusCode::BAD_REQUEST,
            },
            other => ApiError::from(other),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::MissingId
            | Error::UpdateId
            | Error::Duplicate
            | Error::BadPayload(_)
            | Error::Validation(_)
            | Error::BadParam(_) => StatusCode::BAD_REQUEST,
            Error::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError { status }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], "").into_response()
    }
}
