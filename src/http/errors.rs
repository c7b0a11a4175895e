use std::borrow::Cow;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{commands, domain::Rejection, ports::database};

/// Error returned by every handler
///
/// Rendered as `{"error": "..."}`. Internal errors are logged and never shown to the caller.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(Cow<'static, str>),
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<commands::Error> for ApiError {
    fn from(err: commands::Error) -> Self {
        use commands::Error as E;
        use database::Error as D;

        match err {
            E::Database(D::MemberNotFound(_) | D::InventoryNotFound(_)) => {
                Self::bad_request("Invalid member or inventory ID")
            }
            E::Database(D::BookingNotFound(_)) => Self::bad_request("Booking not found"),
            E::Database(D::Rejected(Rejection::CapacityExceeded { .. })) => {
                Self::bad_request("Member has reached max bookings")
            }
            E::Database(D::Rejected(Rejection::OutOfStock { .. })) => {
                Self::bad_request("No more inventory available")
            }
            E::InvalidFormat(_) => Self::bad_request("Invalid file format"),
            err => {
                tracing::error!(error = ?err, "request failed");
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(_: MultipartRejection) -> Self {
        // Not a multipart body, so there is no file part either
        Self::bad_request("No file uploaded")
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request(err.body_text())
    }
}
