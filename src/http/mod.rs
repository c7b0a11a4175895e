//! HTTP surface of the service
//!
//! Handlers only translate between HTTP and the command services in [`crate::commands`].

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use crate::{
    commands::{CancelBookingRequest, CreateBookingRequest, DomainLogic, ImportRecordsRequest},
    config::Config,
    domain::RecordKind,
    ports::database::DatabasePort,
};

pub mod errors;
pub mod middleware;

pub use errors::ApiError;

pub fn router<D>(domain: DomainLogic<D>, config: &Config) -> Router
where
    D: DatabasePort + 'static,
{
    Router::new()
        .route("/upload", post(upload::<D>))
        .route("/book", post(book::<D>))
        .route("/cancel", post(cancel::<D>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(from_fn(middleware::logging_middleware))
        .with_state(domain)
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: &'static str,
    pub booking_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub member_id: i64,
    pub inventory_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub booking_id: i64,
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// `POST /upload`: multipart form with a `file` part and an optional `kind` part
async fn upload<D>(
    State(domain): State<DomainLogic<D>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError>
where
    D: DatabasePort + 'static,
{
    let mut multipart = multipart?;
    let mut file = None;
    let mut kind = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let contents = field.bytes().await?.to_vec();
                file = Some((filename, contents));
            }
            Some("kind") => {
                let value = field.text().await?;
                // An empty selector is the same as no selector
                if !value.is_empty() {
                    kind = Some(
                        value
                            .parse::<RecordKind>()
                            .map_err(|_| ApiError::bad_request("Invalid record kind"))?,
                    );
                }
            }
            _ => {}
        }
    }

    let (filename, contents) = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    domain
        .oneshot(ImportRecordsRequest {
            filename,
            kind,
            contents,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "File uploaded and data stored",
    }))
}

/// `POST /book`
async fn book<D>(
    State(domain): State<DomainLogic<D>>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DatabasePort + 'static,
{
    let Json(body) = body?;
    let booking = domain
        .oneshot(CreateBookingRequest {
            member_id: body.member_id,
            inventory_id: body.inventory_id,
        })
        .await?;

    Ok(Json(BookingResponse {
        message: "Booking successful",
        booking_id: booking.id,
    }))
}

/// `POST /cancel`
async fn cancel<D>(
    State(domain): State<DomainLogic<D>>,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError>
where
    D: DatabasePort + 'static,
{
    let Json(body) = body?;
    domain
        .oneshot(CancelBookingRequest {
            booking_id: body.booking_id,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "Booking cancelled",
    }))
}
