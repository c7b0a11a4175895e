use std::sync::Arc;

use crate::ports::database::DatabasePort;

pub mod cancel_booking;
pub mod create_booking;
pub mod import_records;

pub use cancel_booking::CancelBookingRequest;
pub use create_booking::CreateBookingRequest;
pub use import_records::{ImportRecordsRequest, ImportRecordsResponse};

pub struct DomainLogic<D> {
    database: Arc<D>,
}

impl<D> DomainLogic<D>
where
    D: DatabasePort,
{
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }
}

// Not derived: `D` itself does not need to be `Clone`
impl<D> Clone for DomainLogic<D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database port error: {0:?}")]
    Database(#[from] crate::ports::database::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid file format: {0:?}")]
    InvalidFormat(String),
}
