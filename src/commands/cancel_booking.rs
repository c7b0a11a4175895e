use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{domain::Booking, ports::database::DatabasePort};
use tower::Service;

use super::{DomainLogic, Error};

#[derive(Clone, Debug)]
pub struct CancelBookingRequest {
    pub booking_id: i64,
}

impl<D> Service<CancelBookingRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    /// The booking that was removed
    type Response = Booking;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CancelBookingRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let booking = database.cancel_booking(req.booking_id).await?;

            tracing::info!(
                booking_id = booking.id,
                member_id = booking.member_id,
                inventory_id = booking.inventory_id,
                "booking cancelled"
            );
            Ok(booking)
        })
    }
}
