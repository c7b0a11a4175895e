use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{check_booking, Booking},
    ports::database::DatabasePort,
};
use chrono::Utc;
use tower::Service;

use super::{DomainLogic, Error};

#[derive(Clone, Debug)]
pub struct CreateBookingRequest {
    pub member_id: i64,
    pub inventory_id: i64,
}

impl<D> Service<CreateBookingRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = Booking;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CreateBookingRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            // Both sides must exist before any rule is looked at
            let member = database.get_member(req.member_id).await?;
            let inventory = database.get_inventory(req.inventory_id).await?;

            check_booking(&member, &inventory).map_err(crate::ports::database::Error::from)?;

            // The database enforces the same rules again while writing, in case a concurrent
            // booking got there first
            let booking = database
                .create_booking(member.id, inventory.id, Utc::now())
                .await?;

            tracing::info!(
                booking_id = booking.id,
                member_id = booking.member_id,
                inventory_id = booking.inventory_id,
                "booking created"
            );
            Ok(booking)
        })
    }
}
