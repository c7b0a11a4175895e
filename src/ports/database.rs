use chrono::{DateTime, Utc};

use crate::domain::{Booking, Inventory, Member, NewInventory, NewMember, Rejection};

#[mockall::automock]
#[async_trait::async_trait]
pub trait DatabasePort: Send + Sync {
    async fn get_member(&self, member_id: i64) -> Result<Member, Error>;
    async fn get_inventory(&self, inventory_id: i64) -> Result<Inventory, Error>;
    async fn get_booking(&self, booking_id: i64) -> Result<Booking, Error>;

    /// Insert all members at once
    ///
    /// Either every row is stored or none is.
    async fn insert_members(&self, members: Vec<NewMember>) -> Result<Vec<Member>, Error>;
    /// Insert all inventory items at once
    ///
    /// Either every row is stored or none is.
    async fn insert_inventory(&self, items: Vec<NewInventory>) -> Result<Vec<Inventory>, Error>;

    /// Record a booking
    ///
    /// Incrementing the member's booking count, decrementing the remaining inventory and
    /// storing the booking happen atomically. The booking rules are enforced as part of that
    /// same update, so concurrent calls cannot push a counter past its bound.
    async fn create_booking(
        &self,
        member_id: i64,
        inventory_id: i64,
        booking_date: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    /// Remove a booking and give back its inventory unit and member slot, atomically
    async fn cancel_booking(&self, booking_id: i64) -> Result<Booking, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("member {0} does not exist")]
    MemberNotFound(i64),
    #[error("inventory {0} does not exist")]
    InventoryNotFound(i64),
    #[error("booking {0} does not exist")]
    BookingNotFound(i64),

    /// Domain-level refusal of a booking
    #[error("booking rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The booking points to a member or inventory item that no longer exists
    #[error("booking {booking_id} references a missing member or inventory item")]
    DanglingBooking { booking_id: i64 },

    /// Cancelling would make the member's booking count negative
    #[error("member {member_id} has no booking left to release")]
    CounterUnderflow { member_id: i64 },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
