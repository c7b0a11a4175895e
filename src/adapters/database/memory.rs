use crate::{
    domain::{check_booking, Booking, Inventory, Member, NewInventory, NewMember},
    ports::database::{DatabasePort, Error},
};
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
}

/// All tables live behind a single lock, so every operation is atomic
#[derive(Debug, Default)]
struct State {
    members: BTreeMap<i64, Member>,
    inventory: BTreeMap<i64, Inventory>,
    bookings: BTreeMap<i64, Booking>,
    last_member_id: i64,
    last_inventory_id: i64,
    last_booking_id: i64,
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn get_member(&self, member_id: i64) -> Result<Member, Error> {
        self.state
            .lock()?
            .members
            .get(&member_id)
            .cloned()
            .ok_or(Error::MemberNotFound(member_id))
    }

    async fn get_inventory(&self, inventory_id: i64) -> Result<Inventory, Error> {
        self.state
            .lock()?
            .inventory
            .get(&inventory_id)
            .cloned()
            .ok_or(Error::InventoryNotFound(inventory_id))
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Booking, Error> {
        self.state
            .lock()?
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(Error::BookingNotFound(booking_id))
    }

    async fn insert_members(&self, members: Vec<NewMember>) -> Result<Vec<Member>, Error> {
        let mut state = self.state.lock()?;
        let inserted = members
            .into_iter()
            .map(|new_member| {
                state.last_member_id += 1;
                let member = Member {
                    id: state.last_member_id,
                    name: new_member.name,
                    surname: new_member.surname,
                    booking_count: new_member.booking_count,
                    date_joined: new_member.date_joined,
                };
                state.members.insert(member.id, member.clone());
                member
            })
            .collect();

        Ok(inserted)
    }

    async fn insert_inventory(&self, items: Vec<NewInventory>) -> Result<Vec<Inventory>, Error> {
        let mut state = self.state.lock()?;
        let inserted = items
            .into_iter()
            .map(|new_item| {
                state.last_inventory_id += 1;
                let item = Inventory {
                    id: state.last_inventory_id,
                    title: new_item.title,
                    description: new_item.description,
                    remaining_count: new_item.remaining_count,
                    expiration_date: new_item.expiration_date,
                };
                state.inventory.insert(item.id, item.clone());
                item
            })
            .collect();

        Ok(inserted)
    }

    async fn create_booking(
        &self,
        member_id: i64,
        inventory_id: i64,
        booking_date: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        let mut guard = self.state.lock()?;
        let state = &mut *guard;

        let member = state
            .members
            .get_mut(&member_id)
            .ok_or(Error::MemberNotFound(member_id))?;
        let item = state
            .inventory
            .get_mut(&inventory_id)
            .ok_or(Error::InventoryNotFound(inventory_id))?;
        check_booking(member, item)?;

        member.booking_count += 1;
        item.remaining_count -= 1;
        state.last_booking_id += 1;
        let booking = Booking {
            id: state.last_booking_id,
            member_id,
            inventory_id,
            booking_date,
        };
        state.bookings.insert(booking.id, booking.clone());

        Ok(booking)
    }

    async fn cancel_booking(&self, booking_id: i64) -> Result<Booking, Error> {
        let mut guard = self.state.lock()?;
        let state = &mut *guard;

        let booking = state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(Error::BookingNotFound(booking_id))?;
        let (Some(member), Some(item)) = (
            state.members.get_mut(&booking.member_id),
            state.inventory.get_mut(&booking.inventory_id),
        ) else {
            return Err(Error::DanglingBooking { booking_id });
        };
        // Nothing is written before this check, so a failure leaves the state untouched
        let Some(booking_count) = member.booking_count.checked_sub(1) else {
            return Err(Error::CounterUnderflow {
                member_id: member.id,
            });
        };

        member.booking_count = booking_count;
        item.remaining_count += 1;
        state.bookings.remove(&booking_id);

        Ok(booking)
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
