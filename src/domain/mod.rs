use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Maximum number of bookings a member can hold at the same time
pub const MAX_BOOKINGS: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub surname: String,
    /// Number of bookings currently held by the member
    ///
    /// Bounded by [`MAX_BOOKINGS`] on the booking path.
    pub booking_count: u32,
    /// Join date, kept exactly as it was imported
    pub date_joined: Option<String>,
}

impl Member {
    pub fn can_book(&self) -> bool {
        self.booking_count < MAX_BOOKINGS
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inventory {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Number of units that can still be booked
    pub remaining_count: u32,
    /// Expiration date, kept exactly as it was imported
    pub expiration_date: Option<String>,
}

impl Inventory {
    pub fn in_stock(&self) -> bool {
        self.remaining_count > 0
    }
}

/// One member's claim on one inventory unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    pub id: i64,
    pub member_id: i64,
    pub inventory_id: i64,
    pub booking_date: DateTime<Utc>,
}

/// Member row as found in an imported CSV file
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub surname: String,
    pub booking_count: u32,
    pub date_joined: Option<String>,
}

/// Inventory row as found in an imported CSV file
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NewInventory {
    pub title: String,
    pub description: Option<String>,
    pub remaining_count: u32,
    pub expiration_date: Option<String>,
}

/// Reasons for refusing a booking between an existing member and inventory item
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("member {member_id} has reached max bookings ({booking_count})")]
    CapacityExceeded { member_id: i64, booking_count: u32 },
    #[error("inventory {inventory_id} has no remaining units")]
    OutOfStock { inventory_id: i64 },
}

/// Check whether `member` may book one unit of `inventory`
///
/// The member cap is checked before the stock.
pub fn check_booking(member: &Member, inventory: &Inventory) -> Result<(), Rejection> {
    if !member.can_book() {
        return Err(Rejection::CapacityExceeded {
            member_id: member.id,
            booking_count: member.booking_count,
        });
    }
    if !inventory.in_stock() {
        return Err(Rejection::OutOfStock {
            inventory_id: inventory.id,
        });
    }
    Ok(())
}

/// Target table for an imported file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Members,
    Inventory,
}

impl RecordKind {
    /// Guess the record kind from an uploaded filename
    ///
    /// Used when the upload carries no explicit kind. `members` wins over `inventory` when a
    /// name contains both.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains("members") {
            Some(RecordKind::Members)
        } else if filename.contains("inventory") {
            Some(RecordKind::Inventory)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Members => "members",
            RecordKind::Inventory => "inventory",
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown record kind: {0}")]
pub struct UnknownRecordKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "members" => Ok(RecordKind::Members),
            "inventory" => Ok(RecordKind::Inventory),
            other => Err(UnknownRecordKind(other.to_string())),
        }
    }
}
