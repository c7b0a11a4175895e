//! SQLite storage through `sqlx`
//!
//! Counter bounds are enforced by conditional `UPDATE`s inside the same transaction that writes
//! the booking. The writes come first, so the transaction holds the write lock before anything
//! is read back.

use std::str::FromStr;

use crate::{
    domain::{Booking, Inventory, Member, NewInventory, NewMember, Rejection, MAX_BOOKINGS},
    ports::database::{DatabasePort, Error},
};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS member (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT NOT NULL,
        surname       TEXT NOT NULL,
        booking_count INTEGER NOT NULL DEFAULT 0 CHECK (booking_count >= 0),
        date_joined   TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        title           TEXT NOT NULL,
        description     TEXT,
        remaining_count INTEGER NOT NULL DEFAULT 0 CHECK (remaining_count >= 0),
        expiration_date TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS booking (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        member_id    INTEGER NOT NULL REFERENCES member (id),
        inventory_id INTEGER NOT NULL REFERENCES inventory (id),
        booking_date TEXT NOT NULL
    )
    "#,
];

#[derive(Clone, Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool on `url`, creating the database file if needed
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: i64,
    name: String,
    surname: String,
    booking_count: u32,
    date_joined: Option<String>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            surname: row.surname,
            booking_count: row.booking_count,
            date_joined: row.date_joined,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    id: i64,
    title: String,
    description: Option<String>,
    remaining_count: u32,
    expiration_date: Option<String>,
}

impl From<InventoryRow> for Inventory {
    fn from(row: InventoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            remaining_count: row.remaining_count,
            expiration_date: row.expiration_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    member_id: i64,
    inventory_id: i64,
    booking_date: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            member_id: row.member_id,
            inventory_id: row.inventory_id,
            booking_date: row.booking_date,
        }
    }
}

async fn find_member(conn: &mut SqliteConnection, member_id: i64) -> Result<Option<Member>, Error> {
    let row = sqlx::query_as::<_, MemberRow>(
        "SELECT id, name, surname, booking_count, date_joined FROM member WHERE id = ?",
    )
    .bind(member_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Member::from))
}

async fn find_inventory(
    conn: &mut SqliteConnection,
    inventory_id: i64,
) -> Result<Option<Inventory>, Error> {
    let row = sqlx::query_as::<_, InventoryRow>(
        "SELECT id, title, description, remaining_count, expiration_date FROM inventory WHERE id = ?",
    )
    .bind(inventory_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Inventory::from))
}

#[async_trait::async_trait]
impl DatabasePort for SqliteDatabase {
    async fn get_member(&self, member_id: i64) -> Result<Member, Error> {
        let mut conn = self.pool.acquire().await?;
        find_member(&mut conn, member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))
    }

    async fn get_inventory(&self, inventory_id: i64) -> Result<Inventory, Error> {
        let mut conn = self.pool.acquire().await?;
        find_inventory(&mut conn, inventory_id)
            .await?
            .ok_or(Error::InventoryNotFound(inventory_id))
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Booking, Error> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, member_id, inventory_id, booking_date FROM booking WHERE id = ?",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::from)
            .ok_or(Error::BookingNotFound(booking_id))
    }

    async fn insert_members(&self, members: Vec<NewMember>) -> Result<Vec<Member>, Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(members.len());
        for member in members {
            let row = sqlx::query_as::<_, MemberRow>(
                "INSERT INTO member (name, surname, booking_count, date_joined) VALUES (?, ?, ?, ?) \
                 RETURNING id, name, surname, booking_count, date_joined",
            )
            .bind(member.name)
            .bind(member.surname)
            .bind(member.booking_count)
            .bind(member.date_joined)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row.into());
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_inventory(&self, items: Vec<NewInventory>) -> Result<Vec<Inventory>, Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, InventoryRow>(
                "INSERT INTO inventory (title, description, remaining_count, expiration_date) VALUES (?, ?, ?, ?) \
                 RETURNING id, title, description, remaining_count, expiration_date",
            )
            .bind(item.title)
            .bind(item.description)
            .bind(item.remaining_count)
            .bind(item.expiration_date)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row.into());
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn create_booking(
        &self,
        member_id: i64,
        inventory_id: i64,
        booking_date: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        let member_updated = sqlx::query(
            "UPDATE member SET booking_count = booking_count + 1 WHERE id = ? AND booking_count < ?",
        )
        .bind(member_id)
        .bind(MAX_BOOKINGS)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let inventory_updated = sqlx::query(
            "UPDATE inventory SET remaining_count = remaining_count - 1 WHERE id = ? AND remaining_count > 0",
        )
        .bind(inventory_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if member_updated == 0 || inventory_updated == 0 {
            // Work out which rule failed, in the order they are checked
            let member = find_member(&mut tx, member_id).await?;
            let inventory = find_inventory(&mut tx, inventory_id).await?;
            tx.rollback().await?;

            return Err(match (member, inventory) {
                (None, _) => Error::MemberNotFound(member_id),
                (_, None) => Error::InventoryNotFound(inventory_id),
                (Some(member), _) if member_updated == 0 => Rejection::CapacityExceeded {
                    member_id,
                    booking_count: member.booking_count,
                }
                .into(),
                _ => Rejection::OutOfStock { inventory_id }.into(),
            });
        }

        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO booking (member_id, inventory_id, booking_date) VALUES (?, ?, ?) \
             RETURNING id, member_id, inventory_id, booking_date",
        )
        .bind(member_id)
        .bind(inventory_id)
        .bind(booking_date)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn cancel_booking(&self, booking_id: i64) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        let Some(booking) = sqlx::query_as::<_, BookingRow>(
            "DELETE FROM booking WHERE id = ? RETURNING id, member_id, inventory_id, booking_date",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            tx.rollback().await?;
            return Err(Error::BookingNotFound(booking_id));
        };

        let inventory_updated =
            sqlx::query("UPDATE inventory SET remaining_count = remaining_count + 1 WHERE id = ?")
                .bind(booking.inventory_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        let member_updated = sqlx::query(
            "UPDATE member SET booking_count = booking_count - 1 WHERE id = ? AND booking_count > 0",
        )
        .bind(booking.member_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inventory_updated == 0 || member_updated == 0 {
            let member = find_member(&mut tx, booking.member_id).await?;
            tx.rollback().await?;

            return Err(if inventory_updated == 0 || member.is_none() {
                Error::DanglingBooking { booking_id }
            } else {
                Error::CounterUnderflow {
                    member_id: booking.member_id,
                }
            });
        }
        tx.commit().await?;

        Ok(booking.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Adapter(Box::new(err))
    }
}
