//! SQLite storage layer for Bunkmate
//!
//! One `Database` handle owns the connection; per-collection stores borrow
//! it. The handle is passed by reference to every consumer, never held in
//! a module-level singleton.

mod bookings;
mod hostels;
mod migrations;
mod notices;
mod parse;
mod seed;
mod traits;
mod users;

use std::path::Path;

use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    Booking, BookingDisplay, Hostel, HostelStatus, Notice, Role, Session, User, UserStatus,
};

pub use bookings::BookingStore;
pub use hostels::HostelStore;
pub use notices::NoticeStore;
pub use seed::ensure_baseline;
pub use traits::{
    BookingRepository, HostelRepository, NoticeRepository, Storage, UserRepository,
};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the given path. Runs migrations and
    /// seeds the baseline fixture on an empty store.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        seed::ensure_baseline(&db.conn)?;
        Ok(db)
    }

    /// Open the database at the platform-default data location
    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("dev", "bunkmate", "bunkmate")
            .ok_or_else(|| Error::Io(std::io::Error::other("no home directory")))?;

        let dir = dirs.data_dir();
        std::fs::create_dir_all(dir)?;
        Self::open(dir.join("bunkmate.db"))
    }

    /// Open in-memory database (for testing). Migrations run; the baseline
    /// fixture is not seeded so tests start from a blank store.
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Raw connection, for seeding and migrations tooling
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction on the shared connection. Used where two rows
    /// must land together or not at all (the approve-booking write pair).
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    /// Get hostel store
    pub fn hostels(&self) -> HostelStore<'_> {
        HostelStore::new(&self.conn)
    }

    /// Get booking store
    pub fn bookings(&self) -> BookingStore<'_> {
        BookingStore::new(&self.conn)
    }

    /// Get notice store
    pub fn notices(&self) -> NoticeStore<'_> {
        NoticeStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn upsert_user(&self, user: &User) -> Result<()> {
        self.users().upsert(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.users().list()
    }

    fn update_user(&self, user: &User) -> Result<()> {
        self.users().update(user)
    }

    fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> Result<()> {
        self.users().set_status(user_id, status)
    }

    fn delete_user(&self, user_id: Uuid) -> Result<()> {
        self.users().delete(user_id)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.users().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.users().find_valid_session(session_id)
    }

    fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.users().delete_session(session_id)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.users().cleanup_expired_sessions()
    }
}

impl HostelRepository for Database {
    fn create_hostel(&self, hostel: &Hostel) -> Result<()> {
        self.hostels().create(hostel)
    }

    fn upsert_hostel(&self, hostel: &Hostel) -> Result<()> {
        self.hostels().upsert(hostel)
    }

    fn find_hostel_by_id(&self, id: Uuid) -> Result<Option<Hostel>> {
        self.hostels().find_by_id(id)
    }

    fn update_hostel(&self, hostel: &mut Hostel) -> Result<()> {
        self.hostels().update(hostel)
    }

    fn delete_hostel(&self, hostel_id: Uuid) -> Result<()> {
        self.hostels().delete(hostel_id)
    }

    fn list_hostels(&self) -> Result<Vec<Hostel>> {
        self.hostels().list()
    }

    fn list_hostels_by_status(&self, status: HostelStatus) -> Result<Vec<Hostel>> {
        self.hostels().list_by_status(status)
    }

    fn list_hostels_by_manager(&self, manager_id: Uuid) -> Result<Vec<Hostel>> {
        self.hostels().list_by_manager(manager_id)
    }
}

impl BookingRepository for Database {
    fn create_booking(&self, booking: &Booking) -> Result<()> {
        self.bookings().create(booking)
    }

    fn upsert_booking(&self, booking: &Booking) -> Result<()> {
        self.bookings().upsert(booking)
    }

    fn find_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        self.bookings().find_by_id(id)
    }

    fn update_booking(&self, booking: &mut Booking) -> Result<()> {
        self.bookings().update(booking)
    }

    fn delete_booking(&self, booking_id: Uuid) -> Result<()> {
        self.bookings().delete(booking_id)
    }

    fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_for_user(user_id)
    }

    fn list_bookings_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_for_hostel(hostel_id)
    }

    fn list_booking_display_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<BookingDisplay>> {
        self.bookings().list_display_for_hostel(hostel_id)
    }

    fn list_unpaid_bookings_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_unpaid_for_hostel(hostel_id)
    }

    fn has_other_bookings(&self, user_id: Uuid, excluding: Uuid) -> Result<bool> {
        self.bookings().has_other_bookings(user_id, excluding)
    }
}

impl NoticeRepository for Database {
    fn create_notice(&self, notice: &Notice) -> Result<()> {
        self.notices().create(notice)
    }

    fn upsert_notice(&self, notice: &Notice) -> Result<()> {
        self.notices().upsert(notice)
    }

    fn find_notice_by_id(&self, id: Uuid) -> Result<Option<Notice>> {
        self.notices().find_by_id(id)
    }

    fn delete_notice(&self, notice_id: Uuid) -> Result<()> {
        self.notices().delete(notice_id)
    }

    fn list_visible_notices(&self, role: Role, hostel_id: Option<Uuid>) -> Result<Vec<Notice>> {
        self.notices().list_visible(role, hostel_id)
    }
}
