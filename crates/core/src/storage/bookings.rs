//! Booking storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    booking_status_from_str, fee_status_from_str_opt, parse_datetime, parse_datetime_opt,
    parse_json_opt, parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Booking, BookingDisplay, BookingStatus};

pub struct BookingStore<'a> {
    conn: &'a Connection,
}

const BOOKING_COLUMNS: &str = "id, user_id, hostel_id, room_id, bed_id, status, fee_status, \
     last_payment_date, is_active, application_json, version, created_at";

fn read_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hostel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        room_id: row.get(3)?,
        bed_id: row.get(4)?,
        status: booking_status_from_str(&row.get::<_, String>(5)?)?,
        fee_status: fee_status_from_str_opt(row.get::<_, Option<String>>(6)?)?,
        last_payment_date: parse_datetime_opt(row.get::<_, Option<String>>(7)?)?,
        is_active: row.get(8)?,
        application: parse_json_opt(row.get::<_, Option<String>>(9)?)?,
        version: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

fn read_display(row: &Row<'_>) -> rusqlite::Result<BookingDisplay> {
    Ok(BookingDisplay {
        booking: read_booking(row)?,
        resident_name: row.get(12)?,
        hostel_name: row.get(13)?,
    })
}

impl<'a> BookingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new booking
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub fn create(&self, booking: &Booking) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bookings (id, user_id, hostel_id, room_id, bed_id, status, fee_status,
                                   last_payment_date, is_active, application_json, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                booking.id.to_string(),
                booking.user_id.to_string(),
                booking.hostel_id.to_string(),
                booking.room_id,
                booking.bed_id,
                booking.status.as_str(),
                booking.fee_status.map(|f| f.as_str()),
                booking.last_payment_date.map(|t| t.to_rfc3339()),
                booking.is_active,
                booking
                    .application
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                booking.version,
                booking.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace the row if the id exists, insert otherwise.
    /// Skips the version check; lifecycle code should prefer `update`.
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub fn upsert(&self, booking: &Booking) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bookings (id, user_id, hostel_id, room_id, bed_id, status, fee_status,
                                   last_payment_date, is_active, application_json, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                fee_status = excluded.fee_status,
                last_payment_date = excluded.last_payment_date,
                is_active = excluded.is_active,
                application_json = excluded.application_json,
                version = excluded.version",
            params![
                booking.id.to_string(),
                booking.user_id.to_string(),
                booking.hostel_id.to_string(),
                booking.room_id,
                booking.bed_id,
                booking.status.as_str(),
                booking.fee_status.map(|f| f.as_str()),
                booking.last_payment_date.map(|t| t.to_rfc3339()),
                booking.is_active,
                booking
                    .application
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                booking.version,
                booking.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find booking by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"
        ))?;

        let booking = stmt
            .query_row(params![id.to_string()], read_booking)
            .optional()?;

        Ok(booking)
    }

    /// Persist an updated booking, checking the caller's version stamp.
    /// On success the caller's copy carries the bumped stamp.
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub fn update(&self, booking: &mut Booking) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE bookings SET status = ?1, fee_status = ?2, last_payment_date = ?3,
                                 is_active = ?4, application_json = ?5, version = version + 1
             WHERE id = ?6 AND version = ?7",
            params![
                booking.status.as_str(),
                booking.fee_status.map(|f| f.as_str()),
                booking.last_payment_date.map(|t| t.to_rfc3339()),
                booking.is_active,
                booking
                    .application
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                booking.id.to_string(),
                booking.version,
            ],
        )?;

        if changed == 0 {
            return if self.find_by_id(booking.id)?.is_some() {
                Err(Error::Conflict(format!(
                    "booking {} was modified concurrently",
                    booking.id
                )))
            } else {
                Err(Error::NotFound(format!("booking {}", booking.id)))
            };
        }

        booking.version += 1;
        Ok(())
    }

    /// Hard delete the row. Bed release is the lifecycle engine's job.
    #[instrument(skip(self))]
    pub fn delete(&self, booking_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM bookings WHERE id = ?1",
            params![booking_id.to_string()],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("booking {booking_id}")));
        }
        Ok(())
    }

    /// List all bookings, newest first
    pub fn list(&self) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))?;

        let bookings = stmt
            .query_map([], read_booking)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bookings)
    }

    /// List a resident's bookings, newest first
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let bookings = stmt
            .query_map(params![user_id.to_string()], read_booking)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bookings)
    }

    /// List a hostel's bookings, newest first
    pub fn list_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE hostel_id = ?1 ORDER BY created_at DESC"
        ))?;

        let bookings = stmt
            .query_map(params![hostel_id.to_string()], read_booking)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bookings)
    }

    /// Approved bookings in a hostel whose monthly fee is effectively
    /// unpaid. A NULL fee status was never recorded and counts as unpaid.
    pub fn list_unpaid_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE hostel_id = ?1 AND status = 'approved' AND is_active = 1
               AND (fee_status IS NULL OR fee_status = 'unpaid')
             ORDER BY created_at DESC"
        ))?;

        let bookings = stmt
            .query_map(params![hostel_id.to_string()], read_booking)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bookings)
    }

    /// Does the user hold any booking besides the given one?
    /// Explicit query backing the optional user cascade on deletion.
    pub fn has_other_bookings(&self, user_id: Uuid, excluding: Uuid) -> Result<bool> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE user_id = ?1 AND id != ?2",
            params![user_id.to_string(), excluding.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Count every booking referencing the user
    pub fn count_for_user(&self, user_id: Uuid) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count every booking referencing the hostel
    pub fn count_for_hostel(&self, hostel_id: Uuid) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE hostel_id = ?1",
            params![hostel_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Any approved booking holding this bed right now?
    pub fn find_approved_for_bed(
        &self,
        hostel_id: Uuid,
        room_id: &str,
        bed_id: &str,
    ) -> Result<Option<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE hostel_id = ?1 AND room_id = ?2 AND bed_id = ?3 AND status = 'approved'"
        ))?;

        let booking = stmt
            .query_row(params![hostel_id.to_string(), room_id, bed_id], read_booking)
            .optional()?;

        Ok(booking)
    }

    /// List a hostel's bookings with resident and hostel names joined in.
    /// Names come from the live rows, so renames show up without a resync.
    #[instrument(skip(self))]
    pub fn list_display_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<BookingDisplay>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.user_id, b.hostel_id, b.room_id, b.bed_id, b.status, b.fee_status,
                    b.last_payment_date, b.is_active, b.application_json, b.version, b.created_at,
                    u.name, h.name
             FROM bookings b
             INNER JOIN users u ON u.id = b.user_id
             INNER JOIN hostels h ON h.id = b.hostel_id
             WHERE b.hostel_id = ?1
             ORDER BY b.created_at DESC",
        )?;

        let rows = stmt
            .query_map(params![hostel_id.to_string()], read_display)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// List a resident's bookings with names joined in
    pub fn list_display_for_user(&self, user_id: Uuid) -> Result<Vec<BookingDisplay>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.user_id, b.hostel_id, b.room_id, b.bed_id, b.status, b.fee_status,
                    b.last_payment_date, b.is_active, b.application_json, b.version, b.created_at,
                    u.name, h.name
             FROM bookings b
             INNER JOIN users u ON u.id = b.user_id
             INNER JOIN hostels h ON h.id = b.hostel_id
             WHERE b.user_id = ?1
             ORDER BY b.created_at DESC",
        )?;

        let rows = stmt
            .query_map(params![user_id.to_string()], read_display)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
