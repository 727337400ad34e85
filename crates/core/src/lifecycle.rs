//! Booking lifecycle state machine
//!
//! Status runs `pending -> approved | rejected` and stops; the row itself
//! is only ever removed, never archived. The monthly fee status cycles
//! independently and only by hand; there is no billing scheduler.
//!
//! Approval is the one sequence that touches two entities (the booking row
//! and its room's occupancy), so it runs under a per-hostel lock and a
//! single transaction: acquire, validate, mutate, flush, release. The
//! guard releases on every exit path, validation failures included.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{Booking, BookingStatus, FeeStatus, SessionUser};
use crate::occupancy;
use crate::permissions::{Action, PermissionMatrix};
use crate::storage::Database;

/// Drives booking transitions against an injected store handle
pub struct BookingEngine {
    hostel_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookingEngine {
    pub fn new() -> Self {
        Self {
            hostel_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The mutual-exclusion lock serializing occupancy writes per hostel
    fn lock_for(&self, hostel_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .hostel_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(hostel_id).or_default().clone()
    }

    /// Approve a pending booking and occupy its bed.
    ///
    /// Capacity is validated before duplicate occupancy, so a full room
    /// surfaces as Validation and a taken bed as Conflict. On any failure
    /// nothing is persisted and nothing in memory leaks out.
    #[instrument(skip(self, db, actor))]
    pub fn approve(&self, db: &Database, actor: SessionUser, booking_id: Uuid) -> Result<Booking> {
        PermissionMatrix::require(actor.role, Action::ApproveBooking)?;

        let mut booking = db
            .bookings()
            .find_by_id(booking_id)?
            .ok_or_else(|| Error::NotFound(format!("booking {booking_id}")))?;

        if booking.status != BookingStatus::Pending {
            return Err(Error::Validation(format!(
                "booking {} is {}, only pending bookings can be approved",
                booking.id,
                booking.status.as_str()
            )));
        }

        let lock = self.lock_for(booking.hostel_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Re-read under the lock; another approval may have occupied the
        // bed since the caller last looked
        let mut hostel = db
            .hostels()
            .find_by_id(booking.hostel_id)?
            .ok_or_else(|| Error::NotFound(format!("hostel {}", booking.hostel_id)))?;

        let room = hostel
            .room(&booking.room_id)
            .ok_or_else(|| Error::NotFound(format!("room {}", booking.room_id)))?;
        occupancy::ensure_bed_available(room, &booking.bed_id)?;

        let tx = db.transaction()?;
        booking.status = BookingStatus::Approved;
        db.bookings().update(&mut booking)?;

        let room = hostel
            .room_mut(&booking.room_id)
            .ok_or_else(|| Error::NotFound(format!("room {}", booking.room_id)))?;
        occupancy::occupy(room, booking.bed_id.clone(), booking.id)?;
        db.hostels().update(&mut hostel)?;
        tx.commit()?;

        invariants::assert_booking_occupancy(&booking, &hostel);
        info!(booking_id = %booking.id, bed = %booking.bed_id, "Booking approved");
        Ok(booking)
    }

    /// Reject a pending booking. No occupancy side effect.
    #[instrument(skip(self, db, actor))]
    pub fn reject(&self, db: &Database, actor: SessionUser, booking_id: Uuid) -> Result<Booking> {
        PermissionMatrix::require(actor.role, Action::RejectBooking)?;

        let mut booking = db
            .bookings()
            .find_by_id(booking_id)?
            .ok_or_else(|| Error::NotFound(format!("booking {booking_id}")))?;

        if booking.status != BookingStatus::Pending {
            return Err(Error::Validation(format!(
                "booking {} is {}, only pending bookings can be rejected",
                booking.id,
                booking.status.as_str()
            )));
        }

        booking.status = BookingStatus::Rejected;
        db.bookings().update(&mut booking)?;

        info!(booking_id = %booking.id, "Booking rejected");
        Ok(booking)
    }

    /// Delete a booking. An approved booking releases its bed, exactly
    /// once, in the same transaction that removes the row.
    #[instrument(skip(self, db, actor))]
    pub fn delete(&self, db: &Database, actor: SessionUser, booking_id: Uuid) -> Result<()> {
        PermissionMatrix::require(actor.role, Action::DeleteBooking)?;

        let booking = db
            .bookings()
            .find_by_id(booking_id)?
            .ok_or_else(|| Error::NotFound(format!("booking {booking_id}")))?;

        if booking.status != BookingStatus::Approved {
            db.bookings().delete(booking.id)?;
            info!(booking_id = %booking.id, "Booking deleted");
            return Ok(());
        }

        let lock = self.lock_for(booking.hostel_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut hostel = db
            .hostels()
            .find_by_id(booking.hostel_id)?
            .ok_or_else(|| Error::NotFound(format!("hostel {}", booking.hostel_id)))?;
        let room = hostel
            .room_mut(&booking.room_id)
            .ok_or_else(|| Error::NotFound(format!("room {}", booking.room_id)))?;

        let tx = db.transaction()?;
        let bed = occupancy::release_booking(room, booking.id)?;
        db.hostels().update(&mut hostel)?;
        db.bookings().delete(booking.id)?;
        tx.commit()?;

        info!(booking_id = %booking.id, bed = %bed, "Approved booking deleted, bed released");
        Ok(())
    }

    /// Manually set the monthly fee status. Marking Paid stamps the
    /// payment date. This is the whole billing cycle; nothing rolls the
    /// period over automatically.
    #[instrument(skip(self, db, actor))]
    pub fn set_fee_status(
        &self,
        db: &Database,
        actor: SessionUser,
        booking_id: Uuid,
        status: FeeStatus,
    ) -> Result<Booking> {
        PermissionMatrix::require(actor.role, Action::MarkFeeStatus)?;

        let mut booking = db
            .bookings()
            .find_by_id(booking_id)?
            .ok_or_else(|| Error::NotFound(format!("booking {booking_id}")))?;

        booking.fee_status = Some(status);
        if status == FeeStatus::Paid {
            booking.last_payment_date = Some(Utc::now());
        }
        db.bookings().update(&mut booking)?;

        Ok(booking)
    }

    /// Does the user hold any booking besides the given one? Callers
    /// decide about cascading; deletion here never cascades implicitly.
    pub fn has_other_bookings(
        &self,
        db: &Database,
        user_id: Uuid,
        excluding_booking_id: Uuid,
    ) -> Result<bool> {
        db.bookings().has_other_bookings(user_id, excluding_booking_id)
    }

    /// Delete a user account. Refused while any booking references it;
    /// remove the bookings first.
    #[instrument(skip(self, db, actor))]
    pub fn delete_user(&self, db: &Database, actor: SessionUser, user_id: Uuid) -> Result<()> {
        PermissionMatrix::require(actor.role, Action::DeleteUser)?;

        let bookings = db.bookings().count_for_user(user_id)?;
        if bookings > 0 {
            return Err(Error::Validation(format!(
                "user {user_id} still has {bookings} booking(s); remove them first"
            )));
        }

        db.users().delete(user_id)?;
        info!(%user_id, "User deleted");
        Ok(())
    }
}

impl Default for BookingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Hostel, Location, Role, Room, User};

    struct Fixture {
        db: Database,
        engine: BookingEngine,
        manager: SessionUser,
        resident: User,
        hostel: Hostel,
    }

    fn setup_with_capacity(capacity: u32) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let engine = BookingEngine::new();

        let manager = User::new(
            "Manager".into(),
            "m@example.com".into(),
            "pw".into(),
            Role::Manager,
        );
        db.users().create(&manager).unwrap();

        let resident = User::new(
            "Resident".into(),
            "r@example.com".into(),
            "pw".into(),
            Role::Resident,
        );
        db.users().create(&resident).unwrap();

        let hostel = Hostel::new(
            "Green Nest".into(),
            Location {
                region: "Dhaka".into(),
                district: "Dhaka".into(),
                subdistrict: "Mirpur".into(),
                address: "12/4 Kazipara".into(),
            },
            manager.id,
            4500,
        )
        .with_rooms(vec![Room::new("101".into(), capacity, 4500)]);
        db.hostels().create(&hostel).unwrap();

        Fixture {
            db,
            engine,
            manager: SessionUser {
                id: manager.id,
                role: Role::Manager,
            },
            resident,
            hostel,
        }
    }

    fn pending_booking(fx: &Fixture, bed: &str) -> Booking {
        let booking = Booking::new(fx.resident.id, fx.hostel.id, "101".into(), bed.into());
        fx.db.bookings().create(&booking).unwrap();
        booking
    }

    fn occupied_beds(fx: &Fixture) -> Vec<String> {
        let hostel = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        hostel.rooms[0]
            .occupied
            .iter()
            .map(|s| s.bed_id().to_string())
            .collect()
    }

    #[test]
    fn test_approve_occupies_bed() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");

        let approved = fx.engine.approve(&fx.db, fx.manager, booking.id).unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);
        assert_eq!(occupied_beds(&fx), vec!["S1"]);

        let hostel = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        assert_eq!(
            hostel.rooms[0].occupied[0].booking_id(),
            Some(booking.id)
        );
    }

    #[test]
    fn test_fill_room_then_capacity_validation() {
        // Scenario: capacity 4, S1..S4 approve fine, a distinct S5 fails
        // on capacity before any conflict check
        let fx = setup_with_capacity(4);

        for bed in ["S1", "S2", "S3", "S4"] {
            let booking = pending_booking(&fx, bed);
            fx.engine.approve(&fx.db, fx.manager, booking.id).unwrap();
        }

        let fifth = pending_booking(&fx, "S5");
        let err = fx.engine.approve(&fx.db, fx.manager, fifth.id).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(occupied_beds(&fx).len(), 4);
    }

    #[test]
    fn test_conflict_leaves_state_unchanged() {
        let fx = setup_with_capacity(4);

        let winner = pending_booking(&fx, "S1");
        fx.engine.approve(&fx.db, fx.manager, winner.id).unwrap();

        let hostel_before = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        let loser = pending_booking(&fx, "S1");

        let err = fx.engine.approve(&fx.db, fx.manager, loser.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Loser stays pending, occupancy and version untouched
        let loser_after = fx.db.bookings().find_by_id(loser.id).unwrap().unwrap();
        assert_eq!(loser_after.status, BookingStatus::Pending);
        assert_eq!(loser_after.version, 0);

        let hostel_after = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        assert_eq!(hostel_after.version, hostel_before.version);
        assert_eq!(occupied_beds(&fx), vec!["S1"]);
    }

    #[test]
    fn test_no_two_approved_bookings_share_a_bed() {
        let fx = setup_with_capacity(2);

        let first = pending_booking(&fx, "S1");
        let second = pending_booking(&fx, "S1");

        fx.engine.approve(&fx.db, fx.manager, first.id).unwrap();
        assert!(fx.engine.approve(&fx.db, fx.manager, second.id).is_err());

        assert!(fx
            .db
            .bookings()
            .find_approved_for_bed(fx.hostel.id, "101", "S1")
            .unwrap()
            .is_some());
        assert_eq!(occupied_beds(&fx), vec!["S1"]);
    }

    #[test]
    fn test_reject_has_no_occupancy_side_effect() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");

        let rejected = fx.engine.reject(&fx.db, fx.manager, booking.id).unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert!(occupied_beds(&fx).is_empty());

        // Terminal: a rejected booking cannot be approved afterwards
        let err = fx.engine.approve(&fx.db, fx.manager, booking.id).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_delete_approved_releases_exactly_once() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");
        fx.engine.approve(&fx.db, fx.manager, booking.id).unwrap();

        fx.engine.delete(&fx.db, fx.manager, booking.id).unwrap();
        assert!(occupied_beds(&fx).is_empty());
        assert!(fx.db.bookings().find_by_id(booking.id).unwrap().is_none());

        // Second delete signals rather than releasing again
        let err = fx.engine.delete(&fx.db, fx.manager, booking.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_pending_touches_no_room() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");

        let before = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        fx.engine.delete(&fx.db, fx.manager, booking.id).unwrap();
        let after = fx.db.hostels().find_by_id(fx.hostel.id).unwrap().unwrap();
        assert_eq!(before.version, after.version);
    }

    #[test]
    fn test_fee_status_cycles_manually() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");
        fx.engine.approve(&fx.db, fx.manager, booking.id).unwrap();

        let paid = fx
            .engine
            .set_fee_status(&fx.db, fx.manager, booking.id, FeeStatus::Paid)
            .unwrap();
        assert_eq!(paid.effective_fee_status(), FeeStatus::Paid);
        assert!(paid.last_payment_date.is_some());

        // Next cycle the manager resets it by hand
        let unpaid = fx
            .engine
            .set_fee_status(&fx.db, fx.manager, booking.id, FeeStatus::Unpaid)
            .unwrap();
        assert_eq!(unpaid.effective_fee_status(), FeeStatus::Unpaid);
        // The old payment stamp stays
        assert!(unpaid.last_payment_date.is_some());
    }

    #[test]
    fn test_resident_cannot_drive_lifecycle() {
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");
        let resident = SessionUser {
            id: fx.resident.id,
            role: Role::Resident,
        };

        let err = fx.engine.approve(&fx.db, resident, booking.id).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_delete_user_blocked_while_booked() {
        // Scenario: a user with one remaining booking is never silently
        // cascaded away
        let fx = setup_with_capacity(4);
        let booking = pending_booking(&fx, "S1");

        let err = fx
            .engine
            .delete_user(&fx.db, fx.manager, fx.resident.id)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(fx.db.users().find_by_id(fx.resident.id).unwrap().is_some());

        // The explicit query tells the caller what to do first
        assert!(!fx
            .engine
            .has_other_bookings(&fx.db, fx.resident.id, booking.id)
            .unwrap());

        fx.engine.delete(&fx.db, fx.manager, booking.id).unwrap();
        fx.engine
            .delete_user(&fx.db, fx.manager, fx.resident.id)
            .unwrap();
        assert!(fx.db.users().find_by_id(fx.resident.id).unwrap().is_none());
    }

    #[test]
    fn test_lock_registry_reuses_per_hostel() {
        let engine = BookingEngine::new();
        let hostel_id = Uuid::new_v4();

        let a = engine.lock_for(hostel_id);
        let b = engine.lock_for(hostel_id);
        assert!(Arc::ptr_eq(&a, &b));

        let other = engine.lock_for(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
