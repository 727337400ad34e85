//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{Booking, BookingStatus, Hostel, Room};

/// Validate that a Room's occupancy is internally consistent
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        room.occupied.len() <= room.capacity as usize,
        "Room {} has {} occupants over capacity {}",
        room.id,
        room.occupied.len(),
        room.capacity
    );

    let mut seen = HashSet::new();
    for slot in &room.occupied {
        debug_assert!(
            seen.insert(slot.bed_id()),
            "Room {} has duplicate occupied bed {}",
            room.id,
            slot.bed_id()
        );
    }
}

/// Validate that a Hostel's state is internally consistent
pub fn assert_hostel_invariants(hostel: &Hostel) {
    debug_assert!(
        !hostel.name.trim().is_empty(),
        "Hostel {} has empty name",
        hostel.id
    );

    let mut room_ids = HashSet::new();
    for room in &hostel.rooms {
        debug_assert!(
            room_ids.insert(room.id.as_str()),
            "Hostel {} has duplicate room id {}",
            hostel.id,
            room.id
        );
        assert_room_invariants(room);
    }
}

/// Validate that an approved booking's bed is tracked in its room
pub fn assert_booking_occupancy(booking: &Booking, hostel: &Hostel) {
    if booking.status != BookingStatus::Approved || booking.hostel_id != hostel.id {
        return;
    }

    let tracked = hostel.room(&booking.room_id).is_some_and(|room| {
        room.occupied
            .iter()
            .any(|slot| slot.booking_id() == Some(booking.id))
    });

    debug_assert!(
        tracked,
        "Approved booking {} has no tracked slot in hostel {} room {}",
        booking.id,
        hostel.id,
        booking.room_id
    );
}
