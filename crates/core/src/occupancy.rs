//! Occupancy invariant engine
//!
//! Every mutation of a room's `occupied` list goes through here so the two
//! room invariants hold after every write: the list never exceeds capacity,
//! and a bed id appears at most once per room.
//!
//! Check order matters: capacity is verified before duplicate occupancy, so
//! a full room reports a validation failure even when the requested bed is
//! also taken.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{BedSlot, Room};

/// Seat ids a room offers, `S1..Sn` by capacity
pub fn seat_ids(room: &Room) -> Vec<String> {
    (1..=room.capacity).map(|n| format!("S{n}")).collect()
}

/// Check a bed can be occupied: room not at capacity, bed not already taken
pub fn ensure_bed_available(room: &Room, bed_id: &str) -> Result<()> {
    if room.is_full() {
        return Err(Error::Validation(format!(
            "room {} is at capacity ({})",
            room.id, room.capacity
        )));
    }
    if room.bed_taken(bed_id) {
        return Err(Error::Conflict(format!(
            "bed {} in room {} is already occupied",
            bed_id, room.id
        )));
    }
    Ok(())
}

/// Occupy a bed with a tracked booking slot
pub fn occupy(room: &mut Room, bed_id: String, booking_id: Uuid) -> Result<()> {
    ensure_bed_available(room, &bed_id)?;
    room.occupied.push(BedSlot::Tracked { bed_id, booking_id });
    crate::invariants::assert_room_invariants(room);
    Ok(())
}

/// Release the slot held by a booking, exactly once.
/// Keyed by booking id so a second release of the same booking is a
/// `NotFound` signal rather than a silent repeat.
pub fn release_booking(room: &mut Room, booking_id: Uuid) -> Result<String> {
    let idx = room
        .occupied
        .iter()
        .position(|slot| slot.booking_id() == Some(booking_id));

    match idx {
        Some(idx) => {
            let slot = room.occupied.remove(idx);
            Ok(slot.bed_id().to_string())
        }
        None => Err(Error::NotFound(format!(
            "no occupied slot for booking {} in room {}",
            booking_id, room.id
        ))),
    }
}

/// Change a room's capacity. Shrinking below the current occupied count
/// is refused; evict occupants first.
pub fn set_capacity(room: &mut Room, capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Err(Error::Validation(format!(
            "room {} capacity must be positive",
            room.id
        )));
    }
    if (capacity as usize) < room.occupied.len() {
        return Err(Error::Validation(format!(
            "room {} has {} occupants, cannot set capacity to {}",
            room.id,
            room.occupied.len(),
            capacity
        )));
    }
    room.capacity = capacity;
    crate::invariants::assert_room_invariants(room);
    Ok(())
}

/// Manual occupancy edit: set the occupied count directly.
///
/// Growing synthesizes distinctly-tagged manual placeholders for residents
/// entered off-platform. Shrinking truncates from the tail, last added
/// first; the eviction order is an explicit simplification, not a fairness
/// guarantee. Round-trips by count, not by slot identity.
pub fn set_occupied_count(room: &mut Room, count: u32) -> Result<()> {
    if count > room.capacity {
        return Err(Error::Validation(format!(
            "room {} capacity is {}, cannot mark {} beds occupied",
            room.id, room.capacity, count
        )));
    }

    let count = count as usize;
    if count < room.occupied.len() {
        room.occupied.truncate(count);
    } else {
        while room.occupied.len() < count {
            room.occupied.push(manual_placeholder());
        }
    }

    crate::invariants::assert_room_invariants(room);
    Ok(())
}

fn manual_placeholder() -> BedSlot {
    BedSlot::Manual {
        bed_id: format!("M-{}", Uuid::new_v4().simple()),
        label: "manual entry".to_string(),
    }
}
