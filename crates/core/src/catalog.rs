//! Hostel catalog lifecycle
//!
//! Listings are created Pending by their manager, reviewed by admin into
//! Active or Rejected, and toggled Active/Inactive by the manager. Any
//! manager edit of the listing itself drops it back to Pending for
//! re-review; admin status decisions and occupancy bookkeeping do not.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::geography::GeoIndex;
use crate::models::{
    AdminNote, GeoPoint, Hostel, HostelStatus, Location, Role, Room, SessionUser,
};
use crate::occupancy;
use crate::permissions::{Action, PermissionMatrix};
use crate::storage::Database;

/// Field changes a manager submits from the listing form.
/// `None` leaves the field as it was.
#[derive(Debug, Clone, Default)]
pub struct HostelChanges {
    pub name: Option<String>,
    pub location: Option<Location>,
    pub coords: Option<GeoPoint>,
    pub price: Option<i64>,
    pub gallery: Option<Vec<String>>,
}

impl HostelChanges {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.coords.is_none()
            && self.price.is_none()
            && self.gallery.is_none()
    }
}

fn load(db: &Database, hostel_id: Uuid) -> Result<Hostel> {
    db.hostels()
        .find_by_id(hostel_id)?
        .ok_or_else(|| Error::NotFound(format!("hostel {hostel_id}")))
}

/// The owning manager, or admin where the action allows it
fn require_owner(hostel: &Hostel, actor: SessionUser) -> Result<()> {
    if hostel.manager_id != actor.id {
        return Err(Error::PermissionDenied(format!(
            "hostel {} is not managed by this account",
            hostel.id
        )));
    }
    Ok(())
}

fn validate_rooms(rooms: &[Room]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for room in rooms {
        if room.capacity == 0 {
            return Err(Error::Validation(format!(
                "room {} capacity must be positive",
                room.id
            )));
        }
        if !seen.insert(room.id.as_str()) {
            return Err(Error::Validation(format!("duplicate room id {}", room.id)));
        }
    }
    Ok(())
}

/// Register a new listing. Created Pending; admin review follows.
#[instrument(skip(db, geo, actor, rooms), fields(name = %name))]
pub fn register(
    db: &Database,
    geo: &GeoIndex,
    actor: SessionUser,
    name: String,
    location: Location,
    coords: Option<GeoPoint>,
    price: i64,
    rooms: Vec<Room>,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::RegisterHostel)?;

    if name.trim().is_empty() {
        return Err(Error::Validation("hostel name is required".into()));
    }
    geo.validate(&location)?;
    validate_rooms(&rooms)?;

    let mut hostel = Hostel::new(name, location, actor.id, price).with_rooms(rooms);
    if let Some(coords) = coords {
        hostel = hostel.with_coords(coords);
    }

    db.hostels().create(&hostel)?;
    info!(hostel_id = %hostel.id, "Hostel registered, pending review");
    Ok(hostel)
}

/// Apply a manager's listing edit. Whatever the field, the listing goes
/// back to Pending for re-review.
#[instrument(skip(db, geo, actor, changes))]
pub fn edit(
    db: &Database,
    geo: &GeoIndex,
    actor: SessionUser,
    hostel_id: Uuid,
    changes: HostelChanges,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::EditHostel)?;

    let mut hostel = load(db, hostel_id)?;
    require_owner(&hostel, actor)?;

    if changes.is_empty() {
        return Ok(hostel);
    }

    if let Some(name) = changes.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("hostel name is required".into()));
        }
        hostel.name = name;
    }
    if let Some(location) = changes.location {
        geo.validate(&location)?;
        hostel.location = location;
    }
    if let Some(coords) = changes.coords {
        hostel.coords = Some(coords);
    }
    if let Some(price) = changes.price {
        hostel.price = price;
    }
    if let Some(gallery) = changes.gallery {
        hostel.gallery = gallery;
    }

    hostel.status = HostelStatus::Pending;
    db.hostels().update(&mut hostel)?;

    info!(hostel_id = %hostel.id, "Hostel edited, back to pending review");
    Ok(hostel)
}

/// Admin review decision. Only Active or Rejected are decisions; this
/// path never re-triggers the pending reset.
#[instrument(skip(db, actor))]
pub fn review(
    db: &Database,
    actor: SessionUser,
    hostel_id: Uuid,
    decision: HostelStatus,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::ReviewHostel)?;

    if !matches!(decision, HostelStatus::Active | HostelStatus::Rejected) {
        return Err(Error::Validation(format!(
            "review decision must be active or rejected, not {}",
            decision.as_str()
        )));
    }

    let mut hostel = load(db, hostel_id)?;
    hostel.status = decision;
    db.hostels().update(&mut hostel)?;

    info!(hostel_id = %hostel.id, decision = decision.as_str(), "Hostel reviewed");
    Ok(hostel)
}

/// Manager's own Active/Inactive toggle. Only meaningful once the admin
/// has approved the listing; does not reset to Pending.
#[instrument(skip(db, actor))]
pub fn set_availability(
    db: &Database,
    actor: SessionUser,
    hostel_id: Uuid,
    available: bool,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::ToggleHostelAvailability)?;

    let mut hostel = load(db, hostel_id)?;
    require_owner(&hostel, actor)?;

    if !matches!(hostel.status, HostelStatus::Active | HostelStatus::Inactive) {
        return Err(Error::Validation(format!(
            "hostel {} is {}, availability applies to approved listings",
            hostel.id,
            hostel.status.as_str()
        )));
    }

    hostel.status = if available {
        HostelStatus::Active
    } else {
        HostelStatus::Inactive
    };
    db.hostels().update(&mut hostel)?;
    Ok(hostel)
}

/// Pin an admin note on the listing, shown to the note's audience.
/// Not a manager edit; no pending reset.
#[instrument(skip(db, actor, note))]
pub fn attach_admin_note(
    db: &Database,
    actor: SessionUser,
    hostel_id: Uuid,
    note: AdminNote,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::AttachAdminNote)?;

    let mut hostel = load(db, hostel_id)?;
    hostel.admin_note = Some(note);
    db.hostels().update(&mut hostel)?;
    Ok(hostel)
}

/// Manual occupancy bookkeeping for off-platform residents. Grows with
/// placeholder slots, shrinks from the tail. Bookkeeping, not a listing
/// edit; no pending reset.
#[instrument(skip(db, actor))]
pub fn set_room_occupancy(
    db: &Database,
    actor: SessionUser,
    hostel_id: Uuid,
    room_id: &str,
    count: u32,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::EditRoomOccupancy)?;

    let mut hostel = load(db, hostel_id)?;
    require_owner(&hostel, actor)?;

    let room = hostel
        .room_mut(room_id)
        .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;
    occupancy::set_occupied_count(room, count)?;

    db.hostels().update(&mut hostel)?;
    Ok(hostel)
}

/// Change a room's capacity. A listing-shape change, so it re-triggers
/// review like any other manager edit.
#[instrument(skip(db, actor))]
pub fn set_room_capacity(
    db: &Database,
    actor: SessionUser,
    hostel_id: Uuid,
    room_id: &str,
    capacity: u32,
) -> Result<Hostel> {
    PermissionMatrix::require(actor.role, Action::EditRoomCapacity)?;

    let mut hostel = load(db, hostel_id)?;
    require_owner(&hostel, actor)?;

    let room = hostel
        .room_mut(room_id)
        .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;
    occupancy::set_capacity(room, capacity)?;

    hostel.status = HostelStatus::Pending;
    db.hostels().update(&mut hostel)?;
    Ok(hostel)
}

/// Delete a listing. Refused while bookings reference it, so no booking
/// is ever orphaned; remove or migrate them first.
#[instrument(skip(db, actor))]
pub fn delete(db: &Database, actor: SessionUser, hostel_id: Uuid) -> Result<()> {
    PermissionMatrix::require(actor.role, Action::DeleteHostel)?;

    let hostel = load(db, hostel_id)?;
    if actor.role == Role::Manager {
        require_owner(&hostel, actor)?;
    }

    let bookings = db.bookings().count_for_hostel(hostel_id)?;
    if bookings > 0 {
        return Err(Error::Validation(format!(
            "hostel {hostel_id} still has {bookings} booking(s); remove them first"
        )));
    }

    db.hostels().delete(hostel_id)?;
    info!(%hostel_id, "Hostel deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Audience, Booking, Role, User};

    struct Fixture {
        db: Database,
        geo: GeoIndex,
        manager: SessionUser,
        admin: SessionUser,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();

        let manager = User::new(
            "Manager".into(),
            "m@example.com".into(),
            "pw".into(),
            Role::Manager,
        );
        db.users().create(&manager).unwrap();

        let admin = User::new(
            "Admin".into(),
            "a@example.com".into(),
            "pw".into(),
            Role::Admin,
        );
        db.users().create(&admin).unwrap();

        Fixture {
            db,
            geo: GeoIndex::embedded(),
            manager: SessionUser {
                id: manager.id,
                role: Role::Manager,
            },
            admin: SessionUser {
                id: admin.id,
                role: Role::Admin,
            },
        }
    }

    fn location() -> Location {
        Location {
            region: "Dhaka".into(),
            district: "Dhaka".into(),
            subdistrict: "Mirpur".into(),
            address: "12/4 Kazipara".into(),
        }
    }

    fn registered(fx: &Fixture) -> Hostel {
        register(
            &fx.db,
            &fx.geo,
            fx.manager,
            "Green Nest".into(),
            location(),
            None,
            4500,
            vec![Room::new("101".into(), 4, 4500)],
        )
        .unwrap()
    }

    #[test]
    fn test_register_starts_pending() {
        let fx = setup();
        let hostel = registered(&fx);
        assert_eq!(hostel.status, HostelStatus::Pending);
        assert_eq!(hostel.manager_id, fx.manager.id);
    }

    #[test]
    fn test_register_rejects_unknown_geography() {
        let fx = setup();
        let err = register(
            &fx.db,
            &fx.geo,
            fx.manager,
            "Nowhere Nest".into(),
            Location {
                region: "Atlantis".into(),
                district: "Deep".into(),
                subdistrict: "Deeper".into(),
                address: "x".into(),
            },
            None,
            4500,
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_register_rejects_bad_rooms() {
        let fx = setup();
        let err = register(
            &fx.db,
            &fx.geo,
            fx.manager,
            "Green Nest".into(),
            location(),
            None,
            4500,
            vec![
                Room::new("101".into(), 4, 4500),
                Room::new("101".into(), 2, 6000),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_manager_edit_resets_active_to_pending() {
        let fx = setup();
        let hostel = registered(&fx);
        review(&fx.db, fx.admin, hostel.id, HostelStatus::Active).unwrap();

        let edited = edit(
            &fx.db,
            &fx.geo,
            fx.manager,
            hostel.id,
            HostelChanges {
                price: Some(5000),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(edited.status, HostelStatus::Pending);
        assert_eq!(edited.price, 5000);
    }

    #[test]
    fn test_admin_transitions_do_not_reset() {
        let fx = setup();
        let hostel = registered(&fx);

        let reviewed = review(&fx.db, fx.admin, hostel.id, HostelStatus::Active).unwrap();
        assert_eq!(reviewed.status, HostelStatus::Active);

        let noted = attach_admin_note(
            &fx.db,
            fx.admin,
            hostel.id,
            AdminNote {
                message: "verified on site".into(),
                audience: Audience::Managers,
            },
        )
        .unwrap();
        assert_eq!(noted.status, HostelStatus::Active);
        assert!(noted.admin_note.is_some());
    }

    #[test]
    fn test_review_only_decides_active_or_rejected() {
        let fx = setup();
        let hostel = registered(&fx);
        let err = review(&fx.db, fx.admin, hostel.id, HostelStatus::Pending).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_availability_toggle_keeps_review_state() {
        let fx = setup();
        let hostel = registered(&fx);

        // Not yet approved
        let err = set_availability(&fx.db, fx.manager, hostel.id, false).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        review(&fx.db, fx.admin, hostel.id, HostelStatus::Active).unwrap();

        let off = set_availability(&fx.db, fx.manager, hostel.id, false).unwrap();
        assert_eq!(off.status, HostelStatus::Inactive);

        let on = set_availability(&fx.db, fx.manager, hostel.id, true).unwrap();
        assert_eq!(on.status, HostelStatus::Active);
    }

    #[test]
    fn test_occupancy_bookkeeping_does_not_reset() {
        let fx = setup();
        let hostel = registered(&fx);
        review(&fx.db, fx.admin, hostel.id, HostelStatus::Active).unwrap();

        let after = set_room_occupancy(&fx.db, fx.manager, hostel.id, "101", 3).unwrap();
        assert_eq!(after.status, HostelStatus::Active);
        assert_eq!(after.rooms[0].occupied.len(), 3);

        // Round-trip by count
        let back = set_room_occupancy(&fx.db, fx.manager, hostel.id, "101", 0).unwrap();
        assert!(back.rooms[0].occupied.is_empty());
    }

    #[test]
    fn test_capacity_change_resets_to_pending() {
        let fx = setup();
        let hostel = registered(&fx);
        review(&fx.db, fx.admin, hostel.id, HostelStatus::Active).unwrap();

        let after = set_room_capacity(&fx.db, fx.manager, hostel.id, "101", 6).unwrap();
        assert_eq!(after.status, HostelStatus::Pending);
        assert_eq!(after.rooms[0].capacity, 6);
    }

    #[test]
    fn test_foreign_manager_cannot_touch_listing() {
        let fx = setup();
        let hostel = registered(&fx);

        let other = User::new(
            "Other".into(),
            "other@example.com".into(),
            "pw".into(),
            Role::Manager,
        );
        fx.db.users().create(&other).unwrap();
        let other = SessionUser {
            id: other.id,
            role: Role::Manager,
        };

        let err = set_availability(&fx.db, other, hostel.id, false).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_delete_refused_while_booked() {
        let fx = setup();
        let hostel = registered(&fx);

        let resident = User::new(
            "Resident".into(),
            "r@example.com".into(),
            "pw".into(),
            Role::Resident,
        );
        fx.db.users().create(&resident).unwrap();
        let booking = Booking::new(resident.id, hostel.id, "101".into(), "S1".into());
        fx.db.bookings().create(&booking).unwrap();

        let err = delete(&fx.db, fx.manager, hostel.id).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(fx.db.hostels().find_by_id(hostel.id).unwrap().is_some());

        fx.db.bookings().delete(booking.id).unwrap();
        delete(&fx.db, fx.manager, hostel.id).unwrap();
        assert!(fx.db.hostels().find_by_id(hostel.id).unwrap().is_none());
    }
}
