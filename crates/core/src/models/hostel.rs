//! Hostel, room, and occupancy models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Audience;

/// Where a hostel sits in the region / district / subdistrict tree,
/// plus the free-text street address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub region: String,
    pub district: String,
    pub subdistrict: String,
    pub address: String,
}

/// Opaque coordinate pair from the map-picker collaborator.
/// The core stores it and never computes with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Listing lifecycle: created Pending by a manager, admin review moves it
/// to Active or Rejected, the manager may toggle Active/Inactive, and any
/// manager edit drops it back to Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostelStatus {
    Pending,
    Active,
    Inactive,
    Rejected,
}

impl HostelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostelStatus::Pending => "pending",
            HostelStatus::Active => "active",
            HostelStatus::Inactive => "inactive",
            HostelStatus::Rejected => "rejected",
        }
    }
}

/// A note the admin pins on a listing, shown to the given audience
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNote {
    pub message: String,
    pub audience: Audience,
}

/// One occupied bed slot in a room
///
/// `Tracked` slots are owned by an approved booking. `Manual` slots are
/// placeholders a manager enters for residents who live in the hostel but
/// were never on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BedSlot {
    Tracked { bed_id: String, booking_id: Uuid },
    Manual { bed_id: String, label: String },
}

impl BedSlot {
    pub fn bed_id(&self) -> &str {
        match self {
            BedSlot::Tracked { bed_id, .. } => bed_id,
            BedSlot::Manual { bed_id, .. } => bed_id,
        }
    }

    pub fn booking_id(&self) -> Option<Uuid> {
        match self {
            BedSlot::Tracked { booking_id, .. } => Some(*booking_id),
            BedSlot::Manual { .. } => None,
        }
    }
}

/// A room inside a hostel
///
/// `id` is unique within its hostel only. `occupied` never exceeds
/// `capacity`; the occupancy engine owns every mutation of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub capacity: u32,
    pub occupied: Vec<BedSlot>,
    pub price: i64,
}

impl Room {
    pub fn new(id: String, capacity: u32, price: i64) -> Self {
        Self {
            id,
            capacity,
            occupied: Vec::new(),
            price,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupied.len() >= self.capacity as usize
    }

    pub fn bed_taken(&self, bed_id: &str) -> bool {
        self.occupied.iter().any(|slot| slot.bed_id() == bed_id)
    }
}

/// A hostel listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostel {
    pub id: Uuid,
    pub name: String,
    pub location: Location,
    pub coords: Option<GeoPoint>,
    pub manager_id: Uuid,
    /// Base monthly price; individual rooms may override
    pub price: i64,
    pub status: HostelStatus,
    /// Ordered; room ids are unique within this list
    pub rooms: Vec<Room>,
    /// Opaque media references owned by the upload collaborator
    pub gallery: Vec<String>,
    pub admin_note: Option<AdminNote>,
    /// Optimistic concurrency stamp, bumped on every persisted update
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Hostel {
    pub fn new(name: String, location: Location, manager_id: Uuid, price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            location,
            coords: None,
            manager_id,
            price,
            status: HostelStatus::Pending,
            rooms: Vec::new(),
            gallery: Vec::new(),
            admin_note: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_coords(mut self, coords: GeoPoint) -> Self {
        self.coords = Some(coords);
        self
    }

    pub fn with_rooms(mut self, rooms: Vec<Room>) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hostel() -> Hostel {
        Hostel::new(
            "Green Nest".into(),
            Location {
                region: "Dhaka".into(),
                district: "Dhaka".into(),
                subdistrict: "Mirpur".into(),
                address: "12/4 Kazipara".into(),
            },
            Uuid::new_v4(),
            4500,
        )
    }

    #[test]
    fn test_new_hostel_is_pending() {
        let hostel = make_hostel();
        assert_eq!(hostel.status, HostelStatus::Pending);
        assert_eq!(hostel.version, 0);
        assert!(hostel.rooms.is_empty());
    }

    #[test]
    fn test_room_lookup() {
        let hostel = make_hostel().with_rooms(vec![
            Room::new("101".into(), 4, 4500),
            Room::new("102".into(), 2, 6000),
        ]);
        assert!(hostel.room("101").is_some());
        assert!(hostel.room("301").is_none());
    }

    #[test]
    fn test_room_full_and_bed_taken() {
        let mut room = Room::new("101".into(), 2, 4500);
        assert!(!room.is_full());

        room.occupied.push(BedSlot::Tracked {
            bed_id: "S1".into(),
            booking_id: Uuid::new_v4(),
        });
        room.occupied.push(BedSlot::Manual {
            bed_id: "M-1".into(),
            label: "off-platform".into(),
        });

        assert!(room.is_full());
        assert!(room.bed_taken("S1"));
        assert!(room.bed_taken("M-1"));
        assert!(!room.bed_taken("S2"));
    }

    #[test]
    fn test_bed_slot_roundtrip_json() {
        let slot = BedSlot::Tracked {
            bed_id: "S3".into(),
            booking_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&slot).unwrap();
        assert!(json.contains("\"kind\":\"tracked\""));
        let back: BedSlot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot);
    }
}
