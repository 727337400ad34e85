//! Seat selection workflow
//!
//! Short-lived and never persisted: a resident inspects a hostel's rooms
//! as bed grids, holds at most one bed across the whole hostel, then
//! submits an application that becomes a pending booking. If the chosen
//! bed is approved for someone else between selection and submission, the
//! submit fails with a conflict and the selection resets so the resident
//! picks again; another bed is never substituted silently.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{ApplicationDetails, Booking, Hostel, HostelStatus, SessionUser};
use crate::occupancy;
use crate::permissions::{Action, PermissionMatrix};
use crate::storage::Database;

/// One position in a room's bed grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub bed_id: String,
    pub occupied: bool,
    /// Free and the room still has spare capacity
    pub available: bool,
}

/// A room rendered as a grid of seats
#[derive(Debug, Clone)]
pub struct RoomGrid {
    pub room_id: String,
    pub capacity: u32,
    pub price: i64,
    pub seats: Vec<Seat>,
}

impl RoomGrid {
    pub fn seat(&self, bed_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.bed_id == bed_id)
    }
}

/// Bed grids for every room of a hostel, as of one read of the store
#[derive(Debug, Clone)]
pub struct SeatMap {
    pub hostel_id: Uuid,
    pub rooms: Vec<RoomGrid>,
}

impl SeatMap {
    /// Build the grids from a hostel's live occupancy. Manual placeholder
    /// slots carry ids outside the seat range; they still consume
    /// capacity, so a padded room offers fewer available seats.
    pub fn for_hostel(hostel: &Hostel) -> Self {
        let rooms = hostel
            .rooms
            .iter()
            .map(|room| {
                let full = room.is_full();
                let seats = occupancy::seat_ids(room)
                    .into_iter()
                    .map(|bed_id| {
                        let occupied = room.bed_taken(&bed_id);
                        Seat {
                            available: !occupied && !full,
                            bed_id,
                            occupied,
                        }
                    })
                    .collect();

                RoomGrid {
                    room_id: room.id.clone(),
                    capacity: room.capacity,
                    price: room.price,
                    seats,
                }
            })
            .collect();

        Self {
            hostel_id: hostel.id,
            rooms,
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomGrid> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }
}

/// The resident's in-flight choice: at most one bed across the hostel
#[derive(Debug, Clone)]
pub struct SeatSelection {
    hostel_id: Uuid,
    selected: Option<(String, String)>,
}

impl SeatSelection {
    pub fn new(hostel_id: Uuid) -> Self {
        Self {
            hostel_id,
            selected: None,
        }
    }

    pub fn hostel_id(&self) -> Uuid {
        self.hostel_id
    }

    /// The held `(room_id, bed_id)` pair, if any
    pub fn selected(&self) -> Option<(&str, &str)> {
        self.selected
            .as_ref()
            .map(|(room, bed)| (room.as_str(), bed.as_str()))
    }

    /// Pick a seat. Picking a second seat replaces the first; picking the
    /// held seat again releases it.
    pub fn select(&mut self, map: &SeatMap, room_id: &str, bed_id: &str) -> Result<()> {
        if map.hostel_id != self.hostel_id {
            return Err(Error::Validation(
                "seat map belongs to a different hostel".into(),
            ));
        }

        let room = map
            .room(room_id)
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;
        let seat = room
            .seat(bed_id)
            .ok_or_else(|| Error::NotFound(format!("bed {bed_id} in room {room_id}")))?;

        if self.selected() == Some((room_id, bed_id)) {
            self.selected = None;
            return Ok(());
        }

        if !seat.available {
            return Err(Error::Conflict(format!(
                "bed {bed_id} in room {room_id} is not available"
            )));
        }

        self.selected = Some((room_id.to_string(), bed_id.to_string()));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Submit the application for the held seat, producing a pending
    /// booking with the form embedded 1:1.
    ///
    /// An unauthenticated submit aborts to the sign-in step; the held
    /// selection may be discarded across that redirect, which is a known
    /// gap in the flow. A bed taken since selection surfaces as Conflict
    /// and resets the selection so the caller prompts a re-pick.
    #[instrument(skip(self, db, viewer, application))]
    pub fn submit(
        &mut self,
        db: &Database,
        viewer: Option<SessionUser>,
        application: ApplicationDetails,
    ) -> Result<Booking> {
        let (room_id, bed_id) = self
            .selected
            .clone()
            .ok_or_else(|| Error::Validation("select a bed before submitting".into()))?;

        let viewer = viewer.ok_or_else(|| {
            Error::Authentication("sign in to submit a booking application".into())
        })?;
        PermissionMatrix::require(viewer.role, Action::SubmitBooking)?;

        if let Some(field) = application.missing_field() {
            return Err(Error::Validation(format!(
                "application field {field} is required"
            )));
        }

        let hostel = db
            .hostels()
            .find_by_id(self.hostel_id)?
            .ok_or_else(|| Error::NotFound(format!("hostel {}", self.hostel_id)))?;

        if hostel.status != HostelStatus::Active {
            return Err(Error::Validation(format!(
                "hostel {} is not accepting bookings",
                hostel.name
            )));
        }

        let room = hostel
            .room(&room_id)
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;

        // The bed may have been approved for someone else since selection
        if let Err(e) = occupancy::ensure_bed_available(room, &bed_id) {
            self.selected = None;
            return Err(e);
        }

        let booking = Booking::new(viewer.id, hostel.id, room_id, bed_id)
            .with_application(application);
        db.bookings().create(&booking)?;

        self.selected = None;
        info!(booking_id = %booking.id, bed = %booking.bed_id, "Booking application submitted");
        Ok(booking)
    }
}
