//! Bunkmate Core Library
//!
//! Booking and occupancy engine for the Bunkmate hostel marketplace:
//! entity store, occupancy invariants, booking lifecycle, seat selection,
//! and notice targeting.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod geography;
pub mod invariants;
pub mod lifecycle;
pub mod models;
pub mod noticeboard;
pub mod occupancy;
pub mod permissions;
pub mod selection;
pub mod storage;

pub use error::{Error, Result};
pub use geography::GeoIndex;
pub use lifecycle::BookingEngine;
pub use models::*;
pub use permissions::{Action, PermissionMatrix};
pub use selection::{SeatMap, SeatSelection};
pub use storage::{
    BookingRepository, BookingStore, Database, HostelRepository, HostelStore, NoticeRepository,
    NoticeStore, Storage, UserRepository, UserStore,
};
