//! Baseline fixture
//!
//! A fresh store gets a working set of accounts and one listed hostel so
//! the platform is usable before anyone registers.

use rusqlite::Connection;
use tracing::{info, instrument};

use super::{HostelStore, UserStore};
use crate::error::Result;
use crate::models::{Hostel, HostelStatus, Location, Role, Room, User};

/// Seed the baseline fixture if the store is empty. Idempotent.
#[instrument(skip(conn))]
pub fn ensure_baseline(conn: &Connection) -> Result<()> {
    let users = UserStore::new(conn);
    if users.count()? > 0 {
        return Ok(());
    }

    info!("Seeding baseline fixture");

    let admin = User::new(
        "Platform Admin".to_string(),
        "admin@bunkmate.app".to_string(),
        "admin".to_string(),
        Role::Admin,
    );
    users.create(&admin)?;

    let manager = User::new(
        "Demo Manager".to_string(),
        "manager@bunkmate.app".to_string(),
        "manager".to_string(),
        Role::Manager,
    );
    users.create(&manager)?;

    let mut hostel = Hostel::new(
        "Green Nest Hostel".to_string(),
        Location {
            region: "Dhaka".to_string(),
            district: "Dhaka".to_string(),
            subdistrict: "Mirpur".to_string(),
            address: "12/4 Kazipara, Mirpur".to_string(),
        },
        manager.id,
        4500,
    )
    .with_rooms(vec![
        Room::new("101".to_string(), 4, 4500),
        Room::new("102".to_string(), 2, 6000),
    ]);
    hostel.status = HostelStatus::Active;
    HostelStore::new(conn).create(&hostel)?;

    Ok(())
}
