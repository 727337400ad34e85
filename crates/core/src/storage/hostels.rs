//! Hostel storage operations
//!
//! Rooms, gallery, and the admin note are owned wholly by their hostel and
//! ride JSON columns. Updates check the optimistic version stamp.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    hostel_status_from_str, parse_datetime, parse_json, parse_json_opt, parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{GeoPoint, Hostel, HostelStatus, Location};

pub struct HostelStore<'a> {
    conn: &'a Connection,
}

const HOSTEL_COLUMNS: &str = "id, name, region, district, subdistrict, address, lat, lng, \
     manager_id, price, status, rooms_json, gallery_json, admin_note_json, version, created_at";

fn read_hostel(row: &Row<'_>) -> rusqlite::Result<Hostel> {
    let lat: Option<f64> = row.get(6)?;
    let lng: Option<f64> = row.get(7)?;

    Ok(Hostel {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        location: Location {
            region: row.get(2)?,
            district: row.get(3)?,
            subdistrict: row.get(4)?,
            address: row.get(5)?,
        },
        coords: lat.zip(lng).map(|(lat, lng)| GeoPoint { lat, lng }),
        manager_id: parse_uuid(&row.get::<_, String>(8)?)?,
        price: row.get(9)?,
        status: hostel_status_from_str(&row.get::<_, String>(10)?)?,
        rooms: parse_json(&row.get::<_, String>(11)?)?,
        gallery: parse_json(&row.get::<_, String>(12)?)?,
        admin_note: parse_json_opt(row.get::<_, Option<String>>(13)?)?,
        version: row.get(14)?,
        created_at: parse_datetime(&row.get::<_, String>(15)?)?,
    })
}

impl<'a> HostelStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new hostel listing
    #[instrument(skip(self, hostel), fields(hostel_name = %hostel.name))]
    pub fn create(&self, hostel: &Hostel) -> Result<()> {
        crate::invariants::assert_hostel_invariants(hostel);

        self.conn.execute(
            "INSERT INTO hostels (id, name, region, district, subdistrict, address, lat, lng,
                                  manager_id, price, status, rooms_json, gallery_json,
                                  admin_note_json, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                hostel.id.to_string(),
                hostel.name,
                hostel.location.region,
                hostel.location.district,
                hostel.location.subdistrict,
                hostel.location.address,
                hostel.coords.map(|c| c.lat),
                hostel.coords.map(|c| c.lng),
                hostel.manager_id.to_string(),
                hostel.price,
                hostel.status.as_str(),
                serde_json::to_string(&hostel.rooms)?,
                serde_json::to_string(&hostel.gallery)?,
                hostel
                    .admin_note
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                hostel.version,
                hostel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace the row if the id exists, insert otherwise.
    /// Skips the version check; lifecycle code should prefer `update`.
    #[instrument(skip(self, hostel), fields(hostel_id = %hostel.id))]
    pub fn upsert(&self, hostel: &Hostel) -> Result<()> {
        crate::invariants::assert_hostel_invariants(hostel);

        self.conn.execute(
            "INSERT INTO hostels (id, name, region, district, subdistrict, address, lat, lng,
                                  manager_id, price, status, rooms_json, gallery_json,
                                  admin_note_json, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                region = excluded.region,
                district = excluded.district,
                subdistrict = excluded.subdistrict,
                address = excluded.address,
                lat = excluded.lat,
                lng = excluded.lng,
                manager_id = excluded.manager_id,
                price = excluded.price,
                status = excluded.status,
                rooms_json = excluded.rooms_json,
                gallery_json = excluded.gallery_json,
                admin_note_json = excluded.admin_note_json,
                version = excluded.version",
            params![
                hostel.id.to_string(),
                hostel.name,
                hostel.location.region,
                hostel.location.district,
                hostel.location.subdistrict,
                hostel.location.address,
                hostel.coords.map(|c| c.lat),
                hostel.coords.map(|c| c.lng),
                hostel.manager_id.to_string(),
                hostel.price,
                hostel.status.as_str(),
                serde_json::to_string(&hostel.rooms)?,
                serde_json::to_string(&hostel.gallery)?,
                hostel
                    .admin_note
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                hostel.version,
                hostel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find hostel by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Hostel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {HOSTEL_COLUMNS} FROM hostels WHERE id = ?1"))?;

        let hostel = stmt
            .query_row(params![id.to_string()], read_hostel)
            .optional()?;

        Ok(hostel)
    }

    /// Persist an updated hostel, checking the caller's version stamp.
    /// A concurrent writer having bumped the stamp surfaces as Conflict.
    /// On success the caller's copy carries the bumped stamp.
    #[instrument(skip(self, hostel), fields(hostel_id = %hostel.id))]
    pub fn update(&self, hostel: &mut Hostel) -> Result<()> {
        crate::invariants::assert_hostel_invariants(hostel);

        let changed = self.conn.execute(
            "UPDATE hostels SET name = ?1, region = ?2, district = ?3, subdistrict = ?4,
                                address = ?5, lat = ?6, lng = ?7, price = ?8, status = ?9,
                                rooms_json = ?10, gallery_json = ?11, admin_note_json = ?12,
                                version = version + 1
             WHERE id = ?13 AND version = ?14",
            params![
                hostel.name,
                hostel.location.region,
                hostel.location.district,
                hostel.location.subdistrict,
                hostel.location.address,
                hostel.coords.map(|c| c.lat),
                hostel.coords.map(|c| c.lng),
                hostel.price,
                hostel.status.as_str(),
                serde_json::to_string(&hostel.rooms)?,
                serde_json::to_string(&hostel.gallery)?,
                hostel
                    .admin_note
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                hostel.id.to_string(),
                hostel.version,
            ],
        )?;

        if changed == 0 {
            return if self.find_by_id(hostel.id)?.is_some() {
                Err(Error::Conflict(format!(
                    "hostel {} was modified concurrently",
                    hostel.id
                )))
            } else {
                Err(Error::NotFound(format!("hostel {}", hostel.id)))
            };
        }

        hostel.version += 1;
        Ok(())
    }

    /// Hard delete. The catalog refuses deletion while bookings reference
    /// the hostel; this is the raw store operation.
    #[instrument(skip(self))]
    pub fn delete(&self, hostel_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM hostels WHERE id = ?1",
            params![hostel_id.to_string()],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("hostel {hostel_id}")));
        }
        Ok(())
    }

    /// List all hostels, newest first
    pub fn list(&self) -> Result<Vec<Hostel>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HOSTEL_COLUMNS} FROM hostels ORDER BY created_at DESC"
        ))?;

        let hostels = stmt
            .query_map([], read_hostel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hostels)
    }

    /// List hostels in a given lifecycle status
    pub fn list_by_status(&self, status: HostelStatus) -> Result<Vec<Hostel>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HOSTEL_COLUMNS} FROM hostels WHERE status = ?1 ORDER BY created_at DESC"
        ))?;

        let hostels = stmt
            .query_map(params![status.as_str()], read_hostel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hostels)
    }

    /// List hostels run by a manager
    pub fn list_by_manager(&self, manager_id: Uuid) -> Result<Vec<Hostel>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HOSTEL_COLUMNS} FROM hostels WHERE manager_id = ?1 ORDER BY created_at DESC"
        ))?;

        let hostels = stmt
            .query_map(params![manager_id.to_string()], read_hostel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hostels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Room, User};
    use crate::storage::Database;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let manager = User::new(
            "Manager".into(),
            "m@example.com".into(),
            "pw".into(),
            Role::Manager,
        );
        db.users().create(&manager).unwrap();
        (db, manager.id)
    }

    fn hostel(manager_id: Uuid) -> Hostel {
        Hostel::new(
            "Green Nest".into(),
            Location {
                region: "Dhaka".into(),
                district: "Dhaka".into(),
                subdistrict: "Mirpur".into(),
                address: "12/4 Kazipara".into(),
            },
            manager_id,
            4500,
        )
        .with_rooms(vec![Room::new("101".into(), 4, 4500)])
    }

    #[test]
    fn test_create_and_find_roundtrip() {
        let (db, manager_id) = setup();
        let store = db.hostels();

        let hostel = hostel(manager_id).with_coords(GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        });
        store.create(&hostel).unwrap();

        let found = store.find_by_id(hostel.id).unwrap().unwrap();
        assert_eq!(found.name, "Green Nest");
        assert_eq!(found.rooms.len(), 1);
        assert_eq!(found.rooms[0].capacity, 4);
        assert_eq!(found.status, HostelStatus::Pending);
        assert!(found.coords.is_some());
    }

    #[test]
    fn test_update_bumps_version() {
        let (db, manager_id) = setup();
        let store = db.hostels();

        let mut hostel = hostel(manager_id);
        store.create(&hostel).unwrap();

        hostel.price = 5000;
        store.update(&mut hostel).unwrap();
        assert_eq!(hostel.version, 1);

        let found = store.find_by_id(hostel.id).unwrap().unwrap();
        assert_eq!(found.price, 5000);
        assert_eq!(found.version, 1);
    }

    #[test]
    fn test_stale_version_is_conflict() {
        let (db, manager_id) = setup();
        let store = db.hostels();

        let mut first = hostel(manager_id);
        store.create(&first).unwrap();

        let mut second = store.find_by_id(first.id).unwrap().unwrap();
        second.name = "Renamed".into();
        store.update(&mut second).unwrap();

        // First writer still holds the old stamp
        first.price = 9999;
        let err = store.update(&mut first).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let found = store.find_by_id(first.id).unwrap().unwrap();
        assert_eq!(found.price, 4500);
        assert_eq!(found.name, "Renamed");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (db, manager_id) = setup();
        let mut ghost = hostel(manager_id);
        ghost.id = Uuid::new_v4();
        let err = db.hostels().update(&mut ghost).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_by_status_and_manager() {
        let (db, manager_id) = setup();
        let store = db.hostels();

        let mut active = hostel(manager_id);
        store.create(&active).unwrap();
        active.status = HostelStatus::Active;
        store.update(&mut active).unwrap();

        let mut pending = hostel(manager_id);
        pending.name = "Blue Roof".into();
        store.create(&pending).unwrap();

        assert_eq!(store.list_by_status(HostelStatus::Active).unwrap().len(), 1);
        assert_eq!(store.list_by_status(HostelStatus::Pending).unwrap().len(), 1);
        assert_eq!(store.list_by_manager(manager_id).unwrap().len(), 2);
    }
}
