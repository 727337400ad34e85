//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                -- Plaintext, equality-compared. Matches the product's
                -- change/confirm flows; hardening is out of scope.
                password TEXT NOT NULL,
                role INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 1,
                phone TEXT,
                address TEXT,
                is_managed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Sessions table (role-keyed lookup, not a token)
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                role INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Hostels table; rooms, gallery, and the admin note ride JSON
            -- columns since they are owned wholly by their hostel
            CREATE TABLE IF NOT EXISTS hostels (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                region TEXT NOT NULL,
                district TEXT NOT NULL,
                subdistrict TEXT NOT NULL,
                address TEXT NOT NULL,
                lat REAL,
                lng REAL,
                manager_id TEXT NOT NULL,
                price INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                rooms_json TEXT NOT NULL DEFAULT '[]',
                gallery_json TEXT NOT NULL DEFAULT '[]',
                admin_note_json TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (manager_id) REFERENCES users(id)
            );

            -- Bookings table
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                hostel_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                bed_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                -- NULL reads as 'unpaid'
                fee_status TEXT,
                last_payment_date TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                application_json TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (hostel_id) REFERENCES hostels(id)
            );

            -- Notices table; hostel_id NULL means platform-wide.
            -- Deliberately no foreign key: notices are decoupled from the
            -- rest of the store.
            CREATE TABLE IF NOT EXISTS notices (
                id TEXT PRIMARY KEY,
                hostel_id TEXT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                audience TEXT NOT NULL,
                posted_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            -- Session indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            -- Hostel indexes
            CREATE INDEX IF NOT EXISTS idx_hostels_manager ON hostels(manager_id);
            CREATE INDEX IF NOT EXISTS idx_hostels_status ON hostels(status);

            -- Booking indexes
            CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_hostel ON bookings(hostel_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
            CREATE INDEX IF NOT EXISTS idx_bookings_fee ON bookings(fee_status);

            -- Notice indexes
            CREATE INDEX IF NOT EXISTS idx_notices_hostel ON notices(hostel_id);
            CREATE INDEX IF NOT EXISTS idx_notices_posted ON notices(posted_at);
        "#,
    },
    Migration {
        version: 3,
        description: "Add optimistic version stamps to hostels and bookings",
        sql: r#"
            -- Updates check the caller's stamp; zero affected rows means a
            -- concurrent writer got there first
            ALTER TABLE hostels ADD COLUMN version INTEGER NOT NULL DEFAULT 0;
            ALTER TABLE bookings ADD COLUMN version INTEGER NOT NULL DEFAULT 0;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
