//! User and session storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_uuid, role_from_u8, user_status_from_u8, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Role, Session, User, UserStatus};

pub struct UserStore<'a> {
    conn: &'a Connection,
}

const USER_COLUMNS: &str =
    "id, name, email, password, role, status, phone, address, is_managed, created_at";

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: role_from_u8(row.get::<_, u8>(4)?),
        status: user_status_from_u8(row.get::<_, u8>(5)?),
        phone: row.get(6)?,
        address: row.get(7)?,
        is_managed: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user; a duplicate email surfaces as Validation
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn create(&self, user: &User) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO users (id, name, email, password, role, status, phone, address, is_managed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password,
                user.role as u8,
                user.status as u8,
                user.phone,
                user.address,
                user.is_managed,
                user.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Validation(format!(
                    "email {} is already registered",
                    user.email
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the row if the id exists, insert otherwise
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn upsert(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, password, role, status, phone, address, is_managed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                password = excluded.password,
                role = excluded.role,
                status = excluded.status,
                phone = excluded.phone,
                address = excluded.address,
                is_managed = excluded.is_managed",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password,
                user.role as u8,
                user.status as u8,
                user.phone,
                user.address,
                user.is_managed,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;

        let user = stmt
            .query_row(params![id.to_string()], read_user)
            .optional()?;

        Ok(user)
    }

    /// Find user by email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;

        let user = stmt.query_row(params![email], read_user).optional()?;

        Ok(user)
    }

    /// List all users, newest first
    pub fn list(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))?;

        let users = stmt
            .query_map([], read_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// List users holding a role
    pub fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY created_at DESC"
        ))?;

        let users = stmt
            .query_map(params![role as u8], read_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Count all users
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update profile fields and password
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn update(&self, user: &User) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET name = ?1, email = ?2, password = ?3, phone = ?4, address = ?5
             WHERE id = ?6",
            params![
                user.name,
                user.email,
                user.password,
                user.phone,
                user.address,
                user.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    /// Block or unblock an account
    #[instrument(skip(self))]
    pub fn set_status(&self, user_id: Uuid, status: UserStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET status = ?1 WHERE id = ?2",
            params![status as u8, user_id.to_string()],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Hard delete. The lifecycle engine guards against deleting a user
    /// who still has bookings; this is the raw store operation.
    #[instrument(skip(self))]
    pub fn delete(&self, user_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, role, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.role as u8,
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, role, created_at, expires_at FROM sessions
             WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    role: role_from_u8(row.get::<_, u8>(2)?),
                    created_at: parse_datetime(&row.get::<_, String>(3)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(4)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete all sessions for a user
    pub fn delete_user_sessions(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn resident(email: &str) -> User {
        User::new("Test Resident".into(), email.into(), "pw".into(), Role::Resident)
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let store = db.users();

        let user = resident("a@example.com");
        store.create(&user).unwrap();

        let found = store.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(found.email, "a@example.com");
        assert_eq!(found.role, Role::Resident);

        assert!(store.find_by_email("a@example.com").unwrap().is_some());
        assert!(store.find_by_email("nope@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_validation() {
        let db = Database::open_in_memory().unwrap();
        let store = db.users();

        store.create(&resident("dup@example.com")).unwrap();
        let err = store.create(&resident("dup@example.com")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_upsert_replaces_or_inserts() {
        let db = Database::open_in_memory().unwrap();
        let store = db.users();

        let mut user = resident("u@example.com");
        store.upsert(&user).unwrap();

        user.name = "Renamed".into();
        store.upsert(&user).unwrap();

        let found = store.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(found.name, "Renamed");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_set_status_blocks() {
        let db = Database::open_in_memory().unwrap();
        let store = db.users();

        let user = resident("b@example.com");
        store.create(&user).unwrap();
        store.set_status(user.id, UserStatus::Blocked).unwrap();

        assert!(store.find_by_id(user.id).unwrap().unwrap().is_blocked());
    }

    #[test]
    fn test_delete_missing_signals_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.users().delete(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_sessions_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let store = db.users();

        let user = resident("s@example.com");
        store.create(&user).unwrap();

        let session = Session::new(user.id, user.role, 24);
        store.create_session(&session).unwrap();

        let found = store.find_valid_session(session.id).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert_eq!(found.role, Role::Resident);

        store.delete_session(session.id).unwrap();
        assert!(store.find_valid_session(session.id).unwrap().is_none());
    }
}
