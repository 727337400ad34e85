//! Notice storage and targeting
//!
//! Notices filter on two independent axes: scope (global vs one hostel)
//! and audience (residents / managers / both). Deleting one touches
//! nothing else.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{audience_from_str, parse_datetime, parse_uuid_opt, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{Notice, NoticeScope, Role};

pub struct NoticeStore<'a> {
    conn: &'a Connection,
}

const NOTICE_COLUMNS: &str = "id, hostel_id, title, content, audience, posted_at";

fn read_notice(row: &Row<'_>) -> rusqlite::Result<Notice> {
    let scope = match parse_uuid_opt(row.get::<_, Option<String>>(1)?)? {
        Some(id) => NoticeScope::Hostel(id),
        None => NoticeScope::Global,
    };

    Ok(Notice {
        id: super::parse::parse_uuid(&row.get::<_, String>(0)?)?,
        scope,
        title: row.get(2)?,
        content: row.get(3)?,
        audience: audience_from_str(&row.get::<_, String>(4)?)?,
        posted_at: parse_datetime(&row.get::<_, String>(5)?)?,
    })
}

/// Audience values a role may read
fn audiences_for(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => &["residents", "managers", "both"],
        Role::Manager => &["managers", "both"],
        Role::Resident => &["residents", "both"],
    }
}

impl<'a> NoticeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Post a notice
    #[instrument(skip(self, notice), fields(title = %notice.title))]
    pub fn create(&self, notice: &Notice) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notices (id, hostel_id, title, content, audience, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notice.id.to_string(),
                notice.scope.hostel_id().map(|id| id.to_string()),
                notice.title,
                notice.content,
                notice.audience.as_str(),
                notice.posted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace the row if the id exists, insert otherwise
    pub fn upsert(&self, notice: &Notice) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notices (id, hostel_id, title, content, audience, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                hostel_id = excluded.hostel_id,
                title = excluded.title,
                content = excluded.content,
                audience = excluded.audience",
            params![
                notice.id.to_string(),
                notice.scope.hostel_id().map(|id| id.to_string()),
                notice.title,
                notice.content,
                notice.audience.as_str(),
                notice.posted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find notice by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Notice>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NOTICE_COLUMNS} FROM notices WHERE id = ?1"))?;

        let notice = stmt
            .query_row(params![id.to_string()], read_notice)
            .optional()?;

        Ok(notice)
    }

    /// Delete a notice; no side effects elsewhere
    #[instrument(skip(self))]
    pub fn delete(&self, notice_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM notices WHERE id = ?1",
            params![notice_id.to_string()],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("notice {notice_id}")));
        }
        Ok(())
    }

    /// All notices, newest first (admin overview)
    pub fn list(&self) -> Result<Vec<Notice>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices ORDER BY posted_at DESC"
        ))?;

        let notices = stmt
            .query_map([], read_notice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notices)
    }

    /// The recency-ordered subset a viewer sees: global notices plus the
    /// viewer's hostel (when role-bound to one), filtered to audiences
    /// that include the viewer's role.
    #[instrument(skip(self))]
    pub fn list_visible(&self, role: Role, hostel_id: Option<Uuid>) -> Result<Vec<Notice>> {
        let audiences = audiences_for(role);
        // audiences_for returns at most 3 values; bind them all and let
        // unused slots repeat the last value
        let a0 = audiences[0];
        let a1 = audiences.get(1).copied().unwrap_or(a0);
        let a2 = audiences.get(2).copied().unwrap_or(a1);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices
             WHERE (hostel_id IS NULL OR hostel_id = ?1)
               AND audience IN (?2, ?3, ?4)
             ORDER BY posted_at DESC"
        ))?;

        let notices = stmt
            .query_map(
                params![hostel_id.map(|id| id.to_string()), a0, a1, a2],
                read_notice,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notices)
    }
}
