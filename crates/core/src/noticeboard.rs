//! Notice posting and reads
//!
//! Managers post to hostels they run; admin posts anywhere, including
//! platform-wide. Reads filter on the two independent axes (scope and
//! audience) for the viewer's role and hostel binding.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Audience, Notice, NoticeScope, Role, SessionUser};
use crate::permissions::{Action, PermissionMatrix};
use crate::storage::Database;

/// Post a notice under the actor's authority
#[instrument(skip(db, actor, content))]
pub fn post(
    db: &Database,
    actor: SessionUser,
    scope: NoticeScope,
    title: String,
    content: String,
    audience: Audience,
) -> Result<Notice> {
    match scope {
        NoticeScope::Global => {
            PermissionMatrix::require(actor.role, Action::PostGlobalNotice)?;
        }
        NoticeScope::Hostel(hostel_id) => {
            PermissionMatrix::require(actor.role, Action::PostHostelNotice)?;

            let hostel = db
                .hostels()
                .find_by_id(hostel_id)?
                .ok_or_else(|| Error::NotFound(format!("hostel {hostel_id}")))?;
            if actor.role == Role::Manager && hostel.manager_id != actor.id {
                return Err(Error::PermissionDenied(format!(
                    "hostel {hostel_id} is not managed by this account"
                )));
            }
        }
    }

    if title.trim().is_empty() {
        return Err(Error::Validation("notice title is required".into()));
    }

    let notice = Notice::new(scope, title, content, audience);
    db.notices().create(&notice)?;
    info!(notice_id = %notice.id, "Notice posted");
    Ok(notice)
}

/// Take a notice down. No side effects on any other collection.
#[instrument(skip(db, actor))]
pub fn remove(db: &Database, actor: SessionUser, notice_id: Uuid) -> Result<()> {
    PermissionMatrix::require(actor.role, Action::DeleteNotice)?;
    db.notices().delete(notice_id)
}

/// What this viewer sees, newest first
pub fn visible_to(
    db: &Database,
    viewer: SessionUser,
    hostel_id: Option<Uuid>,
) -> Result<Vec<Notice>> {
    db.notices().list_visible(viewer.role, hostel_id)
}
