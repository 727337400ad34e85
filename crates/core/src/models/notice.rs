//! Notice model and targeting axes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Which roles a notice is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Residents,
    Managers,
    Both,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Residents => "residents",
            Audience::Managers => "managers",
            Audience::Both => "both",
        }
    }

    /// Audience membership is exhaustive over roles; admins read everything
    pub fn includes(&self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::Manager => matches!(self, Audience::Managers | Audience::Both),
            Role::Resident => matches!(self, Audience::Residents | Audience::Both),
        }
    }
}

/// Scope axis, independent of the audience axis.
/// `Global` is platform-wide; `Hostel` targets one listing's residents
/// and staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeScope {
    Global,
    Hostel(Uuid),
}

impl NoticeScope {
    pub fn hostel_id(&self) -> Option<Uuid> {
        match self {
            NoticeScope::Global => None,
            NoticeScope::Hostel(id) => Some(*id),
        }
    }
}

/// A posted notice. Fully decoupled from every other collection;
/// deleting one has no side effects elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub scope: NoticeScope,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub posted_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(scope: NoticeScope, title: String, content: String, audience: Audience) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            title,
            content,
            audience,
            posted_at: Utc::now(),
        }
    }
}
