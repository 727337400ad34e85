//! User and session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform roles in priority order (highest to lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// Oversight - reviews hostels, blocks accounts, posts global notices
    Admin = 3,
    /// Runs one or more hostels, approves bookings
    Manager = 2,
    /// Books a bed
    Resident = 1,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Resident => "Resident",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Account standing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UserStatus {
    Active = 1,
    Blocked = 0,
}

/// A platform account
///
/// The password is stored and compared as plaintext. That matches the
/// product's current change/confirm flows and is explicitly out of scope
/// to harden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Entered by a manager rather than self-registered
    pub is_managed: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password,
            role,
            status: UserStatus::Active,
            phone: None,
            address: None,
            is_managed: false,
            created_at: Utc::now(),
        }
    }

    pub fn managed(mut self) -> Self {
        self.is_managed = true;
        self
    }

    pub fn with_phone(mut self, phone: String) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

/// Session record for a logged-in user
///
/// Holds the authenticated user and a role snapshot for role-keyed lookup.
/// Not a cryptographic token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, role: Role, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// The authenticated identity collaborators see: id plus role, nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub role: Role,
}
