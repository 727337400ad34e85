//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{Audience, BookingStatus, FeeStatus, HostelStatus, Role, UserStatus};

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a JSON text column into a typed value
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, SqlError> {
    serde_json::from_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an optional JSON text column into a typed value
pub fn parse_json_opt<T: serde::de::DeserializeOwned>(
    s: Option<String>,
) -> Result<Option<T>, SqlError> {
    s.map(|s| parse_json(&s)).transpose()
}

fn bad_enum(value: String) -> SqlError {
    SqlError::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unknown enum value: {value}").into(),
    )
}

/// Convert a stored u8 to Role; unknown values degrade to Resident
pub fn role_from_u8(value: u8) -> Role {
    match value {
        3 => Role::Admin,
        2 => Role::Manager,
        _ => Role::Resident,
    }
}

/// Convert a stored u8 to UserStatus; anything but 1 reads as Blocked
pub fn user_status_from_u8(value: u8) -> UserStatus {
    match value {
        1 => UserStatus::Active,
        _ => UserStatus::Blocked,
    }
}

pub fn hostel_status_from_str(s: &str) -> Result<HostelStatus, SqlError> {
    match s {
        "pending" => Ok(HostelStatus::Pending),
        "active" => Ok(HostelStatus::Active),
        "inactive" => Ok(HostelStatus::Inactive),
        "rejected" => Ok(HostelStatus::Rejected),
        other => Err(bad_enum(other.to_string())),
    }
}

pub fn booking_status_from_str(s: &str) -> Result<BookingStatus, SqlError> {
    match s {
        "pending" => Ok(BookingStatus::Pending),
        "approved" => Ok(BookingStatus::Approved),
        "rejected" => Ok(BookingStatus::Rejected),
        other => Err(bad_enum(other.to_string())),
    }
}

/// Fee status column is nullable; NULL means never recorded
pub fn fee_status_from_str_opt(s: Option<String>) -> Result<Option<FeeStatus>, SqlError> {
    match s.as_deref() {
        None => Ok(None),
        Some("paid") => Ok(Some(FeeStatus::Paid)),
        Some("unpaid") => Ok(Some(FeeStatus::Unpaid)),
        Some("pending") => Ok(Some(FeeStatus::Pending)),
        Some(other) => Err(bad_enum(other.to_string())),
    }
}

pub fn audience_from_str(s: &str) -> Result<Audience, SqlError> {
    match s {
        "residents" => Ok(Audience::Residents),
        "managers" => Ok(Audience::Managers),
        "both" => Ok(Audience::Both),
        other => Err(bad_enum(other.to_string())),
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
