//! Booking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking status: Pending until a manager or admin decides, then terminal.
/// Rows are never archived; deletion is the only exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }
}

/// Monthly fee standing, cycled manually by the manager each billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Paid,
    Unpaid,
    Pending,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Paid => "paid",
            FeeStatus::Unpaid => "unpaid",
            FeeStatus::Pending => "pending",
        }
    }
}

/// Application form snapshot, embedded on the booking 1:1.
/// Intentionally denormalized; it records what the resident declared at
/// submission time, not their live profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDetails {
    pub applicant_name: String,
    pub phone: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub address: String,
}

impl ApplicationDetails {
    /// Every field is required on the application form
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.applicant_name.trim().is_empty() {
            return Some("applicant_name");
        }
        if self.phone.trim().is_empty() {
            return Some("phone");
        }
        if self.guardian_name.trim().is_empty() {
            return Some("guardian_name");
        }
        if self.guardian_phone.trim().is_empty() {
            return Some("guardian_phone");
        }
        if self.address.trim().is_empty() {
            return Some("address");
        }
        None
    }
}

/// A bed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hostel_id: Uuid,
    pub room_id: String,
    pub bed_id: String,
    pub status: BookingStatus,
    /// `None` means the fee state was never recorded and reads as Unpaid
    pub fee_status: Option<FeeStatus>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub application: Option<ApplicationDetails>,
    /// Optimistic concurrency stamp, bumped on every persisted update
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, hostel_id: Uuid, room_id: String, bed_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            hostel_id,
            room_id,
            bed_id,
            status: BookingStatus::Pending,
            fee_status: None,
            last_payment_date: None,
            is_active: true,
            application: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_application(mut self, application: ApplicationDetails) -> Self {
        self.application = Some(application);
        self
    }

    /// An absent fee status reads as Unpaid everywhere
    pub fn effective_fee_status(&self) -> FeeStatus {
        self.fee_status.unwrap_or(FeeStatus::Unpaid)
    }
}

/// Booking joined with resident and hostel names for display.
/// Names are joined at read time, never cached on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDisplay {
    pub booking: Booking,
    pub resident_name: String,
    pub hostel_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> ApplicationDetails {
        ApplicationDetails {
            applicant_name: "Tanvir Ahmed".into(),
            phone: "01711-000000".into(),
            guardian_name: "Shafiq Ahmed".into(),
            guardian_phone: "01811-000000".into(),
            address: "Tongi, Gazipur".into(),
        }
    }

    #[test]
    fn test_new_booking_is_pending() {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), "101".into(), "S1".into());
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.is_active);
        assert!(booking.fee_status.is_none());
    }

    #[test]
    fn test_absent_fee_status_reads_unpaid() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), "101".into(), "S1".into());
        assert_eq!(booking.effective_fee_status(), FeeStatus::Unpaid);

        booking.fee_status = Some(FeeStatus::Paid);
        assert_eq!(booking.effective_fee_status(), FeeStatus::Paid);
    }

    #[test]
    fn test_application_required_fields() {
        let complete = application();
        assert!(complete.missing_field().is_none());

        let mut incomplete = application();
        incomplete.guardian_phone = "  ".into();
        assert_eq!(incomplete.missing_field(), Some("guardian_phone"));
    }
}
