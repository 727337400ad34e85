//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, future server backend).

use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Booking, BookingDisplay, Hostel, HostelStatus, Notice, Role, Session, User, UserStatus,
};

/// User repository operations
pub trait UserRepository {
    /// Create a new user
    fn create_user(&self, user: &User) -> Result<()>;

    /// Replace if the id exists, insert otherwise
    fn upsert_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find user by email
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users
    fn list_users(&self) -> Result<Vec<User>>;

    /// Update profile fields and password
    fn update_user(&self, user: &User) -> Result<()>;

    /// Block or unblock an account
    fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> Result<()>;

    /// Hard delete a user
    fn delete_user(&self, user_id: Uuid) -> Result<()>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: Uuid) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Hostel repository operations
pub trait HostelRepository {
    /// Create a new hostel
    fn create_hostel(&self, hostel: &Hostel) -> Result<()>;

    /// Replace if the id exists, insert otherwise
    fn upsert_hostel(&self, hostel: &Hostel) -> Result<()>;

    /// Find hostel by ID
    fn find_hostel_by_id(&self, id: Uuid) -> Result<Option<Hostel>>;

    /// Update a hostel, checking its version stamp
    fn update_hostel(&self, hostel: &mut Hostel) -> Result<()>;

    /// Hard delete a hostel
    fn delete_hostel(&self, hostel_id: Uuid) -> Result<()>;

    /// List all hostels
    fn list_hostels(&self) -> Result<Vec<Hostel>>;

    /// List hostels in a lifecycle status
    fn list_hostels_by_status(&self, status: HostelStatus) -> Result<Vec<Hostel>>;

    /// List hostels run by a manager
    fn list_hostels_by_manager(&self, manager_id: Uuid) -> Result<Vec<Hostel>>;
}

/// Booking repository operations
pub trait BookingRepository {
    /// Create a new booking
    fn create_booking(&self, booking: &Booking) -> Result<()>;

    /// Replace if the id exists, insert otherwise
    fn upsert_booking(&self, booking: &Booking) -> Result<()>;

    /// Find booking by ID
    fn find_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Update a booking, checking its version stamp
    fn update_booking(&self, booking: &mut Booking) -> Result<()>;

    /// Hard delete a booking row
    fn delete_booking(&self, booking_id: Uuid) -> Result<()>;

    /// List a resident's bookings
    fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>>;

    /// List a hostel's bookings
    fn list_bookings_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>>;

    /// List a hostel's bookings with names joined for display
    fn list_booking_display_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<BookingDisplay>>;

    /// Effectively-unpaid approved bookings in a hostel
    fn list_unpaid_bookings_for_hostel(&self, hostel_id: Uuid) -> Result<Vec<Booking>>;

    /// Does the user hold any booking besides the given one?
    fn has_other_bookings(&self, user_id: Uuid, excluding: Uuid) -> Result<bool>;
}

/// Notice repository operations
pub trait NoticeRepository {
    /// Post a notice
    fn create_notice(&self, notice: &Notice) -> Result<()>;

    /// Replace if the id exists, insert otherwise
    fn upsert_notice(&self, notice: &Notice) -> Result<()>;

    /// Find notice by ID
    fn find_notice_by_id(&self, id: Uuid) -> Result<Option<Notice>>;

    /// Delete a notice
    fn delete_notice(&self, notice_id: Uuid) -> Result<()>;

    /// Notices a viewer sees, newest first
    fn list_visible_notices(&self, role: Role, hostel_id: Option<Uuid>) -> Result<Vec<Notice>>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or a future server.
pub trait Storage:
    UserRepository + HostelRepository + BookingRepository + NoticeRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: UserRepository + HostelRepository + BookingRepository + NoticeRepository
{
}
