//! Permission system for platform operations

use crate::error::{Error, Result};
use crate::models::Role;

/// Actions that can be performed on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Hostel catalog
    RegisterHostel,
    EditHostel,
    ToggleHostelAvailability,
    DeleteHostel,
    ReviewHostel,
    AttachAdminNote,

    // Occupancy
    EditRoomOccupancy,
    EditRoomCapacity,

    // Bookings
    SelectSeat,
    SubmitBooking,
    ApproveBooking,
    RejectBooking,
    DeleteBooking,
    MarkFeeStatus,

    // Accounts
    RegisterResident,
    BlockUser,
    DeleteUser,

    // Notices
    PostHostelNotice,
    PostGlobalNotice,
    DeleteNotice,
}

/// Permission matrix for platform roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action.
    /// Matching is exhaustive on purpose; adding an action without
    /// deciding its gate will not compile.
    pub fn can_perform(role: Role, action: Action) -> bool {
        match action {
            // Catalog - managers own listings, admin reviews them
            Action::RegisterHostel => role == Role::Manager,
            Action::EditHostel => role == Role::Manager,
            Action::ToggleHostelAvailability => role == Role::Manager,
            Action::DeleteHostel => role >= Role::Manager,
            Action::ReviewHostel => role == Role::Admin,
            Action::AttachAdminNote => role == Role::Admin,

            // Occupancy - manager-side bookkeeping
            Action::EditRoomOccupancy => role == Role::Manager,
            Action::EditRoomCapacity => role == Role::Manager,

            // Bookings - residents apply, staff decide
            Action::SelectSeat => role == Role::Resident,
            Action::SubmitBooking => role == Role::Resident,
            Action::ApproveBooking => role >= Role::Manager,
            Action::RejectBooking => role >= Role::Manager,
            Action::DeleteBooking => role >= Role::Manager,
            Action::MarkFeeStatus => role >= Role::Manager,

            // Accounts
            Action::RegisterResident => role == Role::Manager,
            Action::BlockUser => role == Role::Admin,
            Action::DeleteUser => role >= Role::Manager,

            // Notices
            Action::PostHostelNotice => role >= Role::Manager,
            Action::PostGlobalNotice => role == Role::Admin,
            Action::DeleteNotice => role >= Role::Manager,
        }
    }

    /// Result-returning guard for lifecycle entry points
    pub fn require(role: Role, action: Action) -> Result<()> {
        if Self::can_perform(role, action) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "{} cannot perform {:?}",
                role.display_name(),
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resident_permissions() {
        assert!(PermissionMatrix::can_perform(Role::Resident, Action::SelectSeat));
        assert!(PermissionMatrix::can_perform(Role::Resident, Action::SubmitBooking));
        assert!(!PermissionMatrix::can_perform(Role::Resident, Action::ApproveBooking));
        assert!(!PermissionMatrix::can_perform(Role::Resident, Action::RegisterHostel));
    }

    #[test]
    fn test_manager_permissions() {
        assert!(PermissionMatrix::can_perform(Role::Manager, Action::RegisterHostel));
        assert!(PermissionMatrix::can_perform(Role::Manager, Action::ApproveBooking));
        assert!(PermissionMatrix::can_perform(Role::Manager, Action::EditRoomOccupancy));
        assert!(PermissionMatrix::can_perform(Role::Manager, Action::PostHostelNotice));
        assert!(!PermissionMatrix::can_perform(Role::Manager, Action::ReviewHostel));
        assert!(!PermissionMatrix::can_perform(Role::Manager, Action::PostGlobalNotice));
        // Staff do not book beds for themselves
        assert!(!PermissionMatrix::can_perform(Role::Manager, Action::SelectSeat));
    }

    #[test]
    fn test_admin_permissions() {
        assert!(PermissionMatrix::can_perform(Role::Admin, Action::ReviewHostel));
        assert!(PermissionMatrix::can_perform(Role::Admin, Action::BlockUser));
        assert!(PermissionMatrix::can_perform(Role::Admin, Action::PostGlobalNotice));
        assert!(PermissionMatrix::can_perform(Role::Admin, Action::ApproveBooking));
        assert!(!PermissionMatrix::can_perform(Role::Admin, Action::SelectSeat));
    }

    #[test]
    fn test_require_surfaces_permission_denied() {
        let err = PermissionMatrix::require(Role::Resident, Action::ApproveBooking).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert!(PermissionMatrix::require(Role::Admin, Action::ApproveBooking).is_ok());
    }
}
