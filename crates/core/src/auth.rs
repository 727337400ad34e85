//! Authentication collaborator surface
//!
//! Supplies the `SessionUser { id, role }` that gates seat selection and
//! scopes notice reads. Passwords are stored and compared as plaintext
//! equality; the change/confirm flows below expose exactly that and
//! hardening them is out of scope. Blocked accounts cannot sign in.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Role, Session, SessionUser, User, UserStatus};
use crate::permissions::{Action, PermissionMatrix};
use crate::storage::Database;

/// Sessions last a week; cleanup reaps anything older
const SESSION_HOURS: i64 = 24 * 7;

/// Self-registration. New accounts are residents.
#[instrument(skip(db, password))]
pub fn sign_up(db: &Database, name: String, email: String, password: String) -> Result<User> {
    if name.trim().is_empty() {
        return Err(Error::Validation("name is required".into()));
    }
    if !email.contains('@') {
        return Err(Error::Validation(format!("invalid email: {email}")));
    }
    if password.is_empty() {
        return Err(Error::Validation("password is required".into()));
    }

    let user = User::new(name, email, password, Role::Resident);
    db.users().create(&user)?;
    info!(user_id = %user.id, "Resident signed up");
    Ok(user)
}

/// A manager enters a resident who never self-registered
#[instrument(skip(db, actor, password))]
pub fn register_resident(
    db: &Database,
    actor: SessionUser,
    name: String,
    email: String,
    password: String,
) -> Result<User> {
    PermissionMatrix::require(actor.role, Action::RegisterResident)?;

    if name.trim().is_empty() {
        return Err(Error::Validation("name is required".into()));
    }

    let user = User::new(name, email, password, Role::Resident).managed();
    db.users().create(&user)?;
    info!(user_id = %user.id, manager = %actor.id, "Managed resident registered");
    Ok(user)
}

/// Sign in by email and password. On success a session row is written;
/// its id is what the client holds on to.
#[instrument(skip(db, password))]
pub fn authenticate(db: &Database, email: &str, password: &str) -> Result<Session> {
    let user = db
        .users()
        .find_by_email(email)?
        .ok_or_else(|| Error::Authentication("unknown email".into()))?;

    if user.is_blocked() {
        return Err(Error::Authentication("account is blocked".into()));
    }

    // Plaintext equality, by product decision
    if user.password != password {
        return Err(Error::Authentication("wrong password".into()));
    }

    let session = Session::new(user.id, user.role, SESSION_HOURS);
    db.users().create_session(&session)?;
    info!(user_id = %user.id, role = %user.role, "Signed in");
    Ok(session)
}

/// Resolve a session id to the authenticated identity, if still valid
pub fn current_user(db: &Database, session_id: Uuid) -> Result<Option<SessionUser>> {
    let session = db.users().find_valid_session(session_id)?;
    Ok(session.map(|s| SessionUser {
        id: s.user_id,
        role: s.role,
    }))
}

/// Sign out, dropping the session row
pub fn sign_out(db: &Database, session_id: Uuid) -> Result<()> {
    db.users().delete_session(session_id)
}

/// Change password with a confirm of the current one.
/// Same equality comparison as sign-in.
#[instrument(skip(db, current, new))]
pub fn change_password(db: &Database, user_id: Uuid, current: &str, new: &str) -> Result<()> {
    let mut user = db
        .users()
        .find_by_id(user_id)?
        .ok_or_else(|| Error::NotFound(format!("user {user_id}")))?;

    if user.password != current {
        return Err(Error::Authentication("current password does not match".into()));
    }
    if new.is_empty() {
        return Err(Error::Validation("new password is required".into()));
    }

    user.password = new.to_string();
    db.users().update(&user)?;
    info!(%user_id, "Password changed");
    Ok(())
}

/// Admin block/unblock. Blocking also reaps the account's live sessions.
#[instrument(skip(db, actor))]
pub fn set_user_status(
    db: &Database,
    actor: SessionUser,
    user_id: Uuid,
    status: UserStatus,
) -> Result<()> {
    PermissionMatrix::require(actor.role, Action::BlockUser)?;

    db.users().set_status(user_id, status)?;
    if status == UserStatus::Blocked {
        db.users().delete_user_sessions(user_id)?;
    }
    info!(%user_id, blocked = (status == UserStatus::Blocked), "User status changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_sign_up_and_authenticate() {
        let db = setup();
        let user = sign_up(&db, "Rafi".into(), "rafi@example.com".into(), "pw".into()).unwrap();
        assert_eq!(user.role, Role::Resident);
        assert!(!user.is_managed);

        let session = authenticate(&db, "rafi@example.com", "pw").unwrap();
        let viewer = current_user(&db, session.id).unwrap().unwrap();
        assert_eq!(viewer.id, user.id);
        assert_eq!(viewer.role, Role::Resident);
    }

    #[test]
    fn test_wrong_password_fails() {
        let db = setup();
        sign_up(&db, "Rafi".into(), "rafi@example.com".into(), "pw".into()).unwrap();

        let err = authenticate(&db, "rafi@example.com", "nope").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));

        let err = authenticate(&db, "ghost@example.com", "pw").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_blocked_account_cannot_sign_in() {
        let db = setup();
        let user = sign_up(&db, "Rafi".into(), "rafi@example.com".into(), "pw".into()).unwrap();
        let session = authenticate(&db, "rafi@example.com", "pw").unwrap();

        let admin = User::new("Admin".into(), "a@example.com".into(), "pw".into(), Role::Admin);
        db.users().create(&admin).unwrap();
        let admin = SessionUser {
            id: admin.id,
            role: Role::Admin,
        };

        set_user_status(&db, admin, user.id, UserStatus::Blocked).unwrap();

        // Existing sessions die with the block
        assert!(current_user(&db, session.id).unwrap().is_none());
        let err = authenticate(&db, "rafi@example.com", "pw").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));

        set_user_status(&db, admin, user.id, UserStatus::Active).unwrap();
        assert!(authenticate(&db, "rafi@example.com", "pw").is_ok());
    }

    #[test]
    fn test_change_password_confirms_current() {
        let db = setup();
        let user = sign_up(&db, "Rafi".into(), "rafi@example.com".into(), "old".into()).unwrap();

        let err = change_password(&db, user.id, "wrong", "new").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));

        change_password(&db, user.id, "old", "new").unwrap();
        assert!(authenticate(&db, "rafi@example.com", "old").is_err());
        assert!(authenticate(&db, "rafi@example.com", "new").is_ok());
    }

    #[test]
    fn test_managed_resident_flagged() {
        let db = setup();
        let manager = User::new(
            "Manager".into(),
            "m@example.com".into(),
            "pw".into(),
            Role::Manager,
        );
        db.users().create(&manager).unwrap();
        let manager = SessionUser {
            id: manager.id,
            role: Role::Manager,
        };

        let user = register_resident(
            &db,
            manager,
            "Walk-in".into(),
            "walkin@example.com".into(),
            "pw".into(),
        )
        .unwrap();
        assert!(user.is_managed);
        assert_eq!(user.role, Role::Resident);
    }

    #[test]
    fn test_residents_cannot_register_residents() {
        let db = setup();
        let somebody = SessionUser {
            id: Uuid::new_v4(),
            role: Role::Resident,
        };
        let err = register_resident(
            &db,
            somebody,
            "X".into(),
            "x@example.com".into(),
            "pw".into(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_sign_out() {
        let db = setup();
        sign_up(&db, "Rafi".into(), "rafi@example.com".into(), "pw".into()).unwrap();
        let session = authenticate(&db, "rafi@example.com", "pw").unwrap();

        sign_out(&db, session.id).unwrap();
        assert!(current_user(&db, session.id).unwrap().is_none());
    }
}
