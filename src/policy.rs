//! Role-based access rules
//!
//! Every service operation calls [`authorize`] before touching the store.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::account::{Role, UserClaims},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Books, authors, genres and publishers
    Catalog,
    Borrowing { owner_id: Uuid },
    Accounts,
}

/// Decide whether `caller` may perform `action` on `resource`
pub fn authorize(caller: &UserClaims, action: Action, resource: Resource) -> AppResult<()> {
    if caller.role == Role::Admin {
        return Ok(());
    }

    let allowed = match resource {
        Resource::Catalog => action == Action::Read,
        Resource::Borrowing { owner_id } => {
            action != Action::Update && owner_id == caller.user_id
        }
        Resource::Accounts => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient rights".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        UserClaims {
            sub: "reader@library.com".to_string(),
            user_id: Uuid::new_v4(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn admin_may_do_anything() {
        let admin = claims(Role::Admin);
        let stranger = Uuid::new_v4();
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(authorize(&admin, action, Resource::Catalog).is_ok());
            assert!(authorize(&admin, action, Resource::Accounts).is_ok());
            assert!(authorize(&admin, action, Resource::Borrowing { owner_id: stranger }).is_ok());
        }
    }

    #[test]
    fn user_reads_catalog_but_cannot_change_it() {
        let user = claims(Role::User);
        assert!(authorize(&user, Action::Read, Resource::Catalog).is_ok());
        for action in [Action::Create, Action::Update, Action::Delete] {
            assert!(matches!(
                authorize(&user, action, Resource::Catalog),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn user_manages_own_borrowings_except_updates() {
        let user = claims(Role::User);
        let own = Resource::Borrowing { owner_id: user.user_id };
        assert!(authorize(&user, Action::Create, own).is_ok());
        assert!(authorize(&user, Action::Read, own).is_ok());
        assert!(authorize(&user, Action::Delete, own).is_ok());
        assert!(authorize(&user, Action::Update, own).is_err());
    }

    #[test]
    fn user_cannot_touch_foreign_borrowings() {
        let user = claims(Role::User);
        let foreign = Resource::Borrowing { owner_id: Uuid::new_v4() };
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(authorize(&user, action, foreign).is_err());
        }
    }

    #[test]
    fn accounts_directory_is_admin_only() {
        let user = claims(Role::User);
        assert!(authorize(&user, Action::Read, Resource::Accounts).is_err());
    }
}
