//! Role-manager compatible view of the list registry (`LIST_AUTH=true`).
//!
//! Lists double as roles: a user "has" role `r` when it is a member of list `r`.

use crate::store::ListStore;

pub trait RoleProvider {
    fn is_admin(&self, user: &str) -> bool;
    fn has_role(&self, user: &str, role: &str) -> bool;
    fn users_with_role(&self, role: &str) -> Vec<String>;
    fn user_roles(&self, user: &str) -> Vec<String>;
}

/// Borrowing adapter so the shim always reads the live registry.
pub struct ListRoles<'a> {
    store: &'a ListStore,
}

impl<'a> ListRoles<'a> {
    pub fn new(store: &'a ListStore) -> Self {
        Self { store }
    }
}

impl RoleProvider for ListRoles<'_> {
    fn is_admin(&self, user: &str) -> bool {
        self.store.is_admin(user)
    }

    fn has_role(&self, user: &str, role: &str) -> bool {
        self.store.is_member(role, user)
    }

    fn users_with_role(&self, role: &str) -> Vec<String> {
        self.store.members(role)
    }

    fn user_roles(&self, user: &str) -> Vec<String> {
        self.store.membership(user)
    }
}
