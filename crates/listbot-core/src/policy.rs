//! Who may run list-management commands and mention broadcasts.

use crate::{domain::Caller, store::ListStore};

/// Statically configured admin ids (`LIST_ADMINS`).
///
/// Unlike the Telegram allow-list, an empty list grants nothing: admins then
/// come only from the `admins` list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminAllowList(Vec<String>);

impl AdminAllowList {
    /// Comma-separated ids; blanks are ignored.
    pub fn parse(csv: &str) -> Self {
        Self(
            csv.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|a| a == id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A caller is an admin if any of its identities is.
pub fn is_admin(store: &ListStore, caller: &Caller) -> bool {
    caller.identities().any(|id| store.is_admin(id))
}

/// What a command requires of its caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Anyone.
    Open,
    /// Admins; others get a refusal reply.
    Admin,
    /// Admins; others are ignored without a reply.
    AdminSilent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Refuse,
    Drop,
}

pub fn check(gate: Gate, store: &ListStore, caller: &Caller) -> Decision {
    match gate {
        Gate::Open => Decision::Allow,
        _ if is_admin(store, caller) => Decision::Allow,
        Gate::Admin => Decision::Refuse,
        Gate::AdminSilent => Decision::Drop,
    }
}
