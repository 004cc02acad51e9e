//! The list registry.
//!
//! Names map to ordered-unique member tokens. Every operation reports absence and
//! conflicts through its return value; nothing here fails or panics.

use std::collections::BTreeMap;

use crate::{domain::ADMINS_LIST, policy::AdminAllowList};

/// Serializable registry shape: list name -> member tokens.
pub type Registry = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug)]
pub struct ListStore {
    lists: Registry,
    allowlist: AdminAllowList,
}

impl ListStore {
    /// Empty store seeded with `admins`.
    pub fn new(allowlist: AdminAllowList) -> Self {
        Self::load(None, allowlist)
    }

    /// Adopt a persisted registry (or start empty) and seed `admins` if absent.
    pub fn load(registry: Option<Registry>, allowlist: AdminAllowList) -> Self {
        let mut lists = registry.unwrap_or_default();
        for members in lists.values_mut() {
            dedup_in_place(members);
        }

        let mut store = Self { lists, allowlist };
        if store.create(ADMINS_LIST) {
            tracing::info!("seeded empty `{ADMINS_LIST}` list");
        }
        store
    }

    pub fn snapshot(&self) -> Registry {
        self.lists.clone()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Sorted member tokens; empty when the list does not exist.
    pub fn members(&self, name: &str) -> Vec<String> {
        self.lists.get(name).map(|m| sorted(m)).unwrap_or_default()
    }

    /// Sorted list names.
    pub fn lists(&self) -> Vec<String> {
        // BTreeMap keys are already ordered.
        self.lists.keys().cloned().collect()
    }

    pub fn create(&mut self, name: &str) -> bool {
        if self.exists(name) {
            return false;
        }
        self.lists.insert(name.to_string(), Vec::new());
        true
    }

    /// Remove a list, returning its former members (sorted).
    pub fn destroy(&mut self, name: &str) -> Option<Vec<String>> {
        self.lists.remove(name).map(|m| sorted(&m))
    }

    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.exists(to) {
            return false;
        }
        let Some(members) = self.lists.remove(from) else {
            return false;
        };
        self.lists.insert(to.to_string(), members);
        true
    }

    pub fn add(&mut self, name: &str, member: &str) -> bool {
        let Some(members) = self.lists.get_mut(name) else {
            return false;
        };
        if members.iter().any(|m| m == member) {
            return false;
        }
        members.push(member.to_string());
        true
    }

    pub fn remove(&mut self, name: &str, member: &str) -> bool {
        let Some(members) = self.lists.get_mut(name) else {
            return false;
        };
        let Some(idx) = members.iter().position(|m| m == member) else {
            return false;
        };
        members.remove(idx);
        true
    }

    /// Sorted names of every list containing `member` verbatim.
    pub fn membership(&self, member: &str) -> Vec<String> {
        self.lists
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m == member))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_member(&self, name: &str, member: &str) -> bool {
        self.lists
            .get(name)
            .is_some_and(|members| members.iter().any(|m| m == member))
    }

    /// Allow-listed, or a member of `admins`.
    pub fn is_admin(&self, member: &str) -> bool {
        self.allowlist.contains(member) || self.is_member(ADMINS_LIST, member)
    }
}

fn sorted(members: &[String]) -> Vec<String> {
    let mut out = members.to_vec();
    out.sort();
    out
}

fn dedup_in_place(members: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    members.retain(|m| seen.insert(m.clone()));
}
