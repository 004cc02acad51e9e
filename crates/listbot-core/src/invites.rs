//! Pending list invitations, keyed by the invited member token.

use std::collections::BTreeMap;

use crate::store::ListStore;

pub type InvitationMap = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invitations {
    pending: InvitationMap,
}

/// Outcome of a `YES` reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accepted {
    pub joined: Vec<String>,
    /// Lists destroyed since the invitation was sent.
    pub vanished: Vec<String>,
}

impl Invitations {
    pub fn load(pending: Option<InvitationMap>) -> Self {
        Self {
            pending: pending.unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> InvitationMap {
        self.pending.clone()
    }

    /// Record an invitation; returns false if it was already pending.
    pub fn invite(&mut self, member: &str, list: &str) -> bool {
        let lists = self.pending.entry(member.to_string()).or_default();
        if lists.iter().any(|l| l == list) {
            return false;
        }
        lists.push(list.to_string());
        true
    }

    pub fn pending_for(&self, member: &str) -> &[String] {
        self.pending.get(member).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First of `identities` with pending invitations.
    pub fn find<'a>(&self, mut identities: impl Iterator<Item = &'a str>) -> Option<&'a str> {
        identities.find(|id| !self.pending_for(id).is_empty())
    }

    /// Join every invited list and clear the invitations.
    pub fn accept(&mut self, member: &str, store: &mut ListStore) -> Option<Accepted> {
        let lists = self.pending.remove(member)?;
        let mut out = Accepted::default();
        for list in lists {
            if !store.exists(&list) {
                out.vanished.push(list);
                continue;
            }
            // Already a member counts as joined.
            store.add(&list, member);
            out.joined.push(list);
        }
        Some(out)
    }

    pub fn decline(&mut self, member: &str) -> Option<Vec<String>> {
        self.pending.remove(member)
    }
}
