/// Reserved list whose members are admins.
pub const ADMINS_LIST: &str = "admins";

/// Prefix marking a member token as a reference to another list.
pub const LIST_REF_PREFIX: char = '&';

/// List names are letters, digits, `.`, `_` and `-`.
pub fn is_valid_list_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// `&team` -> `Some("team")`, anything else -> `None`.
pub fn list_ref(token: &str) -> Option<&str> {
    token.strip_prefix(LIST_REF_PREFIX)
}

/// Chat id of the originating conversation (transport-defined, numeric for Telegram).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// The user issuing a command or mention.
///
/// `id` is the transport's stable identifier; `handle` is the human-facing
/// username, if the transport has one. Either form may appear in list
/// memberships and in the admin allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub handle: Option<String>,
    pub chat_id: ChatId,
}

impl Caller {
    /// Identifiers the caller may be known by, id first.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.handle.as_deref())
    }

    /// Name used when addressing the caller in replies.
    pub fn display_name(&self) -> &str {
        self.handle.as_deref().unwrap_or(&self.id)
    }
}
