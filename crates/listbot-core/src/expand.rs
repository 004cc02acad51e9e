//! `@list` mention expansion.
//!
//! Directly mentioned lists seed the tagged set; with recursion on, `&name`
//! members are expanded through a FIFO queue so each list is visited at most
//! once, whatever the reference depth or cycles.

use std::collections::{HashSet, VecDeque};

use regex::Regex;

use crate::{domain::list_ref, store::ListStore};

/// How recipient names are wrapped in the mention line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Decoration {
    #[default]
    None,
    Angle,
    Paren,
    Square,
    Curly,
}

impl Decoration {
    /// `<`, `(`, `[`, `{`; anything else is not a decoration style.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" => Some(Self::None),
            "<" => Some(Self::Angle),
            "(" => Some(Self::Paren),
            "[" => Some(Self::Square),
            "{" => Some(Self::Curly),
            _ => None,
        }
    }

    pub fn apply(self, name: &str) -> String {
        match self {
            Self::None => format!("@{name}"),
            Self::Angle => format!("<@{name}>"),
            Self::Paren => format!("(@{name})"),
            Self::Square => format!("[@{name}]"),
            Self::Curly => format!("{{@{name}}}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    /// Decorated on the first occurrence in an expansion, bare afterwards.
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListRoster {
    pub list: String,
    pub recipients: Vec<Recipient>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Tagged lists in discovery order.
    pub tagged: Vec<String>,
    /// One roster per tagged list, same order as `tagged`.
    pub rosters: Vec<ListRoster>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.tagged.is_empty()
    }

    /// Unique literal recipients across all rosters, first-seen order.
    pub fn recipients(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rosters
            .iter()
            .flat_map(|r| r.recipients.iter())
            .map(|r| r.name.as_str())
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Every roster entry's display form, space separated.
    pub fn mention_line(&self) -> String {
        self.rosters
            .iter()
            .flat_map(|r| r.recipients.iter())
            .map(|r| r.display.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MentionExpander {
    pub recurse: bool,
    pub decoration: Decoration,
}

impl Default for MentionExpander {
    fn default() -> Self {
        Self {
            recurse: true,
            decoration: Decoration::None,
        }
    }
}

impl MentionExpander {
    pub fn new(recurse: bool, decoration: Decoration) -> Self {
        Self {
            recurse,
            decoration,
        }
    }

    /// Registered lists mentioned as `@name` in `text`, in registry order.
    pub fn mentioned(&self, store: &ListStore, text: &str) -> Vec<String> {
        store
            .lists()
            .into_iter()
            .filter(|name| mentions_list(text, name))
            .collect()
    }

    pub fn expand(&self, store: &ListStore, text: &str) -> Expansion {
        let mut tagged = self.mentioned(store, text);

        if self.recurse {
            let mut seen: HashSet<String> = tagged.iter().cloned().collect();
            let mut pending: VecDeque<String> = tagged.iter().cloned().collect();

            while let Some(list) = pending.pop_front() {
                for member in store.members(&list) {
                    let Some(child) = list_ref(&member) else {
                        continue;
                    };
                    if seen.insert(child.to_string()) {
                        tagged.push(child.to_string());
                        pending.push_back(child.to_string());
                    }
                }
            }
        }

        let mut decorated = HashSet::new();
        let rosters = tagged
            .iter()
            .map(|list| ListRoster {
                list: list.clone(),
                recipients: store
                    .members(list)
                    .into_iter()
                    .filter(|m| list_ref(m).is_none())
                    .map(|name| {
                        let display = if decorated.insert(name.clone()) {
                            self.decoration.apply(&name)
                        } else {
                            name.clone()
                        };
                        Recipient { name, display }
                    })
                    .collect(),
            })
            .collect();

        Expansion { tagged, rosters }
    }
}

/// `@name` at start of text or after whitespace, not followed by a word character.
fn mentions_list(text: &str, name: &str) -> bool {
    let pattern = format!(r"(?:^|\s)@{}(?:$|\W)", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!(list = name, "skipping list with unusable mention pattern: {e}");
            false
        }
    }
}
