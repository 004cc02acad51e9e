//! Chat text -> list command.

use std::sync::OnceLock;

use regex::Regex;

use crate::policy::Gate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Lists,
    Dump,
    Create { name: String },
    Destroy { name: String },
    Rename { from: String, to: String },
    Add { list: String, members: Vec<String> },
    Remove { list: String, members: Vec<String> },
    Invite { list: String, members: Vec<String> },
    Info { name: String },
    Membership { member: String },
    /// `YES` (true) or `NO` (false) to pending invitations.
    InviteResponse(bool),
    UserRoles { user: String },
    UsersWithRole { role: String },
    /// Text mentioning at least one `@identifier`.
    Broadcast,
    /// A `list` command with missing arguments.
    Usage(&'static str),
}

impl Command {
    /// `None` when the text is not addressed to the list bot at all.
    ///
    /// `bot_username` is this bot's handle; `/list@other_bot ...` is ignored when
    /// it is known.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let trimmed = text.trim();
        if addressed_elsewhere(trimmed, bot_username) {
            return None;
        }

        match trimmed {
            "YES" => return Some(Self::InviteResponse(true)),
            "NO" => return Some(Self::InviteResponse(false)),
            _ => {}
        }

        if let Some(cmd) = parse_list_command(trimmed) {
            return Some(cmd);
        }
        if let Some(cmd) = parse_role_query(trimmed) {
            return Some(cmd);
        }
        if has_mention(trimmed) {
            return Some(Self::Broadcast);
        }
        None
    }

    pub fn gate(&self) -> Gate {
        match self {
            Self::Create { .. }
            | Self::Destroy { .. }
            | Self::Rename { .. }
            | Self::Add { .. }
            | Self::Remove { .. }
            | Self::Invite { .. } => Gate::Admin,
            Self::Broadcast => Gate::AdminSilent,
            _ => Gate::Open,
        }
    }

    /// Short name for logs and the audit trail.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Lists => "lists",
            Self::Dump => "dump",
            Self::Create { .. } => "create",
            Self::Destroy { .. } => "destroy",
            Self::Rename { .. } => "rename",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Invite { .. } => "invite",
            Self::Info { .. } => "info",
            Self::Membership { .. } => "membership",
            Self::InviteResponse(_) => "response",
            Self::UserRoles { .. } => "user_roles",
            Self::UsersWithRole { .. } => "users_with_role",
            Self::Broadcast => "send",
            Self::Usage(_) => "usage",
        }
    }
}

/// `/cmd@name` where `name` is some other bot.
fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    let (Some(me), Some(head)) = (bot_username, text.split_whitespace().next()) else {
        return false;
    };
    let Some(cmd) = head.strip_prefix('/') else {
        return false;
    };
    match cmd.split_once('@') {
        Some((_, target)) => !target.eq_ignore_ascii_case(me.trim_start_matches('@')),
        None => false,
    }
}

/// `list <sub> ...`, also as `/list` or `/list@botname`.
///
/// Plain `list ...` text only counts with a known subcommand, so ordinary chat
/// that happens to start with the word falls through to mention detection.
fn parse_list_command(text: &str) -> Option<Command> {
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    let slashed = head.starts_with('/');
    let head = head
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("");
    if !head.eq_ignore_ascii_case("list") {
        return None;
    }

    let mut parts = rest.splitn(2, char::is_whitespace);
    let sub = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().unwrap_or("").trim();
    let words: Vec<String> = args.split_whitespace().map(|s| s.to_string()).collect();

    let cmd = match sub.as_str() {
        "" | "help" => Command::Help,
        "lists" => Command::Lists,
        "dump" => Command::Dump,
        "create" | "destroy" | "info" | "membership" if args.is_empty() => {
            Command::Usage(usage(&sub))
        }
        "create" => Command::Create {
            name: args.to_string(),
        },
        "destroy" => Command::Destroy {
            name: args.to_string(),
        },
        "info" => Command::Info {
            name: args.to_string(),
        },
        "membership" => Command::Membership {
            member: args.to_string(),
        },
        "rename" => match words.as_slice() {
            [from, kw, to] if kw.eq_ignore_ascii_case("to") => Command::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            [from, to] => Command::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            _ => Command::Usage(usage(&sub)),
        },
        "add" | "remove" | "invite" => {
            let Some((list, members)) = words.split_first().filter(|(_, m)| !m.is_empty())
            else {
                return Some(Command::Usage(usage(&sub)));
            };
            let list = list.clone();
            let members = members.to_vec();
            match sub.as_str() {
                "add" => Command::Add { list, members },
                "remove" => Command::Remove { list, members },
                _ => Command::Invite { list, members },
            }
        }
        _ if slashed => Command::Help,
        _ => return None,
    };
    Some(cmd)
}

fn usage(sub: &str) -> &'static str {
    match sub {
        "create" => "Usage: list create <list>",
        "destroy" => "Usage: list destroy <list>",
        "info" => "Usage: list info <list>",
        "membership" => "Usage: list membership <name>",
        "rename" => "Usage: list rename <old> [to] <new>",
        "add" => "Usage: list add <list> <name...>",
        "remove" => "Usage: list remove <list> <name...>",
        _ => "Usage: list invite <list> <name...>",
    }
}

fn role_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"(?i)^what roles? do(?:es)? @?(\S+) have\?*$").expect("valid regex"),
            Regex::new(r"(?i)^who has (\S+) role\?*$").expect("valid regex"),
        )
    })
}

fn parse_role_query(text: &str) -> Option<Command> {
    let (user_roles, users_with_role) = role_regexes();
    if let Some(c) = user_roles.captures(text) {
        return Some(Command::UserRoles {
            user: c[1].to_string(),
        });
    }
    users_with_role.captures(text).map(|c| Command::UsersWithRole {
        role: c[1].to_string(),
    })
}

/// Any word starting with `@` followed by an identifier character.
fn has_mention(text: &str) -> bool {
    text.split_whitespace().any(|w| {
        w.strip_prefix('@')
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    })
}

pub const HELP_TEXT: &str = "<b>List commands</b>\n\
list lists - list all list names\n\
list dump - list all list names and members\n\
list create &lt;list&gt; - create a new list\n\
list destroy &lt;list&gt; - destroy a list\n\
list rename &lt;old&gt; &lt;new&gt; - rename a list\n\
list add &lt;list&gt; &lt;name...&gt; - add names to a list\n\
list remove &lt;list&gt; &lt;name...&gt; - remove names from a list\n\
list invite &lt;list&gt; &lt;name...&gt; - invite names to a list\n\
list info &lt;list&gt; - list members in list\n\
list membership &lt;name&gt; - list lists that name is in\n\n\
Mention <code>@list</code> to notify its members; <code>&amp;list</code> members expand recursively.";
