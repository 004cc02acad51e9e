//! Transport-independent command handling.
//!
//! `ListService` owns the registry and the pending invitations. Every command
//! does its reads and mutations inside one critical section of `state`, and
//! only talks to the delivery port after the lock is released.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use tokio::sync::Mutex;

use crate::{
    commands::{Command, HELP_TEXT},
    compat::{ListRoles, RoleProvider},
    config::Config,
    domain::{is_valid_list_name, Caller, ADMINS_LIST},
    expand::{Expansion, MentionExpander},
    formatting::{escape_html, roster_line},
    invites::Invitations,
    persistence::Snapshot,
    policy::{self, AdminAllowList, Decision},
    ports::DeliveryPort,
    store::ListStore,
    utils::{AuditEvent, AuditLogger},
};

/// Runtime switches for the list bot (subset of `Config`).
#[derive(Clone, Debug, Default)]
pub struct ListSettings {
    pub admins: AdminAllowList,
    pub expander: MentionExpander,
    pub prepend_username: bool,
    pub role_shim: bool,
}

impl From<&Config> for ListSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            admins: cfg.admins.clone(),
            expander: MentionExpander::new(cfg.recurse, cfg.decoration),
            prepend_username: cfg.prepend_username,
            role_shim: cfg.role_shim,
        }
    }
}

struct State {
    store: ListStore,
    invites: Invitations,
}

pub struct ListService {
    settings: ListSettings,
    state: Mutex<State>,
    delivery: Arc<dyn DeliveryPort>,
    audit: Option<AuditLogger>,
    dirty: AtomicBool,
    bot_username: OnceLock<String>,
}

/// An invitation to send; it is only recorded once delivered.
struct Invitation {
    member: String,
    list: String,
    note: String,
}

/// Work computed under the lock, finished after it.
#[derive(Default)]
struct Outbox {
    replies: Vec<String>,
    /// Lines of the invite report that need no delivery.
    invite_lines: Vec<String>,
    invitations: Vec<Invitation>,
}

impl Outbox {
    fn reply(html: impl Into<String>) -> Self {
        Self {
            replies: vec![html.into()],
            ..Self::default()
        }
    }

    fn silent() -> Self {
        Self::default()
    }
}

impl ListService {
    /// Explicit init: adopt the loaded snapshot (if any), seed `admins`.
    pub fn new(
        settings: ListSettings,
        snapshot: Option<Snapshot>,
        delivery: Arc<dyn DeliveryPort>,
    ) -> Self {
        let (lists, invitations) = match snapshot {
            Some(s) => (Some(s.lists), Some(s.invitations)),
            None => (None, None),
        };
        let store = ListStore::load(lists, settings.admins.clone());

        Self {
            settings,
            state: Mutex::new(State {
                store,
                invites: Invitations::load(invitations),
            }),
            delivery,
            audit: None,
            // A freshly seeded `admins` list is worth persisting.
            dirty: AtomicBool::new(true),
            bot_username: OnceLock::new(),
        }
    }

    /// This bot's handle, once known; commands suffixed for other bots are ignored.
    pub fn set_bot_username(&self, username: &str) {
        if self.bot_username.set(username.to_string()).is_err() {
            tracing::debug!("bot username already set");
        }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn settings(&self) -> &ListSettings {
        &self.settings
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Snapshot and clear the dirty flag, or `None` when nothing changed.
    pub async fn take_dirty_snapshot(&self) -> Option<Snapshot> {
        let st = self.state.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return None;
        }
        Some(Snapshot {
            lists: st.store.snapshot(),
            invitations: st.invites.snapshot(),
        })
    }

    /// Read-only access to the registry.
    pub async fn with_store<T>(&self, f: impl FnOnce(&ListStore) -> T) -> T {
        let st = self.state.lock().await;
        f(&st.store)
    }

    /// Handle one incoming message; returns HTML replies for the caller's chat.
    pub async fn handle(&self, caller: &Caller, text: &str) -> Vec<String> {
        let Some(cmd) = Command::parse(text, self.bot_username.get().map(String::as_str)) else {
            return Vec::new();
        };
        tracing::debug!(user = caller.id.as_str(), command = cmd.name(), "handling");

        if cmd == Command::Broadcast {
            return self.broadcast(caller, text).await;
        }

        let gate = cmd.gate();
        let name = cmd.name();
        let (decision, outbox) = {
            let mut st = self.state.lock().await;
            let decision = policy::check(gate, &st.store, caller);
            let outbox = match decision {
                Decision::Allow => self.execute(&mut st, caller, cmd),
                Decision::Refuse => {
                    tracing::info!(user = caller.id.as_str(), "refused restricted command");
                    Outbox::reply(format!(
                        "I'm sorry, @{}, but you don't have access to do that.",
                        escape_html(caller.display_name())
                    ))
                }
                Decision::Drop => Outbox::silent(),
            };
            (decision, outbox)
        };

        if gate != policy::Gate::Open {
            self.audit(AuditEvent::command(
                caller,
                name,
                text,
                decision == Decision::Allow,
            ));
        }

        let Outbox {
            mut replies,
            invite_lines,
            invitations,
        } = outbox;
        if !invite_lines.is_empty() || !invitations.is_empty() {
            let mut lines = invite_lines;
            lines.extend(self.send_invitations(invitations).await);
            replies.push(lines.join("\n"));
        }
        replies
    }

    /// Deliver invitations, then record the ones that arrived.
    async fn send_invitations(&self, invitations: Vec<Invitation>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut delivered = Vec::new();
        for inv in invitations {
            let m_h = escape_html(&inv.member);
            match self.delivery.notify(&inv.member, &inv.note).await {
                Ok(()) => {
                    lines.push(format!("{m_h} invited to list {}.", escape_html(&inv.list)));
                    delivered.push(inv);
                }
                Err(e) => {
                    tracing::warn!(recipient = inv.member.as_str(), "invitation not delivered: {e}");
                    lines.push(format!("Could not deliver the invitation to {m_h}."));
                }
            }
        }

        if !delivered.is_empty() {
            let mut st = self.state.lock().await;
            for inv in &delivered {
                if st.invites.invite(&inv.member, &inv.list) {
                    self.mark_dirty();
                }
            }
        }
        lines
    }

    fn execute(&self, st: &mut State, caller: &Caller, cmd: Command) -> Outbox {
        let State { store, invites } = st;

        match cmd {
            Command::Help => Outbox::reply(HELP_TEXT),
            Command::Usage(usage) => Outbox::reply(escape_html(usage)),

            Command::Lists => Outbox::reply(format!(
                "Lists: {}",
                escape_html(&store.lists().join(", "))
            )),

            Command::Dump => {
                let lines: Vec<String> = store
                    .lists()
                    .iter()
                    .map(|g| roster_line(g, &store.members(g)))
                    .collect();
                if lines.is_empty() {
                    return Outbox::silent();
                }
                Outbox::reply(lines.join("\n"))
            }

            Command::Create { name } => {
                if !is_valid_list_name(&name) {
                    return Outbox::reply(format!("Invalid list name: {}", escape_html(&name)));
                }
                let name_h = escape_html(&name);
                if store.create(&name) {
                    self.mark_dirty();
                    Outbox::reply(format!("Created list {name_h}."))
                } else {
                    Outbox::reply(format!("List {name_h} already exists!"))
                }
            }

            Command::Destroy { name } => {
                let name_h = escape_html(&name);
                if name == ADMINS_LIST {
                    return Outbox::reply(format!("List {name_h} is reserved!"));
                }
                match store.destroy(&name) {
                    Some(old) => {
                        self.mark_dirty();
                        Outbox::reply(format!(
                            "Destroyed list {name_h} ({}).",
                            escape_html(&old.join(", "))
                        ))
                    }
                    None => Outbox::reply(format!("List {name_h} does not exist!")),
                }
            }

            Command::Rename { from, to } => {
                let (from_h, to_h) = (escape_html(&from), escape_html(&to));
                if from == ADMINS_LIST {
                    return Outbox::reply(format!("List {from_h} is reserved!"));
                }
                if !is_valid_list_name(&to) {
                    return Outbox::reply(format!("Invalid list name: {to_h}"));
                }
                if store.rename(&from, &to) {
                    self.mark_dirty();
                    Outbox::reply(format!("Renamed list {from_h} to {to_h}."))
                } else {
                    Outbox::reply(format!(
                        "Either list {from_h} does not exist or {to_h} already exists!"
                    ))
                }
            }

            Command::Add { list, members } => {
                let list_h = escape_html(&list);
                if !store.exists(&list) {
                    return Outbox::reply(format!("List {list_h} does not exist!"));
                }
                let lines: Vec<String> = members
                    .iter()
                    .map(|m| {
                        let m_h = escape_html(m);
                        if store.add(&list, m) {
                            self.mark_dirty();
                            format!("{m_h} added to list {list_h}.")
                        } else {
                            format!("{m_h} is already in list {list_h}!")
                        }
                    })
                    .collect();
                Outbox::reply(lines.join("\n"))
            }

            Command::Remove { list, members } => {
                let list_h = escape_html(&list);
                if !store.exists(&list) {
                    return Outbox::reply(format!("List {list_h} does not exist!"));
                }
                let lines: Vec<String> = members
                    .iter()
                    .map(|m| {
                        let m_h = escape_html(m);
                        if store.remove(&list, m) {
                            self.mark_dirty();
                            format!("{m_h} removed from list {list_h}.")
                        } else {
                            format!("{m_h} is not in list {list_h}!")
                        }
                    })
                    .collect();
                Outbox::reply(lines.join("\n"))
            }

            Command::Invite { list, members } => {
                let list_h = escape_html(&list);
                if !store.exists(&list) {
                    return Outbox::reply(format!("List {list_h} does not exist!"));
                }
                let mut out = Outbox::silent();
                for m in members {
                    if store.is_member(&list, &m) {
                        out.invite_lines
                            .push(format!("{} is already in list {list_h}!", escape_html(&m)));
                        continue;
                    }
                    out.invitations.push(Invitation {
                        note: format!(
                            "You have been invited to the list {list}, reply 'YES' (all uppercase) to accept or 'NO' to reject."
                        ),
                        member: m,
                        list: list.clone(),
                    });
                }
                out
            }

            Command::InviteResponse(accept) => {
                let Some(who) = invites.find(caller.identities()).map(str::to_string) else {
                    return Outbox::silent();
                };
                self.mark_dirty();
                if accept {
                    if let Some(done) = invites.accept(&who, store) {
                        tracing::info!(
                            member = who.as_str(),
                            joined = ?done.joined,
                            vanished = ?done.vanished,
                            "invitation accepted"
                        );
                    }
                    Outbox::reply("Okay, adding you to the list!")
                } else {
                    invites.decline(&who);
                    Outbox::reply("Okay, not adding you to the list!")
                }
            }

            Command::Info { name } => {
                if !store.exists(&name) {
                    return Outbox::reply(format!("List {} does not exist!", escape_html(&name)));
                }
                Outbox::reply(roster_line(&name, &store.members(&name)))
            }

            Command::Membership { member } => {
                let lists = store.membership(&member);
                let m_h = escape_html(&member);
                if lists.is_empty() {
                    Outbox::reply(format!("{m_h} is not in any lists!"))
                } else {
                    Outbox::reply(format!("{m_h} is in {}.", escape_html(&lists.join(", "))))
                }
            }

            Command::UserRoles { user } => {
                if !self.settings.role_shim {
                    return Outbox::silent();
                }
                let roles = ListRoles::new(store).user_roles(&user);
                let user_h = escape_html(&user);
                if roles.is_empty() {
                    Outbox::reply(format!("{user_h} has no roles."))
                } else {
                    Outbox::reply(format!(
                        "{user_h} has the following roles: {}.",
                        escape_html(&roles.join(", "))
                    ))
                }
            }

            Command::UsersWithRole { role } => {
                if !self.settings.role_shim {
                    return Outbox::silent();
                }
                let users = ListRoles::new(store).users_with_role(&role);
                let role_h = escape_html(&role);
                if users.is_empty() {
                    Outbox::reply(format!("There are no people that have the '{role_h}' role."))
                } else {
                    Outbox::reply(format!(
                        "The following people have the '{role_h}' role: {}",
                        escape_html(&users.join(", "))
                    ))
                }
            }

            // Routed through `broadcast`.
            Command::Broadcast => Outbox::silent(),
        }
    }

    /// Expand mentioned lists and notify every literal recipient.
    async fn broadcast(&self, caller: &Caller, text: &str) -> Vec<String> {
        let expansion: Expansion = {
            let st = self.state.lock().await;
            match policy::check(Command::Broadcast.gate(), &st.store, caller) {
                Decision::Allow => self.settings.expander.expand(&st.store, text),
                _ => {
                    tracing::debug!(user = caller.id.as_str(), "mention from non-admin dropped");
                    return Vec::new();
                }
            }
        };
        if expansion.is_empty() {
            return Vec::new();
        }

        let message = if self.settings.prepend_username {
            format!("{}: {text}", caller.display_name())
        } else {
            text.to_string()
        };

        let mut sent = 0usize;
        let mut failed: Vec<String> = Vec::new();
        for roster in &expansion.rosters {
            for r in &roster.recipients {
                match self.delivery.notify(&r.name, &message).await {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        tracing::warn!(
                            list = roster.list.as_str(),
                            recipient = r.name.as_str(),
                            "delivery failed: {e}"
                        );
                        if !failed.contains(&r.name) {
                            failed.push(r.name.clone());
                        }
                    }
                }
            }
        }

        tracing::info!(
            lists = ?expansion.tagged,
            sent,
            failed = failed.len(),
            "broadcast"
        );
        self.audit(AuditEvent::broadcast(caller, &expansion.tagged, sent));
        if !failed.is_empty() {
            self.audit(AuditEvent::error(
                caller,
                &format!("unreachable: {}", failed.join(", ")),
                Some(text),
            ));
        }

        let mut replies = Vec::new();
        let line = expansion.mention_line();
        if !line.is_empty() {
            replies.push(escape_html(&line));
        }
        if !failed.is_empty() {
            replies.push(format!(
                "Could not reach: {}",
                escape_html(&failed.join(", "))
            ));
        }
        replies
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(a) = &self.audit {
            a.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::ChatId, expand::Decoration, Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeDelivery {
        sent: StdMutex<Vec<(String, String)>>,
        unreachable: Vec<String>,
    }

    impl FakeDelivery {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryPort for FakeDelivery {
        async fn notify(&self, recipient: &str, text: &str) -> Result<()> {
            if self.unreachable.iter().any(|u| u == recipient) {
                return Err(Error::External(format!("unknown recipient {recipient}")));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn caller(id: &str) -> Caller {
        Caller {
            id: id.to_string(),
            handle: None,
            chat_id: ChatId(1),
        }
    }

    fn settings() -> ListSettings {
        ListSettings {
            admins: AdminAllowList::parse("alice"),
            expander: MentionExpander::new(true, Decoration::Angle),
            prepend_username: false,
            role_shim: false,
        }
    }

    fn service(settings: ListSettings) -> (ListService, Arc<FakeDelivery>) {
        let delivery = Arc::new(FakeDelivery::default());
        let svc = ListService::new(settings, None, delivery.clone());
        (svc, delivery)
    }

    async fn say(svc: &ListService, who: &str, text: &str) -> Vec<String> {
        svc.handle(&caller(who), text).await
    }

    #[tokio::test]
    async fn admin_creates_list() {
        let (svc, _) = service(settings());
        assert_eq!(say(&svc, "alice", "list create test").await, vec!["Created list test."]);
        assert_eq!(
            say(&svc, "alice", "list create test").await,
            vec!["List test already exists!"]
        );
    }

    #[tokio::test]
    async fn non_admin_is_refused() {
        let (svc, _) = service(settings());
        assert_eq!(
            say(&svc, "bob", "list create test").await,
            vec!["I'm sorry, @bob, but you don't have access to do that."]
        );
        assert!(!svc.with_store(|s| s.exists("test")).await);
    }

    #[tokio::test]
    async fn read_only_commands_are_open() {
        let (svc, _) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list add team carol &sub").await;

        assert_eq!(say(&svc, "bob", "list lists").await, vec!["Lists: admins, team"]);
        assert_eq!(
            say(&svc, "bob", "list info team").await,
            vec!["<b>@team</b>: &amp;sub, carol"]
        );
        assert_eq!(
            say(&svc, "bob", "list membership carol").await,
            vec!["carol is in team."]
        );
        assert_eq!(
            say(&svc, "bob", "list membership zed").await,
            vec!["zed is not in any lists!"]
        );
        assert_eq!(
            say(&svc, "bob", "list dump").await,
            vec!["<b>@admins</b>: \n<b>@team</b>: &amp;sub, carol"]
        );
    }

    #[tokio::test]
    async fn add_remove_rename_destroy() {
        let (svc, _) = service(settings());
        assert_eq!(
            say(&svc, "alice", "list add missing x").await,
            vec!["List missing does not exist!"]
        );
        say(&svc, "alice", "list create a").await;
        assert_eq!(
            say(&svc, "alice", "list add a x x").await,
            vec!["x added to list a.\nx is already in list a!"]
        );
        assert_eq!(
            say(&svc, "alice", "list remove a x y").await,
            vec!["x removed from list a.\ny is not in list a!"]
        );
        say(&svc, "alice", "list add a z").await;
        assert_eq!(
            say(&svc, "alice", "list rename a to b").await,
            vec!["Renamed list a to b."]
        );
        assert_eq!(
            say(&svc, "alice", "list rename a b").await,
            vec!["Either list a does not exist or b already exists!"]
        );
        assert_eq!(
            say(&svc, "alice", "list destroy b").await,
            vec!["Destroyed list b (z)."]
        );
        assert_eq!(
            say(&svc, "alice", "list destroy b").await,
            vec!["List b does not exist!"]
        );
    }

    #[tokio::test]
    async fn admins_list_is_protected_and_names_validated() {
        let (svc, _) = service(settings());
        assert_eq!(
            say(&svc, "alice", "list destroy admins").await,
            vec!["List admins is reserved!"]
        );
        assert_eq!(
            say(&svc, "alice", "list rename admins root").await,
            vec!["List admins is reserved!"]
        );
        assert_eq!(
            say(&svc, "alice", "list create my team").await,
            vec!["Invalid list name: my team"]
        );
        assert!(svc.with_store(|s| s.exists("admins")).await);
    }

    #[tokio::test]
    async fn admins_list_grants_access() {
        let (svc, _) = service(settings());
        say(&svc, "alice", "list add admins bob").await;
        assert_eq!(say(&svc, "bob", "list create ops").await, vec!["Created list ops."]);
    }

    #[tokio::test]
    async fn broadcast_expands_recursively() {
        let (svc, delivery) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list create sub").await;
        say(&svc, "alice", "list add team &sub alice").await;
        say(&svc, "alice", "list add sub bob").await;

        let replies = say(&svc, "alice", "@team please respond").await;
        assert_eq!(replies, vec!["&lt;@alice&gt; &lt;@bob&gt;"]);

        let sent = delivery.sent();
        assert_eq!(
            sent,
            vec![
                ("alice".to_string(), "@team please respond".to_string()),
                ("bob".to_string(), "@team please respond".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn broadcast_from_non_admin_is_silent() {
        let (svc, delivery) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list add team carol").await;

        assert!(say(&svc, "bob", "@team hi").await.is_empty());
        assert!(delivery.sent().is_empty());
    }

    #[tokio::test]
    async fn broadcast_prepends_username_and_reports_failures() {
        let delivery = Arc::new(FakeDelivery {
            unreachable: vec!["ghost".to_string()],
            ..Default::default()
        });
        let svc = ListService::new(
            ListSettings {
                prepend_username: true,
                ..settings()
            },
            None,
            delivery.clone(),
        );
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list add team carol ghost").await;

        let replies = say(&svc, "alice", "@team lunch").await;
        assert_eq!(replies[1], "Could not reach: ghost");
        assert_eq!(
            delivery.sent(),
            vec![("carol".to_string(), "alice: @team lunch".to_string())]
        );
    }

    #[tokio::test]
    async fn shared_member_notified_per_list() {
        let (svc, delivery) = service(settings());
        say(&svc, "alice", "list create x").await;
        say(&svc, "alice", "list create y").await;
        say(&svc, "alice", "list add x carol").await;
        say(&svc, "alice", "list add y carol").await;

        let replies = say(&svc, "alice", "@x @y").await;
        assert_eq!(replies, vec!["&lt;@carol&gt; carol"]);
        assert_eq!(delivery.sent().len(), 2);
    }

    #[tokio::test]
    async fn invitation_accept_flow() {
        let (svc, delivery) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list add team carol").await;

        assert_eq!(
            say(&svc, "alice", "list invite team dave carol").await,
            vec!["carol is already in list team!\ndave invited to list team."]
        );
        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "dave");
        assert!(sent[0].1.contains("invited to the list team"));

        assert!(say(&svc, "erin", "YES").await.is_empty());
        assert_eq!(
            say(&svc, "dave", "YES").await,
            vec!["Okay, adding you to the list!"]
        );
        assert!(svc.with_store(|s| s.is_member("team", "dave")).await);
        assert!(say(&svc, "dave", "YES").await.is_empty());
    }

    #[tokio::test]
    async fn invitation_decline_flow() {
        let (svc, _) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list invite team dave").await;

        assert_eq!(
            say(&svc, "dave", "NO").await,
            vec!["Okay, not adding you to the list!"]
        );
        assert!(!svc.with_store(|s| s.is_member("team", "dave")).await);
        let snap = svc.take_dirty_snapshot().await.unwrap();
        assert!(snap.invitations.is_empty());
    }

    #[tokio::test]
    async fn undeliverable_invitation_is_reported() {
        let delivery = Arc::new(FakeDelivery {
            unreachable: vec!["ghost".to_string()],
            ..Default::default()
        });
        let svc = ListService::new(settings(), None, delivery);
        say(&svc, "alice", "list create team").await;

        let replies = say(&svc, "alice", "list invite team ghost dave").await;
        assert_eq!(
            replies,
            vec!["Could not deliver the invitation to ghost.\ndave invited to list team."]
        );

        let snap = svc.take_dirty_snapshot().await.unwrap();
        assert!(!snap.invitations.contains_key("ghost"));
        assert_eq!(snap.invitations["dave"], vec!["team"]);
        assert!(say(&svc, "ghost", "YES").await.is_empty());
    }

    #[tokio::test]
    async fn chat_starting_with_list_still_broadcasts() {
        let (svc, delivery) = service(settings());
        say(&svc, "alice", "list create team").await;
        say(&svc, "alice", "list add team carol").await;

        let replies = say(&svc, "alice", "List of attendees: @team").await;
        assert_eq!(replies, vec!["&lt;@carol&gt;"]);
        assert_eq!(
            delivery.sent(),
            vec![("carol".to_string(), "List of attendees: @team".to_string())]
        );

        assert!(say(&svc, "bob", "list looks good to me").await.is_empty());
    }

    #[tokio::test]
    async fn commands_for_other_bots_are_ignored() {
        let (svc, _) = service(settings());
        svc.set_bot_username("list_bot");

        assert!(say(&svc, "alice", "/list@other_bot create team").await.is_empty());
        assert!(!svc.with_store(|s| s.exists("team")).await);
        assert_eq!(
            say(&svc, "alice", "/list@list_bot create team").await,
            vec!["Created list team."]
        );
    }

    #[tokio::test]
    async fn restricted_commands_are_audited() {
        let path = std::env::temp_dir()
            .join(format!("listbot-service-audit-{}", std::process::id()))
            .join("audit.jsonl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);
        let (svc, _) = service(settings());
        let svc = svc.with_audit(AuditLogger::new(&path, true));

        say(&svc, "bob", "list create team").await;
        say(&svc, "bob", "list lists").await;

        let txt = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = txt
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["command"], "create");
        assert_eq!(lines[0]["authorized"], false);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn role_queries_need_shim() {
        let (svc, _) = service(settings());
        say(&svc, "alice", "list create ops").await;
        say(&svc, "alice", "list add ops carol").await;
        assert!(say(&svc, "bob", "who has ops role").await.is_empty());

        let (svc, _) = service(ListSettings {
            role_shim: true,
            ..settings()
        });
        say(&svc, "alice", "list create ops").await;
        say(&svc, "alice", "list add ops carol").await;
        assert_eq!(
            say(&svc, "bob", "who has ops role").await,
            vec!["The following people have the 'ops' role: carol"]
        );
        assert_eq!(
            say(&svc, "bob", "what roles does carol have?").await,
            vec!["carol has the following roles: ops."]
        );
        assert_eq!(
            say(&svc, "bob", "what roles does zed have").await,
            vec!["zed has no roles."]
        );
    }

    #[tokio::test]
    async fn dirty_tracking() {
        let (svc, _) = service(settings());
        assert!(svc.take_dirty_snapshot().await.is_some());
        assert!(svc.take_dirty_snapshot().await.is_none());

        say(&svc, "bob", "list lists").await;
        assert!(svc.take_dirty_snapshot().await.is_none());

        say(&svc, "alice", "list create team").await;
        let snap = svc.take_dirty_snapshot().await.unwrap();
        assert!(snap.lists.contains_key("team"));
    }

    #[tokio::test]
    async fn loads_snapshot() {
        let mut snap = Snapshot::default();
        snap.lists
            .insert("team".to_string(), vec!["carol".to_string()]);
        snap.invitations
            .insert("dave".to_string(), vec!["team".to_string()]);
        let svc = ListService::new(settings(), Some(snap), Arc::new(FakeDelivery::default()));

        assert!(svc.with_store(|s| s.exists("admins")).await);
        assert_eq!(
            say(&svc, "dave", "YES").await,
            vec!["Okay, adding you to the list!"]
        );
        assert_eq!(
            svc.with_store(|s| s.members("team")).await,
            vec!["carol", "dave"]
        );
    }
}
