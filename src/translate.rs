//! Bidirectional message translation.
//!
//! Inbound: Telegram message events become IRC lines (plus synthetic JOIN
//! and MODE lines that keep the client's view of group membership and admin
//! status current). Outbound: IRC PRIVMSG/NOTICE bodies become Telegram
//! sends.
//!
//! The translator never touches the socket directly; every line goes
//! through the single writer queue, and every cache mutation goes through
//! the roster.

use crate::cache::{HandleScope, Roster, UpsertOutcome};
use crate::config::FeatureFlags;
use crate::error::BridgeError;
use crate::telegram::{MessageEvent, Messenger, TelegramError};
use std::sync::Arc;
use tgbridge_proto::ctcp;
use tgbridge_proto::response::{self, UserPrefix};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The bridge's server name on the IRC side. Also the host part of every
/// synthesized user prefix.
pub const SERVER_NAME: &str = "telegram.irc.bridge";

/// Literal token the IRC client embeds to get a real line break on the
/// Telegram side (the wire protocol cannot carry one).
pub const NEWLINE_SENTINEL: &str = "\\n";

/// The bidirectional translation engine.
pub struct Translator {
    roster: Arc<Roster>,
    flags: FeatureFlags,
    messenger: Arc<dyn Messenger>,
    writer: mpsc::Sender<String>,
}

impl Translator {
    pub fn new(
        roster: Arc<Roster>,
        flags: FeatureFlags,
        messenger: Arc<dyn Messenger>,
        writer: mpsc::Sender<String>,
    ) -> Self {
        Self {
            roster,
            flags,
            messenger,
            writer,
        }
    }

    async fn write(&self, line: String) -> Result<(), BridgeError> {
        self.writer
            .send(line)
            .await
            .map_err(|_| BridgeError::WriterClosed)
    }

    /// Prefix for a line originating from a bridged Telegram user.
    fn bridged_prefix(&self, handle: &str, user_id: &str) -> UserPrefix {
        UserPrefix::new(
            format!("{}{}", self.flags.handle_prefix(), handle),
            user_id,
            SERVER_NAME,
        )
    }

    // ------------------------------------------------------------------
    // Inbound: Telegram -> IRC
    // ------------------------------------------------------------------

    /// Translate one Telegram message event into IRC lines.
    ///
    /// Only writer-queue loss is an error here; Telegram and cache trouble
    /// is logged and absorbed.
    pub async fn deliver_event(&self, event: &MessageEvent) -> Result<(), BridgeError> {
        let Some(handle) = event.username.as_deref() else {
            info!("Ignoring a message from an @-less user");
            return Ok(());
        };
        let user_id = event.user_id.to_string();

        if event.is_direct() && self.handle_control_command(event, handle, &user_id).await {
            return Ok(());
        }

        let destination = if event.is_direct() {
            format!("{}{}", self.flags.handle_prefix(), handle)
        } else if event.is_group() {
            format!("#{}", event.chat_id)
        } else {
            info!(
                chat_id = event.chat_id,
                "Ignoring a message to a non-group destination that is not a DM"
            );
            return Ok(());
        };

        // Telegram appends "@BotName" to commands; the bot on the IRC side
        // would not recognize them, so strip the suffix off the first word.
        let mut text = strip_mention_suffix(&event.text);

        let mut action = false;
        if let Some(rest) = text.strip_prefix("/me ") {
            action = true;
            text = rest.to_string();
        }

        let group_id = event.is_group().then(|| event.chat_id.to_string());

        let sender_outcome = match self
            .roster
            .upsert(&user_id, handle, group_id.as_deref(), None, None)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(user_id, error = %e, "Cache update for sender failed");
                UpsertOutcome::default()
            }
        };

        if let Some(gid) = &group_id {
            self.sync_group_admins(gid, &destination).await?;
            self.emit_membership(&destination, handle, &user_id, sender_outcome)
                .await?;
        }

        // One wire line per embedded line; the terminator cannot be carried.
        let prefix = self.bridged_prefix(handle, &user_id);
        for segment in text.split('\n') {
            let body = if action {
                ctcp::action(segment)
            } else {
                segment.to_string()
            };
            self.write(response::user_line(&prefix, "PRIVMSG", &[&destination], Some(&body)))
                .await?;
        }
        info!(destination = %destination, from = %handle, "Bridged message to IRC");
        Ok(())
    }

    /// DM control commands steering the sender's DM permission.
    ///
    /// Returns true when the event was consumed and must not be forwarded.
    async fn handle_control_command(
        &self,
        event: &MessageEvent,
        handle: &str,
        user_id: &str,
    ) -> bool {
        let first = event.text.split(' ').next().unwrap_or("");
        let command = first.split('@').next().unwrap_or(first);
        match command {
            "/start" => {
                if let Err(e) = self.roster.upsert(user_id, handle, None, None, Some(true)) {
                    warn!(user_id, error = %e, "Failed to record DM opt-in");
                }
                info!(handle, "User enabled DMs with the bridge client");
                let notice = "`[Bridge Notice]` PMs will now be conducted between you and the bot. Use /stop, or block the bot, to disable this.";
                if let Err(e) = self.messenger.send_message(event.chat_id, notice, true).await {
                    warn!(error = %e, "Failed to confirm DM opt-in");
                }
                true
            }
            "/stop" => {
                if let Err(e) = self.roster.upsert(user_id, handle, None, None, Some(false)) {
                    warn!(user_id, error = %e, "Failed to record DM opt-out");
                }
                info!(handle, "User disabled DMs with the bridge client");
                true
            }
            "/bridgecfg" => {
                info!(handle, "Bridge configuration command received; not implemented");
                true
            }
            _ => false,
        }
    }

    /// Enumerate a group's admins and surface newly observed members and
    /// admin grants to the IRC client.
    ///
    /// Queried on every group message; the platform is the authority and
    /// the result is not cached between messages.
    async fn sync_group_admins(&self, group_id: &str, channel: &str) -> Result<(), BridgeError> {
        let gid: i64 = match group_id.parse() {
            Ok(v) => v,
            Err(_) => return Ok(()),
        };
        let admins = match self.messenger.list_group_admins(gid).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!(group_id, error = %e, "Failed to list group admins");
                return Ok(());
            }
        };
        for admin in admins {
            let Some(handle) = admin.username else {
                debug!(user_id = admin.user_id, "Skipping @-less admin");
                continue;
            };
            let uid = admin.user_id.to_string();
            let outcome = match self
                .roster
                .upsert(&uid, &handle, Some(group_id), Some(true), None)
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(user_id = %uid, error = %e, "Cache update for admin failed");
                    continue;
                }
            };
            self.emit_membership(channel, &handle, &uid, outcome).await?;
        }
        Ok(())
    }

    /// Synthetic JOIN for a newly observed member, MODE for an admin-state
    /// change.
    async fn emit_membership(
        &self,
        channel: &str,
        handle: &str,
        user_id: &str,
        outcome: UpsertOutcome,
    ) -> Result<(), BridgeError> {
        let shown = format!("{}{}", self.flags.handle_prefix(), handle);
        if outcome.new_group_member {
            let prefix = self.bridged_prefix(handle, user_id);
            self.write(response::user_line(&prefix, "JOIN", &[channel], None))
                .await?;
        }
        let modes = match outcome.admin_changed {
            Some(true) => "+o-v",
            Some(false) => "-o+v",
            None => return Ok(()),
        };
        self.write(response::server_line(
            SERVER_NAME,
            "MODE",
            &[channel, modes, &shown, &shown],
            None,
        ))
        .await
    }

    // ------------------------------------------------------------------
    // Outbound: IRC -> Telegram
    // ------------------------------------------------------------------

    /// Relay a PRIVMSG/NOTICE body to Telegram.
    ///
    /// An unroutable destination or an unauthorized recipient drops the
    /// message with a log line; the IRC client never sees an error reply.
    pub async fn relay_to_telegram(&self, target: &str, body: &str, notice: bool) {
        let (chat_id, group_scope, direct_user) = if let Some(rest) = target.strip_prefix('#') {
            match rest.parse::<i64>() {
                Ok(id) if id < 0 => (id, Some(rest.to_string()), None),
                _ => {
                    info!(target, "Dropping message to non-group pseudo-channel");
                    return;
                }
            }
        } else {
            let bare = target.strip_prefix('@').unwrap_or(target);
            match self.roster.resolve_handle(bare) {
                Some((uid, Some(true))) => match uid.parse::<i64>() {
                    Ok(id) => (id, None, Some(uid)),
                    Err(_) => {
                        warn!(target, user_id = %uid, "Cached user id is not numeric");
                        return;
                    }
                },
                Some(_) => {
                    info!(target, "Dropping DM to a user who has not accepted DMs from the bot");
                    return;
                }
                None => {
                    info!(target, "Dropping message to unknown handle");
                    return;
                }
            }
        };

        // ACTION framing becomes emphasis markers on the Telegram side.
        let mut text = match ctcp::parse_action(body) {
            Some(payload) => format!("*{payload}*"),
            None => body.to_string(),
        };

        // Restore embedded line breaks the wire protocol could not carry.
        if text.contains(NEWLINE_SENTINEL) {
            text = text.replace(NEWLINE_SENTINEL, "\n");
        }

        text = self.apply_outbound_flags(text, group_scope.as_deref());

        if notice {
            text = format!("[Notice] {text}");
        }

        match self.messenger.send_message(chat_id, &text, notice).await {
            Ok(()) => {
                info!(chat_id, notice, "Relayed message to Telegram");
            }
            Err(TelegramError::Unauthorized) => {
                warn!(chat_id, "Recipient has not enabled DMs with the bot");
                if let Some(uid) = direct_user {
                    if let Err(e) = self.roster.revoke_dm(&uid) {
                        warn!(user_id = %uid, error = %e, "Failed to record DM refusal");
                    }
                }
            }
            Err(e) => {
                warn!(chat_id, error = %e, "Telegram send failed, dropping message");
            }
        }
    }

    /// Apply the at-sign stripping and forced-mention flags to outgoing
    /// text.
    fn apply_outbound_flags(&self, mut text: String, group: Option<&str>) -> String {
        if self.flags.strip_all_at_signs_from_bot_text {
            text = text.replace('@', "");
        }
        if self.flags.force_convert_usernames_to_at_usernames {
            let scope = match group {
                Some(gid) => HandleScope::Group(gid),
                None => HandleScope::Direct,
            };
            let handles = self.roster.handles_in_scope(scope);
            if !handles.is_empty() {
                text = text
                    .split(' ')
                    .map(|word| {
                        if handles.iter().any(|h| h.eq_ignore_ascii_case(word)) {
                            format!("@{word}")
                        } else {
                            word.to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
        text
    }
}

/// Strip a trailing "@mention" suffix off the first word of command-style
/// text.
fn strip_mention_suffix(text: &str) -> String {
    if !text.starts_with('/') {
        return text.to_string();
    }
    match text.split_once(' ') {
        Some((first, rest)) => {
            let first = first.split('@').next().unwrap_or(first);
            format!("{first} {rest}")
        }
        None => text.split('@').next().unwrap_or(text).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{BotProfile, ChatAdmin};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Captures sends; optionally fails them.
    struct FakeMessenger {
        admins: Vec<ChatAdmin>,
        sent: Mutex<Vec<(i64, String, bool)>>,
        refuse_sends: bool,
    }

    impl FakeMessenger {
        fn new() -> Self {
            Self {
                admins: Vec::new(),
                sent: Mutex::new(Vec::new()),
                refuse_sends: false,
            }
        }

        fn with_admins(admins: Vec<ChatAdmin>) -> Self {
            Self {
                admins,
                ..Self::new()
            }
        }

        fn sent(&self) -> Vec<(i64, String, bool)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn authenticate(&self) -> Result<BotProfile, TelegramError> {
            Ok(BotProfile {
                id: 1,
                username: Some("bridgebot".to_string()),
            })
        }

        async fn poll_updates(
            &self,
            offset: i64,
            _timeout_secs: u64,
        ) -> Result<(i64, Vec<MessageEvent>), TelegramError> {
            Ok((offset, Vec::new()))
        }

        async fn list_group_admins(
            &self,
            _group_id: i64,
        ) -> Result<Vec<ChatAdmin>, TelegramError> {
            Ok(self.admins.clone())
        }

        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            rich: bool,
        ) -> Result<(), TelegramError> {
            if self.refuse_sends {
                return Err(TelegramError::Unauthorized);
            }
            self.sent.lock().push((chat_id, text.to_string(), rich));
            Ok(())
        }
    }

    struct Harness {
        translator: Translator,
        roster: Arc<Roster>,
        messenger: Arc<FakeMessenger>,
        rx: mpsc::Receiver<String>,
        _dir: tempfile::TempDir,
    }

    fn harness_with(flags: FeatureFlags, messenger: FakeMessenger) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let roster = Arc::new(Roster::load(dir.path().join("usercache.json")).unwrap());
        let messenger = Arc::new(messenger);
        let (tx, rx) = mpsc::channel(256);
        let translator = Translator::new(
            Arc::clone(&roster),
            flags,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
            tx,
        );
        Harness {
            translator,
            roster,
            messenger,
            rx,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(FeatureFlags::default(), FakeMessenger::new())
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn group_event(text: &str) -> MessageEvent {
        MessageEvent {
            chat_id: -219689000,
            user_id: 42,
            username: Some("alice".to_string()),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn multiline_event_yields_one_line_per_segment() {
        let mut h = harness();
        h.translator
            .deliver_event(&group_event("one\ntwo\nthree"))
            .await
            .unwrap();

        let lines = drain(&mut h.rx);
        let privmsgs: Vec<_> = lines.iter().filter(|l| l.contains(" PRIVMSG ")).collect();
        assert_eq!(privmsgs.len(), 3);
        for line in &lines {
            assert!(!line.contains('\n'), "embedded terminator in {line:?}");
        }
        assert!(privmsgs[0].ends_with(":one"));
        assert!(privmsgs[2].ends_with(":three"));
    }

    #[tokio::test]
    async fn me_text_becomes_ctcp_action() {
        let mut h = harness();
        h.translator
            .deliver_event(&group_event("/me jumps"))
            .await
            .unwrap();

        let lines = drain(&mut h.rx);
        let privmsg = lines.iter().find(|l| l.contains(" PRIVMSG ")).unwrap();
        assert!(privmsg.contains("\x01ACTION jumps\x01"));
    }

    #[tokio::test]
    async fn multiline_action_frames_every_segment() {
        let mut h = harness();
        h.translator
            .deliver_event(&group_event("/me jumps\nfalls"))
            .await
            .unwrap();

        let lines = drain(&mut h.rx);
        let privmsgs: Vec<_> = lines.iter().filter(|l| l.contains(" PRIVMSG ")).collect();
        assert_eq!(privmsgs.len(), 2);
        assert!(privmsgs.iter().all(|l| l.contains("\x01ACTION ")));
    }

    #[tokio::test]
    async fn command_mention_suffix_is_stripped() {
        let mut h = harness();
        h.translator
            .deliver_event(&group_event("/status@bridgebot now"))
            .await
            .unwrap();

        let lines = drain(&mut h.rx);
        let privmsg = lines.iter().find(|l| l.contains(" PRIVMSG ")).unwrap();
        assert!(privmsg.ends_with(":/status now"));
    }

    #[tokio::test]
    async fn group_event_synthesizes_join_and_admin_mode() {
        let mut h = harness_with(
            FeatureFlags::default(),
            FakeMessenger::with_admins(vec![ChatAdmin {
                user_id: 7,
                username: Some("root".to_string()),
            }]),
        );
        h.translator
            .deliver_event(&group_event("hello"))
            .await
            .unwrap();

        let lines = drain(&mut h.rx);
        let admin_join = ":root!7@telegram.irc.bridge JOIN #-219689000";
        let admin_mode = ":telegram.irc.bridge MODE #-219689000 +o-v root root";
        let sender_join = ":alice!42@telegram.irc.bridge JOIN #-219689000";
        assert!(lines.iter().any(|l| l == admin_join), "{lines:?}");
        assert!(lines.iter().any(|l| l == admin_mode), "{lines:?}");
        assert!(lines.iter().any(|l| l == sender_join), "{lines:?}");

        // Admin emissions precede the sender's JOIN, which precedes the text.
        let mode_pos = lines.iter().position(|l| l == admin_mode).unwrap();
        let join_pos = lines.iter().position(|l| l == sender_join).unwrap();
        let text_pos = lines.iter().position(|l| l.contains(" PRIVMSG ")).unwrap();
        assert!(mode_pos < join_pos && join_pos < text_pos);

        // A second message from the same people synthesizes nothing new.
        h.translator
            .deliver_event(&group_event("again"))
            .await
            .unwrap();
        let lines = drain(&mut h.rx);
        assert!(lines.iter().all(|l| !l.contains(" JOIN ") && !l.contains(" MODE ")));
    }

    #[tokio::test]
    async fn direct_event_targets_sender_handle() {
        let mut h = harness();
        let event = MessageEvent {
            chat_id: 42,
            user_id: 42,
            username: Some("alice".to_string()),
            text: "hi there".to_string(),
        };
        h.translator.deliver_event(&event).await.unwrap();

        let lines = drain(&mut h.rx);
        assert_eq!(lines, vec![":alice!42@telegram.irc.bridge PRIVMSG alice :hi there"]);
    }

    #[tokio::test]
    async fn atless_sender_is_ignored() {
        let mut h = harness();
        let event = MessageEvent {
            chat_id: -1,
            user_id: 42,
            username: None,
            text: "hi".to_string(),
        };
        h.translator.deliver_event(&event).await.unwrap();
        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn start_command_enables_dms_and_confirms() {
        let mut h = harness();
        let event = MessageEvent {
            chat_id: 42,
            user_id: 42,
            username: Some("alice".to_string()),
            text: "/start".to_string(),
        };
        h.translator.deliver_event(&event).await.unwrap();

        // Consumed: nothing reaches IRC.
        assert!(drain(&mut h.rx).is_empty());
        let (_, dm) = h.roster.resolve_handle("alice").unwrap();
        assert_eq!(dm, Some(true));

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("[Bridge Notice]"));
        assert!(sent[0].2, "opt-in confirmation is rich-formatted");
    }

    #[tokio::test]
    async fn stop_command_disables_dms() {
        let h = harness();
        h.roster.upsert("42", "alice", None, None, Some(true)).unwrap();
        let event = MessageEvent {
            chat_id: 42,
            user_id: 42,
            username: Some("alice".to_string()),
            text: "/stop".to_string(),
        };
        h.translator.deliver_event(&event).await.unwrap();
        let (_, dm) = h.roster.resolve_handle("alice").unwrap();
        assert_eq!(dm, Some(false));
    }

    #[tokio::test]
    async fn channel_target_routes_to_group_id() {
        let h = harness();
        h.translator
            .relay_to_telegram("#-219689000", "hello", false)
            .await;

        let sent = h.messenger.sent();
        assert_eq!(sent, vec![(-219689000, "hello".to_string(), false)]);
    }

    #[tokio::test]
    async fn positive_channel_suffix_is_dropped() {
        let h = harness();
        h.translator.relay_to_telegram("#12345", "hello", false).await;
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn action_body_becomes_starred_text() {
        let h = harness();
        h.translator
            .relay_to_telegram("#-219689000", "\x01ACTION jumps\x01", false)
            .await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0].1, "*jumps*");
    }

    #[tokio::test]
    async fn newline_sentinel_becomes_line_break() {
        let h = harness();
        h.translator
            .relay_to_telegram("#-219689000", "first\\nsecond", false)
            .await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0].1, "first\nsecond");
    }

    #[tokio::test]
    async fn notice_is_rich_with_prefix() {
        let h = harness();
        h.translator
            .relay_to_telegram("#-219689000", "maintenance window", true)
            .await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0].1, "[Notice] maintenance window");
        assert!(sent[0].2);
    }

    #[tokio::test]
    async fn dm_requires_granted_permission() {
        let h = harness();
        h.roster.upsert("42", "alice", None, None, None).unwrap();

        // Unknown permission: dropped.
        h.translator.relay_to_telegram("alice", "psst", false).await;
        assert!(h.messenger.sent().is_empty());

        // Granted: sent, case-insensitively resolved.
        h.roster.upsert("42", "alice", None, None, Some(true)).unwrap();
        h.translator.relay_to_telegram("ALICE", "psst", false).await;
        assert_eq!(h.messenger.sent(), vec![(42, "psst".to_string(), false)]);
    }

    #[tokio::test]
    async fn unauthorized_send_revokes_dm_permission() {
        let mut messenger = FakeMessenger::new();
        messenger.refuse_sends = true;
        let h = harness_with(FeatureFlags::default(), messenger);
        h.roster.upsert("42", "alice", None, None, Some(true)).unwrap();

        h.translator.relay_to_telegram("alice", "psst", false).await;

        let (_, dm) = h.roster.resolve_handle("alice").unwrap();
        assert_eq!(dm, Some(false));
    }

    #[tokio::test]
    async fn at_signs_stripped_from_outgoing_text() {
        let h = harness(); // strip flag defaults on
        h.translator
            .relay_to_telegram("#-219689000", "ping @alice", false)
            .await;
        assert_eq!(h.messenger.sent()[0].1, "ping alice");
    }

    #[tokio::test]
    async fn forced_mentions_for_known_handles_in_scope() {
        let flags = FeatureFlags {
            force_convert_usernames_to_at_usernames: true,
            ..FeatureFlags::default()
        };
        let h = harness_with(flags, FakeMessenger::new());
        h.roster.upsert("42", "alice", Some("-219689000"), None, None).unwrap();
        h.roster.upsert("7", "bob", Some("-555"), None, None).unwrap();

        h.translator
            .relay_to_telegram("#-219689000", "alice bob hello", false)
            .await;

        // Only the handle known in this group's scope gets the marker.
        assert_eq!(h.messenger.sent()[0].1, "@alice bob hello");
    }

    #[test]
    fn mention_suffix_stripping() {
        assert_eq!(strip_mention_suffix("/start@bot"), "/start");
        assert_eq!(strip_mention_suffix("/me@bot waves"), "/me waves");
        assert_eq!(strip_mention_suffix("plain @text"), "plain @text");
    }
}
