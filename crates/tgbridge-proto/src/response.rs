//! Numeric replies and wire-line construction.
//!
//! Only the numerics the bridge actually emits are defined; their code
//! assignments are part of the wire contract with the connected client.

use std::fmt;

/// Numeric replies emitted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Numeric {
    /// 001 - welcome message.
    RplWelcome = 1,
    /// 002 - host/version line.
    RplYourHost = 2,
    /// 003 - server creation date.
    RplCreated = 3,
    /// 004 - server name, version, user/channel modes.
    RplMyInfo = 4,
    /// 005 - ISUPPORT capability advertisement (one per token).
    RplIsupport = 5,
    /// 302 - userhost reply.
    RplUserhost = 302,
    /// 315 - end of WHO list.
    RplEndOfWho = 315,
    /// 324 - current channel modes.
    RplChannelModeIs = 324,
    /// 347 - end of channel invite exception list.
    RplEndOfInviteList = 347,
    /// 349 - end of channel exception list.
    RplEndOfExceptList = 349,
    /// 352 - WHO reply line.
    RplWhoReply = 352,
    /// 353 - NAMES reply line.
    RplNamReply = 353,
    /// 366 - end of NAMES list.
    RplEndOfNames = 366,
    /// 368 - end of channel ban list.
    RplEndOfBanList = 368,
    /// 375 - MOTD start (the bridge also sends its banner body as 375).
    RplMotdStart = 375,
    /// 376 - end of MOTD.
    RplEndOfMotd = 376,
    /// 482 - insufficient channel privilege.
    ErrChanOpPrivsNeeded = 482,
    /// 940 - end of channel spam-filter list.
    RplEndOfSpamFilterList = 940,
}

impl Numeric {
    /// The three-digit wire code.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// The `nick!user@host` source prefix of a client- or peer-originated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrefix {
    /// Nickname (for bridged Telegram users: optionally `@`-prefixed handle).
    pub nick: String,
    /// Username (for bridged Telegram users: the numeric user id).
    pub user: String,
    /// Host part (the bridge's server name for synthesized users).
    pub host: String,
}

impl UserPrefix {
    /// Build a prefix from its parts.
    pub fn new(
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for UserPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick, self.user, self.host)
    }
}

fn push_params(line: &mut String, params: &[&str], trailing: Option<&str>) {
    for p in params {
        line.push(' ');
        line.push_str(p);
    }
    if let Some(t) = trailing {
        line.push_str(" :");
        line.push_str(t);
    }
}

/// Build a server-prefixed numeric reply line.
///
/// `:server NNN nick [params...] [:trailing]`
pub fn numeric(
    server: &str,
    num: Numeric,
    nick: &str,
    params: &[&str],
    trailing: Option<&str>,
) -> String {
    let mut line = format!(":{server} {num} {nick}");
    push_params(&mut line, params, trailing);
    line
}

/// Build a server-prefixed non-numeric line (PONG, synthesized MODE, ...).
pub fn server_line(server: &str, command: &str, params: &[&str], trailing: Option<&str>) -> String {
    let mut line = format!(":{server} {command}");
    push_params(&mut line, params, trailing);
    line
}

/// Build a user-prefixed line (self-echoes and synthesized JOIN/PRIVMSG).
pub fn user_line(
    prefix: &UserPrefix,
    command: &str,
    params: &[&str],
    trailing: Option<&str>,
) -> String {
    let mut line = format!(":{prefix} {command}");
    push_params(&mut line, params, trailing);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_match_wire_contract() {
        assert_eq!(Numeric::RplWelcome.code(), 1);
        assert_eq!(Numeric::RplUserhost.code(), 302);
        assert_eq!(Numeric::RplEndOfWho.code(), 315);
        assert_eq!(Numeric::RplChannelModeIs.code(), 324);
        assert_eq!(Numeric::RplEndOfInviteList.code(), 347);
        assert_eq!(Numeric::RplEndOfExceptList.code(), 349);
        assert_eq!(Numeric::RplWhoReply.code(), 352);
        assert_eq!(Numeric::RplNamReply.code(), 353);
        assert_eq!(Numeric::RplEndOfNames.code(), 366);
        assert_eq!(Numeric::RplEndOfBanList.code(), 368);
        assert_eq!(Numeric::ErrChanOpPrivsNeeded.code(), 482);
        assert_eq!(Numeric::RplEndOfSpamFilterList.code(), 940);
    }

    #[test]
    fn numeric_is_zero_padded() {
        assert_eq!(Numeric::RplWelcome.to_string(), "001");
        assert_eq!(Numeric::RplIsupport.to_string(), "005");
        assert_eq!(Numeric::RplEndOfSpamFilterList.to_string(), "940");
    }

    #[test]
    fn numeric_line_shape() {
        let line = numeric(
            "telegram.irc.bridge",
            Numeric::RplEndOfNames,
            "bob",
            &["#-219689000"],
            Some("End of /NAMES list."),
        );
        assert_eq!(
            line,
            ":telegram.irc.bridge 366 bob #-219689000 :End of /NAMES list."
        );
    }

    #[test]
    fn server_line_shape() {
        let line = server_line(
            "telegram.irc.bridge",
            "PONG",
            &["telegram.irc.bridge"],
            Some("token"),
        );
        assert_eq!(line, ":telegram.irc.bridge PONG telegram.irc.bridge :token");
    }

    #[test]
    fn user_line_shape() {
        let prefix = UserPrefix::new("alice", "12345", "telegram.irc.bridge");
        let line = user_line(&prefix, "JOIN", &[], Some("#-1"));
        assert_eq!(line, ":alice!12345@telegram.irc.bridge JOIN :#-1");
    }
}
