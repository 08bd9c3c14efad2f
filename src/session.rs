//! The single IRC client's session: registration state machine and
//! joined-channel set.
//!
//! One session exists per process lifetime. It is created when the client
//! connects, driven through `Unregistered -> Registering -> Welcomed` by
//! USER/NICK, and dies with the socket.

/// Registration progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegState {
    /// Nothing received yet.
    Unregistered,
    /// USER seen, greeting not yet sent.
    Registering,
    /// Greeting sent; terminal.
    Welcomed,
}

/// The connected client's identity and channel membership.
#[derive(Debug, Default)]
pub struct Session {
    user: Option<String>,
    nick: Option<String>,
    realname: Option<String>,
    host: Option<String>,
    welcomed: bool,
    /// Ordered; JOIN may append duplicates, PART removes all occurrences.
    channels: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current registration state.
    pub fn state(&self) -> RegState {
        if self.welcomed {
            RegState::Welcomed
        } else if self.user.is_some() {
            RegState::Registering
        } else {
            RegState::Unregistered
        }
    }

    /// Apply a USER command. Valid at any state; after welcome it only
    /// updates the stored fields.
    pub fn set_user(&mut self, user: &str, host: &str, realname: &str) {
        self.user = Some(user.to_string());
        self.host = Some(host.to_string());
        self.realname = Some(realname.to_string());
    }

    /// Apply a NICK command. Valid at any state.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick = Some(nick.to_string());
    }

    /// Attempt the welcome transition.
    ///
    /// Returns true exactly once: when both nick and user are set and the
    /// greeting has not fired yet. Callers send the greeting burst and
    /// start the Telegram subscription on a true return.
    pub fn try_welcome(&mut self) -> bool {
        if self.welcomed || self.nick.is_none() || self.user.is_none() {
            return false;
        }
        self.welcomed = true;
        true
    }

    pub fn welcomed(&self) -> bool {
        self.welcomed
    }

    /// Nickname, or `*` before one is set (placeholder in replies).
    pub fn nick(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or("*")
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or("")
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("*")
    }

    /// Add a channel to the joined set.
    pub fn join(&mut self, channel: &str) {
        self.channels.push(channel.to_string());
    }

    /// Remove all occurrences of a channel from the joined set.
    pub fn part(&mut self, channel: &str) {
        self.channels.retain(|c| c != channel);
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unregistered() {
        let session = Session::new();
        assert_eq!(session.state(), RegState::Unregistered);
        assert_eq!(session.nick(), "*");
    }

    #[test]
    fn user_then_nick_welcomes_once() {
        let mut session = Session::new();

        session.set_user("u", "*", "Real Name");
        assert_eq!(session.state(), RegState::Registering);
        assert!(!session.try_welcome());

        session.set_nick("bob");
        assert!(session.try_welcome());
        assert_eq!(session.state(), RegState::Welcomed);

        // Replaying the login sequence never re-triggers the greeting.
        session.set_user("u", "*", "Real Name");
        session.set_nick("bob");
        assert!(!session.try_welcome());
    }

    #[test]
    fn nick_then_user_welcomes_too() {
        let mut session = Session::new();
        session.set_nick("bob");
        assert!(!session.try_welcome());
        session.set_user("u", "*", "rn");
        assert!(session.try_welcome());
    }

    #[test]
    fn late_nick_change_updates_field_only() {
        let mut session = Session::new();
        session.set_user("u", "*", "rn");
        session.set_nick("bob");
        assert!(session.try_welcome());

        session.set_nick("carol");
        assert_eq!(session.nick(), "carol");
        assert!(session.welcomed());
    }

    #[test]
    fn part_removes_all_occurrences() {
        let mut session = Session::new();
        session.join("#-1");
        session.join("#-2");
        session.join("#-1");

        session.part("#-1");
        assert_eq!(session.channels(), ["#-2".to_string()]);
    }
}
