//! Inbound IRC command dispatch.
//!
//! Each decoded line is parsed into a [`CommandTag`] and routed through the
//! handler table. Handlers get the session, the roster, and the writer
//! queue; anything unrecognized is logged and silently ignored - the bridge
//! never sends an error reply for unsupported input.

mod channel;
mod connection;
mod messaging;

use crate::cache::Roster;
use crate::config::FeatureFlags;
use crate::error::BridgeError;
use crate::session::Session;
use crate::translate::Translator;
use std::sync::Arc;
use tgbridge_proto::TokenLine;
use tokio::sync::mpsc;
use tracing::info;

/// Commands the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    Ping,
    User,
    Nick,
    Join,
    Part,
    Names,
    Who,
    Mode,
    Privmsg,
    Notice,
    Kick,
    Remove,
    Quit,
}

impl CommandTag {
    /// Parse a command word, case-insensitively.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "PING" => Some(Self::Ping),
            "USER" => Some(Self::User),
            "NICK" => Some(Self::Nick),
            "JOIN" => Some(Self::Join),
            "PART" => Some(Self::Part),
            "NAMES" => Some(Self::Names),
            "WHO" => Some(Self::Who),
            "MODE" => Some(Self::Mode),
            "PRIVMSG" => Some(Self::Privmsg),
            "NOTICE" => Some(Self::Notice),
            "KICK" => Some(Self::Kick),
            "REMOVE" => Some(Self::Remove),
            "QUIT" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// What dispatching a line did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handled (or deliberately ignored); nothing for the caller to do.
    Handled,
    /// The welcome transition fired. Happens at most once per process; the
    /// connection loop starts the Telegram event pump on seeing this.
    Welcomed,
}

/// Everything a handler may touch.
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub roster: &'a Arc<Roster>,
    pub flags: FeatureFlags,
    pub writer: &'a mpsc::Sender<String>,
    pub translator: &'a Translator,
}

impl Context<'_> {
    /// Queue a line for the writer task.
    pub(crate) async fn write(&self, line: String) -> Result<(), BridgeError> {
        self.writer
            .send(line)
            .await
            .map_err(|_| BridgeError::WriterClosed)
    }
}

/// Dispatch one tokenized line against the current session state.
pub async fn dispatch(ctx: &mut Context<'_>, line: &TokenLine) -> Result<Dispatch, BridgeError> {
    let Some(tag) = CommandTag::parse(line.command()) else {
        info!(line = %line.raw(), "Unhandled input");
        return Ok(Dispatch::Handled);
    };

    match tag {
        CommandTag::Ping => connection::ping(ctx, line).await?,
        CommandTag::User => return connection::user(ctx, line).await,
        CommandTag::Nick => return connection::nick(ctx, line).await,
        CommandTag::Quit => connection::quit(line),
        CommandTag::Join => channel::join(ctx, line).await?,
        CommandTag::Part => channel::part(ctx, line).await?,
        CommandTag::Names => channel::names(ctx, line).await?,
        CommandTag::Who => channel::who(ctx, line).await?,
        CommandTag::Mode => channel::mode(ctx, line).await?,
        CommandTag::Kick | CommandTag::Remove => channel::deny_kick(ctx, line).await?,
        CommandTag::Privmsg => messaging::relay(ctx, line, false).await?,
        CommandTag::Notice => messaging::relay(ctx, line, true).await?,
    }
    Ok(Dispatch::Handled)
}
