//! PING, USER, NICK, and QUIT handling, plus the greeting burst.

use super::{Context, Dispatch};
use crate::error::BridgeError;
use crate::translate::SERVER_NAME;
use tgbridge_proto::response::{self, Numeric};
use tgbridge_proto::TokenLine;
use tracing::{debug, info};

const BRIDGE_VERSION: &str = concat!("tgbridged-v", env!("CARGO_PKG_VERSION"));

/// ISUPPORT tokens advertised to the client, one 005 line each.
///
/// These describe the bridge's actual (narrow) capabilities; clients should
/// not expect more than one channel or target per command.
const ISUPPORT_TOKENS: &[&str] = &[
    "AWAYLEN=200",
    "CASEMAPPING=rfc1459",
    "CHANMODES=,,,imnrst",
    "CHANNELLEN=32",
    "CHANTYPES=#",
    "CHARSET=utf-8",
    "KICKLEN=40",
    "MAXBANS=1",
    "MAXCHANNELS=1",
    "MAXPARA=1",
    "MAXTARGETS=1",
    "MODES=1",
    "NAMESX",
    "NETWORK=Telegram",
    "NICKLEN=32",
    "PREFIX=(Yqaohv)!~&@%+",
    "UHNAMES",
];

/// Banner lines, sent as repeated 375s. The Telegram API throttles around
/// 20 messages per minute, so the rules line is not just flavour.
const MOTD_BANNER: &[&str] = &[
    "Bridge to Telegram.",
    "Rules: Do not spam. Maximum 20 messages per minute.",
    "Other rules up to interpretation by Telegram itself.",
];

pub(super) async fn ping(ctx: &Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let rest = line.trailing(1).unwrap_or_default();
    ctx.write(response::server_line(
        SERVER_NAME,
        "PONG",
        &[SERVER_NAME],
        Some(&rest),
    ))
    .await
}

pub(super) async fn user(ctx: &mut Context<'_>, line: &TokenLine) -> Result<Dispatch, BridgeError> {
    let (Some(username), Some(host)) = (line.arg(0), line.arg(2)) else {
        debug!(line = %line.raw(), "Malformed USER line, ignoring");
        return Ok(Dispatch::Handled);
    };
    let realname = line.trailing(4).unwrap_or_default();
    info!("Client attempting login");
    ctx.session.set_user(username, host, &realname);
    maybe_welcome(ctx).await
}

pub(super) async fn nick(ctx: &mut Context<'_>, line: &TokenLine) -> Result<Dispatch, BridgeError> {
    let Some(nick) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed NICK line, ignoring");
        return Ok(Dispatch::Handled);
    };
    ctx.session.set_nick(nick);
    info!(nick, "Client set nick");
    maybe_welcome(ctx).await
}

pub(super) fn quit(line: &TokenLine) {
    // The socket closing is what actually ends the session.
    info!(reason = ?line.trailing(1), "Client announced quit");
}

async fn maybe_welcome(ctx: &mut Context<'_>) -> Result<Dispatch, BridgeError> {
    if !ctx.session.try_welcome() {
        return Ok(Dispatch::Handled);
    }
    send_greeting(ctx).await?;
    info!("Client connected and logged in successfully");
    Ok(Dispatch::Welcomed)
}

/// The full greeting burst: 001-004, one 005 per capability token, the
/// 375/376 banner, and the 302 userhost confirmation.
async fn send_greeting(ctx: &Context<'_>) -> Result<(), BridgeError> {
    let nick = ctx.session.nick().to_string();
    let user = ctx.session.user().to_string();
    let host = ctx.session.host().to_string();

    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplWelcome,
        &nick,
        &[],
        Some(&format!(
            "Welcome to the Telegram IRC bridge {nick}!{user}@{host}"
        )),
    ))
    .await?;
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplYourHost,
        &nick,
        &[],
        Some(&format!("Your host is {SERVER_NAME}, running {BRIDGE_VERSION}")),
    ))
    .await?;
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplCreated,
        &nick,
        &[],
        Some(&format!(
            "This server was created {}",
            chrono::Utc::now().to_rfc2822()
        )),
    ))
    .await?;
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplMyInfo,
        &nick,
        &["Telegram", BRIDGE_VERSION, "Biwxs", "Yqaohvrnmtsi"],
        None,
    ))
    .await?;

    for token in ISUPPORT_TOKENS {
        ctx.write(response::numeric(
            SERVER_NAME,
            Numeric::RplIsupport,
            &nick,
            &[token],
            Some("are supported by this server"),
        ))
        .await?;
    }

    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplMotdStart,
        &nick,
        &[],
        Some(&format!("{SERVER_NAME} message of the day")),
    ))
    .await?;
    for banner in MOTD_BANNER {
        ctx.write(response::numeric(
            SERVER_NAME,
            Numeric::RplMotdStart,
            &nick,
            &[],
            Some(&format!("- {banner}")),
        ))
        .await?;
    }
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplEndOfMotd,
        &nick,
        &[],
        Some("End of message of the day."),
    ))
    .await?;

    // Confirm the hostmask so the client knows what we think it is.
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplUserhost,
        &nick,
        &[],
        Some(&format!("{nick}=+{user}@{host}")),
    ))
    .await
}
