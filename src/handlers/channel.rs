//! Pseudo-channel commands: JOIN, PART, NAMES, WHO, MODE, KICK/REMOVE.
//!
//! Pseudo-channels are synthesized from Telegram group ids (`#-219689000`).
//! Membership listings come from the roster; the bridge never grants real
//! channel privileges, so every mutation attempt is denied.

use super::Context;
use crate::error::BridgeError;
use crate::translate::SERVER_NAME;
use tgbridge_proto::response::{self, Numeric, UserPrefix};
use tgbridge_proto::TokenLine;
use tracing::{debug, info, warn};

/// The client's own prefix on bridge-synthesized echoes.
fn self_prefix(ctx: &Context<'_>) -> UserPrefix {
    UserPrefix::new(ctx.session.nick(), ctx.session.user(), SERVER_NAME)
}

pub(super) async fn join(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let Some(list) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed JOIN line, ignoring");
        return Ok(());
    };
    let channels: Vec<String> = list.split(',').map(str::to_string).collect();

    for channel in channels {
        if channel.is_empty() {
            continue;
        }
        ctx.session.join(&channel);
        let prefix = self_prefix(ctx);
        ctx.write(response::user_line(&prefix, "JOIN", &[], Some(&channel)))
            .await?;
        info!(channel, "Client joining pseudo-channel");
        send_names(ctx, &channel).await?;
    }
    Ok(())
}

pub(super) async fn names(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let Some(channel) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed NAMES line, ignoring");
        return Ok(());
    };
    let channel = channel.to_string();
    send_names(ctx, &channel).await
}

/// 353/366 listing for one channel, built from the group record. Falls back
/// to a listing of just the client when the group has never been observed.
async fn send_names(ctx: &Context<'_>, channel: &str) -> Result<(), BridgeError> {
    let nick = ctx.session.nick().to_string();
    let group_id = channel.trim_start_matches('#');

    let mut listed = nick.clone();
    match ctx.roster.group_members(group_id) {
        Some(members) => {
            for member in members {
                listed.push(' ');
                if member.admin == Some(true) {
                    listed.push('@');
                }
                listed.push_str(ctx.flags.handle_prefix());
                listed.push_str(&member.handle);
            }
        }
        None => {
            warn!(group_id, "Group cache empty, NAMES lists only the client");
        }
    }

    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplNamReply,
        &nick,
        &["@", channel],
        Some(&listed),
    ))
    .await?;
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplEndOfNames,
        &nick,
        &[channel],
        Some("End of /NAMES list."),
    ))
    .await
}

pub(super) async fn who(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let Some(channel) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed WHO line, ignoring");
        return Ok(());
    };
    let channel = channel.to_string();
    let nick = ctx.session.nick().to_string();
    let user = ctx.session.user().to_string();
    let host = ctx.session.host().to_string();
    let realname = ctx.session.realname().to_string();
    let group_id = channel.trim_start_matches('#');

    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplWhoReply,
        &nick,
        &[&channel, &user, &host, SERVER_NAME, &nick, "H"],
        Some(&format!("0 {realname}")),
    ))
    .await?;

    match ctx.roster.group_members(group_id) {
        Some(members) => {
            for member in members {
                let flags = if member.admin == Some(true) { "H@" } else { "H+" };
                let shown = format!("{}{}", ctx.flags.handle_prefix(), member.handle);
                ctx.write(response::numeric(
                    SERVER_NAME,
                    Numeric::RplWhoReply,
                    &nick,
                    &[&channel, &member.user_id, SERVER_NAME, SERVER_NAME, &shown, flags],
                    Some("0 TelegramUser"),
                ))
                .await?;
            }
        }
        None => {
            warn!(group_id, "Group cache empty, WHO lists only the client");
        }
    }

    info!(channel, "Client requested member list of pseudo-channel");
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::RplEndOfWho,
        &nick,
        &[&channel],
        Some("End of /WHO list."),
    ))
    .await
}

pub(super) async fn part(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let Some(channel) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed PART line, ignoring");
        return Ok(());
    };
    let channel = channel.to_string();
    let reason = line.trailing(2).unwrap_or_default();

    ctx.session.part(&channel);
    let prefix = self_prefix(ctx);
    ctx.write(response::user_line(&prefix, "PART", &[&channel], Some(&reason)))
        .await
}

pub(super) async fn mode(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let Some(target) = line.arg(0) else {
        debug!(line = %line.raw(), "Malformed MODE line, ignoring");
        return Ok(());
    };
    let target = target.to_string();
    let nick = ctx.session.nick().to_string();

    if target.starts_with('#') {
        // Empty-list queries get their list-end numeric; anything else is a
        // privilege the client does not have.
        let list_end = match line.arg(1) {
            Some("+b") => Some((Numeric::RplEndOfBanList, "End of channel ban list")),
            Some("+e") => Some((Numeric::RplEndOfExceptList, "End of channel exception list")),
            Some("+I") => Some((
                Numeric::RplEndOfInviteList,
                "End of channel invite exception list",
            )),
            Some("+g") => Some((
                Numeric::RplEndOfSpamFilterList,
                "End of channel spamfilter list",
            )),
            _ => None,
        };

        match list_end {
            Some((numeric, text)) if line.tokens().len() == 3 => {
                info!(channel = %target, query = ?line.arg(1), "Sent empty channel list");
                ctx.write(response::numeric(SERVER_NAME, numeric, &nick, &[&target], Some(text)))
                    .await?;
            }
            _ => {
                info!(channel = %target, "Denied mode change");
                ctx.write(response::numeric(
                    SERVER_NAME,
                    Numeric::ErrChanOpPrivsNeeded,
                    &nick,
                    &[&target],
                    Some("You must have channel halfop access or above to set channel mode"),
                ))
                .await?;
            }
        }

        // The current-modes line always follows, whatever was asked.
        ctx.write(response::numeric(
            SERVER_NAME,
            Numeric::RplChannelModeIs,
            &nick,
            &[&target, "+nts"],
            None,
        ))
        .await
    } else if target == nick {
        // Self-mode set: echo it back verbatim.
        let prefix = UserPrefix::new(&nick, ctx.session.user(), ctx.session.host());
        info!(modes = ?line.arg(1), "Client set modes on themself");
        ctx.write(format!(":{prefix} {}", line.raw())).await
    } else {
        info!(line = %line.raw(), "Client tried to set modes on another user, ignoring");
        Ok(())
    }
}

/// KICK and REMOVE: the bridge cannot remove anyone from a Telegram group.
pub(super) async fn deny_kick(ctx: &mut Context<'_>, line: &TokenLine) -> Result<(), BridgeError> {
    let channel = line.arg(0).unwrap_or("*").to_string();
    let nick = ctx.session.nick().to_string();
    info!(
        channel,
        target = ?line.arg(1),
        "Client tried to kick a user, denying"
    );
    ctx.write(response::numeric(
        SERVER_NAME,
        Numeric::ErrChanOpPrivsNeeded,
        &nick,
        &[&channel],
        Some("You must be a channel half-operator to kick users."),
    ))
    .await
}
