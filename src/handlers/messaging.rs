//! PRIVMSG and NOTICE: the outbound half of the bridge.

use super::Context;
use crate::error::BridgeError;
use tgbridge_proto::TokenLine;
use tracing::{debug, info};

/// Route a client message through the translator's outbound path.
///
/// Unroutable targets are dropped inside the translator with a log line;
/// the client never receives an error reply.
pub(super) async fn relay(
    ctx: &mut Context<'_>,
    line: &TokenLine,
    notice: bool,
) -> Result<(), BridgeError> {
    let Some(target) = line.arg(0) else {
        debug!(line = %line.raw(), "Message without target, ignoring");
        return Ok(());
    };
    let Some(body) = line.trailing(2) else {
        debug!(line = %line.raw(), "Message without text, ignoring");
        return Ok(());
    };

    info!(
        target,
        notice,
        from = %ctx.session.nick(),
        "Relaying client message"
    );
    ctx.translator.relay_to_telegram(target, &body, notice).await;
    Ok(())
}
