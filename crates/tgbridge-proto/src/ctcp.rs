//! CTCP ACTION framing.
//!
//! ACTION is the only CTCP command the bridge translates: Telegram `/me`
//! text becomes a `\x01ACTION ...\x01` message body and vice versa.
//! Everything else passes through as plain text.
//!
//! Reference: <https://modern.ircdocs.horse/ctcp.html>

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// Frame `text` as a CTCP ACTION message body.
pub fn action(text: &str) -> String {
    format!("{CTCP_DELIM}ACTION {text}{CTCP_DELIM}")
}

/// Extract the payload of a CTCP ACTION message body.
///
/// Tolerates a missing trailing delimiter (some clients omit it) and is
/// case-insensitive on the command word. Returns `None` for anything that
/// is not an ACTION.
pub fn parse_action(body: &str) -> Option<&str> {
    let inner = body.strip_prefix(CTCP_DELIM)?;
    let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);

    let rest = match inner.split_once(' ') {
        Some((cmd, rest)) if cmd.eq_ignore_ascii_case("ACTION") => rest,
        _ => return None,
    };
    Some(rest)
}

/// Whether a message body starts a CTCP frame.
#[inline]
pub fn is_ctcp(body: &str) -> bool {
    body.starts_with(CTCP_DELIM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_action() {
        assert_eq!(action("jumps"), "\x01ACTION jumps\x01");
    }

    #[test]
    fn parse_framed_action() {
        assert_eq!(parse_action("\x01ACTION jumps\x01"), Some("jumps"));
    }

    #[test]
    fn parse_missing_trailing_delim() {
        assert_eq!(parse_action("\x01ACTION waves"), Some("waves"));
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(parse_action("\x01action waves\x01"), Some("waves"));
    }

    #[test]
    fn parse_rejects_other_ctcp() {
        assert_eq!(parse_action("\x01VERSION\x01"), None);
        assert_eq!(parse_action("\x01PING 123\x01"), None);
    }

    #[test]
    fn parse_rejects_plain_text() {
        assert_eq!(parse_action("hello world"), None);
        assert_eq!(parse_action(""), None);
    }

    #[test]
    fn roundtrip() {
        assert_eq!(parse_action(&action("does a thing")), Some("does a thing"));
    }

    #[test]
    fn is_ctcp_checks_prefix() {
        assert!(is_ctcp("\x01ACTION x\x01"));
        assert!(!is_ctcp("plain"));
    }
}
