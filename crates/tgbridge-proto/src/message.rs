//! Tokenized protocol lines.
//!
//! A decoded line is split on single spaces and handed to the dispatcher
//! unmodified. Trailing `:`-prefixed multi-word parameters are reassembled
//! by the individual command handlers via [`TokenLine::trailing`], not here.

/// A non-empty protocol line split into space-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLine {
    tokens: Vec<String>,
}

impl TokenLine {
    /// Tokenize a decoded line. Returns `None` for an empty line.
    ///
    /// Splitting is on single spaces, so doubled spaces produce empty
    /// tokens; handlers see exactly what was on the wire.
    pub fn parse(line: &str) -> Option<Self> {
        if line.is_empty() {
            return None;
        }
        Some(Self {
            tokens: line.split(' ').map(str::to_string).collect(),
        })
    }

    /// The command word (first token).
    pub fn command(&self) -> &str {
        &self.tokens[0]
    }

    /// Positional argument `i` (zero-based, after the command word).
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.tokens.get(i + 1).map(String::as_str)
    }

    /// All tokens including the command word.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Reassemble the trailing parameter starting at token index `from`
    /// (counting the command word as index 0), stripping one leading `:`.
    ///
    /// Returns `None` when the line has no token at that index.
    pub fn trailing(&self, from: usize) -> Option<String> {
        if from >= self.tokens.len() {
            return None;
        }
        let joined = self.tokens[from..].join(" ");
        Some(match joined.strip_prefix(':') {
            Some(rest) => rest.to_string(),
            None => joined,
        })
    }

    /// The original line, rejoined. Used for verbatim echoes and logging.
    pub fn raw(&self) -> String {
        self.tokens.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_is_none() {
        assert!(TokenLine::parse("").is_none());
    }

    #[test]
    fn parse_splits_on_single_spaces() {
        let line = TokenLine::parse("PRIVMSG #chan :hello  world").unwrap();
        assert_eq!(line.command(), "PRIVMSG");
        assert_eq!(line.arg(0), Some("#chan"));
        assert_eq!(line.arg(1), Some(":hello"));
        // Doubled space produces an empty token, preserved as-is.
        assert_eq!(line.tokens().len(), 5);
    }

    #[test]
    fn trailing_reassembles_and_strips_colon() {
        let line = TokenLine::parse("USER u 0 * :Real Name").unwrap();
        assert_eq!(line.trailing(4), Some("Real Name".to_string()));
    }

    #[test]
    fn trailing_without_colon() {
        let line = TokenLine::parse("PING abc def").unwrap();
        assert_eq!(line.trailing(1), Some("abc def".to_string()));
    }

    #[test]
    fn trailing_out_of_range() {
        let line = TokenLine::parse("QUIT").unwrap();
        assert_eq!(line.trailing(1), None);
    }

    #[test]
    fn raw_roundtrips() {
        let line = TokenLine::parse("MODE nick +i").unwrap();
        assert_eq!(line.raw(), "MODE nick +i");
    }
}
