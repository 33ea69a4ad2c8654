//! Decides when a string scalar may be written plain.

use crate::node::ScalarKind;
use crate::parse_scalars::resolve_plain;

/// Where a scalar is written; flow collections and keys reserve more characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScalarContext {
    BlockValue,
    BlockKey,
    Flow,
}

/// Returns true if `s` reads back as the same string when written plain.
///
/// Strings that would resolve to another kind (`true`, `12`, `null`,
/// `2001-12-14`, and also the YAML 1.1 spellings `yes`/`off`) must be quoted.
#[inline]
pub(crate) fn is_plain_safe(s: &str, context: ScalarContext) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if first.is_whitespace() || s.ends_with(char::is_whitespace) {
        return false;
    }
    if matches!(
        first,
        '-' | '?'
            | ':'
            | '['
            | ']'
            | '{'
            | '}'
            | ','
            | '#'
            | '&'
            | '*'
            | '!'
            | '|'
            | '>'
            | '\''
            | '"'
            | '%'
            | '@'
            | '`'
    ) {
        return false;
    }
    if s.chars().any(|c| c.is_control() || c == '\u{FEFF}') {
        return false;
    }
    // Colon followed by space starts a value; space followed by hash starts a comment.
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    match context {
        ScalarContext::BlockValue => {}
        ScalarContext::BlockKey => {
            if s.contains(':') || s.contains('#') {
                return false;
            }
        }
        ScalarContext::Flow => {
            if s.contains([',', '[', ']', '{', '}', ':', '#']) {
                return false;
            }
        }
    }
    resolve_plain(s, true) == ScalarKind::Str
}

/// Returns true if the string contains single quotes, backslashes, or control
/// characters that need escape processing.
#[inline]
pub(crate) fn needs_double_quotes(s: &str) -> bool {
    s.chars().any(|c| c == '\'' || c == '\\' || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings() {
        for s in ["hello", "hello world", "a-b", "x:y", "C++", "über"] {
            assert!(is_plain_safe(s, ScalarContext::BlockValue), "{s}");
        }
    }

    #[test]
    fn strings_that_look_like_other_kinds_are_quoted() {
        for s in [
            "", "true", "False", "yes", "off", "~", "null", "12", "-3", "1.5", ".inf", ".NaN",
            "0x1F", "2001-12-14", "2001-12-14t21:59:43.10-05:00",
        ] {
            assert!(!is_plain_safe(s, ScalarContext::BlockValue), "{s}");
        }
    }

    #[test]
    fn structural_characters_are_quoted() {
        for s in ["- item", "a: b", "a #b", "key:", " lead", "trail ", "*ref", "!tag", "line\nbreak"] {
            assert!(!is_plain_safe(s, ScalarContext::BlockValue), "{s}");
        }
        assert!(is_plain_safe("a,b", ScalarContext::BlockValue));
        assert!(!is_plain_safe("a,b", ScalarContext::Flow));
        assert!(!is_plain_safe("x:y", ScalarContext::BlockKey));
    }
}
