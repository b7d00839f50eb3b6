//! Escape and wildcard handling for literal text.
//!
//! `$` is the escape character. It protects the characters that would otherwise
//! be read as syntax (`( ) , [ ] : -` and space), the wildcards `*` and `?`, and
//! itself. An escaped wildcard is kept in its doubled form (`**`, `??`) so the
//! compiler can tell it apart from a real wildcard.

/// The escape character.
pub const ESCAPE_CHAR: char = '$';

/// Characters that are unescaped to themselves.
pub const ESCAPED_REGULAR_CHARS: [char; 8] = ['(', ')', ',', '[', ']', ':', '-', ' '];

/// Multi-character wildcard.
pub const MULTI_WILDCARD_CHAR: char = '*';

/// Single-character wildcard.
pub const SINGLE_WILDCARD_CHAR: char = '?';

/// Representation of an escaped `*` after resolution.
pub const ESCAPED_MULTI_WILDCARD: &str = "**";

/// Representation of an escaped `?` after resolution.
pub const ESCAPED_SINGLE_WILDCARD: &str = "??";

// Stands in for `$$` while the wildcard escapes are rewritten.
const ESCAPE_PLACEHOLDER: &str = "\u{0}ESC\u{0}";

/// Returns true if `c` may follow the escape character.
pub fn is_escapable(c: char) -> bool {
    c == ESCAPE_CHAR
        || c == MULTI_WILDCARD_CHAR
        || c == SINGLE_WILDCARD_CHAR
        || ESCAPED_REGULAR_CHARS.contains(&c)
}

/// Resolve escape sequences in raw literal text.
///
/// The steps run in a fixed order so that `$$` is never unescaped twice:
/// protect `$$`, rewrite `$*`/`$?` to their doubled forms, restore `$`, then
/// unescape the regular characters.
pub fn resolve_escapes(input: &str) -> String {
    tracing::trace!(input, "resolving escapes");

    let mut resolved = input.replace("$$", ESCAPE_PLACEHOLDER);
    resolved = resolved
        .replace("$*", ESCAPED_MULTI_WILDCARD)
        .replace("$?", ESCAPED_SINGLE_WILDCARD);
    resolved = resolved.replace(ESCAPE_PLACEHOLDER, "$");

    for c in ESCAPED_REGULAR_CHARS {
        let mut escaped = String::with_capacity(2);
        escaped.push(ESCAPE_CHAR);
        escaped.push(c);
        resolved = resolved.replace(&escaped, &c.to_string());
    }

    tracing::trace!(resolved = %resolved, "escapes resolved");
    resolved
}

/// Returns true if resolved text holds any wildcard marker, escaped or not.
pub fn contains_wildcard(resolved: &str) -> bool {
    resolved.contains(MULTI_WILDCARD_CHAR) || resolved.contains(SINGLE_WILDCARD_CHAR)
}

/// Wrap resolved text as `*text*` unless a wildcard is already present.
pub fn contains_wrap(resolved: String) -> String {
    if contains_wildcard(&resolved) {
        resolved
    } else {
        format!("{MULTI_WILDCARD_CHAR}{resolved}{MULTI_WILDCARD_CHAR}")
    }
}

/// Inverse of [`resolve_escapes`]: render resolved text so it reads back unchanged.
pub fn escape_text(resolved: &str) -> String {
    let mut out = String::with_capacity(resolved.len());
    let mut chars = resolved.chars().peekable();
    while let Some(c) = chars.next() {
        let doubled_wildcard = (c == MULTI_WILDCARD_CHAR || c == SINGLE_WILDCARD_CHAR)
            && chars.peek() == Some(&c);
        if doubled_wildcard {
            chars.next();
            out.push(ESCAPE_CHAR);
            out.push(c);
        } else if c == ESCAPE_CHAR || ESCAPED_REGULAR_CHARS.contains(&c) {
            out.push(ESCAPE_CHAR);
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_escapes_are_doubled() {
        assert_eq!(resolve_escapes("K$*soL$?p?"), "K**soL??p?");
    }

    #[test]
    fn text_without_escapes_is_unchanged() {
        let text = "plain text-with:chars";
        assert_eq!(resolve_escapes(text), text);
        assert_eq!(resolve_escapes(&resolve_escapes(text)), text);
    }

    #[test]
    fn regular_characters_are_unescaped() {
        assert_eq!(resolve_escapes("value$ 1"), "value 1");
        assert_eq!(resolve_escapes("a$(b$)$,$[c$]$:d$-e"), "a(b),[c]:d-e");
    }

    #[test]
    fn double_escape_survives_as_single_dollar() {
        // `$$$*` is an escaped `$` followed by an escaped `*`.
        assert_eq!(resolve_escapes("$$$*Noah$$$?$$"), "$**Noah$??$");
        assert_eq!(resolve_escapes("price$$"), "price$");
    }

    #[test]
    fn wrap_only_without_wildcards() {
        assert_eq!(contains_wrap("port".to_string()), "*port*");
        assert_eq!(contains_wrap("*port".to_string()), "*port");
        assert_eq!(contains_wrap("value**".to_string()), "value**");
        assert_eq!(contains_wrap("p?rt".to_string()), "p?rt");
    }

    #[test]
    fn escape_text_reverses_resolution() {
        for raw in ["K$*soL$?p?", "a$(b$)$,$[c$]$:d$-e", "$$$*Noah$$$?$$", "value$ 1", "*port*"] {
            let resolved = resolve_escapes(raw);
            assert_eq!(resolve_escapes(&escape_text(&resolved)), resolved, "{raw}");
        }
        assert_eq!(escape_text("value**"), "value$*");
        assert_eq!(escape_text("John Smith"), "John$ Smith");
    }

    #[test]
    fn escapable_set() {
        for c in ['$', '*', '?', '(', ')', ',', '[', ']', ':', '-', ' '] {
            assert!(is_escapable(c), "{c} should be escapable");
        }
        assert!(!is_escapable('a'));
        assert!(!is_escapable('.'));
    }
}
