//! Longest-phrase matching of user input against the command table.

use crate::table::CommandTable;
use std::cmp::Reverse;

/// A phrase selected for one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// The matched phrase, exactly as it appears in the table.
    pub key: String,
    /// Whatever followed the phrase, trimmed.
    pub args_text: String,
}

/// Resolve `text` against the phrases of `table`.
///
/// Returns `None` when no phrase matches; callers ignore such input.
pub fn resolve(text: &str, table: &CommandTable) -> Option<ResolvedCommand> {
    resolve_among(text, table.phrases())
}

/// Resolve `text` against an arbitrary set of phrases.
///
/// Phrases are tried longest first and the first valid prefix wins, so "ref list"
/// always shadows "ref" for input that starts with "ref list". A phrase only
/// matches at a word boundary: "ref" does not match "refresh".
pub fn resolve_among<'p>(
    text: &str,
    phrases: impl IntoIterator<Item = &'p str>,
) -> Option<ResolvedCommand> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut phrases: Vec<&str> = phrases.into_iter().filter(|p| !p.is_empty()).collect();
    phrases.sort_by_key(|p| Reverse(p.len()));

    phrases.into_iter().find_map(|phrase| {
        let rest = text.strip_prefix(phrase)?;
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        Some(ResolvedCommand {
            key: phrase.to_string(),
            args_text: rest.trim().to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CommandSpec;

    fn table(phrases: &[&str]) -> CommandTable {
        phrases.iter().fold(CommandTable::new(), |t, p| {
            t.with(*p, CommandSpec::new(format!("{}.py", p.replace(' ', "_"))))
        })
    }

    fn resolved(key: &str, args_text: &str) -> Option<ResolvedCommand> {
        Some(ResolvedCommand {
            key: key.to_string(),
            args_text: args_text.to_string(),
        })
    }

    #[test]
    fn exact_key_resolves_with_no_args() {
        let t = table(&["ref", "ref list", "makepdf", "backup now"]);
        for phrase in t.phrases() {
            assert_eq!(resolve(phrase, &t), resolved(phrase, ""), "{phrase}");
        }
    }

    #[test]
    fn longer_phrase_wins() {
        let t = table(&["ref", "ref list"]);
        assert_eq!(resolve("ref list", &t), resolved("ref list", ""));
        assert_eq!(resolve("ref list cpp", &t), resolved("ref list", "cpp"));
        assert_eq!(resolve("ref vector", &t), resolved("ref", "vector"));
    }

    #[test]
    fn empty_input_never_matches() {
        let t = table(&["ref"]);
        assert_eq!(resolve("", &t), None);
        assert_eq!(resolve("   ", &t), None);
    }

    #[test]
    fn unknown_input_is_none() {
        let t = table(&["ref", "makepdf"]);
        assert_eq!(resolve("weather today", &t), None);
        assert_eq!(resolve("re", &t), None);
    }

    #[test]
    fn phrase_must_end_at_word_boundary() {
        let t = table(&["ref"]);
        assert_eq!(resolve("refresh", &t), None);
        assert_eq!(resolve("ref\tsearch iterator", &t), resolved("ref", "search iterator"));
    }

    #[test]
    fn remainder_is_trimmed() {
        let t = table(&["makepdf"]);
        assert_eq!(
            resolve("  makepdf    notes   ", &t),
            resolved("makepdf", "notes")
        );
    }

    #[test]
    fn resolves_among_extra_phrases() {
        let t = table(&["ref"]);
        let phrases = t.phrases().chain(["help", "exit"]);
        assert_eq!(resolve_among("help", phrases), resolved("help", ""));
    }
}
