//! Ticket references (`PREFIX-1234`)
//!
//! Grammar checks, branch-name extraction, case normalization and the
//! Shortcut story URL for a reference.

use crate::log_debug;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum_macros::{Display, EnumString};
use url::Url;

const SHORTCUT_APP_URL: &str = "https://app.shortcut.com/";

/// A complete reference, anchored on both ends.
static TICKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+-[0-9]+$").expect("ticket pattern is a valid regex")
});

/// A reference at the start of the haystack, used while scanning branch names.
static TICKET_PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+-[0-9]+").expect("ticket prefix pattern is a valid regex")
});

/// How a ticket reference is cased before it is stored.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TicketCase {
    #[default]
    Lower,
    Upper,
    Preserve,
}

impl TicketCase {
    pub fn apply(self, ticket: &str) -> String {
        match self {
            Self::Lower => ticket.to_lowercase(),
            Self::Upper => ticket.to_uppercase(),
            Self::Preserve => ticket.to_string(),
        }
    }
}

/// Check a complete answer against the `<PREFIX>-<digits>` grammar.
pub fn is_valid(ticket: &str) -> bool {
    TICKET_PATTERN.is_match(ticket)
}

/// The placeholder offered when nothing could be taken from the branch, e.g. `SC-`.
pub fn skeleton(prefix: &str) -> String {
    format!("{prefix}-")
}

/// A ticket counts as empty when missing, blank, or still the bare prefix skeleton.
pub fn is_empty(ticket: Option<&str>, prefix: &str) -> bool {
    match ticket.map(str::trim) {
        None | Some("") => true,
        Some(t) => t.eq_ignore_ascii_case(&skeleton(prefix)),
    }
}

/// Find the first ticket reference embedded in a branch name.
///
/// A match may only start at the beginning of an alphanumeric token: the
/// preceding character must not be alphanumeric, and must not be a hyphen that
/// itself follows an alphanumeric character. The leftmost such start where the
/// pattern matches wins, taking the longest digit run. So `abc-def-123` yields
/// nothing, while `feature/sc-123-login` yields `sc-123`.
pub fn extract_from_branch(branch: &str) -> Option<String> {
    let chars: Vec<(usize, char)> = branch.char_indices().collect();

    for (pos, &(byte_idx, c)) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() || !is_token_start(&chars, pos) {
            continue;
        }
        if let Some(found) = TICKET_PREFIX_PATTERN.find(&branch[byte_idx..]) {
            log_debug!("Ticket reference found in branch '{}': {}", branch, found.as_str());
            return Some(found.as_str().to_string());
        }
    }

    None
}

fn is_token_start(chars: &[(usize, char)], pos: usize) -> bool {
    let Some(prev_pos) = pos.checked_sub(1) else {
        return true;
    };
    let prev = chars[prev_pos].1;
    if prev.is_ascii_alphanumeric() {
        return false;
    }
    if prev == '-'
        && let Some(before) = prev_pos.checked_sub(1)
        && chars[before].1.is_ascii_alphanumeric()
    {
        return false;
    }
    true
}

/// The story number at the end of a reference (`sc-42` -> `42`).
pub fn numeric_suffix(ticket: &str) -> Option<&str> {
    let (_, digits) = ticket.rsplit_once('-')?;
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

/// Build the Shortcut story URL for a reference within an organization.
///
/// The organization is inserted as a single path segment, so anything unusual
/// in it is percent-encoded rather than altering the path.
pub fn story_url(organization: &str, ticket: &str) -> Option<String> {
    let number = numeric_suffix(ticket)?;
    let mut url = Url::parse(SHORTCUT_APP_URL).ok()?;
    url.path_segments_mut()
        .ok()?
        .clear()
        .extend([organization, "story", number]);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar() {
        assert!(is_valid("sc-42"));
        assert!(is_valid("SC-1234"));
        assert!(is_valid("abc123-9"));
        assert!(!is_valid("sc-"));
        assert!(!is_valid("-42"));
        assert!(!is_valid("sc-42a"));
        assert!(!is_valid("sc 42"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_extract_simple_branch() {
        assert_eq!(extract_from_branch("sc-123"), Some("sc-123".to_string()));
        assert_eq!(
            extract_from_branch("feature/sc-123-add-login"),
            Some("sc-123".to_string())
        );
        assert_eq!(
            extract_from_branch("jane/SC-77/fix"),
            Some("SC-77".to_string())
        );
    }

    #[test]
    fn test_extract_no_match() {
        assert_eq!(extract_from_branch(""), None);
        assert_eq!(extract_from_branch("main"), None);
        assert_eq!(extract_from_branch("feature/add-login"), None);
    }

    #[test]
    fn test_extract_skips_runs_inside_longer_prefix() {
        // "def-123" is glued to "abc-" so it is not a token start
        assert_eq!(extract_from_branch("abc-def-123"), None);
        assert_eq!(extract_from_branch("abc-def-123/sc-5"), Some("sc-5".to_string()));
    }

    #[test]
    fn test_extract_multiple_runs_takes_leftmost() {
        assert_eq!(
            extract_from_branch("sc-12-34-retry"),
            Some("sc-12".to_string())
        );
        assert_eq!(
            extract_from_branch("fix/sc-1_sc-2"),
            Some("sc-1".to_string())
        );
        assert_eq!(
            extract_from_branch("release/v2-0/sc-99"),
            Some("v2-0".to_string())
        );
    }

    #[test]
    fn test_empty_ticket() {
        assert!(is_empty(None, "SC"));
        assert!(is_empty(Some(""), "SC"));
        assert!(is_empty(Some("SC-"), "SC"));
        assert!(is_empty(Some("sc-"), "SC"));
        assert!(!is_empty(Some("sc-1"), "SC"));
    }

    #[test]
    fn test_case_normalization() {
        assert_eq!(TicketCase::Lower.apply("SC-12"), "sc-12");
        assert_eq!(TicketCase::Upper.apply("sc-12"), "SC-12");
        assert_eq!(TicketCase::Preserve.apply("Sc-12"), "Sc-12");
        assert_eq!("UPPER".parse::<TicketCase>().ok(), Some(TicketCase::Upper));
    }

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("ab-12"), Some("12"));
        assert_eq!(numeric_suffix("ab-"), None);
        assert_eq!(numeric_suffix("ab12"), None);
    }

    #[test]
    fn test_story_url() {
        assert_eq!(
            story_url("acme", "ab-12").as_deref(),
            Some("https://app.shortcut.com/acme/story/12")
        );
        assert_eq!(story_url("acme", "ab-"), None);
    }
}
