//! Best-effort reading of commitlint rules
//!
//! Only `header-max-length` is of interest. Every failure is logged and
//! treated as "no rule".

use crate::{log_debug, log_warn};

use serde_json::Value;
use std::fs;
use std::path::Path;

/// Files checked at the repository root, in order.
pub const COMMITLINT_FILES: [&str; 3] = [
    ".commitlintrc.json",
    ".commitlintrc",
    "commitlint.config.json",
];

/// The header length limit from the first readable commitlint file under `root`.
pub fn header_max_length(root: &Path) -> Option<usize> {
    for name in COMMITLINT_FILES {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(content) => {
                let width = parse_header_max_length(&content);
                log_debug!("commitlint rules from {:?}: header-max-length {:?}", path, width);
                return width;
            }
            Err(e) => log_warn!("Failed to read {:?}: {}", path, e),
        }
    }
    None
}

/// Extract `rules["header-max-length"][2]` from a commitlint JSON document.
///
/// The rule is `[level, applicability, value]`; anything shorter, or a
/// non-numeric value, yields `None`.
pub fn parse_header_max_length(content: &str) -> Option<usize> {
    let document: Value = match serde_json::from_str(content) {
        Ok(document) => document,
        Err(e) => {
            log_warn!("Ignoring unparsable commitlint config: {}", e);
            return None;
        }
    };

    let rule = document.get("rules")?.get("header-max-length")?.as_array()?;
    if rule.len() < 3 {
        return None;
    }
    rule[2]
        .as_u64()
        .and_then(|width| usize::try_from(width).ok())
        .filter(|&width| width > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rule_value() {
        let json = r#"{"rules": {"header-max-length": [2, "always", 100]}}"#;
        assert_eq!(parse_header_max_length(json), Some(100));
    }

    #[test]
    fn test_short_or_odd_rules_are_ignored() {
        assert_eq!(
            parse_header_max_length(r#"{"rules": {"header-max-length": [2, "always"]}}"#),
            None
        );
        assert_eq!(
            parse_header_max_length(r#"{"rules": {"header-max-length": [2, "always", "wide"]}}"#),
            None
        );
        assert_eq!(parse_header_max_length(r#"{"extends": ["x"]}"#), None);
        assert_eq!(parse_header_max_length("not json"), None);
    }

    #[test]
    fn test_missing_files_yield_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(header_max_length(dir.path()), None);

        fs::write(
            dir.path().join(".commitlintrc"),
            r#"{"rules": {"header-max-length": [2, "always", 88]}}"#,
        )
        .expect("write rules");
        assert_eq!(header_max_length(dir.path()), Some(88));
    }
}
