use crate::commitlint;
use crate::git::GitRepo;
use crate::log_debug;
use crate::message::TicketPlacement;
use crate::ticket::TicketCase;

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Project configuration filename, looked up at the repository root
pub const PROJECT_CONFIG_FILENAME: &str = ".czshortcut.toml";

/// One selectable change type
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChangeType {
    pub key: String,
    pub description: String,
}

impl ChangeType {
    pub fn new(key: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
        }
    }
}

/// The conventional change types offered when nothing else is configured
pub fn default_types() -> Vec<ChangeType> {
    [
        ("feat", "A new feature"),
        ("fix", "A bug fix"),
        ("docs", "Documentation only changes"),
        (
            "style",
            "Changes that do not affect the meaning of the code (white-space, formatting, missing semi-colons, etc)",
        ),
        (
            "refactor",
            "A code change that neither fixes a bug nor adds a feature",
        ),
        ("perf", "A code change that improves performance"),
        ("test", "Adding missing tests or correcting existing tests"),
        (
            "build",
            "Changes that affect the build system or external dependencies (example scopes: gulp, broccoli, npm)",
        ),
        (
            "ci",
            "Changes to our CI configuration files and scripts (example scopes: Travis, Circle, BrowserStack, SauceLabs)",
        ),
        (
            "chore",
            "Other changes that don't modify src or test files",
        ),
        ("revert", "Reverts a previous commit"),
    ]
    .into_iter()
    .map(|(key, description)| ChangeType::new(key, description))
    .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Change type keys must not be empty")]
    EmptyTypeKey,
    #[error("Change type `{0}` has no description")]
    EmptyTypeDescription(String),
    #[error("Change type `{0}` is defined more than once")]
    DuplicateType(String),
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration file format in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Fully resolved configuration, immutable once the flow starts
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub types: Vec<ChangeType>,
    /// Allowed scopes; empty means free text
    pub scopes: Vec<String>,
    /// Ask for a Shortcut story reference
    pub ticket_mode: bool,
    pub skip_scope: bool,
    pub max_header_width: usize,
    pub min_header_width: usize,
    pub max_line_width: usize,
    pub ticket_prefix: String,
    pub ticket_optional: bool,
    pub ticket_placement: TicketPlacement,
    pub ticket_prepend: String,
    pub ticket_append: String,
    pub ticket_organization: Option<String>,
    pub ticket_case: TicketCase,
    pub default_type: Option<String>,
    pub default_scope: Option<String>,
    pub default_subject: Option<String>,
    pub default_body: Option<String>,
    pub default_issues: Option<String>,
    /// Whether a file or the environment set the header width
    #[serde(skip)]
    pub header_width_explicit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            types: default_types(),
            scopes: Vec::new(),
            ticket_mode: true,
            skip_scope: true,
            max_header_width: 72,
            min_header_width: 2,
            max_line_width: 100,
            ticket_prefix: "SC".to_string(),
            ticket_optional: false,
            ticket_placement: TicketPlacement::PreDescription,
            ticket_prepend: String::new(),
            ticket_append: String::new(),
            ticket_organization: None,
            ticket_case: TicketCase::Lower,
            default_type: None,
            default_scope: None,
            default_subject: None,
            default_body: None,
            default_issues: None,
            header_width_explicit: false,
        }
    }
}

/// One configuration source. Every field is optional; unset fields defer to
/// lower layers.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigLayer {
    pub types: Option<Vec<ChangeType>>,
    pub scopes: Option<Vec<String>>,
    pub ticket_mode: Option<bool>,
    pub skip_scope: Option<bool>,
    pub max_header_width: Option<usize>,
    pub min_header_width: Option<usize>,
    pub max_line_width: Option<usize>,
    pub ticket_prefix: Option<String>,
    pub ticket_optional: Option<bool>,
    pub ticket_placement: Option<String>,
    pub ticket_prepend: Option<String>,
    pub ticket_append: Option<String>,
    pub ticket_organization: Option<String>,
    pub ticket_case: Option<String>,
    pub default_type: Option<String>,
    pub default_scope: Option<String>,
    pub default_subject: Option<String>,
    pub default_body: Option<String>,
    pub default_issues: Option<String>,
}

fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.is_empty())
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env_string(lookup, key).map(|value| value == "true")
}

fn env_width(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    env_string(lookup, key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&width| width > 0)
}

impl ConfigLayer {
    /// Read the `CZ_*` variables through `lookup`.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            types: None,
            scopes: None,
            ticket_mode: env_bool(&lookup, "CZ_SHORTCUT_MODE"),
            skip_scope: env_bool(&lookup, "CZ_SKIP_SCOPE"),
            max_header_width: env_width(&lookup, "CZ_MAX_HEADER_WIDTH"),
            min_header_width: env_width(&lookup, "CZ_MIN_HEADER_WIDTH"),
            max_line_width: env_width(&lookup, "CZ_MAX_LINE_WIDTH"),
            ticket_prefix: env_string(&lookup, "CZ_SHORTCUT_PREFIX"),
            ticket_optional: env_bool(&lookup, "CZ_SHORTCUT_OPTIONAL"),
            ticket_placement: env_string(&lookup, "CZ_SHORTCUT_LOCATION"),
            ticket_prepend: env_string(&lookup, "CZ_SHORTCUT_PREPEND"),
            ticket_append: env_string(&lookup, "CZ_SHORTCUT_APPEND"),
            ticket_organization: env_string(&lookup, "CZ_SHORTCUT_ORGANIZATION"),
            ticket_case: env_string(&lookup, "CZ_SHORTCUT_CASE"),
            default_type: env_string(&lookup, "CZ_TYPE"),
            default_scope: env_string(&lookup, "CZ_SCOPE"),
            default_subject: env_string(&lookup, "CZ_SUBJECT"),
            default_body: env_string(&lookup, "CZ_BODY"),
            default_issues: env_string(&lookup, "CZ_ISSUES"),
        }
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Load a TOML layer. A missing file is not an error.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            log_debug!("No config file at {:?}", path);
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log_debug!("Loaded config file {:?}", path);
        Self::from_toml(&content, path).map(Some)
    }

    /// Combine with a higher-precedence layer; its set fields win.
    pub fn overlay(self, higher: Self) -> Self {
        Self {
            types: higher.types.or(self.types),
            scopes: higher.scopes.or(self.scopes),
            ticket_mode: higher.ticket_mode.or(self.ticket_mode),
            skip_scope: higher.skip_scope.or(self.skip_scope),
            max_header_width: higher.max_header_width.or(self.max_header_width),
            min_header_width: higher.min_header_width.or(self.min_header_width),
            max_line_width: higher.max_line_width.or(self.max_line_width),
            ticket_prefix: higher.ticket_prefix.or(self.ticket_prefix),
            ticket_optional: higher.ticket_optional.or(self.ticket_optional),
            ticket_placement: higher.ticket_placement.or(self.ticket_placement),
            ticket_prepend: higher.ticket_prepend.or(self.ticket_prepend),
            ticket_append: higher.ticket_append.or(self.ticket_append),
            ticket_organization: higher.ticket_organization.or(self.ticket_organization),
            ticket_case: higher.ticket_case.or(self.ticket_case),
            default_type: higher.default_type.or(self.default_type),
            default_scope: higher.default_scope.or(self.default_scope),
            default_subject: higher.default_subject.or(self.default_subject),
            default_body: higher.default_body.or(self.default_body),
            default_issues: higher.default_issues.or(self.default_issues),
        }
    }
}

impl Config {
    /// Merge `layers` (lowest precedence first) over the built-in defaults.
    pub fn resolve(layers: impl IntoIterator<Item = ConfigLayer>) -> Result<Self, ConfigError> {
        let merged = layers
            .into_iter()
            .fold(ConfigLayer::default(), ConfigLayer::overlay);
        let defaults = Self::default();

        let ticket_case = match merged.ticket_case.as_deref() {
            Some(case) => case.trim().parse().unwrap_or_else(|_| {
                log_debug!("Unknown ticket case '{}', using lowercase", case);
                defaults.ticket_case
            }),
            None => defaults.ticket_case,
        };

        let config = Self {
            types: merged.types.unwrap_or(defaults.types),
            scopes: merged.scopes.unwrap_or(defaults.scopes),
            ticket_mode: merged.ticket_mode.unwrap_or(defaults.ticket_mode),
            skip_scope: merged.skip_scope.unwrap_or(defaults.skip_scope),
            header_width_explicit: merged.max_header_width.is_some(),
            max_header_width: merged.max_header_width.unwrap_or(defaults.max_header_width),
            min_header_width: merged.min_header_width.unwrap_or(defaults.min_header_width),
            max_line_width: merged.max_line_width.unwrap_or(defaults.max_line_width),
            ticket_prefix: merged.ticket_prefix.unwrap_or(defaults.ticket_prefix),
            ticket_optional: merged.ticket_optional.unwrap_or(defaults.ticket_optional),
            ticket_placement: merged
                .ticket_placement
                .as_deref()
                .map_or(defaults.ticket_placement, TicketPlacement::parse_or_default),
            ticket_prepend: merged.ticket_prepend.unwrap_or(defaults.ticket_prepend),
            ticket_append: merged.ticket_append.unwrap_or(defaults.ticket_append),
            ticket_organization: merged.ticket_organization,
            ticket_case,
            default_type: merged.default_type,
            default_scope: merged.default_scope,
            default_subject: merged.default_subject,
            default_body: merged.default_body,
            default_issues: merged.default_issues,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the change-type table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for change_type in &self.types {
            let key = change_type.key.trim();
            if key.is_empty() {
                return Err(ConfigError::EmptyTypeKey);
            }
            if change_type.description.trim().is_empty() {
                return Err(ConfigError::EmptyTypeDescription(key.to_string()));
            }
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateType(key.to_string()));
            }
        }
        Ok(())
    }

    /// Take the header width from lint rules unless it was set explicitly.
    pub fn apply_lint_header_width(&mut self, width: usize) {
        if self.header_width_explicit || width == 0 {
            return;
        }
        log_debug!("Using header-max-length {} from commitlint rules", width);
        self.max_header_width = width;
    }

    /// Load the configuration: defaults, then the personal file, the project
    /// file and finally the environment.
    pub fn load() -> Result<Self> {
        let repo_root = GitRepo::repo_root().ok();
        Self::load_from(
            Self::get_config_path().as_deref(),
            repo_root.as_deref(),
            |key| env::var(key).ok(),
        )
    }

    /// [`Config::load`] with every source passed in.
    pub fn load_from(
        user_config: Option<&Path>,
        repo_root: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut layers = Vec::new();

        if let Some(path) = user_config
            && let Some(layer) = ConfigLayer::from_file(path)?
        {
            layers.push(layer);
        }

        if let Some(root) = repo_root
            && let Some(layer) = ConfigLayer::from_file(&root.join(PROJECT_CONFIG_FILENAME))?
        {
            layers.push(layer);
        }

        layers.push(ConfigLayer::from_env(lookup));

        let mut config = Self::resolve(layers)?;

        if let Some(root) = repo_root
            && let Some(width) = commitlint::header_max_length(root)
        {
            config.apply_lint_header_width(width);
        }

        log_debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Get the path to the personal configuration file
    fn get_config_path() -> Option<PathBuf> {
        let mut path = config_dir()?;
        path.push("cz-shortcut");
        path.push("config.toml");
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(Vec::<ConfigLayer>::new()).expect("defaults resolve");
        assert_eq!(config, Config::default());
        assert!(config.ticket_mode);
        assert!(config.skip_scope);
        assert_eq!(config.max_header_width, 72);
        assert_eq!(config.types.len(), 11);
        assert!(!config.header_width_explicit);
    }

    #[test]
    fn test_env_booleans_need_literal_true() {
        let layer = ConfigLayer::from_env(env_of(&[
            ("CZ_SHORTCUT_MODE", "false"),
            ("CZ_SKIP_SCOPE", "yes"),
            ("CZ_SHORTCUT_OPTIONAL", "true"),
        ]));
        assert_eq!(layer.ticket_mode, Some(false));
        assert_eq!(layer.skip_scope, Some(false));
        assert_eq!(layer.ticket_optional, Some(true));
    }

    #[test]
    fn test_env_widths_fall_through_when_invalid() {
        let layer = ConfigLayer::from_env(env_of(&[
            ("CZ_MAX_HEADER_WIDTH", "abc"),
            ("CZ_MIN_HEADER_WIDTH", "0"),
            ("CZ_MAX_LINE_WIDTH", "80"),
        ]));
        assert_eq!(layer.max_header_width, None);
        assert_eq!(layer.min_header_width, None);
        assert_eq!(layer.max_line_width, Some(80));
    }

    #[test]
    fn test_empty_env_strings_are_unset() {
        let layer = ConfigLayer::from_env(env_of(&[("CZ_SHORTCUT_PREFIX", "")]));
        assert_eq!(layer.ticket_prefix, None);
    }

    #[test]
    fn test_higher_layers_win() {
        let file = ConfigLayer {
            max_header_width: Some(50),
            ticket_prefix: Some("CH".to_string()),
            ..ConfigLayer::default()
        };
        let env = ConfigLayer {
            ticket_prefix: Some("AB".to_string()),
            ..ConfigLayer::default()
        };
        let config = Config::resolve([file, env]).expect("resolve");
        assert_eq!(config.max_header_width, 50);
        assert!(config.header_width_explicit);
        assert_eq!(config.ticket_prefix, "AB");
    }

    #[test]
    fn test_unknown_placement_and_case_fall_back() {
        let layer = ConfigLayer {
            ticket_placement: Some("middle".to_string()),
            ticket_case: Some("title".to_string()),
            ..ConfigLayer::default()
        };
        let config = Config::resolve([layer]).expect("resolve");
        assert_eq!(config.ticket_placement, TicketPlacement::PreDescription);
        assert_eq!(config.ticket_case, TicketCase::Lower);
    }

    #[test]
    fn test_duplicate_types_are_rejected() {
        let layer = ConfigLayer {
            types: Some(vec![
                ChangeType::new("feat", "A"),
                ChangeType::new("feat", "B"),
            ]),
            ..ConfigLayer::default()
        };
        assert!(matches!(
            Config::resolve([layer]),
            Err(ConfigError::DuplicateType(key)) if key == "feat"
        ));
    }

    #[test]
    fn test_empty_type_fields_are_rejected() {
        let no_key = ConfigLayer {
            types: Some(vec![ChangeType::new(" ", "A")]),
            ..ConfigLayer::default()
        };
        assert!(matches!(
            Config::resolve([no_key]),
            Err(ConfigError::EmptyTypeKey)
        ));

        let no_description = ConfigLayer {
            types: Some(vec![ChangeType::new("feat", "")]),
            ..ConfigLayer::default()
        };
        assert!(matches!(
            Config::resolve([no_description]),
            Err(ConfigError::EmptyTypeDescription(_))
        ));
    }

    #[test]
    fn test_lint_width_only_when_not_explicit() {
        let mut config = Config::default();
        config.apply_lint_header_width(100);
        assert_eq!(config.max_header_width, 100);

        let mut explicit = Config {
            header_width_explicit: true,
            ..Config::default()
        };
        explicit.apply_lint_header_width(100);
        assert_eq!(explicit.max_header_width, 72);
    }

    #[test]
    fn test_toml_layer() {
        let content = r#"
ticket_mode = false
scopes = ["api", "ui"]
ticket_placement = "after-description"

[[types]]
key = "feat"
description = "A new feature"
"#;
        let layer = ConfigLayer::from_toml(content, Path::new("inline.toml")).expect("parse");
        let config = Config::resolve([layer]).expect("resolve");
        assert!(!config.ticket_mode);
        assert_eq!(config.scopes, vec!["api", "ui"]);
        assert_eq!(config.ticket_placement, TicketPlacement::PostDescription);
        assert_eq!(config.types, vec![ChangeType::new("feat", "A new feature")]);
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let err = ConfigLayer::from_toml("ticket_mode = ", Path::new("broken.toml"))
            .expect_err("must fail");
        assert!(err.to_string().contains("broken.toml"));
    }
}
