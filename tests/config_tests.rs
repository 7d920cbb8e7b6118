use anyhow::Result;
use cz_shortcut::config::{Config, PROJECT_CONFIG_FILENAME};
use cz_shortcut::message::TicketPlacement;
use cz_shortcut::ticket::TicketCase;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults_without_any_source() -> Result<()> {
    let config = Config::load_from(None, None, no_env)?;
    assert_eq!(config, Config::default());
    assert_eq!(config.max_header_width, 72);
    assert_eq!(config.max_line_width, 100);
    assert!(config.ticket_mode);
    assert!(config.skip_scope);
    Ok(())
}

#[test]
fn test_project_file_overrides_user_file() -> Result<()> {
    let user_dir = TempDir::new()?;
    let repo_dir = TempDir::new()?;
    let user_config = user_dir.path().join("config.toml");

    fs::write(
        &user_config,
        r#"
ticket_prefix = "CH"
ticket_organization = "acme"
max_line_width = 80
"#,
    )?;
    fs::write(
        repo_dir.path().join(PROJECT_CONFIG_FILENAME),
        r#"
ticket_prefix = "SC"
ticket_placement = "after-description"
scopes = ["api", "cli"]

[[types]]
key = "feat"
description = "A new feature"

[[types]]
key = "fix"
description = "A bug fix"
"#,
    )?;

    let config = Config::load_from(Some(&user_config), Some(repo_dir.path()), no_env)?;
    assert_eq!(config.ticket_prefix, "SC");
    assert_eq!(config.ticket_organization.as_deref(), Some("acme"));
    assert_eq!(config.max_line_width, 80);
    assert_eq!(config.ticket_placement, TicketPlacement::PostDescription);
    assert_eq!(config.scopes, vec!["api".to_string(), "cli".to_string()]);
    assert_eq!(config.types.len(), 2);
    Ok(())
}

#[test]
fn test_environment_wins_over_files() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(
        repo_dir.path().join(PROJECT_CONFIG_FILENAME),
        "ticket_mode = true\nmax_header_width = 60\n",
    )?;

    let env = env_from(&[
        ("CZ_SHORTCUT_MODE", "false"),
        ("CZ_MAX_HEADER_WIDTH", "50"),
        ("CZ_SHORTCUT_CASE", "upper"),
        ("CZ_SHORTCUT_LOCATION", "pre-type"),
        ("CZ_TYPE", "fix"),
        ("CZ_SCOPE", ""),
    ]);
    let config = Config::load_from(None, Some(repo_dir.path()), env)?;

    assert!(!config.ticket_mode);
    assert_eq!(config.max_header_width, 50);
    assert_eq!(config.ticket_case, TicketCase::Upper);
    assert_eq!(config.ticket_placement, TicketPlacement::PreType);
    assert_eq!(config.default_type.as_deref(), Some("fix"));
    assert_eq!(config.default_scope, None);
    Ok(())
}

#[test]
fn test_unknown_values_fall_back_to_defaults() -> Result<()> {
    let env = env_from(&[
        ("CZ_SHORTCUT_LOCATION", "sideways"),
        ("CZ_SHORTCUT_CASE", "title"),
        ("CZ_MAX_LINE_WIDTH", "zero"),
        ("CZ_SKIP_SCOPE", "yes"),
    ]);
    let config = Config::load_from(None, None, env)?;

    assert_eq!(config.ticket_placement, TicketPlacement::PreDescription);
    assert_eq!(config.ticket_case, TicketCase::Lower);
    assert_eq!(config.max_line_width, 100);
    // only the literal "true" enables a flag
    assert!(!config.skip_scope);
    Ok(())
}

#[test]
fn test_commitlint_sets_header_width() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(
        repo_dir.path().join(".commitlintrc.json"),
        r#"{ "rules": { "header-max-length": [2, "always", 64] } }"#,
    )?;

    let config = Config::load_from(None, Some(repo_dir.path()), no_env)?;
    assert_eq!(config.max_header_width, 64);
    Ok(())
}

#[test]
fn test_explicit_width_beats_commitlint() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(
        repo_dir.path().join(".commitlintrc.json"),
        r#"{ "rules": { "header-max-length": [2, "always", 64] } }"#,
    )?;

    let env = env_from(&[("CZ_MAX_HEADER_WIDTH", "90")]);
    let config = Config::load_from(None, Some(repo_dir.path()), env)?;
    assert_eq!(config.max_header_width, 90);
    Ok(())
}

#[test]
fn test_broken_commitlint_file_is_ignored() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(repo_dir.path().join(".commitlintrc.json"), "{ not json")?;

    let config = Config::load_from(None, Some(repo_dir.path()), no_env)?;
    assert_eq!(config.max_header_width, 72);
    Ok(())
}

#[test]
fn test_malformed_project_file_is_an_error() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(
        repo_dir.path().join(PROJECT_CONFIG_FILENAME),
        "max_header_width = \"wide\"\n",
    )?;

    let err = Config::load_from(None, Some(repo_dir.path()), no_env)
        .expect_err("a malformed file must fail");
    assert!(err.to_string().contains("Invalid configuration file format"));
    Ok(())
}

#[test]
fn test_duplicate_types_are_rejected() -> Result<()> {
    let repo_dir = TempDir::new()?;
    fs::write(
        repo_dir.path().join(PROJECT_CONFIG_FILENAME),
        r#"
[[types]]
key = "feat"
description = "A new feature"

[[types]]
key = "feat"
description = "Again"
"#,
    )?;

    let err = Config::load_from(None, Some(repo_dir.path()), no_env)
        .expect_err("duplicates must fail");
    assert!(err.to_string().contains("more than once"));
    Ok(())
}
