//! Commit message assembly
//!
//! Turns a completed set of answers into the final message. Everything here is
//! a pure function of the answers and the resolved configuration.

use crate::config::Config;
use crate::questions::{AnswerKey, Answers};
use crate::ticket;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use textwrap::{Options, WordSeparator, WordSplitter, WrapAlgorithm};

pub const BREAKING_CHANGE_PREFIX: &str = "BREAKING CHANGE: ";
pub const NO_CI_MARKER: &str = "[no ci]";

/// Where the ticket reference goes in the header.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TicketPlacement {
    /// `sc-1 feat(ui): subject`
    #[strum(to_string = "pre-type", serialize = "before-type")]
    #[serde(alias = "before-type")]
    PreType,
    /// `feat(ui): sc-1 subject`
    #[default]
    #[strum(to_string = "pre-description", serialize = "before-description")]
    #[serde(alias = "before-description")]
    PreDescription,
    /// `feat(ui): subject sc-1`
    #[strum(to_string = "post-description", serialize = "after-description")]
    #[serde(alias = "after-description")]
    PostDescription,
}

impl TicketPlacement {
    /// Parse a placement name; anything unrecognised means `pre-description`.
    pub fn parse_or_default(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }
}

/// `(scope)`, or nothing for a missing or blank scope.
pub fn scope_block(scope: Option<&str>) -> String {
    match scope.map(str::trim).filter(|s| !s.is_empty()) {
        Some(scope) => format!("({scope})"),
        None => String::new(),
    }
}

/// ` {prepend}{ticket}{append} ` with the surrounding spaces, or an empty
/// string when there is no real ticket.
pub fn decorate_ticket(ticket: Option<&str>, config: &Config) -> String {
    if ticket::is_empty(ticket, &config.ticket_prefix) {
        return String::new();
    }
    format!(
        " {}{}{} ",
        config.ticket_prepend,
        ticket.unwrap_or_default().trim(),
        config.ticket_append
    )
}

/// Lay out the header for `placement`. `decorated` is the output of
/// [`decorate_ticket`].
pub fn place_ticket(
    placement: TicketPlacement,
    change_type: &str,
    scope: &str,
    decorated: &str,
    subject: &str,
) -> String {
    match placement {
        TicketPlacement::PreType => {
            format!("{}{change_type}{scope}: {subject}", decorated.trim_start())
        }
        TicketPlacement::PreDescription => {
            format!("{change_type}{scope}: {}{subject}", decorated.trim_start())
        }
        TicketPlacement::PostDescription => {
            format!("{change_type}{scope}: {subject}{}", decorated.trim_end())
        }
    }
}

/// The fixed part of the header shown beside the subject while it is typed:
/// `type(scope):` followed by the decorated ticket, if any.
pub fn subject_label(answers: &Answers, config: &Config) -> String {
    let change_type = answers.text(AnswerKey::Type).unwrap_or_default();
    let scope = scope_block(answers.text(AnswerKey::Scope));
    let ticket = decorate_ticket(answers.text(AnswerKey::Ticket), config);
    format!("{change_type}{scope}:{}", ticket.trim_end())
}

/// The header line.
pub fn header(answers: &Answers, config: &Config) -> String {
    place_ticket(
        config.ticket_placement,
        answers.text(AnswerKey::Type).unwrap_or_default(),
        &scope_block(answers.text(AnswerKey::Scope)),
        &decorate_ticket(answers.text(AnswerKey::Ticket), config),
        answers.text(AnswerKey::Subject).unwrap_or_default(),
    )
}

/// Wrap free text at `width` columns without splitting words. Existing line
/// breaks, blank lines included, are kept and trailing whitespace is dropped
/// from every line.
pub fn wrap_block(text: &str, width: usize) -> String {
    let options = Options::new(width.max(1))
        .break_words(false)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .wrap_algorithm(WrapAlgorithm::FirstFit);

    textwrap::wrap(text.trim_end(), &options)
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix a breaking-change description with `BREAKING CHANGE: `, exactly once.
pub fn breaking_text(description: &str) -> Option<String> {
    let mut rest = description.trim();
    while let Some(stripped) = rest.strip_prefix(BREAKING_CHANGE_PREFIX) {
        rest = stripped.trim_start();
    }
    if rest.is_empty() {
        return None;
    }
    Some(format!("{BREAKING_CHANGE_PREFIX}{rest}"))
}

/// Shortcut story link for the answered ticket, when an organization is set.
pub fn ticket_url(answers: &Answers, config: &Config) -> Option<String> {
    let organization = config.ticket_organization.as_deref()?.trim();
    if organization.is_empty() {
        return None;
    }
    let reference = answers.text(AnswerKey::Ticket);
    if ticket::is_empty(reference, &config.ticket_prefix) {
        return None;
    }
    ticket::story_url(organization, reference?.trim())
}

/// Build the complete commit message.
///
/// Blocks, in order: header, body, `[no ci]`, breaking change, issues, story
/// link. Absent blocks are skipped and the rest joined by one blank line.
pub fn assemble(answers: &Answers, config: &Config) -> String {
    let width = config.max_line_width;

    let body = answers
        .text(AnswerKey::Body)
        .map(|body| wrap_block(body, width));
    let no_ci = answers
        .flag(AnswerKey::NoCi)
        .then(|| NO_CI_MARKER.to_string());
    let breaking = answers
        .text(AnswerKey::Breaking)
        .and_then(breaking_text)
        .map(|text| wrap_block(&text, width));
    let issues = answers
        .text(AnswerKey::Issues)
        .map(|issues| wrap_block(issues, width));

    [
        Some(header(answers, config)),
        body,
        no_ci,
        breaking,
        issues,
        ticket_url(answers, config),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n\n")
}
