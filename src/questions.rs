//! The commit question flow
//!
//! Questions are asked strictly in order. Whether a question is asked, and what
//! it offers as default, is a pure function of the answers given so far.

use crate::config::{ChangeType, Config};
use crate::log_debug;
use crate::message;
use crate::prompt::{LIMITED_INPUT, LimitedInputOptions, PromptError, Prompter, input_budget};
use crate::text;
use crate::ticket;

use std::collections::BTreeMap;
use std::fmt;
use strum_macros::Display;

/// Names under which answers are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "camelCase")]
pub enum AnswerKey {
    Type,
    Ticket,
    Scope,
    Subject,
    Body,
    IsBreaking,
    BreakingConfirmed,
    Breaking,
    NoCi,
    IsIssueAffected,
    IssuesBody,
    Issues,
    DoCommit,
}

impl AnswerKey {
    /// Yes/no questions record flags, everything else records text.
    pub fn is_flag(self) -> bool {
        matches!(
            self,
            Self::IsBreaking
                | Self::BreakingConfirmed
                | Self::NoCi
                | Self::IsIssueAffected
                | Self::DoCommit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Text(String),
    Flag(bool),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Question `{0}` was already answered")]
    AlreadyAnswered(AnswerKey),
    #[error("Answer for `{0}` has the wrong type")]
    TypeMismatch(AnswerKey),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Answers collected so far. Each key can be recorded once and never changes
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    values: BTreeMap<AnswerKey, AnswerValue>,
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: AnswerKey, value: AnswerValue) -> Result<(), FlowError> {
        if key.is_flag() != value.as_flag().is_some() {
            return Err(FlowError::TypeMismatch(key));
        }
        if self.values.contains_key(&key) {
            return Err(FlowError::AlreadyAnswered(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Chaining form of [`Answers::record`].
    pub fn with(mut self, key: AnswerKey, value: impl Into<AnswerValue>) -> Result<Self, FlowError> {
        self.record(key, value.into())?;
        Ok(self)
    }

    pub fn get(&self, key: AnswerKey) -> Option<&AnswerValue> {
        self.values.get(&key)
    }

    pub fn is_answered(&self, key: AnswerKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Text answer, `None` when unanswered or blank.
    pub fn text(&self, key: AnswerKey) -> Option<&str> {
        self.get(key)
            .and_then(AnswerValue::as_text)
            .filter(|text| !text.trim().is_empty())
    }

    /// Flag answer, `false` when unanswered.
    pub fn flag(&self, key: AnswerKey) -> bool {
        self.get(key).and_then(AnswerValue::as_flag).unwrap_or(false)
    }
}

/// One entry of a list question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// What is shown.
    pub name: String,
    /// What is recorded.
    pub value: String,
}

impl Choice {
    pub fn plain(value: &str) -> Self {
        Self {
            name: value.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Input,
    Confirm,
    List(Vec<Choice>),
    /// A control registered with the host under this name.
    Custom(&'static str),
}

type Predicate = Box<dyn Fn(&Answers) -> bool>;
type DefaultFn = Box<dyn Fn(&Answers) -> Option<AnswerValue>>;
type Validator = Box<dyn Fn(&AnswerValue, &Answers) -> Result<(), String>>;
type Filter = Box<dyn Fn(AnswerValue, &Answers) -> AnswerValue>;
type LabelFn = Box<dyn Fn(&Answers) -> String>;

pub struct Question {
    pub name: AnswerKey,
    pub kind: QuestionKind,
    pub message: String,
    /// Width limit handed to length-limited controls.
    pub max_length: Option<usize>,
    default: Option<DefaultFn>,
    when: Option<Predicate>,
    validate: Option<Validator>,
    filter: Option<Filter>,
    leading_label: Option<LabelFn>,
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl Question {
    pub fn new(name: AnswerKey, kind: QuestionKind, message: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            message: message.into(),
            max_length: None,
            default: None,
            when: None,
            validate: None,
            filter: None,
            leading_label: None,
        }
    }

    pub fn input(name: AnswerKey, message: impl Into<String>) -> Self {
        Self::new(name, QuestionKind::Input, message)
    }

    pub fn confirm(name: AnswerKey, message: impl Into<String>) -> Self {
        Self::new(name, QuestionKind::Confirm, message)
    }

    pub fn list(name: AnswerKey, message: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, QuestionKind::List(choices), message)
    }

    pub fn custom(name: AnswerKey, prompt: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, QuestionKind::Custom(prompt), message)
    }

    pub fn with_default(self, value: impl Into<AnswerValue>) -> Self {
        let value = value.into();
        self.with_default_fn(move |_| Some(value.clone()))
    }

    /// Set a default only when `value` is present.
    pub fn with_optional_default(self, value: Option<impl Into<AnswerValue>>) -> Self {
        match value {
            Some(value) => self.with_default(value),
            None => self,
        }
    }

    pub fn with_default_fn(
        mut self,
        default: impl Fn(&Answers) -> Option<AnswerValue> + 'static,
    ) -> Self {
        self.default = Some(Box::new(default));
        self
    }

    pub fn when(mut self, predicate: impl Fn(&Answers) -> bool + 'static) -> Self {
        self.when = Some(Box::new(predicate));
        self
    }

    pub fn validate(
        mut self,
        validator: impl Fn(&AnswerValue, &Answers) -> Result<(), String> + 'static,
    ) -> Self {
        self.validate = Some(Box::new(validator));
        self
    }

    pub fn filter(
        mut self,
        filter: impl Fn(AnswerValue, &Answers) -> AnswerValue + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn leading_label(mut self, label: impl Fn(&Answers) -> String + 'static) -> Self {
        self.leading_label = Some(Box::new(label));
        self
    }

    pub fn is_asked(&self, answers: &Answers) -> bool {
        self.when.as_ref().is_none_or(|when| when(answers))
    }

    pub fn default_for(&self, answers: &Answers) -> Option<AnswerValue> {
        self.default.as_ref().and_then(|default| default(answers))
    }

    pub fn label_for(&self, answers: &Answers) -> Option<String> {
        self.leading_label.as_ref().map(|label| label(answers))
    }

    /// Turn a raw answer into the recorded one: an empty text answer falls
    /// back to the default, then the filter runs, then the validator.
    pub fn resolve(&self, raw: AnswerValue, answers: &Answers) -> Result<AnswerValue, String> {
        let raw = match raw {
            AnswerValue::Text(text) if text.is_empty() => self
                .default_for(answers)
                .filter(|d| d.as_text().is_some())
                .unwrap_or(AnswerValue::Text(text)),
            other => other,
        };
        let value = match &self.filter {
            Some(filter) => filter(raw, answers),
            None => raw,
        };
        if let Some(validate) = &self.validate {
            validate(&value, answers)?;
        }
        Ok(value)
    }
}

/// Choice labels for the change types, descriptions aligned in one column.
pub fn type_choices(types: &[ChangeType]) -> Vec<Choice> {
    let width = types
        .iter()
        .map(|t| text::display_width(&t.key))
        .max()
        .unwrap_or(0)
        + 1;

    types
        .iter()
        .map(|t| Choice {
            name: format!(
                "{} {}",
                text::pad_right(&format!("{}:", t.key), width),
                t.description
            ),
            value: t.key.clone(),
        })
        .collect()
}

/// Trim, then drop every trailing period.
pub fn clean_subject(subject: &str) -> String {
    subject.trim().trim_end_matches('.').to_string()
}

fn map_text(value: AnswerValue, f: impl Fn(&str) -> String) -> AnswerValue {
    match value {
        AnswerValue::Text(text) => AnswerValue::Text(f(&text)),
        flag @ AnswerValue::Flag(_) => flag,
    }
}

/// The full, ordered commit questionnaire.
#[derive(Debug)]
pub struct Questionnaire {
    questions: Vec<Question>,
}

impl Questionnaire {
    /// Build the questions for `config`. `branch` is scanned once for a
    /// ticket reference to pre-fill the ticket question.
    pub fn new(config: &Config, branch: Option<&str>) -> Result<Self, PromptError> {
        let questions = vec![
            type_question(config),
            ticket_question(config, branch),
            scope_question(config),
            subject_question(config)?,
            Question::input(
                AnswerKey::Body,
                "Provide a longer description of the change: (press enter to skip)\n",
            )
            .with_optional_default(config.default_body.clone()),
            Question::confirm(AnswerKey::IsBreaking, "Are there any breaking changes?")
                .with_default(false),
            Question::confirm(
                AnswerKey::BreakingConfirmed,
                "You do know that this will bump the major version, are you sure?",
            )
            .with_default(false)
            .when(|answers| answers.flag(AnswerKey::IsBreaking)),
            Question::input(AnswerKey::Breaking, "Describe the breaking changes:\n").when(
                |answers| {
                    answers.flag(AnswerKey::IsBreaking)
                        && answers.flag(AnswerKey::BreakingConfirmed)
                },
            ),
            Question::confirm(AnswerKey::NoCi, "Do you want to skip CI for this commit?")
                .with_default(false),
            issue_affected_question(config),
            Question::input(
                AnswerKey::IssuesBody,
                "If issues are closed, the commit requires a body. Please enter a longer description of the commit itself:\n",
            )
            .with_default("-")
            .when(|answers| {
                answers.flag(AnswerKey::IsIssueAffected)
                    && answers.text(AnswerKey::Body).is_none()
                    && answers.text(AnswerKey::Breaking).is_none()
            }),
            Question::input(
                AnswerKey::Issues,
                "Add issue references (e.g. \"fix #123\", \"re #123\".):\n",
            )
            .with_optional_default(config.default_issues.clone())
            .when(|answers| answers.flag(AnswerKey::IsIssueAffected)),
        ];

        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Ask every applicable question in order and return the frozen answers.
    pub fn run(&self, prompter: &mut dyn Prompter) -> Result<Answers, FlowError> {
        let mut answers = Answers::new();

        for question in &self.questions {
            if !question.is_asked(&answers) {
                log_debug!("Skipping question `{}`", question.name);
                continue;
            }

            let _span = tracing::debug_span!("question", name = %question.name).entered();
            let value = prompter.ask(question, &answers)?;
            log_debug!("Answered `{}`: {:?}", question.name, value);
            answers.record(question.name, value)?;
        }

        Ok(answers)
    }
}

fn type_question(config: &Config) -> Question {
    Question::list(
        AnswerKey::Type,
        "Select the type of change that you're committing:",
        type_choices(&config.types),
    )
    .with_optional_default(config.default_type.clone())
}

fn ticket_question(config: &Config, branch: Option<&str>) -> Question {
    let prefix = config.ticket_prefix.clone();
    let optional = config.ticket_optional;
    let case = config.ticket_case;
    let default = branch
        .and_then(ticket::extract_from_branch)
        .unwrap_or_else(|| ticket::skeleton(&prefix));
    let message = format!(
        "Enter Shortcut story ({}1234){}:",
        ticket::skeleton(&prefix),
        if optional { " (optional)" } else { "" }
    );

    Question::input(AnswerKey::Ticket, message)
        .with_default(default)
        .when({
            let enabled = config.ticket_mode;
            move |_| enabled
        })
        .validate({
            let prefix = prefix.clone();
            move |value, _| {
                let value = value.as_text().unwrap_or_default();
                if (optional && ticket::is_empty(Some(value), &prefix)) || ticket::is_valid(value)
                {
                    Ok(())
                } else {
                    Err(format!(
                        "Enter a story reference like {}1234",
                        ticket::skeleton(&prefix)
                    ))
                }
            }
        })
        .filter(move |value, _| map_text(value, |t| case.apply(t.trim())))
}

fn scope_question(config: &Config) -> Question {
    let has_scopes = !config.scopes.is_empty();
    let message = format!(
        "What is the scope of this change (e.g. component or file name): {}",
        if has_scopes {
            "(select from the list)"
        } else {
            "(press enter to skip)"
        }
    );

    let question = if has_scopes {
        let choices = config.scopes.iter().map(|s| Choice::plain(s)).collect();
        Question::list(AnswerKey::Scope, message, choices)
    } else {
        Question::input(AnswerKey::Scope, message)
    };

    let skip = config.skip_scope;
    question
        .with_optional_default(config.default_scope.clone())
        .when(move |_| !skip)
        .filter(|value, _| map_text(value, |t| t.trim().to_lowercase()))
}

fn subject_question(config: &Config) -> Result<Question, PromptError> {
    let min = config.min_header_width;
    let max = config.max_header_width;
    let label_config = config.clone();
    let filter_config = config.clone();

    let question = Question::custom(
        AnswerKey::Subject,
        LIMITED_INPUT,
        "Write a short, imperative tense description of the change:",
    )
    .max_length(config.max_header_width)
    .with_optional_default(config.default_subject.clone())
    .leading_label(move |answers| message::subject_label(answers, &label_config))
    .validate(move |value, _| {
        if text::display_width(value.as_text().unwrap_or_default()) >= min {
            Ok(())
        } else {
            Err(format!("The subject must have at least {min} characters"))
        }
    })
    // Defaults skip the control's edits; cap the width here too.
    .filter(move |value, answers| {
        let budget = input_budget(max, &message::subject_label(answers, &filter_config));
        map_text(value, |t| clean_subject(text::truncate_to_width(t, budget)))
    });

    // A missing width limit is a configuration defect; surface it before
    // the first question is shown.
    LimitedInputOptions {
        max_length: question.max_length,
        ..LimitedInputOptions::default()
    }
    .validate()?;

    Ok(question)
}

fn issue_affected_question(config: &Config) -> Question {
    let ticket_mode = config.ticket_mode;
    Question::confirm(
        AnswerKey::IsIssueAffected,
        "Does this change affect any open issues?",
    )
    .with_default(config.default_issues.is_some())
    .when(move |_| !ticket_mode)
}
