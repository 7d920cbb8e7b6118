//! Length-limited input prompt
//!
//! Shows a ruler as wide as the allowed header, a live "chars left" counter
//! and a leading label standing in for the part of the header that is already
//! decided (type, scope, ticket). The edited line can never grow past the room
//! the label leaves.

use super::{
    Frame, LineBuffer, PromptControl, PromptError, Screen, format_error, format_question,
};
use crate::questions::{Answers, Question};
use crate::text;

use colored::{ColoredString, Colorize};
use std::io;
use unicode_width::UnicodeWidthStr;

/// Registration name of this control.
pub const LIMITED_INPUT: &str = "limitedInput";

/// Remaining budget above which the counter is green.
const COMFORTABLE_ABOVE: i64 = 15;
/// Remaining budget above which the counter is yellow; red otherwise.
const WARNING_ABOVE: i64 = 5;

/// Colour band of the remaining-characters counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLevel {
    Comfortable,
    Warning,
    Critical,
}

impl BudgetLevel {
    pub fn from_remaining(remaining: i64) -> Self {
        if remaining > COMFORTABLE_ABOVE {
            Self::Comfortable
        } else if remaining > WARNING_ABOVE {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Comfortable => text.green(),
            Self::Warning => text.yellow(),
            Self::Critical => text.red(),
        }
    }
}

/// Construction parameters.
#[derive(Debug, Clone, Default)]
pub struct LimitedInputOptions {
    pub message: String,
    /// Widest header allowed, label included. Required.
    pub max_length: Option<usize>,
    pub leading_label: Option<String>,
    pub default: Option<String>,
}

impl LimitedInputOptions {
    /// Fail early when the width limit is missing.
    pub fn validate(&self) -> Result<usize, PromptError> {
        match self.max_length {
            Some(max) if max > 0 => Ok(max),
            _ => Err(PromptError::MissingParameter("max_length")),
        }
    }
}

#[derive(Debug)]
pub struct LimitedInput {
    question: String,
    max_length: usize,
    leading_label: String,
    leading_width: usize,
    spacer: String,
    buffer: LineBuffer,
    answer: Option<String>,
}

/// Display columns left for input after `label` and the space before it.
pub fn input_budget(max_length: usize, label: &str) -> usize {
    if label.is_empty() {
        max_length
    } else {
        max_length.saturating_sub(text::display_width(label) + 1)
    }
}

impl LimitedInput {
    pub fn new(options: LimitedInputOptions) -> Result<Self, PromptError> {
        let max_length = options.validate()?;
        let leading_label = options
            .leading_label
            .filter(|label| !label.is_empty())
            .map(|label| format!(" {label}"))
            .unwrap_or_default();

        Ok(Self {
            question: format_question(&options.message, options.default.as_deref()),
            max_length,
            leading_width: text::display_width(&leading_label),
            leading_label,
            spacer: "-".repeat(max_length),
            buffer: LineBuffer::new(),
            answer: None,
        })
    }

    /// [`ControlFactory`](super::ControlFactory) for questions of this kind.
    pub fn factory(
        question: &Question,
        answers: &Answers,
    ) -> Result<Box<dyn PromptControl>, PromptError> {
        let default = question
            .default_for(answers)
            .and_then(|d| d.as_text().map(str::to_string));
        let control = Self::new(LimitedInputOptions {
            message: question.message.clone(),
            max_length: question.max_length,
            leading_label: question.label_for(answers),
            default,
        })?;
        Ok(Box::new(control))
    }

    pub fn leading_label(&self) -> &str {
        &self.leading_label
    }

    /// Display columns the edited line may use.
    pub fn budget(&self) -> usize {
        self.max_length.saturating_sub(self.leading_width)
    }

    /// Characters still available; negative only between a keystroke and
    /// the `on_edit` that follows it.
    pub fn remaining(&self) -> i64 {
        to_i64(self.max_length)
            - to_i64(self.leading_width)
            - to_i64(text::display_width(self.buffer.line()))
    }

    pub fn level(&self) -> BudgetLevel {
        BudgetLevel::from_remaining(self.remaining())
    }

    /// Cut the line back to the budget. Returns whether anything was removed.
    pub fn enforce_limit(&mut self) -> bool {
        self.buffer.truncate_to_width(self.budget())
    }

    pub fn chars_left_text(&self) -> ColoredString {
        self.level().paint(&format!("{} chars left", self.remaining()))
    }

    pub fn frame(&self, error: Option<&str>) -> Frame {
        let shown = self.answer.as_deref().unwrap_or_else(|| self.buffer.line());
        let input_prefix = format!("  {} ", self.leading_label);
        let content = format!(
            "{}\n  [{}] {}\n{input_prefix}{shown}",
            self.question,
            self.spacer,
            self.chars_left_text()
        );
        let cursor = if self.answer.is_some() {
            None
        } else {
            Some(input_prefix.width() + self.buffer.before_cursor().width())
        };

        Frame {
            content,
            bottom: error.map(format_error).unwrap_or_default(),
            cursor,
        }
    }
}

impl PromptControl for LimitedInput {
    fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }

    fn on_edit(&mut self, screen: &mut dyn Screen) -> io::Result<()> {
        self.enforce_limit();
        self.render(screen, None)
    }

    fn render(&self, screen: &mut dyn Screen, error: Option<&str>) -> io::Result<()> {
        screen.render(&self.frame(error))
    }

    fn set_answer(&mut self, answer: String) {
        self.answer = Some(answer);
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
