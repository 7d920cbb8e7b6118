//! Prompting contract between the question flow and the terminal host
//!
//! The host owns keyboard input and the screen. Custom controls such as
//! [`LimitedInput`] plug into it by capability: the host feeds keystrokes into
//! the control's [`LineBuffer`], calls [`PromptControl::on_edit`] after every
//! keypress and asks it to render, without knowing anything else about it.

mod limited;
mod line;
mod terminal;

pub use limited::{BudgetLevel, LIMITED_INPUT, LimitedInput, LimitedInputOptions, input_budget};
pub use line::{KeyOutcome, LineBuffer};
pub use terminal::{TerminalPrompter, TerminalScreen};

use crate::questions::{AnswerValue, Answers, Question};
use colored::Colorize;
use std::io;

/// Errors raised while presenting a question.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("You must provide a `{0}` parameter")]
    MissingParameter(&'static str),
    #[error("No prompt registered for type `{0}`")]
    UnknownPrompt(String),
    #[error("Prompt interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Builds a custom control for one question, given the answers so far.
pub type ControlFactory = fn(&Question, &Answers) -> Result<Box<dyn PromptControl>, PromptError>;

/// The host side of the contract.
pub trait Prompter {
    /// Make a custom control available to questions of kind `Custom(name)`.
    fn register_prompt(&mut self, name: &'static str, factory: ControlFactory);

    /// Present `question`, re-prompting until its filter and validator accept
    /// an answer, and return the accepted value.
    fn ask(&mut self, question: &Question, answers: &Answers) -> Result<AnswerValue, PromptError>;
}

/// One full paint of a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Question and input lines.
    pub content: String,
    /// Error or hint lines drawn under the content.
    pub bottom: String,
    /// Terminal column of the cursor on the last content line.
    pub cursor: Option<usize>,
}

/// Where frames are painted. Painting the same frame twice must leave the
/// display unchanged.
pub trait Screen {
    fn render(&mut self, frame: &Frame) -> io::Result<()>;

    /// Leave the last frame in place and move below it.
    fn done(&mut self) -> io::Result<()>;
}

/// A custom single-line control driven by the host.
pub trait PromptControl {
    fn buffer(&self) -> &LineBuffer;

    fn buffer_mut(&mut self) -> &mut LineBuffer;

    /// Called after every keystroke that reached the buffer.
    fn on_edit(&mut self, screen: &mut dyn Screen) -> io::Result<()>;

    fn render(&self, screen: &mut dyn Screen, error: Option<&str>) -> io::Result<()>;

    /// Switch to the answered state; later renders show `answer`.
    fn set_answer(&mut self, answer: String);

    /// The raw text currently entered.
    fn value(&self) -> String {
        self.buffer().line().to_string()
    }
}

/// `? message (hint) ` in the house style.
pub fn format_question(message: &str, hint: Option<&str>) -> String {
    let mut line = format!("{} {}", "?".green().bold(), message.bold());
    if let Some(hint) = hint.filter(|h| !h.is_empty()) {
        line.push(' ');
        line.push_str(&format!("({hint})").dimmed().to_string());
    }
    line.push(' ');
    line
}

/// Bottom line for a rejected answer.
pub fn format_error(error: &str) -> String {
    format!("{} {error}", ">>".red())
}
