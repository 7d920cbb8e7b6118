//! cz-shortcut - conventional commit wizard with Shortcut story references
//!
//! Asks for the change type, story reference, scope and a width-limited
//! subject, then assembles and commits a conventional-commit message.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine

pub mod cli;
pub mod commitlint;
pub mod config;
pub mod engine;
pub mod git;
pub mod logger;
pub mod message;
pub mod prompt;
pub mod questions;
pub mod text;
pub mod ticket;
pub mod ui;

pub use config::Config;
pub use engine::{CommitMode, CommitSink, Engine};
pub use message::assemble;
pub use questions::{AnswerKey, AnswerValue, Answers, Questionnaire};
