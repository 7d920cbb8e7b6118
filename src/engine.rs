//! Runs one commit session: ask, assemble, preview, confirm, commit.

use crate::config::Config;
use crate::git::{CommitResult, GitRepo};
use crate::{log_debug, log_info};
use crate::message;
use crate::prompt::{LIMITED_INPUT, LimitedInput, PromptError, Prompter};
use crate::questions::{AnswerKey, Answers, Question, Questionnaire};
use crate::ui;

use anyhow::{Context, Result};
use std::io::Write;

/// Receives the final message.
pub trait CommitSink {
    fn commit(&mut self, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Preview the message and ask before committing
    Interactive,
    /// Commit straight away
    Test,
}

/// Writes the message to a stream instead of committing.
pub struct PrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CommitSink for PrintSink<W> {
    fn commit(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Commits staged changes with git, running hooks unless `verify` is off.
pub struct GitSink {
    repo: GitRepo,
    verify: bool,
    last: Option<CommitResult>,
}

impl GitSink {
    pub fn new(repo: GitRepo, verify: bool) -> Self {
        Self {
            repo,
            verify,
            last: None,
        }
    }

    pub fn last_commit(&self) -> Option<&CommitResult> {
        self.last.as_ref()
    }
}

impl CommitSink for GitSink {
    fn commit(&mut self, message: &str) -> Result<()> {
        let result = self
            .repo
            .commit_and_verify(message, self.verify)
            .context("Failed to commit")?;
        log_info!("Committed {} on {}", result.commit_hash, result.branch);
        ui::print_commit_summary(&result);
        self.last = Some(result);
        Ok(())
    }
}

fn confirm_question() -> Question {
    Question::confirm(AnswerKey::DoCommit, "Are you sure that you want to commit?")
        .with_default(true)
}

/// One configured commit session.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    questionnaire: Questionnaire,
}

impl Engine {
    /// Build the questions. Configuration defects surface here, before any
    /// prompt is shown.
    pub fn new(config: Config, branch: Option<&str>) -> Result<Self, PromptError> {
        let questionnaire = Questionnaire::new(&config, branch)?;
        Ok(Self {
            config,
            questionnaire,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    /// The message for a completed set of answers.
    pub fn assemble(&self, answers: &Answers) -> String {
        message::assemble(answers, &self.config)
    }

    /// Run the session. Returns the committed message, or `None` when the
    /// user declined at the confirmation step.
    pub fn run(
        &self,
        prompter: &mut dyn Prompter,
        sink: &mut dyn CommitSink,
        mode: CommitMode,
    ) -> Result<Option<String>> {
        prompter.register_prompt(LIMITED_INPUT, LimitedInput::factory);

        let answers = self.questionnaire.run(prompter)?;
        let full_commit = self.assemble(&answers);
        log_debug!("Assembled commit message:\n{}", full_commit);

        if mode == CommitMode::Interactive {
            ui::print_preview(&full_commit);

            let confirm = confirm_question();
            let do_commit = prompter
                .ask(&confirm, &answers)?
                .as_flag()
                .unwrap_or(false);
            if !do_commit {
                log_debug!("Commit declined");
                return Ok(None);
            }
        }

        sink.commit(&full_commit)?;
        Ok(Some(full_commit))
    }
}
