use crate::config::Config;
use crate::engine::{CommitMode, CommitSink, Engine, GitSink, PrintSink};
use crate::git::GitRepo;
use crate::log_debug;
use crate::prompt::{PromptError, TerminalPrompter};
use crate::questions::FlowError;
use crate::ui;
use anyhow::{Context, anyhow};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, crate_version};
use std::io;

/// CLI structure defining the global arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version = crate_version!(),
    about = "Conventional commits with Shortcut story references",
    long_about = "Walks through type, story, scope and subject questions and commits the assembled conventional-commit message.",
    disable_version_flag = true,
    styles = get_styles(),
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Print the message to stdout instead of committing
    #[arg(short, long, help = "Print the message to stdout instead of committing")]
    pub print: bool,

    /// Commit without the preview and confirmation step
    #[arg(long = "test-mode", help = "Commit without preview and confirmation")]
    pub test_mode: bool,

    /// Skip the verification step (pre-commit and commit-msg hooks)
    #[arg(long, help = "Skip verification steps (pre-commit and commit-msg hooks)")]
    pub no_verify: bool,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", help = "Log debug messages to a file")]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(long = "log-file", help = "Specify a custom log file path")]
    pub log_file: Option<String>,

    /// Suppress non-essential output
    #[arg(short = 'q', long = "quiet", help = "Suppress non-essential output")]
    pub quiet: bool,

    /// Display the version
    #[arg(short = 'v', long = "version", help = "Display the version")]
    pub version: bool,
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<FlowError>(),
        Some(FlowError::Prompt(PromptError::Interrupted))
    ) || matches!(
        err.downcast_ref::<PromptError>(),
        Some(PromptError::Interrupted)
    )
}

/// Main function to parse arguments and run a commit session
pub fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    crate::logger::init().map_err(|e| anyhow!("{e}"))?;
    if cli.log {
        let log_file = cli
            .log_file
            .as_deref()
            .unwrap_or(crate::logger::DEFAULT_LOG_FILE);
        crate::logger::set_log_file(log_file)?;
        crate::logger::enable_logging();
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let repo = GitRepo::discover().ok();
    let branch = match &repo {
        Some(repo) => repo.get_current_branch().unwrap_or_else(|e| {
            log_debug!("Could not read the current branch: {}", e);
            None
        }),
        None => None,
    };

    let config = Config::load()?;
    let engine = Engine::new(config, branch.as_deref())?;

    let mut sink: Box<dyn CommitSink> = if cli.print {
        Box::new(PrintSink::new(io::stdout()))
    } else {
        let repo = repo.context(
            "Not in a Git repository. Please run this command from within a Git repository.",
        )?;
        Box::new(GitSink::new(repo, !cli.no_verify))
    };

    // Printing is already a preview, so it never asks for confirmation
    let mode = if cli.test_mode || cli.print {
        CommitMode::Test
    } else {
        CommitMode::Interactive
    };

    let mut prompter = TerminalPrompter::new();
    match engine.run(&mut prompter, sink.as_mut(), mode) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => {
            ui::print_warning("Commit cancelled.");
            Ok(())
        }
        Err(e) if is_interrupt(&e) => {
            ui::print_warning("Aborted, nothing was committed.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::parse_from(["git-cz-shortcut", "--print", "--no-verify", "-l"]);
        assert!(cli.print);
        assert!(cli.no_verify);
        assert!(cli.log);
        assert!(!cli.test_mode);
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn test_interrupt_detection() {
        let err = anyhow::Error::from(FlowError::Prompt(PromptError::Interrupted));
        assert!(is_interrupt(&err));
        assert!(!is_interrupt(&anyhow!("disk full")));
    }
}
