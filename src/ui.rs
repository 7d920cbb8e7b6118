use crate::git::CommitResult;
use crate::text;

use colored::Colorize;
use parking_lot::Mutex;
use std::fmt::Write;

// ═══════════════════════════════════════════════════════════════════════════════
// Box drawing for the commit preview
// ═══════════════════════════════════════════════════════════════════════════════

/// Blank columns between the border and the text
const BOX_PADDING_X: usize = 3;
/// Blank rows between the border and the text
const BOX_PADDING_Y: usize = 1;
/// Columns left of the border
const BOX_MARGIN_X: usize = 3;

/// Track quiet mode state
static QUIET_MODE: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));

/// Enable or disable quiet mode
pub fn set_quiet_mode(enabled: bool) {
    let mut quiet_mode = QUIET_MODE.lock();
    *quiet_mode = enabled;
}

/// Check if quiet mode is enabled
pub fn is_quiet_mode() -> bool {
    *QUIET_MODE.lock()
}

pub fn print_warning(message: &str) {
    if !is_quiet_mode() {
        println!("{}", message.yellow().bold());
    }
}

pub fn print_error(message: &str) {
    // Always print errors, even in quiet mode
    eprintln!("{}", message.red().bold());
}

pub fn print_version(version: &str) {
    if !is_quiet_mode() {
        println!(
            "{} {} {}",
            "git-cz-shortcut".magenta().bold(),
            "version".cyan(),
            version.green()
        );
    }
}

/// Draw `content` inside a single-line border.
///
/// Lines are padded by display width so emoji keep the right edge straight.
pub fn render_box(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let inner = lines
        .iter()
        .map(|line| text::display_width(line))
        .max()
        .unwrap_or(0)
        + BOX_PADDING_X * 2;
    let margin = " ".repeat(BOX_MARGIN_X);
    let blank = format!("{margin}│{}│", " ".repeat(inner));

    let mut out = String::new();
    out.push('\n');
    writeln!(out, "{margin}┌{}┐", "─".repeat(inner)).expect("writing to string cannot fail");
    for _ in 0..BOX_PADDING_Y {
        writeln!(out, "{blank}").expect("writing to string cannot fail");
    }
    for line in &lines {
        writeln!(
            out,
            "{margin}│{pad}{}{pad}│",
            text::pad_right(line, inner - BOX_PADDING_X * 2).green(),
            pad = " ".repeat(BOX_PADDING_X)
        )
        .expect("writing to string cannot fail");
    }
    for _ in 0..BOX_PADDING_Y {
        writeln!(out, "{blank}").expect("writing to string cannot fail");
    }
    writeln!(out, "{margin}└{}┘", "─".repeat(inner)).expect("writing to string cannot fail");
    out
}

/// Show the assembled message before asking for confirmation.
pub fn print_preview(message: &str) {
    if !is_quiet_mode() {
        println!();
        println!("{}", "Commit preview:".underline());
        println!("{}", render_box(message));
    }
}

/// One-line report after a commit, `git commit` style.
pub fn print_commit_summary(result: &CommitResult) {
    if !is_quiet_mode() {
        println!(
            "{} {}",
            format!("[{} {}]", result.branch, result.commit_hash).green().bold(),
            result.summary
        );
        println!(
            "{}",
            format!(
                " {} file{} changed",
                result.files_changed,
                if result.files_changed == 1 { "" } else { "s" }
            )
            .dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_edges_line_up() {
        colored::control::set_override(false);
        let boxed = render_box("feat: add ✨\n\nlonger body line");
        let widths: Vec<usize> = boxed
            .lines()
            .filter(|l| !l.is_empty())
            .map(text::display_width)
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{boxed}");
        assert!(boxed.contains("feat: add ✨"));
        colored::control::unset_override();
    }
}
