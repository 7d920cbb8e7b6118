//! crossterm-backed prompt host
//!
//! Every question is painted as a [`Frame`] and repainted in place on each
//! keystroke. When stdin or stdout is not a terminal, questions fall back to
//! plain line reads.

use super::{
    ControlFactory, Frame, KeyOutcome, LineBuffer, PromptControl, PromptError, Prompter, Screen,
    format_error, format_question,
};
use crate::log_debug;
use crate::questions::{AnswerValue, Answers, Choice, Question, QuestionKind};

use colored::Colorize;
use crossterm::QueueableCommand;
use crossterm::cursor::{MoveDown, MoveToColumn, MoveUp};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::LazyLock;
use unicode_width::UnicodeWidthStr;

const FALLBACK_COLUMNS: usize = 80;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI escape pattern is a valid regex")
});

/// Columns `s` occupies on screen, escape sequences excluded.
fn visible_width(s: &str) -> usize {
    ANSI_ESCAPE.replace_all(s, "").width()
}

fn wrapped_rows(line: &str, columns: usize) -> usize {
    visible_width(line).div_ceil(columns.max(1)).max(1)
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn terminal_columns() -> usize {
    terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .ok()
        .filter(|&cols| cols > 0)
        .unwrap_or(FALLBACK_COLUMNS)
}

struct RawModeGuard;

impl RawModeGuard {
    fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Paints frames in place, remembering how far the cursor sits below the
/// frame's first row so the next paint can start from there.
pub struct TerminalScreen<W: Write> {
    out: W,
    columns: usize,
    cursor_row: usize,
    rows_below_cursor: usize,
}

impl TerminalScreen<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal_columns())
    }
}

impl<W: Write> TerminalScreen<W> {
    pub fn new(out: W, columns: usize) -> Self {
        Self {
            out,
            columns: columns.max(1),
            cursor_row: 0,
            rows_below_cursor: 0,
        }
    }

    /// Row of the cursor, counted from the first row of the last frame.
    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn return_to_top(&mut self) -> io::Result<()> {
        if self.cursor_row > 0 {
            self.out.queue(MoveUp(to_u16(self.cursor_row)))?;
        }
        self.out.queue(MoveToColumn(0))?;
        self.out.queue(Clear(ClearType::FromCursorDown))?;
        Ok(())
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        self.return_to_top()?;

        let content: Vec<&str> = frame.content.split('\n').collect();
        let bottom: Vec<&str> = if frame.bottom.is_empty() {
            Vec::new()
        } else {
            frame.bottom.split('\n').collect()
        };

        let last = content.last().copied().unwrap_or_default();
        let above = &content[..content.len().saturating_sub(1)];
        let rows_above: usize = above.iter().map(|l| wrapped_rows(l, self.columns)).sum();
        let cursor_col = frame.cursor.unwrap_or_else(|| visible_width(last));
        let last_rows = wrapped_rows(last, self.columns);
        // A cursor right after a line that exactly fills the terminal belongs on
        // the next row, but the terminal holds it in the pending-wrap position.
        let cursor_past_end = cursor_col / self.columns >= last_rows;

        for (idx, line) in content.iter().enumerate() {
            if idx > 0 {
                self.out.queue(Print("\r\n"))?;
            }
            self.out.queue(Print(*line))?;
        }
        if cursor_past_end {
            self.out.queue(Print("\r\n"))?;
        }
        for line in &bottom {
            self.out.queue(Print("\r\n"))?;
            self.out.queue(Print(*line))?;
        }

        let last_rows = last_rows.max(cursor_col / self.columns + 1);
        let bottom_rows: usize = bottom.iter().map(|l| wrapped_rows(l, self.columns)).sum();

        let total_rows = rows_above + last_rows + bottom_rows;
        let cursor_row = rows_above + cursor_col / self.columns;
        let move_up = total_rows.saturating_sub(1).saturating_sub(cursor_row);
        if move_up > 0 {
            self.out.queue(MoveUp(to_u16(move_up)))?;
        }
        self.out
            .queue(MoveToColumn(to_u16(cursor_col % self.columns)))?;
        self.out.flush()?;

        self.cursor_row = cursor_row;
        self.rows_below_cursor = move_up;
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        if self.rows_below_cursor > 0 {
            self.out.queue(MoveDown(to_u16(self.rows_below_cursor)))?;
        }
        self.out.queue(Print("\r\n"))?;
        self.out.flush()?;
        self.cursor_row = 0;
        self.rows_below_cursor = 0;
        Ok(())
    }
}

/// Screen for the line-read fallback; frames are not painted.
struct DetachedScreen;

impl Screen for DetachedScreen {
    fn render(&mut self, _frame: &Frame) -> io::Result<()> {
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Screen for line-read mode: prints a frame once, leaving the cursor after
/// its last line so the answer is typed in place.
struct EchoScreen<W: Write> {
    out: W,
}

impl<W: Write> Screen for EchoScreen<W> {
    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        write!(self.out, "{}", frame.content)?;
        self.out.flush()
    }

    fn done(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The stock free-text control.
struct PlainInput {
    question: String,
    buffer: LineBuffer,
    answer: Option<String>,
}

impl PlainInput {
    fn new(question: &Question, answers: &Answers) -> Self {
        let default = question.default_for(answers);
        Self {
            question: format_question(&question.message, default.as_ref().and_then(AnswerValue::as_text)),
            buffer: LineBuffer::new(),
            answer: None,
        }
    }
}

impl PromptControl for PlainInput {
    fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }

    fn on_edit(&mut self, screen: &mut dyn Screen) -> io::Result<()> {
        self.render(screen, None)
    }

    fn render(&self, screen: &mut dyn Screen, error: Option<&str>) -> io::Result<()> {
        let prompt_width = visible_width(self.question.rsplit('\n').next().unwrap_or_default());
        let (shown, cursor) = match &self.answer {
            Some(answer) => (answer.cyan().to_string(), None),
            None => (
                self.buffer.line().to_string(),
                Some(prompt_width + self.buffer.before_cursor().width()),
            ),
        };
        screen.render(&Frame {
            content: format!("{}{shown}", self.question),
            bottom: error.map(format_error).unwrap_or_default(),
            cursor,
        })
    }

    fn set_answer(&mut self, answer: String) {
        self.answer = Some(answer);
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Next key press, skipping releases and non-key events.
fn next_key() -> io::Result<KeyEvent> {
    loop {
        if let Event::Key(key) = event::read()?
            && matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
        {
            return Ok(key);
        }
    }
}

fn confirm_hint(default: bool) -> &'static str {
    if default { "Y/n" } else { "y/N" }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn default_choice(question: &Question, answers: &Answers, choices: &[Choice]) -> usize {
    question
        .default_for(answers)
        .and_then(|d| d.as_text().map(str::to_string))
        .and_then(|d| choices.iter().position(|c| c.value == d))
        .unwrap_or(0)
}

/// Asks questions on the controlling terminal.
pub struct TerminalPrompter {
    registry: HashMap<&'static str, ControlFactory>,
    interactive: bool,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
        log_debug!("Terminal prompter, interactive: {}", interactive);
        Self {
            registry: HashMap::new(),
            interactive,
        }
    }

    fn control_for(
        &self,
        question: &Question,
        answers: &Answers,
    ) -> Result<Box<dyn PromptControl>, PromptError> {
        match &question.kind {
            QuestionKind::Custom(name) => {
                let factory = self
                    .registry
                    .get(name)
                    .ok_or_else(|| PromptError::UnknownPrompt((*name).to_string()))?;
                factory(question, answers)
            }
            _ => Ok(Box::new(PlainInput::new(question, answers))),
        }
    }

    fn ask_text(
        &self,
        question: &Question,
        answers: &Answers,
        mut control: Box<dyn PromptControl>,
    ) -> Result<AnswerValue, PromptError> {
        let _guard = RawModeGuard::acquire()?;
        let mut screen = TerminalScreen::stdout();
        control.render(&mut screen, None)?;

        loop {
            let key = match event::read()? {
                Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
                    key
                }
                Event::Paste(text) => {
                    control.buffer_mut().insert_str(&text);
                    control.on_edit(&mut screen)?;
                    continue;
                }
                Event::Resize(..) => {
                    control.render(&mut screen, None)?;
                    continue;
                }
                _ => continue,
            };

            if is_interrupt(&key) {
                screen.done()?;
                return Err(PromptError::Interrupted);
            }

            if key.code == KeyCode::Enter {
                match question.resolve(AnswerValue::Text(control.value()), answers) {
                    Ok(value) => {
                        control.set_answer(value.as_text().unwrap_or_default().to_string());
                        control.render(&mut screen, None)?;
                        screen.done()?;
                        return Ok(value);
                    }
                    Err(message) => control.render(&mut screen, Some(&message))?,
                }
                continue;
            }

            match control.buffer_mut().apply_key(key) {
                KeyOutcome::Edited => control.on_edit(&mut screen)?,
                KeyOutcome::Moved => control.render(&mut screen, None)?,
                KeyOutcome::Ignored => {}
            }
        }
    }

    fn ask_confirm(&self, question: &Question, answers: &Answers) -> Result<AnswerValue, PromptError> {
        let default = question
            .default_for(answers)
            .and_then(|d| d.as_flag())
            .unwrap_or(false);
        let prompt = format_question(&question.message, Some(confirm_hint(default)));

        let _guard = RawModeGuard::acquire()?;
        let mut screen = TerminalScreen::stdout();
        screen.render(&Frame {
            content: prompt.clone(),
            ..Frame::default()
        })?;

        loop {
            let key = next_key()?;
            if is_interrupt(&key) {
                screen.done()?;
                return Err(PromptError::Interrupted);
            }
            let raw = match key.code {
                KeyCode::Char('y' | 'Y') => true,
                KeyCode::Char('n' | 'N') => false,
                KeyCode::Enter => default,
                _ => continue,
            };
            match question.resolve(AnswerValue::Flag(raw), answers) {
                Ok(value) => {
                    let shown = yes_no(value.as_flag().unwrap_or(raw));
                    screen.render(&Frame {
                        content: format!("{}{}", format_question(&question.message, None), shown.cyan()),
                        ..Frame::default()
                    })?;
                    screen.done()?;
                    return Ok(value);
                }
                Err(message) => screen.render(&Frame {
                    content: prompt.clone(),
                    bottom: format_error(&message),
                    cursor: None,
                })?,
            }
        }
    }

    fn ask_list(
        &self,
        question: &Question,
        answers: &Answers,
        choices: &[Choice],
    ) -> Result<AnswerValue, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::MissingParameter("choices"));
        }
        let mut selected = default_choice(question, answers, choices);
        let header = format_question(&question.message, Some("Use arrow keys"));

        let _guard = RawModeGuard::acquire()?;
        let mut screen = TerminalScreen::stdout();
        let mut error: Option<String> = None;

        loop {
            let mut content = header.clone();
            for (idx, choice) in choices.iter().enumerate() {
                content.push('\n');
                if idx == selected {
                    content.push_str(&format!("{} {}", "❯".cyan(), choice.name.cyan()));
                } else {
                    content.push_str(&format!("  {}", choice.name));
                }
            }
            screen.render(&Frame {
                content,
                bottom: error.as_deref().map(format_error).unwrap_or_default(),
                cursor: Some(0),
            })?;

            let key = next_key()?;
            match key.code {
                _ if is_interrupt(&key) => {
                    screen.done()?;
                    return Err(PromptError::Interrupted);
                }
                KeyCode::Esc => {
                    screen.done()?;
                    return Err(PromptError::Interrupted);
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    selected = selected.checked_sub(1).unwrap_or(choices.len() - 1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    selected = (selected + 1) % choices.len();
                }
                KeyCode::Enter => {
                    let raw = AnswerValue::Text(choices[selected].value.clone());
                    match question.resolve(raw, answers) {
                        Ok(value) => {
                            screen.render(&Frame {
                                content: format!(
                                    "{}{}",
                                    format_question(&question.message, None),
                                    value.as_text().unwrap_or_default().cyan()
                                ),
                                ..Frame::default()
                            })?;
                            screen.done()?;
                            return Ok(value);
                        }
                        Err(message) => error = Some(message),
                    }
                }
                _ => {}
            }
        }
    }

    fn read_line() -> Result<String, PromptError> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(PromptError::Interrupted);
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    fn show_prompt(prompt: &str) -> Result<(), PromptError> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        Ok(())
    }

    /// Plain line-read rendition of any question.
    fn ask_fallback(&self, question: &Question, answers: &Answers) -> Result<AnswerValue, PromptError> {
        loop {
            let raw = match &question.kind {
                QuestionKind::Confirm => {
                    let default = question
                        .default_for(answers)
                        .and_then(|d| d.as_flag())
                        .unwrap_or(false);
                    Self::show_prompt(&format_question(&question.message, Some(confirm_hint(default))))?;
                    match Self::read_line()?.trim().to_lowercase().as_str() {
                        "" => AnswerValue::Flag(default),
                        "y" | "yes" => AnswerValue::Flag(true),
                        "n" | "no" => AnswerValue::Flag(false),
                        _ => {
                            println!("{}", format_error("Please answer y or n"));
                            continue;
                        }
                    }
                }
                QuestionKind::List(choices) => {
                    if choices.is_empty() {
                        return Err(PromptError::MissingParameter("choices"));
                    }
                    let default = default_choice(question, answers, choices);
                    println!("{}", format_question(&question.message, None));
                    for (idx, choice) in choices.iter().enumerate() {
                        println!("  {}) {}", idx + 1, choice.name);
                    }
                    Self::show_prompt(&format!("  Answer ({}): ", default + 1))?;
                    let line = Self::read_line()?;
                    let line = line.trim();
                    let picked = if line.is_empty() {
                        Some(default)
                    } else {
                        line.parse::<usize>()
                            .ok()
                            .and_then(|n| n.checked_sub(1))
                            .filter(|&n| n < choices.len())
                            .or_else(|| choices.iter().position(|c| c.value == line))
                    };
                    match picked {
                        Some(idx) => AnswerValue::Text(choices[idx].value.clone()),
                        None => {
                            println!("{}", format_error("Please pick one of the listed entries"));
                            continue;
                        }
                    }
                }
                QuestionKind::Input | QuestionKind::Custom(_) => {
                    let mut control = self.control_for(question, answers)?;
                    control.render(&mut EchoScreen { out: io::stdout() }, None)?;
                    control.buffer_mut().set_line(&Self::read_line()?);
                    control.on_edit(&mut DetachedScreen)?;
                    AnswerValue::Text(control.value())
                }
            };

            match question.resolve(raw, answers) {
                Ok(value) => return Ok(value),
                Err(message) => println!("{}", format_error(&message)),
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn register_prompt(&mut self, name: &'static str, factory: ControlFactory) {
        log_debug!("Registered prompt type `{}`", name);
        self.registry.insert(name, factory);
    }

    fn ask(&mut self, question: &Question, answers: &Answers) -> Result<AnswerValue, PromptError> {
        if !self.interactive {
            return self.ask_fallback(question, answers);
        }
        match &question.kind {
            QuestionKind::Confirm => self.ask_confirm(question, answers),
            QuestionKind::List(choices) => self.ask_list(question, answers, choices),
            QuestionKind::Input | QuestionKind::Custom(_) => {
                let control = self.control_for(question, answers)?;
                self.ask_text(question, answers, control)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str, cursor: Option<usize>) -> Frame {
        Frame {
            content: content.to_string(),
            bottom: String::new(),
            cursor,
        }
    }

    #[test]
    fn test_line_read_mode_shows_label_and_budget() {
        use crate::prompt::{LimitedInput, LimitedInputOptions};

        colored::control::set_override(false);
        let control = LimitedInput::new(LimitedInputOptions {
            message: "Write a short description:".to_string(),
            max_length: Some(20),
            leading_label: Some("feat:".to_string()),
            default: None,
        })
        .expect("valid options");
        let mut screen = EchoScreen { out: Vec::new() };
        control.render(&mut screen, None).expect("render");
        colored::control::unset_override();

        let output = String::from_utf8(screen.out).expect("utf8");
        assert!(output.contains("14 chars left"), "{output:?}");
        assert!(output.ends_with("   feat: "), "{output:?}");
    }

    #[test]
    fn test_visible_width_ignores_colors() {
        let painted = format!("{} done", "ok".green());
        assert_eq!(visible_width(&painted), 7);
    }

    #[test]
    fn test_wrapped_rows() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("0123456789", 10), 1);
        assert_eq!(wrapped_rows("0123456789a", 10), 2);
    }

    #[test]
    fn test_cursor_row_tracks_last_content_line() {
        let mut screen = TerminalScreen::new(Vec::new(), 80);
        screen
            .render(&frame("question\n  [----] 4 chars left\n   ci: go", Some(9)))
            .expect("render");
        assert_eq!(screen.cursor_row(), 2);
    }

    #[test]
    fn test_wrapped_line_moves_cursor_down() {
        let mut screen = TerminalScreen::new(Vec::new(), 10);
        screen
            .render(&frame(&"x".repeat(25), Some(25)))
            .expect("render");
        assert_eq!(screen.cursor_row(), 2);
    }

    #[test]
    fn test_line_filling_the_terminal_gets_a_real_cursor_row() {
        let mut screen = TerminalScreen::new(Vec::new(), 10);
        let f = frame(&"x".repeat(10), Some(10));
        screen.render(&f).expect("first render");
        assert_eq!(screen.cursor_row(), 1);
        let first = String::from_utf8_lossy(&screen.out).to_string();
        assert!(first.contains(&format!("{}\r\n", "x".repeat(10))));

        let first_len = screen.out.len();
        screen.render(&f).expect("second render");
        let second = String::from_utf8_lossy(&screen.out[first_len..]).to_string();
        assert!(second.starts_with("\u{1b}[1A\u{1b}[1G"));
        assert_eq!(screen.cursor_row(), 1);
    }

    #[test]
    fn test_line_short_of_the_edge_adds_no_row() {
        let mut screen = TerminalScreen::new(Vec::new(), 10);
        screen.render(&frame(&"x".repeat(9), Some(9))).expect("render");
        assert_eq!(screen.cursor_row(), 0);
        let out = String::from_utf8_lossy(&screen.out).to_string();
        assert!(!out.contains("\r\n"));
    }

    #[test]
    fn test_repaint_starts_from_the_top() {
        let mut screen = TerminalScreen::new(Vec::new(), 80);
        let f = frame("a\nb\nc", Some(1));
        screen.render(&f).expect("first render");
        let first_len = screen.out.len();
        screen.render(&f).expect("second render");
        let second = String::from_utf8_lossy(&screen.out[first_len..]).to_string();
        assert!(second.starts_with("\u{1b}[2A"));
        assert_eq!(screen.cursor_row(), 2);
    }

    #[test]
    fn test_error_lines_sit_below_the_cursor() {
        let mut screen = TerminalScreen::new(Vec::new(), 80);
        screen
            .render(&Frame {
                content: "q\nanswer".to_string(),
                bottom: format_error("too short"),
                cursor: Some(3),
            })
            .expect("render");
        assert_eq!(screen.cursor_row(), 1);
        assert_eq!(screen.rows_below_cursor, 1);
        screen.done().expect("done");
        assert_eq!(screen.cursor_row(), 0);
    }

    #[test]
    fn test_plain_input_frame() {
        let question = Question::input(crate::questions::AnswerKey::Body, "Body:");
        let mut control = PlainInput::new(&question, &Answers::new());
        control.buffer_mut().set_line("hello");
        let mut screen = TerminalScreen::new(Vec::new(), 80);
        control.render(&mut screen, None).expect("render");
        let out = String::from_utf8_lossy(&screen.into_inner()).to_string();
        assert!(out.contains("Body:"));
        assert!(out.contains("hello"));
    }
}
