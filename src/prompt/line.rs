//! Editable single-line buffer
//!
//! The cursor is a grapheme index, so an emoji is stepped over and deleted as
//! a single unit and the cursor can never land inside a multi-byte sequence.

use crate::text;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_segmentation::UnicodeSegmentation;

/// What a keystroke did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Content changed.
    Edited,
    /// Only the cursor moved.
    Moved,
    /// Not an editing key.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    line: String,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer holding `line` with the cursor at its end.
    pub fn with_line(line: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_line(line);
        buffer
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// The text left of the cursor.
    pub fn before_cursor(&self) -> &str {
        &self.line[..self.byte_offset(self.cursor)]
    }

    /// Replace the content and put the cursor at the end.
    pub fn set_line(&mut self, line: &str) {
        self.line = line.to_string();
        self.cursor = text::cursor_width(&self.line);
    }

    /// Move the cursor, clamped to the content.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.len());
    }

    /// Drop graphemes from the end until the line fits in `max_width` display
    /// columns. The cursor is clamped to the new length. Returns whether
    /// anything was removed.
    pub fn truncate_to_width(&mut self, max_width: usize) -> bool {
        let kept = text::truncate_to_width(&self.line, max_width).len();
        if kept == self.line.len() {
            return false;
        }
        self.line.truncate(kept);
        self.cursor = text::cursor_width(&self.line);
        true
    }

    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_offset(self.cursor);
        self.line.insert_str(at, s);
        // Recount from the start: the insert may have merged with a neighbour
        // into one grapheme (skin tones, ZWJ, regional indicator pairs).
        let before = &self.line[..at + s.len()];
        self.cursor = text::cursor_width(before).min(self.len());
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = self.byte_offset(self.cursor - 1);
        let end = self.byte_offset(self.cursor);
        self.line.replace_range(start..end, "");
        self.cursor -= 1;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.line.replace_range(start..end, "");
        true
    }

    /// Ctrl-U: remove everything left of the cursor.
    pub fn kill_to_start(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let end = self.byte_offset(self.cursor);
        self.line.replace_range(..end, "");
        self.cursor = 0;
        true
    }

    /// Ctrl-K: remove everything right of the cursor.
    pub fn kill_to_end(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let start = self.byte_offset(self.cursor);
        self.line.truncate(start);
        true
    }

    /// Ctrl-W: remove the word left of the cursor plus trailing spaces.
    pub fn delete_word_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let graphemes: Vec<&str> = self.line.graphemes(true).collect();
        let mut start = self.cursor;
        while start > 0 && graphemes[start - 1].trim().is_empty() {
            start -= 1;
        }
        while start > 0 && !graphemes[start - 1].trim().is_empty() {
            start -= 1;
        }
        let from = self.byte_offset(start);
        let to = self.byte_offset(self.cursor);
        self.line.replace_range(from..to, "");
        self.cursor = start;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let end = self.len();
        let moved = self.cursor != end;
        self.cursor = end;
        moved
    }

    /// Apply one key event with readline-style bindings.
    ///
    /// Enter, Escape and Ctrl-C are left to the host and report `Ignored`.
    pub fn apply_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let (changed, edit) = match key.code {
            KeyCode::Char('a') if ctrl => (self.move_home(), false),
            KeyCode::Char('e') if ctrl => (self.move_end(), false),
            KeyCode::Char('b') if ctrl => (self.move_left(), false),
            KeyCode::Char('f') if ctrl => (self.move_right(), false),
            KeyCode::Char('u') if ctrl => (self.kill_to_start(), true),
            KeyCode::Char('k') if ctrl => (self.kill_to_end(), true),
            KeyCode::Char('w') if ctrl => (self.delete_word_before(), true),
            KeyCode::Char('h') if ctrl => (self.backspace(), true),
            KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => {
                return KeyOutcome::Ignored;
            }
            KeyCode::Char(c) => {
                let mut buf = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut buf));
                (true, true)
            }
            KeyCode::Backspace => (self.backspace(), true),
            KeyCode::Delete => (self.delete(), true),
            KeyCode::Left => (self.move_left(), false),
            KeyCode::Right => (self.move_right(), false),
            KeyCode::Home => (self.move_home(), false),
            KeyCode::End => (self.move_end(), false),
            _ => return KeyOutcome::Ignored,
        };

        match (changed, edit) {
            (true, true) => KeyOutcome::Edited,
            (true, false) => KeyOutcome::Moved,
            (false, _) => KeyOutcome::Ignored,
        }
    }

    fn len(&self) -> usize {
        text::cursor_width(&self.line)
    }

    fn byte_offset(&self, grapheme_idx: usize) -> usize {
        self.line
            .grapheme_indices(true)
            .nth(grapheme_idx)
            .map_or(self.line.len(), |(idx, _)| idx)
    }
}
