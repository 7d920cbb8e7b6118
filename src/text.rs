//! Text metrics for monospace terminals
//!
//! Terminals draw emoji two columns wide. Everything measured here works on
//! extended grapheme clusters, so a ZWJ family, a flag pair or a keycap counts
//! as one emoji no matter how many code points it is made of.

use unicode_segmentation::UnicodeSegmentation;

/// Columns occupied by one emoji grapheme.
pub const EMOJI_WIDTH: usize = 2;

/// Variation selector-16, requests emoji presentation for the preceding character.
const EMOJI_PRESENTATION_SELECTOR: char = '\u{FE0F}';
/// Combining enclosing keycap (`1️⃣`, `#️⃣`).
const KEYCAP: char = '\u{20E3}';

/// Code point ranges rendered with emoji presentation by default.
///
/// Astral blocks are taken wholesale; the BMP only contributes the individual
/// characters whose default presentation is emoji.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x231A, 0x231B),
    (0x23E9, 0x23EC),
    (0x23F0, 0x23F0),
    (0x23F3, 0x23F3),
    (0x25FD, 0x25FE),
    (0x2614, 0x2615),
    (0x2648, 0x2653),
    (0x267F, 0x267F),
    (0x2693, 0x2693),
    (0x26A1, 0x26A1),
    (0x26AA, 0x26AB),
    (0x26BD, 0x26BE),
    (0x26C4, 0x26C5),
    (0x26CE, 0x26CE),
    (0x26D4, 0x26D4),
    (0x26EA, 0x26EA),
    (0x26F2, 0x26F3),
    (0x26F5, 0x26F5),
    (0x26FA, 0x26FA),
    (0x26FD, 0x26FD),
    (0x2705, 0x2705),
    (0x270A, 0x270B),
    (0x2728, 0x2728),
    (0x274C, 0x274C),
    (0x274E, 0x274E),
    (0x2753, 0x2755),
    (0x2757, 0x2757),
    (0x2795, 0x2797),
    (0x27B0, 0x27B0),
    (0x27BF, 0x27BF),
    (0x2B1B, 0x2B1C),
    (0x2B50, 0x2B50),
    (0x2B55, 0x2B55),
    (0x1F004, 0x1F004),
    (0x1F0CF, 0x1F0CF),
    (0x1F18E, 0x1F18E),
    (0x1F191, 0x1F19A),
    // Regional indicators, paired into flags by the segmenter
    (0x1F1E6, 0x1F1FF),
    (0x1F201, 0x1F202),
    (0x1F21A, 0x1F21A),
    (0x1F22F, 0x1F22F),
    (0x1F232, 0x1F23A),
    (0x1F250, 0x1F251),
    (0x1F300, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F7E0, 0x1F7FF),
    (0x1F90C, 0x1F9FF),
    (0x1FA70, 0x1FAFF),
];

fn is_emoji_char(c: char) -> bool {
    let cp = u32::from(c);
    EMOJI_RANGES
        .binary_search_by(|&(start, end)| {
            if end < cp {
                std::cmp::Ordering::Less
            } else if start > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Whether a single grapheme cluster is an emoji sequence.
pub fn is_emoji(grapheme: &str) -> bool {
    grapheme
        .chars()
        .any(|c| c == EMOJI_PRESENTATION_SELECTOR || c == KEYCAP || is_emoji_char(c))
}

fn grapheme_width(grapheme: &str) -> usize {
    if is_emoji(grapheme) { EMOJI_WIDTH } else { 1 }
}

/// Display width of `s`: every emoji sequence is two columns, everything else one.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

/// Cursor column count of `s`: one column per grapheme, emoji included.
///
/// Cursor addressing follows the editing buffer, which steps over an emoji
/// in a single move, so this deliberately differs from [`display_width`].
pub fn cursor_width(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Longest prefix of `s` whose display width fits in `max_width`.
pub fn truncate_to_width(s: &str, max_width: usize) -> &str {
    let mut width = 0;
    for (idx, grapheme) in s.grapheme_indices(true) {
        width += grapheme_width(grapheme);
        if width > max_width {
            return &s[..idx];
        }
    }
    s
}

/// Pad `s` with spaces on the right until it is `width` display columns wide.
pub fn pad_right(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - current))
}
