use std::borrow::Cow;

use ratatui::widgets::{Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Width of `s` in terminal columns. Hangul and other CJK glyphs count as 2.
///
/// ```
/// use novella::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("무협"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Byte offset of the longest prefix of `s` that fits in `width` columns.
fn fit_prefix(s: &str, width: usize) -> usize {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > width {
            return idx;
        }
        used += w;
    }
    s.len()
}

/// Truncate `s` to at most `max_width` columns, appending "..." when cut.
///
/// Widths of 3 or less have no room for an ellipsis, so the text is simply
/// clipped.
///
/// ```
/// use novella::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        return Cow::Borrowed(&s[..fit_prefix(s, max_width)]);
    }
    let cut = fit_prefix(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Number of rows `line` occupies in a `Paragraph` wrapped with
/// `Wrap { trim: false }` at `width` columns.
///
/// Counts with ratatui's own word wrapper, so it agrees with what is drawn.
/// An empty line still takes one row.
pub fn wrapped_rows(line: &str, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    if line.is_empty() {
        return 1;
    }
    let width = u16::try_from(width).unwrap_or(u16::MAX);
    Paragraph::new(line)
        .wrap(Wrap { trim: false })
        .line_count(width)
        .max(1)
}

fn is_stripped_control(c: char) -> bool {
    (c.is_control() && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{7f}'
}

/// Remove terminal control characters and ANSI escape sequences.
///
/// Server-provided text (titles, episode bodies, comments) goes through this
/// before rendering. Tab, LF and CR are kept. CSI sequences (`ESC [` ...
/// final byte) and OSC sequences (`ESC ]` ... BEL or `ESC \`) are dropped
/// whole; any other ESC is dropped alone.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    for param in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&param) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(body) = chars.next() {
                        if body == '\u{07}' {
                            break;
                        }
                        if body == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_truncation() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Hello", 5), "Hello");
    }

    #[test]
    fn test_hangul_truncation() {
        // 4 syllables, 8 columns
        let title = "검의노래";
        assert_eq!(display_width(title), 8);
        assert_eq!(truncate_to_width(title, 8), title);
        // 7 columns: room for 2 syllables + "..."
        assert_eq!(truncate_to_width(title, 7), "검의...");
    }

    #[test]
    fn test_narrow_widths_clip_without_ellipsis() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
        assert_eq!(truncate_to_width("무협", 1), "");
    }

    #[test]
    fn test_truncation_never_splits_codepoints() {
        let s = "a무b협c";
        for width in 0..=display_width(s) {
            let out = truncate_to_width(s, width);
            assert!(display_width(&out) <= width);
        }
    }

    #[test]
    fn test_wrapped_rows() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("abcdefghij", 10), 1);
        assert_eq!(wrapped_rows("abcdefghijk", 10), 2);
        // Wide glyph does not straddle: 3 columns fit one syllable per row
        assert_eq!(wrapped_rows("가나", 3), 2);
        assert_eq!(wrapped_rows("anything", 0), 0);
    }

    #[test]
    fn test_wrapped_rows_breaks_at_words() {
        // "aa bbb" does not fit in 5 columns, so "bbb" moves down whole
        assert_eq!(wrapped_rows("aa bbb cc", 5), 3);
    }

    /// Rows a wrapped paragraph actually paints, up to the last non-blank one.
    fn painted_rows(text: &str, width: u16) -> usize {
        use ratatui::{backend::TestBackend, Terminal};

        let mut terminal = Terminal::new(TestBackend::new(width, 40)).unwrap();
        terminal
            .draw(|f| {
                let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
                f.render_widget(paragraph, f.area());
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .filter(|&y| (0..width).any(|x| buffer[(x, y)].symbol() != " "))
            .map(|y| y as usize + 1)
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_wrapped_rows_matches_rendered_paragraph() {
        let samples = [
            ("aa bbb cc", 5),
            ("the quick brown fox jumps over the lazy dog", 12),
            ("abcdefghi abcdefghi abcdefghi abcdefghi", 20),
            ("검의 노래는 새벽에 끝났다", 9),
            ("averyveryverylongwordwithoutbreaks and more", 10),
        ];
        for (text, width) in samples {
            assert_eq!(
                wrapped_rows(text, width as usize),
                painted_rows(text, width),
                "{:?} at width {}",
                text,
                width
            );
        }
    }

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        let input = "Episode 3 - 새벽";
        assert!(matches!(strip_control_chars(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_preserves_tabs_newlines_cr() {
        assert_eq!(strip_control_chars("a\tb\nc\r\n"), "a\tb\nc\r\n");
    }

    #[test]
    fn test_strip_controls_and_del() {
        assert_eq!(strip_control_chars("a\x00b\x07c\x7fd"), "abcd");
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_control_chars("\x1b[2J\x1b[Hhome"), "home");
        assert_eq!(strip_control_chars("\x1b]0;title\x07text"), "text");
        assert_eq!(strip_control_chars("\x1b]8;;http://x\x1b\\link"), "link");
        assert_eq!(strip_control_chars("a\x1bb"), "ab");
    }
}
