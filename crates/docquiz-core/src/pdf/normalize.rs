//! Text-run assembly and the normalization pass applied to every page.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::TextItem;

lazy_static! {
    // Horizontal whitespace only; newlines are structure.
    static ref HORIZONTAL_WS: Regex = Regex::new(r"[^\S\n]+").unwrap();

    // "exam-\nple" -> "example"; only when a lowercase letter continues the word.
    static ref HYPHEN_BREAK: Regex = Regex::new(r"(\p{L})-[^\S\n]*\n[^\S\n]*(\p{Ll})").unwrap();

    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Join a page's runs into one block: a newline after runs marked
/// end-of-line, a space otherwise.
pub fn assemble_runs(items: &[TextItem]) -> String {
    let mut block = String::new();
    for item in items {
        block.push_str(&item.text);
        block.push(if item.end_of_line { '\n' } else { ' ' });
    }
    block
}

/// Clean raw page text.
///
/// Strips control characters (keeping newlines and tabs), applies NFC,
/// collapses horizontal whitespace, rejoins hyphen-split words and trims
/// every line.
pub fn normalize_text(raw: &str) -> String {
    let stripped: String = raw
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\r' { '\n' } else { c })
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .filter(|c| !is_invisible_format(*c))
        .collect();

    let composed: String = stripped.nfc().collect();
    let collapsed = HORIZONTAL_WS.replace_all(&composed, " ");
    let rejoined = HYPHEN_BREAK.replace_all(&collapsed, "$1$2");

    let trimmed = rejoined
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINES.replace_all(trimmed.trim(), "\n\n").into_owned()
}

/// Zero-width and byte-order characters that some producers sprinkle
/// between glyphs.
fn is_invisible_format(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_lines_and_spaces() {
        let items = vec![
            TextItem::new("Hello", false),
            TextItem::new("world", true),
            TextItem::new("again", true),
        ];
        assert_eq!(assemble_runs(&items), "Hello world\nagain\n");
    }

    #[test]
    fn strips_control_characters_but_keeps_lines() {
        let raw = "Dose\u{1}\u{2}: 5\u{0}00 mg\nNext\tline";
        assert_eq!(normalize_text(raw), "Dose: 500 mg\nNext line");
    }

    #[test]
    fn composes_decomposed_accents() {
        // "Tiếng Việt" with combining marks
        let raw = "Tie\u{302}\u{301}ng Vie\u{323}\u{302}t";
        assert_eq!(normalize_text(raw), "Tiếng Việt");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_text("a   b \u{a0}\t c  \n  d"), "a b c\nd");
    }

    #[test]
    fn rejoins_hyphenated_words() {
        assert_eq!(normalize_text("photo-\nsynthesis happens"), "photosynthesis happens");
        // Capitalized continuation is a real compound or list item.
        assert_eq!(normalize_text("Jean-\nPaul"), "Jean-\nPaul");
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(normalize_text("one\n\n\n\n\ntwo\n\n"), "one\n\ntwo");
    }

    #[test]
    fn control_only_input_is_empty() {
        assert_eq!(normalize_text("\u{1}\u{2}\u{3}\u{7f}"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = "Cell   bio-\nlogy\u{0}\n\n\n\nChapter  2";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }
}
