//! crates/lessongen_core/src/answer_key.rs
//!
//! Answer-key derivation: recovers the display letter (A-D) of the correct
//! option for a multiple-choice question without trusting the generator to
//! label its `correctAnswer` text.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Question;

/// Matches one leading option label: a single letter or digit followed by
/// `.`, `)`, `-`, or `:` and optional whitespace, e.g. "B. " or "1) ".
static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9][.)\-:]\s*").unwrap());

/// Strips a leading option label and trims surrounding whitespace.
///
/// Used both when rendering option lists (so accidental pre-existing labels
/// in the source text disappear uniformly) and when correlating the stored
/// correct answer against the options.
pub fn normalize_option(raw: &str) -> String {
    LABEL_PREFIX.replace(raw.trim(), "").trim().to_string()
}

/// Maps a zero-based option position to its display letter.
pub fn position_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Derives the display letter of the correct option.
///
/// The first option whose normalized text equals the normalized correct
/// answer wins; ties are impossible by construction (first match, stable).
/// Returns `None` when nothing matches — malformed upstream data degrades to
/// an unlabeled answer, never an error.
pub fn derive_answer_letter(question: &Question) -> Option<char> {
    let target = normalize_option(&question.correct_answer);
    question
        .options
        .iter()
        .position(|option| normalize_option(option) == target)
        .map(position_letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: [&str; 4], correct: &str) -> Question {
        Question {
            id: 1,
            text: "Which city is the capital of the United Kingdom?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct.to_string(),
        }
    }

    #[test]
    fn labeled_answer_resolves_to_letter() {
        // The stored answer carries a stray "1." label; the matching option
        // carries the same label. Both normalize to "London".
        let q = question(["Paris", "1. London", "Berlin", "Madrid"], "1. London");
        assert_eq!(derive_answer_letter(&q), Some('B'));
    }

    #[test]
    fn unlabeled_answer_matches_labeled_option() {
        let q = question(["A) Paris", "B) London", "C) Berlin", "D) Madrid"], "Berlin");
        assert_eq!(derive_answer_letter(&q), Some('C'));
    }

    #[test]
    fn no_match_returns_none() {
        let q = question(["Paris", "London", "Berlin", "Madrid"], "Rome");
        assert_eq!(derive_answer_letter(&q), None);
    }

    #[test]
    fn first_match_wins() {
        let q = question(["London", "london stuff", "B. London", "Madrid"], "London");
        // Option 2 also normalizes to "London", but position 0 is stable.
        assert_eq!(derive_answer_letter(&q), Some('A'));
    }

    #[test]
    fn normalize_strips_label_variants() {
        assert_eq!(normalize_option("A. Paris"), "Paris");
        assert_eq!(normalize_option("b) Paris"), "Paris");
        assert_eq!(normalize_option("3- Paris"), "Paris");
        assert_eq!(normalize_option("C: Paris"), "Paris");
        assert_eq!(normalize_option("  D.   Paris  "), "Paris");
    }

    #[test]
    fn normalize_leaves_plain_text_alone() {
        assert_eq!(normalize_option("Paris"), "Paris");
        // A bare number is an answer, not a label.
        assert_eq!(normalize_option("42"), "42");
        // Words starting with a letter and no separator keep their text.
        assert_eq!(normalize_option("Borrow a book"), "Borrow a book");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["A. Paris", "1) Two words", "plain", " padded  ", "B-7"] {
            let once = normalize_option(raw);
            assert_eq!(normalize_option(&once), once, "input: {raw:?}");
        }
    }

    #[test]
    fn position_letters_cover_four_options() {
        let letters: Vec<char> = (0..4).map(position_letter).collect();
        assert_eq!(letters, vec!['A', 'B', 'C', 'D']);
    }
}
