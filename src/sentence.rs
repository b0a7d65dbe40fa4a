//! Terminator-based sentence segmentation.
//!
//! The chunker only reaches for sentences when a whole paragraph is over
//! budget, so this splitter favours predictability over linguistic accuracy:
//!
//! ```text
//! "It works. Does it? Pi is 3.14 today."
//!
//! → ["It works.", "Does it?", "Pi is 3.14 today."]
//!                                   ↑ no whitespace after '.', no split
//! ```
//!
//! A sentence ends at `.`, `!`, `?` or the ideographic full stop `。` when the
//! terminator is followed by whitespace or the end of the text. Anything after
//! the last terminator is kept as a final sentence.
//!
//! Abbreviations ("Dr. Smith") do split. Over-splitting only costs packing
//! efficiency; the pieces are re-packed against the budget afterwards.

use std::sync::LazyLock;

use regex::Regex;

static TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。](?:\s|$)").expect("invalid sentence terminator pattern"));

/// Split `text` into trimmed, non-empty sentences in source order.
///
/// Text without any terminator comes back as a single sentence.
///
/// ```rust
/// use pageslab::split_sentences;
///
/// let sentences = split_sentences("One. Two! Three? Four");
/// assert_eq!(sentences, ["One.", "Two!", "Three?", "Four"]);
/// ```
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in TERMINATOR.find_iter(text) {
        push_trimmed(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_terminators() {
        let text = "Hello world. How are you? I am fine!";
        assert_eq!(
            split_sentences(text),
            ["Hello world.", "How are you?", "I am fine!"]
        );
    }

    #[test]
    fn test_decimal_is_not_a_boundary() {
        assert_eq!(split_sentences("Pi is 3.14 today."), ["Pi is 3.14 today."]);
    }

    #[test]
    fn test_ideographic_full_stop() {
        let text = "これはペンです。 あれは本です。";
        assert_eq!(split_sentences(text), ["これはペンです。", "あれは本です。"]);
    }

    #[test]
    fn test_ideographic_full_stop_without_space_does_not_split() {
        let text = "これはペンです。あれは本です。";
        assert_eq!(split_sentences(text), [text]);
    }

    #[test]
    fn test_remainder_is_kept() {
        assert_eq!(split_sentences("Done. trailing words"), ["Done.", "trailing words"]);
    }

    #[test]
    fn test_newline_after_terminator() {
        assert_eq!(split_sentences("Line one.\nLine two."), ["Line one.", "Line two."]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("  \n ").is_empty());
    }

    #[test]
    fn test_no_terminator_single_sentence() {
        assert_eq!(split_sentences("no terminator here"), ["no terminator here"]);
    }
}
