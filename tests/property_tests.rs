//! Property-based tests for token estimation and budgeted chunking.
//!
//! These tests verify the invariants the pipeline relies on:
//! - Budget: every chunk fits, except forced slices of an over-budget word
//! - Measured: `token_count` is the estimate of the stored content
//! - Lossless: every non-whitespace character survives, in order
//! - Numbered: chunk numbers and ids are sequential from zero
//! - Deterministic: the same input gives the same chunks

use proptest::prelude::*;
use pageslab::{
    clean_text, estimate_tokens, prefix_within, ChunkSequence, HeuristicSegmenter, PageSegmenter,
    TextChunk, TextChunker, TokenBudget, FORCED_SLICE_CHARS,
};

// =============================================================================
// Test Generators
// =============================================================================

/// A Latin word, a CJK run, or a Latin word with trailing punctuation.
fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::string::string_regex("[A-Za-z0-9]{1,12}").unwrap(),
        2 => prop::string::string_regex("[\\u{3041}-\\u{3096}\\u{30A1}-\\u{30F6}\\u{4E00}-\\u{4FFF}]{1,250}").unwrap(),
        1 => prop::string::string_regex("[a-z]{1,8}[.!?。]").unwrap(),
    ]
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![" ", " ", " ", "\n", "\n\n", "\r\n\r\n", "  \t", "\n \n\n"])
}

/// Mixed CJK/Latin text with sentence terminators and paragraph breaks.
fn document() -> impl Strategy<Value = String> {
    prop::collection::vec((token(), separator()), 0..120).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(token, sep)| format!("{token}{sep}"))
            .collect()
    })
}

/// ASCII-only text: every word fits any budget of at least 2.
fn latin_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (prop::string::string_regex("[A-Za-z]{1,10}[.,]?").unwrap(), separator()),
        0..200,
    )
    .prop_map(|parts| {
        parts
            .into_iter()
            .map(|(word, sep)| format!("{word}{sep}"))
            .collect()
    })
}

fn chunk(text: &str, max: usize) -> Vec<TextChunk> {
    TextChunker::new(TokenBudget::new(max).unwrap()).chunk_text(text, "doc")
}

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

// =============================================================================
// Chunking Invariants
// =============================================================================

proptest! {
    #[test]
    fn chunks_respect_budget_or_are_word_slices(text in document(), max in 1usize..300) {
        for chunk in chunk(&text, max) {
            if chunk.token_count() > max {
                prop_assert!(
                    !chunk.content().contains(char::is_whitespace),
                    "over-budget chunk spans words: {}",
                    chunk
                );
                prop_assert!(chunk.content().chars().count() <= FORCED_SLICE_CHARS);
            }
        }
    }

    #[test]
    fn token_count_is_estimate_of_content(text in document(), max in 1usize..300) {
        for chunk in chunk(&text, max) {
            prop_assert_eq!(chunk.token_count(), estimate_tokens(chunk.content()));
        }
    }

    #[test]
    fn chunks_are_trimmed_and_non_empty(text in document(), max in 1usize..300) {
        for chunk in chunk(&text, max) {
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.content(), chunk.content().trim());
        }
    }

    #[test]
    fn no_characters_lost_or_reordered(text in document(), max in 1usize..300) {
        let chunks = chunk(&text, max);
        let rebuilt: String = chunks.iter().map(|c| non_whitespace(c.content())).collect();
        prop_assert_eq!(rebuilt, non_whitespace(&text));
    }

    #[test]
    fn words_preserved_when_none_is_over_budget(text in latin_document(), max in 2usize..200) {
        let chunks = chunk(&text, max);
        let words: Vec<&str> = chunks.iter().flat_map(|c| c.content().split_whitespace()).collect();
        let expected: Vec<&str> = text.split_whitespace().collect();
        prop_assert_eq!(words, expected);
        prop_assert!(chunks.iter().all(|c| c.token_count() <= max));
    }

    #[test]
    fn numbering_is_sequential(text in document(), max in 1usize..300) {
        for (i, chunk) in chunk(&text, max).iter().enumerate() {
            prop_assert_eq!(chunk.chunk_number(), i);
            prop_assert_eq!(chunk.id(), format!("doc-{i}"));
            prop_assert_eq!(chunk.file_id(), "doc");
        }
    }

    #[test]
    fn numbering_continues_across_pages(pages in prop::collection::vec(document(), 1..5)) {
        let chunker = TextChunker::new(TokenBudget::new(50).unwrap());
        let mut seq = ChunkSequence::new("doc");
        let mut all = Vec::new();
        for (page, text) in (1u32..).zip(&pages) {
            let chunks = chunker.chunk_into(text, &mut seq, Some(page));
            prop_assert!(chunks.iter().all(|c| c.page_number() == Some(page)));
            all.extend(chunks);
        }
        for (i, chunk) in all.iter().enumerate() {
            prop_assert_eq!(chunk.chunk_number(), i);
        }
        prop_assert_eq!(seq.next_number(), all.len());
    }

    #[test]
    fn chunking_is_deterministic(text in document(), max in 1usize..300) {
        let first: Vec<String> = chunk(&text, max).iter().map(|c| c.content().to_string()).collect();
        let second: Vec<String> = chunk(&text, max).iter().map(|c| c.content().to_string()).collect();
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Estimator Invariants
// =============================================================================

proptest! {
    #[test]
    fn estimate_is_subadditive(a in document(), b in document()) {
        let joined = format!("{a} {b}");
        prop_assert!(estimate_tokens(&joined) <= estimate_tokens(&a) + estimate_tokens(&b));
    }

    #[test]
    fn estimate_grows_with_words(n in 0usize..500, extra in 0usize..50) {
        let shorter = "word ".repeat(n);
        let longer = "word ".repeat(n + extra);
        prop_assert!(estimate_tokens(&shorter) <= estimate_tokens(&longer));
    }

    #[test]
    fn estimate_grows_with_cjk(n in 0usize..500, extra in 0usize..50) {
        let shorter = "字".repeat(n);
        let longer = "字".repeat(n + extra);
        prop_assert!(estimate_tokens(&shorter) <= estimate_tokens(&longer));
    }

    #[test]
    fn prefix_within_is_a_fitting_prefix(text in document(), max in 0usize..400) {
        let prefix = prefix_within(&text, max);
        prop_assert!(text.starts_with(prefix));
        prop_assert!(estimate_tokens(prefix) <= max);
    }
}

// =============================================================================
// Extraction Invariants
// =============================================================================

proptest! {
    #[test]
    fn clean_text_is_idempotent(raw in ".{0,300}") {
        let once = clean_text(&raw);
        prop_assert_eq!(clean_text(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert_eq!(once.trim(), once.as_str());
    }

    #[test]
    fn unmarked_short_text_is_one_page(text in "[a-zA-Z ]{1,2999}") {
        let cleaned = clean_text(&text);
        prop_assume!(!cleaned.is_empty());
        let pages = HeuristicSegmenter::default().segment(&cleaned);
        prop_assert_eq!(pages, vec![cleaned]);
    }

    #[test]
    fn fixed_pages_keep_every_character(text in "[a-zA-Z ]{1,2000}", size in 1usize..500) {
        let cleaned = clean_text(&text);
        let pages = HeuristicSegmenter::new(size).segment(&cleaned);
        let rebuilt: String = pages.iter().map(|p| non_whitespace(p)).collect();
        prop_assert_eq!(rebuilt, non_whitespace(&cleaned));
    }
}
