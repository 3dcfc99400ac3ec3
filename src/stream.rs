//! Turns raw input (text or a pre-derived feature-code stream) into the
//! Input Stream the Candidate Generator walks.

use crate::types::{StoreType, SymbolId, INQUIRY_LENGTH};
use crate::vocab::VocabularyStore;

/// A bounded sequence of symbol codes plus a parallel `space` flag, 1-based
/// per spec but stored 0-based: `space[q]` is true iff input position
/// `q+1` is immediately preceded by a word separator in the raw input.
#[derive(Debug, Clone, Default)]
pub struct InputStream {
    pub is: Vec<SymbolId>,
    pub space: Vec<bool>,
}

impl InputStream {
    pub fn len(&self) -> usize {
        self.is.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is.is_empty()
    }

    /// Collapse runs of more than two identical characters down to two,
    /// mirroring the repeat-tolerance preprocessing rule ("THURSOOO...DAY"
    /// -> "THURSOODAY" before symbol resolution).
    fn collapse_repeats(chars: &[char]) -> Vec<char> {
        let mut out: Vec<char> = Vec::with_capacity(chars.len());
        for &c in chars {
            let tail_len = out.iter().rev().take_while(|&&x| x == c).count();
            if tail_len < 2 {
                out.push(c);
            }
        }
        out
    }

    /// Build an Input Stream for a TEXT store. Unrecognised characters are
    /// dropped from the symbol stream but still count as a word separator
    /// for `space` bookkeeping when they are whitespace.
    pub fn from_text(vs: &VocabularyStore, input: &str) -> Self {
        debug_assert!(matches!(vs.store_type(), StoreType::Text));
        let raw: Vec<char> = input.chars().map(|c| c.to_ascii_uppercase()).collect();
        let collapsed = Self::collapse_repeats(&raw);

        let mut is = Vec::new();
        let mut space = Vec::new();
        let mut preceded_by_space = true; // start of input counts as a boundary
        for c in collapsed {
            if c.is_whitespace() {
                preceded_by_space = true;
                continue;
            }
            if !c.is_ascii_alphanumeric() {
                continue;
            }
            if let Some(symbol) = vs.symbol_for_char(c) {
                is.push(symbol);
                space.push(preceded_by_space);
            }
            preceded_by_space = false;
            if is.len() >= INQUIRY_LENGTH {
                break;
            }
        }
        Self { is, space }
    }

    /// Build an Input Stream for a CENTRAL store: each whitespace-delimited
    /// word is one symbol.
    pub fn from_words(vs: &VocabularyStore, input: &str) -> Self {
        debug_assert!(matches!(vs.store_type(), StoreType::Central));
        let mut is = Vec::new();
        let mut space = Vec::new();
        for word in input.split_whitespace() {
            let upper = word.to_ascii_uppercase();
            if let Some(symbol) = vs.symbol_for_word(&upper) {
                is.push(symbol);
                space.push(true);
            }
            if is.len() >= INQUIRY_LENGTH {
                break;
            }
        }
        Self { is, space }
    }

    /// Build an Input Stream directly from a sequence of feature codes, for
    /// IMAGE stores, where there is no textual preprocessing to do.
    pub fn from_features(vs: &VocabularyStore, codes: &[u16]) -> Self {
        debug_assert!(matches!(vs.store_type(), StoreType::Image));
        let mut is = Vec::new();
        let mut space = Vec::new();
        for &code in codes.iter().take(INQUIRY_LENGTH) {
            if let Some(symbol) = vs.symbol_for_feature(code) {
                is.push(symbol);
                space.push(false);
            }
        }
        Self { is, space }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{PatternSpec, VocabularyStore};

    #[test]
    fn repeat_collapse_reduces_long_runs_to_two() {
        let collapsed: String = InputStream::collapse_repeats(
            &"THURSOOOOOOOOODAY".chars().collect::<Vec<_>>(),
        )
        .into_iter()
        .collect();
        assert_eq!(collapsed, "THURSOODAY");
    }

    #[test]
    fn from_text_marks_space_after_whitespace() {
        let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("AB")]).unwrap();
        let stream = InputStream::from_text(&vs, "a b");
        assert_eq!(stream.is.len(), 2);
        assert!(stream.space[0]);
        assert!(stream.space[1]);
    }

    #[test]
    fn from_words_splits_central_store_input() {
        let vs = VocabularyStore::build(
            StoreType::Central,
            &[PatternSpec::new("what time is it")],
        )
        .unwrap();
        let stream = InputStream::from_words(&vs, "what time is it");
        assert_eq!(stream.is.len(), 4);
    }
}
