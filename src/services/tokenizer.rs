//! Text tokenization.
//!
//! Every strategy shares the same cleaning and filtering; they differ only in
//! how cleaned text is cut into words.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::AnalysisConfig;

/// Configured tokenization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Whitespace split
    #[default]
    Simple,
    /// Noun stems via particle stripping
    Noun,
}

/// Stopword and length filter applied to every token.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    stopwords: HashSet<String>,
    min_length: usize,
}

impl TokenFilter {
    pub fn new<I, S>(stopwords: I, min_length: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|word| Into::<String>::into(word).to_ascii_lowercase())
                .collect(),
            min_length,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.stopwords.iter().cloned(), config.min_length)
    }

    /// True when the token is long enough and not a stopword.
    pub fn keep(&self, token: &str) -> bool {
        token.graphemes(true).count() >= self.min_length && !self.stopwords.contains(token)
    }
}

/// Hangul syllables, ASCII letters/digits and whitespace survive cleaning.
fn is_allowed(c: char) -> bool {
    matches!(c, '가'..='힣') || c.is_ascii_alphanumeric() || c.is_whitespace()
}

/// Replace every disallowed character with a space.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect()
}

fn contains_hangul(word: &str) -> bool {
    word.chars().any(|c| matches!(c, '가'..='힣'))
}

/// A tokenization strategy.
///
/// `tokenize` never fails; empty or fully filtered input yields an empty vector.
pub trait Tokenizer: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Cut cleaned text into candidate words.
    fn words(&self, cleaned: &str) -> Vec<String>;

    /// Clean, split, lowercase ASCII, then filter.
    fn tokenize(&self, text: &str, filter: &TokenFilter) -> Vec<String> {
        let cleaned = clean_text(text);
        self.words(&cleaned)
            .into_iter()
            .map(|w| w.to_ascii_lowercase())
            .filter(|w| filter.keep(w))
            .collect()
    }
}

/// Plain whitespace split.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSplit;

impl Tokenizer for SimpleSplit {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn words(&self, cleaned: &str) -> Vec<String> {
        cleaned.split_whitespace().map(String::from).collect()
    }
}

/// Trailing particles, longest first after construction.
const PARTICLES: &[&str] = &[
    "에서는", "으로는", "에게서", "까지는", "부터는", "이라고", "라고", "에서", "에게", "으로",
    "까지", "부터", "보다", "처럼", "만큼", "하고", "이랑", "이나", "이며", "랑", "은", "는",
    "이", "가", "을", "를", "에", "의", "도", "만", "와", "과", "로",
];

/// Endings of verbs and adjectives; words ending this way are not nouns.
const PREDICATE_ENDINGS: &[&str] = &[
    "습니다", "니다", "었다", "았다", "였다", "했다", "한다", "하다", "는다", "겠다", "네요",
    "어요", "아요", "해요", "에요", "예요", "지만", "는데", "해서", "하면", "려고", "는지",
];

/// Shared noun-extraction resource.
///
/// Build it once per run and lend it to every [`MorphologicalNoun`].
#[derive(Debug, Clone)]
pub struct NounAnalyzer {
    particles: Vec<&'static str>,
    lexicon: HashSet<String>,
}

impl NounAnalyzer {
    pub fn new<I, S>(lexicon: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut particles = PARTICLES.to_vec();
        particles.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
        Self {
            particles,
            lexicon: lexicon.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.lexicon.iter().cloned())
    }

    /// Noun stem of a single word, or `None` for predicates.
    pub fn noun(&self, word: &str) -> Option<String> {
        if !contains_hangul(word) || self.lexicon.contains(word) {
            return Some(word.to_string());
        }

        if PREDICATE_ENDINGS
            .iter()
            .any(|e| word.ends_with(e) && word.chars().count() > e.chars().count())
        {
            return None;
        }

        let stem = self
            .particles
            .iter()
            .filter_map(|p| word.strip_suffix(p))
            .find(|stem| stem.chars().count() >= 2 || self.lexicon.contains(*stem))
            .unwrap_or(word);

        Some(stem.to_string())
    }
}

impl Default for NounAnalyzer {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

/// Noun-phrase extraction backed by a borrowed [`NounAnalyzer`].
#[derive(Debug, Clone, Copy)]
pub struct MorphologicalNoun<'a> {
    analyzer: &'a NounAnalyzer,
}

impl<'a> MorphologicalNoun<'a> {
    pub fn new(analyzer: &'a NounAnalyzer) -> Self {
        Self { analyzer }
    }
}

impl Tokenizer for MorphologicalNoun<'_> {
    fn name(&self) -> &'static str {
        "noun"
    }

    fn words(&self, cleaned: &str) -> Vec<String> {
        cleaned
            .split_whitespace()
            .filter_map(|w| self.analyzer.noun(w))
            .collect()
    }
}

/// Select the configured strategy.
pub fn build_tokenizer<'a>(
    kind: TokenizerKind,
    analyzer: &'a NounAnalyzer,
) -> Box<dyn Tokenizer + 'a> {
    match kind {
        TokenizerKind::Simple => Box::new(SimpleSplit),
        TokenizerKind::Noun => Box::new(MorphologicalNoun::new(analyzer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TokenFilter {
        TokenFilter::new(["진짜", "tsla"], 2)
    }

    #[test]
    fn test_clean_text_replaces_symbols() {
        assert_eq!(clean_text("테슬라!! $TSLA ㅋㅋ"), "테슬라    TSLA   ");
    }

    #[test]
    fn test_simple_split() {
        let tokens = SimpleSplit.tokenize("진짜 테슬라 간다!! NVDA 가 a", &filter());
        assert_eq!(tokens, vec!["테슬라", "간다", "nvda"]);
    }

    #[test]
    fn test_stopwords_match_after_lowercasing() {
        let tokens = SimpleSplit.tokenize("TSLA Tsla tesla", &filter());
        assert_eq!(tokens, vec!["tesla"]);
    }

    #[test]
    fn test_configured_stopwords_ignore_ascii_case() {
        let f = TokenFilter::new(["TSLA", "진짜"], 2);
        let tokens = SimpleSplit.tokenize("TSLA tsla 진짜 nvda", &f);
        assert_eq!(tokens, vec!["nvda"]);
    }

    #[test]
    fn test_empty_and_symbol_only_input() {
        assert!(SimpleSplit.tokenize("", &filter()).is_empty());
        assert!(SimpleSplit.tokenize("!!! ㅋㅋㅋ ...", &filter()).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "삼성전자 실적 발표 삼성전자 상승 SAMSUNG";
        let first = SimpleSplit.tokenize(text, &filter());
        for _ in 0..5 {
            assert_eq!(SimpleSplit.tokenize(text, &filter()), first);
        }
    }

    #[test]
    fn test_min_length_counts_characters() {
        let f = TokenFilter::new(Vec::<String>::new(), 3);
        assert!(f.keep("테슬라"));
        assert!(!f.keep("주가"));
        assert!(f.keep("abc"));
    }

    #[test]
    fn test_noun_strips_particles() {
        let analyzer = NounAnalyzer::default();
        assert_eq!(analyzer.noun("테슬라가").as_deref(), Some("테슬라"));
        assert_eq!(analyzer.noun("나스닥에서는").as_deref(), Some("나스닥"));
        assert_eq!(analyzer.noun("금리는").as_deref(), Some("금리"));
        assert_eq!(analyzer.noun("주가").as_deref(), Some("주가"));
        assert_eq!(analyzer.noun("nvda").as_deref(), Some("nvda"));
    }

    #[test]
    fn test_noun_drops_predicates() {
        let analyzer = NounAnalyzer::default();
        assert_eq!(analyzer.noun("떡상했다"), None);
        assert_eq!(analyzer.noun("좋습니다"), None);
    }

    #[test]
    fn test_lexicon_words_kept_whole() {
        let analyzer = NounAnalyzer::new(["마이크로"]);
        assert_eq!(analyzer.noun("마이크로").as_deref(), Some("마이크로"));
        assert_eq!(NounAnalyzer::default().noun("마이크로").as_deref(), Some("마이크"));
    }

    #[test]
    fn test_noun_tokenizer() {
        let analyzer = NounAnalyzer::default();
        let tokenizer = MorphologicalNoun::new(&analyzer);
        let tokens = tokenizer.tokenize("테슬라가 진짜 떡상했다 금리는 NVDA도", &filter());
        assert_eq!(tokens, vec!["테슬라", "금리", "nvda"]);
    }

    #[test]
    fn test_build_tokenizer() {
        let analyzer = NounAnalyzer::default();
        assert_eq!(build_tokenizer(TokenizerKind::Simple, &analyzer).name(), "simple");
        assert_eq!(build_tokenizer(TokenizerKind::Noun, &analyzer).name(), "noun");
    }
}
