//! Offline extractor built on capitalization patterns.
//!
//! Text is cleaned (HTML tags, bracketed citations and parenthesized asides
//! removed), split into sentences and scanned for runs of capitalized words.
//! Each pair of neighbouring entity spans in a sentence yields a triple whose
//! predicate is the lowercase phrase between them:
//!
//! ```text
//! "Elon Musk founded SpaceX in 2002."  ->  (Elon Musk, founded, SpaceX)
//! ```

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::TripleExtractor;
use crate::model::Triple;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static CITATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static ASIDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?;]+(?:\s+|$)").unwrap());

/// Words that never belong to an entity span, even when capitalized.
const FUNCTION_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "of", "in", "on", "at", "to", "for", "from",
    "by", "with", "as", "after", "before", "during", "since", "until", "while", "when", "where",
    "however", "although", "though", "later", "then", "also", "there", "here", "its", "his",
    "her", "their", "our", "my", "your", "is", "was", "are", "were",
];

/// Pronouns and generic words that are not useful nodes.
const BLOCKED_SPANS: &[&str] = &[
    "it", "he", "she", "they", "we", "i", "you", "this", "that", "these", "those", "one", "who",
    "which", "him", "them",
];

/// Predicates made only of these words are not relations.
const CONNECTIVES: &[&str] = &["and", "or", "but", "nor", "of", "with", "as"];

/// Last-word (or first-word) hints used to type an entity.
const TYPE_HINTS: &[(&str, &[&str])] = &[
    (
        "Organization",
        &[
            "inc", "corp", "corporation", "ltd", "llc", "company", "co", "group", "university",
            "institute", "agency", "foundation", "bank", "labs", "association",
        ],
    ),
    (
        "Location",
        &[
            "city", "river", "mountain", "mountains", "island", "islands", "county", "lake",
            "ocean", "sea", "valley", "street", "province",
        ],
    ),
];

const PERSON_TITLES: &[&str] = &["mr", "mrs", "ms", "dr", "sir", "prof", "president", "king", "queen"];

/// Titles written with a period that never ends a sentence.
const ABBREVIATED_TITLES: &[&str] = &["mr", "mrs", "ms", "dr", "prof"];

/// Company suffixes written with a period; they end a sentence only when a
/// capitalized word follows.
const ABBREVIATED_SUFFIXES: &[&str] = &["inc", "corp", "ltd", "co", "llc"];

/// Type assigned when no hint matches.
pub const DEFAULT_ENTITY_TYPE: &str = "Concept";

/// Longest predicate (in words) accepted between two spans.
const MAX_PREDICATE_WORDS: usize = 6;

/// Strip markup, citations and asides, then collapse whitespace.
pub fn preprocess(text: &str) -> String {
    let text = HTML_TAG_RE.replace_all(text, " ");
    let text = CITATION_RE.replace_all(&text, "");
    let text = ASIDE_RE.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pattern-based extractor that needs no model.
#[derive(Debug, Clone, Default)]
pub struct HeuristicExtractor {
    /// Extra words (lowercase) that break entity spans
    stop_words: HashSet<String>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add words that must never be part of an entity span.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    /// Synchronous extraction.
    pub fn extract_triples(&self, text: &str) -> Vec<Triple> {
        let cleaned = preprocess(text);
        let mut triples = Vec::new();
        for sentence in split_sentences(&cleaned) {
            self.extract_sentence(sentence, &mut triples);
        }
        debug!(triples = triples.len(), "Heuristic extraction complete");
        triples
    }

    fn extract_sentence(&self, sentence: &str, out: &mut Vec<Triple>) {
        let tokens: Vec<Token> = sentence.split_whitespace().map(Token::parse).collect();
        if tokens.is_empty() {
            return;
        }

        let spans = self.entity_spans(&tokens);
        for pair in spans.windows(2) {
            let (subject, object) = (&pair[0], &pair[1]);
            if subject.blocked || object.blocked {
                continue;
            }
            let Some(predicate) = predicate_between(&tokens[subject.end..object.start]) else {
                continue;
            };
            out.push(Triple::new(
                subject.text.clone(),
                entity_type(&subject.text),
                predicate,
                object.text.clone(),
                entity_type(&object.text),
            ));
        }
    }

    /// Maximal runs of capitalized tokens, split at punctuation and function words.
    fn entity_spans(&self, tokens: &[Token]) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let lower = tokens[i].word.to_lowercase();
            if BLOCKED_SPANS.contains(&lower.as_str()) {
                spans.push(Span {
                    text: tokens[i].word.clone(),
                    start: i,
                    end: i + 1,
                    blocked: true,
                });
                i += 1;
                continue;
            }
            if !self.starts_entity(&tokens[i]) {
                i += 1;
                continue;
            }

            let start = i;
            let mut end = i + 1;
            while end < tokens.len() && !tokens[end - 1].breaks_after && self.starts_entity(&tokens[end]) {
                end += 1;
            }
            let text = tokens[start..end]
                .iter()
                .map(|t| t.word.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if text.chars().count() >= 2 {
                spans.push(Span {
                    text,
                    start,
                    end,
                    blocked: false,
                });
            }
            i = end;
        }
        spans
    }

    fn starts_entity(&self, token: &Token) -> bool {
        let lower = token.word.to_lowercase();
        token.word.chars().next().map_or(false, |c| c.is_uppercase())
            && !FUNCTION_WORDS.contains(&lower.as_str())
            && !BLOCKED_SPANS.contains(&lower.as_str())
            && !self.stop_words.contains(&lower)
    }
}

#[async_trait]
impl TripleExtractor for HeuristicExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Triple>> {
        Ok(self.extract_triples(text))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

#[derive(Debug)]
struct Token {
    /// Word without surrounding punctuation or possessive suffix
    word: String,
    /// Followed by a comma, colon or possessive
    breaks_after: bool,
}

impl Token {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '-');
        let possessive = trimmed
            .strip_suffix("'s")
            .or_else(|| trimmed.strip_suffix("\u{2019}s"));
        let breaks_after = possessive.is_some() || raw.ends_with(&[',', ':', '"', '\''][..]);
        Self {
            word: possessive.unwrap_or(trimmed).to_string(),
            breaks_after,
        }
    }
}

#[derive(Debug)]
struct Span {
    text: String,
    start: usize,
    end: usize,
    blocked: bool,
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for end in SENTENCE_END_RE.find_iter(text) {
        if is_abbreviation(&text[start..end.start()], end.as_str(), &text[end.end()..]) {
            continue;
        }
        sentences.push(&text[start..end.start()]);
        start = end.end();
    }
    sentences.push(&text[start..]);
    sentences
}

/// Whether the terminator after `before` belongs to an abbreviation.
fn is_abbreviation(before: &str, terminator: &str, after: &str) -> bool {
    if terminator.trim_end() != "." {
        return false;
    }
    let Some(last) = before.split_whitespace().last() else {
        return false;
    };
    let last = last.to_lowercase();
    if ABBREVIATED_TITLES.contains(&last.as_str()) {
        return true;
    }
    ABBREVIATED_SUFFIXES.contains(&last.as_str())
        && after.chars().next().map_or(false, |c| !c.is_uppercase())
}

fn predicate_between(tokens: &[Token]) -> Option<String> {
    let words: Vec<String> = tokens
        .iter()
        .map(|t| t.word.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() || words.len() > MAX_PREDICATE_WORDS {
        return None;
    }
    if !words.iter().any(|w| w.chars().any(|c| c.is_alphabetic())) {
        return None;
    }
    if words.iter().all(|w| CONNECTIVES.contains(&w.as_str())) {
        return None;
    }
    Some(words.join(" "))
}

fn entity_type(span: &str) -> &'static str {
    let words: Vec<String> = span
        .split_whitespace()
        .map(|w| w.trim_end_matches('.').to_lowercase())
        .collect();

    if let Some(first) = words.first() {
        if words.len() > 1 && PERSON_TITLES.contains(&first.as_str()) {
            return "Person";
        }
    }
    if let Some(last) = words.last() {
        for &(entity_type, hints) in TYPE_HINTS {
            if hints.contains(&last.as_str()) {
                return entity_type;
            }
        }
    }
    DEFAULT_ENTITY_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spo(triples: &[Triple]) -> Vec<(&str, &str, &str)> {
        triples
            .iter()
            .map(|t| (t.subject.as_str(), t.predicate.as_str(), t.object.as_str()))
            .collect()
    }

    #[test]
    fn test_preprocess_strips_noise() {
        assert_eq!(
            preprocess("<p>Elon Musk (born 1971) founded   SpaceX[1].</p>"),
            "Elon Musk founded SpaceX."
        );
        assert_eq!(preprocess("Tesla [citation needed] builds cars"), "Tesla builds cars");
    }

    #[test]
    fn test_basic_sentence() {
        let triples = HeuristicExtractor::new().extract_triples("Elon Musk founded SpaceX in 2002.");
        assert_eq!(spo(&triples), vec![("Elon Musk", "founded", "SpaceX")]);
        assert_eq!(triples[0].subject_type, DEFAULT_ENTITY_TYPE);
    }

    #[test]
    fn test_leading_determiner_dropped() {
        let triples = HeuristicExtractor::new()
            .extract_triples("The Falcon Rocket was built by SpaceX.");
        assert_eq!(spo(&triples), vec![("Falcon Rocket", "was built by", "SpaceX")]);
    }

    #[test]
    fn test_pronoun_subject_blocked() {
        let triples = HeuristicExtractor::new()
            .extract_triples("He founded Tesla. It makes Cybertruck.");
        assert!(triples.is_empty());
    }

    #[test]
    fn test_multiple_sentences_and_chains() {
        let triples = HeuristicExtractor::new()
            .extract_triples("Ada Lovelace worked with Charles Babbage on Analytical Engine! Babbage lived in London.");
        assert_eq!(
            spo(&triples),
            vec![
                ("Ada Lovelace", "worked with", "Charles Babbage"),
                ("Charles Babbage", "on", "Analytical Engine"),
                ("Babbage", "lived in", "London"),
            ]
        );
    }

    #[test]
    fn test_comma_splits_spans_and_conjunctions_skipped() {
        let triples = HeuristicExtractor::new().extract_triples("Larry Page and Sergey Brin founded Google.");
        assert_eq!(spo(&triples), vec![("Sergey Brin", "founded", "Google")]);

        let triples = HeuristicExtractor::new().extract_triples("Paris, France hosts UNESCO.");
        assert_eq!(spo(&triples), vec![("France", "hosts", "UNESCO")]);
    }

    #[test]
    fn test_entity_types_from_hints() {
        assert_eq!(entity_type("Acme Corp"), "Organization");
        assert_eq!(entity_type("Stanford University"), "Organization");
        assert_eq!(entity_type("Hudson River"), "Location");
        assert_eq!(entity_type("Dr. Grace Hopper"), "Person");
        assert_eq!(entity_type("Rust"), DEFAULT_ENTITY_TYPE);
    }

    #[test]
    fn test_abbreviations_do_not_end_sentences() {
        let triples = HeuristicExtractor::new().extract_triples(
            "Acme Inc. acquired Beta Corp. Dr. Grace Hopper joined Acme Inc.",
        );
        assert_eq!(
            spo(&triples),
            vec![
                ("Acme Inc", "acquired", "Beta Corp"),
                ("Dr Grace Hopper", "joined", "Acme Inc"),
            ]
        );
        assert_eq!(triples[0].subject_type, "Organization");
        assert_eq!(triples[0].object_type, "Organization");
        assert_eq!(triples[1].subject_type, "Person");
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Acme Corp. sold it. Mr. Smith left! Bye"),
            vec!["Acme Corp. sold it", "Mr. Smith left", "Bye"]
        );
        assert_eq!(split_sentences("Beta Corp. Gamma Ltd."), vec!["Beta Corp", "Gamma Ltd", ""]);
    }

    #[test]
    fn test_possessive_and_custom_stop_words() {
        let triples = HeuristicExtractor::new()
            .extract_triples("Musk's SpaceX launched Starlink.");
        assert_eq!(spo(&triples), vec![("SpaceX", "launched", "Starlink")]);

        let triples = HeuristicExtractor::new()
            .with_stop_words(["Yesterday"])
            .extract_triples("Yesterday NASA contracted SpaceX.");
        assert_eq!(spo(&triples), vec![("NASA", "contracted", "SpaceX")]);
    }

    #[tokio::test]
    async fn test_extractor_trait() {
        let extractor = HeuristicExtractor::new();
        assert_eq!(extractor.name(), "heuristic");
        let triples = extractor.extract("Marie Curie discovered Polonium.").await.unwrap();
        assert_eq!(triples.len(), 1);
    }
}
