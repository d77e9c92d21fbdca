//! Parser adapter contract (C3) and the default rule-based implementation.
//!
//! §4.2: the core consumes a parser service for tokenization, sentence
//! segmentation, and NER; §1 explicitly forbids a neural model on the core
//! path, so [`RuleBasedParser`] is the only implementation shipped here —
//! callers needing spaCy-grade tagging provide their own [`ParserAdapter`].
//! Grounded on the teacher's collaborator-trait pattern (§9 "optional
//! collaborators... treat as abstract capabilities behind small
//! interfaces").

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AresResult, ParseError};
use crate::schema::EntityType;

/// Penn Treebank-ish POS tag, per §6's tagset note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Propn,
    Nn,
    Nns,
    Vb,
    Prp,
    PrpDollar,
    Dt,
    Jj,
    Wp,
    Other,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: Pos,
    pub start_char: usize,
    pub end_char: usize,
    pub sentence_idx: usize,
    pub paragraph_idx: usize,
}

#[derive(Debug, Clone)]
pub struct NerMention {
    pub entity_type: EntityType,
    pub canonical: String,
    pub start: usize,
    pub end: usize,
    pub ner_label: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParseMeta {
    pub classifier_rejected: u32,
    pub context_only_mentions: u32,
    pub durable_mentions: u32,
    pub rejected_mentions: u32,
}

/// Output of one `parse()` call (§6's parser contract).
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub tokens: Vec<Token>,
    pub entities: Vec<NerMention>,
    pub meta: ParseMeta,
}

/// A character-offset sentence boundary within the normalized text.
#[derive(Debug, Clone, Copy)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
    pub paragraph_idx: usize,
}

/// The contract required of an underlying sentence/segment/NER/POS parser
/// (§4.2). Implementations may be in-process (as here) or a cross-process
/// call to an external service.
pub trait ParserAdapter: Send + Sync {
    fn parse(&self, text: &str) -> AresResult<ParseOutput>;

    /// Sentence segmentation over the normalized text.
    fn segment_sentences(&self, text: &str) -> AresResult<Vec<SentenceSpan>>;
}

/// Deterministic, non-neural parser: sentence segmentation via punctuation
/// boundaries, capitalized-run NER, Penn-ish POS by closed-class word lists.
pub struct RuleBasedParser;

impl RuleBasedParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").unwrap())
}

fn capitalized_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z'-]*(?:\s+[A-Z][a-zA-Z'-]*)*\b").unwrap())
}

impl ParserAdapter for RuleBasedParser {
    fn segment_sentences(&self, text: &str) -> AresResult<Vec<SentenceSpan>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut paragraph_idx = 0usize;
        let mut spans = Vec::new();
        let mut para_cursor = 0usize;
        for para in split_paragraphs(text) {
            for m in sentence_boundary_re().find_iter(para.text) {
                let start = para.offset + m.start();
                let end = para.offset + m.end();
                if text
                    .get(start..end)
                    .map(|s| s.trim().is_empty())
                    .unwrap_or(true)
                {
                    continue;
                }
                spans.push(SentenceSpan {
                    start,
                    end,
                    paragraph_idx,
                });
            }
            paragraph_idx += 1;
            para_cursor = para.offset + para.text.len();
        }
        let _ = para_cursor;
        Ok(spans)
    }

    fn parse(&self, text: &str) -> AresResult<ParseOutput> {
        if text.is_empty() {
            return Ok(ParseOutput::default());
        }
        let sentences = self.segment_sentences(text)?;
        let mut tokens = Vec::new();
        for (sent_idx, sentence) in sentences.iter().enumerate() {
            let Some(slice) = text.get(sentence.start..sentence.end) else {
                return Err(ParseError::OffsetOutOfBounds {
                    offset: sentence.end,
                    len: text.len(),
                }
                .into());
            };
            let mut cursor = sentence.start;
            for word in slice.split_whitespace() {
                let Some(rel_start) = slice[cursor - sentence.start..].find(word) else {
                    continue;
                };
                let start = cursor + rel_start;
                let end = start + word.len();
                cursor = end;
                tokens.push(Token {
                    text: word.to_string(),
                    lemma: word.to_lowercase(),
                    pos: classify_pos(word),
                    start_char: start,
                    end_char: end,
                    sentence_idx: sent_idx,
                    paragraph_idx: sentence.paragraph_idx,
                });
            }
        }

        let mut entities = Vec::new();
        for m in capitalized_run_re().find_iter(text) {
            let word = m.as_str();
            if crate::lexicon::is_stopword(word) || crate::lexicon::is_pronoun(word) {
                continue;
            }
            entities.push(NerMention {
                entity_type: EntityType::Misc,
                canonical: word.to_string(),
                start: m.start(),
                end: m.end(),
                ner_label: "PROPN".to_string(),
            });
        }

        Ok(ParseOutput {
            tokens,
            entities,
            meta: ParseMeta::default(),
        })
    }
}

struct Paragraph<'a> {
    text: &'a str,
    offset: usize,
}

fn split_paragraphs(text: &str) -> Vec<Paragraph<'_>> {
    let mut paragraphs = Vec::new();
    let mut offset = 0usize;
    for chunk in text.split("\n\n") {
        paragraphs.push(Paragraph { text: chunk, offset });
        offset += chunk.len() + 2;
    }
    paragraphs
}

fn classify_pos(word: &str) -> Pos {
    let lower = word.to_lowercase();
    if crate::lexicon::is_pronoun(&lower) {
        return if lower.ends_with('s') && lower != "his" {
            Pos::PrpDollar
        } else {
            Pos::Prp
        };
    }
    match lower.as_str() {
        "the" | "a" | "an" => Pos::Dt,
        "who" | "what" | "which" => Pos::Wp,
        _ => {
            if word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                Pos::Propn
            } else if word.ends_with("ing") || word.ends_with("ed") {
                Pos::Vb
            } else if word.ends_with('s') {
                Pos::Nns
            } else {
                Pos::Nn
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_simple_sentences() {
        let parser = RuleBasedParser::new();
        let spans = parser
            .segment_sentences("Aragorn married Arwen. They ruled Gondor.")
            .unwrap();
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn empty_text_has_no_sentences() {
        let parser = RuleBasedParser::new();
        let spans = parser.segment_sentences("").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn ner_pass_finds_capitalized_runs() {
        let parser = RuleBasedParser::new();
        let out = parser.parse("Aragorn married Arwen.").unwrap();
        let names: Vec<_> = out.entities.iter().map(|e| e.canonical.as_str()).collect();
        assert!(names.contains(&"Aragorn"));
        assert!(names.contains(&"Arwen"));
    }

    #[test]
    fn tokens_carry_consistent_offsets() {
        let parser = RuleBasedParser::new();
        let text = "Aragorn married Arwen.";
        let out = parser.parse(text).unwrap();
        for tok in &out.tokens {
            assert_eq!(&text[tok.start_char..tok.end_char], tok.text);
        }
    }
}
