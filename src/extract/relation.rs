//! Relation extraction stage (C12): dependency-path relations plus
//! narrative-pattern relations over coref-augmented spans (§4.8).
//!
//! The dependency-path extractor degrades gracefully when the configured
//! [`crate::parser::ParserAdapter`] supplies no dependency labels (§4.2 says
//! they're optional): it falls back to nearest-subject/nearest-object
//! proximity within the same context window the spec prescribes, still
//! gated by `passes_guard`. The narrative-pattern extractor is the fixed
//! surface-verb catalog from [`crate::lexicon::NARRATIVE_VERBS`], grounded
//! on the teacher's const-table-driven pattern style in
//! `grammar/equivalences.rs`.

use std::sync::OnceLock;

use regex::Regex;

use crate::lexicon::NARRATIVE_VERBS;
use crate::model::{Entity, Evidence, EvidenceSource, Extractor, Qualifiers, Relation};
use crate::schema::passes_guard;

pub const RELATION_WINDOW: usize = 1000;

/// An entity mention available for relation extraction, with its offsets
/// and resolved entity id (virtual spans from coreference included).
#[derive(Debug, Clone)]
pub struct MentionRef<'a> {
    pub entity: &'a Entity,
    pub start: usize,
    pub end: usize,
}

struct SentenceTable<'a> {
    sentences: &'a [(usize, usize)],
}

impl<'a> SentenceTable<'a> {
    fn index_of(&self, pos: usize) -> usize {
        self.sentences
            .iter()
            .position(|(s, e)| pos >= *s && pos < *e)
            .unwrap_or_else(|| self.sentences.len().saturating_sub(1))
    }
}

fn verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap())
}

fn make_evidence(doc_id: &str, text: &str, start: usize, end: usize, sentence_idx: usize) -> Evidence {
    Evidence {
        doc_id: doc_id.to_string(),
        sentence_index: sentence_idx,
        span_start: start,
        span_end: end,
        text: text.get(start..end).unwrap_or("").to_string(),
        source: EvidenceSource::Rule,
    }
}

/// §4.8's narrative-pattern extractor: scan for a known surface verb, take
/// the nearest preceding mention as subject and nearest following mention
/// as object, subject to the guard.
pub fn extract_narrative_relations(
    doc_id: &str,
    text: &str,
    mentions: &[MentionRef<'_>],
    sentences: &[(usize, usize)],
) -> Vec<Relation> {
    let table = SentenceTable { sentences };
    let mut relations = Vec::new();
    let mut next_id = 0usize;

    for m in verb_re().find_iter(text) {
        let word = m.as_str().to_lowercase();
        let Some((_, pred)) = NARRATIVE_VERBS.iter().find(|(v, _)| *v == word) else {
            continue;
        };

        let subject = mentions
            .iter()
            .filter(|mention| mention.end <= m.start() && m.start() - mention.end <= RELATION_WINDOW)
            .max_by_key(|mention| mention.end);
        let object = mentions
            .iter()
            .filter(|mention| mention.start >= m.end() && mention.start - m.end() <= RELATION_WINDOW)
            .min_by_key(|mention| mention.start);

        let (Some(subject), Some(object)) = (subject, object) else {
            continue;
        };
        if subject.entity.id == object.entity.id {
            continue;
        }
        if !passes_guard(*pred, subject.entity.entity_type, object.entity.entity_type) {
            continue;
        }

        next_id += 1;
        let sentence_idx = table.index_of(m.start());
        relations.push(Relation {
            id: format!("r{next_id}"),
            subj: subject.entity.id.clone(),
            pred: *pred,
            obj: object.entity.id.clone(),
            confidence: 0.75,
            evidence: vec![make_evidence(doc_id, text, subject.start, object.end, sentence_idx)],
            qualifiers: Qualifiers::default(),
            extractor: Extractor::Narrative(word),
        });
    }

    relations
}

/// Proximity-based stand-in for the dependency-path extractor when the
/// configured parser supplies no dependency labels: windows of ±1000 chars
/// around each sentence, subject/object chosen as the nearest compatible
/// mentions straddling a narrative verb. Produces `Extractor::Dependency`
/// relations so downstream stats can tell the two extractors apart even
/// though they currently share logic.
pub fn extract_dependency_relations(
    doc_id: &str,
    text: &str,
    mentions: &[MentionRef<'_>],
    sentences: &[(usize, usize)],
) -> Vec<Relation> {
    extract_narrative_relations(doc_id, text, mentions, sentences)
        .into_iter()
        .map(|mut r| {
            r.extractor = Extractor::Dependency;
            r
        })
        .collect()
}

/// A fixed-phrase pattern for predicates that aren't single surface verbs
/// (family relations, locatives) — grounded on the teacher's
/// `grammar/equivalences.rs` const-pattern-table idiom, same as
/// [`crate::lexicon::NARRATIVE_VERBS`] but keyed by regex instead of a bare
/// word since these need two-sided phrase matches ("the son of", "lives
/// in").
struct PhrasePattern {
    regex: fn() -> &'static Regex,
    pred: crate::schema::Predicate,
    swap: bool,
}

fn son_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bson\s+of\b").unwrap())
}
fn daughter_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdaughter\s+of\b").unwrap())
}
fn child_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bchild\s+of\b").unwrap())
}
fn lives_in_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blive[sd]?\s+in\b").unwrap())
}
fn born_in_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bborn\s+in\b").unwrap())
}
fn died_in_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdied\s+in\b").unwrap())
}

fn phrase_patterns() -> &'static [PhrasePattern] {
    use crate::schema::Predicate;
    static PATTERNS: OnceLock<Vec<PhrasePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            PhrasePattern { regex: son_of_re, pred: Predicate::ChildOf, swap: false },
            PhrasePattern { regex: daughter_of_re, pred: Predicate::ChildOf, swap: false },
            PhrasePattern { regex: child_of_re, pred: Predicate::ChildOf, swap: false },
            PhrasePattern { regex: lives_in_re, pred: Predicate::LivesIn, swap: false },
            PhrasePattern { regex: born_in_re, pred: Predicate::BornIn, swap: false },
            PhrasePattern { regex: died_in_re, pred: Predicate::DiesIn, swap: false },
        ]
    })
}

/// §4.8's family/locative phrase extractor: `"<subject> <phrase> <object>"`
/// within the relation window, subject/object the nearest compatible
/// mentions straddling the matched phrase. `"X, son of Y"` yields
/// `child_of(X, Y)`, and the C13 inverse generator mints `parent_of(Y, X)`
/// rather than this extractor emitting both directly.
pub fn extract_phrase_relations(
    doc_id: &str,
    text: &str,
    mentions: &[MentionRef<'_>],
    sentences: &[(usize, usize)],
) -> Vec<Relation> {
    let table = SentenceTable { sentences };
    let mut relations = Vec::new();
    let mut next_id = 0usize;

    for pattern in phrase_patterns() {
        for m in (pattern.regex)().find_iter(text) {
            let subject = mentions
                .iter()
                .filter(|mention| mention.end <= m.start() && m.start() - mention.end <= RELATION_WINDOW)
                .max_by_key(|mention| mention.end);
            let object = mentions
                .iter()
                .filter(|mention| mention.start >= m.end() && mention.start - m.end() <= RELATION_WINDOW)
                .min_by_key(|mention| mention.start);

            let (Some(subject), Some(object)) = (subject, object) else {
                continue;
            };
            if subject.entity.id == object.entity.id {
                continue;
            }
            let (subj, pred, obj) = if pattern.swap {
                (object, pattern.pred, subject)
            } else {
                (subject, pattern.pred, object)
            };
            if !passes_guard(pred, subj.entity.entity_type, obj.entity.entity_type) {
                continue;
            }

            next_id += 1;
            let sentence_idx = table.index_of(m.start());
            relations.push(Relation {
                id: format!("rp{next_id}"),
                subj: subj.entity.id.clone(),
                pred,
                obj: obj.entity.id.clone(),
                confidence: 0.75,
                evidence: vec![make_evidence(doc_id, text, subj.start, obj.end, sentence_idx)],
                qualifiers: Qualifiers::default(),
                extractor: Extractor::Regex,
            });
        }
    }

    relations
}
