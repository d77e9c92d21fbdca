//! Coreference resolver (C9): five deterministic strategies plus the
//! well-known-nickname lookup, combined and deduplicated by
//! `(start, end, entity_id)` keeping the highest-confidence link (§4.6).
//!
//! Grounded on the teacher's `grammar/discourse.rs` (`DiscourseContext`
//! walking `refers-to` edges via small pure functions) generalized from a
//! single "point of view" resolver into the six-strategy cascade §4.6
//! requires, and on `grammar/equivalences.rs`'s const-table style for the
//! nickname lookup (now [`crate::lexicon::WELL_KNOWN_NICKNAMES`]).

use std::collections::HashMap;

use regex::Regex;
use std::sync::OnceLock;

use crate::lexicon::{self, Gender, Number};
use crate::model::{Entity, EntityMention, Span};
use crate::schema::EntityType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorefMethod {
    PronounStack,
    TitleBackLink,
    NominalBackLink,
    QuoteAttribution,
    CoordinationFanOut,
    WellKnownNickname,
}

#[derive(Debug, Clone)]
pub struct CorefLink {
    pub mention_start: usize,
    pub mention_end: usize,
    pub entity_id: String,
    pub confidence: f32,
    pub method: CorefMethod,
}

/// An entity mention candidate available to the resolver: an existing
/// entity's span plus enough context (type, canonical, paragraph/sentence
/// position) to score pronoun/title/nominal candidates against.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub canonical: String,
    pub start: usize,
    pub end: usize,
    pub paragraph_idx: usize,
    pub is_subject: bool,
}

/// Mutable coreference state: learned genders extend the curated seed list
/// (§4.6.1 "additional genders are learned from context").
#[derive(Debug, Default)]
pub struct CorefEngine {
    learned_genders: HashMap<String, Gender>,
}

impl CorefEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn gender_of(&self, name: &str) -> Gender {
        let lower = name.to_lowercase();
        if let Some(g) = self.learned_genders.get(&lower) {
            return *g;
        }
        lexicon::NAME_GENDER_SEED
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, g)| *g)
            .unwrap_or(Gender::Unknown)
    }

    /// Scan `text` for gender-revealing context patterns and remember them
    /// (§4.6.1: "their son, NAME" → male, "their daughter, NAME" → female,
    /// "husband|wife NAME").
    pub fn learn_genders(&mut self, text: &str) {
        for (re, gender) in gender_patterns() {
            for caps in re.captures_iter(text) {
                if let Some(name) = caps.get(1) {
                    self.learned_genders.insert(name.as_str().to_lowercase(), *gender);
                }
            }
        }
    }

    /// Run all six strategies and return deduplicated links plus the
    /// virtual spans C12 should treat as literal mentions (§4.6 output).
    pub fn resolve(
        &self,
        text: &str,
        candidates: &[Candidate],
        pronoun_positions: &[(usize, usize)],
    ) -> (Vec<CorefLink>, Vec<EntityMention>) {
        let mut links = Vec::new();

        links.extend(self.resolve_pronouns(text, candidates, pronoun_positions));
        links.extend(resolve_title_back_links(text, candidates));
        links.extend(resolve_nominal_back_links(text, candidates));
        links.extend(resolve_quote_attribution(text, candidates));
        links.extend(resolve_coordination(text, candidates));
        links.extend(resolve_nicknames(text));

        let deduped = dedup_links(links);
        let virtual_spans = deduped
            .iter()
            .map(|link| EntityMention {
                entity_id: link.entity_id.clone(),
                span: Span::new(link.mention_start, link.mention_end),
                virtual_method: Some(format!("{:?}", link.method)),
            })
            .collect();
        (deduped, virtual_spans)
    }

    fn resolve_pronouns(
        &self,
        text: &str,
        candidates: &[Candidate],
        pronoun_positions: &[(usize, usize)],
    ) -> Vec<CorefLink> {
        let mut links = Vec::new();
        for &(start, end) in pronoun_positions {
            let Some(word) = text.get(start..end) else { continue };
            let Some(info) = lexicon::pronoun_info(word) else { continue };

            let mut best: Option<(&Candidate, f32)> = None;
            for cand in candidates.iter().filter(|c| c.end <= start) {
                if !pronoun_type_compatible(info, cand.entity_type) {
                    continue;
                }
                if !gender_compatible(info.gender, self.gender_of(&cand.canonical)) {
                    continue;
                }
                let distance = start - cand.end;
                if distance > 2000 {
                    continue;
                }
                let recency = 1.0 - (distance as f32 / 2000.0).min(1.0);
                let salience = candidates
                    .iter()
                    .filter(|c| c.canonical == cand.canonical && start.saturating_sub(c.end) <= 2000)
                    .count() as f32
                    / candidates.len().max(1) as f32;
                let local_bonus = if distance <= 200 {
                    if cand.is_subject {
                        0.3
                    } else {
                        0.15
                    }
                } else {
                    0.0
                };
                let score = 0.6 * recency + 0.4 * salience + local_bonus;
                if best.map(|(_, b)| score > b).unwrap_or(true) {
                    best = Some((cand, score));
                }
            }
            if let Some((cand, score)) = best {
                let confidence = if score > 0.3 {
                    (0.5 + score * 0.5).min(0.9)
                } else {
                    continue;
                };
                links.push(CorefLink {
                    mention_start: start,
                    mention_end: end,
                    entity_id: cand.entity_id.clone(),
                    confidence: confidence.min(0.65).max(0.3),
                    method: CorefMethod::PronounStack,
                });
            }
        }
        links
    }
}

fn pronoun_type_compatible(info: &lexicon::PronounInfo, entity_type: EntityType) -> bool {
    match (info.number, entity_type) {
        (Number::Singular, EntityType::Org) => false,
        _ => match info.gender {
            Gender::Neuter => entity_type != EntityType::Person,
            _ => true,
        },
    }
}

fn gender_compatible(pronoun_gender: Gender, entity_gender: Gender) -> bool {
    match (pronoun_gender, entity_gender) {
        (Gender::Male, Gender::Female) | (Gender::Female, Gender::Male) => false,
        _ => true,
    }
}

fn gender_patterns() -> &'static Vec<(Regex, Gender)> {
    static PATTERNS: OnceLock<Vec<(Regex, Gender)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)their\s+son,?\s+([A-Z][a-z]+)").unwrap(), Gender::Male),
            (Regex::new(r"(?i)their\s+daughter,?\s+([A-Z][a-z]+)").unwrap(), Gender::Female),
            (Regex::new(r"(?i)husband\s+([A-Z][a-z]+)").unwrap(), Gender::Male),
            (Regex::new(r"(?i)wife\s+([A-Z][a-z]+)").unwrap(), Gender::Female),
            (Regex::new(r"(?i)brother,?\s+([A-Z][a-z]+)").unwrap(), Gender::Male),
            (Regex::new(r"(?i)sister,?\s+([A-Z][a-z]+)").unwrap(), Gender::Female),
        ]
    })
}

fn resolve_title_back_links(text: &str, candidates: &[Candidate]) -> Vec<CorefLink> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\bthe\s+(king|queen|company|city|wizard|president|mayor)\b").unwrap());
    let mut links = Vec::new();
    for caps in re.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let keyword = caps.get(1).unwrap().as_str().to_lowercase();
        let expected_type = match keyword.as_str() {
            "king" | "queen" | "wizard" | "president" | "mayor" => EntityType::Person,
            "company" => EntityType::Org,
            "city" => EntityType::Place,
            _ => EntityType::Misc,
        };
        if let Some(cand) = candidates
            .iter()
            .filter(|c| c.end <= m.start() && c.entity_type == expected_type)
            .max_by_key(|c| c.end)
        {
            let confidence = if cand.canonical.to_lowercase().contains(&keyword) {
                0.90
            } else {
                match expected_type {
                    EntityType::Person => 0.65,
                    _ => 0.70,
                }
            };
            links.push(CorefLink {
                mention_start: m.start(),
                mention_end: m.end(),
                entity_id: cand.entity_id.clone(),
                confidence,
                method: CorefMethod::TitleBackLink,
            });
        }
    }
    links
}

fn resolve_nominal_back_links(text: &str, candidates: &[Candidate]) -> Vec<CorefLink> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\bthe\s+(couple|pair|trio)\b").unwrap());
    let mut links = Vec::new();
    for caps in re.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let word = caps.get(1).unwrap().as_str().to_lowercase();
        let count = lexicon::COLLECTIVE_NOUNS.iter().find(|(w, _)| *w == word).map(|(_, n)| *n).unwrap_or(2);
        let persons: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.end <= m.start() && c.entity_type == EntityType::Person)
            .collect();
        for cand in persons.iter().rev().take(count) {
            links.push(CorefLink {
                mention_start: m.start(),
                mention_end: m.end(),
                entity_id: cand.entity_id.clone(),
                confidence: 0.6,
                method: CorefMethod::NominalBackLink,
            });
        }
    }
    links
}

fn resolve_quote_attribution(text: &str, candidates: &[Candidate]) -> Vec<CorefLink> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#""[^"]*""#).unwrap());
    let mut links = Vec::new();
    for m in re.find_iter(text) {
        let after = text.get(m.end()..(m.end() + 30).min(text.len())).unwrap_or("");
        let before = text.get(m.start().saturating_sub(30)..m.start()).unwrap_or("");
        let has_speech_verb = after.split_whitespace().any(lexicon::is_speech_verb)
            || before.split_whitespace().any(lexicon::is_speech_verb);
        if !has_speech_verb {
            continue;
        }
        if let Some(cand) = candidates
            .iter()
            .filter(|c| {
                let dist_before = m.start().saturating_sub(c.end);
                let dist_after = c.start.saturating_sub(m.end());
                c.entity_type == EntityType::Person && (dist_before <= 30 || dist_after <= 30)
            })
            .min_by_key(|c| m.start().abs_diff(c.end).min(c.start.abs_diff(m.end)))
        {
            links.push(CorefLink {
                mention_start: m.start(),
                mention_end: m.end(),
                entity_id: cand.entity_id.clone(),
                confidence: 0.75,
                method: CorefMethod::QuoteAttribution,
            });
        }
    }
    links
}

fn resolve_coordination(text: &str, candidates: &[Candidate]) -> Vec<CorefLink> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\b([A-Z][a-zA-Z]+)\s+and\s+([A-Z][a-zA-Z]+)\s+\w+ed\b").unwrap());
    let mut links = Vec::new();
    for caps in re.captures_iter(text) {
        let full = caps.get(0).unwrap();
        for group in [caps.get(1), caps.get(2)] {
            let Some(name_match) = group else { continue };
            if let Some(cand) = candidates.iter().find(|c| c.canonical == name_match.as_str() && c.entity_type == EntityType::Person) {
                links.push(CorefLink {
                    mention_start: name_match.start(),
                    mention_end: name_match.end(),
                    entity_id: cand.entity_id.clone(),
                    confidence: 0.8,
                    method: CorefMethod::CoordinationFanOut,
                });
            }
        }
        let _ = full;
    }
    links
}

fn resolve_nicknames(text: &str) -> Vec<CorefLink> {
    let mut links = Vec::new();
    for nickname in lexicon::WELL_KNOWN_NICKNAMES {
        let mut search_from = 0;
        while let Some(idx) = text[search_from..].find(nickname.alias) {
            let start = search_from + idx;
            let end = start + nickname.alias.len();
            links.push(CorefLink {
                mention_start: start,
                mention_end: end,
                entity_id: format!("nickname-target::{}", nickname.canonical),
                confidence: 0.95,
                method: CorefMethod::WellKnownNickname,
            });
            search_from = end;
        }
    }
    links
}

/// Deduplicate by `(start, end, entity_id)`, keeping the highest confidence.
fn dedup_links(links: Vec<CorefLink>) -> Vec<CorefLink> {
    let mut best: HashMap<(usize, usize, String), CorefLink> = HashMap::new();
    for link in links {
        let key = (link.mention_start, link.mention_end, link.entity_id.clone());
        best.entry(key)
            .and_modify(|existing| {
                if link.confidence > existing.confidence {
                    *existing = link.clone();
                }
            })
            .or_insert(link);
    }
    let mut result: Vec<_> = best.into_values().collect();
    result.sort_by_key(|l| l.mention_start);
    result
}

#[allow(dead_code)]
fn unused_entity_ref(_: &Entity) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, ty: EntityType, canonical: &str, start: usize, end: usize) -> Candidate {
        Candidate {
            entity_id: id.to_string(),
            entity_type: ty,
            canonical: canonical.to_string(),
            start,
            end,
            paragraph_idx: 0,
            is_subject: true,
        }
    }

    #[test]
    fn title_back_link_prefers_canonical_containing_keyword() {
        let text = "Gandalf the Grey was a wise wizard. The wizard traveled to Rivendell.";
        let candidates = vec![cand("e1", EntityType::Person, "Gandalf the Grey", 0, 16)];
        let links = resolve_title_back_links(text, &candidates);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].entity_id, "e1");
    }

    #[test]
    fn nickname_resolves_big_blue_to_ibm_target() {
        let text = "IBM announced a new product. Big Blue said nothing.";
        let links = resolve_nicknames(text);
        assert_eq!(links.len(), 1);
        assert!(links[0].entity_id.contains("IBM"));
    }

    #[test]
    fn coordination_fan_out_links_both_names() {
        let text = "Harry and Ron traveled together.";
        let candidates = vec![
            cand("e1", EntityType::Person, "Harry", 0, 5),
            cand("e2", EntityType::Person, "Ron", 10, 13),
        ];
        let links = resolve_coordination(text, &candidates);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn dedup_keeps_highest_confidence() {
        let links = vec![
            CorefLink {
                mention_start: 0,
                mention_end: 3,
                entity_id: "e1".into(),
                confidence: 0.5,
                method: CorefMethod::PronounStack,
            },
            CorefLink {
                mention_start: 0,
                mention_end: 3,
                entity_id: "e1".into(),
                confidence: 0.9,
                method: CorefMethod::TitleBackLink,
            },
        ];
        let deduped = dedup_links(links);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].confidence, 0.9);
    }

    #[test]
    fn learned_gender_overrides_unknown() {
        let mut engine = CorefEngine::new();
        engine.learn_genders("Their son, Eldarion, grew tall.");
        assert_eq!(engine.gender_of("eldarion"), Gender::Male);
    }
}
