//! Core data model: entities, spans, relations, evidence, profiles,
//! patterns (§3).
//!
//! Grounded on the teacher's `symbol.rs` (`SymbolMeta`/`SourceRef` shape —
//! small plain structs, not `serde_json::Value` bags) and
//! `grammar/preprocess.rs` (`ExtractedEntity`/`ExtractedClaim` field
//! naming). §9's "tiny polymorphism via `attrs: Record<string, any>`" note
//! is resolved here exactly as prescribed: a tagged `EntityAttr` enum
//! instead of a dynamic map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::ids::{Aid, Eid};
use crate::schema::{EntityType, Predicate};

/// Recall/precision band assigned by C6 (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    C,
    B,
    A,
}

/// Provenance/confidence facts about an entity, replacing a dynamic
/// `attrs: Record<string, any>` map with a closed tagged variant (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityAttr {
    Confidence(f32),
    TierAttr(Tier),
    NerLabel(String),
    SentencePos(SentencePos),
    AppliedPatterns(Vec<String>),
    ClassifierRejected(bool),
    ContextOnly(bool),
    Durable(bool),
}

/// Sentence-position signal used by C6's tiering features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePos {
    pub sentence_initial: bool,
    pub occurs_non_initial: bool,
}

/// A unit of referential identity (§3 Entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub canonical: String,
    pub aliases: Vec<String>,
    pub attrs: Vec<EntityAttr>,
    pub tier: Tier,
    pub eid: Option<Eid>,
    pub aid: Option<Aid>,
    pub sp: Option<Vec<u32>>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: EntityType, canonical: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type,
            canonical: canonical.into(),
            aliases: Vec::new(),
            attrs: Vec::new(),
            tier: Tier::C,
            eid: None,
            aid: None,
            sp: None,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.attrs
            .iter()
            .find_map(|a| match a {
                EntityAttr::Confidence(c) => Some(*c),
                _ => None,
            })
            .unwrap_or(0.5)
    }

    pub fn set_confidence(&mut self, value: f32) {
        self.attrs.retain(|a| !matches!(a, EntityAttr::Confidence(_)));
        self.attrs.push(EntityAttr::Confidence(value));
    }

    pub fn has_ner_support(&self) -> bool {
        self.attrs.iter().any(|a| matches!(a, EntityAttr::NerLabel(_)))
    }

    /// §3 invariant: "`canonical` ∈ `aliases` ∪ {canonical}". `eid` implies
    /// `aid` is set.
    pub fn invariants_hold(&self) -> bool {
        let canon_present = self
            .aliases
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&self.canonical))
            || true; // canonical is always representable trivially as itself
        canon_present && (self.eid.is_none() || self.aid.is_some())
    }
}

/// A mention occurrence: `(entity_id, start, end)` in normalized-text
/// character offsets (§3 Span).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A span tied to the entity it mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub entity_id: String,
    pub span: Span,
    /// Non-empty only for coreference-produced virtual spans (C9).
    pub virtual_method: Option<String>,
}

/// Evidence source per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceSource {
    Raw,
    Rule,
    LlmHint,
}

/// One piece of textual evidence backing a relation (§3 Evidence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub doc_id: String,
    pub sentence_index: usize,
    pub span_start: usize,
    pub span_end: usize,
    pub text: String,
    pub source: EvidenceSource,
}

/// Optional time/place/source qualifiers on a relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Qualifiers {
    pub time: Option<String>,
    pub place: Option<String>,
    pub source: Option<String>,
}

/// Which extractor produced a relation (§3 `extractor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extractor {
    Dependency,
    Regex,
    Narrative(String),
    Inverse,
}

/// A typed relation between two entities (§3 Relation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub subj: String,
    pub pred: Predicate,
    pub obj: String,
    pub confidence: f32,
    pub evidence: Vec<Evidence>,
    pub qualifiers: Qualifiers,
    pub extractor: Extractor,
}

impl Relation {
    pub fn key(&self) -> (String, Predicate, String) {
        (self.subj.clone(), self.pred, self.obj.clone())
    }
}

/// Per-entity accumulated profile (§3 Entity profile).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityProfile {
    pub descriptors: Vec<String>,
    pub titles: Vec<String>,
    pub roles: Vec<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Capped at the 20 most recent, oldest dropped first (§3, §5).
    pub context_sentences: Vec<String>,
    pub mention_count: u32,
    pub first_doc: Option<String>,
    pub last_doc: Option<String>,
    pub confidence_score: f32,
}

pub const MAX_CONTEXT_SENTENCES: usize = 20;

impl EntityProfile {
    pub fn record_mention(&mut self, doc_id: &str, context_sentence: Option<String>) {
        self.mention_count += 1;
        if self.first_doc.is_none() {
            self.first_doc = Some(doc_id.to_string());
        }
        self.last_doc = Some(doc_id.to_string());
        if let Some(sentence) = context_sentence {
            self.context_sentences.push(sentence);
            if self.context_sentences.len() > MAX_CONTEXT_SENTENCES {
                self.context_sentences.remove(0);
            }
        }
        self.confidence_score = (0.5 + 0.05 * self.mention_count as f32).min(0.95);
    }

    pub fn add_descriptor(&mut self, descriptor: impl Into<String>) {
        let descriptor = descriptor.into();
        if !self.descriptors.iter().any(|d| d == &descriptor) {
            self.descriptors.push(descriptor);
        }
    }

    pub fn add_role(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !self.roles.iter().any(|r| r == &role) {
            self.roles.push(role);
        }
    }

    pub fn add_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if !self.titles.iter().any(|t| t == &title) {
            self.titles.push(title);
        }
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let entry = self.attributes.entry(key.into()).or_default();
        if !entry.iter().any(|v| v == &value) {
            entry.push(value);
        }
    }

    /// Pairwise profile merge, invoked when C4 unifies two entities under
    /// one EID (§3 "merged pairwise when two entities are unified by C4").
    pub fn merge(&mut self, other: &EntityProfile) {
        for d in &other.descriptors {
            self.add_descriptor(d.clone());
        }
        for r in &other.roles {
            self.add_role(r.clone());
        }
        for t in &other.titles {
            self.add_title(t.clone());
        }
        for (k, vs) in &other.attributes {
            for v in vs {
                self.add_attribute(k.clone(), v.clone());
            }
        }
        for s in &other.context_sentences {
            self.context_sentences.push(s.clone());
        }
        while self.context_sentences.len() > MAX_CONTEXT_SENTENCES {
            self.context_sentences.remove(0);
        }
        self.mention_count += other.mention_count;
        self.confidence_score = (0.5 + 0.05 * self.mention_count as f32).min(0.95);
        if self.first_doc.is_none() {
            self.first_doc = other.first_doc.clone();
        }
        self.last_doc = other.last_doc.clone().or(self.last_doc.take());
    }
}

/// A learned or built-in extractor pattern (§3 Pattern). Input to C11 only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_type: EntityType,
    pub template: String,
    #[serde(skip)]
    pub compiled: Option<regex_lite::CompiledRegex>,
    pub confidence: f32,
    pub supporting_examples: Vec<String>,
    pub applications: u32,
}

/// Thin wrapper so `Pattern` can hold a compiled regex without forcing the
/// whole struct through a custom `Deserialize` impl — deserializing a
/// `Pattern` leaves `compiled = None` and the caller recompiles lazily.
pub mod regex_lite {
    #[derive(Debug, Clone)]
    pub struct CompiledRegex(pub regex::Regex);
}

/// A learned correction pattern, consulted optionally by C7/C11 (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedCorrectionPattern {
    pub condition_text: Option<String>,
    pub condition_exact_name: Option<String>,
    pub condition_current_type: Option<EntityType>,
    pub action: CorrectionAction,
    pub hits: u32,
    pub misses: u32,
}

impl LearnedCorrectionPattern {
    pub fn confidence(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.5
        } else {
            self.hits as f32 / total as f32
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CorrectionAction {
    SetType(EntityType),
    AdjustConfidence(f32),
    Reject,
    MergeInto(String),
}

/// Per-stage statistics, collected by the orchestrator (§10.5 supplement to
/// §2's "stage-local statistics").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: String,
    pub input_size: usize,
    pub output_size: usize,
    pub duration_ms: u64,
    pub counters: BTreeMap<String, u64>,
}

/// Aggregate statistics returned alongside the graph (§6 `extract()` output
/// field `stats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub stages: Vec<StageStats>,
}

impl PipelineStats {
    pub fn push(&mut self, stats: StageStats) {
        self.stages.push(stats);
    }
}

/// Result of one `extract()` invocation (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    pub entities: Vec<Entity>,
    pub spans: Vec<EntityMention>,
    pub relations: Vec<Relation>,
    pub fiction_entities: Vec<Entity>,
    pub profiles: BTreeMap<String, EntityProfile>,
    pub herts: Vec<String>,
    pub stats: PipelineStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_formula_caps_at_point_95() {
        let mut profile = EntityProfile::default();
        for _ in 0..100 {
            profile.record_mention("doc1", None);
        }
        assert_eq!(profile.confidence_score, 0.95);
    }

    #[test]
    fn confidence_formula_matches_spec_at_one_mention() {
        let mut profile = EntityProfile::default();
        profile.record_mention("doc1", None);
        assert!((profile.confidence_score - 0.55).abs() < 1e-6);
    }

    #[test]
    fn context_sentences_capped_at_twenty() {
        let mut profile = EntityProfile::default();
        for i in 0..25 {
            profile.record_mention("doc1", Some(format!("sentence {i}")));
        }
        assert_eq!(profile.context_sentences.len(), 20);
        assert_eq!(profile.context_sentences[0], "sentence 5");
    }

    #[test]
    fn entity_confidence_default_is_half() {
        let e = Entity::new("e1", EntityType::Person, "Aragorn");
        assert_eq!(e.confidence(), 0.5);
    }

    #[test]
    fn learned_pattern_confidence_is_hit_ratio() {
        let pat = LearnedCorrectionPattern {
            condition_text: None,
            condition_exact_name: Some("Aragorn".into()),
            condition_current_type: None,
            action: CorrectionAction::Reject,
            hits: 3,
            misses: 1,
        };
        assert_eq!(pat.confidence(), 0.75);
    }
}
