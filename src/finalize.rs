//! Knowledge-graph finalizer (C14, §4.13).
//!
//! Grounded on the teacher's `graph/prune.rs` pipeline-of-passes style:
//! each cleanup rule is its own small function threaded through a single
//! owning `finalize()` entry point, so the orchestrator gets one call and
//! one `StageStats`-friendly result.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::lexicon::{ALWAYS_JUNK_WORDS, EVENT_WORDS, JUNK_WORDS_IF_SINGLETON, RACE_BLOCKLIST, RACE_KEYWORDS, RACE_WHITELIST};
use crate::model::{Entity, EntityProfile, Relation};
use crate::schema::EntityType;

#[derive(Debug, Clone, Default)]
pub struct FinalizeStats {
    pub heading_drops: u32,
    pub event_retags: u32,
    pub race_noise_drops: u32,
    pub junk_drops: u32,
    pub fragment_drops: u32,
    pub density_pruned: u32,
    pub relations_dropped: u32,
}

pub struct FinalizeOutput {
    pub entities: Vec<Entity>,
    pub fiction_entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub stats: FinalizeStats,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(chapter|prologue|epilogue)\s*[0-9ivxlc]*$").unwrap())
}

/// §4.13: drop chapter/prologue/epilogue headings, retag event-ish PERSON
/// entities as EVENT, drop race noise, drop junk PERSON singletons, drop
/// single-word fragments contained in a multi-word entity, then apply
/// density-dependent pruning and a final relation cleanup sweep.
pub fn finalize(
    entities: Vec<Entity>,
    relations: Vec<Relation>,
    profiles: &BTreeMap<String, EntityProfile>,
) -> FinalizeOutput {
    let mut stats = FinalizeStats::default();

    let entities = drop_headings(entities, &mut stats);
    let entities = retag_events(entities, &mut stats);
    let entities = filter_race_noise(entities, profiles, &mut stats);
    let entities = drop_junk_singletons(entities, profiles, &mut stats);
    let entities = drop_fragments(entities, &mut stats);
    let entities = apply_density_pruning(entities, &relations, profiles, &mut stats);

    let (entities, fiction_entities): (Vec<_>, Vec<_>) =
        entities.into_iter().partition(|e| !e.entity_type.is_fiction());

    let surviving_ids: std::collections::HashSet<&str> =
        entities.iter().chain(fiction_entities.iter()).map(|e| e.id.as_str()).collect();
    let mut relations = relations;
    relations.retain(|r| {
        let keep = surviving_ids.contains(r.subj.as_str())
            && surviving_ids.contains(r.obj.as_str())
            && !r.subj.is_empty()
            && !r.obj.is_empty();
        if !keep {
            stats.relations_dropped += 1;
        }
        keep
    });

    FinalizeOutput { entities, fiction_entities, relations, stats }
}

fn drop_headings(entities: Vec<Entity>, stats: &mut FinalizeStats) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| {
            let is_heading = heading_re().is_match(e.canonical.trim());
            if is_heading {
                stats.heading_drops += 1;
            }
            !is_heading
        })
        .collect()
}

fn retag_events(entities: Vec<Entity>, stats: &mut FinalizeStats) -> Vec<Entity> {
    entities
        .into_iter()
        .map(|mut e| {
            if e.entity_type == EntityType::Person {
                let lower = e.canonical.to_lowercase();
                let is_event_phrase =
                    lower.starts_with("the ") && EVENT_WORDS.iter().any(|w| lower.ends_with(w));
                if is_event_phrase {
                    e.entity_type = EntityType::Event;
                    stats.event_retags += 1;
                }
            }
            e
        })
        .collect()
}

fn filter_race_noise(
    entities: Vec<Entity>,
    profiles: &BTreeMap<String, EntityProfile>,
    stats: &mut FinalizeStats,
) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| {
            if e.entity_type != EntityType::Race {
                return true;
            }
            let canonical = &e.canonical;
            if RACE_BLOCKLIST.iter().any(|b| b.eq_ignore_ascii_case(canonical)) {
                stats.race_noise_drops += 1;
                return false;
            }
            let whitelisted = RACE_WHITELIST.iter().any(|w| w.eq_ignore_ascii_case(canonical));
            let has_keyword = RACE_KEYWORDS.iter().any(|k| canonical.to_lowercase().contains(k));
            let mentions = profiles.get(&e.id).map(|p| p.mention_count).unwrap_or(0);
            let keep = whitelisted || has_keyword || mentions > 2;
            if !keep {
                stats.race_noise_drops += 1;
            }
            keep
        })
        .collect()
}

fn drop_junk_singletons(
    entities: Vec<Entity>,
    profiles: &BTreeMap<String, EntityProfile>,
    stats: &mut FinalizeStats,
) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| {
            if e.entity_type != EntityType::Person {
                return true;
            }
            if ALWAYS_JUNK_WORDS.iter().any(|w| w.eq_ignore_ascii_case(&e.canonical)) {
                stats.junk_drops += 1;
                return false;
            }
            let mentions = profiles.get(&e.id).map(|p| p.mention_count).unwrap_or(1);
            if mentions == 1 && JUNK_WORDS_IF_SINGLETON.iter().any(|w| w.eq_ignore_ascii_case(&e.canonical)) {
                stats.junk_drops += 1;
                return false;
            }
            true
        })
        .collect()
}

/// Drop single-word entities whose token already appears inside some other
/// multi-word entity's canonical (e.g. "Aragorn" alongside "Aragorn Elessar").
fn drop_fragments(entities: Vec<Entity>, stats: &mut FinalizeStats) -> Vec<Entity> {
    let multi_word_canonicals: Vec<String> = entities
        .iter()
        .filter(|e| e.canonical.split_whitespace().count() > 1)
        .map(|e| e.canonical.to_lowercase())
        .collect();

    entities
        .into_iter()
        .filter(|e| {
            if e.canonical.split_whitespace().count() != 1 {
                return true;
            }
            let lower = e.canonical.to_lowercase();
            let is_fragment = multi_word_canonicals
                .iter()
                .any(|mw| mw != &lower && mw.split_whitespace().any(|token| token == lower));
            if is_fragment {
                stats.fragment_drops += 1;
            }
            !is_fragment
        })
        .collect()
}

const DENSITY_ENTITY_THRESHOLD: usize = 12;

/// §4.13: when the entity count exceeds 12 and relation count is at least
/// entity count, keep only entities participating in ≥1 relation or
/// mentioned ≥3 times.
fn apply_density_pruning(
    entities: Vec<Entity>,
    relations: &[Relation],
    profiles: &BTreeMap<String, EntityProfile>,
    stats: &mut FinalizeStats,
) -> Vec<Entity> {
    if entities.len() <= DENSITY_ENTITY_THRESHOLD || relations.len() < entities.len() {
        return entities;
    }

    let mut in_relation: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for r in relations {
        in_relation.insert(r.subj.as_str());
        in_relation.insert(r.obj.as_str());
    }

    entities
        .into_iter()
        .filter(|e| {
            let mentions = profiles.get(&e.id).map(|p| p.mention_count).unwrap_or(0);
            let keep = in_relation.contains(e.id.as_str()) || mentions >= 3;
            if !keep {
                stats.density_pruned += 1;
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, ty: EntityType, canonical: &str) -> Entity {
        Entity::new(id, ty, canonical)
    }

    #[test]
    fn chapter_heading_is_dropped() {
        let entities = vec![entity("e1", EntityType::Misc, "Chapter 3")];
        let mut stats = FinalizeStats::default();
        let out = drop_headings(entities, &mut stats);
        assert!(out.is_empty());
        assert_eq!(stats.heading_drops, 1);
    }

    #[test]
    fn event_phrase_person_is_retagged() {
        let entities = vec![entity("e1", EntityType::Person, "the reunion")];
        let mut stats = FinalizeStats::default();
        let out = retag_events(entities, &mut stats);
        assert_eq!(out[0].entity_type, EntityType::Event);
    }

    #[test]
    fn race_blocklist_entry_is_dropped() {
        let entities = vec![entity("e1", EntityType::Race, "Barty")];
        let profiles = BTreeMap::new();
        let mut stats = FinalizeStats::default();
        let out = filter_race_noise(entities, &profiles, &mut stats);
        assert!(out.is_empty());
    }

    #[test]
    fn fragment_of_multi_word_entity_is_dropped() {
        let entities = vec![entity("e1", EntityType::Person, "Aragorn"), entity("e2", EntityType::Person, "Aragorn Elessar")];
        let mut stats = FinalizeStats::default();
        let out = drop_fragments(entities, &mut stats);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical, "Aragorn Elessar");
    }

    #[test]
    fn finalize_drops_relations_referencing_missing_entities() {
        let entities = vec![entity("e1", EntityType::Person, "Aragorn")];
        let relations = vec![Relation {
            id: "r1".into(),
            subj: "e1".into(),
            pred: crate::schema::Predicate::MarriedTo,
            obj: "e-missing".into(),
            confidence: 0.9,
            evidence: vec![],
            qualifiers: Default::default(),
            extractor: crate::model::Extractor::Narrative("married".into()),
        }];
        let profiles = BTreeMap::new();
        let out = finalize(entities, relations, &profiles);
        assert!(out.relations.is_empty());
        assert_eq!(out.stats.relations_dropped, 1);
    }
}
