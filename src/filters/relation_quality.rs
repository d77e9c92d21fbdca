//! Relation quality filter (C7) — Precision Layer 2 (§4.9).
//!
//! Five ordered, independently-configurable filters. Grounded on the
//! teacher's `grammar/discourse.rs` style of small pure functions operating
//! over plain `Vec`s rather than a mutable visitor, so each filter below
//! takes and returns `Vec<Relation>` and reports its own drop counter.

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::lexicon::SIBLING_MARKERS;
use crate::model::Relation;
use crate::schema::Predicate;

#[derive(Debug, Clone, Default)]
pub struct RelationFilterStats {
    pub married_to_suppressed: u32,
    pub sibling_suppressed: u32,
    pub family_friend_suppressed: u32,
    pub appositive_suppressed: u32,
    pub confidence_suppressed: u32,
}

const MARRIED_TO_WINDOW: i64 = 2;
const MARRIED_TO_MIN_CONFIDENCE: f32 = 0.75;

/// `entity_names` maps each entity id (as it appears in `Relation::subj`/
/// `.obj`) to its canonical surface form, since `detect_siblings` finds
/// siblings by name in `doc_text` but relations carry opaque ids — the two
/// sibling-aware filters below resolve ids through this map before
/// comparing against the detected sibling name set.
pub fn filter_relations(
    relations: Vec<Relation>,
    doc_text: &str,
    config: &EngineConfig,
    entity_names: &HashMap<String, String>,
) -> (Vec<Relation>, RelationFilterStats) {
    let mut stats = RelationFilterStats::default();

    let relations = suppress_married_to_proximity(relations, &mut stats);
    let siblings = detect_siblings(doc_text);
    let relations = suppress_sibling_parent_child(relations, &siblings, entity_names, &mut stats);
    let relations = suppress_family_friends_enemies(relations, &siblings, entity_names, &mut stats);
    let relations = resolve_appositive_vs_coordination(relations, &mut stats);
    let relations = apply_confidence_floor(relations, config.relation_min_confidence, &mut stats);

    (relations, stats)
}

/// Resolves a relation-side id to the canonical name `detect_siblings`
/// would have found it under, falling back to the id itself when it's not
/// in the map (e.g. hand-built test fixtures that use names as ids).
fn canonical_name(id: &str, entity_names: &HashMap<String, String>) -> String {
    entity_names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

/// §4.9.1: drop `parent_of`/`child_of` candidates whose evidence sentence
/// sits within ±W sentences of a high-confidence `married_to` for the same
/// pair.
fn suppress_married_to_proximity(relations: Vec<Relation>, stats: &mut RelationFilterStats) -> Vec<Relation> {
    let mut married_sentences: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for r in &relations {
        if r.pred == Predicate::MarriedTo && r.confidence > MARRIED_TO_MIN_CONFIDENCE {
            let pair = unordered_pair(&r.subj, &r.obj);
            for e in &r.evidence {
                married_sentences.entry(pair.clone()).or_default().push(e.sentence_index);
            }
        }
    }

    relations
        .into_iter()
        .filter(|r| {
            if !matches!(r.pred, Predicate::ParentOf | Predicate::ChildOf) {
                return true;
            }
            let pair = unordered_pair(&r.subj, &r.obj);
            let Some(married_idxs) = married_sentences.get(&pair) else {
                return true;
            };
            let suppressed = r.evidence.iter().any(|e| {
                married_idxs
                    .iter()
                    .any(|m| (e.sentence_index as i64 - *m as i64).abs() <= MARRIED_TO_WINDOW)
            });
            if suppressed {
                stats.married_to_suppressed += 1;
            }
            !suppressed
        })
        .collect()
}

fn unordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// §4.9.2: scan for sibling-marker phrases and register every named
/// canonical as a sibling.
fn detect_siblings(text: &str) -> HashSet<String> {
    let mut siblings = HashSet::new();
    for marker in SIBLING_MARKERS {
        let mut search_from = 0usize;
        while let Some(idx) = text[search_from..].to_lowercase().find(marker) {
            let abs = search_from + idx;
            if let Some(name) = nearest_following_name(text, abs + marker.len()) {
                siblings.insert(name);
            }
            search_from = abs + marker.len();
        }
    }
    if let Some(idx) = text.to_lowercase().find("their children") {
        for name in names_in_list(&text[idx..(idx + 200).min(text.len())]) {
            siblings.insert(name);
        }
    }
    siblings
}

fn nearest_following_name(text: &str, from: usize) -> Option<String> {
    let tail = text.get(from..(from + 40).min(text.len()))?;
    let word = tail
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty() && w.chars().next().unwrap().is_uppercase())?;
    Some(word.to_string())
}

fn names_in_list(fragment: &str) -> Vec<String> {
    fragment
        .split(|c: char| c == ',' || c == '.')
        .flat_map(|part| part.split_whitespace())
        .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
        .filter(|w| !["Their", "Children", "And"].contains(w))
        .map(|w| w.trim_start_matches("and").to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn suppress_sibling_parent_child(
    relations: Vec<Relation>,
    siblings: &HashSet<String>,
    entity_names: &HashMap<String, String>,
    stats: &mut RelationFilterStats,
) -> Vec<Relation> {
    relations
        .into_iter()
        .filter(|r| {
            let drop = match r.pred {
                Predicate::ParentOf => siblings.contains(&canonical_name(&r.subj, entity_names)),
                Predicate::ChildOf => siblings.contains(&canonical_name(&r.obj, entity_names)),
                _ => false,
            };
            if drop {
                stats.sibling_suppressed += 1;
            }
            !drop
        })
        .collect()
}

/// §4.9.3: build the family-pair set from surviving family relations (plus
/// sibling pairs implied by a shared parent), drop `friends_with`/
/// `enemy_of` within it, and drop `teaches_at` where the subject is a known
/// child (i.e. appears as a `child_of`/`parent_of` object/subject).
fn suppress_family_friends_enemies(
    relations: Vec<Relation>,
    siblings: &HashSet<String>,
    entity_names: &HashMap<String, String>,
    stats: &mut RelationFilterStats,
) -> Vec<Relation> {
    // `siblings` is name-space (from `detect_siblings` scanning `doc_text`),
    // so every relation side is resolved to its canonical name here too —
    // otherwise `family_pairs`/`children` built from ids would never line
    // up with it.
    let mut family_pairs: HashSet<(String, String)> = HashSet::new();
    let mut children: HashSet<String> = HashSet::new();
    for r in &relations {
        let subj_name = canonical_name(&r.subj, entity_names);
        let obj_name = canonical_name(&r.obj, entity_names);
        match r.pred {
            Predicate::ParentOf | Predicate::ChildOf | Predicate::MarriedTo | Predicate::SiblingOf => {
                family_pairs.insert(unordered_pair(&subj_name, &obj_name));
            }
            _ => {}
        }
        if r.pred == Predicate::ParentOf {
            children.insert(obj_name);
        }
        if r.pred == Predicate::ChildOf {
            children.insert(subj_name);
        }
    }
    // Sibling pairs implied by a shared parent.
    let mut children_by_parent: HashMap<String, Vec<String>> = HashMap::new();
    for r in &relations {
        if r.pred == Predicate::ParentOf {
            children_by_parent
                .entry(canonical_name(&r.subj, entity_names))
                .or_default()
                .push(canonical_name(&r.obj, entity_names));
        }
    }
    for kids in children_by_parent.values() {
        for i in 0..kids.len() {
            for j in (i + 1)..kids.len() {
                family_pairs.insert(unordered_pair(&kids[i], &kids[j]));
            }
        }
    }
    for name in siblings {
        children.insert(name.clone());
    }

    relations
        .into_iter()
        .filter(|r| {
            let subj_name = canonical_name(&r.subj, entity_names);
            let obj_name = canonical_name(&r.obj, entity_names);
            let drop = match r.pred {
                Predicate::FriendsWith | Predicate::EnemyOf => family_pairs.contains(&unordered_pair(&subj_name, &obj_name)),
                Predicate::TeachesAt => children.contains(&subj_name),
                _ => false,
            };
            if drop {
                stats.family_friend_suppressed += 1;
            }
            !drop
        })
        .collect()
}

/// §4.9.4: group by `(pred, obj)`; if >1 subjects, decide appositive vs
/// coordination by adjacent-subject text-position gaps.
fn resolve_appositive_vs_coordination(relations: Vec<Relation>, stats: &mut RelationFilterStats) -> Vec<Relation> {
    let mut groups: HashMap<(Predicate, String), Vec<Relation>> = HashMap::new();
    for r in relations {
        groups.entry((r.pred, r.obj.clone())).or_default().push(r);
    }

    let mut out = Vec::new();
    for ((pred, _obj), mut group) in groups {
        if group.len() <= 1 {
            out.extend(group);
            continue;
        }
        group.sort_by_key(|r| r.evidence.first().map(|e| e.span_start).unwrap_or(0));
        let gap_limit = if pred.is_family() { 250 } else { 100 };

        let all_adjacent_within_gap = group.windows(2).all(|pair| {
            let a_end = pair[0].evidence.first().map(|e| e.span_end).unwrap_or(0);
            let b_start = pair[1].evidence.first().map(|e| e.span_start).unwrap_or(0);
            let gap = b_start.saturating_sub(a_end);
            let substring = pair[0].subj.contains(&pair[1].subj) || pair[1].subj.contains(&pair[0].subj);
            gap <= gap_limit && !substring
        });

        if all_adjacent_within_gap {
            out.extend(group);
        } else {
            stats.appositive_suppressed += (group.len() - 1) as u32;
            out.push(group.into_iter().next().unwrap());
        }
    }
    out
}

fn apply_confidence_floor(relations: Vec<Relation>, floor: f32, stats: &mut RelationFilterStats) -> Vec<Relation> {
    relations
        .into_iter()
        .filter(|r| {
            let keep = r.confidence >= floor;
            if !keep {
                stats.confidence_suppressed += 1;
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evidence, EvidenceSource, Extractor, Qualifiers};

    fn relation(id: &str, subj: &str, pred: Predicate, obj: &str, confidence: f32, sentence_index: usize) -> Relation {
        Relation {
            id: id.into(),
            subj: subj.into(),
            pred,
            obj: obj.into(),
            confidence,
            evidence: vec![Evidence {
                doc_id: "doc1".into(),
                sentence_index,
                span_start: 0,
                span_end: 10,
                text: String::new(),
                source: EvidenceSource::Rule,
            }],
            qualifiers: Qualifiers::default(),
            extractor: Extractor::Narrative("test".into()),
        }
    }

    #[test]
    fn married_to_suppresses_nearby_parent_of() {
        let relations = vec![
            relation("r1", "aragorn", Predicate::MarriedTo, "arwen", 0.9, 0),
            relation("r2", "aragorn", Predicate::ParentOf, "arwen", 0.8, 1),
        ];
        let mut stats = RelationFilterStats::default();
        let out = suppress_married_to_proximity(relations, &mut stats);
        assert_eq!(out.len(), 1);
        assert_eq!(stats.married_to_suppressed, 1);
    }

    #[test]
    fn sibling_detection_finds_names_in_children_list() {
        let siblings = detect_siblings("Their children included Ron, Ginny, and Fred.");
        assert!(siblings.contains("Ron"));
        assert!(siblings.contains("Ginny"));
        assert!(siblings.contains("Fred"));
    }

    #[test]
    fn sibling_parent_of_is_dropped() {
        let mut siblings = HashSet::new();
        siblings.insert("ron".to_string());
        let relations = vec![relation("r1", "ron", Predicate::ParentOf, "ginny", 0.8, 0)];
        let mut stats = RelationFilterStats::default();
        let out = suppress_sibling_parent_child(relations, &siblings, &HashMap::new(), &mut stats);
        assert!(out.is_empty());
    }

    #[test]
    fn sibling_parent_of_is_dropped_when_subj_is_an_opaque_id() {
        let mut siblings = HashSet::new();
        siblings.insert("Ron".to_string());
        let mut entity_names = HashMap::new();
        entity_names.insert("e7".to_string(), "Ron".to_string());
        entity_names.insert("e8".to_string(), "Ginny".to_string());
        let relations = vec![relation("r1", "e7", Predicate::ParentOf, "e8", 0.8, 0)];
        let mut stats = RelationFilterStats::default();
        let out = suppress_sibling_parent_child(relations, &siblings, &entity_names, &mut stats);
        assert!(out.is_empty(), "id-keyed relation should still resolve through entity_names to the detected sibling name");
        assert_eq!(stats.sibling_suppressed, 1);
    }

    #[test]
    fn confidence_floor_drops_low_confidence_relation() {
        let relations = vec![relation("r1", "a", Predicate::FriendsWith, "b", 0.3, 0)];
        let mut stats = RelationFilterStats::default();
        let out = apply_confidence_floor(relations, 0.65, &mut stats);
        assert!(out.is_empty());
        assert_eq!(stats.confidence_suppressed, 1);
    }

    #[test]
    fn appositive_group_keeps_only_first_subject() {
        let mut r1 = relation("r1", "a", Predicate::Rules, "gondor", 0.8, 0);
        r1.evidence[0].span_start = 0;
        r1.evidence[0].span_end = 5;
        let mut r2 = relation("r2", "ab", Predicate::Rules, "gondor", 0.8, 0);
        r2.evidence[0].span_start = 500;
        r2.evidence[0].span_end = 505;
        let mut stats = RelationFilterStats::default();
        let out = resolve_appositive_vs_coordination(vec![r1, r2], &mut stats);
        assert_eq!(out.len(), 1);
    }
}
