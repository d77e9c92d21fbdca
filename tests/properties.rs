//! Invariant checks over the pipeline's building blocks (§8's "universal
//! invariants" list): guard satisfaction, inverse mirroring, dedup
//! idempotence, and deictic idempotence.

use ares::deictic::{is_already_resolved, resolve_deictics, LocationMention};
use ares::filters::dedup::dedup_relations;
use ares::inverse::with_inverses;
use ares::model::{Entity, Evidence, EvidenceSource, Extractor, Qualifiers, Relation};
use ares::schema::{passes_guard, EntityType, Predicate};

fn relation(subj: &str, pred: Predicate, obj: &str) -> Relation {
    Relation {
        id: format!("{subj}-{pred:?}-{obj}"),
        subj: subj.into(),
        pred,
        obj: obj.into(),
        confidence: 0.8,
        evidence: vec![Evidence {
            doc_id: "doc1".into(),
            sentence_index: 0,
            span_start: 0,
            span_end: 10,
            text: String::new(),
            source: EvidenceSource::Rule,
        }],
        qualifiers: Qualifiers::default(),
        extractor: Extractor::Narrative("test".into()),
    }
}

/// Every relation C13 mirrors must itself pass the guard for its (now
/// swapped) subject/object types.
#[test]
fn inverse_relations_satisfy_the_guard() {
    let person_a = EntityType::Person;
    let place_b = EntityType::Place;

    let relations = vec![relation("a", Predicate::ParentOf, "b"), relation("c", Predicate::LivesIn, "d")];
    let mirrored = with_inverses(relations);

    for r in &mirrored {
        let (subj_type, obj_type) = match r.extractor {
            Extractor::Inverse => match r.pred {
                Predicate::ChildOf => (person_a, person_a),
                Predicate::LivesIn => (person_a, place_b),
                _ => continue,
            },
            _ => continue,
        };
        assert!(passes_guard(r.pred, subj_type, obj_type), "mirrored relation {r:?} fails the guard");
    }
    assert!(mirrored.iter().any(|r| r.pred == Predicate::ChildOf));
}

/// Symmetric predicates are never mirrored — a second copy would just be a
/// same-triple duplicate C8 has to collapse again.
#[test]
fn symmetric_predicates_produce_no_mirror() {
    let relations = vec![relation("a", Predicate::MarriedTo, "b"), relation("c", Predicate::SiblingOf, "d")];
    let mirrored = with_inverses(relations);
    assert_eq!(mirrored.len(), 2, "symmetric predicates must not gain an inverse mirror");
}

/// After C8, no two surviving relations share a `(subj, pred, obj)` triple.
#[test]
fn dedup_leaves_no_duplicate_triples() {
    let relations = vec![
        relation("a", Predicate::MarriedTo, "b"),
        relation("a", Predicate::MarriedTo, "b"),
        relation("a", Predicate::MarriedTo, "b"),
        relation("c", Predicate::LivesIn, "d"),
    ];
    let (deduped, _stats) = dedup_relations(relations);
    let mut seen = std::collections::HashSet::new();
    for r in &deduped {
        assert!(seen.insert(r.key()), "duplicate triple survived dedup: {:?}", r.key());
    }
    assert_eq!(deduped.len(), 2);
}

/// Running dedup on an already-deduplicated set is a no-op (idempotence).
#[test]
fn dedup_is_idempotent() {
    let relations = vec![relation("a", Predicate::MarriedTo, "b"), relation("c", Predicate::LivesIn, "d")];
    let (once, _) = dedup_relations(relations);
    let before = once.len();
    let (twice, stats) = dedup_relations(once);
    assert_eq!(twice.len(), before);
    assert_eq!(stats.merged_count, 0);
}

/// §8: given text with no `there`/`here` left unresolved, C10 is a no-op.
#[test]
fn deictic_resolution_is_a_noop_on_already_resolved_text() {
    let text = "Frodo lived in Rivendell for many years.";
    let locations = vec![LocationMention {
        canonical: "Rivendell".to_string(),
        entity_type: EntityType::Place,
        start: 9,
    }];
    assert!(is_already_resolved(text, &locations));
    assert_eq!(resolve_deictics(text, &locations), text);
}

/// Every entity's canonical form must be non-empty — a structural
/// invariant any constructed `Entity` should uphold regardless of source.
#[test]
fn entity_canonical_is_never_empty() {
    let entity = Entity::new("e1", EntityType::Person, "Aragorn");
    assert!(!entity.canonical.is_empty());
}
