//! Inverse relation generator (C13, §4.10).
//!
//! For every surviving relation whose predicate has a declared inverse
//! (`Predicate::inverse`, §4.10/schema.rs), mint the mirror relation with
//! subject/object swapped. Symmetric predicates mirror to themselves but
//! are not re-emitted (the dedup pass would otherwise fold them right back
//! together; skipping the self-mirror here keeps C13's output free of
//! guaranteed-duplicate pairs for C8 to clean up). Grounded on the
//! teacher's `graph/closure.rs` fixed-point-free single-pass expansion
//! style: one linear scan, no repeated closure iteration, since inverses
//! never chain.

use crate::model::{Extractor, Relation};

/// Append an inverse mirror for every relation with a declared,
/// non-symmetric inverse. The original relations are preserved unchanged.
pub fn generate_inverses(relations: &[Relation]) -> Vec<Relation> {
    let mut mirrors = Vec::new();
    let mut next_id = relations.len();

    for r in relations {
        let Some(inverse_pred) = r.pred.inverse() else {
            continue;
        };
        if r.pred.is_symmetric() {
            continue;
        }

        next_id += 1;
        mirrors.push(Relation {
            id: format!("inv-{next_id}"),
            subj: r.obj.clone(),
            pred: inverse_pred,
            obj: r.subj.clone(),
            confidence: r.confidence,
            evidence: r.evidence.clone(),
            qualifiers: r.qualifiers.clone(),
            extractor: Extractor::Inverse,
        });
    }

    mirrors
}

/// Generate inverses and append them to the input, the shape the pipeline
/// orchestrator actually wants.
pub fn with_inverses(mut relations: Vec<Relation>) -> Vec<Relation> {
    let mirrors = generate_inverses(&relations);
    relations.extend(mirrors);
    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evidence, EvidenceSource, Qualifiers};
    use crate::schema::Predicate;

    fn relation(subj: &str, pred: Predicate, obj: &str) -> Relation {
        Relation {
            id: "r1".into(),
            subj: subj.into(),
            pred,
            obj: obj.into(),
            confidence: 0.8,
            evidence: vec![Evidence {
                doc_id: "doc1".into(),
                sentence_index: 0,
                span_start: 0,
                span_end: 5,
                text: String::new(),
                source: EvidenceSource::Rule,
            }],
            qualifiers: Qualifiers::default(),
            extractor: Extractor::Narrative("test".into()),
        }
    }

    #[test]
    fn parent_of_generates_child_of_mirror() {
        let relations = vec![relation("aragorn", Predicate::ParentOf, "eldarion")];
        let mirrors = generate_inverses(&relations);
        assert_eq!(mirrors.len(), 1);
        assert_eq!(mirrors[0].subj, "eldarion");
        assert_eq!(mirrors[0].obj, "aragorn");
        assert_eq!(mirrors[0].pred, Predicate::ChildOf);
        assert_eq!(mirrors[0].extractor, Extractor::Inverse);
    }

    #[test]
    fn symmetric_predicate_is_not_mirrored() {
        let relations = vec![relation("aragorn", Predicate::MarriedTo, "arwen")];
        let mirrors = generate_inverses(&relations);
        assert!(mirrors.is_empty());
    }

    #[test]
    fn with_inverses_appends_to_original() {
        let relations = vec![relation("aragorn", Predicate::ParentOf, "eldarion")];
        let out = with_inverses(relations);
        assert_eq!(out.len(), 2);
    }
}
