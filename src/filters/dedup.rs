//! Relation deduplicator (C8) — Precision Layer 3 (§4.11).
//!
//! Grounded on the teacher's `graph/merge.rs` keyed-group-then-fold style:
//! group candidates by their `(subj, pred, obj)` key, keep the
//! highest-confidence survivor, and union the rest into it rather than
//! discarding their evidence outright.

use std::collections::{HashMap, HashSet};

use crate::model::Relation;

#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    pub group_count: usize,
    pub merged_count: u32,
    pub max_group_size: usize,
}

impl DedupStats {
    pub fn average_group_size(&self, total_before: usize) -> f32 {
        if self.group_count == 0 {
            0.0
        } else {
            total_before as f32 / self.group_count as f32
        }
    }
}

/// Merge relations sharing the same `(subj, pred, obj)` key, keeping the
/// maximum confidence, unioning evidence deduped on
/// `(doc_id, sentence_index, span_start, span_end)`, and unioning
/// qualifiers (first non-default value wins per field).
pub fn dedup_relations(relations: Vec<Relation>) -> (Vec<Relation>, DedupStats) {
    let total_before = relations.len();
    let mut groups: HashMap<(String, crate::schema::Predicate, String), Vec<Relation>> = HashMap::new();
    for r in relations {
        groups.entry(r.key()).or_default().push(r);
    }

    let mut stats = DedupStats { group_count: groups.len(), merged_count: 0, max_group_size: 0 };
    let mut out = Vec::with_capacity(groups.len());

    for (_key, group) in groups {
        stats.max_group_size = stats.max_group_size.max(group.len());
        if group.len() > 1 {
            stats.merged_count += (group.len() - 1) as u32;
        }
        out.push(merge_group(group));
    }

    (out, stats)
}

fn merge_group(mut group: Vec<Relation>) -> Relation {
    group.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    let mut head = group.remove(0);

    let mut seen: HashSet<(String, usize, usize, usize)> = head
        .evidence
        .iter()
        .map(|e| (e.doc_id.clone(), e.sentence_index, e.span_start, e.span_end))
        .collect();

    for rest in group {
        for e in rest.evidence {
            let key = (e.doc_id.clone(), e.sentence_index, e.span_start, e.span_end);
            if seen.insert(key) {
                head.evidence.push(e);
            }
        }
        if head.qualifiers.time.is_none() {
            head.qualifiers.time = rest.qualifiers.time;
        }
        if head.qualifiers.place.is_none() {
            head.qualifiers.place = rest.qualifiers.place;
        }
        if head.qualifiers.source.is_none() {
            head.qualifiers.source = rest.qualifiers.source;
        }
    }

    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evidence, EvidenceSource, Extractor, Qualifiers};
    use crate::schema::Predicate;

    fn relation(id: &str, confidence: f32, span_start: usize) -> Relation {
        Relation {
            id: id.into(),
            subj: "aragorn".into(),
            pred: Predicate::MarriedTo,
            obj: "arwen".into(),
            confidence,
            evidence: vec![Evidence {
                doc_id: "doc1".into(),
                sentence_index: 0,
                span_start,
                span_end: span_start + 5,
                text: String::new(),
                source: EvidenceSource::Rule,
            }],
            qualifiers: Qualifiers::default(),
            extractor: Extractor::Narrative("married".into()),
        }
    }

    #[test]
    fn duplicate_triples_merge_into_one_with_max_confidence() {
        let relations = vec![relation("r1", 0.6, 0), relation("r2", 0.9, 10)];
        let (out, stats) = dedup_relations(relations);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
        assert_eq!(out[0].evidence.len(), 2);
        assert_eq!(stats.merged_count, 1);
    }

    #[test]
    fn distinct_triples_are_not_merged() {
        let mut r2 = relation("r2", 0.8, 0);
        r2.obj = "someone_else".into();
        let (out, stats) = dedup_relations(vec![relation("r1", 0.6, 0), r2]);
        assert_eq!(out.len(), 2);
        assert_eq!(stats.group_count, 2);
    }

    #[test]
    fn identical_evidence_span_is_not_duplicated() {
        let relations = vec![relation("r1", 0.6, 0), relation("r2", 0.9, 0)];
        let (out, _stats) = dedup_relations(relations);
        assert_eq!(out[0].evidence.len(), 1);
    }
}
