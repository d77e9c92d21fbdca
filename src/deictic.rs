//! Deictic resolver (C10): rewrites `there`/`here` to the most recent
//! compatible location (§4.7).
//!
//! Grounded on §9's "regex-driven extraction with string indexing and
//! overlap risk" note — rewrites are applied in reverse document order so
//! earlier offsets stay valid, the same discipline the teacher's
//! `grammar/narrative.rs` line-builder uses when splicing generated text.

use regex::Regex;
use std::sync::OnceLock;

use crate::schema::EntityType;

/// A PLACE/ORG/HOUSE mention candidate the deictic resolver may rewrite
/// `there`/`here` to.
#[derive(Debug, Clone)]
pub struct LocationMention {
    pub canonical: String,
    pub entity_type: EntityType,
    pub start: usize,
}

fn deictic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(there|here)\b").unwrap())
}

fn is_location_type(ty: EntityType) -> bool {
    matches!(ty, EntityType::Place | EntityType::Org | EntityType::House)
}

/// Rewrite every `there`/`here` in `text` to `in <CanonicalName>`, using the
/// nearest preceding location mention, and return the edits applied (in
/// ascending order by original offset) alongside the rewritten text so a
/// caller holding offsets into the original `text` can carry them forward
/// via [`remap_offset`].
pub fn resolve_deictics_with_offsets(text: &str, locations: &[LocationMention]) -> (String, Vec<(usize, usize, usize)>) {
    let mut matches: Vec<(usize, usize)> = deictic_re().find_iter(text).map(|m| (m.start(), m.end())).collect();
    // Reverse order preserves earlier offsets while we splice from the tail.
    matches.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = text.to_string();
    let mut edits = Vec::new();
    for (start, end) in matches {
        if let Some(location) = locations
            .iter()
            .filter(|l| l.start < start && is_location_type(l.entity_type))
            .max_by_key(|l| l.start)
        {
            let replacement = format!("in {}", location.canonical);
            edits.push((start, end, replacement.len()));
            result.replace_range(start..end, &replacement);
        }
    }
    edits.sort_by_key(|e| e.0);
    (result, edits)
}

/// Rewrite every `there`/`here` in `text`, discarding the edit list — for
/// callers that only need the resolved string (idempotence checks, tests).
pub fn resolve_deictics(text: &str, locations: &[LocationMention]) -> String {
    resolve_deictics_with_offsets(text, locations).0
}

/// Maps an offset computed against the pre-resolution text into the
/// rewritten text returned by [`resolve_deictics_with_offsets`], by
/// accumulating the length delta of every edit that occurred at or before
/// it. `edits` must be the list returned alongside the text being mapped
/// into.
pub fn remap_offset(original_pos: usize, edits: &[(usize, usize, usize)]) -> usize {
    let mut delta: i64 = 0;
    for (start, end, new_len) in edits {
        if *end <= original_pos {
            delta += *new_len as i64 - (*end as i64 - *start as i64);
        } else if *start < original_pos {
            // original_pos falls inside a rewritten span (shouldn't happen
            // for entity mention offsets, which never overlap a deictic
            // token) — clamp to the edit's end to stay in bounds.
            delta += *new_len as i64 - (*end as i64 - *start as i64);
        }
    }
    (original_pos as i64 + delta).max(0) as usize
}

/// §8: "Given the same processed text, C10 is a no-op" — used by callers to
/// assert idempotence in property tests.
pub fn is_already_resolved(text: &str, locations: &[LocationMention]) -> bool {
    resolve_deictics(text, locations) == text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_there_to_most_recent_place() {
        let text = "Frodo studied at Rivendell. He lived there for many years.";
        let locations = vec![LocationMention {
            canonical: "Rivendell".to_string(),
            entity_type: EntityType::Place,
            start: 18,
        }];
        let rewritten = resolve_deictics(text, &locations);
        assert!(rewritten.contains("lived in Rivendell for many years"));
    }

    #[test]
    fn no_preceding_location_leaves_text_untouched() {
        let text = "They went there quickly.";
        let rewritten = resolve_deictics(text, &[]);
        assert_eq!(rewritten, text);
    }

    #[test]
    fn already_resolved_text_is_a_no_op() {
        let text = "He lived in Rivendell for many years.";
        assert!(is_already_resolved(text, &[]));
    }

    #[test]
    fn remap_offset_shifts_positions_after_a_rewrite() {
        let text = "Frodo studied at Rivendell. He lived there for many years.";
        let locations = vec![LocationMention {
            canonical: "Rivendell".to_string(),
            entity_type: EntityType::Place,
            start: 18,
        }];
        let (resolved, edits) = resolve_deictics_with_offsets(text, &locations);
        // "there" (5 chars) becomes "in Rivendell" (12 chars): +7.
        let tail_word_original = text.find("for many years").unwrap();
        let tail_word_remapped = remap_offset(tail_word_original, &edits);
        assert_eq!(resolved[tail_word_remapped..].find("for many years"), Some(0));
    }

    #[test]
    fn multiple_deictics_each_use_their_own_nearest_location() {
        let text = "Gondor fell. They fled there. Rohan rose. They rode there.";
        let locations = vec![
            LocationMention {
                canonical: "Gondor".to_string(),
                entity_type: EntityType::Place,
                start: 0,
            },
            LocationMention {
                canonical: "Rohan".to_string(),
                entity_type: EntityType::Place,
                start: 31,
            },
        ];
        let rewritten = resolve_deictics(text, &locations);
        assert!(rewritten.contains("fled in Gondor"));
        assert!(rewritten.contains("rode in Rohan"));
    }
}
