//! Alias resolver: the four-tier `resolve()` contract of §4.12.1.
//!
//! Grounded on the teacher's `grammar/entity_resolution.rs` `EntityResolver`
//! — in particular its `resolve()` cascade (runtime alias → learned →
//! static table → fallback) and its `LearnedEquivalence`/`EquivalenceSource`
//! split between "why this binding exists" and "the binding itself". Here
//! the cascade is exact-match → manual mapping → title-variation → profile
//! similarity, per §4.12.1(a–d), and `EquivalenceSource` becomes
//! [`crate::identity::registry::BindingMethod`].

use std::collections::HashSet;

use crate::identity::ids::{AtomicIdAllocator, Eid};
use crate::identity::registry::{AliasRegistry, Binding, BindingMethod};
use crate::model::EntityProfile;
use crate::schema::EntityType;

/// Outcome of a successful resolution (§4.12.1 `{eid, aid, confidence, method}`).
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub eid: Eid,
    pub confidence: f32,
    pub method: BindingMethod,
}

/// Profile-similarity weights from §4.12.1(d).
const CONTEXT_WEIGHT: f32 = 0.5;
const DESCRIPTOR_WEIGHT: f32 = 0.3;
const TITLE_WEIGHT: f32 = 0.2;
const SIMILARITY_THRESHOLD: f32 = 0.8;

/// `resolve(canonical, type, profile, all_profiles)` — §4.12.1.
///
/// `all_profiles` pairs a candidate name (already known to the registry) with
/// its accumulated profile, so similarity can be tried against every
/// previously-seen surface form of this type.
pub fn resolve(
    registry: &AliasRegistry,
    canonical: &str,
    entity_type: EntityType,
    profile: &EntityProfile,
    all_profiles: &[(String, EntityProfile)],
) -> Option<ResolveOutcome> {
    // (a) exact match in the alias registry.
    if let Some(binding) = registry.exact_match(canonical, entity_type) {
        return Some(ResolveOutcome {
            eid: binding.eid,
            confidence: binding.confidence,
            method: BindingMethod::ExactMatch,
        });
    }

    // (b) user-supplied manual mapping.
    if let Some(target_key) = registry.manual_mapping(canonical, entity_type) {
        if let Some((_, name)) = target_key.split_once("::") {
            if let Some(binding) = registry.exact_match(name, entity_type) {
                return Some(ResolveOutcome {
                    eid: binding.eid,
                    confidence: 1.0,
                    method: BindingMethod::Manual,
                });
            }
        }
    }

    // (c) title-variation matching ("Gandalf" <-> "Gandalf the Grey"), with
    // a guard rejecting pure-surname -> compound merges.
    for (name, _) in all_profiles {
        if is_title_variation(canonical, name) {
            if let Some(binding) = registry.exact_match(name, entity_type) {
                return Some(ResolveOutcome {
                    eid: binding.eid,
                    confidence: 0.85,
                    method: BindingMethod::TitleVariation,
                });
            }
        }
    }

    // (d) profile similarity >= 0.8.
    let mut best: Option<(f32, Eid)> = None;
    for (name, other_profile) in all_profiles {
        if let Some(binding) = registry.exact_match(name, entity_type) {
            let score = profile_similarity(profile, other_profile);
            if score >= SIMILARITY_THRESHOLD && best.as_ref().map(|(b, _)| score > *b).unwrap_or(true) {
                best = Some((score, binding.eid));
            }
        }
    }
    if let Some((score, eid)) = best {
        return Some(ResolveOutcome {
            eid,
            confidence: score,
            method: BindingMethod::ProfileSimilarity,
        });
    }

    None
}

/// Title-variation guard: the shorter name must be a non-empty strict
/// prefix (by tokens) of the longer, and the longer must add at least one
/// additional token that isn't itself reducible to a bare surname merge
/// (e.g. "Baggins" alone should not title-match "Frodo Baggins").
fn is_title_variation(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.split_whitespace().count() <= b.split_whitespace().count() {
        (a, b)
    } else {
        (b, a)
    };
    let shorter_tokens: Vec<&str> = shorter.split_whitespace().collect();
    let longer_tokens: Vec<&str> = longer.split_whitespace().collect();
    if shorter_tokens.is_empty() || shorter_tokens.len() >= longer_tokens.len() {
        return false;
    }
    // Guard: reject when the "shorter" side is a single token that looks
    // like a bare surname (capitalized, and it's the *last* token of the
    // longer form) — that is a surname-only match, not a title variation.
    if shorter_tokens.len() == 1 && longer_tokens.last() == Some(&shorter_tokens[0]) {
        return false;
    }
    longer_tokens.starts_with(&shorter_tokens)
}

/// Weighted profile similarity, §4.12.1(d): 0.5 context word-overlap, 0.3
/// descriptor Jaccard, 0.2 title Jaccard. Also used by C4's sense
/// discriminator (complementary score, see [`crate::identity::sense`]).
pub fn profile_similarity(a: &EntityProfile, b: &EntityProfile) -> f32 {
    let context_overlap = word_overlap(&a.context_sentences, &b.context_sentences);
    let descriptor_jaccard = jaccard(&a.descriptors, &b.descriptors);
    let title_jaccard = jaccard(&a.titles, &b.titles);
    CONTEXT_WEIGHT * context_overlap + DESCRIPTOR_WEIGHT * descriptor_jaccard + TITLE_WEIGHT * title_jaccard
}

fn word_overlap(a: &[String], b: &[String]) -> f32 {
    let words_of = |sentences: &[String]| -> HashSet<String> {
        sentences
            .iter()
            .flat_map(|s| s.split_whitespace().map(|w| w.to_lowercase()))
            .collect()
    };
    let wa = words_of(a);
    let wb = words_of(b);
    jaccard_sets(&wa, &wb)
}

fn jaccard(a: &[String], b: &[String]) -> f32 {
    let sa: HashSet<&String> = a.iter().collect();
    let sb: HashSet<&String> = b.iter().collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

fn jaccard_sets(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Mint a brand-new EID/AID pair and register the surface form with
/// confidence 1.0 (§4.12.3 "if not resolved: mint a new EID").
pub fn mint(registry: &AliasRegistry, allocator: &AtomicIdAllocator, canonical: &str, entity_type: EntityType) -> Binding {
    let binding = Binding {
        eid: allocator.next_eid(),
        aid: allocator.next_aid(),
        confidence: 1.0,
        method: BindingMethod::Minted,
    };
    registry.bind(canonical, entity_type, binding.clone());
    binding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_variation_detects_gandalf_the_grey() {
        assert!(is_title_variation("Gandalf", "Gandalf the Grey"));
    }

    #[test]
    fn title_variation_rejects_bare_surname() {
        assert!(!is_title_variation("Baggins", "Frodo Baggins"));
    }

    #[test]
    fn exact_match_wins_over_everything_else() {
        let registry = AliasRegistry::new();
        let allocator = AtomicIdAllocator::new();
        let binding = mint(&registry, &allocator, "Aragorn", EntityType::Person);
        let profile = EntityProfile::default();
        let outcome = resolve(&registry, "Aragorn", EntityType::Person, &profile, &[]).unwrap();
        assert_eq!(outcome.eid, binding.eid);
        assert_eq!(outcome.method, BindingMethod::ExactMatch);
    }

    #[test]
    fn profile_similarity_requires_threshold() {
        let registry = AliasRegistry::new();
        let allocator = AtomicIdAllocator::new();
        mint(&registry, &allocator, "Gandalf the Grey", EntityType::Person);

        let mut a = EntityProfile::default();
        a.context_sentences = vec!["the wizard traveled to rivendell".into()];
        let mut b = a.clone();
        b.context_sentences = vec!["the wizard traveled to rivendell".into()];

        let all_profiles = vec![("Gandalf the Grey".to_string(), b)];
        let outcome = resolve(&registry, "The Grey Wizard", EntityType::Person, &a, &all_profiles);
        assert!(outcome.is_some());
    }

    #[test]
    fn unresolved_when_nothing_matches() {
        let registry = AliasRegistry::new();
        let profile = EntityProfile::default();
        assert!(resolve(&registry, "Nobody", EntityType::Person, &profile, &[]).is_none());
    }
}
