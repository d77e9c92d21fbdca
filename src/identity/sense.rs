//! Sense registry and discriminator: tells apart multiple referents that
//! share one surface form (e.g. two distinct "Harry Potter"s), assigning
//! each a sense path `SP` (Glossary: SP).
//!
//! Grounded on the teacher's `entity_resolution.rs` shape (a registry
//! struct over a `HashMap`, paired with small pure scoring functions) but
//! specialized to §4.12.2's "consult the sense registry" / "sense
//! discriminator" split: the registry stores senses already assigned; the
//! discriminator is a free function scoring two profiles.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::identity::ids::Eid;
use crate::model::EntityProfile;
use crate::schema::EntityType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sense {
    pub sp: Vec<u32>,
    pub eid: Eid,
    /// A compact fingerprint of the profile last associated with this
    /// sense, enough to re-run the discriminator against a new mention
    /// without keeping the full profile history here.
    pub descriptor_fingerprint: Vec<String>,
}

fn key(name: &str, entity_type: EntityType) -> String {
    format!("{}::{}", entity_type.as_str(), name.to_lowercase())
}

#[derive(Debug)]
pub struct SenseRegistry {
    senses: DashMap<String, Vec<Sense>>,
}

impl SenseRegistry {
    pub fn new() -> Self {
        Self {
            senses: DashMap::new(),
        }
    }

    pub fn senses_for(&self, name: &str, entity_type: EntityType) -> Vec<Sense> {
        self.senses.get(&key(name, entity_type)).map(|r| r.value().clone()).unwrap_or_default()
    }

    /// §4.12.2: "if profile matches an existing sense, reuse its `sp`".
    /// Returns the first sense whose fingerprint overlaps the incoming
    /// profile's descriptor set by more than half.
    pub fn matching_sense(&self, name: &str, entity_type: EntityType, profile: &EntityProfile) -> Option<Sense> {
        self.senses_for(name, entity_type).into_iter().find(|sense| {
            descriptor_overlap(&sense.descriptor_fingerprint, &profile.descriptors) > 0.5
        })
    }

    /// Record a new sense for this name/type, or update the fingerprint of
    /// an existing one bound to the same EID.
    pub fn record_sense(&self, name: &str, entity_type: EntityType, sense: Sense) {
        let k = key(name, entity_type);
        let mut entry = self.senses.entry(k).or_default();
        if let Some(existing) = entry.iter_mut().find(|s| s.eid == sense.eid) {
            *existing = sense;
        } else {
            entry.push(sense);
        }
    }

    /// Next SP for a name/type: `[1]` if no senses exist yet, else the next
    /// integer at that name+type (§4.12.2/.3).
    pub fn next_sp(&self, name: &str, entity_type: EntityType) -> Vec<u32> {
        let existing = self.senses_for(name, entity_type);
        let next = existing.iter().filter_map(|s| s.sp.first().copied()).max().unwrap_or(0) + 1;
        vec![next]
    }

    pub fn snapshot(&self) -> SenseRegistrySnapshot {
        SenseRegistrySnapshot {
            senses: self.senses.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
        }
    }

    pub fn restore(snapshot: SenseRegistrySnapshot) -> Self {
        let registry = Self::new();
        for (k, v) in snapshot.senses {
            registry.senses.insert(k, v);
        }
        registry
    }
}

impl Default for SenseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenseRegistrySnapshot {
    senses: Vec<(String, Vec<Sense>)>,
}

fn descriptor_overlap(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.iter().filter(|d| b.contains(d)).count();
    shared as f32 / a.len().max(b.len()) as f32
}

/// The sense discriminator: scores two profiles and recommends whether they
/// describe distinct senses of the same surface form. Mirrors §4.12.2's
/// "call the sense discriminator on the two profiles" step — the actual
/// similarity weights reuse C4's profile-similarity formula (0.5 context
/// overlap / 0.3 descriptor Jaccard / 0.2 title Jaccard), since "distinct
/// sense" is the complement of "same referent".
pub struct DiscriminationResult {
    pub should_split: bool,
    pub confidence: f32,
}

pub fn discriminate(a: &EntityProfile, b: &EntityProfile) -> DiscriminationResult {
    let similarity = crate::identity::alias::profile_similarity(a, b);
    let confidence = 1.0 - similarity;
    DiscriminationResult {
        should_split: confidence > 0.7,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_sp_starts_at_one() {
        let reg = SenseRegistry::new();
        assert_eq!(reg.next_sp("Harry", EntityType::Person), vec![1]);
    }

    #[test]
    fn next_sp_increments_after_recording() {
        let reg = SenseRegistry::new();
        reg.record_sense(
            "Harry",
            EntityType::Person,
            Sense {
                sp: vec![1],
                eid: Eid::new(1).unwrap(),
                descriptor_fingerprint: vec!["wizard".into()],
            },
        );
        assert_eq!(reg.next_sp("Harry", EntityType::Person), vec![2]);
    }

    #[test]
    fn discriminator_splits_dissimilar_profiles() {
        let mut a = EntityProfile::default();
        a.add_descriptor("wizard");
        a.add_role("student");
        let mut b = EntityProfile::default();
        b.add_descriptor("plumber");
        b.add_role("engineer");
        let result = discriminate(&a, &b);
        assert!(result.should_split);
    }
}
