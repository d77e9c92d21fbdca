//! Identity subsystem (C4): `EID`/`AID`/`SP` assignment, alias resolution,
//! sense disambiguation — §4.12's orchestration over [`alias`], [`sense`],
//! and [`registry`].
//!
//! Grounded on §9's "process-wide singletons" design note: rather than
//! module-level statics (the source's `aliasRegistry`/`eidRegistry`/
//! `senseRegistry`), this is one typed [`IdentityStore`] value threaded
//! explicitly through the orchestrator (C16), serializable end to end so a
//! caller can persist/restore it between invocations.

pub mod alias;
pub mod ids;
pub mod registry;
pub mod sense;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AresResult, IdentityError};
use crate::identity::ids::{Aid, AtomicIdAllocator, Eid};
use crate::identity::registry::{AliasRegistry, AliasRegistrySnapshot, Binding, BindingMethod};
use crate::identity::sense::{Sense, SenseRegistry, SenseRegistrySnapshot};
use crate::model::{Entity, EntityProfile};
use crate::schema::EntityType;

/// Outcome of resolving one entity's identity for the current document.
#[derive(Debug, Clone)]
pub struct IdentityAssignment {
    pub eid: Eid,
    pub aid: Aid,
    pub sp: Vec<u32>,
}

/// Process-wide (or, here, explicitly-threaded) identity state: alias
/// registry, sense registry, and the two ID allocators.
pub struct IdentityStore {
    pub aliases: AliasRegistry,
    pub senses: SenseRegistry,
    eid_allocator: AtomicIdAllocator,
    aid_allocator: AtomicIdAllocator,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self {
            aliases: AliasRegistry::new(),
            senses: SenseRegistry::new(),
            eid_allocator: AtomicIdAllocator::new(),
            aid_allocator: AtomicIdAllocator::new(),
        }
    }

    /// §4.12 steps 1–3: resolve or mint an EID/AID/SP for one entity, given
    /// its freshly-computed profile and the profiles of every other entity
    /// of the same type seen so far (the `all_profiles` similarity pool).
    pub fn assign(
        &self,
        canonical: &str,
        entity_type: EntityType,
        profile: &EntityProfile,
        all_profiles: &[(String, EntityProfile)],
    ) -> AresResult<IdentityAssignment> {
        match alias::resolve(&self.aliases, canonical, entity_type, profile, all_profiles) {
            Some(outcome) => {
                debug!(canonical, eid = %outcome.eid, method = ?outcome.method, "resolved existing identity");
                let existing_senses = self.senses.senses_for(canonical, entity_type);
                let sp = match self.senses.matching_sense(canonical, entity_type, profile) {
                    Some(sense) => sense.sp,
                    None if existing_senses.is_empty() => vec![1],
                    None => {
                        let mut fingerprint_profile = EntityProfile::default();
                        fingerprint_profile.descriptors = existing_senses[0].descriptor_fingerprint.clone();
                        let discrimination = sense::discriminate(profile, &fingerprint_profile);
                        if discrimination.should_split {
                            self.senses.next_sp(canonical, entity_type)
                        } else {
                            existing_senses[0].sp.clone()
                        }
                    }
                };
                let aid = self
                    .aliases
                    .exact_match(canonical, entity_type)
                    .map(|b| b.aid)
                    .ok_or_else(|| IdentityError::RegistryConflict {
                        name: canonical.to_string(),
                        entity_type: entity_type.to_string(),
                        message: "resolved EID but no AID binding present".into(),
                    })?;
                self.senses.record_sense(
                    canonical,
                    entity_type,
                    Sense {
                        sp: sp.clone(),
                        eid: outcome.eid,
                        descriptor_fingerprint: profile.descriptors.clone(),
                    },
                );
                Ok(IdentityAssignment {
                    eid: outcome.eid,
                    aid,
                    sp,
                })
            }
            None => {
                debug!(canonical, "minting new identity");
                let binding = alias::mint(&self.aliases, &self.eid_allocator, canonical, entity_type);
                let sp = self.senses.next_sp(canonical, entity_type);
                self.senses.record_sense(
                    canonical,
                    entity_type,
                    Sense {
                        sp: sp.clone(),
                        eid: binding.eid,
                        descriptor_fingerprint: profile.descriptors.clone(),
                    },
                );
                Ok(IdentityAssignment {
                    eid: binding.eid,
                    aid: binding.aid,
                    sp,
                })
            }
        }
    }

    /// §4.12 step 4: recompute `entity.aliases` as the union of previously
    /// stored aliases, coreference mention texts (caller filters pronouns/
    /// demonstratives/coordination before calling this), and every surface
    /// form bound to the entity's EID — then pick the longest non-stopword
    /// proper form as the new canonical.
    pub fn recompute_aliases(&self, entity: &mut Entity, coref_mention_texts: &[String]) {
        let Some(eid) = entity.eid else { return };
        let mut union: Vec<String> = entity.aliases.clone();
        for text in coref_mention_texts {
            if !union.iter().any(|a| a.eq_ignore_ascii_case(text)) {
                union.push(text.clone());
            }
        }
        for form in self.aliases.surface_forms(eid) {
            if !union.iter().any(|a| a.eq_ignore_ascii_case(&form)) {
                union.push(form);
            }
        }
        if let Some(best) = union
            .iter()
            .filter(|a| !crate::lexicon::is_stopword(a))
            .max_by_key(|a| a.len())
        {
            entity.canonical = best.clone();
        }
        entity.aliases = union;
    }

    pub fn snapshot(&self) -> IdentityStoreSnapshot {
        IdentityStoreSnapshot {
            aliases: self.aliases.snapshot(),
            senses: self.senses.snapshot(),
            next_eid: self.eid_allocator.peek_next(),
            next_aid: self.aid_allocator.peek_next(),
        }
    }

    pub fn restore(snapshot: IdentityStoreSnapshot) -> Self {
        Self {
            aliases: AliasRegistry::restore(snapshot.aliases),
            senses: SenseRegistry::restore(snapshot.senses),
            eid_allocator: AtomicIdAllocator::starting_from(snapshot.next_eid),
            aid_allocator: AtomicIdAllocator::starting_from(snapshot.next_aid),
        }
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of an [`IdentityStore`], per §10.5.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityStoreSnapshot {
    aliases: AliasRegistrySnapshot,
    senses: SenseRegistrySnapshot,
    next_eid: u64,
    next_aid: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mention_mints_new_identity() {
        let store = IdentityStore::new();
        let profile = EntityProfile::default();
        let assignment = store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
        assert_eq!(assignment.sp, vec![1]);
    }

    #[test]
    fn second_mention_of_same_name_reuses_eid() {
        let store = IdentityStore::new();
        let profile = EntityProfile::default();
        let first = store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
        let second = store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
        assert_eq!(first.eid, second.eid);
    }

    #[test]
    fn snapshot_round_trips_allocator_floor() {
        let store = IdentityStore::new();
        let profile = EntityProfile::default();
        store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
        let snap = store.snapshot();
        let restored = IdentityStore::restore(snap);
        let assignment = restored.assign("Arwen", EntityType::Person, &profile, &[]).unwrap();
        assert!(assignment.eid.get() >= 2);
    }
}
