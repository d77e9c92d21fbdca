//! Alias registry: surface form → `(EID, AID)` binding, keyed by
//! `(normalized name, entity type)`.
//!
//! Grounded on the teacher's `registry.rs` (`SymbolRegistry` with two
//! `DashMap`s for O(1) bidirectional lookup), minus file-backed
//! persistence — §1 requires registries to be "in-memory and serializable",
//! not disk-durable, so `persist`/`restore` against a `TieredStore` are
//! replaced with plain `Serialize`/`Deserialize` on a snapshot struct.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::identity::ids::{Aid, Eid};
use crate::schema::EntityType;

/// How a surface form came to be bound to an EID, carried alongside the
/// binding for callers that want to explain a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingMethod {
    ExactMatch,
    Manual,
    TitleVariation,
    ProfileSimilarity,
    Minted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub eid: Eid,
    pub aid: Aid,
    pub confidence: f32,
    pub method: BindingMethod,
}

fn key(name: &str, entity_type: EntityType) -> String {
    format!("{}::{}", entity_type.as_str(), name.to_lowercase())
}

/// Bidirectional alias registry: `(name, type) -> Binding` and
/// `eid -> [surface forms]`.
#[derive(Debug)]
pub struct AliasRegistry {
    mappings: DashMap<String, Binding>,
    surface_forms_by_eid: DashMap<Eid, Vec<String>>,
    manual: DashMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self {
            mappings: DashMap::new(),
            surface_forms_by_eid: DashMap::new(),
            manual: DashMap::new(),
        }
    }

    /// §4.12.1(b): user-supplied manual mapping from one surface form to
    /// another (both keyed as `type::name`).
    pub fn add_manual_mapping(&self, from_key: impl Into<String>, to_key: impl Into<String>) {
        self.manual.insert(from_key.into(), to_key.into());
    }

    pub fn manual_mapping(&self, name: &str, entity_type: EntityType) -> Option<String> {
        self.manual.get(&key(name, entity_type)).map(|r| r.value().clone())
    }

    /// Exact-match lookup, §4.12.1(a).
    pub fn exact_match(&self, name: &str, entity_type: EntityType) -> Option<Binding> {
        self.mappings.get(&key(name, entity_type)).map(|r| r.value().clone())
    }

    /// Bind a surface form to an EID/AID, recording its surface-form
    /// membership for `iter()`/`surface_forms()`.
    pub fn bind(&self, name: &str, entity_type: EntityType, binding: Binding) {
        let k = key(name, entity_type);
        self.surface_forms_by_eid
            .entry(binding.eid)
            .or_default()
            .push(name.to_string());
        self.mappings.insert(k, binding);
    }

    pub fn surface_forms(&self, eid: Eid) -> Vec<String> {
        self.surface_forms_by_eid
            .get(&eid)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Public replacement for the source's `aliasRegistry['mappings'].values()`
    /// private-member access, per §9.
    pub fn iter(&self) -> Vec<((String, String), Binding)> {
        self.mappings
            .iter()
            .map(|entry| {
                let (ty, name) = entry.key().split_once("::").unwrap_or(("", entry.key()));
                ((ty.to_string(), name.to_string()), entry.value().clone())
            })
            .collect()
    }

    /// Snapshot for serialization. `DashMap` itself is not directly
    /// (de)serializable in a stable key order, so we go through a plain
    /// `Vec`-backed form.
    pub fn snapshot(&self) -> AliasRegistrySnapshot {
        AliasRegistrySnapshot {
            mappings: self.mappings.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            surface_forms_by_eid: self
                .surface_forms_by_eid
                .iter()
                .map(|e| (*e.key(), e.value().clone()))
                .collect(),
            manual: self.manual.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
        }
    }

    pub fn restore(snapshot: AliasRegistrySnapshot) -> Self {
        let registry = Self::new();
        for (k, v) in snapshot.mappings {
            registry.mappings.insert(k, v);
        }
        for (eid, forms) in snapshot.surface_forms_by_eid {
            registry.surface_forms_by_eid.insert(eid, forms);
        }
        for (k, v) in snapshot.manual {
            registry.manual.insert(k, v);
        }
        registry
    }
}

impl Default for AliasRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasRegistrySnapshot {
    mappings: Vec<(String, Binding)>,
    surface_forms_by_eid: Vec<(Eid, Vec<String>)>,
    manual: Vec<(String, String)>,
}
