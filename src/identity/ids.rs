//! `EID`/`AID` newtypes and their atomic allocators.
//!
//! Grounded on the teacher's `symbol.rs`: a `NonZeroU64`-backed newtype plus
//! an `AtomicSymbolAllocator` wrapping `AtomicU64`. Here the one allocator
//! splits into two thin newtypes instead of a single `SymbolId` with a kind
//! enum, since C4 needs independently space `EID`s and `AID`s (§3, §4.12).

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Stable integer identity of a referent across documents (Glossary: EID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Eid(NonZeroU64);

impl Eid {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Eid)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "eid:{}", self.0)
    }
}

/// Stable integer identity of a single surface form bound to an EID
/// (Glossary: AID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Aid(NonZeroU64);

impl Aid {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Aid)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for Aid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aid:{}", self.0)
    }
}

/// Monotonic allocator for one of the two ID spaces.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    pub fn next_eid(&self) -> Eid {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        Eid::new(value).expect("allocator never yields zero")
    }

    pub fn next_aid(&self) -> Aid {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        Aid::new(value).expect("allocator never yields zero")
    }

    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_yields_increasing_ids() {
        let alloc = AtomicIdAllocator::new();
        let a = alloc.next_eid();
        let b = alloc.next_eid();
        assert!(b.get() > a.get());
    }

    #[test]
    fn starting_from_respects_floor() {
        let alloc = AtomicIdAllocator::starting_from(100);
        assert_eq!(alloc.next_eid().get(), 100);
    }

    #[test]
    fn eid_and_aid_display() {
        let e = Eid::new(7).unwrap();
        let a = Aid::new(9).unwrap();
        assert_eq!(format!("{e}"), "eid:7");
        assert_eq!(format!("{a}"), "aid:9");
    }
}
