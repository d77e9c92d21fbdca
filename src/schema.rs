//! Closed schema: entity types, predicates, guards, inverses, single-valuedness.
//!
//! C1 of the component table. Entity types and predicates are closed sets —
//! translated here to discriminated enums rather than string unions, per the
//! "Closed enums today spelled as string unions" design note. GUARD and
//! INVERSE are compile-time tables, not runtime-constructed maps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Org,
    Place,
    Date,
    Time,
    Work,
    Item,
    Object,
    Misc,
    Species,
    House,
    Tribe,
    Title,
    Event,
    Race,
    Creature,
    Artifact,
    Technology,
    Magic,
    Language,
    Currency,
    Material,
    Drug,
    Deity,
    Ability,
    Skill,
    Power,
    Technique,
    Spell,
}

impl EntityType {
    pub const ALL: &'static [EntityType] = &[
        EntityType::Person,
        EntityType::Org,
        EntityType::Place,
        EntityType::Date,
        EntityType::Time,
        EntityType::Work,
        EntityType::Item,
        EntityType::Object,
        EntityType::Misc,
        EntityType::Species,
        EntityType::House,
        EntityType::Tribe,
        EntityType::Title,
        EntityType::Event,
        EntityType::Race,
        EntityType::Creature,
        EntityType::Artifact,
        EntityType::Technology,
        EntityType::Magic,
        EntityType::Language,
        EntityType::Currency,
        EntityType::Material,
        EntityType::Drug,
        EntityType::Deity,
        EntityType::Ability,
        EntityType::Skill,
        EntityType::Power,
        EntityType::Technique,
        EntityType::Spell,
    ];

    /// Entity types for which referential merges (name-subset / honorific
    /// blocking, see C11) apply. Currently just PERSON.
    pub fn is_person(self) -> bool {
        matches!(self, EntityType::Person)
    }

    /// Proper-noun types per C6's capitalization rule.
    pub fn is_proper_noun_type(self) -> bool {
        matches!(
            self,
            EntityType::Person | EntityType::Org | EntityType::Place | EntityType::House | EntityType::Tribe
        )
    }

    /// "Fiction entities" per C14's side-output pass.
    pub fn is_fiction(self) -> bool {
        matches!(
            self,
            EntityType::Spell
                | EntityType::Magic
                | EntityType::Creature
                | EntityType::Artifact
                | EntityType::Technique
                | EntityType::Ability
                | EntityType::Power
                | EntityType::Deity
                | EntityType::Race
                | EntityType::Species
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Place => "PLACE",
            EntityType::Date => "DATE",
            EntityType::Time => "TIME",
            EntityType::Work => "WORK",
            EntityType::Item => "ITEM",
            EntityType::Object => "OBJECT",
            EntityType::Misc => "MISC",
            EntityType::Species => "SPECIES",
            EntityType::House => "HOUSE",
            EntityType::Tribe => "TRIBE",
            EntityType::Title => "TITLE",
            EntityType::Event => "EVENT",
            EntityType::Race => "RACE",
            EntityType::Creature => "CREATURE",
            EntityType::Artifact => "ARTIFACT",
            EntityType::Technology => "TECHNOLOGY",
            EntityType::Magic => "MAGIC",
            EntityType::Language => "LANGUAGE",
            EntityType::Currency => "CURRENCY",
            EntityType::Material => "MATERIAL",
            EntityType::Drug => "DRUG",
            EntityType::Deity => "DEITY",
            EntityType::Ability => "ABILITY",
            EntityType::Skill => "SKILL",
            EntityType::Power => "POWER",
            EntityType::Technique => "TECHNIQUE",
            EntityType::Spell => "SPELL",
        }
    }

    pub fn parse(s: &str) -> Option<EntityType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of relation predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    MarriedTo,
    ParentOf,
    ChildOf,
    SiblingOf,
    FriendsWith,
    EnemyOf,
    AllyOf,
    LivesIn,
    BornIn,
    DiesIn,
    Rules,
    TeachesAt,
    TravelledTo,
    Founded,
    Authored,
    Fought,
    Built,
    SpokeTo,
    Met,
    AliasOf,
}

impl Predicate {
    pub const ALL: &'static [Predicate] = &[
        Predicate::MarriedTo,
        Predicate::ParentOf,
        Predicate::ChildOf,
        Predicate::SiblingOf,
        Predicate::FriendsWith,
        Predicate::EnemyOf,
        Predicate::AllyOf,
        Predicate::LivesIn,
        Predicate::BornIn,
        Predicate::DiesIn,
        Predicate::Rules,
        Predicate::TeachesAt,
        Predicate::TravelledTo,
        Predicate::Founded,
        Predicate::Authored,
        Predicate::Fought,
        Predicate::Built,
        Predicate::SpokeTo,
        Predicate::Met,
        Predicate::AliasOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Predicate::MarriedTo => "married_to",
            Predicate::ParentOf => "parent_of",
            Predicate::ChildOf => "child_of",
            Predicate::SiblingOf => "sibling_of",
            Predicate::FriendsWith => "friends_with",
            Predicate::EnemyOf => "enemy_of",
            Predicate::AllyOf => "ally_of",
            Predicate::LivesIn => "lives_in",
            Predicate::BornIn => "born_in",
            Predicate::DiesIn => "dies_in",
            Predicate::Rules => "rules",
            Predicate::TeachesAt => "teaches_at",
            Predicate::TravelledTo => "traveled_to",
            Predicate::Founded => "founded",
            Predicate::Authored => "authored",
            Predicate::Fought => "fought",
            Predicate::Built => "built",
            Predicate::SpokeTo => "spoke_to",
            Predicate::Met => "met",
            Predicate::AliasOf => "alias_of",
        }
    }

    pub fn parse(s: &str) -> Option<Predicate> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Glossary: "single-valued predicate" — a given subject can have at
    /// most one object.
    pub fn is_single_valued(self) -> bool {
        matches!(
            self,
            Predicate::ParentOf | Predicate::MarriedTo | Predicate::BornIn | Predicate::DiesIn
        )
    }

    /// Symmetric predicates generate mirrors with the *same* predicate.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Predicate::MarriedTo
                | Predicate::SiblingOf
                | Predicate::SpokeTo
                | Predicate::Met
                | Predicate::AllyOf
                | Predicate::EnemyOf
                | Predicate::FriendsWith
                | Predicate::AliasOf
        )
    }

    /// C13's INVERSE lookup table.
    pub fn inverse(self) -> Option<Predicate> {
        if self.is_symmetric() {
            return Some(self);
        }
        match self {
            Predicate::ParentOf => Some(Predicate::ChildOf),
            Predicate::ChildOf => Some(Predicate::ParentOf),
            _ => None,
        }
    }

    /// §4.9 family predicates get a wider appositive/coordination gap (250
    /// chars instead of 100).
    pub fn is_family(self) -> bool {
        matches!(
            self,
            Predicate::ParentOf | Predicate::ChildOf | Predicate::LivesIn
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// C1's GUARD table: which (subject type, object type) pairs a predicate
/// allows. Expressed as a closure over small fixed slices rather than a
/// runtime-built HashMap, so it is free to evaluate and trivially const.
pub fn passes_guard(pred: Predicate, subj_type: EntityType, obj_type: EntityType) -> bool {
    use EntityType::*;
    use Predicate::*;

    let person_pair = subj_type.is_person_like() && obj_type.is_person_like();

    match pred {
        MarriedTo | ParentOf | ChildOf | SiblingOf | FriendsWith | EnemyOf | SpokeTo | Met => {
            person_pair
        }
        AllyOf => {
            matches!(subj_type, Person | Org | House | Tribe) && matches!(obj_type, Person | Org | House | Tribe)
        }
        LivesIn | BornIn | DiesIn | TravelledTo => {
            subj_type.is_person_like() && matches!(obj_type, Place | Org | House)
        }
        Rules => matches!(subj_type, Person | Org | House | Tribe) && matches!(obj_type, Place | Org | House | Tribe),
        TeachesAt => matches!(subj_type, Person) && matches!(obj_type, Org | Place),
        Founded => matches!(subj_type, Person | Org) && matches!(obj_type, Org | Place | Work),
        Authored => matches!(subj_type, Person) && matches!(obj_type, Work),
        Fought => person_pair || (subj_type.is_person_like() && matches!(obj_type, Org | House | Tribe)),
        Built => matches!(subj_type, Person | Org) && matches!(obj_type, Object | Work | Artifact | Place),
        AliasOf => subj_type == obj_type,
    }
}

impl EntityType {
    /// "Person-like" for guard purposes: PERSON plus the collective types
    /// that can stand in for a person as a relation argument (e.g. a HOUSE
    /// fighting another HOUSE).
    fn is_person_like(self) -> bool {
        matches!(self, EntityType::Person | EntityType::House | EntityType::Tribe | EntityType::Org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_of_parent_of_is_child_of() {
        assert_eq!(Predicate::ParentOf.inverse(), Some(Predicate::ChildOf));
        assert_eq!(Predicate::ChildOf.inverse(), Some(Predicate::ParentOf));
    }

    #[test]
    fn symmetric_predicates_mirror_to_self() {
        assert_eq!(Predicate::MarriedTo.inverse(), Some(Predicate::MarriedTo));
        assert_eq!(Predicate::SiblingOf.inverse(), Some(Predicate::SiblingOf));
    }

    #[test]
    fn married_to_requires_person_like_pair() {
        assert!(passes_guard(Predicate::MarriedTo, EntityType::Person, EntityType::Person));
        assert!(!passes_guard(Predicate::MarriedTo, EntityType::Place, EntityType::Person));
    }

    #[test]
    fn single_valued_predicates() {
        assert!(Predicate::ParentOf.is_single_valued());
        assert!(Predicate::MarriedTo.is_single_valued());
        assert!(!Predicate::FriendsWith.is_single_valued());
    }

    #[test]
    fn entity_type_round_trips_through_string() {
        for ty in EntityType::ALL {
            let s = ty.as_str();
            assert_eq!(EntityType::parse(s), Some(*ty));
        }
    }

    #[test]
    fn predicate_round_trips_through_string() {
        for p in Predicate::ALL {
            let s = p.as_str();
            assert_eq!(Predicate::parse(s), Some(*p));
        }
    }

    #[test]
    fn lives_in_rejects_place_subject() {
        assert!(!passes_guard(Predicate::LivesIn, EntityType::Place, EntityType::Place));
        assert!(passes_guard(Predicate::LivesIn, EntityType::Person, EntityType::Place));
    }
}
