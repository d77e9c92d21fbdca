//! Stopwords, pronoun inventory, honorifics, titles, nominals, speech verbs,
//! and well-known aliases (C2).
//!
//! Grounded on the teacher's `grammar/equivalences.rs` (static alias table
//! with const arrays) and `grammar/lexer.rs` (`Lexicon` struct holding
//! several const word lists plus a `default_english()` constructor). Unlike
//! the teacher's `Lexicon`, nothing here is mutable at runtime — C2 is pure
//! static data, so everything is a `const`/`static` slice and the handful of
//! lookup helpers are free functions, not methods on a stateful struct.

use std::collections::HashSet;

use once_cell_lexicon::OnceSet;

/// Pronoun gender, for C9's gender/number agreement checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Neuter,
    Unknown,
}

/// Pronoun grammatical number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Number {
    Singular,
    Plural,
}

/// One entry of the pronoun inventory.
#[derive(Debug, Clone, Copy)]
pub struct PronounInfo {
    pub surface: &'static str,
    pub gender: Gender,
    pub number: Number,
    /// True for possessives (`his`, `her`, `their`), which bias pronoun-stack
    /// resolution toward the *previous* sentence's last entity (§4.6.1).
    pub possessive: bool,
}

pub const PRONOUNS: &[PronounInfo] = &[
    p("he", Gender::Male, Number::Singular, false),
    p("him", Gender::Male, Number::Singular, false),
    p("his", Gender::Male, Number::Singular, true),
    p("she", Gender::Female, Number::Singular, false),
    p("her", Gender::Female, Number::Singular, false),
    p("hers", Gender::Female, Number::Singular, true),
    p("it", Gender::Neuter, Number::Singular, false),
    p("its", Gender::Neuter, Number::Singular, true),
    p("they", Gender::Unknown, Number::Plural, false),
    p("them", Gender::Unknown, Number::Plural, false),
    p("their", Gender::Unknown, Number::Plural, true),
    p("theirs", Gender::Unknown, Number::Plural, true),
];

const fn p(surface: &'static str, gender: Gender, number: Number, possessive: bool) -> PronounInfo {
    PronounInfo {
        surface,
        gender,
        number,
        possessive,
    }
}

pub fn pronoun_info(word: &str) -> Option<&'static PronounInfo> {
    let lower = word.to_lowercase();
    PRONOUNS.iter().find(|p| p.surface == lower)
}

pub fn is_pronoun(word: &str) -> bool {
    pronoun_info(word).is_some()
}

/// Demonstratives excluded from `entity.aliases` per §4.12.4.
pub const DEMONSTRATIVES: &[&str] = &["this", "that", "these", "those"];

pub fn is_demonstrative(word: &str) -> bool {
    DEMONSTRATIVES.contains(&word.to_lowercase().as_str())
}

/// Global stopword list for C6's absolute rejections.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "by",
    "from", "up", "down", "is", "are", "was", "were", "be", "been", "being", "this", "that",
    "these", "those", "it", "its", "as", "if", "then", "than", "so", "not", "no", "yes", "he",
    "she", "they", "we", "you", "i", "him", "her", "them", "us", "me", "my", "your", "our",
    "their", "his", "hers", "theirs",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_lowercase().as_str())
}

/// Honorific/title prefixes recognized by C6 and C11 pattern 3.
pub const HONORIFICS: &[&str] = &[
    "Mr", "Mr.", "Mrs", "Mrs.", "Ms", "Ms.", "Dr", "Dr.", "Miss", "Sir", "Lady", "Lord",
    "Professor", "Prof", "Prof.", "Captain", "Capt", "Capt.", "General", "Gen", "Gen.",
];

pub fn honorific_prefix(name: &str) -> Option<&'static str> {
    HONORIFICS
        .iter()
        .find(|h| name.starts_with(**h) && name[h.len()..].starts_with(' '))
        .copied()
}

/// Two honorifics are considered mismatching if both are present and
/// different, per §4.3's "honorific mismatch blocks merges".
pub fn honorifics_mismatch(a: &str, b: &str) -> bool {
    match (honorific_prefix(a), honorific_prefix(b)) {
        (Some(ha), Some(hb)) => ha.trim_end_matches('.') != hb.trim_end_matches('.'),
        _ => false,
    }
}

/// Role/title words used by C5's role-indicator window and C6's role-based
/// name rejection.
pub const ROLE_WORDS: &[&str] = &[
    "king", "queen", "prince", "princess", "wizard", "witch", "scientist", "doctor", "captain",
    "general", "professor", "teacher", "student", "messenger", "stranger", "soldier", "knight",
    "lord", "lady", "emperor", "empress", "chief", "councillor", "mayor", "president", "minister",
];

/// Single-token "role" names C6 rejects outright (`messenger`, `stranger`, …)
pub const REJECTED_ROLE_TOKENS: &[&str] = &["messenger", "stranger", "young man", "old man"];

/// PERSON-head blocklist: single tokens that are never accepted as a bare
/// PERSON canonical even when capitalized (§4.4 type-specific sanity).
pub const PERSON_HEAD_BLOCKLIST: &[&str] = &["hell", "hall", "well", "hill", "dale", "glen"];

/// Event words for C14's event-ish PERSON retagging.
pub const EVENT_WORDS: &[&str] = &["reunion", "party", "dance", "ball", "festival"];

/// Race-keyword substrings for C14's race-noise filter.
pub const RACE_KEYWORDS: &[&str] = &["folk", "people", "clan", "tribe", "race"];

/// Curated race whitelist (entries that survive C14 regardless of mentions).
pub const RACE_WHITELIST: &[&str] = &["Elves", "Dwarves", "Hobbits", "Orcs", "Ents", "Men"];

/// Hard-dropped RACE tokens, no matter mention count.
pub const RACE_BLOCKLIST: &[&str] = &["Barty", "Police", "Only", "Just"];

/// Curated SPECIES whitelist for C6's type-specific sanity.
pub const SPECIES_WHITELIST: &[&str] = &["Human", "Elf", "Dwarf", "Hobbit", "Orc", "Ent", "Dragon"];

/// Always-junk PERSON singleton words, hard-dropped in C14 regardless of
/// mention count.
pub const ALWAYS_JUNK_WORDS: &[&str] = &["Souls", "Steamy", "Bullet", "Maybe", "Sounds", "A", "The", "City"];

/// Additional junk words dropped only when `mention_count == 1`.
pub const JUNK_WORDS_IF_SINGLETON: &[&str] = &["Thing", "Stuff", "Something", "Someone"];

/// Speech verbs for C9's quote-attribution strategy and C11 pattern 6/7.
pub const SPEECH_VERBS: &[&str] = &[
    "said", "asked", "cried", "replied", "answered", "shouted", "whispered", "muttered",
    "exclaimed", "remarked", "declared", "announced",
];

pub fn is_speech_verb(word: &str) -> bool {
    SPEECH_VERBS.contains(&word.to_lowercase().as_str())
}

/// Narrative verbs keyed to relation predicates (C12's narrative-pattern
/// extractor). The verb list, not the regex, lives here as lexicon data.
pub const NARRATIVE_VERBS: &[(&str, crate::schema::Predicate)] = {
    use crate::schema::Predicate::*;
    &[
        ("married", MarriedTo),
        ("wed", MarriedTo),
        ("ruled", Rules),
        ("founded", Founded),
        ("taught", TeachesAt),
        ("fought", Fought),
        ("travel", TravelledTo),
        ("traveled", TravelledTo),
        ("travelled", TravelledTo),
        ("built", Built),
        ("authored", Authored),
        ("wrote", Authored),
        ("spoke", SpokeTo),
        ("met", Met),
    ]
};

/// Place-suffix nouns for C11 pattern 4 (`AdjName Hall|House|...`).
pub const PLACE_SUFFIXES: &[&str] = &["Hall", "House", "Court", "Tower", "Castle", "Manor", "Keep"];

/// Hogwarts-house prefixes: special-cased to ORG, not PLACE, per §4.3.4.
pub const HOGWARTS_HOUSE_PREFIXES: &[&str] = &["Gryffindor", "Slytherin", "Hufflepuff", "Ravenclaw"];

/// PERSON-adjective stoplist for C11 pattern 5 (`Young Sirius` → PERSON).
pub const PERSON_ADJECTIVE_STOPLIST: &[&str] = &["Young", "Old", "Little", "Big", "Great"];

/// Corporate terms used by C9's nominal-NP descriptor index (ORG).
pub const CORPORATE_TERMS: &[&str] = &["company", "corporation", "firm", "bank", "guild", "house"];

/// Geographic terms used by C9's nominal-NP descriptor index (PLACE).
pub const GEOGRAPHIC_TERMS: &[&str] = &["city", "kingdom", "realm", "land", "country", "village", "town"];

/// Collective nouns for C9's "couple/pair/trio" nominal strategy.
pub const COLLECTIVE_NOUNS: &[(&str, usize)] = &[("couple", 2), ("pair", 2), ("trio", 3)];

/// Sibling-marker phrases for C7's sibling detector (§4.9.2).
pub const SIBLING_MARKERS: &[&str] = &[
    "eldest", "youngest", "twin son", "twin daughter", "twin child", "brother", "sister", "sibling",
];

/// Attribute keyword vocabulary for C5's profiling (§4.5).
pub const ATTRIBUTE_KEYWORDS: &[&str] = &["color", "age", "power", "size", "status"];

/// Curated base gender-by-name list for C9's "base gender comes from a
/// curated name list" requirement. A small seed list; context learning
/// (`CorefEngine::learn_gender`) extends it at runtime.
pub const NAME_GENDER_SEED: &[(&str, Gender)] = &[
    ("aragorn", Gender::Male),
    ("arwen", Gender::Female),
    ("frodo", Gender::Male),
    ("gandalf", Gender::Male),
    ("ron", Gender::Male),
    ("ginny", Gender::Female),
    ("fred", Gender::Male),
    ("harry", Gender::Male),
    ("hermione", Gender::Female),
];

/// Well-known nickname/abbreviation map (C9 strategy 6). Canonical on the
/// right, surface aliases on the left — grounded on the teacher's
/// `EQUIVALENCES` const table shape (`Equivalence { canonical, aliases }`).
pub struct Nickname {
    pub alias: &'static str,
    pub canonical: &'static str,
}

pub const WELL_KNOWN_NICKNAMES: &[Nickname] = &[
    Nickname {
        alias: "Big Blue",
        canonical: "IBM",
    },
    Nickname {
        alias: "The Big Apple",
        canonical: "New York City",
    },
    Nickname {
        alias: "NYC",
        canonical: "New York City",
    },
];

pub fn resolve_nickname(surface: &str) -> Option<&'static str> {
    WELL_KNOWN_NICKNAMES
        .iter()
        .find(|n| n.alias.eq_ignore_ascii_case(surface))
        .map(|n| n.canonical)
}

/// Lazily-built lowercase `HashSet` views over the const slices above, for
/// hot-path membership tests where a linear scan of ~30 items per call would
/// otherwise show up in profiles.
mod once_cell_lexicon {
    use std::sync::OnceLock;

    use super::*;

    pub struct OnceSet {
        cell: OnceLock<HashSet<&'static str>>,
        source: &'static [&'static str],
    }

    impl OnceSet {
        pub const fn new(source: &'static [&'static str]) -> Self {
            Self {
                cell: OnceLock::new(),
                source,
            }
        }

        pub fn contains(&self, word: &str) -> bool {
            self.cell
                .get_or_init(|| self.source.iter().copied().collect())
                .contains(word)
        }
    }
}

pub static STOPWORD_SET: OnceSet = OnceSet::new(STOPWORDS);
pub static ROLE_WORD_SET: OnceSet = OnceSet::new(ROLE_WORDS);
