//! Entity quality filter (C6) — Precision Layer 1 (§4.4).
//!
//! Grounded on the teacher's `grammar/lexer.rs` `Lexicon::is_void` style
//! (small boolean predicate functions over const word lists) generalized
//! into the absolute-rejection / binary-filter / tiered-filter cascade
//! §4.4 spells out, plus the two specialized operations (two-first-names
//! split, role-based rejection).

use crate::config::EngineConfig;
use crate::lexicon::{self, PERSON_HEAD_BLOCKLIST, RACE_WHITELIST, REJECTED_ROLE_TOKENS, SPECIES_WHITELIST};
use crate::model::{Entity, EntityMention, Tier};
use crate::schema::EntityType;

#[derive(Debug, Clone, Default)]
pub struct EntityFilterStats {
    pub absolute_rejections: u32,
    pub binary_rejections: u32,
    pub split_count: u32,
    pub tier_a: u32,
    pub tier_b: u32,
    pub tier_c: u32,
}

/// Apply C6 over the candidate entity/span set, returning survivors with
/// spans pruned to point only at surviving entities (§4.4 final paragraph).
pub fn filter_entities(
    entities: Vec<Entity>,
    spans: Vec<EntityMention>,
    config: &EngineConfig,
    blocked_tokens: &[String],
) -> (Vec<Entity>, Vec<EntityMention>, EntityFilterStats) {
    let mut stats = EntityFilterStats::default();

    if !config.entity_filter_active() {
        for e in &entities {
            match e.tier {
                Tier::A => stats.tier_a += 1,
                Tier::B => stats.tier_b += 1,
                Tier::C => stats.tier_c += 1,
            }
        }
        return (entities, spans, stats);
    }

    let strict = matches!(config.precision_mode, Some(crate::config::PrecisionMode::Strict));

    let split_entities = apply_two_first_names_split(entities, &mut stats);

    let mut survivors = Vec::new();
    for mut entity in split_entities {
        if fails_absolute_rejection(&entity, config, blocked_tokens) {
            stats.absolute_rejections += 1;
            continue;
        }
        if is_rejected_role_token(&entity) {
            stats.absolute_rejections += 1;
            continue;
        }
        if !type_specific_sanity(&entity) {
            stats.absolute_rejections += 1;
            continue;
        }
        if !passes_binary_filter(&entity, config, strict) {
            stats.binary_rejections += 1;
            continue;
        }

        let tier = assign_tier(&entity);
        entity.tier = tier;
        match tier {
            Tier::A => stats.tier_a += 1,
            Tier::B => stats.tier_b += 1,
            Tier::C => stats.tier_c += 1,
        }
        survivors.push(entity);
    }

    let surviving_ids: std::collections::HashSet<&str> = survivors.iter().map(|e| e.id.as_str()).collect();
    let pruned_spans = spans.into_iter().filter(|s| surviving_ids.contains(s.entity_id.as_str())).collect();

    (survivors, pruned_spans, stats)
}

fn fails_absolute_rejection(entity: &Entity, config: &EngineConfig, blocked_tokens: &[String]) -> bool {
    let canonical = entity.canonical.trim();
    if canonical.is_empty() {
        return true;
    }
    if canonical.len() < config.entity_min_length {
        return true;
    }
    if canonical.chars().all(|c| c.is_ascii_digit()) && entity.entity_type != EntityType::Date {
        return true;
    }
    if lexicon::is_stopword(canonical) {
        return true;
    }
    if lexicon::is_pronoun(canonical) {
        return true;
    }
    let alpha_ratio = if canonical.is_empty() {
        0.0
    } else {
        canonical.chars().filter(|c| c.is_alphabetic()).count() as f32 / canonical.chars().count() as f32
    };
    if alpha_ratio < 0.70 && entity.entity_type != EntityType::Date {
        return true;
    }
    if blocked_tokens.iter().any(|b| b.eq_ignore_ascii_case(canonical)) {
        return true;
    }
    if entity.entity_type.is_proper_noun_type() {
        let starts_capital = canonical.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        let has_title = lexicon::honorific_prefix(canonical).is_some();
        if !starts_capital && !has_title {
            return true;
        }
    }
    false
}

fn is_rejected_role_token(entity: &Entity) -> bool {
    REJECTED_ROLE_TOKENS.contains(&entity.canonical.to_lowercase().as_str())
}

fn type_specific_sanity(entity: &Entity) -> bool {
    let canonical = &entity.canonical;
    let token_count = canonical.split_whitespace().count();
    match entity.entity_type {
        EntityType::Person => {
            if token_count == 1 {
                let lower = canonical.to_lowercase();
                if PERSON_HEAD_BLOCKLIST.contains(&lower.as_str()) {
                    return false;
                }
                if !entity.has_ner_support() {
                    let sentence_initial = entity.attrs.iter().any(|a| {
                        matches!(a, crate::model::EntityAttr::SentencePos(p) if p.sentence_initial && !p.occurs_non_initial)
                    });
                    if sentence_initial {
                        return false;
                    }
                }
            }
            true
        }
        EntityType::Race => {
            let lower = canonical.to_lowercase();
            let is_demonym = ["an", "ian", "ese", "ish", "i"].iter().any(|suf| lower.ends_with(suf));
            let is_whitelisted = RACE_WHITELIST.iter().any(|r| r.eq_ignore_ascii_case(canonical));
            let is_gerund = lower.ends_with("ing");
            !is_gerund && (is_demonym || is_whitelisted)
        }
        EntityType::Species => SPECIES_WHITELIST.iter().any(|s| s.eq_ignore_ascii_case(canonical)),
        EntityType::Item | EntityType::Object => {
            if lexicon::is_pronoun(canonical) {
                return false;
            }
            let function_word_heavy = canonical.split_whitespace().filter(|w| lexicon::is_stopword(w)).count() * 2
                >= canonical.split_whitespace().count();
            !function_word_heavy
        }
        _ => true,
    }
}

/// §4.4: strict mode never accepts below this, even if `ENTITY_MIN_CONFIDENCE`
/// is configured more permissively than that.
const STRICT_CONFIDENCE_FLOOR: f32 = 0.75;

fn passes_binary_filter(entity: &Entity, config: &EngineConfig, strict: bool) -> bool {
    let floor = if strict {
        config.entity_min_confidence.max(STRICT_CONFIDENCE_FLOOR)
    } else {
        config.entity_min_confidence
    };
    if entity.confidence() < floor {
        return false;
    }
    if entity.entity_type == EntityType::Date {
        let canonical = &entity.canonical;
        let has_numerals = canonical.chars().any(|c| c.is_ascii_digit());
        let is_four_digit_year = canonical.len() == 4 && canonical.chars().all(|c| c.is_ascii_digit());
        let has_temporal_keyword = ["january", "february", "march", "april", "may", "june", "july", "august", "september", "october", "november", "december", "today", "yesterday", "tomorrow"]
            .iter()
            .any(|k| canonical.to_lowercase().contains(k));
        if !(has_numerals || has_temporal_keyword || is_four_digit_year) {
            return false;
        }
    }
    if strict {
        if entity.entity_type.is_proper_noun_type() && entity.canonical.split_whitespace().count() == 1 && entity.canonical.len() < 3 {
            return false;
        }
        if entity.canonical.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) && !entity.has_ner_support() {
            return false;
        }
    }
    true
}

fn assign_tier(entity: &Entity) -> Tier {
    let has_ner = entity.has_ner_support();
    let sentence_initial = entity.attrs.iter().any(|a| {
        matches!(a, crate::model::EntityAttr::SentencePos(p) if p.sentence_initial)
    });
    let occurs_non_initial = entity.attrs.iter().any(|a| {
        matches!(a, crate::model::EntityAttr::SentencePos(p) if p.occurs_non_initial)
    });
    let token_count = entity.canonical.split_whitespace().count();
    let confidence = entity.confidence();

    let mut score: f32 = confidence;
    if has_ner {
        score += 0.15;
    }
    if occurs_non_initial && !sentence_initial {
        score += 0.1;
    }
    if token_count > 1 {
        score += 0.05;
    }
    let score = score.min(1.0);

    if score >= 0.70 {
        Tier::A
    } else if score >= 0.50 {
        Tier::B
    } else {
        Tier::C
    }
}

/// §4.4's "two-first-names split": `"John Michael"` (PERSON, two capitalized
/// tokens, non-surname second token) splits into two PERSON entities with
/// deterministic IDs (§6 "entity-&lt;type&gt;-&lt;canonical&gt;").
fn apply_two_first_names_split(entities: Vec<Entity>, stats: &mut EntityFilterStats) -> Vec<Entity> {
    let mut out = Vec::with_capacity(entities.len());
    for entity in entities {
        if entity.entity_type == EntityType::Person {
            let tokens: Vec<&str> = entity.canonical.split_whitespace().collect();
            if tokens.len() == 2 && looks_like_two_first_names(tokens[0], tokens[1]) {
                stats.split_count += 1;
                for token in tokens {
                    let id = format!("entity-PERSON-{}", token.to_lowercase());
                    out.push(Entity::new(id, EntityType::Person, token.to_string()));
                }
                continue;
            }
        }
        out.push(entity);
    }
    out
}

fn looks_like_two_first_names(first: &str, second: &str) -> bool {
    let both_capitalized = first.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
        && second.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
    // A "non-surname second token" heuristic: common given names don't end
    // in typical patronymic/surname suffixes.
    let surname_suffixes = ["son", "sen", "ez", "ov", "ich"];
    both_capitalized && !surname_suffixes.iter().any(|s| second.to_lowercase().ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(canonical: &str) -> Entity {
        let mut e = Entity::new(format!("e-{canonical}"), EntityType::Person, canonical);
        e.set_confidence(0.8);
        e
    }

    #[test]
    fn empty_canonical_is_absolutely_rejected() {
        let e = Entity::new("e1", EntityType::Misc, "");
        let cfg = EngineConfig::default();
        assert!(fails_absolute_rejection(&e, &cfg, &[]));
    }

    #[test]
    fn role_token_messenger_is_rejected() {
        let e = person("messenger");
        assert!(is_rejected_role_token(&e));
    }

    #[test]
    fn strict_mode_raises_confidence_floor() {
        let mut e = person("Aragorn Elessar");
        e.set_confidence(0.6);
        let mut cfg = EngineConfig::default();
        cfg.entity_min_confidence = 0.4;
        assert!(passes_binary_filter(&e, &cfg, false));
        assert!(!passes_binary_filter(&e, &cfg, true));
    }

    #[test]
    fn configured_floor_is_respected_outside_strict_mode() {
        let mut e = person("Aragorn Elessar");
        e.set_confidence(0.6);
        let mut cfg = EngineConfig::default();
        cfg.entity_min_confidence = 0.5;
        assert!(passes_binary_filter(&e, &cfg, false));
        cfg.entity_min_confidence = 0.65;
        assert!(!passes_binary_filter(&e, &cfg, false));
    }

    #[test]
    fn date_without_numerals_or_keywords_is_rejected() {
        let mut e = Entity::new("e1", EntityType::Date, "sometime");
        e.set_confidence(0.9);
        let cfg = EngineConfig::default();
        assert!(!passes_binary_filter(&e, &cfg, false));
    }

    #[test]
    fn full_filter_prunes_spans_to_survivors() {
        let mut rejected = Entity::new("e-bad", EntityType::Misc, "");
        rejected.set_confidence(0.9);
        let good = person("Aragorn");
        let entities = vec![rejected, good];
        let spans = vec![
            EntityMention {
                entity_id: "e-bad".into(),
                span: crate::model::Span::new(0, 1),
                virtual_method: None,
            },
            EntityMention {
                entity_id: "e-Aragorn".into(),
                span: crate::model::Span::new(2, 9),
                virtual_method: None,
            },
        ];
        let cfg = EngineConfig::default();
        let (survivors, pruned, _stats) = filter_entities(entities, spans, &cfg, &[]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(pruned.len(), 1);
    }
}
