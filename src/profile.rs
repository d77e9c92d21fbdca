//! Entity profiler (C5): incrementally accumulates descriptors, titles,
//! roles, attributes, and context per entity.
//!
//! Grounded on the teacher's `grammar/preprocess.rs` lexical-extraction
//! style (plain regex/window scans producing small DTOs) applied to §4.5's
//! exact rules: appositive descriptors, role indicators within 50 chars,
//! attribute keywords, title variants, capped context.

use regex::Regex;
use std::sync::OnceLock;

use crate::lexicon::{ATTRIBUTE_KEYWORDS, ROLE_WORDS};
use crate::model::{Entity, EntityProfile};

fn appositive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*(?:a|an)\s+([a-z][a-z\s-]{0,40}?)(?:[.,;]|$)").unwrap())
}

fn title_variant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bthe\s+([A-Z][a-zA-Z]+)\b").unwrap())
}

/// Locate the sentence containing `pos` within `text`, bounded by `. ! ?`
/// or the text edges.
fn containing_sentence(text: &str, pos: usize) -> (usize, usize) {
    let before = text[..pos.min(text.len())].rfind(['.', '!', '?']).map(|i| i + 1).unwrap_or(0);
    let after = text[pos.min(text.len())..]
        .find(['.', '!', '?'])
        .map(|i| pos + i + 1)
        .unwrap_or(text.len());
    (before, after)
}

/// Mutates `profile` in place for one `(entity, span)` mention (§4.5).
pub fn update_profile(profile: &mut EntityProfile, entity: &Entity, text: &str, mention_start: usize, mention_end: usize, doc_id: &str) {
    let (sent_start, sent_end) = containing_sentence(text, mention_start);
    let sentence = text.get(sent_start..sent_end).unwrap_or("").trim();

    let tail = text.get(mention_end..sent_end.min(text.len())).unwrap_or("");
    if let Some(caps) = appositive_re().captures(tail) {
        if let Some(desc) = caps.get(1) {
            let desc = desc.as_str().trim();
            if !desc.is_empty() {
                profile.add_descriptor(desc.to_string());
                for word in desc.split_whitespace() {
                    if ROLE_WORDS.contains(&word.to_lowercase().as_str()) {
                        profile.add_role(word.to_lowercase());
                    }
                }
            }
        }
    }

    // Role indicators within 50 characters of the mention (before or after).
    let window_start = mention_start.saturating_sub(50);
    let window_end = (mention_end + 50).min(text.len());
    if let Some(window) = text.get(window_start..window_end) {
        for word in window.split_whitespace() {
            let lower = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if ROLE_WORDS.contains(&lower.as_str()) {
                profile.add_role(lower);
            }
        }
    }

    // Attribute keywords with their value sets: "<keyword>: <value>" or
    // "<keyword> of <value>" within the sentence.
    for keyword in ATTRIBUTE_KEYWORDS {
        if let Some(idx) = sentence.to_lowercase().find(keyword) {
            let rest = &sentence[idx + keyword.len()..];
            if let Some(value) = rest.split_whitespace().find(|w| !w.is_empty()) {
                let cleaned = value.trim_matches(|c: char| !c.is_alphanumeric());
                if !cleaned.is_empty() {
                    profile.add_attribute(keyword.to_string(), cleaned.to_string());
                }
            }
        }
    }

    // Title variants ("X the Grey").
    if entity.canonical.split_whitespace().count() >= 1 {
        for caps in title_variant_re().captures_iter(sentence) {
            if let Some(epithet) = caps.get(1) {
                if sentence.contains(&entity.canonical) || sentence.contains(entity.canonical.split_whitespace().next().unwrap_or("")) {
                    profile.add_title(format!("{} the {}", entity.canonical.split_whitespace().next().unwrap_or(&entity.canonical), epithet.as_str()));
                }
            }
        }
    }

    profile.record_mention(doc_id, Some(sentence.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityType;

    #[test]
    fn extracts_appositive_descriptor() {
        let text = "Gandalf the Grey was a wise wizard. The wizard traveled to Rivendell.";
        let entity = Entity::new("e1", EntityType::Person, "Gandalf the Grey");
        let mut profile = EntityProfile::default();
        update_profile(&mut profile, &entity, text, 0, "Gandalf the Grey".len(), "doc1");
        assert!(profile.descriptors.iter().any(|d| d.contains("wise")));
    }

    #[test]
    fn mention_count_increments() {
        let text = "Aragorn ruled Gondor.";
        let entity = Entity::new("e1", EntityType::Person, "Aragorn");
        let mut profile = EntityProfile::default();
        update_profile(&mut profile, &entity, text, 0, 7, "doc1");
        assert_eq!(profile.mention_count, 1);
    }

    #[test]
    fn role_word_within_window_is_captured() {
        let text = "Aragorn the king ruled wisely over Gondor.";
        let entity = Entity::new("e1", EntityType::Person, "Aragorn");
        let mut profile = EntityProfile::default();
        update_profile(&mut profile, &entity, text, 0, 7, "doc1");
        assert!(profile.roles.contains(&"king".to_string()));
    }
}
