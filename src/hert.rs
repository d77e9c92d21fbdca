//! HERT generator (C15, §4.14) — stable cross-document entity identifiers.
//!
//! `HERTv1:<base62>` packs `(eid, aid, sp, document_fingerprint,
//! paragraph_index, token_start, token_length, confidence)` into one
//! opaque token. Encoding failures are non-fatal per §7 `HertError`: the
//! caller logs and skips the mention rather than aborting the document.
//! Grounded on the teacher's `export/ids.rs` base62-varint-packing style;
//! the document fingerprint uses a hand-rolled FNV-1a (§6 requires the
//! identifier to be *stable*, which rules out std's randomly-seeded
//! `DefaultHasher`).

use tracing::warn;

use crate::error::{AresError, HertError};
use crate::model::{Entity, EntityMention};

const BASE62_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// FNV-1a over the NFC-normalized document text, used as the stable
/// per-document fingerprint component of a HERT.
pub fn document_fingerprint(normalized_text: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in normalized_text.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub fn paragraph_index_at(text: &str, pos: usize) -> u32 {
    text.get(..pos.min(text.len())).map(|prefix| prefix.matches("\n\n").count() as u32).unwrap_or(0)
}

fn encode_base62(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap()
}

/// Encode one entity mention's HERT. Fields are packed into a single `u128`
/// via fixed bit widths, then base62-rendered; `confidence` is quantized to
/// a 0-1000 integer (three-decimal precision is enough for a stable id).
pub fn encode_hert(
    entity: &Entity,
    mention: &EntityMention,
    document_fingerprint: u64,
    paragraph_index: u32,
    confidence: f32,
) -> Result<String, HertError> {
    let eid = entity.eid.map(|e| e.get()).ok_or_else(|| HertError::Encoding {
        start: mention.span.start,
        end: mention.span.end,
        message: "entity has no assigned eid".to_string(),
    })?;
    let aid = entity.aid.map(|a| a.get()).unwrap_or(0);
    let sp = entity.sp.as_ref().and_then(|v| v.first().copied()).unwrap_or(0);

    let token_start = mention.span.start as u64;
    let token_length = mention.span.len() as u64;
    if token_length > u32::MAX as u64 {
        return Err(HertError::Encoding {
            start: mention.span.start,
            end: mention.span.end,
            message: "span too long to encode".to_string(),
        });
    }
    let confidence_q = (confidence.clamp(0.0, 1.0) * 1000.0).round() as u64;

    let mut packed: u128 = 0;
    packed |= eid as u128;
    packed = (packed << 32) | (aid as u128 & 0xFFFF_FFFF);
    packed = (packed << 16) | (sp as u128 & 0xFFFF);
    packed = (packed << 32) | (paragraph_index as u128);
    packed = (packed << 32) | (token_start as u128 & 0xFFFF_FFFF);
    packed = (packed << 24) | (token_length as u128 & 0xFF_FFFF);
    packed = (packed << 10) | (confidence_q as u128 & 0x3FF);

    let fp_component = encode_base62(document_fingerprint);
    let body_high = (packed >> 64) as u64;
    let body_low = packed as u64;

    Ok(format!(
        "HERTv1:{}.{}.{}",
        fp_component,
        encode_base62(body_high),
        encode_base62(body_low)
    ))
}

/// Encode HERTs for every mention whose entity carries a full identity
/// assignment, logging and skipping (not failing) any mention that can't
/// be encoded.
pub fn encode_all(
    entities: &[Entity],
    spans: &[EntityMention],
    doc_text: &str,
    confidence_of: impl Fn(&Entity) -> f32,
) -> Vec<String> {
    let fingerprint = document_fingerprint(doc_text);
    let mut herts = Vec::with_capacity(spans.len());

    for mention in spans {
        let Some(entity) = entities.iter().find(|e| e.id == mention.entity_id) else {
            continue;
        };
        let paragraph_index = paragraph_index_at(doc_text, mention.span.start);
        match encode_hert(entity, mention, fingerprint, paragraph_index, confidence_of(entity)) {
            Ok(hert) => herts.push(hert),
            Err(e) => warn!(error = %AresError::from(e), entity_id = %entity.id, "skipping HERT encoding"),
        }
    }

    herts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ids::Eid;
    use crate::model::Span;
    use crate::schema::EntityType;

    #[test]
    fn base62_roundtrip_is_nonempty_and_stable() {
        let a = encode_base62(123456789);
        let b = encode_base62(123456789);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn fingerprint_is_stable_across_calls() {
        assert_eq!(document_fingerprint("hello world"), document_fingerprint("hello world"));
        assert_ne!(document_fingerprint("hello world"), document_fingerprint("hello worle"));
    }

    #[test]
    fn encode_requires_eid() {
        let entity = Entity::new("e1", EntityType::Person, "Aragorn");
        let mention = EntityMention { entity_id: "e1".into(), span: Span::new(0, 7), virtual_method: None };
        let result = encode_hert(&entity, &mention, 42, 0, 0.8);
        assert!(result.is_err());
    }

    #[test]
    fn encode_succeeds_with_full_identity() {
        let mut entity = Entity::new("e1", EntityType::Person, "Aragorn");
        entity.eid = Eid::new(1);
        let mention = EntityMention { entity_id: "e1".into(), span: Span::new(0, 7), virtual_method: None };
        let hert = encode_hert(&entity, &mention, 42, 0, 0.8).unwrap();
        assert!(hert.starts_with("HERTv1:"));
    }
}
