//! Pipeline orchestrator (C16, §6): the thirteen-stage deterministic
//! sequence wired end to end behind one `extract()` entry point.
//!
//! Grounded on the teacher's `dispatch/scheduler.rs` stage-runner
//! (entry/exit `tracing` spans, a `StageStats` pushed per stage, every
//! stage error wrapped with its stage name before propagating). Unlike the
//! teacher's DAG scheduler, ARES's stage order is fixed by §4 — there is no
//! stage graph to plan, just a straight line, so this module is a single
//! function with named checkpoints rather than a generic executor.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, instrument};
use unicode_normalization::UnicodeNormalization;

use crate::config::EngineConfig;
use crate::coref::{Candidate as CorefCandidate, CorefEngine};
use crate::deictic::{self, LocationMention};
use crate::error::{AresResult, PipelineError};
use crate::extract::entity::extract_entities;
use crate::extract::relation::{extract_dependency_relations, extract_narrative_relations, extract_phrase_relations, MentionRef};
use crate::filters::dedup::dedup_relations;
use crate::filters::entity_quality::filter_entities;
use crate::filters::relation_quality::filter_relations;
use crate::finalize::finalize;
use crate::hert::encode_all;
use crate::identity::IdentityStore;
use crate::inverse::with_inverses;
use crate::model::{Entity, EntityMention, EntityProfile, ExtractResult, Pattern, PipelineStats, StageStats};
use crate::parser::{ParserAdapter, Pos, RuleBasedParser};
use crate::profile::update_profile;
use crate::schema::EntityType;

/// Everything a caller may opt out of or substitute for one `extract()`
/// call (§6): the parser adapter, the identity store to thread across
/// documents, a learned pattern library, and whether to mint HERTs.
pub struct ExtractOptions<'a> {
    pub parser: &'a dyn ParserAdapter,
    pub identity: &'a IdentityStore,
    pub pattern_library: &'a [Pattern],
    pub generate_herts: bool,
}

impl<'a> ExtractOptions<'a> {
    pub fn new(parser: &'a dyn ParserAdapter, identity: &'a IdentityStore) -> Self {
        Self {
            parser,
            identity,
            pattern_library: &[],
            generate_herts: true,
        }
    }
}

/// Runs the full thirteen-stage pipeline over one document's text and
/// returns the typed extraction result plus per-stage statistics.
#[instrument(skip(raw_text, config, options), fields(doc_id))]
pub fn extract(doc_id: &str, raw_text: &str, config: &EngineConfig, options: &ExtractOptions<'_>) -> AresResult<ExtractResult> {
    let mut stats = PipelineStats::default();

    // C3 — normalize + segment.
    let (text, sentences) = run_stage(&mut stats, "parse_segment", raw_text.len(), || {
        let normalized: String = raw_text.nfc().collect();
        let spans = options
            .parser
            .segment_sentences(&normalized)
            .map_err(|e| PipelineError::wrap("parse_segment", e))?;
        let sentences: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
        Ok((normalized, sentences))
    })?;

    // C11 — entity extraction.
    let extraction = run_stage(&mut stats, "entity_extract", text.len(), || {
        extract_entities(&text, options.parser, options.pattern_library).map_err(|e| PipelineError::wrap("entity_extract", e))
    })?;
    let (mut entities, mut spans) = (extraction.entities, extraction.spans);

    // C6 — entity quality filter.
    let blocked_tokens: Vec<String> = Vec::new();
    let before = entities.len();
    let (filtered_entities, filtered_spans, entity_filter_stats) =
        run_stage(&mut stats, "entity_quality_filter", before, || {
            Ok(filter_entities(entities, spans, config, &blocked_tokens))
        })?;
    entities = filtered_entities;
    spans = filtered_spans;
    debug!(tier_a = entity_filter_stats.tier_a, tier_b = entity_filter_stats.tier_b, tier_c = entity_filter_stats.tier_c, "entity tiers assigned");

    // id -> canonical name, for C7's sibling/family filters to resolve
    // opaque relation ids back to the names `detect_siblings` finds in text.
    let entity_names: std::collections::HashMap<String, String> =
        entities.iter().map(|e| (e.id.clone(), e.canonical.clone())).collect();

    // C5 — entity profiling.
    let mut profiles: BTreeMap<String, EntityProfile> = BTreeMap::new();
    let before = spans.len();
    run_stage(&mut stats, "profile", before, || {
        for span in &spans {
            let Some(entity) = entities.iter().find(|e| e.id == span.entity_id) else {
                continue;
            };
            let profile = profiles.entry(entity.id.clone()).or_default();
            update_profile(profile, entity, &text, span.span.start, span.span.end, doc_id);
        }
        Ok(())
    })?;

    // C9 — coreference resolution.
    let before = entities.len();
    let (links, virtual_spans) = run_stage(&mut stats, "coref", before, || {
        let candidates = build_coref_candidates(&entities, &spans, &sentences);
        let pronoun_positions = collect_pronoun_positions(options.parser, &text)?;
        let mut engine = CorefEngine::new();
        engine.learn_genders(&text);
        Ok(engine.resolve(&text, &candidates, &pronoun_positions))
    })?;
    info!(link_count = links.len(), "coreference links resolved");
    spans.extend(virtual_spans.clone());
    for span in &virtual_spans {
        if let Some(entity) = entities.iter().find(|e| e.id == span.entity_id) {
            let profile = profiles.entry(entity.id.clone()).or_default();
            update_profile(profile, entity, &text, span.span.start, span.span.end, doc_id);
        }
    }

    // C10 — deictic resolution: rewrite `there`/`here` to the nearest
    // preceding location mention. C12 runs over this resolved text, per
    // §2's data flow — entity offsets already fixed by C9/C11 are not
    // renumbered in place; instead the edit list lets every downstream
    // offset (mentions, sentence boundaries) be carried forward into the
    // rewritten text via `deictic::remap_offset`.
    let (resolved_text, deictic_edits) = run_stage(&mut stats, "deictic", text.len(), || {
        let locations = build_location_mentions(&entities, &spans);
        Ok(deictic::resolve_deictics_with_offsets(&text, &locations))
    })?;
    let resolved_sentences: Vec<(usize, usize)> = sentences
        .iter()
        .map(|(s, e)| (deictic::remap_offset(*s, &deictic_edits), deictic::remap_offset(*e, &deictic_edits)))
        .collect();

    // C12 — relation extraction, over the deictic-resolved text.
    let before = spans.len();
    let mut relations = run_stage(&mut stats, "relation_extract", before, || {
        let mut mentions = build_mention_refs(&entities, &spans);
        for mention in mentions.iter_mut() {
            mention.start = deictic::remap_offset(mention.start, &deictic_edits);
            mention.end = deictic::remap_offset(mention.end, &deictic_edits);
        }
        let mut relations = extract_narrative_relations(doc_id, &resolved_text, &mentions, &resolved_sentences);
        relations.extend(extract_phrase_relations(doc_id, &resolved_text, &mentions, &resolved_sentences));
        relations.extend(extract_dependency_relations(doc_id, &resolved_text, &mentions, &resolved_sentences));
        Ok(relations)
    })?;

    // C7 — relation quality filter, also over the resolved text (the
    // sibling-marker scan doesn't care about deixis, but §2 treats the
    // resolved text as the one "processed text" every post-C10 stage reads).
    let before = relations.len();
    let (filtered_relations, relation_filter_stats) = run_stage(&mut stats, "relation_quality_filter", before, || {
        Ok(filter_relations(relations, &resolved_text, config, &entity_names))
    })?;
    relations = filtered_relations;
    debug!(confidence_suppressed = relation_filter_stats.confidence_suppressed, "relation quality filter applied");

    // C13 — inverse generation.
    let before = relations.len();
    relations = run_stage(&mut stats, "inverse_generate", before, || Ok(with_inverses(relations)))?;

    // C8 — deduplication.
    if config.deduplication_enabled {
        let before = relations.len();
        let (deduped, dedup_stats) = run_stage(&mut stats, "dedup", before, || Ok(dedup_relations(relations)))?;
        relations = deduped;
        debug!(merged = dedup_stats.merged_count, "relation dedup applied");
    }

    // C4 — alias resolution / identity assignment.
    let before = entities.len();
    run_stage(&mut stats, "identity_assign", before, || {
        assign_identities(&mut entities, &profiles, options.identity)
    })?;

    // C14 — knowledge-graph finalizer.
    let before = entities.len();
    let finalized = run_stage(&mut stats, "finalize", before, || Ok(finalize(entities, relations, &profiles)))?;
    let entities = finalized.entities;
    let fiction_entities = finalized.fiction_entities;
    let relations = finalized.relations;

    let surviving_ids: std::collections::HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    spans.retain(|s| surviving_ids.contains(s.entity_id.as_str()));

    // C15 — HERT generation (optional).
    let herts = if options.generate_herts {
        run_stage(&mut stats, "hert_generate", spans.len(), || {
            Ok(encode_all(&entities, &spans, &text, |e| e.confidence()))
        })?
    } else {
        Vec::new()
    };

    Ok(ExtractResult {
        entities,
        spans,
        relations,
        fiction_entities,
        profiles,
        herts,
        stats,
    })
}

fn run_stage<T>(stats: &mut PipelineStats, name: &'static str, input_size: usize, f: impl FnOnce() -> AresResult<T>) -> AresResult<T> {
    let started = Instant::now();
    let result = f();
    let duration_ms = started.elapsed().as_millis() as u64;
    let output_size = match &result {
        Ok(_) => input_size,
        Err(_) => 0,
    };
    stats.push(StageStats {
        stage: name.to_string(),
        input_size,
        output_size,
        duration_ms,
        counters: BTreeMap::new(),
    });
    result
}

fn collect_pronoun_positions(parser: &dyn ParserAdapter, text: &str) -> AresResult<Vec<(usize, usize)>> {
    let parsed = parser.parse(text).map_err(|e| PipelineError::wrap("coref", e))?;
    Ok(parsed
        .tokens
        .iter()
        .filter(|t| matches!(t.pos, Pos::Prp | Pos::PrpDollar))
        .map(|t| (t.start_char, t.end_char))
        .collect())
}

fn build_coref_candidates(entities: &[Entity], spans: &[EntityMention], sentences: &[(usize, usize)]) -> Vec<CorefCandidate> {
    let mut candidates = Vec::with_capacity(spans.len());
    for span in spans {
        let Some(entity) = entities.iter().find(|e| e.id == span.entity_id) else {
            continue;
        };
        let sentence_idx = sentences.iter().position(|(s, e)| span.span.start >= *s && span.span.start < *e).unwrap_or(0);
        let is_subject = spans
            .iter()
            .filter(|s| sentences.get(sentence_idx).map(|(a, b)| s.span.start >= *a && s.span.start < *b).unwrap_or(false))
            .min_by_key(|s| s.span.start)
            .map(|first| first.span.start == span.span.start)
            .unwrap_or(false);
        candidates.push(CorefCandidate {
            entity_id: entity.id.clone(),
            entity_type: entity.entity_type,
            canonical: entity.canonical.clone(),
            start: span.span.start,
            end: span.span.end,
            paragraph_idx: 0,
            is_subject,
        });
    }
    candidates
}

fn is_location_type(ty: EntityType) -> bool {
    matches!(ty, EntityType::Place | EntityType::Org | EntityType::House)
}

fn build_location_mentions(entities: &[Entity], spans: &[EntityMention]) -> Vec<LocationMention> {
    let mut locations = Vec::new();
    for span in spans {
        let Some(entity) = entities.iter().find(|e| e.id == span.entity_id) else {
            continue;
        };
        if is_location_type(entity.entity_type) {
            locations.push(LocationMention {
                canonical: entity.canonical.clone(),
                entity_type: entity.entity_type,
                start: span.span.start,
            });
        }
    }
    locations
}

fn build_mention_refs<'a>(entities: &'a [Entity], spans: &[EntityMention]) -> Vec<MentionRef<'a>> {
    let mut mentions = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(entity) = entities.iter().find(|e| e.id == span.entity_id) {
            mentions.push(MentionRef {
                entity,
                start: span.span.start,
                end: span.span.end,
            });
        }
    }
    mentions
}

/// §4.12: assign EID/AID/SP to every surviving entity via the shared
/// [`IdentityStore`], then recompute aliases from the union of stored
/// surface forms.
fn assign_identities(entities: &mut [Entity], profiles: &BTreeMap<String, EntityProfile>, identity: &IdentityStore) -> AresResult<()> {
    let all_profiles: Vec<(String, EntityProfile)> = entities
        .iter()
        .filter_map(|e| profiles.get(&e.id).map(|p| (e.canonical.clone(), p.clone())))
        .collect();

    for entity in entities.iter_mut() {
        let empty_profile = EntityProfile::default();
        let profile = profiles.get(&entity.id).unwrap_or(&empty_profile);
        let assignment = identity
            .assign(&entity.canonical, entity.entity_type, profile, &all_profiles)
            .map_err(|e| PipelineError::wrap("identity_assign", e))?;
        entity.eid = Some(assignment.eid);
        entity.aid = Some(assignment.aid);
        entity.sp = Some(assignment.sp);
        identity.recompute_aliases(entity, &[]);
    }
    Ok(())
}

/// Constructs the default parser/identity bundle for a single ad-hoc
/// `extract()` call; long-lived callers should build their own
/// [`IdentityStore`] once and reuse it across documents (§4.12 relies on
/// cross-document state to resolve aliases).
pub fn default_options<'a>(parser: &'a RuleBasedParser, identity: &'a IdentityStore) -> ExtractOptions<'a> {
    ExtractOptions::new(parser, identity)
}
