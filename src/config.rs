//! Runtime configuration, parsed from an environment-like key/value map.
//!
//! Mirrors the teacher engine's `EngineConfig` — a plain struct with a
//! `Default` impl and a constructor that reads from the process environment
//! — except here the constructor takes a `HashMap<String, String>` so the
//! whole thing is unit-testable without touching real env vars. `main.rs`
//! is the only caller that feeds it `std::env::vars().collect()`.

use std::collections::HashMap;

use crate::error::{AresResult, FilterError};

/// Precision mode for the relation-quality filter (C7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionMode {
    Strict,
    Permissive,
}

impl PrecisionMode {
    fn parse(s: &str) -> AresResult<Option<Self>> {
        match s {
            "" => Ok(None),
            "strict" => Ok(Some(PrecisionMode::Strict)),
            "permissive" => Ok(Some(PrecisionMode::Permissive)),
            other => Err(FilterError::UnknownPrecisionMode {
                mode: other.to_string(),
            }
            .into()),
        }
    }
}

/// Config for the (unused on the core path) LLM-enrichment collaborator.
/// §1 keeps this out of scope, but the external interface in §6 still
/// threads the knobs through so a caller-supplied collaborator can read
/// them back off the config.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub host: Option<String>,
}

/// All tunables for one `extract()` call.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `ENTITY_FILTER_ENABLED` (default: true).
    pub entity_filter_enabled: bool,
    /// `ENTITY_MIN_CONFIDENCE` (default: 0.7).
    pub entity_min_confidence: f32,
    /// `ENTITY_MIN_LENGTH` (default: 2).
    pub entity_min_length: usize,
    /// `ARES_PRECISION_MODE` — unset means "use C7's per-filter defaults".
    pub precision_mode: Option<PrecisionMode>,
    /// `ARES_ENTITY_FILTER` — `"off"` or `"0"` force-disables C6 regardless
    /// of `entity_filter_enabled`.
    pub entity_filter_force_disabled: bool,
    /// `ARES_MIN_CONFIDENCE` (default: 0.65) — floor applied in C7 ahead of
    /// the four ordered filters.
    pub relation_min_confidence: f32,
    /// `DEDUPLICATION_ENABLED` (default: true) — gates C8.
    pub deduplication_enabled: bool,
    /// `L3_DEBUG` — verbose per-candidate tracing in the coref stage (C9).
    pub l3_debug: bool,
    /// `L4_DEBUG` — verbose per-candidate tracing in the extraction stage
    /// (C11/C12).
    pub l4_debug: bool,
    pub llm: LlmConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_filter_enabled: true,
            entity_min_confidence: 0.7,
            entity_min_length: 2,
            precision_mode: None,
            entity_filter_force_disabled: false,
            relation_min_confidence: 0.65,
            deduplication_enabled: true,
            l3_debug: false,
            l4_debug: false,
            llm: LlmConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Build a config from an environment-like map, falling back to
    /// defaults for anything absent or unparsable-but-non-fatal (unparsable
    /// floats/bools fall back silently, matching the teacher's "bad env var
    /// degrades to default rather than panicking at startup" posture).
    pub fn from_env(env: &HashMap<String, String>) -> AresResult<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env.get("ENTITY_FILTER_ENABLED") {
            cfg.entity_filter_enabled = parse_bool(v, cfg.entity_filter_enabled);
        }
        if let Some(v) = env.get("ENTITY_MIN_CONFIDENCE") {
            cfg.entity_min_confidence = v.parse().unwrap_or(cfg.entity_min_confidence);
        }
        if let Some(v) = env.get("ENTITY_MIN_LENGTH") {
            cfg.entity_min_length = v.parse().unwrap_or(cfg.entity_min_length);
        }
        if let Some(v) = env.get("ARES_PRECISION_MODE") {
            cfg.precision_mode = PrecisionMode::parse(v)?;
        }
        if let Some(v) = env.get("ARES_ENTITY_FILTER") {
            cfg.entity_filter_force_disabled = v == "off" || v == "0";
        }
        if let Some(v) = env.get("ARES_MIN_CONFIDENCE") {
            cfg.relation_min_confidence = v.parse().unwrap_or(cfg.relation_min_confidence);
        }
        if let Some(v) = env.get("DEDUPLICATION_ENABLED") {
            cfg.deduplication_enabled = parse_bool(v, cfg.deduplication_enabled);
        }
        if let Some(v) = env.get("L3_DEBUG") {
            cfg.l3_debug = parse_bool(v, false);
        }
        if let Some(v) = env.get("L4_DEBUG") {
            cfg.l4_debug = parse_bool(v, false);
        }

        cfg.llm = LlmConfig {
            enabled: env
                .get("ARES_LLM_ENABLED")
                .map(|v| parse_bool(v, false))
                .unwrap_or(false),
            model: env.get("ARES_LLM_MODEL").cloned(),
            host: env.get("ARES_LLM_HOST").cloned(),
        };

        Ok(cfg)
    }

    /// Whether C6 (entity quality filter) should run at all.
    pub fn entity_filter_active(&self) -> bool {
        self.entity_filter_enabled && !self.entity_filter_force_disabled
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
