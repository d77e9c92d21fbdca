//! Rich diagnostic error types for the ARES extraction engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and which stage produced it. Every stage wraps its own
//! failures in its own variant before the orchestrator rethrows — no stage
//! error escapes without a `stage` name attached.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ARES engine.
#[derive(Debug, Error, Diagnostic)]
pub enum AresError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Coref(#[from] CorefError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Finalize(#[from] FinalizeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hert(#[from] HertError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Schema errors (C1)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("predicate {pred} does not allow subject type {subj_type} / object type {obj_type}")]
    #[diagnostic(
        code(ares::schema::guard_violation),
        help(
            "Check GUARD[{pred}] in schema.rs for the allowed subject/object type \
             pairs, or fix the extractor that produced this relation."
        )
    )]
    GuardViolation {
        pred: String,
        subj_type: String,
        obj_type: String,
    },

    #[error("unknown predicate: {pred}")]
    #[diagnostic(code(ares::schema::unknown_predicate))]
    UnknownPredicate { pred: String },

    #[error("unknown entity type: {ty}")]
    #[diagnostic(code(ares::schema::unknown_type))]
    UnknownType { ty: String },
}

// ---------------------------------------------------------------------------
// Parser adapter errors (C3)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// §7 `ParserUnavailable` — the parser adapter failed to respond. Fatal;
    /// no synthesized fallback is permitted on the core path.
    #[error("parser adapter unavailable: {message}")]
    #[diagnostic(
        code(ares::parse::unavailable),
        help(
            "The underlying sentence/NER/POS parser did not respond. This is \
             fatal for the document — there is no degraded fallback on the core \
             extraction path."
        )
    )]
    ParserUnavailable { message: String },

    #[error("offset out of bounds: {offset} in text of length {len}")]
    #[diagnostic(code(ares::parse::bad_offset))]
    OffsetOutOfBounds { offset: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Identity subsystem errors (C4)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdentityError {
    /// §7 `RegistryConflict` — attempting to disambiguate but existing sense
    /// data is inconsistent. Rare; fatal.
    #[error("registry conflict for {name}/{entity_type}: {message}")]
    #[diagnostic(
        code(ares::identity::registry_conflict),
        help(
            "The sense registry holds inconsistent data for this name/type pair. \
             This indicates a bug in sense assignment or a corrupted imported \
             IdentityStore snapshot."
        )
    )]
    RegistryConflict {
        name: String,
        entity_type: String,
        message: String,
    },

    #[error("symbol id allocator exhausted")]
    #[diagnostic(code(ares::identity::allocator_exhausted))]
    AllocatorExhausted,

    #[error("serialization error: {message}")]
    #[diagnostic(code(ares::identity::serde))]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Coreference errors (C9/C10)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CorefError {
    #[error("invalid look-back window: {chars} characters")]
    #[diagnostic(
        code(ares::coref::bad_window),
        help("The look-back window must be a positive character count.")
    )]
    InvalidWindow { chars: usize },
}

// ---------------------------------------------------------------------------
// Extraction errors (C11/C12)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("invalid segment window: start {start} > end {end}")]
    #[diagnostic(code(ares::extract::bad_window))]
    InvalidWindow { start: usize, end: usize },

    #[error("pattern library entry rejected: {message}")]
    #[diagnostic(
        code(ares::extract::bad_pattern),
        help("Pattern-application failures are normally non-fatal warnings; this \
              one was promoted because it came from a malformed regex template.")
    )]
    BadPattern { message: String },
}

// ---------------------------------------------------------------------------
// Precision filter errors (C6/C7/C8)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    #[error("unknown precision mode: {mode}")]
    #[diagnostic(
        code(ares::filter::unknown_mode),
        help("ARES_PRECISION_MODE must be \"strict\", \"permissive\", or unset.")
    )]
    UnknownPrecisionMode { mode: String },
}

// ---------------------------------------------------------------------------
// Finalizer errors (C14)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FinalizeError {
    #[error("dangling relation after pruning: {subj} -> {obj}")]
    #[diagnostic(code(ares::finalize::dangling_relation))]
    DanglingRelation { subj: String, obj: String },
}

// ---------------------------------------------------------------------------
// HERT errors (C15) — §7 `HERTEncoding`, logged and skipped per mention,
// never fatal. Modeled here so call sites can still report what happened.
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum HertError {
    #[error("HERT encoding failed for span [{start}, {end}): {message}")]
    #[diagnostic(
        code(ares::hert::encode_failed),
        help("Non-fatal: the span is skipped and the rest of the document proceeds.")
    )]
    Encoding {
        start: usize,
        end: usize,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator / top-level pipeline errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// §7 `InputInvariant` — an input to a stage violates its contract.
    #[error("stage {stage} received invalid input: {message}")]
    #[diagnostic(
        code(ares::pipeline::input_invariant),
        help("Fatal for the document. Check the caller that produced this input.")
    )]
    InputInvariant { stage: &'static str, message: String },

    #[error("stage {stage} failed")]
    #[diagnostic(code(ares::pipeline::stage_failed))]
    StageFailed {
        stage: &'static str,
        #[source]
        cause: Box<AresError>,
    },
}

impl PipelineError {
    /// Wrap any error convertible to [`AresError`] with the name of the
    /// stage that produced it, per §4.1's "wraps any error with its own
    /// name and a `cause`" contract.
    pub fn wrap(stage: &'static str, cause: impl Into<AresError>) -> Self {
        PipelineError::StageFailed {
            stage,
            cause: Box::new(cause.into()),
        }
    }
}

/// Convenience alias for functions returning ARES results.
pub type AresResult<T> = std::result::Result<T, AresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_converts_to_ares_error() {
        let err = SchemaError::UnknownPredicate {
            pred: "made_up".into(),
        };
        let ares: AresError = err.into();
        assert!(matches!(ares, AresError::Schema(SchemaError::UnknownPredicate { .. })));
    }

    #[test]
    fn pipeline_error_wraps_with_stage_name() {
        let cause = ParseError::ParserUnavailable {
            message: "timeout".into(),
        };
        let wrapped = PipelineError::wrap("entity_extraction", cause);
        let msg = format!("{wrapped}");
        assert!(msg.contains("entity_extraction"));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = SchemaError::GuardViolation {
            pred: "married_to".into(),
            subj_type: "PLACE".into(),
            obj_type: "PERSON".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("married_to"));
        assert!(msg.contains("PLACE"));
    }
}
