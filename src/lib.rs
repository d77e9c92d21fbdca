// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ares
//!
//! Offline, rule-based information-extraction engine. ARES turns prose into
//! typed entities, relations, and (optionally) cross-document identity via a
//! fixed, deterministic thirteen-stage pipeline — no neural model on the
//! core path (an external [`parser::ParserAdapter`] may be backed by one,
//! but the engine itself never calls out to one).
//!
//! ## Pipeline
//!
//! - **Schema** (`schema`): closed entity-type/predicate enums, guard and
//!   inverse tables.
//! - **Data model** (`model`): `Entity`, `Relation`, `EntityProfile`,
//!   `Pattern`, and the stage-statistics types returned from `extract()`.
//! - **Identity** (`identity`): the EID/AID/SP registries and the alias
//!   resolution cascade, threaded as one `IdentityStore` value rather than
//!   process-wide state.
//! - **Parser adapter** (`parser`): the `ParserAdapter` trait plus the
//!   default `RuleBasedParser`.
//! - **Extraction** (`extract`): windowed entity extraction (C11) and
//!   narrative/dependency-proximity relation extraction (C12).
//! - **Precision filters** (`filters`): entity quality (C6), relation
//!   quality (C7), and relation deduplication (C8).
//! - **Coreference and deixis** (`coref`, `deictic`): pronoun/title/nominal
//!   resolution and "there"/"here" location substitution.
//! - **Inverse generation** (`inverse`), **finalization** (`finalize`), and
//!   **HERT encoding** (`hert`) close out the graph before it's returned.
//! - **Orchestration** (`pipeline`): the single `extract()` entry point
//!   that wires all of the above in order.
//!
//! ## Library usage
//!
//! ```no_run
//! use ares::config::EngineConfig;
//! use ares::identity::IdentityStore;
//! use ares::parser::RuleBasedParser;
//! use ares::pipeline::{self, ExtractOptions};
//!
//! let parser = RuleBasedParser::new();
//! let identity = IdentityStore::new();
//! let config = EngineConfig::default();
//! let options = ExtractOptions::new(&parser, &identity);
//! let result = pipeline::extract("doc-1", "Aragorn married Arwen.", &config, &options).unwrap();
//! println!("{} entities, {} relations", result.entities.len(), result.relations.len());
//! ```

pub mod config;
pub mod coref;
pub mod deictic;
pub mod error;
pub mod extract;
pub mod filters;
pub mod finalize;
pub mod hert;
pub mod identity;
pub mod inverse;
pub mod lexicon;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod profile;
pub mod schema;
