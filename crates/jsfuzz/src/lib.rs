//! A coverage-guided, mutation-based fuzzer core for JavaScript engines,
//! operating on a typed intermediate representation rather than source text
//! (`spec.md` §1). This crate is the engine library; `jsfuzz-cli` drives it
//! from the command line.
//!
//! # Architecture
//!
//! - [`ir`] — the typed instruction/program representation (`spec.md` §3).
//! - [`analysis`] — online scope/context/dataflow analyzers kept current as
//!   the builder appends instructions (`spec.md` §4.2).
//! - [`interpreter`] — the pure, advisory abstract type interpreter
//!   (`spec.md` §4.3).
//! - [`builder`] — `ProgramBuilder`, the sole constructor of programs
//!   (`spec.md` §4.4).
//! - [`corpus`] — the bounded, age-cleaned sample store (`spec.md` §4.5).
//! - [`mutators`] — named `Program -> Option<Program>` transforms
//!   (`spec.md` §4.6).
//! - [`codegen`] — generator/template registries mutators and engines draw
//!   from (`spec.md` §4.8).
//! - [`engines`] — the fuzzing strategies that tie corpus, mutators and
//!   execution together into rounds (`spec.md` §4.7).
//! - [`environment`], [`lifter`], [`execution`], [`evaluator`], [`events`],
//!   [`codec`] — the external collaborators a host embeds (`spec.md` §6).
//! - [`config`] — consuming-builder configuration for the above.

pub mod analysis;
pub mod builder;
pub mod codec;
pub mod codegen;
pub mod config;
pub mod corpus;
pub mod engines;
pub mod environment;
pub mod evaluator;
pub mod events;
pub mod execution;
pub mod interpreter;
pub mod ir;
pub mod lifter;
pub mod mutators;

pub use builder::{BuilderMode, ProgramBuilder};
pub use config::{FuzzerConfig, MutationConfig};
pub use corpus::{Corpus, CorpusConfig};
pub use environment::Environment;
pub use events::{Event, EventSink};
pub use ir::Program;
