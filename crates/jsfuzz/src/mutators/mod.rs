//! Mutators (`spec.md` §4.6): each is a named transform `parent -> Option<Program>`,
//! built exclusively through `ProgramBuilder` — never by editing a program's
//! instructions in place.

pub mod combine;
pub mod codegen_mutator;
pub mod input;
pub mod insertion;
pub mod operation;
pub mod probing;
pub mod splice;

use rand::RngCore;

use crate::builder::{BuilderMode, ProgramBuilder};
use crate::environment::Environment;
use crate::ir::Program;

/// Running (valid, invalid) sample counts for one mutator.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutatorStats {
    valid_samples: u64,
    invalid_samples: u64,
}

impl MutatorStats {
    #[must_use]
    pub fn valid_samples(&self) -> u64 {
        self.valid_samples
    }

    #[must_use]
    pub fn invalid_samples(&self) -> u64 {
        self.invalid_samples
    }

    pub fn record(&mut self, produced: bool) {
        if produced {
            self.valid_samples += 1;
        } else {
            self.invalid_samples += 1;
        }
    }
}

/// Object-safe mutator interface: `rng` is a trait object (`&mut dyn
/// RngCore`) rather than a generic `impl Rng`, so that engines can hold a
/// heterogeneous `Vec<Box<dyn Mutator>>` and pick one at random each round.
pub trait Mutator {
    /// Stable name for diagnostics and engine reporting.
    fn name(&self) -> &'static str;

    /// Attempts one mutation of `parent`. Returns `None` if this mutator
    /// found nothing it could legally do (e.g. no eligible instruction)
    /// rather than producing a structurally broken program.
    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program>;
}

/// Retries `f` up to `attempts` times, returning the first `Some`.
/// `spec.md` §4.6: "refuse after a bounded number of attempts" rather than
/// loop forever when a mutator can't find a legal edit.
pub fn retry<T>(attempts: u32, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    for _ in 0..attempts {
        if let Some(result) = f() {
            return Some(result);
        }
    }
    None
}

/// Rebuilds `program` by adopting its entire instruction stream into a fresh
/// builder, yielding a `(builder, ())` pair ready for further appends/edits
/// at any point in the copy. Used as the common first step by mutators that
/// need to produce an edited copy rather than mutate in place.
pub fn adopt_whole<'e>(program: &Program, env: &'e Environment, mode: BuilderMode) -> ProgramBuilder<'e> {
    let mut builder = ProgramBuilder::new(env, Some(program.id()), mode);
    builder.push_adoption_frame();
    for instr in program.code() {
        builder.adopt_instruction(instr, program.types(), true);
    }
    builder.pop_adoption_frame();
    builder
}
