//! Evicting sample store with age-based cleanup and sampling (`spec.md` §4.5).

use std::collections::VecDeque;

use rand::Rng;

use crate::codec::{self, CodecError};
use crate::ir::{Instruction, Op, Program, Variable};

/// Builder-style configuration: consuming `pub fn x(mut self, v) -> Self`
/// setters rather than public fields.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    max_size: usize,
    min_size: usize,
    min_mutations_per_sample: u32,
    static_corpus: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { max_size: 10_000, min_size: 1, min_mutations_per_sample: 5, static_corpus: false }
    }
}

impl CorpusConfig {
    #[must_use]
    pub fn max_size(mut self, v: usize) -> Self {
        self.max_size = v;
        self
    }

    #[must_use]
    pub fn min_size(mut self, v: usize) -> Self {
        self.min_size = v;
        self
    }

    #[must_use]
    pub fn min_mutations_per_sample(mut self, v: u32) -> Self {
        self.min_mutations_per_sample = v;
        self
    }

    /// Disables `cleanup()` entirely, per `spec.md` §4.5.
    #[must_use]
    pub fn static_corpus(mut self, v: bool) -> Self {
        self.static_corpus = v;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CorpusEntry {
    program: Program,
    age: u32,
}

impl CorpusEntry {
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }
}

/// Bounded ring buffer of `(Program, age)` entries: oldest-first eviction
/// over a `VecDeque` for O(1) push/pop at either end.
#[derive(Debug)]
pub struct Corpus {
    entries: VecDeque<CorpusEntry>,
    config: CorpusConfig,
    programs_ever_added: u64,
}

impl Corpus {
    /// Builds an empty corpus (no seed program synthesized yet — call
    /// `ensure_non_empty` after construction, mirroring `spec.md` §4.5's
    /// "if empty at startup, a trivial seed program is synthesized").
    #[must_use]
    pub fn new(config: CorpusConfig) -> Self {
        Self { entries: VecDeque::new(), config, programs_ever_added: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    #[must_use]
    pub fn programs_ever_added(&self) -> u64 {
        self.programs_ever_added
    }

    /// Iterates stored programs oldest-first, without touching their ages.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.entries.iter().map(CorpusEntry::program)
    }

    /// Synthesizes and adds a one-instruction seed program if the corpus is
    /// empty. Idempotent.
    pub fn ensure_non_empty(&mut self) {
        if !self.entries.is_empty() {
            return;
        }
        let v0 = Variable::new(0);
        let seed = Program::new(
            uuid::Uuid::new_v4(),
            vec![Instruction::new(Op::LoadUndefined, smallvec::smallvec![v0], 0)],
            None,
            None,
        );
        self.add(seed);
    }

    /// Rejects empty programs; otherwise appends with age 0, evicting the
    /// oldest entry on overflow. Returns whether the program was accepted.
    pub fn add(&mut self, program: Program) -> bool {
        if program.is_empty() {
            return false;
        }
        if self.entries.len() >= self.config.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(CorpusEntry { program, age: 0 });
        self.programs_ever_added += 1;
        true
    }

    /// Returns a uniformly random entry and increments its age.
    #[must_use]
    pub fn random_element_for_mutating(&mut self, rng: &mut impl Rng) -> Option<&Program> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.entries.len());
        self.entries[idx].age += 1;
        Some(&self.entries[idx].program)
    }

    /// Returns a uniformly random entry without aging it.
    #[must_use]
    pub fn random_element_for_splicing(&self, rng: &mut impl Rng) -> Option<&Program> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.entries.len());
        Some(&self.entries[idx].program)
    }

    /// Sum of ages across every entry — used by `I5`.
    #[must_use]
    pub fn total_age(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.age)).sum()
    }

    /// Keeps entry `i` iff `age[i] < minMutationsPerSample` or dropping it
    /// would take the corpus below `minSize`; no-op in static-corpus mode.
    pub fn cleanup(&mut self) {
        if self.config.static_corpus {
            return;
        }
        let min_size = self.config.min_size;
        let threshold = self.config.min_mutations_per_sample;
        let total = self.entries.len();

        let mut kept: VecDeque<CorpusEntry> = VecDeque::with_capacity(total);
        // Iterate in insertion order; a later entry can only be dropped if
        // doing so still leaves at least `min_size` entries once every
        // remaining (not-yet-visited) entry is accounted for.
        let entries: Vec<CorpusEntry> = self.entries.drain(..).collect();
        for (i, entry) in entries.into_iter().enumerate() {
            let remaining_after_this = total - i - 1;
            let would_starve = kept.len() + remaining_after_this < min_size;
            if entry.age < threshold || would_starve {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
    }

    pub fn export_state(&self) -> Vec<u8> {
        codec::encode_all(self.entries.iter().map(CorpusEntry::program))
    }

    /// Replaces the ring with the decoded programs, resetting every age to
    /// 0. Records skipped on decode error are reported but don't abort the
    /// import (`spec.md` §7 "codec errors").
    pub fn import_state(&mut self, bytes: &[u8]) -> Vec<CodecError> {
        let (programs, errors) = codec::decode_all(bytes);
        self.entries = programs.into_iter().map(|program| CorpusEntry { program, age: 0 }).collect();
        self.programs_ever_added += self.entries.len() as u64;
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use smallvec::smallvec;

    fn sample_program(value: i64) -> Program {
        let v0 = Variable::new(0);
        Program::new(uuid::Uuid::new_v4(), vec![Instruction::new(Op::LoadInt(value), smallvec![v0], 0)], None, None)
    }

    #[test]
    fn empty_program_is_rejected() {
        let mut corpus = Corpus::new(CorpusConfig::default());
        let empty = Program::new(uuid::Uuid::new_v4(), vec![], None, None);
        assert!(!corpus.add(empty));
        assert!(corpus.is_empty());
    }

    #[test]
    fn cleanup_preserves_minimum() {
        let mut corpus = Corpus::new(CorpusConfig::default().min_size(2).max_size(100).min_mutations_per_sample(5));
        for i in 0..100 {
            corpus.add(sample_program(i));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..99 {
            for idx in 0..corpus.entries.len() {
                corpus.entries[idx].age = 99;
            }
            let _ = corpus.random_element_for_mutating(&mut rng);
        }
        // Manually age 99 of the 100 entries past the threshold.
        for idx in 0..corpus.entries.len().saturating_sub(1) {
            corpus.entries[idx].age = 99;
        }
        corpus.cleanup();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.entries.iter().all(|e| !e.program.is_empty()));
    }

    #[test]
    fn mutating_samples_ages_only_that_entry() {
        let mut corpus = Corpus::new(CorpusConfig::default());
        corpus.add(sample_program(1));
        corpus.add(sample_program(2));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..10 {
            corpus.random_element_for_mutating(&mut rng);
        }
        assert_eq!(corpus.total_age(), 10);
    }

    #[test]
    fn export_import_round_trips() {
        let mut corpus = Corpus::new(CorpusConfig::default());
        for i in 0..5 {
            corpus.add(sample_program(i));
        }
        let bytes = corpus.export_state();
        let mut other = Corpus::new(CorpusConfig::default());
        let errors = other.import_state(&bytes);
        assert!(errors.is_empty());
        assert_eq!(other.len(), 5);
    }
}
