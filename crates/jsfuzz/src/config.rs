//! Consuming-builder configuration structs: `pub fn x(mut self, v) -> Self`
//! setters rather than public fields.

use std::time::Duration;

use crate::builder::BuilderMode;

/// Per-instruction mutation probabilities, shared by the operation and
/// input mutators (`spec.md` §4.6: "small per-instruction probability").
#[derive(Debug, Clone, Copy)]
pub struct MutationConfig {
    operation_mutation_probability: f64,
    input_mutation_probability: f64,
    max_attempts: u32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self { operation_mutation_probability: 0.1, input_mutation_probability: 0.1, max_attempts: 10 }
    }
}

impl MutationConfig {
    #[must_use]
    pub fn operation_mutation_probability(mut self, v: f64) -> Self {
        self.operation_mutation_probability = v;
        self
    }

    #[must_use]
    pub fn input_mutation_probability(mut self, v: f64) -> Self {
        self.input_mutation_probability = v;
        self
    }

    /// Bound on how many times a mutator retries before giving up
    /// (`spec.md` §4.6 "refuse after a bounded number of attempts").
    #[must_use]
    pub fn max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = v;
        self
    }

    #[must_use]
    pub fn operation_probability(&self) -> f64 {
        self.operation_mutation_probability
    }

    #[must_use]
    pub fn input_probability(&self) -> f64 {
        self.input_mutation_probability
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Top-level fuzzer configuration threaded through the engines.
#[derive(Debug, Clone)]
pub struct FuzzerConfig {
    builder_mode: BuilderMode,
    execution_timeout: Duration,
    num_consecutive_mutations: u32,
    consecutive_splices: u32,
    generative_program_size: u32,
    mutation: MutationConfig,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            builder_mode: BuilderMode::Aggressive,
            execution_timeout: Duration::from_millis(250),
            num_consecutive_mutations: 5,
            consecutive_splices: 5,
            generative_program_size: 25,
            mutation: MutationConfig::default(),
        }
    }
}

impl FuzzerConfig {
    #[must_use]
    pub fn builder_mode(mut self, v: BuilderMode) -> Self {
        self.builder_mode = v;
        self
    }

    #[must_use]
    pub fn execution_timeout(mut self, v: Duration) -> Self {
        self.execution_timeout = v;
        self
    }

    #[must_use]
    pub fn num_consecutive_mutations(mut self, v: u32) -> Self {
        self.num_consecutive_mutations = v;
        self
    }

    #[must_use]
    pub fn consecutive_splices(mut self, v: u32) -> Self {
        self.consecutive_splices = v;
        self
    }

    #[must_use]
    pub fn generative_program_size(mut self, v: u32) -> Self {
        self.generative_program_size = v;
        self
    }

    #[must_use]
    pub fn mutation(mut self, v: MutationConfig) -> Self {
        self.mutation = v;
        self
    }

    #[must_use]
    pub fn mode(&self) -> BuilderMode {
        self.builder_mode
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.execution_timeout
    }

    #[must_use]
    pub fn mutations_per_round(&self) -> u32 {
        self.num_consecutive_mutations
    }

    #[must_use]
    pub fn splices_per_round(&self) -> u32 {
        self.consecutive_splices
    }

    #[must_use]
    pub fn program_size(&self) -> u32 {
        self.generative_program_size
    }

    #[must_use]
    pub fn mutation_config(&self) -> MutationConfig {
        self.mutation
    }
}
