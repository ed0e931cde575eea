//! MutationEngine (`spec.md` §4.7): draws a parent from the corpus, applies a
//! chain of up to `numConsecutiveMutations` mutations, executing after each
//! one and chaining onto the child only when it succeeded.

use rand::Rng;

use crate::builder::BuilderMode;
use crate::config::FuzzerConfig;
use crate::corpus::Corpus;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::events::EventSink;
use crate::execution::{ExecutionOutcome, Executor};
use crate::ir::Program;
use crate::mutators::codegen_mutator::CodeGenerationMutator;
use crate::mutators::input::InputMutator;
use crate::mutators::insertion::InsertionMutator;
use crate::mutators::operation::OperationMutator;
use crate::mutators::probing::ProbingMutator;
use crate::mutators::Mutator;

use super::splice_engine::KEEP_WITHOUT_IMPROVEMENT_PROBABILITY;
use super::EngineStats;

/// The single-parent mutators this engine chooses between. Splice/combine
/// need a second (donor) program and so are driven by `SpliceEngine`
/// instead (`spec.md` §4.7 keeps them as distinct engines/mutators).
pub(crate) fn mutator_pool(config: &FuzzerConfig) -> Vec<Box<dyn Mutator>> {
    let mutation = config.mutation_config();
    vec![
        Box::new(InsertionMutator),
        Box::new(OperationMutator::new(mutation.operation_probability())),
        Box::new(InputMutator::new(mutation.input_probability())),
        Box::new(CodeGenerationMutator),
        Box::new(ProbingMutator),
    ]
}

#[derive(Default)]
pub struct MutationEngine {
    stats: EngineStats,
}

impl MutationEngine {
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Runs one round: picks a corpus parent, applies up to
    /// `config.mutations_per_round()` mutations, executing and chaining
    /// after each success, re-adding the final interesting child to the
    /// corpus.
    #[allow(clippy::too_many_arguments)]
    pub fn run_round(
        &mut self,
        corpus: &mut Corpus,
        env: &Environment,
        config: &FuzzerConfig,
        executor: &mut dyn Executor,
        evaluator: &mut dyn Evaluator,
        sink: &mut dyn EventSink,
        rng: &mut impl Rng,
    ) {
        self.stats.record_round();
        corpus.ensure_non_empty();
        let Some(seed) = corpus.random_element_for_mutating(rng) else {
            return;
        };
        let parent = seed.clone();
        mutate_chain(parent, config.mutations_per_round(), env, config, executor, evaluator, sink, &mut self.stats, corpus, rng);
    }
}

/// Applies up to `rounds` single-parent mutations to `parent` in sequence,
/// executing after each one and chaining onto the child only when it
/// succeeded, re-adding every successful child to `corpus`. Shared by
/// `MutationEngine` and `HybridEngine` (`spec.md` §4.7: the hybrid engine
/// mutates its seed "the same way the mutation engine does").
#[allow(clippy::too_many_arguments)]
pub(crate) fn mutate_chain(
    mut parent: Program,
    rounds: u32,
    env: &Environment,
    config: &FuzzerConfig,
    executor: &mut dyn Executor,
    evaluator: &mut dyn Evaluator,
    sink: &mut dyn EventSink,
    stats: &mut EngineStats,
    corpus: &mut Corpus,
    rng: &mut impl Rng,
) {
    let pool = mutator_pool(config);
    let attempts = config.mutation_config().attempts();

    for _ in 0..rounds {
        let Some(child) = crate::mutators::retry(attempts, || {
            let mutator = &pool[rng.gen_range(0..pool.len())];
            mutator.mutate(&parent, env, config.mode(), rng)
        }) else {
            continue;
        };

        let interesting_before = stats.interesting();
        let outcome = super::execute(&child, executor, evaluator, sink, config.timeout(), stats);
        if outcome != ExecutionOutcome::Succeeded {
            continue;
        }

        parent = child;
        let found_new_coverage = stats.interesting() > interesting_before;
        if found_new_coverage || rng.gen_bool(KEEP_WITHOUT_IMPROVEMENT_PROBABILITY) {
            corpus.add(parent.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusConfig;
    use crate::evaluator::AlwaysNewEvaluator;
    use crate::events::NoopEventSink;
    use crate::execution::InProcessStubExecutor;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn running_a_round_keeps_the_corpus_non_empty() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut engine = MutationEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);

        assert!(!corpus.is_empty());
        assert_eq!(engine.stats().rounds(), 1);
    }
}
