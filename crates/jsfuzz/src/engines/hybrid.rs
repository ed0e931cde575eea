//! HybridEngine (`spec.md` §4.7): builds a seed program from a random
//! `ProgramTemplate` scaffold, executes it once, and on success mutates it
//! exactly the way `MutationEngine` does.

use rand::Rng;

use crate::builder::ProgramBuilder;
use crate::codegen::templates::default_templates;
use crate::config::FuzzerConfig;
use crate::corpus::Corpus;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::events::EventSink;
use crate::execution::{ExecutionOutcome, Executor};

use super::mutation::mutate_chain;
use super::EngineStats;

#[derive(Default)]
pub struct HybridEngine {
    stats: EngineStats,
}

impl HybridEngine {
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Picks a random template, builds its scaffold, executes it once, and
    /// if it ran cleanly, chains up to `config.mutations_per_round()`
    /// mutations onto it (`spec.md` §4.7: "abort the round on the seed's own
    /// failure, else mutate the seed the same way the mutation engine does").
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
        let templates = default_templates();
        let template = &templates[rng.gen_range(0..templates.len())];

        let mut builder = ProgramBuilder::new(env, None, config.mode());
        (template.run)(&mut builder, rng);
        let seed = builder.finalize();
        if seed.is_empty() {
            return;
        }

        let interesting_before = self.stats.interesting();
        let outcome = super::execute(&seed, executor, evaluator, sink, config.timeout(), &mut self.stats);
        if outcome != ExecutionOutcome::Succeeded {
            return;
        }
        let found_new_coverage = self.stats.interesting() > interesting_before;
        if found_new_coverage || rng.gen_bool(super::splice_engine::KEEP_WITHOUT_IMPROVEMENT_PROBABILITY) {
            corpus.add(seed.clone());
        }
        mutate_chain(seed, config.mutations_per_round(), env, config, executor, evaluator, sink, &mut self.stats, corpus, rng);
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
    fn a_round_seeds_the_corpus_from_a_template() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut engine = HybridEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);

        assert!(!corpus.is_empty());
        assert_eq!(engine.stats().rounds(), 1);
    }

    /// Against a no-op executor that accepts every program, at least half of
    /// 1,000 rounds must produce a scaffold passing `Program::check_invariants`.
    #[test]
    fn a_thousand_rounds_against_a_no_op_executor_are_mostly_well_formed() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default().max_size(2000));
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let mut engine = HybridEngine::default();

        for _ in 0..1000 {
            engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);
        }

        let well_formed = corpus.programs().filter(|p| p.check_invariants().is_ok()).count();
        assert!(well_formed * 2 >= corpus.len(), "expected at least half of {} corpus programs well-formed, got {well_formed}", corpus.len());
        assert!(corpus.len() >= 500, "expected at least 500 scaffolds to have been produced, got {}", corpus.len());
    }
}
