//! SpliceEngine (`spec.md` §4.7): starts from a random corpus sample and
//! performs a chain of splices against other random samples, keeping a
//! spliced child when it turns up new coverage and, otherwise, only with
//! probability 0.8 — reverting to the pre-splice baseline the rest of the
//! time so a long chain doesn't drift arbitrarily far from anything the
//! corpus has actually exercised.

use rand::Rng;

use crate::config::FuzzerConfig;
use crate::corpus::Corpus;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::events::EventSink;
use crate::execution::{ExecutionOutcome, Executor};
use crate::mutators::splice::SpliceMutator;

use super::EngineStats;

/// Splices that don't turn up new coverage are still kept with this
/// probability, to let non-improving splices occasionally ride along rather
/// than being rejected outright every time.
pub(crate) const KEEP_WITHOUT_IMPROVEMENT_PROBABILITY: f64 = 0.8;

#[derive(Default)]
pub struct SpliceEngine {
    stats: EngineStats,
}

impl SpliceEngine {
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

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
        let Some(seed) = corpus.random_element_for_splicing(rng) else {
            return;
        };
        let mut baseline = seed.clone();
        let splicer = SpliceMutator;

        for _ in 0..config.splices_per_round() {
            let Some(donor) = corpus.random_element_for_splicing(rng).cloned() else {
                continue;
            };
            let Some(child) = splicer.mutate_with_donor(&baseline, &donor, env, config.mode(), rng) else {
                continue;
            };

            let interesting_before = self.stats.interesting();
            let outcome = super::execute(&child, executor, evaluator, sink, config.timeout(), &mut self.stats);
            if outcome != ExecutionOutcome::Succeeded {
                continue;
            }

            let found_new_coverage = self.stats.interesting() > interesting_before;
            let keep = found_new_coverage || rng.gen_bool(KEEP_WITHOUT_IMPROVEMENT_PROBABILITY);
            if keep {
                baseline = child;
                corpus.add(baseline.clone());
            }
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
    use crate::ir::BinaryOperator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seeded_corpus(env: &Environment) -> Corpus {
        let mut corpus = Corpus::new(CorpusConfig::default());
        let mut builder = crate::builder::ProgramBuilder::new(env, None, crate::builder::BuilderMode::Aggressive);
        let a = builder.load_int(1);
        let b = builder.load_int(2);
        builder.binary(BinaryOperator::Add, a, b);
        corpus.add(builder.finalize());
        corpus
    }

    #[test]
    fn a_round_keeps_the_corpus_non_empty() {
        let env = Environment::minimal();
        let mut corpus = seeded_corpus(&env);
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut engine = SpliceEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);

        assert!(!corpus.is_empty());
        assert_eq!(engine.stats().rounds(), 1);
    }

    #[test]
    fn a_round_on_a_cold_corpus_self_seeds_and_does_not_panic() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut engine = SpliceEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);
        assert!(!corpus.is_empty());
    }
}
