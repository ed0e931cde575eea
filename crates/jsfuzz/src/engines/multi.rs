//! MultiEngine (`spec.md` §4.7): a weighted dispatcher over the other four
//! engines, picking one to run each round.

use rand::Rng;

use crate::config::FuzzerConfig;
use crate::corpus::Corpus;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::events::EventSink;
use crate::execution::Executor;

use super::generative::GenerativeEngine;
use super::hybrid::HybridEngine;
use super::mutation::MutationEngine;
use super::splice_engine::SpliceEngine;
use super::EngineStats;

/// One dispatch weight per sub-engine, in the fixed order `[mutation, hybrid,
/// splice, generative]`. Weights need not sum to 1; they're normalized at
/// selection time.
#[derive(Debug, Clone, Copy)]
pub struct EngineWeights {
    pub mutation: f64,
    pub hybrid: f64,
    pub splice: f64,
    pub generative: f64,
}

impl Default for EngineWeights {
    /// Mostly mutation, with hybrid and splice contributing meaningfully and
    /// generative reserved for bootstrapping an empty corpus.
    fn default() -> Self {
        Self { mutation: 0.5, hybrid: 0.25, splice: 0.2, generative: 0.05 }
    }
}

pub struct MultiEngine {
    weights: EngineWeights,
    mutation: MutationEngine,
    hybrid: HybridEngine,
    splice: SpliceEngine,
    generative: GenerativeEngine,
}

impl Default for MultiEngine {
    fn default() -> Self {
        Self::new(EngineWeights::default())
    }
}

impl MultiEngine {
    #[must_use]
    pub fn new(weights: EngineWeights) -> Self {
        Self { weights, mutation: MutationEngine::default(), hybrid: HybridEngine::default(), splice: SpliceEngine::default(), generative: GenerativeEngine::default() }
    }

    /// Combined stats across every sub-engine's rounds so far.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let mut total = EngineStats::default();
        for s in [self.mutation.stats(), self.hybrid.stats(), self.splice.stats(), self.generative.stats()] {
            total.merge(s);
        }
        total
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
        if corpus.is_empty() {
            self.generative.run_round(corpus, env, config, executor, evaluator, sink, rng);
            return;
        }

        let w = self.weights;
        let total = w.mutation + w.hybrid + w.splice + w.generative;
        let mut pick = rng.gen_range(0.0..total.max(f64::EPSILON));

        if pick < w.mutation {
            self.mutation.run_round(corpus, env, config, executor, evaluator, sink, rng);
            return;
        }
        pick -= w.mutation;
        if pick < w.hybrid {
            self.hybrid.run_round(corpus, env, config, executor, evaluator, sink, rng);
            return;
        }
        pick -= w.hybrid;
        if pick < w.splice {
            self.splice.run_round(corpus, env, config, executor, evaluator, sink, rng);
            return;
        }
        self.generative.run_round(corpus, env, config, executor, evaluator, sink, rng);
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
    fn cold_start_always_routes_to_generative() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut engine = MultiEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);

        assert!(!corpus.is_empty());
        assert_eq!(engine.generative.stats().rounds(), 1);
    }

    #[test]
    fn warm_corpus_rounds_dispatch_to_some_sub_engine() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        corpus.ensure_non_empty();
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut engine = MultiEngine::default();

        for _ in 0..10 {
            engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);
        }

        assert!(engine.stats().rounds() >= 10);
    }
}
