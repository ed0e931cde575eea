//! GenerativeEngine (`spec.md` §4.7): builds a single program from scratch via
//! pure code generation, with no parent and no mutation chain. Used to
//! bootstrap an empty corpus before any mutation-based engine has anything to
//! work from.

use rand::Rng;

use crate::builder::ProgramBuilder;
use crate::codegen::generators::named_generators;
use crate::config::FuzzerConfig;
use crate::corpus::Corpus;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::events::EventSink;
use crate::execution::{ExecutionOutcome, Executor};

use super::EngineStats;

#[derive(Default)]
pub struct GenerativeEngine {
    stats: EngineStats,
}

impl GenerativeEngine {
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Generates a program of roughly `config.program_size()` instructions
    /// from nothing, executes it once, and adds it to the corpus if it ran
    /// cleanly.
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
        let mut builder = ProgramBuilder::new(env, None, config.mode());
        builder.generate(config.program_size(), &named_generators(), None, rng);
        let program = builder.finalize();
        if program.is_empty() {
            return;
        }

        let outcome = super::execute(&program, executor, evaluator, sink, config.timeout(), &mut self.stats);
        if outcome == ExecutionOutcome::Succeeded {
            corpus.add(program);
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
    fn a_round_can_seed_an_empty_corpus() {
        let env = Environment::minimal();
        let mut corpus = Corpus::new(CorpusConfig::default());
        let config = FuzzerConfig::default();
        let mut executor = InProcessStubExecutor;
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = NoopEventSink;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut engine = GenerativeEngine::default();

        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);

        assert!(!corpus.is_empty());
        assert_eq!(engine.stats().rounds(), 1);
    }
}
