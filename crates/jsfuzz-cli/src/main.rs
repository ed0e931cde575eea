use std::{env, fs, process::ExitCode, time::Instant};

use jsfuzz::corpus::{Corpus, CorpusConfig};
use jsfuzz::engines::multi::MultiEngine;
use jsfuzz::environment::Environment;
use jsfuzz::evaluator::AlwaysNewEvaluator;
use jsfuzz::events::{Event, EventSink, StderrEventSink};
use jsfuzz::execution::InProcessStubExecutor;
use jsfuzz::lifter::{DebugLifter, Lifter};
use jsfuzz::FuzzerConfig;
use rand::{rngs::StdRng, SeedableRng};

const DEFAULT_ROUNDS: u64 = 1_000;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let rounds: u64 = args.get(1).and_then(|a| a.parse().ok()).unwrap_or(DEFAULT_ROUNDS);
    let corpus_path = args.get(2).map(String::as_str);

    let env = Environment::minimal();
    let config = FuzzerConfig::default();
    let mut corpus = Corpus::new(CorpusConfig::default());

    if let Some(path) = corpus_path {
        if let Ok(bytes) = fs::read(path) {
            let errors = corpus.import_state(&bytes);
            for err in &errors {
                eprintln!("warning: skipped a corrupt corpus record: {err}");
            }
            eprintln!("loaded {} programs from {path}", corpus.len());
        }
    }

    let mut executor = InProcessStubExecutor;
    let mut evaluator = AlwaysNewEvaluator;
    let mut sink = CountingEventSink::default();
    let mut rng = StdRng::from_entropy();
    let mut engine = MultiEngine::default();

    let start = Instant::now();
    for _ in 0..rounds {
        engine.run_round(&mut corpus, &env, &config, &mut executor, &mut evaluator, &mut sink, &mut rng);
    }
    let elapsed = start.elapsed();

    eprintln!(
        "ran {rounds} rounds in {elapsed:?}: {} executions, {} interesting, {} crashes, {} timeouts, corpus size {}",
        engine.stats().executions(),
        engine.stats().interesting(),
        engine.stats().crashes(),
        engine.stats().timeouts(),
        corpus.len(),
    );

    if let Some(program) = corpus.random_element_for_splicing(&mut rng) {
        eprintln!("--- sample corpus program ---\n{}", DebugLifter.lift(program));
    }

    if let Some(path) = corpus_path {
        if let Err(err) = fs::write(path, corpus.export_state()) {
            eprintln!("error writing corpus to {path}: {err}");
            return ExitCode::FAILURE;
        }
        eprintln!("saved {} programs to {path}", corpus.len());
    }

    if sink.crashes > 0 {
        eprintln!("found {} crash(es) this run", sink.crashes);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Forwards every event to stderr like `StderrEventSink`, while also
/// tallying crashes so `main` can report a failing exit code.
#[derive(Default)]
struct CountingEventSink {
    inner: StderrEventSink,
    crashes: u64,
}

impl EventSink for CountingEventSink {
    fn dispatch(&mut self, event: &Event<'_>) {
        if matches!(event, Event::CrashFound { .. }) {
            self.crashes += 1;
        }
        self.inner.dispatch(event);
    }
}
