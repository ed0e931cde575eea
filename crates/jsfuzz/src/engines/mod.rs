//! Fuzz engines (`spec.md` §4.7): five strategies sharing one
//! `execute(program, stats) -> ExecutionOutcome` helper and a fixed
//! per-outcome event dispatch order (`spec.md` §5).

pub mod generative;
pub mod hybrid;
pub mod mutation;
pub mod multi;
pub mod splice_engine;

use std::time::Duration;

use crate::events::{CrashBehavior, CrashReport, Event, EventSink};
use crate::evaluator::Evaluator;
use crate::execution::{ExecutionOutcome, Executor};
use crate::ir::Program;

/// Per-engine running counters (`spec.md` §4.7a), diagnostic only.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    rounds: u64,
    executions: u64,
    interesting: u64,
    crashes: u64,
    timeouts: u64,
}

impl EngineStats {
    pub fn record_round(&mut self) {
        self.rounds += 1;
    }

    #[must_use]
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    #[must_use]
    pub fn executions(&self) -> u64 {
        self.executions
    }

    #[must_use]
    pub fn interesting(&self) -> u64 {
        self.interesting
    }

    #[must_use]
    pub fn crashes(&self) -> u64 {
        self.crashes
    }

    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Folds another engine's counters into this one. Used by `MultiEngine`
    /// to report totals across its sub-engines.
    pub fn merge(&mut self, other: Self) {
        self.rounds += other.rounds;
        self.executions += other.executions;
        self.interesting += other.interesting;
        self.crashes += other.crashes;
        self.timeouts += other.timeouts;
    }
}

/// Caps how long a fuzzing loop may run without threads or signals
/// (`spec.md` §5): a round budget an embedding test can exhaust
/// deterministically instead of wall-clock timing.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBudget {
    max_rounds: u32,
}

impl ExecutionBudget {
    #[must_use]
    pub fn rounds(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    #[must_use]
    pub fn is_exhausted(&self, rounds_so_far: u64) -> bool {
        rounds_so_far >= u64::from(self.max_rounds)
    }
}

/// Executes `program` once, dispatching `PreExecute`/`PostExecute` and then
/// exactly one of `{Valid,Invalid,TimeOut,Crash}Found`, then
/// `InterestingProgramFound` if the evaluator reports new coverage
/// (`spec.md` §5 ordering). On a crash, re-executes with a doubled timeout to
/// distinguish a deterministic crash from a flaky one (`spec.md` §7 kind 5,
/// S6), and reports `ExecutionMismatch` if the two outcomes disagree without
/// a crash (`spec.md` §7 kind 4).
pub fn execute(
    program: &Program,
    executor: &mut dyn Executor,
    evaluator: &mut dyn Evaluator,
    sink: &mut dyn EventSink,
    timeout: Duration,
    stats: &mut EngineStats,
) -> ExecutionOutcome {
    sink.dispatch(&Event::PreExecute { program });
    let execution = executor.execute(program, timeout);
    stats.executions += 1;
    sink.dispatch(&Event::PostExecute { program, execution: &execution });

    match execution.outcome {
        ExecutionOutcome::Succeeded => {
            sink.dispatch(&Event::ValidFound { program });
            if let Some(aspects) = evaluator.evaluate(&execution) {
                stats.interesting += 1;
                sink.dispatch(&Event::InterestingProgramFound { program, aspects: &aspects });
            }
        }
        ExecutionOutcome::Failed(exit_code) => {
            sink.dispatch(&Event::InvalidFound { program, exit_code });
        }
        ExecutionOutcome::TimedOut => {
            stats.timeouts += 1;
            sink.dispatch(&Event::TimeOutFound { program });
        }
        ExecutionOutcome::Crashed(_) => {
            stats.crashes += 1;
            let rerun = executor.execute(program, timeout * 2);
            stats.executions += 1;
            let behavior = if rerun.outcome.is_crashed() { CrashBehavior::Deterministic } else { CrashBehavior::Flaky };
            if behavior == CrashBehavior::Flaky {
                sink.dispatch(&Event::ExecutionMismatch { program, first: execution.outcome, second: rerun.outcome });
            }
            let aspects = evaluator.evaluate_crash(&execution);
            let report = CrashReport { behavior, is_unique: aspects.is_some(), aspects };
            sink.dispatch(&Event::CrashFound { program, report: &report });
        }
    }

    execution.outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEventSink;
    use crate::evaluator::AlwaysNewEvaluator;
    use crate::execution::ScriptedExecutor;

    fn program() -> Program {
        Program::new(uuid::Uuid::new_v4(), vec![], None, None)
    }

    #[test]
    fn merge_sums_every_counter() {
        let mut a = EngineStats { rounds: 1, executions: 2, interesting: 3, crashes: 4, timeouts: 5 };
        let b = EngineStats { rounds: 10, executions: 20, interesting: 30, crashes: 40, timeouts: 50 };
        a.merge(b);
        assert_eq!(a.rounds(), 11);
        assert_eq!(a.executions(), 22);
        assert_eq!(a.interesting(), 33);
        assert_eq!(a.crashes(), 44);
        assert_eq!(a.timeouts(), 55);
    }

    #[test]
    fn crash_that_does_not_reproduce_is_flaky_and_reports_a_mismatch() {
        let program = program();
        let mut executor = ScriptedExecutor::new(vec![ExecutionOutcome::Crashed(11), ExecutionOutcome::Succeeded]);
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = RecordingEventSink::default();
        let mut stats = EngineStats::default();

        let outcome = execute(&program, &mut executor, &mut evaluator, &mut sink, Duration::from_secs(1), &mut stats);

        assert!(outcome.is_crashed());
        assert_eq!(stats.crashes(), 1);
        assert_eq!(stats.executions(), 2, "crash triage re-executes once more at doubled timeout");
        assert!(sink.tags.contains(&"ExecutionMismatch"));
        assert!(sink.tags.contains(&"CrashFound"));
    }

    #[test]
    fn crash_that_reproduces_is_deterministic_with_no_mismatch_event() {
        let program = program();
        let mut executor = ScriptedExecutor::new(vec![ExecutionOutcome::Crashed(11), ExecutionOutcome::Crashed(11)]);
        let mut evaluator = AlwaysNewEvaluator;
        let mut sink = RecordingEventSink::default();
        let mut stats = EngineStats::default();

        execute(&program, &mut executor, &mut evaluator, &mut sink, Duration::from_secs(1), &mut stats);

        assert!(!sink.tags.contains(&"ExecutionMismatch"));
        assert!(sink.tags.contains(&"CrashFound"));
    }
}
