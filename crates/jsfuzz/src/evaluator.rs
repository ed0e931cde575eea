//! The external evaluator contract (`spec.md` §6): turns an `Execution` into
//! an opaque interestingness signal, or nothing.

use crate::execution::Execution;

/// Opaque descriptor summarizing why an execution was interesting (e.g. a
/// new-coverage-edge set). The core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAspects(pub String);

pub trait Evaluator {
    /// Returns `Some` when `execution` produced new coverage or another
    /// interestingness signal.
    fn evaluate(&mut self, execution: &Execution) -> Option<ProgramAspects>;

    /// Returns `Some` iff the crash is novel (not seen before).
    fn evaluate_crash(&mut self, execution: &Execution) -> Option<ProgramAspects>;
}

/// Treats every successful execution as interesting and every crash as
/// novel. Used to exercise the "interesting" branch of engine triage.
#[derive(Debug, Default)]
pub struct AlwaysNewEvaluator;

impl Evaluator for AlwaysNewEvaluator {
    fn evaluate(&mut self, execution: &Execution) -> Option<ProgramAspects> {
        execution.outcome.is_succeeded().then(|| ProgramAspects("new-coverage".to_owned()))
    }

    fn evaluate_crash(&mut self, _execution: &Execution) -> Option<ProgramAspects> {
        Some(ProgramAspects("novel-crash".to_owned()))
    }
}

/// Never reports anything interesting or novel. Used to exercise the
/// "boring" branch of engine triage.
#[derive(Debug, Default)]
pub struct NeverInterestingEvaluator;

impl Evaluator for NeverInterestingEvaluator {
    fn evaluate(&mut self, _execution: &Execution) -> Option<ProgramAspects> {
        None
    }

    fn evaluate_crash(&mut self, _execution: &Execution) -> Option<ProgramAspects> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionOutcome;

    fn execution(outcome: ExecutionOutcome) -> Execution {
        Execution { outcome, stdout: String::new(), stderr: String::new(), exec_time_ms: 0 }
    }

    #[test]
    fn always_new_reports_success_as_interesting() {
        let mut evaluator = AlwaysNewEvaluator;
        assert!(evaluator.evaluate(&execution(ExecutionOutcome::Succeeded)).is_some());
        assert!(evaluator.evaluate(&execution(ExecutionOutcome::Failed(1))).is_none());
    }

    #[test]
    fn never_interesting_reports_nothing() {
        let mut evaluator = NeverInterestingEvaluator;
        assert!(evaluator.evaluate(&execution(ExecutionOutcome::Succeeded)).is_none());
        assert!(evaluator.evaluate_crash(&execution(ExecutionOutcome::Crashed(11))).is_none());
    }
}
