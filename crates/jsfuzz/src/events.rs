//! The event bus (`spec.md` §5, §6): named events dispatched synchronously,
//! in a fixed order per outcome, to an injectable `EventSink` rather than a
//! `log`/`tracing` dependency.

use crate::evaluator::ProgramAspects;
use crate::execution::{Execution, ExecutionOutcome};
use crate::ir::Program;

/// Whether a crash reproduced on re-execution (`spec.md` §7 kind 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashBehavior {
    Deterministic,
    Flaky,
}

#[derive(Debug, Clone)]
pub struct CrashReport {
    pub behavior: CrashBehavior,
    pub is_unique: bool,
    pub aspects: Option<ProgramAspects>,
}

/// One fuzzing-round event, in the fixed dispatch order of `spec.md` §5:
/// `PreExecute`, `PostExecute`, then exactly one of
/// `{Valid,Invalid,TimeOut,Crash}Found`, then `InterestingProgramFound` if
/// applicable.
#[derive(Debug, Clone)]
pub enum Event<'a> {
    ProgramGenerated { program: &'a Program },
    PreExecute { program: &'a Program },
    PostExecute { program: &'a Program, execution: &'a Execution },
    ValidFound { program: &'a Program },
    InvalidFound { program: &'a Program, exit_code: i32 },
    TimeOutFound { program: &'a Program },
    CrashFound { program: &'a Program, report: &'a CrashReport },
    InterestingProgramFound { program: &'a Program, aspects: &'a ProgramAspects },
    ExecutionMismatch { program: &'a Program, first: ExecutionOutcome, second: ExecutionOutcome },
}

pub trait EventSink {
    fn dispatch(&mut self, event: &Event<'_>);
}

/// Zero-cost default: discards every event.
#[derive(Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn dispatch(&mut self, _event: &Event<'_>) {}
}

/// Human-readable diagnostics to stderr.
#[derive(Debug, Default)]
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn dispatch(&mut self, event: &Event<'_>) {
        match event {
            Event::ProgramGenerated { .. } => eprintln!("program generated"),
            Event::PreExecute { .. } => eprintln!("pre-execute"),
            Event::PostExecute { execution, .. } => eprintln!("post-execute: {:?}", execution.outcome),
            Event::ValidFound { .. } => eprintln!("valid"),
            Event::InvalidFound { exit_code, .. } => eprintln!("invalid: exit {exit_code}"),
            Event::TimeOutFound { .. } => eprintln!("timed out"),
            Event::CrashFound { report, .. } => eprintln!("crash: {:?} unique={}", report.behavior, report.is_unique),
            Event::InterestingProgramFound { aspects, .. } => eprintln!("interesting: {}", aspects.0),
            Event::ExecutionMismatch { first, second, .. } => {
                eprintln!("execution mismatch: {first:?} vs {second:?}");
            }
        }
    }
}

/// Records a tag per dispatched event, for test assertions.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    pub tags: Vec<&'static str>,
}

impl EventSink for RecordingEventSink {
    fn dispatch(&mut self, event: &Event<'_>) {
        let tag = match event {
            Event::ProgramGenerated { .. } => "ProgramGenerated",
            Event::PreExecute { .. } => "PreExecute",
            Event::PostExecute { .. } => "PostExecute",
            Event::ValidFound { .. } => "ValidFound",
            Event::InvalidFound { .. } => "InvalidFound",
            Event::TimeOutFound { .. } => "TimeOutFound",
            Event::CrashFound { .. } => "CrashFound",
            Event::InterestingProgramFound { .. } => "InterestingProgramFound",
            Event::ExecutionMismatch { .. } => "ExecutionMismatch",
        };
        self.tags.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_tags_in_order() {
        let program = Program::new(uuid::Uuid::new_v4(), vec![], None, None);
        let execution = Execution { outcome: ExecutionOutcome::Succeeded, stdout: String::new(), stderr: String::new(), exec_time_ms: 0 };
        let mut sink = RecordingEventSink::default();
        sink.dispatch(&Event::PreExecute { program: &program });
        sink.dispatch(&Event::PostExecute { program: &program, execution: &execution });
        sink.dispatch(&Event::ValidFound { program: &program });
        assert_eq!(sink.tags, vec!["PreExecute", "PostExecute", "ValidFound"]);
    }
}
