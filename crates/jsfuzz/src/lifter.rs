//! The external lifter contract (`spec.md` §6): `Program` → source text.
//!
//! No parser or JS compiler is in scope (`spec.md` §1 Non-goals), so the
//! only lifter shipped here is a diagnostic, non-JavaScript-generating
//! stringifier used for logs and test assertions.

use crate::ir::Program;

pub trait Lifter {
    fn lift(&self, program: &Program) -> String;
}

/// Deterministic, best-effort textual rendering of a program: one line per
/// instruction, indented per block depth, showing the op name and its
/// inouts. Not a JavaScript source generator.
#[derive(Debug, Default)]
pub struct DebugLifter;

impl Lifter for DebugLifter {
    fn lift(&self, program: &Program) -> String {
        let mut out = String::new();
        let mut depth: usize = 0;
        for instr in program.code() {
            if instr.op().is_block_end() {
                depth = depth.saturating_sub(1);
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str(instr.op().name());
            out.push_str(" [");
            let inouts: Vec<String> = instr.all_inouts().iter().map(ToString::to_string).collect();
            out.push_str(&inouts.join(", "));
            out.push(']');
            if let Some(comment) = program.comment_at(instr.index()) {
                out.push_str("  // ");
                out.push_str(comment);
            }
            out.push('\n');
            if instr.op().is_block_begin() {
                depth += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Op, Variable};
    use smallvec::smallvec;

    #[test]
    fn renders_one_line_per_instruction() {
        let v0 = Variable::new(0);
        let v1 = Variable::new(1);
        let code =
            vec![Instruction::new(Op::LoadInt(1), smallvec![v0], 0), Instruction::new(Op::LoadInt(2), smallvec![v1], 1)];
        let program = Program::new(uuid::Uuid::new_v4(), code, None, None);
        let rendered = DebugLifter.lift(&program);
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.contains("LoadInt"));
    }

    #[test]
    fn indents_inside_blocks() {
        use crate::ir::FunctionBeginParams;
        let v0 = Variable::new(0);
        let v1 = Variable::new(1);
        let code = vec![
            Instruction::new(
                Op::BeginPlainFunction(FunctionBeginParams { num_parameters: 0, has_rest_parameter: false, signature: None }),
                smallvec![v0],
                0,
            ),
            Instruction::new(Op::LoadInt(1), smallvec![v1], 1),
            Instruction::new(Op::EndFunction, smallvec![], 2),
        ];
        let program = Program::new(uuid::Uuid::new_v4(), code, None, None);
        let rendered = DebugLifter.lift(&program);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[1].starts_with("  "));
        assert!(!lines[2].starts_with(' '));
    }
}
