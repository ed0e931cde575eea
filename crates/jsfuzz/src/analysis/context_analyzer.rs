use crate::ir::{Context, ContextStack, Op};

/// Maintains the current `Context` as a stack and asserts that every
/// appended op's `requiredContext` is a subset of what's currently open.
#[derive(Debug, Clone, Default)]
pub struct ContextAnalyzer {
    stack: ContextStack,
}

impl ContextAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self { stack: ContextStack::new() }
    }

    #[must_use]
    pub fn current(&self) -> Context {
        self.stack.current()
    }

    /// # Panics
    /// Panics if `op`'s required context is not a subset of what's open —
    /// a structural (abort) error per `spec.md` §4.2, §7.
    pub fn observe(&mut self, op: &Op) {
        let required = op.required_context();
        assert!(
            self.current().contains(required),
            "context violation: {} requires context not currently open",
            op.name()
        );
        if op.is_block_begin() {
            self.stack.push(op.opened_context());
        } else if op.is_block_end() {
            self.stack.pop();
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::op::FunctionBeginParams;

    #[test]
    fn allows_return_inside_function() {
        let mut ctx = ContextAnalyzer::new();
        ctx.observe(&Op::BeginPlainFunction(FunctionBeginParams {
            num_parameters: 0,
            has_rest_parameter: false,
            signature: None,
        }));
        ctx.observe(&Op::Return);
        ctx.observe(&Op::EndFunction);
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    #[should_panic(expected = "context violation")]
    fn rejects_return_at_top_level() {
        let mut ctx = ContextAnalyzer::new();
        // `Return` requires SUBROUTINE, not present at script scope.
        ctx.observe(&Op::Return);
    }
}
