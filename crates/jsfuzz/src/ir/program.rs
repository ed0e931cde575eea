use ahash::AHashMap as HashMap;
use uuid::Uuid;

use crate::ir::instruction::Instruction;
use crate::ir::types::Type;
use crate::ir::variable::Variable;

/// Whether a type entry came from the advisory abstract interpreter or from
/// an actual observed runtime value (e.g. re-imported after execution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TypeQuality {
    Inferred,
    Runtime,
}

/// Per-variable, per-instruction type information.
///
/// Indexed by instruction index; each entry is the set of `(variable, type,
/// quality)` facts known to hold immediately after that instruction. Purely
/// advisory metadata (`spec.md` §3, §9): no component may treat its absence
/// as an error.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProgramTypes {
    per_instruction: Vec<HashMap<Variable, (Type, TypeQuality)>>,
}

impl ProgramTypes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_len(&mut self, len: usize) {
        if self.per_instruction.len() < len {
            self.per_instruction.resize_with(len, HashMap::default);
        }
    }

    pub fn set(&mut self, instruction_index: usize, var: Variable, ty: Type, quality: TypeQuality) {
        self.ensure_len(instruction_index + 1);
        self.per_instruction[instruction_index].insert(var, (ty, quality));
    }

    #[must_use]
    pub fn type_of(&self, instruction_index: usize, var: Variable) -> Option<&Type> {
        self.per_instruction
            .get(instruction_index)
            .and_then(|m| m.get(&var))
            .map(|(t, _)| t)
    }
}

/// An ordered sequence of instructions plus the metadata `spec.md` §3 requires.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Program {
    id: Uuid,
    code: Vec<Instruction>,
    /// Non-owning lineage reference: the parent's id, not the parent itself.
    /// Per design note §9, this must never participate in serialization
    /// cycles and need not keep the parent alive.
    parent: Option<Uuid>,
    types: Option<ProgramTypes>,
    comments: HashMap<u32, String>,
}

impl Program {
    #[must_use]
    pub fn new(id: Uuid, code: Vec<Instruction>, parent: Option<Uuid>, types: Option<ProgramTypes>) -> Self {
        Self { id, code, parent, types, comments: HashMap::default() }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    #[must_use]
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    #[must_use]
    pub fn types(&self) -> Option<&ProgramTypes> {
        self.types.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn set_comment(&mut self, instruction_index: u32, comment: impl Into<String>) {
        self.comments.insert(instruction_index, comment.into());
    }

    #[must_use]
    pub fn comment_at(&self, instruction_index: u32) -> Option<&str> {
        self.comments.get(&instruction_index).map(String::as_str)
    }

    /// Highest variable number referenced anywhere in the program, or `None`
    /// if the program defines no variables.
    #[must_use]
    pub fn variable_count(&self) -> u32 {
        self.code
            .iter()
            .flat_map(Instruction::all_inouts)
            .map(|v| v.number() + 1)
            .max()
            .unwrap_or(0)
    }

    /// An independent structural check, separate from the builder's online
    /// analyzers, used by tests (I1) to verify a finished program.
    ///
    /// Checks: balanced block nesting, every input variable defined and in
    /// scope earlier in the program, contiguous variable numbering, and that
    /// required context is always a subset of what's currently open.
    #[must_use]
    pub fn check_invariants(&self) -> Result<(), String> {
        use crate::ir::context::ContextStack;

        let mut block_stack: Vec<u32> = Vec::new();
        let mut scopes: Vec<std::collections::HashSet<Variable>> = vec![std::collections::HashSet::new()];
        let mut contexts = ContextStack::new();
        let mut seen_numbers: std::collections::HashSet<u32> = std::collections::HashSet::new();

        for instr in &self.code {
            let op = instr.op();

            if !contexts.current().contains(op.required_context()) && !op.required_context().is_empty() {
                return Err(format!(
                    "instruction {} ({}) requires context not available",
                    instr.index(),
                    op.name()
                ));
            }

            for input in instr.inputs() {
                let visible = scopes.iter().any(|s| s.contains(input));
                if !visible {
                    return Err(format!(
                        "instruction {} ({}) references out-of-scope variable {input}",
                        instr.index(),
                        op.name()
                    ));
                }
            }

            for output in instr.outputs() {
                if !seen_numbers.insert(output.number()) {
                    return Err(format!("variable {output} redefined"));
                }
                scopes.last_mut().unwrap().insert(*output);
            }

            if op.is_block_begin() {
                block_stack.push(instr.index());
                scopes.push(std::collections::HashSet::new());
                contexts.push(op.opened_context());
                for inner in instr.inner_outputs() {
                    if !seen_numbers.insert(inner.number()) {
                        return Err(format!("variable {inner} redefined"));
                    }
                    scopes.last_mut().unwrap().insert(*inner);
                }
            } else if op.is_block_end() {
                if block_stack.pop().is_none() {
                    return Err(format!("unmatched block end at instruction {}", instr.index()));
                }
                scopes.pop();
                contexts.pop();
            } else if !instr.inner_outputs().is_empty() {
                return Err(format!("non-block-begin op {} has inner outputs", op.name()));
            }
        }

        if !block_stack.is_empty() {
            return Err(format!("{} unclosed block(s)", block_stack.len()));
        }
        if contexts.depth() != 1 {
            return Err("context stack not balanced".to_owned());
        }

        // Contiguous numbering from zero.
        let max = seen_numbers.iter().copied().max();
        if let Some(max) = max {
            for n in 0..=max {
                if !seen_numbers.contains(&n) {
                    return Err(format!("variable numbering not contiguous: {n} missing"));
                }
            }
        }
        Ok(())
    }
}
