//! The only legal constructor of IR programs (`spec.md` §4.4).
//!
//! Maintains scope, context, and abstract-interpretation type state online as
//! instructions are appended: an accumulating buffer plus a handful of
//! reuse caches, with a `finalize()`/reset step instead of one-shot
//! construction.

use ahash::AHashMap as HashMap;
use rand::{Rng, RngCore};
use smallvec::{smallvec, SmallVec};
use uuid::Uuid;

use crate::analysis::{ContextAnalyzer, DataflowAnalyzer, ScopeAnalyzer};
use crate::codegen::generators::CodeGenerator;
use crate::environment::Environment;
use crate::interpreter::{AbstractInterpreter, TypeMap};
use crate::ir::{
    Context, FunctionBeginParams, Instruction, Op, Program, ProgramTypes, Type, TypeQuality, Variable,
    VariableAllocator,
};

/// Conservative mode returns nothing on a type-sampling miss; aggressive mode
/// additionally admits `unknown`-typed variables and falls back to any
/// visible variable on a miss. The only place the two modes differ
/// (`spec.md` §4.4 "Variable selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderMode {
    Conservative,
    Aggressive,
}

/// Probability of preferring a variable from the innermost scope during
/// `rand_var`. A tuning parameter, not an invariant (`spec.md` §9).
pub const INNER_SCOPE_BIAS: f64 = 0.75;

/// Probability `generate`/`generate_recursive` stops recursing early. A
/// tuning parameter, not an invariant (`spec.md` §9).
pub const EARLY_RETURN_PROBABILITY: f64 = 0.25;

/// One level of instruction adoption: a stable source-program-variable to
/// host-program-variable mapping, used while copying instructions from
/// another program (splicing, combining, or adopting a corpus sample).
#[derive(Debug, Default)]
struct AdoptionFrame {
    mapping: HashMap<Variable, Variable>,
}

/// The sole constructor of `Program`s.
///
/// Every public "emit" method funnels through `append`, so structural
/// invariants (`spec.md` §4.1) hold by construction: there is no other way
/// to produce a `Program`.
pub struct ProgramBuilder<'e> {
    env: &'e Environment,
    mode: BuilderMode,
    parent: Option<Uuid>,
    allocator: VariableAllocator,
    scope: ScopeAnalyzer,
    context: ContextAnalyzer,
    dataflow: DataflowAnalyzer,
    code: Vec<Instruction>,
    types: ProgramTypes,
    type_map: TypeMap,
    comments: HashMap<u32, String>,
    int_cache: HashMap<i64, Variable>,
    float_cache: HashMap<u64, Variable>,
    builtin_cache: HashMap<String, Variable>,
    adoption_stack: Vec<AdoptionFrame>,
}

impl<'e> ProgramBuilder<'e> {
    #[must_use]
    pub fn new(env: &'e Environment, parent: Option<Uuid>, mode: BuilderMode) -> Self {
        Self {
            env,
            mode,
            parent,
            allocator: VariableAllocator::new(),
            scope: ScopeAnalyzer::new(),
            context: ContextAnalyzer::new(),
            dataflow: DataflowAnalyzer::new(),
            code: Vec::new(),
            types: ProgramTypes::new(),
            type_map: TypeMap::default(),
            comments: HashMap::default(),
            int_cache: HashMap::default(),
            float_cache: HashMap::default(),
            builtin_cache: HashMap::default(),
            adoption_stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> BuilderMode {
        self.mode
    }

    #[must_use]
    pub fn current_context(&self) -> Context {
        self.context.current()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        let index = self.code.len() as u32;
        self.comments.insert(index, comment.into());
    }

    // ------------------------------------------------------------------
    // Appending
    // ------------------------------------------------------------------

    /// Validates arity (via `Instruction::new`), updates the variable
    /// counter, and runs all analyzers plus the abstract interpreter.
    ///
    /// # Panics
    /// Panics on any structural violation: arity mismatch, scope escape, or
    /// context mismatch. These are programmer errors per `spec.md` §7 and
    /// must never arise from data alone, since every constructor funnels
    /// through this method.
    pub fn append(&mut self, op: Op, inputs: &[Variable]) -> SmallVec<[Variable; 2]> {
        let num_outputs = op.num_outputs();
        let num_inner = op.num_inner_outputs();
        for &input in inputs {
            assert!(self.scope.is_visible(input), "{} references out-of-scope variable {input}", op.name());
        }

        let mut inouts: SmallVec<[Variable; 4]> = inputs.iter().copied().collect();
        let mut fresh_outputs: SmallVec<[Variable; 2]> = SmallVec::new();
        for _ in 0..num_outputs {
            let v = self.allocator.next();
            inouts.push(v);
            fresh_outputs.push(v);
        }
        let mut inner_outputs: SmallVec<[Variable; 2]> = SmallVec::new();
        for _ in 0..num_inner {
            let v = self.allocator.next();
            inouts.push(v);
            inner_outputs.push(v);
        }

        self.context.observe(&op);
        let index = self.code.len() as u32;
        let instruction = Instruction::new(op, inouts, index);

        if instruction.op().is_block_begin() {
            for &out in &fresh_outputs {
                self.scope.add_to_current(out);
            }
            self.scope.push_scope();
            for &inner in &inner_outputs {
                self.scope.add_to_current(inner);
            }
        } else {
            if instruction.op().is_block_end() {
                self.scope.pop_scope();
            }
            for &out in &fresh_outputs {
                self.scope.add_to_current(out);
            }
        }

        self.dataflow.observe(&instruction);

        let interp = AbstractInterpreter::new();
        let updates = interp.infer(&instruction, &self.type_map, self.env);
        for update in &updates {
            self.type_map.insert(update.variable, update.ty.clone());
            self.types.set(index as usize, update.variable, update.ty.clone(), TypeQuality::Inferred);
        }

        self.code.push(instruction);
        fresh_outputs
    }

    /// Returns the constructed program and resets internal state for reuse.
    #[must_use]
    pub fn finalize(&mut self) -> Program {
        assert_eq!(self.context.depth(), 1, "finalize called with unclosed blocks");
        let code = std::mem::take(&mut self.code);
        let types = std::mem::take(&mut self.types);
        let program = Program::new(Uuid::new_v4(), code, self.parent, Some(types));
        *self = Self::new(self.env, self.parent, self.mode);
        program
    }

    // ------------------------------------------------------------------
    // Adoption
    // ------------------------------------------------------------------

    pub fn push_adoption_frame(&mut self) {
        self.adoption_stack.push(AdoptionFrame::default());
    }

    pub fn pop_adoption_frame(&mut self) {
        self.adoption_stack.pop();
    }

    /// Establishes (or reuses) a stable source-program-variable to
    /// host-program-variable mapping within the current adoption frame.
    ///
    /// # Panics
    /// Panics if called with no adoption frame open.
    pub fn adopt_var(&mut self, source_var: Variable) -> Variable {
        let frame = self.adoption_stack.last_mut().expect("adopt_var called without an adoption frame");
        if let Some(&host_var) = frame.mapping.get(&source_var) {
            return host_var;
        }
        // Placeholder allocation; callers that need the mapped variable to
        // already be defined in scope must adopt the defining instruction
        // first via `adopt_instruction`, which overwrites this mapping.
        let host_var = self.allocator.next();
        frame.mapping.insert(source_var, host_var);
        host_var
    }

    /// Appends a copy of `instruction` with inouts remapped through the
    /// current adoption frame. If `keep_types` and the source program has
    /// runtime-quality types for the copied variables, those are preserved
    /// with `TypeQuality::Runtime` rather than re-inferred.
    ///
    /// # Panics
    /// Panics if called with no adoption frame open.
    pub fn adopt_instruction(&mut self, instruction: &Instruction, source_types: Option<&ProgramTypes>, keep_types: bool) {
        self.adopt_instruction_with_op(instruction, instruction.op().clone(), source_types, keep_types);
    }

    /// Like `adopt_instruction`, but appends `op` instead of the source
    /// instruction's own op — used by the operation mutator to swap in a
    /// same-arity replacement while still renaming inputs/outputs through
    /// the adoption frame.
    ///
    /// # Panics
    /// Panics if called with no adoption frame open.
    pub fn adopt_instruction_with_op(
        &mut self,
        instruction: &Instruction,
        op: Op,
        source_types: Option<&ProgramTypes>,
        keep_types: bool,
    ) {
        self.adopt_instruction_custom(instruction, op, &[], source_types, keep_types);
    }

    /// The general form: appends `op` with inputs remapped through the
    /// adoption frame, except that `input_overrides` (index into the
    /// source instruction's own input list, replacement *host* variable)
    /// wins over the adopted mapping. Used by the input mutator to swap in
    /// an existing host variable at one position instead of adopting the
    /// source variable.
    ///
    /// # Panics
    /// Panics if called with no adoption frame open.
    pub fn adopt_instruction_custom(
        &mut self,
        instruction: &Instruction,
        op: Op,
        input_overrides: &[(usize, Variable)],
        source_types: Option<&ProgramTypes>,
        keep_types: bool,
    ) {
        assert!(!self.adoption_stack.is_empty(), "adopt_instruction called without an adoption frame");

        let mut remapped_inputs: SmallVec<[Variable; 4]> =
            instruction.inputs().iter().map(|&v| self.adopt_var(v)).collect();
        for &(idx, replacement) in input_overrides {
            remapped_inputs[idx] = replacement;
        }

        let outputs = self.append(op, &remapped_inputs);

        if keep_types {
            if let Some(source_types) = source_types {
                for (source_out, &host_out) in instruction.outputs().iter().zip(outputs.iter()) {
                    if let Some(ty) = source_types.type_of(instruction.index() as usize, *source_out) {
                        self.type_map.insert(host_out, ty.clone());
                        self.types.set(self.code.len() - 1, host_out, ty.clone(), TypeQuality::Runtime);
                    }
                }
            }
        }

        // Remap any remaining inner-outputs/outputs that `append` freshly
        // allocated so future references to the source variable resolve to
        // the correct host variable.
        let frame = self.adoption_stack.last_mut().expect("checked above");
        let host_all: SmallVec<[Variable; 4]> = outputs.iter().copied().collect();
        for (source_out, host_out) in instruction.outputs().iter().zip(host_all.iter()) {
            frame.mapping.insert(*source_out, *host_out);
        }
        // Inner outputs were allocated by `append` but not returned; recover
        // them from the just-pushed instruction.
        if let Some(last) = self.code.last() {
            for (source_inner, host_inner) in instruction.inner_outputs().iter().zip(last.inner_outputs().iter()) {
                frame.mapping.insert(*source_inner, *host_inner);
            }
        }
    }

    // ------------------------------------------------------------------
    // Value reuse
    // ------------------------------------------------------------------

    pub fn reuse_or_load_int(&mut self, value: i64) -> Variable {
        if let Some(&v) = self.int_cache.get(&value) {
            if self.scope.is_visible(v) && !self.dataflow.was_reassigned(v) {
                return v;
            }
        }
        let outputs = self.append(Op::LoadInt(value), &[]);
        let v = outputs[0];
        self.int_cache.insert(value, v);
        v
    }

    pub fn reuse_or_load_float(&mut self, value: f64) -> Variable {
        let key = value.to_bits();
        if let Some(&v) = self.float_cache.get(&key) {
            if self.scope.is_visible(v) && !self.dataflow.was_reassigned(v) {
                return v;
            }
        }
        let outputs = self.append(Op::LoadFloat(value), &[]);
        let v = outputs[0];
        self.float_cache.insert(key, v);
        v
    }

    pub fn reuse_or_load_builtin(&mut self, name: &str) -> Variable {
        if let Some(&v) = self.builtin_cache.get(name) {
            if self.scope.is_visible(v) && !self.dataflow.was_reassigned(v) {
                return v;
            }
        }
        let outputs = self.append(Op::LoadFromScope { name: name.to_owned() }, &[]);
        let v = outputs[0];
        self.builtin_cache.insert(name.to_owned(), v);
        v
    }

    // ------------------------------------------------------------------
    // Variable selection
    // ------------------------------------------------------------------

    /// Returns any visible variable, biased ~`INNER_SCOPE_BIAS` toward the
    /// innermost scope.
    #[must_use]
    pub fn rand_var(&self, rng: &mut dyn RngCore) -> Option<Variable> {
        let scopes = self.scope.visible_by_scope();
        self.rand_var_from_scopes(scopes, rng)
    }

    fn rand_var_from_scopes(&self, scopes: &[Vec<Variable>], rng: &mut dyn RngCore) -> Option<Variable> {
        if scopes.iter().all(Vec::is_empty) {
            return None;
        }
        if scopes.len() > 1 && rng.gen_bool(INNER_SCOPE_BIAS) {
            for scope in scopes.iter().rev() {
                if !scope.is_empty() {
                    let idx = rng.gen_range(0..scope.len());
                    return Some(scope[idx]);
                }
            }
        }
        let all: Vec<Variable> = scopes.iter().flatten().copied().collect();
        if all.is_empty() {
            None
        } else {
            Some(all[rng.gen_range(0..all.len())])
        }
    }

    /// Returns a visible variable whose inferred type satisfies `required`.
    ///
    /// Conservative mode: strict filter, `None` on miss. Aggressive mode:
    /// `unknown`-typed variables are also admitted, and on miss any visible
    /// variable is returned instead of `None`.
    #[must_use]
    pub fn rand_var_of_type(&self, required: &Type, rng: &mut dyn RngCore) -> Option<Variable> {
        let candidates: Vec<Variable> = self
            .scope
            .visible()
            .into_iter()
            .filter(|v| {
                let ty = self.type_map.get(v).cloned().unwrap_or(Type::Unknown);
                if ty.is(required) {
                    return true;
                }
                self.mode == BuilderMode::Aggressive && ty.is_unknown()
            })
            .collect();
        if !candidates.is_empty() {
            return Some(candidates[rng.gen_range(0..candidates.len())]);
        }
        if self.mode == BuilderMode::Aggressive {
            return self.rand_var(rng);
        }
        None
    }

    #[must_use]
    pub fn type_of(&self, var: Variable) -> Type {
        self.type_map.get(&var).cloned().unwrap_or(Type::Unknown)
    }

    #[must_use]
    pub fn visible_variables(&self) -> Vec<Variable> {
        self.scope.visible()
    }

    #[must_use]
    pub fn env(&self) -> &'e Environment {
        self.env
    }

    // ------------------------------------------------------------------
    // Typed code emission — leaves
    // ------------------------------------------------------------------

    pub fn load_int(&mut self, value: i64) -> Variable {
        self.append(Op::LoadInt(value), &[])[0]
    }

    pub fn load_float(&mut self, value: f64) -> Variable {
        self.append(Op::LoadFloat(value), &[])[0]
    }

    pub fn load_string(&mut self, value: impl Into<String>) -> Variable {
        self.append(Op::LoadString(value.into()), &[])[0]
    }

    pub fn load_boolean(&mut self, value: bool) -> Variable {
        self.append(Op::LoadBoolean(value), &[])[0]
    }

    pub fn load_undefined(&mut self) -> Variable {
        self.append(Op::LoadUndefined, &[])[0]
    }

    pub fn load_null(&mut self) -> Variable {
        self.append(Op::LoadNull, &[])[0]
    }

    pub fn create_array(&mut self, elements: &[Variable]) -> Variable {
        self.append(Op::CreateArray { num_initial_elements: elements.len() as u32 }, elements)[0]
    }

    pub fn binary(&mut self, operator: crate::ir::BinaryOperator, lhs: Variable, rhs: Variable) -> Variable {
        self.append(Op::Binary(operator), &[lhs, rhs])[0]
    }

    pub fn unary(&mut self, operator: crate::ir::UnaryOperator, operand: Variable) -> Variable {
        self.append(Op::Unary(operator), &[operand])[0]
    }

    pub fn compare(&mut self, comparator: crate::ir::Comparator, lhs: Variable, rhs: Variable) -> Variable {
        self.append(Op::Compare(comparator), &[lhs, rhs])[0]
    }

    pub fn load_property(&mut self, base: Variable, name: impl Into<String>) -> Variable {
        self.append(Op::LoadProperty { name: name.into() }, &[base])[0]
    }

    pub fn store_property(&mut self, base: Variable, name: impl Into<String>, value: Variable) {
        self.append(Op::StoreProperty { name: name.into() }, &[base, value]);
    }

    pub fn call_function(&mut self, callee: Variable, arguments: &[Variable]) -> Variable {
        let mut inputs: SmallVec<[Variable; 4]> = smallvec![callee];
        inputs.extend(arguments.iter().copied());
        let spreads: crate::ir::SpreadBitmap = arguments.iter().map(|_| false).collect();
        self.append(Op::CallFunction { num_arguments: arguments.len() as u32, spreads }, &inputs)[0]
    }

    pub fn construct(&mut self, callee: Variable, arguments: &[Variable]) -> Variable {
        let mut inputs: SmallVec<[Variable; 4]> = smallvec![callee];
        inputs.extend(arguments.iter().copied());
        let spreads: crate::ir::SpreadBitmap = arguments.iter().map(|_| false).collect();
        self.append(Op::Construct { num_arguments: arguments.len() as u32, spreads }, &inputs)[0]
    }

    // ------------------------------------------------------------------
    // Typed code emission — block scaffolds
    // ------------------------------------------------------------------

    /// Opens a plain function, runs `body` with the fresh parameter
    /// variables in scope, and closes it with `EndFunction`.
    pub fn build_plain_function(&mut self, num_parameters: u32, body: impl FnOnce(&mut Self, &[Variable])) -> Variable {
        let func_var = self.append(
            Op::BeginPlainFunction(FunctionBeginParams { num_parameters, has_rest_parameter: false, signature: None }),
            &[],
        )[0];
        let params: Vec<Variable> = self.code.last().expect("just appended").inner_outputs().to_vec();
        body(self, &params);
        self.append(Op::EndFunction, &[]);
        func_var
    }

    /// Opens an if/else. `else_body` is `None` for a bodyless else branch.
    pub fn build_if_else(
        &mut self,
        condition: Variable,
        then_body: impl FnOnce(&mut Self),
        else_body: Option<impl FnOnce(&mut Self)>,
    ) {
        self.append(Op::BeginIf, &[condition]);
        then_body(self);
        if let Some(else_body) = else_body {
            self.append(Op::BeginElse, &[]);
            else_body(self);
        }
        self.append(Op::EndIf, &[]);
    }

    /// Opens a while loop, consuming `condition` as `BeginWhileLoop`'s sole
    /// input. Re-checking the condition each iteration is the fuzzed
    /// program's own job (via instructions inside `body`, using
    /// `LoopContinue`/`LoopBreak`), not something this IR threads through
    /// the op itself.
    pub fn build_while_loop(&mut self, condition: Variable, body: impl FnOnce(&mut Self)) {
        self.append(Op::BeginWhileLoop, &[condition]);
        body(self);
        self.append(Op::EndWhileLoop, &[]);
    }

    pub fn build_try_catch(&mut self, try_body: impl FnOnce(&mut Self), catch_body: impl FnOnce(&mut Self, Variable)) {
        self.append(Op::BeginTry, &[]);
        try_body(self);
        let exception = self.append(Op::BeginCatch, &[])[0];
        catch_body(self, exception);
        self.append(Op::EndTryCatchFinally, &[]);
    }

    /// Opens a generator function, runs `body` with the fresh parameter
    /// variables in scope, and closes it with `EndFunction`. `body` calls
    /// `yield_value`/`yield_each` to produce values from within.
    pub fn build_generator_function(&mut self, num_parameters: u32, body: impl FnOnce(&mut Self, &[Variable])) -> Variable {
        let func_var = self.append(
            Op::BeginGeneratorFunction(FunctionBeginParams { num_parameters, has_rest_parameter: false, signature: None }),
            &[],
        )[0];
        let params: Vec<Variable> = self.code.last().expect("just appended").inner_outputs().to_vec();
        body(self, &params);
        self.append(Op::EndFunction, &[]);
        func_var
    }

    /// Suspends the enclosing generator, yielding `value`; returns the value
    /// passed back into the generator on resumption.
    pub fn yield_value(&mut self, value: Variable) -> Variable {
        self.append(Op::Yield, &[value])[0]
    }

    /// Delegates iteration to `iterable`, yielding each of its values in turn.
    pub fn yield_each(&mut self, iterable: Variable) -> Variable {
        self.append(Op::YieldEach, &[iterable])[0]
    }

    /// Opens a class definition, optionally with `superclass` as its extends
    /// clause, runs `body` (expected to call `build_method_definition` one or
    /// more times), and closes it with `EndClassDefinition`.
    pub fn build_class_definition(&mut self, superclass: Option<Variable>, body: impl FnOnce(&mut Self)) -> Variable {
        let inputs: SmallVec<[Variable; 1]> = superclass.into_iter().collect();
        let class_var = self.append(Op::BeginClassDefinition { has_superclass: superclass.is_some() }, &inputs)[0];
        body(self);
        self.append(Op::EndClassDefinition, &[class_var]);
        class_var
    }

    /// Opens one method inside an enclosing `build_class_definition` body,
    /// runs `body` with the fresh parameter variables in scope, and closes it
    /// with `EndMethodDefinition`.
    pub fn build_method_definition(
        &mut self,
        name: impl Into<String>,
        is_static: bool,
        num_parameters: u32,
        body: impl FnOnce(&mut Self, &[Variable]),
    ) {
        self.append(Op::BeginMethodDefinition { name: name.into(), is_static, num_parameters }, &[]);
        let params: Vec<Variable> = self.code.last().expect("just appended").inner_outputs().to_vec();
        body(self, &params);
        self.append(Op::EndMethodDefinition, &[]);
    }

    /// Opens a switch, runs `cases` with `discriminant` in scope (expected to
    /// call `build_switch_case` one or more times, comparing against
    /// `discriminant` itself where a case needs to), and closes it with
    /// `EndSwitch`. `BeginSwitch` takes no inputs of its own — the
    /// discriminant is only ever a value already visible to the case bodies.
    pub fn build_switch(&mut self, discriminant: Variable, cases: impl FnOnce(&mut Self, Variable)) {
        self.append(Op::BeginSwitch, &[]);
        cases(self, discriminant);
        self.append(Op::EndSwitch, &[]);
    }

    /// Opens one case inside an enclosing `build_switch` body and closes it
    /// with `EndSwitchCase`.
    pub fn build_switch_case(&mut self, is_default: bool, body: impl FnOnce(&mut Self)) {
        self.append(Op::BeginSwitchCase { is_default }, &[]);
        body(self);
        self.append(Op::EndSwitchCase, &[]);
    }

    /// Opens a `for...of` loop over `iterable`, runs `body` with the fresh
    /// per-iteration binding in scope, and closes it with `EndForOfLoop`.
    pub fn build_for_of_loop(&mut self, iterable: Variable, body: impl FnOnce(&mut Self, Variable)) {
        self.append(Op::BeginForOfLoop { destructure: None }, &[iterable]);
        let loop_var = self.code.last().expect("just appended").inner_outputs()[0];
        body(self, loop_var);
        self.append(Op::EndForOfLoop, &[]);
    }

    /// Opens a `for...in` loop over `target`, runs `body` with the fresh
    /// per-iteration key binding in scope, and closes it with `EndForInLoop`.
    pub fn build_for_in_loop(&mut self, target: Variable, body: impl FnOnce(&mut Self, Variable)) {
        self.append(Op::BeginForInLoop { destructure: None }, &[target]);
        let loop_var = self.code.last().expect("just appended").inner_outputs()[0];
        body(self, loop_var);
        self.append(Op::EndForInLoop, &[]);
    }

    // ------------------------------------------------------------------
    // Variable materialization
    // ------------------------------------------------------------------

    /// Returns a visible variable of the required type if one exists, else
    /// materializes a fresh literal or object matching it. Falls back to
    /// `undefined` for types with no direct literal encoding (e.g. a bare
    /// `Function` type with no signature to call and shape).
    pub fn generate_variable(&mut self, required: &Type, rng: &mut dyn RngCore) -> Variable {
        if let Some(existing) = self.rand_var_of_type(required, rng) {
            return existing;
        }
        match required {
            Type::Integer => self.load_int(rng.gen_range(-100..=100)),
            Type::Float => self.load_float(rng.gen_range(-100.0..=100.0)),
            Type::Boolean => self.load_boolean(rng.gen_bool(0.5)),
            Type::String => self.load_string("s"),
            Type::Undefined => self.load_undefined(),
            Type::Object(shape) => {
                if shape.group.as_deref() == Some("Array") {
                    self.create_array(&[])
                } else {
                    self.append(Op::CreateObject { property_names: Vec::new() }, &[])[0]
                }
            }
            _ => self.load_undefined(),
        }
    }

    // ------------------------------------------------------------------
    // Splicing
    // ------------------------------------------------------------------

    /// Copies a dataflow-closed slice of `source` ending at (and including)
    /// `end_index` into this program, expanding to whole enclosing blocks
    /// whenever the slice would otherwise cross a block boundary. Returns
    /// `false` without modifying `self` if the slice's required context
    /// isn't a subset of the context currently open here (`spec.md` §4.4
    /// "Splicing").
    pub fn splice(&mut self, source: &Program, end_index: usize) -> bool {
        let Some(span) = closed_slice_span(source, end_index) else {
            return false;
        };
        let required = required_context_deficit(source, &span);
        if !self.current_context().contains(required) {
            return false;
        }

        self.push_adoption_frame();
        for &i in &span {
            self.adopt_instruction(&source.code()[i], source.types(), true);
        }
        self.pop_adoption_frame();
        true
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Appends up to `budget` pieces of code. At each step, with equal
    /// probability either splices a random slice of `corpus_sample` or picks
    /// a weighted random `CodeGenerator` whose `required_context` is
    /// satisfied by the context currently open here and runs it; a step that
    /// can do neither (no corpus sample to splice from, or no
    /// context-eligible generator) is simply skipped. Stops early with
    /// probability `EARLY_RETURN_PROBABILITY` after each step (`spec.md`
    /// §4.4 "Recursive generation").
    pub fn generate(&mut self, budget: u32, generators: &[CodeGenerator], corpus_sample: Option<&Program>, rng: &mut dyn RngCore) {
        for _ in 0..budget {
            if rng.gen_bool(0.5) {
                if let Some(source) = corpus_sample.filter(|s| !s.is_empty()) {
                    self.splice(source, rng.gen_range(0..source.len()));
                }
            } else {
                self.run_weighted_generator(generators, rng);
            }

            if rng.gen_bool(EARLY_RETURN_PROBABILITY) {
                break;
            }
        }
    }

    /// Picks a weighted random generator among those whose `required_context`
    /// is a subset of `self.current_context()` and runs it. A no-op if none
    /// qualify.
    fn run_weighted_generator(&mut self, generators: &[CodeGenerator], rng: &mut dyn RngCore) {
        let available = self.current_context();
        let eligible: Vec<&CodeGenerator> = generators.iter().filter(|g| available.contains(g.required_context)).collect();
        let total_weight: u32 = eligible.iter().map(|g| g.weight).sum();
        if total_weight == 0 {
            return;
        }
        let mut pick = rng.gen_range(0..total_weight);
        for generator in eligible {
            if pick < generator.weight {
                (generator.run)(self, rng);
                return;
            }
            pick -= generator.weight;
        }
    }

    /// Like `generate`, but recurses into nested scopes by re-invoking
    /// itself with a shrinking budget — callers pass generators that may
    /// themselves open blocks and call back into `generate_recursive`.
    pub fn generate_recursive(
        &mut self,
        budget: u32,
        depth_remaining: u32,
        generators: &[CodeGenerator],
        corpus_sample: Option<&Program>,
        rng: &mut dyn RngCore,
    ) {
        if depth_remaining == 0 {
            return;
        }
        self.generate(budget, generators, corpus_sample, rng);
    }
}

/// The context `self` must already have open for `span` to be spliceable.
///
/// A block-begin inside the span supplies its `opened_context` to everything
/// nested under it, so only the context a span instruction needs *and* no
/// enclosing in-span block already opens has to come from the splice site
/// itself — e.g. splicing a whole generator function's `Yield` along with
/// its own `BeginGeneratorFunction` requires nothing extra of the host.
fn required_context_deficit(source: &Program, span: &[usize]) -> Context {
    let code = source.code();
    let mut open_stack: Vec<Context> = Vec::new();
    let mut deficit = Context::EMPTY;
    for &i in span {
        let op = code[i].op();
        let available = open_stack.iter().fold(Context::EMPTY, |acc, &c| acc.union(c));
        deficit = deficit.union(op.required_context().remove(available));
        if op.is_block_begin() {
            open_stack.push(op.opened_context());
        } else if op.is_block_end() {
            open_stack.pop();
        }
    }
    deficit
}

/// Computes the minimal index span `[start, end_index]` in `source` that is
/// dataflow-closed for `end_index`: every variable read anywhere in the span
/// is either a block-local fresh output also in the span, or is expanded
/// backward until it is. Any instruction whose block-begin or block-end
/// falls inside the span pulls in the whole enclosing block, so the result
/// never crosses a partial block boundary.
fn closed_slice_span(source: &Program, end_index: usize) -> Option<Vec<usize>> {
    let code = source.code();
    if end_index >= code.len() {
        return None;
    }
    let mut included: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
    let mut pending = vec![end_index];
    let mut defined: HashMap<Variable, usize> = HashMap::default();
    for (idx, instr) in code.iter().enumerate() {
        for &out in instr.all_outputs() {
            defined.entry(out).or_insert(idx);
        }
    }

    while let Some(idx) = pending.pop() {
        if included.contains(&idx) {
            continue;
        }
        included.insert(idx);
        for &input in code[idx].inputs() {
            if let Some(&def_idx) = defined.get(&input) {
                pending.push(def_idx);
            }
        }
    }

    // Expand to whole blocks: if any included instruction's block-begin or
    // block-end partner isn't included, pull in the entire block (begin,
    // end, and everything between) rather than just the boundary pair, so
    // the result never contains a dangling half-open block.
    let mut changed = true;
    while changed {
        changed = false;
        let mut block_stack: Vec<usize> = Vec::new();
        for (idx, instr) in code.iter().enumerate().take(end_index + 1) {
            if instr.op().is_block_begin() {
                block_stack.push(idx);
            } else if instr.op().is_block_end() {
                if let Some(begin_idx) = block_stack.pop() {
                    let begin_included = included.contains(&begin_idx);
                    let end_included = included.contains(&idx);
                    if begin_included != end_included {
                        for i in begin_idx..=idx {
                            included.insert(i);
                        }
                        changed = true;
                    }
                }
            }
        }
    }

    let mut span: Vec<usize> = included.into_iter().collect();
    span.sort_unstable();
    Some(span)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::ir::BinaryOperator;

    fn env() -> Environment {
        Environment::minimal()
    }

    #[test]
    fn append_and_finalize_round_trip() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let v0 = b.load_int(42);
        let v1 = b.load_int(1);
        let v2 = b.binary(BinaryOperator::Add, v0, v1);
        assert_eq!(v2.number(), 2);
        let program = b.finalize();
        assert_eq!(program.len(), 3);
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn finalize_resets_internal_state_for_reuse() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        b.load_int(1);
        let first = b.finalize();
        assert_eq!(first.len(), 1);
        // The allocator, caches and analyzers must all have been reset: a
        // second program built from the same builder starts at v0 again.
        let v0 = b.load_int(2);
        assert_eq!(v0.number(), 0);
        let second = b.finalize();
        assert_eq!(second.len(), 1);
    }

    #[test]
    #[should_panic(expected = "unclosed blocks")]
    fn finalize_panics_on_unclosed_block() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        b.append(Op::BeginIf, &[]);
        b.finalize();
    }

    #[test]
    #[should_panic(expected = "out-of-scope variable")]
    fn append_panics_on_out_of_scope_variable() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let ghost = Variable::new(7);
        b.append(Op::Unary(crate::ir::UnaryOperator::Plus), &[ghost]);
    }

    #[test]
    fn reuse_or_load_int_reuses_while_visible() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let a = b.reuse_or_load_int(42);
        let b2 = b.reuse_or_load_int(42);
        assert_eq!(a, b2);
        let program = b.finalize();
        assert_eq!(program.len(), 1, "second request must not append a new LoadInt");
    }

    #[test]
    fn reuse_or_load_int_is_invalidated_by_reassignment() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let a = b.reuse_or_load_int(42);
        b.append(Op::Reassign, &[a, a]);
        let fresh = b.reuse_or_load_int(42);
        assert_ne!(a, fresh, "cache entry must not survive a reassignment of its variable");
    }

    #[test]
    fn reuse_or_load_int_is_invalidated_once_out_of_scope() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let cond = b.load_boolean(true);
        let mut inner_var = None;
        b.build_if_else(
            cond,
            |inner| {
                inner_var = Some(inner.reuse_or_load_int(9));
            },
            None::<fn(&mut ProgramBuilder<'_>)>,
        );
        // The cached variable from inside the `if` block is out of scope now.
        let outside = b.reuse_or_load_int(9);
        assert_ne!(Some(outside), inner_var);
        let program = b.finalize();
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn build_if_else_produces_balanced_blocks() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let cond = b.load_boolean(true);
        b.build_if_else(
            cond,
            |inner| {
                inner.load_int(1);
            },
            Some(|inner: &mut ProgramBuilder<'_>| {
                inner.load_int(2);
            }),
        );
        let program = b.finalize();
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn build_while_loop_produces_balanced_blocks() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let cond = b.load_boolean(true);
        b.build_while_loop(cond, |inner| {
            inner.load_int(1);
        });
        let program = b.finalize();
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn build_try_catch_produces_balanced_blocks() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        b.build_try_catch(
            |inner| {
                inner.load_int(1);
            },
            |inner, exception| {
                inner.load_property(exception, "message");
            },
        );
        let program = b.finalize();
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn build_plain_function_opens_subroutine_context() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        b.build_plain_function(2, |inner, params| {
            assert_eq!(params.len(), 2);
            assert!(inner.current_context().contains(Context::SUBROUTINE));
            inner.append(Op::Return, &[params[0]]);
        });
        let program = b.finalize();
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn generate_variable_materializes_a_fresh_literal_on_miss() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let v = b.generate_variable(&Type::Integer, &mut rng);
        assert_eq!(b.type_of(v), Type::Integer);
    }

    #[test]
    fn generate_stops_within_budget() {
        let e = env();
        let mut b = ProgramBuilder::new(&e, None, BuilderMode::Conservative);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        fn gen_int(b: &mut ProgramBuilder<'_>, _rng: &mut dyn rand::RngCore) {
            b.load_int(1);
        }
        let generators =
            vec![crate::codegen::generators::CodeGenerator { name: "Int", required_context: Context::SCRIPT, input_types: vec![], weight: 1, run: gen_int }];
        b.generate(10, &generators, None, &mut rng);
        let program = b.finalize();
        assert!(program.len() <= 10);
        assert!(program.check_invariants().is_ok());
    }

    #[test]
    fn splice_of_a_lone_yield_is_rejected_outside_a_generator() {
        // Donor: a generator function `function* g() { for (const x of a) { yield x; } }`.
        let donor_env = env();
        let mut donor_builder = ProgramBuilder::new(&donor_env, None, BuilderMode::Conservative);
        donor_builder.build_generator_function(0, |inner, _params| {
            let iterable = inner.create_array(&[]);
            inner.build_for_of_loop(iterable, |inner, loop_var| {
                inner.yield_value(loop_var);
            });
        });
        let donor = donor_builder.finalize();

        let yield_instr_index = donor
            .code()
            .iter()
            .position(|i| matches!(i.op(), Op::Yield))
            .expect("donor contains a Yield instruction");

        // Splicing just the `Yield` into a plain (non-generator) function must
        // fail: its required context includes GENERATOR_FUNCTION, which a
        // plain function never opens.
        let host_env = env();
        let mut host = ProgramBuilder::new(&host_env, None, BuilderMode::Conservative);
        let mut rejected = false;
        host.build_plain_function(0, |inner, _params| {
            if !inner.splice(&donor, yield_instr_index) {
                rejected = true;
            }
        });
        assert!(rejected, "splicing a bare Yield into a plain function must be rejected");
    }

    #[test]
    fn splice_pulls_in_the_whole_enclosing_generator_and_loop() {
        let donor_env = env();
        let mut donor_builder = ProgramBuilder::new(&donor_env, None, BuilderMode::Conservative);
        donor_builder.build_generator_function(0, |inner, _params| {
            let iterable = inner.create_array(&[]);
            inner.build_for_of_loop(iterable, |inner, loop_var| {
                inner.yield_value(loop_var);
            });
        });
        let donor = donor_builder.finalize();

        let end_index = donor
            .code()
            .iter()
            .position(|i| matches!(i.op(), Op::EndFunction))
            .expect("donor ends with EndFunction");

        // Splicing up through the closing `EndFunction` must pull in the
        // whole generator body (including the for-of loop), and since the
        // host program is a script at the top level (which already provides
        // SCRIPT), a fresh top-level builder can take on the rest.
        let host_env = env();
        let mut host = ProgramBuilder::new(&host_env, None, BuilderMode::Conservative);
        assert!(host.splice(&donor, end_index), "splicing the full generator function must succeed at the script level");
        let program = host.finalize();
        assert!(program.check_invariants().is_ok());
        assert!(program.code().iter().any(|i| matches!(i.op(), Op::Yield)));
        assert!(program.code().iter().any(|i| matches!(i.op(), Op::BeginForOfLoop { .. })));
    }
}
