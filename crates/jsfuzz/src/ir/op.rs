use crate::ir::context::Context;
use crate::ir::types::Type;

/// Binary operators available to `Op::Binary` and the operation mutator's swap set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, serde::Serialize, serde::Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    UnsignedRShift,
    LogicalAnd,
    LogicalOr,
    NullishCoalesce,
}

/// Unary operators for `Op::Unary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, serde::Serialize, serde::Deserialize)]
pub enum UnaryOperator {
    Plus,
    Minus,
    LogicalNot,
    BitwiseNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// Comparators for `Op::Compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, serde::Serialize, serde::Deserialize)]
pub enum Comparator {
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Per-argument spread bitmap for plain/method/computed/constructor calls.
pub type SpreadBitmap = smallvec::SmallVec<[bool; 4]>;

/// Function-defining op variants share this payload: everything about the
/// signature that the builder needs to open the right context and allocate
/// the right number of inner outputs (parameters) up front.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionBeginParams {
    pub num_parameters: u32,
    pub has_rest_parameter: bool,
    pub signature: Option<crate::ir::types::FunctionSignature>,
}

/// Which destructuring target slots are present, and whether a given slot
/// also reassigns an existing variable (vs. declaring a fresh one).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DestructurePattern {
    /// `true` per slot that should reassign rather than declare.
    pub reassigns: smallvec::SmallVec<[bool; 4]>,
    pub has_rest_element: bool,
}

/// The closed set of IR operations.
///
/// A tagged-variant (sum-type) encoding by design: every analyzer and the
/// interpreter closes over this enum with a single `match`, rather than
/// dispatching through a trait-object hierarchy (see design note in
/// `spec.md` §9, "Dynamic dispatch on ops"). Op-specific parameters live
/// inside each variant's payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Op {
    // --- Literal loads ---
    LoadUndefined,
    LoadNull,
    LoadInt(i64),
    LoadFloat(f64),
    LoadBigInt(i64),
    LoadString(String),
    LoadBoolean(bool),
    LoadRegExp { pattern: String, flags: String },

    // --- Object/array literals ---
    CreateObject { property_names: Vec<String> },
    CreateArray { num_initial_elements: u32 },
    CreateTemplateString { num_interpolations: u32 },

    // --- Property/element/computed access ---
    LoadProperty { name: String },
    StoreProperty { name: String },
    DeleteProperty { name: String },
    ConfigureProperty { name: String, writable: bool, enumerable: bool, configurable: bool },
    LoadElement,
    StoreElement,
    DeleteElement,
    LoadComputedProperty,
    StoreComputedProperty,
    DeleteComputedProperty,

    // --- Operators ---
    Binary(BinaryOperator),
    Unary(UnaryOperator),
    Compare(Comparator),
    Conditional,
    TypeOf,
    InstanceOf,
    In,

    // --- Functions ---
    BeginPlainFunction(FunctionBeginParams),
    BeginArrowFunction(FunctionBeginParams),
    BeginGeneratorFunction(FunctionBeginParams),
    BeginAsyncFunction(FunctionBeginParams),
    BeginAsyncGeneratorFunction(FunctionBeginParams),
    BeginAsyncArrowFunction(FunctionBeginParams),
    EndFunction,
    Return,
    Yield,
    YieldEach,
    Await,

    // --- Calls ---
    CallFunction { num_arguments: u32, spreads: SpreadBitmap },
    CallMethod { name: String, num_arguments: u32, spreads: SpreadBitmap },
    CallComputedMethod { num_arguments: u32, spreads: SpreadBitmap },
    CallSuperMethod { name: String, num_arguments: u32 },
    Construct { num_arguments: u32, spreads: SpreadBitmap },

    // --- Classes ---
    BeginClassDefinition { has_superclass: bool },
    BeginMethodDefinition { name: String, is_static: bool, num_parameters: u32 },
    EndMethodDefinition,
    EndClassDefinition,

    // --- Scoping / eval ---
    BeginWith,
    EndWith,
    LoadFromScope { name: String },
    StoreToScope { name: String },
    Eval { code: String, num_arguments: u32 },
    BeginCodeString,
    EndCodeString,

    // --- Control flow ---
    BeginIf,
    BeginElse,
    EndIf,
    BeginSwitch,
    BeginSwitchCase { is_default: bool },
    EndSwitchCase,
    EndSwitch,
    SwitchBreak,
    LoopBreak,
    LoopContinue,
    BeginWhileLoop,
    EndWhileLoop,
    BeginDoWhileLoop,
    EndDoWhileLoop,
    BeginForLoop,
    EndForLoop,
    BeginForInLoop { destructure: Option<DestructurePattern> },
    EndForInLoop,
    BeginForOfLoop { destructure: Option<DestructurePattern> },
    EndForOfLoop,
    BeginTry,
    BeginCatch,
    BeginFinally,
    EndTryCatchFinally,
    Throw,

    // --- Destructuring / reassignment / misc ---
    DestructureArray(DestructurePattern),
    DestructureObject { property_names: Vec<String>, pattern: DestructurePattern },
    Reassign,
    ReassignWithBinary(BinaryOperator),
    Dup,
    Nop,
}

impl Op {
    /// Visible outputs/inputs per `spec.md` §3: `numInputs`/`numOutputs` are
    /// visible after the op; `numInnerOutputs` only inside the op's own block.
    #[must_use]
    pub fn num_inputs(&self) -> u32 {
        match self {
            Self::LoadUndefined
            | Self::LoadNull
            | Self::LoadInt(_)
            | Self::LoadFloat(_)
            | Self::LoadBigInt(_)
            | Self::LoadString(_)
            | Self::LoadBoolean(_)
            | Self::LoadRegExp { .. }
            | Self::BeginPlainFunction(_)
            | Self::BeginArrowFunction(_)
            | Self::BeginGeneratorFunction(_)
            | Self::BeginAsyncFunction(_)
            | Self::BeginAsyncGeneratorFunction(_)
            | Self::BeginAsyncArrowFunction(_)
            | Self::EndFunction
            | Self::BeginMethodDefinition { .. }
            | Self::EndMethodDefinition
            | Self::BeginWith
            | Self::LoadFromScope { .. }
            | Self::BeginCodeString
            | Self::EndCodeString
            | Self::BeginSwitch
            | Self::BeginSwitchCase { .. }
            | Self::EndSwitchCase
            | Self::EndSwitch
            | Self::SwitchBreak
            | Self::LoopBreak
            | Self::LoopContinue
            | Self::BeginElse
            | Self::BeginDoWhileLoop
            | Self::BeginForLoop
            | Self::EndForLoop
            | Self::EndForInLoop
            | Self::EndForOfLoop
            | Self::EndWhileLoop
            | Self::EndIf
            | Self::BeginTry
            | Self::BeginCatch
            | Self::BeginFinally
            | Self::EndTryCatchFinally
            | Self::Nop => 0,

            Self::CreateObject { property_names } => property_names.len() as u32,
            Self::CreateArray { num_initial_elements } => *num_initial_elements,
            Self::CreateTemplateString { num_interpolations } => num_interpolations.saturating_add(1),
            Self::LoadProperty { .. }
            | Self::DeleteProperty { .. }
            | Self::ConfigureProperty { .. }
            | Self::TypeOf
            | Self::Return
            | Self::Yield
            | Self::YieldEach
            | Self::Await
            | Self::EndWith
            | Self::StoreToScope { .. }
            | Self::BeginIf
            | Self::BeginWhileLoop
            | Self::EndDoWhileLoop
            | Self::BeginForInLoop { .. }
            | Self::BeginForOfLoop { .. }
            | Self::Throw
            | Self::Dup
            | Self::EndClassDefinition => 1,
            Self::StoreProperty { .. }
            | Self::LoadElement
            | Self::DeleteElement
            | Self::LoadComputedProperty
            | Self::Binary(_)
            | Self::Compare(_)
            | Self::InstanceOf
            | Self::In => 2,
            Self::StoreElement | Self::DeleteComputedProperty | Self::Reassign | Self::ReassignWithBinary(_) => 2,
            Self::StoreComputedProperty => 3,
            Self::Unary(_) => 1,
            Self::Conditional => 3,
            Self::CallFunction { num_arguments, .. } => num_arguments + 1,
            Self::CallMethod { num_arguments, .. } => num_arguments + 1,
            Self::CallComputedMethod { num_arguments, .. } => num_arguments + 2,
            Self::CallSuperMethod { num_arguments, .. } => *num_arguments,
            Self::Construct { num_arguments, .. } => num_arguments + 1,
            Self::BeginClassDefinition { has_superclass } => u32::from(*has_superclass),
            Self::Eval { num_arguments, .. } => *num_arguments,
            Self::DestructureArray(_) | Self::DestructureObject { .. } => 1,
            // Remaining ops not listed above are all zero-input control-flow markers.
            _ => 0,
        }
    }

    #[must_use]
    pub fn num_outputs(&self) -> u32 {
        match self {
            Self::LoadUndefined
            | Self::LoadNull
            | Self::LoadInt(_)
            | Self::LoadFloat(_)
            | Self::LoadBigInt(_)
            | Self::LoadString(_)
            | Self::LoadBoolean(_)
            | Self::LoadRegExp { .. }
            | Self::CreateObject { .. }
            | Self::CreateArray { .. }
            | Self::CreateTemplateString { .. }
            | Self::LoadProperty { .. }
            | Self::LoadElement
            | Self::LoadComputedProperty
            | Self::Binary(_)
            | Self::Unary(_)
            | Self::Compare(_)
            | Self::Conditional
            | Self::TypeOf
            | Self::InstanceOf
            | Self::In
            | Self::BeginPlainFunction(_)
            | Self::BeginArrowFunction(_)
            | Self::BeginGeneratorFunction(_)
            | Self::BeginAsyncFunction(_)
            | Self::BeginAsyncGeneratorFunction(_)
            | Self::BeginAsyncArrowFunction(_)
            | Self::Yield
            | Self::YieldEach
            | Self::Await
            | Self::CallFunction { .. }
            | Self::CallMethod { .. }
            | Self::CallComputedMethod { .. }
            | Self::CallSuperMethod { .. }
            | Self::Construct { .. }
            | Self::BeginClassDefinition { .. }
            | Self::LoadFromScope { .. }
            | Self::Eval { .. }
            | Self::Dup
            | Self::Reassign
            | Self::ReassignWithBinary(_) => 1,

            Self::DestructureArray(pattern) => {
                pattern.reassigns.len() as u32 + u32::from(pattern.has_rest_element)
            }
            Self::DestructureObject { property_names, pattern } => {
                property_names.len() as u32 + u32::from(pattern.has_rest_element)
            }
            _ => 0,
        }
    }

    #[must_use]
    pub fn num_inner_outputs(&self) -> u32 {
        match self {
            Self::BeginPlainFunction(p)
            | Self::BeginArrowFunction(p)
            | Self::BeginGeneratorFunction(p)
            | Self::BeginAsyncFunction(p)
            | Self::BeginAsyncGeneratorFunction(p)
            | Self::BeginAsyncArrowFunction(p) => p.num_parameters,
            Self::BeginMethodDefinition { num_parameters, .. } => *num_parameters,
            Self::BeginForInLoop { destructure } | Self::BeginForOfLoop { destructure } => destructure
                .as_ref()
                .map_or(1, |p| p.reassigns.iter().filter(|r| !**r).count() as u32 + u32::from(p.has_rest_element)),
            Self::BeginCatch => 1,
            _ => 0,
        }
    }

    /// Non-empty iff this op begins a block.
    #[must_use]
    pub fn opened_context(&self) -> Context {
        match self {
            Self::BeginPlainFunction(_) | Self::BeginArrowFunction(_) => Context::SUBROUTINE,
            Self::BeginGeneratorFunction(_) => Context::SUBROUTINE | Context::GENERATOR_FUNCTION,
            Self::BeginAsyncFunction(_) | Self::BeginAsyncArrowFunction(_) => {
                Context::SUBROUTINE | Context::ASYNC_FUNCTION
            }
            Self::BeginAsyncGeneratorFunction(_) => {
                Context::SUBROUTINE | Context::GENERATOR_FUNCTION | Context::ASYNC_FUNCTION
            }
            Self::BeginMethodDefinition { .. } => Context::SUBROUTINE,
            Self::BeginClassDefinition { .. } => Context::CLASS_DEFINITION,
            Self::BeginWith => Context::WITH,
            Self::BeginIf | Self::BeginElse => Context::EMPTY,
            Self::BeginSwitch => Context::SWITCH_BLOCK,
            Self::BeginSwitchCase { .. } => Context::SWITCH_CASE,
            Self::BeginWhileLoop | Self::BeginDoWhileLoop | Self::BeginForLoop => Context::LOOP,
            Self::BeginForInLoop { .. } | Self::BeginForOfLoop { .. } => Context::LOOP,
            Self::BeginTry | Self::BeginCatch | Self::BeginFinally => Context::EMPTY,
            Self::BeginCodeString => Context::EMPTY,
            _ => Context::EMPTY,
        }
    }

    #[must_use]
    pub fn required_context(&self) -> Context {
        match self {
            Self::Return => Context::SCRIPT | Context::SUBROUTINE,
            Self::Yield | Self::YieldEach => Context::SCRIPT | Context::SUBROUTINE | Context::GENERATOR_FUNCTION,
            Self::Await => Context::SCRIPT | Context::ASYNC_FUNCTION,
            Self::LoopBreak | Self::LoopContinue => Context::SCRIPT | Context::LOOP,
            Self::SwitchBreak => Context::SCRIPT | Context::SWITCH_BLOCK,
            Self::BeginElse | Self::EndIf => Context::SCRIPT,
            _ => Context::SCRIPT,
        }
    }

    #[must_use]
    pub fn is_block_begin(&self) -> bool {
        !self.opened_context().is_empty()
            || matches!(
                self,
                Self::BeginIf
                    | Self::BeginElse
                    | Self::BeginSwitch
                    | Self::BeginSwitchCase { .. }
                    | Self::BeginTry
                    | Self::BeginCatch
                    | Self::BeginFinally
                    | Self::BeginCodeString
                    | Self::BeginMethodDefinition { .. }
            )
    }

    #[must_use]
    pub fn is_block_end(&self) -> bool {
        matches!(
            self,
            Self::EndFunction
                | Self::EndClassDefinition
                | Self::EndMethodDefinition
                | Self::EndWith
                | Self::EndIf
                | Self::EndSwitchCase
                | Self::EndSwitch
                | Self::EndWhileLoop
                | Self::EndDoWhileLoop
                | Self::EndForLoop
                | Self::EndForInLoop
                | Self::EndForOfLoop
                | Self::EndTryCatchFinally
                | Self::EndCodeString
        )
    }

    #[must_use]
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Self::Return | Self::LoopBreak | Self::LoopContinue | Self::SwitchBreak | Self::Throw
        )
    }

    /// Pure ops have no side effects visible outside their own outputs —
    /// safe to drop if their outputs are unused, and safe to reorder with
    /// other pure ops. Everything touching the heap, scope, or control flow
    /// is impure.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            Self::LoadUndefined
                | Self::LoadNull
                | Self::LoadInt(_)
                | Self::LoadFloat(_)
                | Self::LoadBigInt(_)
                | Self::LoadString(_)
                | Self::LoadBoolean(_)
                | Self::LoadRegExp { .. }
                | Self::Binary(_)
                | Self::Unary(_)
                | Self::Compare(_)
                | Self::TypeOf
                | Self::Dup
                | Self::Nop
        )
    }

    /// Stable name used by diagnostics, the lifter, and test assertions.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadUndefined => "LoadUndefined",
            Self::LoadNull => "LoadNull",
            Self::LoadInt(_) => "LoadInt",
            Self::LoadFloat(_) => "LoadFloat",
            Self::LoadBigInt(_) => "LoadBigInt",
            Self::LoadString(_) => "LoadString",
            Self::LoadBoolean(_) => "LoadBoolean",
            Self::LoadRegExp { .. } => "LoadRegExp",
            Self::CreateObject { .. } => "CreateObject",
            Self::CreateArray { .. } => "CreateArray",
            Self::CreateTemplateString { .. } => "CreateTemplateString",
            Self::LoadProperty { .. } => "LoadProperty",
            Self::StoreProperty { .. } => "StoreProperty",
            Self::DeleteProperty { .. } => "DeleteProperty",
            Self::ConfigureProperty { .. } => "ConfigureProperty",
            Self::LoadElement => "LoadElement",
            Self::StoreElement => "StoreElement",
            Self::DeleteElement => "DeleteElement",
            Self::LoadComputedProperty => "LoadComputedProperty",
            Self::StoreComputedProperty => "StoreComputedProperty",
            Self::DeleteComputedProperty => "DeleteComputedProperty",
            Self::Binary(_) => "Binary",
            Self::Unary(_) => "Unary",
            Self::Compare(_) => "Compare",
            Self::Conditional => "Conditional",
            Self::TypeOf => "TypeOf",
            Self::InstanceOf => "InstanceOf",
            Self::In => "In",
            Self::BeginPlainFunction(_) => "BeginPlainFunction",
            Self::BeginArrowFunction(_) => "BeginArrowFunction",
            Self::BeginGeneratorFunction(_) => "BeginGeneratorFunction",
            Self::BeginAsyncFunction(_) => "BeginAsyncFunction",
            Self::BeginAsyncGeneratorFunction(_) => "BeginAsyncGeneratorFunction",
            Self::BeginAsyncArrowFunction(_) => "BeginAsyncArrowFunction",
            Self::EndFunction => "EndFunction",
            Self::Return => "Return",
            Self::Yield => "Yield",
            Self::YieldEach => "YieldEach",
            Self::Await => "Await",
            Self::CallFunction { .. } => "CallFunction",
            Self::CallMethod { .. } => "CallMethod",
            Self::CallComputedMethod { .. } => "CallComputedMethod",
            Self::CallSuperMethod { .. } => "CallSuperMethod",
            Self::Construct { .. } => "Construct",
            Self::BeginClassDefinition { .. } => "BeginClassDefinition",
            Self::BeginMethodDefinition { .. } => "BeginMethodDefinition",
            Self::EndMethodDefinition => "EndMethodDefinition",
            Self::EndClassDefinition => "EndClassDefinition",
            Self::BeginWith => "BeginWith",
            Self::EndWith => "EndWith",
            Self::LoadFromScope { .. } => "LoadFromScope",
            Self::StoreToScope { .. } => "StoreToScope",
            Self::Eval { .. } => "Eval",
            Self::BeginCodeString => "BeginCodeString",
            Self::EndCodeString => "EndCodeString",
            Self::BeginIf => "BeginIf",
            Self::BeginElse => "BeginElse",
            Self::EndIf => "EndIf",
            Self::BeginSwitch => "BeginSwitch",
            Self::BeginSwitchCase { .. } => "BeginSwitchCase",
            Self::EndSwitchCase => "EndSwitchCase",
            Self::EndSwitch => "EndSwitch",
            Self::SwitchBreak => "SwitchBreak",
            Self::LoopBreak => "LoopBreak",
            Self::LoopContinue => "LoopContinue",
            Self::BeginWhileLoop => "BeginWhileLoop",
            Self::EndWhileLoop => "EndWhileLoop",
            Self::BeginDoWhileLoop => "BeginDoWhileLoop",
            Self::EndDoWhileLoop => "EndDoWhileLoop",
            Self::BeginForLoop => "BeginForLoop",
            Self::EndForLoop => "EndForLoop",
            Self::BeginForInLoop { .. } => "BeginForInLoop",
            Self::EndForInLoop => "EndForInLoop",
            Self::BeginForOfLoop { .. } => "BeginForOfLoop",
            Self::EndForOfLoop => "EndForOfLoop",
            Self::BeginTry => "BeginTry",
            Self::BeginCatch => "BeginCatch",
            Self::BeginFinally => "BeginFinally",
            Self::EndTryCatchFinally => "EndTryCatchFinally",
            Self::Throw => "Throw",
            Self::DestructureArray(_) => "DestructureArray",
            Self::DestructureObject { .. } => "DestructureObject",
            Self::Reassign => "Reassign",
            Self::ReassignWithBinary(_) => "ReassignWithBinary",
            Self::Dup => "Dup",
            Self::Nop => "Nop",
        }
    }

    /// Hint about the output type(s) this op produces, used by the abstract
    /// interpreter as a starting point before refining with operand types.
    #[must_use]
    pub fn output_type_hint(&self) -> Type {
        match self {
            Self::LoadUndefined | Self::LoadNull => Type::Undefined,
            Self::LoadBoolean(_) => Type::Boolean,
            Self::LoadInt(_) => Type::Integer,
            Self::LoadFloat(_) => Type::Float,
            Self::LoadBigInt(_) => Type::BigInt,
            Self::LoadString(_) => Type::String,
            Self::LoadRegExp { .. } => Type::RegExp,
            Self::CreateObject { property_names } => {
                Type::object_with_properties("Object", property_names.iter().cloned())
            }
            Self::CreateArray { .. } => Type::object("Array"),
            Self::CreateTemplateString { .. } => Type::String,
            Self::Compare(_) | Self::InstanceOf | Self::In => Type::Boolean,
            Self::TypeOf => Type::String,
            Self::BeginPlainFunction(_)
            | Self::BeginArrowFunction(_)
            | Self::BeginGeneratorFunction(_)
            | Self::BeginAsyncFunction(_)
            | Self::BeginAsyncGeneratorFunction(_)
            | Self::BeginAsyncArrowFunction(_) => Type::Function(None),
            _ => Type::Unknown,
        }
    }
}
