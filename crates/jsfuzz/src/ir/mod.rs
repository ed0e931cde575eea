//! The IR itself: typed operations with scope, block, and context invariants.
//!
//! Vocabulary and structural invariants for generated programs (`spec.md`
//! §3, §4.1). Nothing in this module constructs a `Program` directly outside
//! of `ProgramBuilder` — these types are dumb data, not constructors.

pub mod context;
pub mod instruction;
pub mod op;
pub mod program;
pub mod types;
pub mod variable;

pub use context::{Context, ContextStack};
pub use instruction::Instruction;
pub use op::{BinaryOperator, Comparator, DestructurePattern, FunctionBeginParams, Op, SpreadBitmap, UnaryOperator};
pub use program::{Program, ProgramTypes, TypeQuality};
pub use types::{FunctionSignature, ObjectGroup, ObjectShape, Parameter, Type, TypeFlags};
pub use variable::{Variable, VariableAllocator, MAX_VARIABLES};
