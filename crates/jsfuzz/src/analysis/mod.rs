//! Online, append-only analyzers updated after every instruction the builder emits.

pub mod context_analyzer;
pub mod dataflow;
pub mod scope;

pub use context_analyzer::ContextAnalyzer;
pub use dataflow::DataflowAnalyzer;
pub use scope::ScopeAnalyzer;
