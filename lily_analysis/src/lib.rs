//! Semantic analysis: from parsed AST to checked declarations.
//!
//! The analyzer runs three passes. Step 0 reserves cross-package import
//! resolution (a stub), step 1 pushes declaration shells into the scope
//! graph, step 2 checks every declaration. All failures are surfaced
//! through the diagnostic [`Handler`](lily_errors::Handler) and analysis
//! continues with placeholders; a caller treats a nonzero error count as a
//! failed build.

pub mod analyzer;
pub mod builtin;
pub mod checked;
pub mod context;
pub mod operator;
pub mod package;
pub mod scope;
pub mod signature;
pub mod sys;
pub mod virtual_scope;

pub use analyzer::{analyze, Analysis, Analyzer};
pub use context::{AnalysisContext, HistoryEntry};
pub use package::PackageContext;
pub use scope::{
    AlreadyDefined, CapturedVariable, GenericEntry, ParamEntry, Scope, ScopeArena, ScopeFlags,
    ScopeTag, SearchResponse, VariableEntry, VariantEntry,
};
pub use signature::{
    add_fun_signature, add_type_signature, serialize_signature_name, FunSignature, TypeSignature,
};
pub use virtual_scope::VirtualScope;
