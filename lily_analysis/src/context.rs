//! Context threaded through every `check_*` call.
//!
//! The original keeps this state in thread-locals (`history`, `in_try`,
//! `alias_decl`); here it is an explicit value so recursion depth is the
//! only global resource in play.

use lily_span::{DeclId, ScopeId};

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub decl: DeclId,
    /// The serialized signature being checked, when re-analyzing against a
    /// monomorphized signature.
    pub signature: Option<String>,
}

#[derive(Debug, Default)]
pub struct AnalysisContext {
    /// Declarations currently being checked; guards re-entry during
    /// resolution of recursive declarations.
    pub history: Vec<HistoryEntry>,
    /// Enclosing `try` scopes, innermost last.
    pub in_try: Vec<ScopeId>,
    /// The alias declaration currently being resolved, if any.
    pub alias_decl: Option<DeclId>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        AnalysisContext::default()
    }

    pub fn in_history(&self, decl: DeclId, signature: Option<&str>) -> bool {
        self.history
            .iter()
            .any(|entry| entry.decl == decl && entry.signature.as_deref() == signature)
    }

    pub fn enter(&mut self, decl: DeclId, signature: Option<String>) {
        self.history.push(HistoryEntry { decl, signature });
    }

    pub fn leave(&mut self, decl: DeclId) {
        let last = self.history.pop();
        debug_assert!(matches!(last, Some(entry) if entry.decl == decl));
    }

    pub fn current_try(&self) -> Option<ScopeId> {
        self.in_try.last().copied()
    }
}
