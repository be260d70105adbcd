//! Diagnostics for semantic analysis.
//!
//! Analyzer errors are surfaced, never thrown: every failing check emits a
//! [`Diagnostic`] through the [`Handler`] and continues with placeholder
//! data so one failure does not hide the rest. The handler owns the
//! per-package error and warning counters; emission order is AST traversal
//! order.

use std::cell::RefCell;
use std::fmt;

use lily_span::{FileId, Location};

mod kind;
mod render;

pub use kind::{DiagnosticKind, WarningKind};
pub use render::{exit_code, render, FileNames};

/// A single rendered-to-be diagnostic. Formatting is the sink consumer's
/// business; the analyzer only fills in the structured parts.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub file: FileId,
    pub location: Location,
    pub level: Level,
    pub kind: DiagnosticLevelKind,
    /// Free-form follow-up lines ("`help:`"-style).
    pub notes: Vec<String>,
    /// Kind-specific detail, e.g. the exact type names of a mismatch.
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticLevelKind {
    Error(DiagnosticKind),
    Warning(WarningKind),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
        };
        match &self.kind {
            DiagnosticLevelKind::Error(kind) => {
                write!(f, "{}[{}]: {}", prefix, self.location, kind)?;
            }
            DiagnosticLevelKind::Warning(kind) => {
                write!(f, "{}[{}]: {}", prefix, self.location, kind)?;
            }
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

/// The diagnostic sink.
///
/// Interior mutability keeps emission available from `&self` contexts deep
/// inside recursive checks. Single-threaded by design.
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    error_count: RefCell<usize>,
    warning_count: RefCell<usize>,
}

impl Handler {
    pub fn new() -> Self {
        Handler::default()
    }

    pub fn emit_error(&self, file: FileId, location: Location, kind: DiagnosticKind) {
        self.emit(Diagnostic {
            file,
            location,
            level: Level::Error,
            kind: DiagnosticLevelKind::Error(kind),
            notes: Vec::new(),
            detail: None,
        });
    }

    pub fn emit_error_with_detail(
        &self,
        file: FileId,
        location: Location,
        kind: DiagnosticKind,
        detail: impl Into<String>,
    ) {
        self.emit(Diagnostic {
            file,
            location,
            level: Level::Error,
            kind: DiagnosticLevelKind::Error(kind),
            notes: Vec::new(),
            detail: Some(detail.into()),
        });
    }

    pub fn emit_error_with_notes(
        &self,
        file: FileId,
        location: Location,
        kind: DiagnosticKind,
        notes: Vec<String>,
    ) {
        self.emit(Diagnostic {
            file,
            location,
            level: Level::Error,
            kind: DiagnosticLevelKind::Error(kind),
            notes,
            detail: None,
        });
    }

    pub fn emit_warning(&self, file: FileId, location: Location, kind: WarningKind) {
        self.emit(Diagnostic {
            file,
            location,
            level: Level::Warning,
            kind: DiagnosticLevelKind::Warning(kind),
            notes: Vec::new(),
            detail: None,
        });
    }

    fn emit(&self, diagnostic: Diagnostic) {
        log::debug!("emit {diagnostic}");
        match diagnostic.level {
            Level::Error => *self.error_count.borrow_mut() += 1,
            Level::Warning => *self.warning_count.borrow_mut() += 1,
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        *self.error_count.borrow()
    }

    pub fn warning_count(&self) -> usize {
        *self.warning_count.borrow()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// The emitted error kinds, in emission order. Test helper.
    pub fn error_kinds(&self) -> Vec<DiagnosticKind> {
        self.diagnostics
            .borrow()
            .iter()
            .filter_map(|d| match &d.kind {
                DiagnosticLevelKind::Error(kind) => Some(kind.clone()),
                DiagnosticLevelKind::Warning(_) => None,
            })
            .collect()
    }

    pub fn warning_kinds(&self) -> Vec<WarningKind> {
        self.diagnostics
            .borrow()
            .iter()
            .filter_map(|d| match &d.kind {
                DiagnosticLevelKind::Warning(kind) => Some(kind.clone()),
                DiagnosticLevelKind::Error(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_levels_separately() {
        let handler = Handler::new();
        handler.emit_error(FileId(0), Location::DUMMY, DiagnosticKind::DuplicateConstant);
        handler.emit_warning(FileId(0), Location::DUMMY, WarningKind::UnreachableCode);
        handler.emit_error_with_detail(
            FileId(0),
            Location::DUMMY,
            DiagnosticKind::ComptimeCastOverflow,
            "Int32 is out of range to cast Int8",
        );

        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.warning_count(), 1);
        assert!(handler.has_errors());
    }

    #[test]
    fn diagnostics_keep_emission_order() {
        let handler = Handler::new();
        handler.emit_error(FileId(0), Location::DUMMY, DiagnosticKind::DuplicateFun);
        handler.emit_error(
            FileId(0),
            Location::DUMMY,
            DiagnosticKind::UnknownIdentifier("x".to_owned()),
        );

        let kinds = handler.error_kinds();
        assert_eq!(kinds[0], DiagnosticKind::DuplicateFun);
        assert_eq!(kinds[1], DiagnosticKind::UnknownIdentifier("x".to_owned()));
    }

    #[test]
    fn display_includes_detail_and_notes() {
        let diagnostic = Diagnostic {
            file: FileId(0),
            location: Location::DUMMY,
            level: Level::Error,
            kind: DiagnosticLevelKind::Error(DiagnosticKind::DataTypeDontMatch),
            notes: vec!["expected `Int32`".to_owned()],
            detail: Some("found `Str`".to_owned()),
        };
        let rendered = diagnostic.to_string();
        assert!(rendered.contains("data types don't match"));
        assert!(rendered.contains("found `Str`"));
        assert!(rendered.contains("expected `Int32`"));
    }
}
