//! Plain-text rendering of a diagnostic batch.
//!
//! A failed build prints every diagnostic in emission order followed by a
//! summary line; the caller exits with code 1 when the handler counted
//! errors.

use std::fmt::Write;

use crate::Handler;

/// Resolves file ids to user-facing names.
pub trait FileNames {
    fn name(&self, file: lily_span::FileId) -> String;
}

impl FileNames for Vec<String> {
    fn name(&self, file: lily_span::FileId) -> String {
        self.get(file.0 as usize)
            .cloned()
            .unwrap_or_else(|| file.to_string())
    }
}

/// Render everything the handler collected.
pub fn render(handler: &Handler, files: &dyn FileNames) -> String {
    let mut out = String::new();
    for diagnostic in handler.diagnostics() {
        let file = files.name(diagnostic.file);
        if diagnostic.location.is_dummy() {
            let _ = writeln!(out, "{diagnostic}");
        } else {
            let _ = writeln!(out, "{file}:{diagnostic}");
        }
    }

    let errors = handler.error_count();
    let warnings = handler.warning_count();
    if errors > 0 {
        let _ = writeln!(
            out,
            "build failed with {errors} error{} and {warnings} warning{}",
            plural(errors),
            plural(warnings)
        );
    } else if warnings > 0 {
        let _ = writeln!(out, "build finished with {warnings} warning{}", plural(warnings));
    }
    out
}

/// The exit code the driver should use.
pub fn exit_code(handler: &Handler) -> i32 {
    if handler.has_errors() {
        1
    } else {
        0
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use lily_span::{FileId, Location};

    use crate::{DiagnosticKind, Handler, WarningKind};

    use super::*;

    #[test]
    fn failed_builds_render_diagnostics_and_exit_nonzero() {
        let handler = Handler::new();
        let location = Location::new(FileId(0), 3, 7, 3, 10, 24, 27);
        handler.emit_error(FileId(0), location, DiagnosticKind::DuplicateConstant);
        handler.emit_warning(FileId(0), location, WarningKind::UnusedExpression);

        let files = vec!["src/main.lily".to_owned()];
        let rendered = render(&handler, &files);
        assert!(rendered.contains("src/main.lily:error[3:7]: duplicate constant"));
        assert!(rendered.contains("warning[3:7]: unused expression"));
        assert!(rendered.contains("build failed with 1 error and 1 warning"));
        assert_eq!(exit_code(&handler), 1);
    }

    #[test]
    fn clean_builds_exit_zero() {
        let handler = Handler::new();
        assert_eq!(render(&handler, &Vec::new()), "");
        assert_eq!(exit_code(&handler), 0);
    }

    #[test]
    fn warning_only_builds_summarize_without_failing() {
        let handler = Handler::new();
        handler.emit_warning(FileId(0), Location::DUMMY, WarningKind::UnreachableCode);
        let rendered = render(&handler, &Vec::new());
        assert!(rendered.contains("build finished with 1 warning"));
        assert_eq!(exit_code(&handler), 0);
    }
}
