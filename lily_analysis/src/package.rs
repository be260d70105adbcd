//! The per-package analysis context.

use lily_ast::PackageStatus;
use lily_span::FileId;
use rustc_hash::FxHashSet;

#[derive(Debug)]
pub struct PackageContext {
    pub file: FileId,
    pub global_name: String,
    pub status: PackageStatus,
    pub is_exe: bool,
    pub main_is_found: bool,
    pub import_builtin: bool,
    pub import_sys: bool,
    /// Builtin/sys functions a call actually selected; the lowering uses
    /// these to emit only the needed runtime shims.
    pub used_builtins: FxHashSet<String>,
    pub used_sys: FxHashSet<String>,
}

impl PackageContext {
    pub fn new(file: FileId, global_name: impl Into<String>, status: PackageStatus) -> Self {
        PackageContext {
            file,
            global_name: global_name.into(),
            status,
            is_exe: status == PackageStatus::Main,
            main_is_found: false,
            import_builtin: false,
            import_sys: false,
            used_builtins: FxHashSet::default(),
            used_sys: FxHashSet::default(),
        }
    }
}
