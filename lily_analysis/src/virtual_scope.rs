//! Shadow scopes for signature re-analysis.
//!
//! When a new concrete signature is added to a generic function, the body
//! is re-walked against signature-specific parameter and variable types
//! without touching the original scopes or the checked body. A
//! [`VirtualScope`] chain carries those shadow bindings.

use lily_ty::Ty;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct VirtualScope<'p> {
    parent: Option<&'p VirtualScope<'p>>,
    bindings: FxHashMap<String, Ty>,
}

impl<'p> VirtualScope<'p> {
    pub fn new() -> Self {
        VirtualScope::default()
    }

    pub fn child(&'p self) -> VirtualScope<'p> {
        VirtualScope {
            parent: Some(self),
            bindings: FxHashMap::default(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, ty: Ty) {
        self.bindings.insert(name.into(), ty);
    }

    /// Nearest binding wins, walking the parent chain.
    pub fn resolve(&self, name: &str) -> Option<Ty> {
        if let Some(ty) = self.bindings.get(name) {
            return Some(ty.clone());
        }
        self.parent.and_then(|parent| parent.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use lily_ty::TyKind;

    use super::*;

    #[test]
    fn child_bindings_shadow_the_parent() {
        let mut root = VirtualScope::new();
        root.bind("x", Ty::new(TyKind::Int32));
        root.bind("y", Ty::new(TyKind::Bool));

        let mut child = root.child();
        child.bind("x", Ty::new(TyKind::Str(None)));

        assert_eq!(child.resolve("x"), Some(Ty::new(TyKind::Str(None))));
        assert_eq!(child.resolve("y"), Some(Ty::new(TyKind::Bool)));
        assert_eq!(root.resolve("x"), Some(Ty::new(TyKind::Int32)));
        assert_eq!(child.resolve("z"), None);
    }
}
