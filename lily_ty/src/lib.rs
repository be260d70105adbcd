//! The closed set of checked data types.
//!
//! A [`Ty`] is a shared mutable cell: cloning shares the payload, and the
//! analyzer binds inference placeholders (`unknown`, compiler generics) in
//! place through [`Ty::update`]. Once the enclosing declaration finishes
//! checking, [`Ty::lock`] freezes the whole reachable type so later passes
//! can rely on it. Source locations ride along but never participate in
//! equality.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use lily_span::Location;

mod kind;

pub use kind::{CondArm, CondChoice, CustomKind, CustomTy, Guarantee, TyKind};

/// Map from generic-parameter name to the type bound to it.
pub type GenericMap = IndexMap<String, Ty>;

#[derive(Clone)]
pub struct Ty(Rc<RefCell<TyData>>);

#[derive(Debug)]
pub struct TyData {
    pub kind: TyKind,
    pub location: Option<Location>,
    pub locked: bool,
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Ty(Rc::new(RefCell::new(TyData {
            kind,
            location: None,
            locked: false,
        })))
    }

    pub fn with_location(kind: TyKind, location: Location) -> Self {
        Ty(Rc::new(RefCell::new(TyData {
            kind,
            location: Some(location),
            locked: false,
        })))
    }

    pub fn kind(&self) -> Ref<'_, TyKind> {
        Ref::map(self.0.borrow(), |data| &data.kind)
    }

    pub fn clone_kind(&self) -> TyKind {
        self.0.borrow().kind.clone()
    }

    pub fn location(&self) -> Option<Location> {
        self.0.borrow().location
    }

    pub fn is_locked(&self) -> bool {
        self.0.borrow().locked
    }

    /// Two handles over the same cell.
    pub fn same_cell(&self, other: &Ty) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Bind this cell to a new kind in place. Every clone observes the
    /// update. Fails once the cell is locked.
    pub fn update(&self, kind: TyKind) -> Result<(), LockedTy> {
        let mut data = self.0.borrow_mut();
        if data.locked {
            return Err(LockedTy);
        }
        log::trace!("update ty {:?} -> {:?}", data.kind, kind);
        data.kind = kind;
        Ok(())
    }

    /// Freeze this type and everything reachable from it.
    pub fn lock(&self) {
        let mut data = self.0.borrow_mut();
        if data.locked {
            return;
        }
        data.locked = true;
        let kind = data.kind.clone();
        drop(data);
        kind.for_each_child(|child| child.lock());
    }

    /// The type definitely reduces to `guarantee`, looking through `mut`.
    pub fn is_guaranteed(&self, guarantee: Guarantee) -> bool {
        let kind = self.kind();
        match &*kind {
            TyKind::Mut(inner) => {
                let inner = inner.clone();
                drop(kind);
                inner.is_guaranteed(guarantee)
            }
            other => other.matches_guarantee(guarantee),
        }
    }

    /// Strip `mut`, pointers, refs and traces until a custom type shows up.
    pub fn direct_custom(&self) -> Option<CustomTy> {
        let kind = self.kind();
        match &*kind {
            TyKind::Custom(custom) => Some(custom.clone()),
            TyKind::Mut(inner)
            | TyKind::Ptr(inner)
            | TyKind::PtrMut(inner)
            | TyKind::Ref(inner)
            | TyKind::RefMut(inner)
            | TyKind::Trace(inner)
            | TyKind::TraceMut(inner) => {
                let inner = inner.clone();
                drop(kind);
                inner.direct_custom()
            }
            _ => None,
        }
    }

    /// Any generic, compiler-generic or unknown leaf anywhere in the type.
    pub fn contains_generic(&self) -> bool {
        let kind = self.kind();
        match &*kind {
            TyKind::Unknown | TyKind::CompilerGeneric(_) => true,
            TyKind::Custom(custom) => {
                custom.kind == CustomKind::Generic
                    || custom
                        .generics
                        .as_ref()
                        .map_or(false, |generics| generics.iter().any(Ty::contains_generic))
            }
            other => {
                let mut found = false;
                other.for_each_child(|child| found |= child.contains_generic());
                found
            }
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(&*self.kind(), TyKind::Unknown)
    }

    /// Substitute generic names through `map`, producing a fresh cell tree.
    /// Subtrees without generics are shared, not copied.
    pub fn resolve_generic(&self, map: &GenericMap) -> Ty {
        let data = self.0.borrow();
        let resolved_kind = match &data.kind {
            TyKind::CompilerGeneric(name) => {
                return map.get(name).cloned().unwrap_or_else(|| self.clone());
            }
            TyKind::Custom(custom) if custom.kind == CustomKind::Generic => {
                return map.get(&custom.name).cloned().unwrap_or_else(|| self.clone());
            }
            _ if !self.contains_generic() => return self.clone(),
            other => other.map_children(|child| child.resolve_generic(map)),
        };
        match data.location {
            Some(location) => Ty::with_location(resolved_kind, location),
            None => Ty::new(resolved_kind),
        }
    }

    /// Stable textual form used in serialized signature names.
    pub fn serial_name(&self) -> String {
        let mut rendered = self.to_string();
        rendered.retain(|c| !c.is_whitespace());
        rendered
    }
}

/// Attempted [`Ty::update`] on a locked cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockedTy;

impl fmt::Display for LockedTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot update a locked data type")
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Ty) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        *self.kind() == *other.kind()
    }
}

impl Eq for Ty {}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({:?})", self.kind())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

impl From<TyKind> for Ty {
    fn from(kind: TyKind) -> Self {
        Ty::new(kind)
    }
}

/// `compose(outer, inner)`: the map equivalent to applying `inner` first
/// and `outer` second.
pub fn compose_generic_maps(outer: &GenericMap, inner: &GenericMap) -> GenericMap {
    let mut composed: GenericMap = inner
        .iter()
        .map(|(name, ty)| (name.clone(), ty.resolve_generic(outer)))
        .collect();
    for (name, ty) in outer {
        composed.entry(name.clone()).or_insert_with(|| ty.clone());
    }
    composed
}

#[cfg(test)]
mod tests;
