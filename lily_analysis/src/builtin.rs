//! The `@builtin` function table exported by the runtime package.
//! Initialized once, read-only thereafter.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use lily_ty::{Guarantee, Ty, TyKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinFun {
    pub name: &'static str,
    pub arity: usize,
}

lazy_static! {
    pub static ref BUILTIN_FUNS: FxHashMap<&'static str, BuiltinFun> = {
        let mut table = FxHashMap::default();
        for fun in [
            BuiltinFun { name: "len", arity: 1 },
            BuiltinFun { name: "capacity", arity: 1 },
            BuiltinFun { name: "align_of", arity: 1 },
            BuiltinFun { name: "size_of", arity: 1 },
            BuiltinFun { name: "abs", arity: 1 },
            BuiltinFun { name: "max", arity: 2 },
            BuiltinFun { name: "min", arity: 2 },
            BuiltinFun { name: "print", arity: 1 },
            BuiltinFun { name: "println", arity: 1 },
        ] {
            table.insert(fun.name, fun);
        }
        table
    };
}

pub fn lookup(name: &str) -> Option<&'static BuiltinFun> {
    BUILTIN_FUNS.get(name)
}

/// The return type of a builtin applied to `args`; `None` means the
/// arguments don't fit and the caller diagnoses.
pub fn return_ty(name: &str, args: &[Ty]) -> Option<Ty> {
    match name {
        "len" | "capacity" | "align_of" | "size_of" => Some(Ty::new(TyKind::Usize)),
        "abs" => {
            let arg = args.first()?;
            if arg.is_guaranteed(Guarantee::Numeric) {
                Some(arg.clone())
            } else {
                None
            }
        }
        "max" | "min" => {
            let (lhs, rhs) = (args.first()?, args.get(1)?);
            if lhs == rhs && lhs.is_guaranteed(Guarantee::Numeric) {
                Some(lhs.clone())
            } else {
                None
            }
        }
        "print" | "println" => Some(Ty::new(TyKind::Unit)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn table_membership_and_arity() {
        assert_eq!(lookup("len"), Some(&BuiltinFun { name: "len", arity: 1 }));
        assert_eq!(lookup("max").unwrap().arity, 2);
        assert_eq!(lookup("frobnicate"), None);
    }

    #[test]
    fn return_types_follow_arguments() {
        let i32_ty = Ty::new(TyKind::Int32);
        assert_eq!(
            return_ty("len", &[Ty::new(TyKind::Str(None))]),
            Some(Ty::new(TyKind::Usize))
        );
        assert_eq!(return_ty("abs", &[i32_ty.clone()]), Some(i32_ty.clone()));
        assert_eq!(return_ty("abs", &[Ty::new(TyKind::Bool)]), None);
        assert_eq!(
            return_ty("max", &[i32_ty.clone(), i32_ty.clone()]),
            Some(i32_ty.clone())
        );
        assert_eq!(return_ty("max", &[i32_ty, Ty::new(TyKind::Int64)]), None);
    }
}
