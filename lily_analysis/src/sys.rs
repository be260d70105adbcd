//! The `@sys` function table exported by the runtime package.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use lily_ty::{Ty, TyKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SysFun {
    pub name: &'static str,
    pub arity: usize,
}

lazy_static! {
    pub static ref SYS_FUNS: FxHashMap<&'static str, SysFun> = {
        let mut table = FxHashMap::default();
        for fun in [
            SysFun { name: "exit", arity: 1 },
            SysFun { name: "read", arity: 3 },
            SysFun { name: "write", arity: 2 },
            SysFun { name: "open", arity: 2 },
            SysFun { name: "close", arity: 1 },
            SysFun { name: "argc", arity: 0 },
            SysFun { name: "argv", arity: 1 },
        ] {
            table.insert(fun.name, fun);
        }
        table
    };
}

pub fn lookup(name: &str) -> Option<&'static SysFun> {
    SYS_FUNS.get(name)
}

pub fn return_ty(name: &str) -> Option<Ty> {
    match name {
        "exit" => Some(Ty::new(TyKind::Never)),
        "read" | "write" => Some(Ty::new(TyKind::Usize)),
        "open" | "close" => Some(Ty::new(TyKind::CInt)),
        "argc" => Some(Ty::new(TyKind::Usize)),
        "argv" => Some(Ty::new(TyKind::Str(None))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn exit_never_returns() {
        assert_eq!(lookup("exit").unwrap().arity, 1);
        assert_eq!(return_ty("exit"), Some(Ty::new(TyKind::Never)));
        assert_eq!(lookup("fork"), None);
        assert_eq!(return_ty("fork"), None);
    }
}
