//! The operator registry.
//!
//! Built-in operator families are conditional compiler choices ("both
//! operands `Int32` → `Int32`"); user `operator` declarations append
//! entries keyed by (name, param types). Process-wide in spirit:
//! initialized before analysis, read-only afterwards.

use lily_ty::{CondArm, CondChoice, Ty, TyKind};

const VALID_OPERATOR_NAMES: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "&", "|", "xor", "<<", ">>", "==", "not=", "<", ">", "<=",
    ">=", "and", "or", "not", "|>", "[n]", "..",
];

pub fn is_valid_operator_name(name: &str) -> bool {
    VALID_OPERATOR_NAMES.contains(&name)
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperatorEntry {
    pub name: String,
    pub param_tys: Vec<Ty>,
    pub ret_ty: Ty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateOperator;

#[derive(Debug)]
pub struct OperatorRegistry {
    /// User-declared operators.
    entries: Vec<OperatorEntry>,
    /// `Int… × Int… → Int…` and `Float × Float → Float` per arithmetic
    /// operator name.
    arith_choice: CondChoice,
    /// Same operand families, `Bool` result.
    cmp_choice: CondChoice,
}

fn numeric_tys() -> Vec<Ty> {
    vec![
        Ty::new(TyKind::Int8),
        Ty::new(TyKind::Int16),
        Ty::new(TyKind::Int32),
        Ty::new(TyKind::Int64),
        Ty::new(TyKind::Isize),
        Ty::new(TyKind::Uint8),
        Ty::new(TyKind::Uint16),
        Ty::new(TyKind::Uint32),
        Ty::new(TyKind::Uint64),
        Ty::new(TyKind::Usize),
        Ty::new(TyKind::Float32),
        Ty::new(TyKind::Float64),
    ]
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        let numerics = numeric_tys();
        let arith_choice = CondChoice {
            choices: numerics.clone(),
            conds: numerics
                .iter()
                .enumerate()
                .map(|(index, ty)| CondArm {
                    params: vec![ty.clone(), ty.clone()],
                    choice: index,
                })
                .collect(),
        };
        let bool_ty = Ty::new(TyKind::Bool);
        let cmp_choice = CondChoice {
            choices: vec![bool_ty],
            conds: numerics
                .iter()
                .map(|ty| CondArm {
                    params: vec![ty.clone(), ty.clone()],
                    choice: 0,
                })
                .collect(),
        };
        OperatorRegistry {
            entries: Vec::new(),
            arith_choice,
            cmp_choice,
        }
    }
}

impl OperatorRegistry {
    pub fn new() -> Self {
        OperatorRegistry::default()
    }

    /// Register a user operator; (name, param types) must be unique.
    pub fn add(&mut self, entry: OperatorEntry) -> Result<(), DuplicateOperator> {
        if self
            .entries
            .iter()
            .any(|existing| existing.name == entry.name && existing.param_tys == entry.param_tys)
        {
            return Err(DuplicateOperator);
        }
        log::debug!("register operator `{}`/{}", entry.name, entry.param_tys.len());
        self.entries.push(entry);
        Ok(())
    }

    /// The return type for `name` applied to `args`, or `None` — the
    /// caller reports `ImpossibleToGetReturnDataType` or a mismatch.
    pub fn lookup(&self, name: &str, args: &[Ty]) -> Option<Ty> {
        // User operators take precedence over the built-in families.
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.name == name && entry.param_tys.iter().eq(args.iter()))
        {
            return Some(entry.ret_ty.clone());
        }

        match name {
            "+" | "-" | "*" | "/" | "%" | "**" => self.arith_choice.lookup(args),
            "&" | "|" | "xor" | "<<" | ">>" => {
                let ret = self.arith_choice.lookup(args)?;
                // Bit operators exclude the float family.
                if ret.is_guaranteed(lily_ty::Guarantee::Integer) {
                    Some(ret)
                } else {
                    None
                }
            }
            "==" | "not=" | "<" | ">" | "<=" | ">=" => {
                if args.len() == 2 && args[0] == args[1] {
                    if args[0].is_guaranteed(lily_ty::Guarantee::Bool) && matches!(name, "==" | "not=") {
                        return Some(Ty::new(TyKind::Bool));
                    }
                    return self.cmp_choice.lookup(args);
                }
                None
            }
            "and" | "or" => {
                if args.len() == 2
                    && args
                        .iter()
                        .all(|arg| arg.is_guaranteed(lily_ty::Guarantee::Bool))
                {
                    Some(Ty::new(TyKind::Bool))
                } else {
                    None
                }
            }
            "not" => {
                if args.len() == 1 && args[0].is_guaranteed(lily_ty::Guarantee::Bool) {
                    Some(Ty::new(TyKind::Bool))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
