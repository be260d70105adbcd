//! The mid-level IR: the contract between the analyzer's lowering and the
//! interpreter.
//!
//! A [`Module`] maps function names to [`Inst::Fun`] entries. Each
//! function's `insts` is an ordered map keyed by block name, holding
//! [`Inst::Block`] variants; block order is program order and the first
//! block is the entry. Every block ends with exactly one terminator (`jmp`,
//! `jmp_cond`, `ret` or `unreachable`) — [`Fun::check_terminators`]
//! verifies that invariant.

use std::fmt;

use indexmap::IndexMap;

mod builder;
mod display;
mod dt;
mod inst;
mod val;

pub use builder::FunBuilder;
pub use dt::Dt;
pub use inst::{Block, BlockLimit, Fun, Inst, SwitchCase};
pub use val::{Val, ValKind};

/// A whole lowered package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    /// Function name → `Inst::Fun`, plus module-level `Inst::Const`
    /// entries, in lowering order.
    pub insts: IndexMap<String, Inst>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn add_fun(&mut self, fun: Fun) {
        let name = fun.name.clone();
        self.insts.insert(name, Inst::Fun(fun));
    }

    pub fn add_const(&mut self, name: impl Into<String>, val: Val) {
        let name = name.into();
        self.insts.insert(
            name.clone(),
            Inst::Const {
                name,
                val: Box::new(val),
            },
        );
    }

    pub fn fun(&self, name: &str) -> Option<&Fun> {
        match self.insts.get(name) {
            Some(Inst::Fun(fun)) => Some(fun),
            _ => None,
        }
    }

    /// Module-level constants, in order.
    pub fn consts(&self) -> impl Iterator<Item = (&str, &Val)> {
        self.insts.values().filter_map(|inst| match inst {
            Inst::Const { name, val } => Some((name.as_str(), val.as_ref())),
            _ => None,
        })
    }

    /// The terminator invariant over every function of the module.
    pub fn check(&self) -> Result<(), MirError> {
        for inst in self.insts.values() {
            if let Inst::Fun(fun) = inst {
                fun.check_terminators()?;
            }
        }
        Ok(())
    }
}

/// A malformed function body found by [`Fun::check_terminators`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirError {
    EmptyBlock { block: String },
    MissingTerminator { block: String },
    InstAfterTerminator { block: String },
}

impl fmt::Display for MirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirError::EmptyBlock { block } => write!(f, "block `{block}` is empty"),
            MirError::MissingTerminator { block } => {
                write!(f, "block `{block}` does not end with a terminator")
            }
            MirError::InstAfterTerminator { block } => {
                write!(f, "block `{block}` has instructions after its terminator")
            }
        }
    }
}

impl std::error::Error for MirError {}
