//! Instructions, blocks and functions.

use indexmap::IndexMap;

use crate::{Dt, MirError, Val};

/// A lowered function: parameter types, return type, and an ordered map of
/// blocks keyed by block name. The first entry is the entry block.
#[derive(Clone, Debug, PartialEq)]
pub struct Fun {
    pub name: String,
    pub params: Vec<Dt>,
    pub ret: Dt,
    pub insts: IndexMap<String, Inst>,
}

impl Fun {
    pub fn block(&self, name: &str) -> Option<&Block> {
        match self.insts.get(name) {
            Some(Inst::Block(block)) => Some(block),
            _ => None,
        }
    }

    pub fn entry_block(&self) -> Option<&Block> {
        match self.insts.values().next() {
            Some(Inst::Block(block)) => Some(block),
            _ => None,
        }
    }

    pub fn block_count(&self) -> usize {
        self.insts.len()
    }

    /// The number of distinct block-frame slots a frame for this function
    /// needs: limit ids are dense, so it is `max(limit_id) + 1`.
    pub fn block_frame_len(&self) -> usize {
        self.insts
            .values()
            .filter_map(|inst| match inst {
                Inst::Block(block) => Some(block.limit.id + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Every block ends with exactly one of jmp, jmp_cond, ret,
    /// unreachable — and nothing after it.
    pub fn check_terminators(&self) -> Result<(), MirError> {
        for inst in self.insts.values() {
            let Inst::Block(block) = inst else { continue };
            let Some(last) = block.insts.last() else {
                return Err(MirError::EmptyBlock {
                    block: block.name.clone(),
                });
            };
            if !last.is_terminator() {
                return Err(MirError::MissingTerminator {
                    block: block.name.clone(),
                });
            }
            if block.insts.iter().rev().skip(1).any(Inst::is_terminator) {
                return Err(MirError::InstAfterTerminator {
                    block: block.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A basic block. `limit` names the block-frame slot this block shares with
/// every other block merged into the same stack extent (loop back-edges).
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub name: String,
    pub limit: BlockLimit,
    pub insts: Vec<Inst>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLimit {
    pub id: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub val: Val,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    // Containers.
    Fun(Fun),
    FunPrototype {
        name: String,
        params: Vec<Dt>,
        ret: Dt,
    },
    Block(Block),

    // Value producer.
    Val(Box<Val>),

    // Integer arithmetic; the runtime value kind selects the width and
    // signedness.
    Iadd,
    Isub,
    Imul,
    Idiv,
    Irem,
    Ineg,
    Exp,

    // Float arithmetic (f64).
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Frem,
    Fneg,

    // Comparisons.
    IcmpEq,
    IcmpNe,
    IcmpLe,
    IcmpLt,
    IcmpGe,
    IcmpGt,
    FcmpEq,
    FcmpNe,
    FcmpLe,
    FcmpLt,
    FcmpGe,
    FcmpGt,

    // Bit operations.
    Bitand,
    Bitor,
    Bitnot,
    Xor,
    Shl,
    Shr,
    Not,

    // Memory.
    Alloc(Dt),
    Load {
        dt: Dt,
        src: Box<Val>,
    },
    Store {
        dest: Box<Val>,
        src: Box<Val>,
    },
    GetField {
        src: Box<Val>,
        index: usize,
    },
    GetPtr(Box<Val>),
    GetArray {
        src: Box<Val>,
        index: Box<Val>,
    },
    GetList {
        src: Box<Val>,
        index: Box<Val>,
    },
    GetSlice {
        src: Box<Val>,
        lo: Box<Val>,
        hi: Box<Val>,
    },
    GetArg(usize),
    Len,

    // Producers over existing values.
    MakeRef,
    MakeOpt,
    MakeOk,
    MakeErr,
    NonNil,
    RefPtr,
    IsOk,
    IsErr,
    IncTrace,

    // Calls.
    Call {
        name: String,
        args: Vec<Val>,
        ret_dt: Dt,
    },
    BuiltinCall {
        name: String,
        args: Vec<Val>,
        ret_dt: Dt,
    },
    SysCall {
        name: String,
        args: Vec<Val>,
        ret_dt: Dt,
    },

    // Control flow.
    Jmp(String),
    JmpCond {
        cond: Box<Val>,
        then_block: String,
        else_block: String,
    },
    Ret(Box<Inst>),
    Switch {
        val: Box<Val>,
        cases: Vec<SwitchCase>,
        default: String,
    },
    Try {
        inner: Box<Inst>,
        catch_block: String,
    },
    TryPtr {
        inner: Box<Inst>,
        catch_block: String,
    },
    Unreachable,

    // Naming.
    Reg {
        name: String,
        inst: Box<Inst>,
    },
    Var {
        name: String,
        inst: Box<Inst>,
    },
    Const {
        name: String,
        val: Box<Val>,
    },
    Drop(String),

    // Lowered odds and ends.
    Trunc {
        dt: Dt,
    },
    Bitcast {
        dt: Dt,
    },
    Asm(String),
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Inst::Jmp(_) | Inst::JmpCond { .. } | Inst::Ret(_) | Inst::Unreachable
        )
    }

    pub fn val(val: Val) -> Inst {
        Inst::Val(Box::new(val))
    }

    pub fn ret(inner: Inst) -> Inst {
        Inst::Ret(Box::new(inner))
    }

    pub fn reg(name: impl Into<String>, inner: Inst) -> Inst {
        Inst::Reg {
            name: name.into(),
            inst: Box::new(inner),
        }
    }

    pub fn var(name: impl Into<String>, inner: Inst) -> Inst {
        Inst::Var {
            name: name.into(),
            inst: Box::new(inner),
        }
    }

    pub fn jmp_cond(cond: Val, then_block: impl Into<String>, else_block: impl Into<String>) -> Inst {
        Inst::JmpCond {
            cond: Box::new(cond),
            then_block: then_block.into(),
            else_block: else_block.into(),
        }
    }
}
