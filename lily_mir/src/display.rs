//! Textual MIR, one instruction per line. The dump format is stable enough
//! for test assertions and debugging; it is not a parseable syntax.

use std::fmt;

use crate::{Block, Fun, Inst, Module, SwitchCase, Val, ValKind};

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, inst) in self.insts.values().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{inst}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Fun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun {}(", self.name)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        writeln!(f, ") {} {{", self.ret)?;
        for inst in self.insts.values() {
            write!(f, "{inst}")?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (limit #{}):", self.name, self.limit.id)?;
        for inst in &self.insts {
            writeln!(f, "  {inst}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValKind::Int(value) => write!(f, "val {value} {}", self.dt),
            ValKind::Uint(value) => write!(f, "val {value} {}", self.dt),
            ValKind::Float(value) => write!(f, "val {value} {}", self.dt),
            ValKind::Str(text) => write!(f, "val {text:?} {}", self.dt),
            ValKind::CStr(text) => write!(f, "val c{text:?} {}", self.dt),
            ValKind::Bytes(bytes) => write!(f, "val b{bytes:?} {}", self.dt),
            ValKind::Unit => write!(f, "val () {}", self.dt),
            ValKind::Undef => write!(f, "val undef {}", self.dt),
            ValKind::Nil => write!(f, "val nil {}", self.dt),
            ValKind::Const(name) => write!(f, "const {name}"),
            ValKind::Param(index) => write!(f, "param {index}"),
            ValKind::Reg(name) => write!(f, "%{name}"),
            ValKind::Var(name) => write!(f, "${name}"),
            ValKind::Array(items) | ValKind::Slice(items) | ValKind::Tuple(items)
            | ValKind::Struct(items) | ValKind::List(items) => {
                write!(f, "val [")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "] {}", self.dt)
            }
            ValKind::Exception(inner) => write!(f, "exception {inner}"),
            ValKind::Trace(inner) => write!(f, "trace {inner}"),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Fun(fun) => write!(f, "{fun}"),
            Inst::FunPrototype { name, params, ret } => {
                write!(f, "fun prototype {name}(")?;
                for (index, param) in params.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {ret}")
            }
            Inst::Block(block) => write!(f, "{block}"),
            Inst::Val(val) => write!(f, "{val}"),
            Inst::Iadd => write!(f, "iadd"),
            Inst::Isub => write!(f, "isub"),
            Inst::Imul => write!(f, "imul"),
            Inst::Idiv => write!(f, "idiv"),
            Inst::Irem => write!(f, "irem"),
            Inst::Ineg => write!(f, "ineg"),
            Inst::Exp => write!(f, "exp"),
            Inst::Fadd => write!(f, "fadd"),
            Inst::Fsub => write!(f, "fsub"),
            Inst::Fmul => write!(f, "fmul"),
            Inst::Fdiv => write!(f, "fdiv"),
            Inst::Frem => write!(f, "frem"),
            Inst::Fneg => write!(f, "fneg"),
            Inst::IcmpEq => write!(f, "icmp eq"),
            Inst::IcmpNe => write!(f, "icmp ne"),
            Inst::IcmpLe => write!(f, "icmp le"),
            Inst::IcmpLt => write!(f, "icmp lt"),
            Inst::IcmpGe => write!(f, "icmp ge"),
            Inst::IcmpGt => write!(f, "icmp gt"),
            Inst::FcmpEq => write!(f, "fcmp eq"),
            Inst::FcmpNe => write!(f, "fcmp ne"),
            Inst::FcmpLe => write!(f, "fcmp le"),
            Inst::FcmpLt => write!(f, "fcmp lt"),
            Inst::FcmpGe => write!(f, "fcmp ge"),
            Inst::FcmpGt => write!(f, "fcmp gt"),
            Inst::Bitand => write!(f, "bitand"),
            Inst::Bitor => write!(f, "bitor"),
            Inst::Bitnot => write!(f, "bitnot"),
            Inst::Xor => write!(f, "xor"),
            Inst::Shl => write!(f, "shl"),
            Inst::Shr => write!(f, "shr"),
            Inst::Not => write!(f, "not"),
            Inst::Alloc(dt) => write!(f, "alloc {dt}"),
            Inst::Load { dt, src } => write!(f, "load {dt} {src}"),
            Inst::Store { dest, src } => write!(f, "store {dest}, {src}"),
            Inst::GetField { src, index } => write!(f, "getfield {src}, {index}"),
            Inst::GetPtr(src) => write!(f, "getptr {src}"),
            Inst::GetArray { src, index } => write!(f, "getarray {src}, {index}"),
            Inst::GetList { src, index } => write!(f, "getlist {src}, {index}"),
            Inst::GetSlice { src, lo, hi } => write!(f, "getslice {src}, {lo}, {hi}"),
            Inst::GetArg(index) => write!(f, "getarg {index}"),
            Inst::Len => write!(f, "len"),
            Inst::MakeRef => write!(f, "makeref"),
            Inst::MakeOpt => write!(f, "makeopt"),
            Inst::MakeOk => write!(f, "makeok"),
            Inst::MakeErr => write!(f, "makeerr"),
            Inst::NonNil => write!(f, "non_nil"),
            Inst::RefPtr => write!(f, "ref_ptr"),
            Inst::IsOk => write!(f, "is_ok"),
            Inst::IsErr => write!(f, "is_err"),
            Inst::IncTrace => write!(f, "inctrace"),
            Inst::Call { name, args, ret_dt } => {
                write!(f, "call {ret_dt} {name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Inst::BuiltinCall { name, args, ret_dt } => {
                write!(f, "builtin call {ret_dt} @{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Inst::SysCall { name, args, ret_dt } => {
                write!(f, "sys call {ret_dt} @{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Inst::Jmp(target) => write!(f, "jmp {target}"),
            Inst::JmpCond {
                cond,
                then_block,
                else_block,
            } => write!(f, "jmp_cond {cond}, {then_block}, {else_block}"),
            Inst::Ret(inner) => write!(f, "ret {inner}"),
            Inst::Switch {
                val,
                cases,
                default,
            } => {
                write!(f, "switch {val} [")?;
                for (index, SwitchCase { val, target }) in cases.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{val} => {target}")?;
                }
                write!(f, "] else {default}")
            }
            Inst::Try { inner, catch_block } => write!(f, "try {inner} catch {catch_block}"),
            Inst::TryPtr { inner, catch_block } => {
                write!(f, "try_ptr {inner} catch {catch_block}")
            }
            Inst::Unreachable => write!(f, "unreachable"),
            Inst::Reg { name, inst } => write!(f, "%{name} = {inst}"),
            Inst::Var { name, inst } => write!(f, "var ${name} = {inst}"),
            Inst::Const { name, val } => write!(f, "const {name} = {val}"),
            Inst::Drop(name) => write!(f, "drop ${name}"),
            Inst::Trunc { dt } => write!(f, "trunc {dt}"),
            Inst::Bitcast { dt } => write!(f, "bitcast {dt}"),
            Inst::Asm(text) => write!(f, "asm {text:?}"),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Val]) -> fmt::Result {
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{Dt, FunBuilder, Inst, Module, Val};

    #[test]
    fn fun_dump_is_block_structured() {
        let fun = FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::val(Val::int(Dt::I32, 1)),
                    Inst::val(Val::int(Dt::I32, 2)),
                    Inst::reg("0", Inst::Iadd),
                    Inst::Jmp("exit".to_owned()),
                ],
            )
            .block(
                "exit",
                vec![Inst::ret(Inst::val(Val::int(Dt::I32, 0)))],
            )
            .finish();

        let dump = fun.to_string();
        assert_eq!(
            dump,
            "fun main() i32 {\n\
             entry (limit #0):\n\
             \x20 val 1 i32\n\
             \x20 val 2 i32\n\
             \x20 %0 = iadd\n\
             \x20 jmp exit\n\
             exit (limit #1):\n\
             \x20 ret val 0 i32\n\
             }\n"
        );
    }

    #[test]
    fn module_dump_includes_consts_and_funs() {
        let mut module = Module::new();
        module.add_const("main.X", Val::int(Dt::I32, 9));
        module.add_fun(
            FunBuilder::new("main")
                .ret(Dt::Unit)
                .block("entry", vec![Inst::ret(Inst::val(Val::unit()))])
                .finish(),
        );
        let dump = module.to_string();
        assert!(dump.starts_with("const main.X = val 9 i32\n"));
        assert!(dump.contains("fun main() unit {"));
    }
}
