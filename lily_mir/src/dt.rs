//! MIR data types. Flatter than the checked lattice: customs are lowered to
//! structs, generics are gone, and sizes are explicit.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Dt {
    /// One-bit integer; booleans after lowering.
    I1,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F64,
    Unit,
    CVoid,
    Str(usize),
    Bytes(usize),
    CStr,
    Array(usize, Box<Dt>),
    List(Box<Dt>),
    Tuple(Vec<Dt>),
    Ptr(Box<Dt>),
    Ref(Box<Dt>),
    Trace(Box<Dt>),
    Struct(Vec<Dt>),
    Result { ok: Box<Dt>, err: Box<Dt> },
    Optional(Box<Dt>),
    /// Lowered exception payload.
    Exception(Box<Dt>, Box<Dt>),
    Any,
}

impl Dt {
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Dt::I1 | Dt::I8 | Dt::I16 | Dt::I32 | Dt::I64 | Dt::Isize)
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, Dt::U8 | Dt::U16 | Dt::U32 | Dt::U64 | Dt::Usize)
    }

    pub fn is_int(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Dt::F64)
    }
}

impl fmt::Display for Dt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dt::I1 => write!(f, "i1"),
            Dt::I8 => write!(f, "i8"),
            Dt::I16 => write!(f, "i16"),
            Dt::I32 => write!(f, "i32"),
            Dt::I64 => write!(f, "i64"),
            Dt::Isize => write!(f, "isize"),
            Dt::U8 => write!(f, "u8"),
            Dt::U16 => write!(f, "u16"),
            Dt::U32 => write!(f, "u32"),
            Dt::U64 => write!(f, "u64"),
            Dt::Usize => write!(f, "usize"),
            Dt::F64 => write!(f, "f64"),
            Dt::Unit => write!(f, "unit"),
            Dt::CVoid => write!(f, "cvoid"),
            Dt::Str(len) => write!(f, "str({len})"),
            Dt::Bytes(len) => write!(f, "bytes({len})"),
            Dt::CStr => write!(f, "cstr"),
            Dt::Array(len, inner) => write!(f, "[{len} x {inner}]"),
            Dt::List(inner) => write!(f, "list {inner}"),
            Dt::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Dt::Ptr(inner) => write!(f, "*{inner}"),
            Dt::Ref(inner) => write!(f, "&{inner}"),
            Dt::Trace(inner) => write!(f, "trace {inner}"),
            Dt::Struct(items) => {
                write!(f, "struct{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Dt::Result { ok, err } => write!(f, "{ok}!{err}"),
            Dt::Optional(inner) => write!(f, "?{inner}"),
            Dt::Exception(ok, err) => write!(f, "exception({ok}, {err})"),
            Dt::Any => write!(f, "any"),
        }
    }
}
