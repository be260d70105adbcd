//! The tagged variants of a checked data type.

use std::fmt;

use lily_span::ScopeId;

use crate::Ty;

#[derive(Clone, Debug, PartialEq)]
pub enum TyKind {
    Bool,
    Byte,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Isize,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Usize,
    Float32,
    Float64,
    Unit,
    Never,
    Any,

    CChar,
    CShort,
    CInt,
    CLong,
    CLongLong,
    CFloat,
    CDouble,
    CVoid,

    SizedArray(usize, Ty),
    UnsizedArray(Ty),
    DynamicArray(Ty),
    List(Ty),
    Tuple(Vec<Ty>),
    Optional(Ty),
    Result { ok: Ty, errs: Vec<Ty> },
    Str(Option<usize>),
    Bytes(Option<usize>),
    CStr,

    Ptr(Ty),
    PtrMut(Ty),
    Ref(Ty),
    RefMut(Ty),
    Trace(Ty),
    TraceMut(Ty),
    Mut(Ty),

    Custom(CustomTy),

    /// A lazily bound inference slot allocated on a function; named so
    /// repeated uses unify.
    CompilerGeneric(String),
    /// A set of candidate types.
    CompilerChoice(Vec<Ty>),
    /// Overload families: pick the return type matching the concrete
    /// argument types.
    ConditionalCompilerChoice(Box<CondChoice>),

    /// Inference in progress. Must be resolved before the enclosing
    /// function is finalized.
    Unknown,

    Lambda { params: Vec<Ty>, ret: Ty },
}

/// What [`Ty::is_guaranteed`] can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guarantee {
    Bool,
    Integer,
    SignedInteger,
    UnsignedInteger,
    Float,
    Numeric,
    Unit,
    Never,
    Str,
    Ptr,
    Ref,
    Custom,
    Enum,
}

impl TyKind {
    pub fn matches_guarantee(&self, guarantee: Guarantee) -> bool {
        match guarantee {
            Guarantee::Bool => matches!(self, TyKind::Bool),
            Guarantee::SignedInteger => matches!(
                self,
                TyKind::Int8 | TyKind::Int16 | TyKind::Int32 | TyKind::Int64 | TyKind::Isize
            ),
            Guarantee::UnsignedInteger => matches!(
                self,
                TyKind::Uint8 | TyKind::Uint16 | TyKind::Uint32 | TyKind::Uint64 | TyKind::Usize
            ),
            Guarantee::Integer => {
                self.matches_guarantee(Guarantee::SignedInteger)
                    || self.matches_guarantee(Guarantee::UnsignedInteger)
                    || matches!(self, TyKind::Byte)
            }
            Guarantee::Float => matches!(self, TyKind::Float32 | TyKind::Float64),
            Guarantee::Numeric => {
                self.matches_guarantee(Guarantee::Integer)
                    || self.matches_guarantee(Guarantee::Float)
            }
            Guarantee::Unit => matches!(self, TyKind::Unit),
            Guarantee::Never => matches!(self, TyKind::Never),
            Guarantee::Str => matches!(self, TyKind::Str(_)),
            Guarantee::Ptr => matches!(self, TyKind::Ptr(_) | TyKind::PtrMut(_)),
            Guarantee::Ref => matches!(self, TyKind::Ref(_) | TyKind::RefMut(_)),
            Guarantee::Custom => matches!(self, TyKind::Custom(_)),
            Guarantee::Enum => matches!(
                self,
                TyKind::Custom(CustomTy {
                    kind: CustomKind::Enum,
                    ..
                })
            ),
        }
    }

    /// Whether the integer literal `value` fits this integer type.
    pub fn fits_int(&self, value: i128) -> bool {
        match self {
            TyKind::Int8 => i8::try_from(value).is_ok(),
            TyKind::Int16 => i16::try_from(value).is_ok(),
            TyKind::Int32 => i32::try_from(value).is_ok(),
            TyKind::Int64 => i64::try_from(value).is_ok(),
            TyKind::Isize => i64::try_from(value).is_ok(),
            TyKind::Uint8 | TyKind::Byte => u8::try_from(value).is_ok(),
            TyKind::Uint16 => u16::try_from(value).is_ok(),
            TyKind::Uint32 => u32::try_from(value).is_ok(),
            TyKind::Uint64 | TyKind::Usize => u64::try_from(value).is_ok(),
            TyKind::CChar => i8::try_from(value).is_ok(),
            TyKind::CShort => i16::try_from(value).is_ok(),
            TyKind::CInt => i32::try_from(value).is_ok(),
            TyKind::CLong | TyKind::CLongLong => i64::try_from(value).is_ok(),
            _ => false,
        }
    }

    /// Visit every directly nested type.
    pub fn for_each_child(&self, mut visit: impl FnMut(&Ty)) {
        match self {
            TyKind::SizedArray(_, inner)
            | TyKind::UnsizedArray(inner)
            | TyKind::DynamicArray(inner)
            | TyKind::List(inner)
            | TyKind::Optional(inner)
            | TyKind::Ptr(inner)
            | TyKind::PtrMut(inner)
            | TyKind::Ref(inner)
            | TyKind::RefMut(inner)
            | TyKind::Trace(inner)
            | TyKind::TraceMut(inner)
            | TyKind::Mut(inner) => visit(inner),
            TyKind::Tuple(items) | TyKind::CompilerChoice(items) => {
                items.iter().for_each(visit);
            }
            TyKind::Result { ok, errs } => {
                visit(ok);
                errs.iter().for_each(visit);
            }
            TyKind::Custom(custom) => {
                if let Some(generics) = &custom.generics {
                    generics.iter().for_each(visit);
                }
            }
            TyKind::ConditionalCompilerChoice(choice) => {
                choice.choices.iter().for_each(&mut visit);
                for arm in &choice.conds {
                    arm.params.iter().for_each(&mut visit);
                }
            }
            TyKind::Lambda { params, ret } => {
                params.iter().for_each(&mut visit);
                visit(ret);
            }
            _ => {}
        }
    }

    /// Rebuild this kind with every directly nested type mapped.
    pub fn map_children(&self, mut map: impl FnMut(&Ty) -> Ty) -> TyKind {
        match self {
            TyKind::SizedArray(size, inner) => TyKind::SizedArray(*size, map(inner)),
            TyKind::UnsizedArray(inner) => TyKind::UnsizedArray(map(inner)),
            TyKind::DynamicArray(inner) => TyKind::DynamicArray(map(inner)),
            TyKind::List(inner) => TyKind::List(map(inner)),
            TyKind::Optional(inner) => TyKind::Optional(map(inner)),
            TyKind::Ptr(inner) => TyKind::Ptr(map(inner)),
            TyKind::PtrMut(inner) => TyKind::PtrMut(map(inner)),
            TyKind::Ref(inner) => TyKind::Ref(map(inner)),
            TyKind::RefMut(inner) => TyKind::RefMut(map(inner)),
            TyKind::Trace(inner) => TyKind::Trace(map(inner)),
            TyKind::TraceMut(inner) => TyKind::TraceMut(map(inner)),
            TyKind::Mut(inner) => TyKind::Mut(map(inner)),
            TyKind::Tuple(items) => TyKind::Tuple(items.iter().map(&mut map).collect()),
            TyKind::CompilerChoice(items) => {
                TyKind::CompilerChoice(items.iter().map(&mut map).collect())
            }
            TyKind::Result { ok, errs } => TyKind::Result {
                ok: map(ok),
                errs: errs.iter().map(&mut map).collect(),
            },
            TyKind::Custom(custom) => TyKind::Custom(CustomTy {
                generics: custom
                    .generics
                    .as_ref()
                    .map(|generics| generics.iter().map(&mut map).collect()),
                ..custom.clone()
            }),
            TyKind::ConditionalCompilerChoice(choice) => {
                TyKind::ConditionalCompilerChoice(Box::new(CondChoice {
                    choices: choice.choices.iter().map(&mut map).collect(),
                    conds: choice
                        .conds
                        .iter()
                        .map(|arm| CondArm {
                            params: arm.params.iter().map(&mut map).collect(),
                            choice: arm.choice,
                        })
                        .collect(),
                }))
            }
            TyKind::Lambda { params, ret } => TyKind::Lambda {
                params: params.iter().map(&mut map).collect(),
                ret: map(ret),
            },
            other => other.clone(),
        }
    }
}

/// A reference to a user-declared type.
#[derive(Clone, Debug)]
pub struct CustomTy {
    /// Scope owning the declaration.
    pub scope_id: ScopeId,
    /// Scope the reference was made from.
    pub access_scope_id: ScopeId,
    pub name: String,
    pub global_name: String,
    pub generics: Option<Vec<Ty>>,
    pub kind: CustomKind,
    /// The declaration refers to itself through a pointer-like indirection.
    pub is_recursive: bool,
}

impl PartialEq for CustomTy {
    fn eq(&self, other: &CustomTy) -> bool {
        self.global_name == other.global_name
            && self.kind == other.kind
            && self.generics == other.generics
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomKind {
    Record,
    Enum,
    Alias,
    Class,
    Trait,
    Error,
    Generic,
    RecordObject,
    EnumObject,
}

/// Overload family: `conds[i].params` against the concrete argument types
/// selects `choices[conds[i].choice]` as the return type.
#[derive(Clone, Debug, PartialEq)]
pub struct CondChoice {
    pub choices: Vec<Ty>,
    pub conds: Vec<CondArm>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CondArm {
    pub params: Vec<Ty>,
    pub choice: usize,
}

impl CondChoice {
    /// The return type matching `args`, or `None` — the caller turns that
    /// into `ImpossibleToGetReturnDataType`.
    pub fn lookup(&self, args: &[Ty]) -> Option<Ty> {
        self.conds
            .iter()
            .find(|arm| arm.params.len() == args.len() && arm.params.iter().eq(args.iter()))
            .and_then(|arm| self.choices.get(arm.choice).cloned())
    }
}

impl fmt::Display for TyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TyKind::Bool => write!(f, "Bool"),
            TyKind::Byte => write!(f, "Byte"),
            TyKind::Char => write!(f, "Char"),
            TyKind::Int8 => write!(f, "Int8"),
            TyKind::Int16 => write!(f, "Int16"),
            TyKind::Int32 => write!(f, "Int32"),
            TyKind::Int64 => write!(f, "Int64"),
            TyKind::Isize => write!(f, "Isize"),
            TyKind::Uint8 => write!(f, "Uint8"),
            TyKind::Uint16 => write!(f, "Uint16"),
            TyKind::Uint32 => write!(f, "Uint32"),
            TyKind::Uint64 => write!(f, "Uint64"),
            TyKind::Usize => write!(f, "Usize"),
            TyKind::Float32 => write!(f, "Float32"),
            TyKind::Float64 => write!(f, "Float64"),
            TyKind::Unit => write!(f, "Unit"),
            TyKind::Never => write!(f, "Never"),
            TyKind::Any => write!(f, "Any"),
            TyKind::CChar => write!(f, "CChar"),
            TyKind::CShort => write!(f, "CShort"),
            TyKind::CInt => write!(f, "CInt"),
            TyKind::CLong => write!(f, "CLong"),
            TyKind::CLongLong => write!(f, "CLongLong"),
            TyKind::CFloat => write!(f, "CFloat"),
            TyKind::CDouble => write!(f, "CDouble"),
            TyKind::CVoid => write!(f, "CVoid"),
            TyKind::SizedArray(size, inner) => write!(f, "[{size}]{inner}"),
            TyKind::UnsizedArray(inner) => write!(f, "[?]{inner}"),
            TyKind::DynamicArray(inner) => write!(f, "[*]{inner}"),
            TyKind::List(inner) => write!(f, "List {inner}"),
            TyKind::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            TyKind::Optional(inner) => write!(f, "?{inner}"),
            TyKind::Result { ok, errs } => {
                write!(f, "{ok}!")?;
                for (i, err) in errs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
            TyKind::Str(Some(len)) => write!(f, "Str({len})"),
            TyKind::Str(None) => write!(f, "Str"),
            TyKind::Bytes(Some(len)) => write!(f, "Bytes({len})"),
            TyKind::Bytes(None) => write!(f, "Bytes"),
            TyKind::CStr => write!(f, "CStr"),
            TyKind::Ptr(inner) => write!(f, "*{inner}"),
            TyKind::PtrMut(inner) => write!(f, "*mut {inner}"),
            TyKind::Ref(inner) => write!(f, "&{inner}"),
            TyKind::RefMut(inner) => write!(f, "&mut {inner}"),
            TyKind::Trace(inner) => write!(f, "trace {inner}"),
            TyKind::TraceMut(inner) => write!(f, "trace mut {inner}"),
            TyKind::Mut(inner) => write!(f, "mut {inner}"),
            TyKind::Custom(custom) => {
                write!(f, "{}", custom.global_name)?;
                if let Some(generics) = &custom.generics {
                    write!(f, "[")?;
                    for (i, generic) in generics.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{generic}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            TyKind::CompilerGeneric(name) => write!(f, "@{name}"),
            TyKind::CompilerChoice(items) => {
                write!(f, "choice{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            TyKind::ConditionalCompilerChoice(choice) => {
                write!(f, "cond-choice{{")?;
                for (i, item) in choice.choices.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            TyKind::Unknown => write!(f, "<unknown>"),
            TyKind::Lambda { params, ret } => {
                write!(f, "fun(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {ret}")
            }
        }
    }
}
