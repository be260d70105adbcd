//! The analyzer diagnostic taxonomy.

use std::fmt;

/// Every error the analyzer can emit. One variant per user-facing failure;
/// the analyzer recovers locally after each of these and keeps checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownIdentifier(String),

    // Duplicate declarations, one per container kind.
    DuplicateConstant,
    DuplicateFun,
    DuplicateModule,
    DuplicateAlias,
    DuplicateRecord,
    DuplicateEnum,
    DuplicateError,
    DuplicateClass,
    DuplicateTrait,
    DuplicateRecordObject,
    DuplicateEnumObject,
    DuplicateVariant,
    DuplicateGenericParam,
    DuplicateParamName,
    DuplicateVariable,
    DuplicateField,
    DuplicateCase,
    DuplicateOperator,

    DataTypeDontMatch,
    DataTypeDontMatchWithInferred,
    ExpectedBooleanExpression,
    ExpectedDataType,
    ExpectedMutableVariable,
    ExpectedCustomDataType,
    ExpectedFunCall,
    ExpectedMethodParent,
    ExpectedObjectDeclAsParent,
    ExpectedAssignableExpression,

    TooManyParams,
    NumberOfParamsMismatched,
    NumberOfGenericParamsMismatched,
    AliasGenericParamsMismatch,

    ImportBuiltinRequired,
    ImportSysRequired,
    BadBuiltinFunction,
    BadSysFunction,

    MainFunctionIsNotCallable,
    MainFunctionCannotBeRecursive,
    ExpectedMainFunction,
    NoExplicitParamsExpectedInMain,
    ThisReturnDataTypeIsNotExpectedForAMainFunction,
    GenericParamsNotExpectedInMain,

    OperatorIsNotValid,
    OperatorMustHaveReturnDataType,
    OperatorCannotHaveCompilerDefinedDataTypeAsParameter,

    ComptimeCastOverflow,
    InfiniteDataType,
    FieldIsNotFound,
    VariantIsNotFound,
    NonExhaustivePatterns,
    ExpectedSizedArrayWithTheSameSize,
    ImpossibleToGetReturnDataType,

    BreakIsNotExpectedInThisContext,
    NextIsNotExpectedInThisContext,
    ReturnIsNotExpectedInThisContext,

    DataTypeCannotBeDropped,
    ThisKindOfExprIsNotAllowedToDrop,

    CannotCastToAnyInSafeMode,
    CannotUseAnyInSafeMode,
    BadLiteralCast,
    UnknownCast,
    CastWithSameDataType,

    /// A construct this analyzer deliberately refuses instead of guessing
    /// (enum-object patterns, class attribute access, trait impls, lambda
    /// types, async, property-init, error-pattern lowering).
    Unsupported(&'static str),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIdentifier(name) => write!(f, "unknown identifier `{name}`"),
            Self::DuplicateConstant => write!(f, "duplicate constant"),
            Self::DuplicateFun => write!(f, "duplicate function"),
            Self::DuplicateModule => write!(f, "duplicate module"),
            Self::DuplicateAlias => write!(f, "duplicate alias"),
            Self::DuplicateRecord => write!(f, "duplicate record"),
            Self::DuplicateEnum => write!(f, "duplicate enum"),
            Self::DuplicateError => write!(f, "duplicate error"),
            Self::DuplicateClass => write!(f, "duplicate class"),
            Self::DuplicateTrait => write!(f, "duplicate trait"),
            Self::DuplicateRecordObject => write!(f, "duplicate record object"),
            Self::DuplicateEnumObject => write!(f, "duplicate enum object"),
            Self::DuplicateVariant => write!(f, "duplicate variant"),
            Self::DuplicateGenericParam => write!(f, "duplicate generic param"),
            Self::DuplicateParamName => write!(f, "duplicate param name"),
            Self::DuplicateVariable => write!(f, "duplicate variable"),
            Self::DuplicateField => write!(f, "duplicate field"),
            Self::DuplicateCase => write!(f, "duplicate case"),
            Self::DuplicateOperator => write!(f, "duplicate operator"),
            Self::DataTypeDontMatch => write!(f, "data types don't match"),
            Self::DataTypeDontMatchWithInferred => {
                write!(f, "data type doesn't match with inferred data type")
            }
            Self::ExpectedBooleanExpression => write!(f, "expected boolean expression"),
            Self::ExpectedDataType => write!(f, "expected data type"),
            Self::ExpectedMutableVariable => write!(f, "expected mutable variable"),
            Self::ExpectedCustomDataType => write!(f, "expected custom data type"),
            Self::ExpectedFunCall => write!(f, "expected fun call"),
            Self::ExpectedMethodParent => write!(f, "expected method parent"),
            Self::ExpectedObjectDeclAsParent => write!(f, "expected object declaration as parent"),
            Self::ExpectedAssignableExpression => write!(f, "expected assignable expression"),
            Self::TooManyParams => write!(f, "too many params"),
            Self::NumberOfParamsMismatched => write!(f, "number of params mismatched"),
            Self::NumberOfGenericParamsMismatched => {
                write!(f, "number of generic params mismatched")
            }
            Self::AliasGenericParamsMismatch => {
                write!(f, "generic params of the alias don't match the aliased data type")
            }
            Self::ImportBuiltinRequired => write!(f, "import of `@builtin` is required"),
            Self::ImportSysRequired => write!(f, "import of `@sys` is required"),
            Self::BadBuiltinFunction => write!(f, "bad builtin function"),
            Self::BadSysFunction => write!(f, "bad sys function"),
            Self::MainFunctionIsNotCallable => write!(f, "the `main` function is not callable"),
            Self::MainFunctionCannotBeRecursive => {
                write!(f, "the `main` function cannot be recursive")
            }
            Self::ExpectedMainFunction => write!(f, "expected `main` function"),
            Self::NoExplicitParamsExpectedInMain => {
                write!(f, "no explicit params are expected in the `main` function")
            }
            Self::ThisReturnDataTypeIsNotExpectedForAMainFunction => {
                write!(f, "this return data type is not expected for a `main` function")
            }
            Self::GenericParamsNotExpectedInMain => {
                write!(f, "generic params are not expected in the `main` function")
            }
            Self::OperatorIsNotValid => write!(f, "the operator is not valid"),
            Self::OperatorMustHaveReturnDataType => {
                write!(f, "an operator must have a return data type")
            }
            Self::OperatorCannotHaveCompilerDefinedDataTypeAsParameter => write!(
                f,
                "an operator cannot have a compiler defined data type as parameter"
            ),
            Self::ComptimeCastOverflow => write!(f, "comptime cast overflow"),
            Self::InfiniteDataType => write!(f, "infinite data type"),
            Self::FieldIsNotFound => write!(f, "the field is not found"),
            Self::VariantIsNotFound => write!(f, "the variant is not found"),
            Self::NonExhaustivePatterns => write!(f, "non exhaustive patterns"),
            Self::ExpectedSizedArrayWithTheSameSize => {
                write!(f, "expected sized array with the same size")
            }
            Self::ImpossibleToGetReturnDataType => {
                write!(f, "impossible to get the return data type")
            }
            Self::BreakIsNotExpectedInThisContext => {
                write!(f, "`break` is not expected in this context")
            }
            Self::NextIsNotExpectedInThisContext => {
                write!(f, "`next` is not expected in this context")
            }
            Self::ReturnIsNotExpectedInThisContext => {
                write!(f, "`return` is not expected in this context")
            }
            Self::DataTypeCannotBeDropped => write!(f, "this data type cannot be dropped"),
            Self::ThisKindOfExprIsNotAllowedToDrop => {
                write!(f, "this kind of expression is not allowed to drop")
            }
            Self::CannotCastToAnyInSafeMode => write!(f, "cannot cast to `Any` in safe mode"),
            Self::CannotUseAnyInSafeMode => write!(f, "cannot use `Any` in safe mode"),
            Self::BadLiteralCast => write!(f, "bad literal cast"),
            Self::UnknownCast => write!(f, "unknown cast"),
            Self::CastWithSameDataType => write!(f, "cast between identical data types"),
            Self::Unsupported(what) => write!(f, "`{what}` is not yet supported"),
        }
    }
}

/// Non-fatal findings. Warnings never contribute to the error counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    UnreachableCode,
    UnusedExpression,
    UnusedCase,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreachableCode => write!(f, "unreachable code"),
            Self::UnusedExpression => write!(f, "unused expression"),
            Self::UnusedCase => write!(f, "unused case"),
        }
    }
}
