use lily_span::{FileId, Location, ScopeId};
use pretty_assertions::assert_eq;

use super::*;

fn custom(name: &str, kind: CustomKind, generics: Option<Vec<Ty>>) -> Ty {
    Ty::new(TyKind::Custom(CustomTy {
        scope_id: ScopeId(1),
        access_scope_id: ScopeId(1),
        name: name.to_owned(),
        global_name: format!("main.{name}"),
        generics,
        kind,
        is_recursive: false,
    }))
}

fn generic(name: &str) -> Ty {
    custom(name, CustomKind::Generic, None)
}

#[test]
fn clone_is_structurally_equal() {
    let tys = [
        Ty::new(TyKind::Int32),
        Ty::new(TyKind::SizedArray(4, Ty::new(TyKind::Bool))),
        Ty::new(TyKind::Tuple(vec![
            Ty::new(TyKind::Str(None)),
            Ty::new(TyKind::Optional(Ty::new(TyKind::Float64))),
        ])),
        custom("Color", CustomKind::Enum, None),
        Ty::new(TyKind::CompilerGeneric("T0".to_owned())),
    ];
    for ty in tys {
        assert_eq!(ty.clone(), ty);
    }
}

#[test]
fn equality_ignores_location() {
    let location = Location::new(FileId(0), 1, 1, 1, 5, 0, 4);
    let with = Ty::with_location(TyKind::Int32, location);
    let without = Ty::new(TyKind::Int32);
    assert_eq!(with, without);
}

#[test]
fn clone_shares_the_cell() {
    let ty = Ty::new(TyKind::Unknown);
    let alias = ty.clone();
    alias.update(TyKind::Int64).unwrap();
    assert!(matches!(&*ty.kind(), TyKind::Int64));
}

#[test]
fn update_after_lock_is_rejected() {
    let ty = Ty::new(TyKind::Unknown);
    ty.lock();
    assert_eq!(ty.update(TyKind::Int32), Err(LockedTy));
}

#[test]
fn lock_reaches_nested_types() {
    let elem = Ty::new(TyKind::Unknown);
    let array = Ty::new(TyKind::SizedArray(2, elem.clone()));
    array.lock();
    assert!(elem.is_locked());
    assert_eq!(elem.update(TyKind::Bool), Err(LockedTy));
}

#[test]
fn guarantees_look_through_mut() {
    let ty = Ty::new(TyKind::Mut(Ty::new(TyKind::Uint16)));
    assert!(ty.is_guaranteed(Guarantee::Integer));
    assert!(ty.is_guaranteed(Guarantee::UnsignedInteger));
    assert!(!ty.is_guaranteed(Guarantee::SignedInteger));
    assert!(!ty.is_guaranteed(Guarantee::Float));
}

#[test]
fn direct_custom_strips_indirections() {
    let inner = custom("Node", CustomKind::Record, None);
    let wrapped = Ty::new(TyKind::Ptr(Ty::new(TyKind::Mut(inner))));
    let found = wrapped.direct_custom().unwrap();
    assert_eq!(found.global_name, "main.Node");

    assert!(Ty::new(TyKind::Int32).direct_custom().is_none());
}

#[test]
fn contains_generic_finds_deep_leaves() {
    let deep = Ty::new(TyKind::List(Ty::new(TyKind::Tuple(vec![
        Ty::new(TyKind::Bool),
        Ty::new(TyKind::Optional(Ty::new(TyKind::CompilerGeneric("T0".to_owned())))),
    ]))));
    assert!(deep.contains_generic());
    assert!(!Ty::new(TyKind::List(Ty::new(TyKind::Bool))).contains_generic());
    assert!(Ty::new(TyKind::Unknown).contains_generic());

    let applied = custom("Vec", CustomKind::Record, Some(vec![generic("T")]));
    assert!(applied.contains_generic());
}

#[test]
fn resolve_generic_substitutes_named_leaves() {
    let mut map = GenericMap::new();
    map.insert("T".to_owned(), Ty::new(TyKind::Int32));

    let ty = Ty::new(TyKind::List(generic("T")));
    let resolved = ty.resolve_generic(&map);
    assert_eq!(resolved, Ty::new(TyKind::List(Ty::new(TyKind::Int32))));
    // The source is untouched.
    assert!(ty.contains_generic());
}

#[test]
fn resolve_generic_composition_law() {
    // resolve(resolve(t, m1), m2) == resolve(t, compose(m2, m1))
    let mut m1 = GenericMap::new();
    m1.insert("T".to_owned(), Ty::new(TyKind::List(generic("U"))));
    let mut m2 = GenericMap::new();
    m2.insert("U".to_owned(), Ty::new(TyKind::Bool));

    let ty = Ty::new(TyKind::Tuple(vec![generic("T"), generic("U")]));

    let sequential = ty.resolve_generic(&m1).resolve_generic(&m2);
    let composed = ty.resolve_generic(&compose_generic_maps(&m2, &m1));
    assert_eq!(sequential, composed);
}

#[test]
fn cond_choice_dispatches_on_argument_types() {
    let i32_ty = Ty::new(TyKind::Int32);
    let i64_ty = Ty::new(TyKind::Int64);
    let choice = CondChoice {
        choices: vec![i32_ty.clone(), i64_ty.clone()],
        conds: vec![
            CondArm {
                params: vec![i32_ty.clone(), i32_ty.clone()],
                choice: 0,
            },
            CondArm {
                params: vec![i64_ty.clone(), i64_ty.clone()],
                choice: 1,
            },
        ],
    };

    assert_eq!(choice.lookup(&[i32_ty.clone(), i32_ty.clone()]), Some(i32_ty.clone()));
    assert_eq!(choice.lookup(&[i64_ty.clone(), i64_ty.clone()]), Some(i64_ty.clone()));
    assert_eq!(choice.lookup(&[i32_ty.clone(), i64_ty.clone()]), None);
    assert_eq!(choice.lookup(&[i32_ty]), None);
}

#[test]
fn int_literal_fitting() {
    assert!(TyKind::Int8.fits_int(127));
    assert!(!TyKind::Int8.fits_int(200));
    assert!(TyKind::Uint8.fits_int(200));
    assert!(!TyKind::Uint8.fits_int(-1));
    assert!(TyKind::Int32.fits_int(i32::MAX as i128));
    assert!(!TyKind::Int32.fits_int(i32::MAX as i128 + 1));
    assert!(!TyKind::Bool.fits_int(0));
}

#[test]
fn serial_names_are_whitespace_free_and_stable() {
    let ty = Ty::new(TyKind::List(Ty::new(TyKind::Tuple(vec![
        Ty::new(TyKind::Int32),
        Ty::new(TyKind::Str(None)),
    ]))));
    assert_eq!(ty.serial_name(), "List(Int32,Str)");

    let applied = custom("Pair", CustomKind::Record, Some(vec![Ty::new(TyKind::Bool)]));
    assert_eq!(applied.serial_name(), "main.Pair[Bool]");
}
