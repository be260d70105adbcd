//! Signatures created during monomorphization.
//!
//! A function signature is its param types plus return type; a type
//! signature is the type's global name plus its generic-argument map. Both
//! deduplicate on a deterministic serialized name, so equal maps mean equal
//! signatures and the registry rejects the second copy.

use itertools::Itertools;
use lily_ty::{GenericMap, Ty};

#[derive(Clone, Debug, PartialEq)]
pub struct FunSignature {
    pub global_name: String,
    /// Param types followed by the return type.
    pub types: Vec<Ty>,
    pub generic_map: Option<GenericMap>,
    pub serial_name: String,
}

impl FunSignature {
    pub fn new(global_name: impl Into<String>, types: Vec<Ty>, generic_map: Option<GenericMap>) -> Self {
        let global_name = global_name.into();
        let serial_name = serialize_signature_name(&global_name, &types);
        FunSignature {
            global_name,
            types,
            generic_map,
            serial_name,
        }
    }

    pub fn return_ty(&self) -> &Ty {
        self.types.last().expect("signature holds at least the return type")
    }

    pub fn param_tys(&self) -> &[Ty] {
        &self.types[..self.types.len() - 1]
    }

    /// A signature with no bound generics: the declaration's original one.
    pub fn is_original(&self) -> bool {
        self.generic_map.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSignature {
    pub global_name: String,
    pub generic_map: GenericMap,
    pub serial_name: String,
}

impl TypeSignature {
    pub fn new(global_name: impl Into<String>, generic_map: GenericMap) -> Self {
        let global_name = global_name.into();
        let types: Vec<Ty> = generic_map.values().cloned().collect();
        let serial_name = serialize_signature_name(&global_name, &types);
        TypeSignature {
            global_name,
            generic_map,
            serial_name,
        }
    }
}

/// `"<global>__<arg1>_<arg2>…"`; just `<global>` when there are no types.
pub fn serialize_signature_name(global_name: &str, types: &[Ty]) -> String {
    if types.is_empty() {
        return global_name.to_owned();
    }
    format!(
        "{global_name}__{}",
        types.iter().map(Ty::serial_name).join("_")
    )
}

/// Append `signature` unless one with the same serialized name is present.
/// Returns whether it was added; `false` tells the caller to reuse.
pub fn add_fun_signature(signatures: &mut Vec<FunSignature>, signature: FunSignature) -> bool {
    if signatures
        .iter()
        .any(|existing| existing.serial_name == signature.serial_name)
    {
        return false;
    }
    log::debug!("add fun signature `{}`", signature.serial_name);
    signatures.push(signature);
    true
}

pub fn add_type_signature(signatures: &mut Vec<TypeSignature>, signature: TypeSignature) -> bool {
    if signatures
        .iter()
        .any(|existing| existing.serial_name == signature.serial_name)
    {
        return false;
    }
    log::debug!("add type signature `{}`", signature.serial_name);
    signatures.push(signature);
    true
}

#[cfg(test)]
mod tests {
    use lily_ty::TyKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serialized_names_are_deterministic() {
        let types = vec![Ty::new(TyKind::Int32), Ty::new(TyKind::Str(None)), Ty::new(TyKind::Unit)];
        assert_eq!(
            serialize_signature_name("main.add", &types),
            "main.add__Int32_Str_Unit"
        );
        assert_eq!(serialize_signature_name("main.add", &[]), "main.add");
    }

    #[test]
    fn duplicate_fun_signatures_are_rejected() {
        let mut signatures = Vec::new();
        let first = FunSignature::new(
            "main.id",
            vec![Ty::new(TyKind::Int32), Ty::new(TyKind::Int32)],
            None,
        );
        assert!(add_fun_signature(&mut signatures, first.clone()));
        assert!(!add_fun_signature(&mut signatures, first));
        assert_eq!(signatures.len(), 1);
        assert!(signatures[0].is_original());
    }

    #[test]
    fn equal_generic_maps_mean_equal_type_signatures() {
        let mut map_a = GenericMap::new();
        map_a.insert("T".to_owned(), Ty::new(TyKind::Bool));
        let mut map_b = GenericMap::new();
        map_b.insert("T".to_owned(), Ty::new(TyKind::Bool));

        let mut signatures = Vec::new();
        assert!(add_type_signature(
            &mut signatures,
            TypeSignature::new("main.Vec", map_a)
        ));
        assert!(!add_type_signature(
            &mut signatures,
            TypeSignature::new("main.Vec", map_b)
        ));
        assert_eq!(signatures.len(), 1);
    }

    #[test]
    fn signature_type_accessors() {
        let signature = FunSignature::new(
            "main.f",
            vec![
                Ty::new(TyKind::Int8),
                Ty::new(TyKind::Bool),
                Ty::new(TyKind::Unit),
            ],
            None,
        );
        assert_eq!(signature.param_tys().len(), 2);
        assert_eq!(signature.return_ty(), &Ty::new(TyKind::Unit));
    }
}
