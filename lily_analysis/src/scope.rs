//! The scope graph: a tree of lexical scopes with typed containers.
//!
//! Scopes live in an arena and refer to each other by [`ScopeId`];
//! declarations are referenced by [`DeclId`]. Insertion detects duplicates
//! per container kind; resolution walks the parent chain and answers with a
//! tagged [`SearchResponse`] whose single not-found variant keeps callers
//! honest.

use bitflags::bitflags;
use indexmap::IndexMap;
use lily_span::{DeclId, Location, ScopeId};
use lily_ty::Ty;
use std::rc::Rc;

use crate::checked::CheckedStmt;

/// What kind of construct owns a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeTag {
    Package,
    Module(DeclId),
    Constant(DeclId),
    Fun(DeclId),
    Record(DeclId),
    Enum(DeclId),
    Alias(DeclId),
    Error(DeclId),
    Class(DeclId),
    Trait(DeclId),
    RecordObject(DeclId),
    EnumObject(DeclId),
    Block,
    If,
    Else,
    While,
    For,
    MatchCase,
    Try,
    Catch,
    Unsafe,
    Defer,
}

impl ScopeTag {
    /// Block-like scopes forward `has_return` and safety to their parent.
    pub fn is_block_like(self) -> bool {
        matches!(
            self,
            ScopeTag::Block
                | ScopeTag::If
                | ScopeTag::Else
                | ScopeTag::While
                | ScopeTag::For
                | ScopeTag::MatchCase
                | ScopeTag::Try
                | ScopeTag::Catch
                | ScopeTag::Unsafe
                | ScopeTag::Defer
        )
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ScopeFlags: u8 {
        const HAS_RETURN = 1 << 0;
        const IS_UNSAFE = 1 << 1;
        const IN_LOOP = 1 << 2;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableEntry {
    pub ty: Ty,
    pub mutable: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamEntry {
    pub index: usize,
    pub ty: Ty,
    pub mutable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericEntry {
    pub index: usize,
    pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantEntry {
    pub enum_decl: DeclId,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CapturedVariable {
    pub ty: Ty,
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub tag: ScopeTag,
    pub flags: ScopeFlags,

    pub constants: IndexMap<String, DeclId>,
    pub funs: IndexMap<String, DeclId>,
    pub records: IndexMap<String, DeclId>,
    pub enums: IndexMap<String, DeclId>,
    pub aliases: IndexMap<String, DeclId>,
    pub errors: IndexMap<String, DeclId>,
    pub classes: IndexMap<String, DeclId>,
    pub traits: IndexMap<String, DeclId>,
    pub record_objects: IndexMap<String, DeclId>,
    pub enum_objects: IndexMap<String, DeclId>,
    pub modules: IndexMap<String, DeclId>,
    pub variants: IndexMap<String, VariantEntry>,
    pub generics: IndexMap<String, GenericEntry>,
    pub captured_variables: IndexMap<String, CapturedVariable>,
    pub fun_params: IndexMap<String, ParamEntry>,
    pub variables: IndexMap<String, VariableEntry>,

    /// Error types observed inside a `try` scope.
    pub raises: Option<Vec<Ty>>,
    /// Binding installed by `catch name`.
    pub catch_name: Option<String>,
    /// Buffered `defer` bodies, dumped at every exit point.
    pub deferred: Vec<Rc<CheckedStmt>>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>, tag: ScopeTag) -> Self {
        Scope {
            id,
            parent,
            tag,
            flags: ScopeFlags::default(),
            constants: IndexMap::new(),
            funs: IndexMap::new(),
            records: IndexMap::new(),
            enums: IndexMap::new(),
            aliases: IndexMap::new(),
            errors: IndexMap::new(),
            classes: IndexMap::new(),
            traits: IndexMap::new(),
            record_objects: IndexMap::new(),
            enum_objects: IndexMap::new(),
            modules: IndexMap::new(),
            variants: IndexMap::new(),
            generics: IndexMap::new(),
            captured_variables: IndexMap::new(),
            fun_params: IndexMap::new(),
            variables: IndexMap::new(),
            raises: None,
            catch_name: None,
            deferred: Vec::new(),
        }
    }
}

/// The insertion already exists in this scope's container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlreadyDefined;

/// The answer of a scope search. One variant per container kind plus a
/// single not-found.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResponse {
    NotFound,
    Variable {
        scope: ScopeId,
        ty: Ty,
        mutable: bool,
    },
    Param {
        scope: ScopeId,
        index: usize,
        ty: Ty,
        mutable: bool,
    },
    CapturedVariable {
        scope: ScopeId,
        ty: Ty,
    },
    Constant {
        decl: DeclId,
    },
    Fun {
        decl: DeclId,
    },
    Record {
        decl: DeclId,
    },
    Enum {
        decl: DeclId,
    },
    Alias {
        decl: DeclId,
    },
    Error {
        decl: DeclId,
    },
    Class {
        decl: DeclId,
    },
    Trait {
        decl: DeclId,
    },
    RecordObject {
        decl: DeclId,
    },
    EnumObject {
        decl: DeclId,
    },
    Module {
        decl: DeclId,
    },
    Variant {
        enum_decl: DeclId,
        index: usize,
    },
    Generic {
        scope: ScopeId,
        ty: Ty,
    },
}

impl SearchResponse {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchResponse::NotFound)
    }
}

macro_rules! push_decl_container {
    ($($fn_name:ident => $container:ident),* $(,)?) => {
        $(
            pub fn $fn_name(
                &mut self,
                scope: ScopeId,
                name: &str,
                decl: DeclId,
            ) -> Result<(), AlreadyDefined> {
                let scope = self.get_mut(scope);
                if scope.$container.contains_key(name) {
                    return Err(AlreadyDefined);
                }
                scope.$container.insert(name.to_owned(), decl);
                Ok(())
            }
        )*
    };
}

macro_rules! search_decl_container {
    ($($fn_name:ident => $container:ident, $variant:ident),* $(,)?) => {
        $(
            pub fn $fn_name(&self, scope: ScopeId, name: &str) -> SearchResponse {
                let mut current = Some(scope);
                while let Some(id) = current {
                    let scope = self.get(id);
                    if let Some(&decl) = scope.$container.get(name) {
                        return SearchResponse::$variant { decl };
                    }
                    current = scope.parent;
                }
                SearchResponse::NotFound
            }
        )*
    };
}

/// The arena owning every scope of an analysis run. Ids are handed out
/// monotonically.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena::default()
    }

    pub fn alloc(&mut self, parent: Option<ScopeId>, tag: ScopeTag) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("scope arena overflow"));
        let mut scope = Scope::new(id, parent, tag);
        // Unsafe blocks inherit into children lazily through `is_unsafe`,
        // loops through IN_LOOP.
        if let Some(parent) = parent {
            let parent_flags = self.get(parent).flags;
            scope.flags |=
                parent_flags & (ScopeFlags::IS_UNSAFE | ScopeFlags::IN_LOOP);
        }
        if tag == ScopeTag::Unsafe {
            scope.flags |= ScopeFlags::IS_UNSAFE;
        }
        if matches!(tag, ScopeTag::While | ScopeTag::For) {
            scope.flags |= ScopeFlags::IN_LOOP;
        }
        self.scopes.push(scope);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    // -- insertion -----------------------------------------------------

    push_decl_container! {
        push_constant => constants,
        push_fun => funs,
        push_record => records,
        push_enum => enums,
        push_alias => aliases,
        push_error => errors,
        push_class => classes,
        push_trait => traits,
        push_record_object => record_objects,
        push_enum_object => enum_objects,
        push_module => modules,
    }

    pub fn push_variant(
        &mut self,
        scope: ScopeId,
        name: &str,
        entry: VariantEntry,
    ) -> Result<(), AlreadyDefined> {
        let scope = self.get_mut(scope);
        if scope.variants.contains_key(name) {
            return Err(AlreadyDefined);
        }
        scope.variants.insert(name.to_owned(), entry);
        Ok(())
    }

    pub fn push_generic(
        &mut self,
        scope: ScopeId,
        name: &str,
        entry: GenericEntry,
    ) -> Result<(), AlreadyDefined> {
        let scope = self.get_mut(scope);
        if scope.generics.contains_key(name) {
            return Err(AlreadyDefined);
        }
        scope.generics.insert(name.to_owned(), entry);
        Ok(())
    }

    pub fn push_fun_param(
        &mut self,
        scope: ScopeId,
        name: &str,
        entry: ParamEntry,
    ) -> Result<(), AlreadyDefined> {
        let scope = self.get_mut(scope);
        if scope.fun_params.contains_key(name) {
            return Err(AlreadyDefined);
        }
        scope.fun_params.insert(name.to_owned(), entry);
        Ok(())
    }

    pub fn push_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        entry: VariableEntry,
    ) -> Result<(), AlreadyDefined> {
        let scope = self.get_mut(scope);
        if scope.variables.contains_key(name) {
            return Err(AlreadyDefined);
        }
        scope.variables.insert(name.to_owned(), entry);
        Ok(())
    }

    /// Used by `for` captures, match captures and `catch` bindings.
    /// Shadowing an outer capture is allowed; a duplicate within the same
    /// scope is not.
    pub fn add_captured_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        entry: CapturedVariable,
    ) -> Result<(), AlreadyDefined> {
        let scope = self.get_mut(scope);
        if scope.captured_variables.contains_key(name) {
            return Err(AlreadyDefined);
        }
        scope.captured_variables.insert(name.to_owned(), entry);
        Ok(())
    }

    pub fn set_catch_name(&mut self, scope: ScopeId, name: &str, ty: Ty) {
        let scope = self.get_mut(scope);
        scope.catch_name = Some(name.to_owned());
        scope
            .captured_variables
            .insert(name.to_owned(), CapturedVariable { ty });
    }

    pub fn add_raise(&mut self, scope: ScopeId, ty: Ty) {
        let scope = self.get_mut(scope);
        scope.raises.get_or_insert_with(Vec::new).push(ty);
    }

    pub fn push_deferred(&mut self, scope: ScopeId, stmt: Rc<CheckedStmt>) {
        self.get_mut(scope).deferred.push(stmt);
    }

    /// This scope unconditionally returns; propagate up through block-like
    /// parents.
    pub fn set_has_return(&mut self, scope: ScopeId) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get_mut(id);
            scope.flags |= ScopeFlags::HAS_RETURN;
            if !scope.tag.is_block_like() {
                break;
            }
            current = scope.parent;
        }
    }

    pub fn has_return(&self, scope: ScopeId) -> bool {
        self.get(scope).flags.contains(ScopeFlags::HAS_RETURN)
    }

    pub fn is_unsafe(&self, scope: ScopeId) -> bool {
        self.get(scope).flags.contains(ScopeFlags::IS_UNSAFE)
    }

    pub fn in_loop(&self, scope: ScopeId) -> bool {
        self.get(scope).flags.contains(ScopeFlags::IN_LOOP)
    }

    // -- search --------------------------------------------------------

    search_decl_container! {
        search_constant => constants, Constant,
        search_fun => funs, Fun,
        search_record => records, Record,
        search_enum => enums, Enum,
        search_alias => aliases, Alias,
        search_error => errors, Error,
        search_class => classes, Class,
        search_trait => traits, Trait,
        search_record_object => record_objects, RecordObject,
        search_enum_object => enum_objects, EnumObject,
        search_module => modules, Module,
    }

    pub fn search_variant(&self, scope: ScopeId, name: &str) -> SearchResponse {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(entry) = scope.variants.get(name) {
                return SearchResponse::Variant {
                    enum_decl: entry.enum_decl,
                    index: entry.index,
                };
            }
            current = scope.parent;
        }
        SearchResponse::NotFound
    }

    pub fn search_generic(&self, scope: ScopeId, name: &str) -> SearchResponse {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(entry) = scope.generics.get(name) {
                return SearchResponse::Generic {
                    scope: id,
                    ty: entry.ty.clone(),
                };
            }
            current = scope.parent;
        }
        SearchResponse::NotFound
    }

    pub fn search_variable(&self, scope: ScopeId, name: &str) -> SearchResponse {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(entry) = scope.variables.get(name) {
                return SearchResponse::Variable {
                    scope: id,
                    ty: entry.ty.clone(),
                    mutable: entry.mutable,
                };
            }
            if let Some(entry) = scope.captured_variables.get(name) {
                return SearchResponse::CapturedVariable {
                    scope: id,
                    ty: entry.ty.clone(),
                };
            }
            if let Some(entry) = scope.fun_params.get(name) {
                return SearchResponse::Param {
                    scope: id,
                    index: entry.index,
                    ty: entry.ty.clone(),
                    mutable: entry.mutable,
                };
            }
            current = scope.parent;
        }
        SearchResponse::NotFound
    }

    /// Unified lookup: the first container matching the name, nearest scope
    /// first.
    pub fn search_identifier(&self, scope: ScopeId, name: &str) -> SearchResponse {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(entry) = scope.variables.get(name) {
                return SearchResponse::Variable {
                    scope: id,
                    ty: entry.ty.clone(),
                    mutable: entry.mutable,
                };
            }
            if let Some(entry) = scope.captured_variables.get(name) {
                return SearchResponse::CapturedVariable {
                    scope: id,
                    ty: entry.ty.clone(),
                };
            }
            if let Some(entry) = scope.fun_params.get(name) {
                return SearchResponse::Param {
                    scope: id,
                    index: entry.index,
                    ty: entry.ty.clone(),
                    mutable: entry.mutable,
                };
            }
            if let Some(&decl) = scope.constants.get(name) {
                return SearchResponse::Constant { decl };
            }
            if let Some(&decl) = scope.funs.get(name) {
                return SearchResponse::Fun { decl };
            }
            if let Some(entry) = scope.variants.get(name) {
                return SearchResponse::Variant {
                    enum_decl: entry.enum_decl,
                    index: entry.index,
                };
            }
            if let Some(&decl) = scope.enums.get(name) {
                return SearchResponse::Enum { decl };
            }
            if let Some(&decl) = scope.records.get(name) {
                return SearchResponse::Record { decl };
            }
            if let Some(&decl) = scope.aliases.get(name) {
                return SearchResponse::Alias { decl };
            }
            if let Some(&decl) = scope.errors.get(name) {
                return SearchResponse::Error { decl };
            }
            if let Some(&decl) = scope.classes.get(name) {
                return SearchResponse::Class { decl };
            }
            if let Some(&decl) = scope.record_objects.get(name) {
                return SearchResponse::RecordObject { decl };
            }
            if let Some(&decl) = scope.enum_objects.get(name) {
                return SearchResponse::EnumObject { decl };
            }
            if let Some(&decl) = scope.traits.get(name) {
                return SearchResponse::Trait { decl };
            }
            if let Some(&decl) = scope.modules.get(name) {
                return SearchResponse::Module { decl };
            }
            if let Some(entry) = scope.generics.get(name) {
                return SearchResponse::Generic {
                    scope: id,
                    ty: entry.ty.clone(),
                };
            }
            current = scope.parent;
        }
        SearchResponse::NotFound
    }

    // -- climbing ------------------------------------------------------

    /// Nearest enclosing function declaration.
    pub fn get_current_fun(&self, scope: ScopeId) -> Option<DeclId> {
        self.climb(scope, |tag| match tag {
            ScopeTag::Fun(decl) => Some(decl),
            _ => None,
        })
    }

    /// Nearest enclosing function that itself sits inside an object
    /// declaration.
    pub fn get_current_method(&self, scope: ScopeId) -> Option<DeclId> {
        let fun = self.get_current_fun(scope)?;
        let fun_scope = self.climb_scope(scope, |tag| matches!(tag, ScopeTag::Fun(_)))?;
        let parent = self.get(fun_scope).parent?;
        self.get_current_object(parent).map(|_| fun)
    }

    /// Nearest enclosing object-like declaration.
    pub fn get_current_object(&self, scope: ScopeId) -> Option<DeclId> {
        self.climb(scope, |tag| match tag {
            ScopeTag::Class(decl)
            | ScopeTag::Trait(decl)
            | ScopeTag::RecordObject(decl)
            | ScopeTag::EnumObject(decl) => Some(decl),
            _ => None,
        })
    }

    /// Nearest enclosing `try` scope.
    pub fn get_current_try(&self, scope: ScopeId) -> Option<ScopeId> {
        self.climb_scope(scope, |tag| tag == ScopeTag::Try)
    }

    fn climb<T>(&self, scope: ScopeId, mut pick: impl FnMut(ScopeTag) -> Option<T>) -> Option<T> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(found) = pick(scope.tag) {
                return Some(found);
            }
            current = scope.parent;
        }
        None
    }

    fn climb_scope(
        &self,
        scope: ScopeId,
        mut pick: impl FnMut(ScopeTag) -> bool,
    ) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if pick(scope.tag) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use lily_ty::TyKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn arena_with_root() -> (ScopeArena, ScopeId) {
        let mut arena = ScopeArena::new();
        let root = arena.alloc(None, ScopeTag::Package);
        (arena, root)
    }

    #[test]
    fn ids_are_monotonic() {
        let (mut arena, root) = arena_with_root();
        let a = arena.alloc(Some(root), ScopeTag::Block);
        let b = arena.alloc(Some(root), ScopeTag::Block);
        assert_eq!(root, ScopeId(0));
        assert_eq!(a, ScopeId(1));
        assert_eq!(b, ScopeId(2));
    }

    #[test]
    fn duplicate_insertion_is_rejected_per_kind() {
        let (mut arena, root) = arena_with_root();
        assert_eq!(arena.push_constant(root, "PI", DeclId(0)), Ok(()));
        assert_eq!(arena.push_constant(root, "PI", DeclId(1)), Err(AlreadyDefined));
        // Other container kinds are unaffected by the constant entry.
        assert_eq!(arena.push_fun(root, "PI", DeclId(2)), Ok(()));
        // The first entry remains.
        assert_eq!(
            arena.search_constant(root, "PI"),
            SearchResponse::Constant { decl: DeclId(0) }
        );
        assert_eq!(arena.get(root).constants.len(), 1);
    }

    #[test]
    fn search_walks_the_parent_chain() {
        let (mut arena, root) = arena_with_root();
        let module = arena.alloc(Some(root), ScopeTag::Module(DeclId(0)));
        let fun = arena.alloc(Some(module), ScopeTag::Fun(DeclId(1)));
        let block = arena.alloc(Some(fun), ScopeTag::Block);

        arena.push_fun(module, "helper", DeclId(2)).unwrap();
        assert_eq!(
            arena.search_fun(block, "helper"),
            SearchResponse::Fun { decl: DeclId(2) }
        );
        assert!(arena.search_fun(block, "missing").is_not_found());
    }

    #[test]
    fn search_identifier_prefers_the_nearest_binding() {
        let (mut arena, root) = arena_with_root();
        let fun = arena.alloc(Some(root), ScopeTag::Fun(DeclId(0)));
        let block = arena.alloc(Some(fun), ScopeTag::Block);

        arena.push_constant(root, "x", DeclId(1)).unwrap();
        arena
            .push_fun_param(
                fun,
                "x",
                ParamEntry {
                    index: 0,
                    ty: Ty::new(TyKind::Int32),
                    mutable: false,
                },
            )
            .unwrap();
        arena
            .push_variable(
                block,
                "x",
                VariableEntry {
                    ty: Ty::new(TyKind::Bool),
                    mutable: true,
                    location: Location::DUMMY,
                },
            )
            .unwrap();

        match arena.search_identifier(block, "x") {
            SearchResponse::Variable { ty, mutable, .. } => {
                assert_eq!(ty, Ty::new(TyKind::Bool));
                assert!(mutable);
            }
            other => panic!("expected variable, got {other:?}"),
        }
        // From the function scope the parameter shadows the constant.
        match arena.search_identifier(fun, "x") {
            SearchResponse::Param { index: 0, .. } => {}
            other => panic!("expected param, got {other:?}"),
        }
    }

    #[test]
    fn has_return_propagates_through_block_like_scopes_only() {
        let (mut arena, root) = arena_with_root();
        let fun = arena.alloc(Some(root), ScopeTag::Fun(DeclId(0)));
        let if_scope = arena.alloc(Some(fun), ScopeTag::If);
        let block = arena.alloc(Some(if_scope), ScopeTag::Block);

        arena.set_has_return(block);
        assert!(arena.has_return(block));
        assert!(arena.has_return(if_scope));
        assert!(arena.has_return(fun));
        assert!(!arena.has_return(root));
    }

    #[test]
    fn unsafe_and_loop_flags_flow_into_children() {
        let (mut arena, root) = arena_with_root();
        let unsafe_scope = arena.alloc(Some(root), ScopeTag::Unsafe);
        let inner = arena.alloc(Some(unsafe_scope), ScopeTag::Block);
        assert!(arena.is_unsafe(inner));
        assert!(!arena.is_unsafe(root));

        let while_scope = arena.alloc(Some(root), ScopeTag::While);
        let body = arena.alloc(Some(while_scope), ScopeTag::Block);
        assert!(arena.in_loop(body));
        assert!(!arena.in_loop(root));
    }

    #[test]
    fn current_fun_and_object_climbing() {
        let (mut arena, root) = arena_with_root();
        let class = arena.alloc(Some(root), ScopeTag::Class(DeclId(3)));
        let method = arena.alloc(Some(class), ScopeTag::Fun(DeclId(4)));
        let block = arena.alloc(Some(method), ScopeTag::Block);

        assert_eq!(arena.get_current_fun(block), Some(DeclId(4)));
        assert_eq!(arena.get_current_object(block), Some(DeclId(3)));
        assert_eq!(arena.get_current_method(block), Some(DeclId(4)));
        assert_eq!(arena.get_current_method(root), None);
    }

    #[test]
    fn catch_name_binds_a_captured_variable() {
        let (mut arena, root) = arena_with_root();
        let catch = arena.alloc(Some(root), ScopeTag::Catch);
        arena.set_catch_name(catch, "e", Ty::new(TyKind::Unknown));
        match arena.search_variable(catch, "e") {
            SearchResponse::CapturedVariable { .. } => {}
            other => panic!("expected captured variable, got {other:?}"),
        }
    }
}
