//! Symbol registry for one analysis run.
//!
//! The [`Builder`] owns every registered [`SourceUnit`] together with the
//! type, function and namespace entities declared by them. Types and
//! functions are keyed by their case-insensitive qualified name; the
//! declared casing is kept for display.
//!
//! Deferred type references are resolved on read and memoized per
//! reference. Resolving a name freezes it: from then on no declaration
//! may introduce a new entity under that name, so whatever a consumer
//! observed stays valid.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use php_depend_parser::{FunctionDecl, MethodDecl, NodeId, RefId, SourceUnit, TypeDecl};
use php_depend_types::{
    normalize_name, split_qualified_name, TypeKind, GLOBAL_NAMESPACE, NAMESPACE_SEPARATOR,
};
use tracing::{debug, warn};

use crate::deferred::Deferred;
use crate::error::BuilderError;
use crate::methods::{EffectiveMethod, MethodOrigin, MethodTable};
use crate::traits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// Where an entity's declaration lives: a unit and the index of its
/// summary in that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationSite {
    pub unit: UnitId,
    pub index: usize,
}

/// Result of resolving a qualified type name.
///
/// Names that no registered file declares resolve to `Unknown`, which
/// consumers treat as a valid, empty type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolved {
    Type(TypeId),
    Unknown(String),
}

impl Resolved {
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Resolved::Type(id) => Some(*id),
            Resolved::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Resolved::Unknown(_))
    }
}

#[derive(Debug, Clone)]
pub struct TypeEntity {
    pub id: TypeId,
    pub kind: TypeKind,
    /// Qualified name as first declared.
    pub name: String,
    pub namespace: Option<NamespaceId>,
    /// `None` for types declared by name only.
    pub declaration: Option<DeclarationSite>,
}

impl TypeEntity {
    pub fn short_name(&self) -> &str {
        split_qualified_name(&self.name).1
    }
}

#[derive(Debug, Clone)]
pub struct FunctionEntity {
    pub id: FunctionId,
    pub name: String,
    pub namespace: Option<NamespaceId>,
    pub declaration: Option<DeclarationSite>,
}

impl FunctionEntity {
    pub fn short_name(&self) -> &str {
        split_qualified_name(&self.name).1
    }
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub id: NamespaceId,
    /// [`GLOBAL_NAMESPACE`] for declarations outside any namespace.
    pub name: String,
    types: Vec<TypeId>,
    functions: Vec<FunctionId>,
}

impl Namespace {
    pub fn types(&self) -> &[TypeId] {
        &self.types
    }

    pub fn functions(&self) -> &[FunctionId] {
        &self.functions
    }

    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_NAMESPACE
    }
}

struct UnitEntry {
    unit: SourceUnit,
    references: Vec<Deferred<Resolved>>,
}

#[derive(Default)]
pub struct Builder {
    types: Vec<TypeEntity>,
    type_index: HashMap<String, TypeId>,
    functions: Vec<FunctionEntity>,
    function_index: HashMap<String, FunctionId>,
    namespaces: Vec<Namespace>,
    namespace_index: HashMap<String, NamespaceId>,
    units: Vec<UnitEntry>,
    /// Normalized names observed by a resolution query.
    frozen: RefCell<HashSet<String>>,
    method_tables: RefCell<HashMap<TypeId, Arc<MethodTable>>>,
    /// Types whose method table is being built, for cycle detection.
    composing: RefCell<HashSet<TypeId>>,
    /// Set when a method table being built hit a type already on the
    /// composition stack. Such a table is partial unless built by the
    /// outermost query.
    cycle_hit: Cell<bool>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Declarations ────────────────────────────────────────────────

    /// Return the type registered under `name`, creating it if needed.
    ///
    /// Changing the kind of an existing type, or creating a new one, fails
    /// once the name is frozen.
    pub fn declare_type(&mut self, kind: TypeKind, name: &str) -> Result<TypeId, BuilderError> {
        let name = name.trim_start_matches(NAMESPACE_SEPARATOR);
        let key = normalize_name(name);

        if let Some(&id) = self.type_index.get(&key) {
            let current = self.types[id.0 as usize].kind;
            if current != kind {
                if self.is_frozen(name) {
                    return Err(BuilderError::BuilderFrozen {
                        name: name.to_string(),
                    });
                }
                warn!(fqn = name, from = %current, to = %kind, "type re-declared with another kind");
                self.types[id.0 as usize].kind = kind;
            }
            return Ok(id);
        }

        if self.is_frozen(name) {
            return Err(BuilderError::BuilderFrozen {
                name: name.to_string(),
            });
        }

        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeEntity {
            id,
            kind,
            name: name.to_string(),
            namespace: None,
            declaration: None,
        });
        self.type_index.insert(key, id);

        let namespace = self.declare_namespace(split_qualified_name(name).0);
        self.add_to_namespace(namespace, id);
        debug!(%kind, fqn = name, "registered type");
        Ok(id)
    }

    /// Return the function registered under `name`, creating it if needed.
    pub fn declare_function(&mut self, name: &str) -> FunctionId {
        let name = name.trim_start_matches(NAMESPACE_SEPARATOR);
        let key = normalize_name(name);
        if let Some(&id) = self.function_index.get(&key) {
            return id;
        }

        let id = FunctionId(self.functions.len() as u32);
        let namespace = self.declare_namespace(split_qualified_name(name).0);
        self.functions.push(FunctionEntity {
            id,
            name: name.to_string(),
            namespace: Some(namespace),
            declaration: None,
        });
        self.function_index.insert(key, id);
        self.namespaces[namespace.0 as usize].functions.push(id);
        debug!(fqn = name, "registered function");
        id
    }

    /// Return the namespace called `name`, creating it if needed. `None`
    /// is the global namespace.
    pub fn declare_namespace(&mut self, name: Option<&str>) -> NamespaceId {
        let name = name.unwrap_or(GLOBAL_NAMESPACE);
        let key = normalize_name(name);
        if let Some(&id) = self.namespace_index.get(&key) {
            return id;
        }
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces.push(Namespace {
            id,
            name: name.to_string(),
            types: Vec::new(),
            functions: Vec::new(),
        });
        self.namespace_index.insert(key, id);
        id
    }

    /// Move `ty` into `namespace`, detaching it from its previous one first.
    pub fn add_to_namespace(&mut self, namespace: NamespaceId, ty: TypeId) {
        if let Some(previous) = self.types[ty.0 as usize].namespace {
            if previous == namespace {
                return;
            }
            self.remove_from_namespace(previous, ty);
        }
        let members = &mut self.namespaces[namespace.0 as usize].types;
        if !members.contains(&ty) {
            members.push(ty);
        }
        self.types[ty.0 as usize].namespace = Some(namespace);
    }

    pub fn remove_from_namespace(&mut self, namespace: NamespaceId, ty: TypeId) {
        self.namespaces[namespace.0 as usize]
            .types
            .retain(|&member| member != ty);
        let entity = &mut self.types[ty.0 as usize];
        if entity.namespace == Some(namespace) {
            entity.namespace = None;
        }
    }

    /// Register every declaration of a parsed file.
    ///
    /// All frozen-name checks run before anything is changed, so a
    /// rejected unit leaves the registry as it was.
    pub fn register_unit(&mut self, unit: SourceUnit) -> Result<UnitId, BuilderError> {
        for decl in &unit.types {
            let name = decl.fqn();
            if self.is_frozen(&name) {
                return Err(BuilderError::BuilderFrozen { name });
            }
        }

        let unit_id = UnitId(self.units.len() as u32);
        for namespace in &unit.namespaces {
            self.declare_namespace(namespace.as_deref());
        }

        for (index, decl) in unit.types.iter().enumerate() {
            let id = self.declare_type(decl.kind, &decl.fqn())?;
            let site = DeclarationSite {
                unit: unit_id,
                index,
            };
            if let Some(previous) = self.types[id.0 as usize].declaration.replace(site) {
                warn!(
                    fqn = %decl.fqn(),
                    previous = %self.units[previous.unit.0 as usize].unit.path,
                    path = %unit.path,
                    "type declared more than once, keeping the last declaration"
                );
            }
        }

        for (index, decl) in unit.functions.iter().enumerate() {
            let id = self.declare_function(&decl.fqn());
            let site = DeclarationSite {
                unit: unit_id,
                index,
            };
            if self.functions[id.0 as usize]
                .declaration
                .replace(site)
                .is_some()
            {
                warn!(fqn = %decl.fqn(), path = %unit.path, "function declared more than once");
            }
        }

        debug!(
            path = %unit.path,
            types = unit.types.len(),
            functions = unit.functions.len(),
            "registered unit"
        );
        let references = unit.references.iter().map(|_| Deferred::new()).collect();
        self.units.push(UnitEntry { unit, references });
        Ok(unit_id)
    }

    // ── Resolution ──────────────────────────────────────────────────

    /// Forbid new declarations under `name`.
    pub fn freeze(&self, name: &str) {
        self.frozen.borrow_mut().insert(normalize_name(name));
    }

    pub fn is_frozen(&self, name: &str) -> bool {
        self.frozen.borrow().contains(&normalize_name(name))
    }

    /// Resolve a qualified type name and freeze it. Never fails.
    pub fn resolve(&self, name: &str) -> Resolved {
        self.freeze(name);
        match self.find_type(name) {
            Some(id) => Resolved::Type(id),
            None => Resolved::Unknown(name.trim_start_matches(NAMESPACE_SEPARATOR).to_string()),
        }
    }

    /// Resolve a deferred reference of a unit. The first result is kept.
    pub fn resolve_reference(&self, unit: UnitId, reference: RefId) -> &Resolved {
        let entry = &self.units[unit.0 as usize];
        let name = &entry.unit.reference(reference).name;
        entry.references[reference.0 as usize].get_or_resolve(|| self.resolve(name))
    }

    /// Resolve the reference carried by a type-reference node, if any.
    pub fn resolve_node(&self, unit: UnitId, node: NodeId) -> Option<&Resolved> {
        let reference = self.unit(unit).ast.node(node).reference?;
        Some(self.resolve_reference(unit, reference))
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// Look a type up without freezing its name.
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(&normalize_name(name)).copied()
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.function_index.get(&normalize_name(name)).copied()
    }

    pub fn find_namespace(&self, name: Option<&str>) -> Option<NamespaceId> {
        self.namespace_index
            .get(&normalize_name(name.unwrap_or(GLOBAL_NAMESPACE)))
            .copied()
    }

    pub fn type_entity(&self, id: TypeId) -> &TypeEntity {
        &self.types[id.0 as usize]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionEntity {
        &self.functions[id.0 as usize]
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0 as usize]
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeEntity> {
        self.types.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntity> {
        self.functions.iter()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.0 as usize].unit
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &SourceUnit)> {
        self.units
            .iter()
            .enumerate()
            .map(|(index, entry)| (UnitId(index as u32), &entry.unit))
    }

    /// The declaration summary of a type, with the unit holding it.
    pub fn type_decl(&self, id: TypeId) -> Option<(UnitId, &TypeDecl)> {
        let site = self.type_entity(id).declaration?;
        Some((site.unit, &self.unit(site.unit).types[site.index]))
    }

    pub fn function_decl(&self, id: FunctionId) -> Option<(UnitId, &FunctionDecl)> {
        let site = self.function(id).declaration?;
        Some((site.unit, &self.unit(site.unit).functions[site.index]))
    }

    /// The declaration behind a method table entry.
    pub fn method_decl(&self, method: &EffectiveMethod) -> Option<&MethodDecl> {
        let (_, decl) = self.type_decl(method.declaring_type)?;
        decl.methods.get(method.index)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The declared parent class. Interfaces and traits have none.
    pub fn parent_class(&self, id: TypeId) -> Option<Resolved> {
        self.freeze(&self.type_entity(id).name);
        let (unit, decl) = self.type_decl(id)?;
        let reference = decl.parent?;
        Some(self.resolve_reference(unit, reference).clone())
    }

    /// The parent chain, nearest first. Stops at an unknown type or a cycle.
    pub fn parent_classes(&self, id: TypeId) -> Vec<Resolved> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.parent_class(current) {
            let Resolved::Type(next) = parent else {
                chain.push(parent);
                break;
            };
            if !visited.insert(next) {
                warn!(fqn = %self.type_entity(id).name, "cyclic inheritance");
                break;
            }
            chain.push(parent);
            current = next;
        }
        chain
    }

    /// All interfaces a type implements or extends, directly or through
    /// its parents and extended interfaces. Each appears once.
    pub fn interfaces(&self, id: TypeId) -> Vec<Resolved> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        self.collect_interfaces(id, &mut visited, &mut found);
        found
    }

    fn collect_interfaces(&self, id: TypeId, visited: &mut HashSet<TypeId>, found: &mut Vec<Resolved>) {
        if !visited.insert(id) {
            return;
        }
        self.freeze(&self.type_entity(id).name);
        let Some((unit, decl)) = self.type_decl(id) else {
            return;
        };
        for &reference in &decl.interfaces {
            let resolved = self.resolve_reference(unit, reference);
            if !found.contains(resolved) {
                found.push(resolved.clone());
            }
            if let Resolved::Type(interface) = *resolved {
                self.collect_interfaces(interface, visited, found);
            }
        }
        if let Some(Resolved::Type(parent)) = self.parent_class(id) {
            self.collect_interfaces(parent, visited, found);
        }
    }

    /// The methods callable on a type: its own, those imported from
    /// traits and those inherited from its parent class (or, for an
    /// interface, from the interfaces it extends).
    ///
    /// Computed once per type. Trait collisions surface here.
    pub fn effective_methods(&self, id: TypeId) -> Result<Arc<MethodTable>, BuilderError> {
        if let Some(table) = self.method_tables.borrow().get(&id) {
            return Ok(Arc::clone(table));
        }
        if !self.composing.borrow_mut().insert(id) {
            warn!(fqn = %self.type_entity(id).name, "cyclic inheritance or trait composition");
            self.cycle_hit.set(true);
            return Ok(Arc::new(MethodTable::default()));
        }
        let outermost = self.composing.borrow().len() == 1;
        let enclosing_hit = self.cycle_hit.replace(false);
        let result = self.build_method_table(id);
        self.composing.borrow_mut().remove(&id);
        let hit = self.cycle_hit.get();
        self.cycle_hit.set(enclosing_hit || hit);

        let table = Arc::new(result?);
        if outermost || !hit {
            self.method_tables
                .borrow_mut()
                .insert(id, Arc::clone(&table));
        }
        Ok(table)
    }

    fn build_method_table(&self, id: TypeId) -> Result<MethodTable, BuilderError> {
        self.freeze(&self.type_entity(id).name);
        let Some((unit, decl)) = self.type_decl(id) else {
            return Ok(MethodTable::default());
        };

        let mut table = traits::compose(self, id, unit, decl)?;
        for (index, method) in decl.methods.iter().enumerate() {
            table.insert(EffectiveMethod::declared(id, index, method));
        }

        let ancestors: Vec<TypeId> = match decl.kind {
            TypeKind::Class | TypeKind::Enum => self
                .parent_class(id)
                .and_then(|parent| parent.type_id())
                .into_iter()
                .collect(),
            TypeKind::Interface => decl
                .interfaces
                .iter()
                .filter_map(|&reference| self.resolve_reference(unit, reference).type_id())
                .collect(),
            TypeKind::Trait => Vec::new(),
        };
        for ancestor in ancestors {
            let inherited = self.effective_methods(ancestor)?;
            for method in inherited.iter() {
                if method.modifiers.is_private() || table.contains(&method.name) {
                    continue;
                }
                table.insert(EffectiveMethod {
                    origin: MethodOrigin::Inherited(ancestor),
                    ..method.clone()
                });
            }
        }

        debug!(fqn = %self.type_entity(id).name, methods = table.len(), "built method table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_depend_parser::{parse_source, ParserOptions};

    fn build(sources: &[&str]) -> Builder {
        let mut builder = Builder::new();
        for (index, source) in sources.iter().enumerate() {
            let unit = parse_source(&format!("file{index}.php"), source, ParserOptions::default())
                .expect("parse");
            builder.register_unit(unit).expect("register");
        }
        builder
    }

    fn names(builder: &Builder, resolved: &[Resolved]) -> Vec<String> {
        resolved
            .iter()
            .map(|r| match r {
                Resolved::Type(id) => builder.type_entity(*id).name.clone(),
                Resolved::Unknown(name) => format!("?{name}"),
            })
            .collect()
    }

    #[test]
    fn test_declare_type_is_case_insensitive() {
        let mut builder = Builder::new();
        let first = builder.declare_type(TypeKind::Class, "Foo\\Bar").expect("declare");
        let second = builder.declare_type(TypeKind::Class, "foo\\bar").expect("declare");
        assert_eq!(first, second);
        assert_eq!(builder.type_entity(first).name, "Foo\\Bar");
        assert_eq!(builder.type_entity(first).short_name(), "Bar");
        assert_eq!(builder.types().count(), 1);
    }

    #[test]
    fn test_kind_change_allowed_before_freeze() {
        let mut builder = Builder::new();
        let id = builder.declare_type(TypeKind::Class, "X").expect("declare");
        let again = builder.declare_type(TypeKind::Interface, "X").expect("redeclare");
        assert_eq!(id, again);
        assert_eq!(builder.type_entity(id).kind, TypeKind::Interface);
    }

    #[test]
    fn test_resolve_freezes_name() {
        let mut builder = Builder::new();
        builder.declare_type(TypeKind::Class, "X").expect("declare");
        assert!(matches!(builder.resolve("x"), Resolved::Type(_)));

        let err = builder
            .declare_type(TypeKind::Interface, "X")
            .expect_err("frozen");
        assert_eq!(err, BuilderError::BuilderFrozen { name: "X".into() });
        // Same kind is still an idempotent lookup.
        assert!(builder.declare_type(TypeKind::Class, "X").is_ok());
    }

    #[test]
    fn test_unknown_name_resolves_to_placeholder_and_freezes() {
        let mut builder = Builder::new();
        assert_eq!(builder.resolve("\\Vendor\\Missing"), Resolved::Unknown("Vendor\\Missing".into()));
        assert!(builder.is_frozen("vendor\\missing"));
        assert!(builder
            .declare_type(TypeKind::Class, "Vendor\\Missing")
            .is_err());
    }

    #[test]
    fn test_reference_resolution_is_memoized() {
        let mut builder = build(&["<?php class A extends B {}"]);
        let a = builder.find_type("A").expect("A");
        let (unit, decl) = builder.type_decl(a).expect("decl");
        let parent = decl.parent.expect("parent");

        let first = builder.resolve_reference(unit, parent).clone();
        builder.declare_type(TypeKind::Class, "Unrelated").expect("declare");
        let second = builder.resolve_reference(unit, parent).clone();

        assert_eq!(first, Resolved::Unknown("B".into()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_reference_resolves_across_files() {
        let builder = build(&[
            "<?php namespace App; class A extends Base {}",
            "<?php namespace App; abstract class Base {}",
        ]);
        let a = builder.find_type("app\\a").expect("A");
        let base = builder.find_type("App\\Base").expect("Base");
        assert_eq!(builder.parent_class(a), Some(Resolved::Type(base)));
    }

    #[test]
    fn test_register_unit_is_atomic() {
        let mut builder = Builder::new();
        builder.resolve("Foo");

        let unit = parse_source(
            "a.php",
            "<?php class Bar {} class Foo {} function f() {}",
            ParserOptions::default(),
        )
        .expect("parse");
        let err = builder.register_unit(unit).expect_err("frozen");

        assert_eq!(err, BuilderError::BuilderFrozen { name: "Foo".into() });
        assert!(builder.find_type("Bar").is_none());
        assert!(builder.find_function("f").is_none());
        assert_eq!(builder.units().count(), 0);
    }

    #[test]
    fn test_namespace_membership_and_reparenting() {
        let mut builder = Builder::new();
        let a = builder.declare_type(TypeKind::Class, "App\\A").expect("declare");
        let b = builder.declare_type(TypeKind::Class, "App\\B").expect("declare");
        let app = builder.find_namespace(Some("app")).expect("namespace");
        assert_eq!(builder.namespace(app).types(), &[a, b]);

        let other = builder.declare_namespace(Some("Other"));
        builder.add_to_namespace(other, a);
        builder.add_to_namespace(other, a);
        assert_eq!(builder.namespace(app).types(), &[b]);
        assert_eq!(builder.namespace(other).types(), &[a]);
        assert_eq!(builder.type_entity(a).namespace, Some(other));

        builder.remove_from_namespace(other, a);
        assert!(builder.namespace(other).types().is_empty());
        assert_eq!(builder.type_entity(a).namespace, None);
    }

    #[test]
    fn test_global_namespace() {
        let builder = build(&["<?php class A {} function helper() {}"]);
        let global = builder.find_namespace(None).expect("global");
        let namespace = builder.namespace(global);
        assert!(namespace.is_global());
        assert_eq!(namespace.types().len(), 1);
        assert_eq!(namespace.functions().len(), 1);
    }

    #[test]
    fn test_functions_are_registered_case_insensitively() {
        let builder = build(&["<?php namespace Util; function Format() {}"]);
        let id = builder.find_function("util\\format").expect("function");
        assert_eq!(builder.function(id).name, "Util\\Format");
        assert_eq!(builder.function(id).short_name(), "Format");
        let (_, decl) = builder.function_decl(id).expect("decl");
        assert_eq!(decl.name, "Format");
    }

    #[test]
    fn test_parent_chain_stops_at_cycle_and_unknown() {
        let builder = build(&[
            "<?php class A extends B {} class B extends C {} class C extends Missing {}",
            "<?php class X extends Y {} class Y extends X {}",
        ]);
        let a = builder.find_type("A").expect("A");
        assert_eq!(
            names(&builder, &builder.parent_classes(a)),
            vec!["B", "C", "?Missing"]
        );
        let x = builder.find_type("X").expect("X");
        assert_eq!(names(&builder, &builder.parent_classes(x)), vec!["Y"]);
    }

    #[test]
    fn test_interfaces_are_collected_once() {
        let builder = build(&[
            "<?php
            interface Countable {}
            interface Collection extends Countable {}
            class Base implements Countable {}
            class Items extends Base implements Collection, Countable {}",
        ]);
        let items = builder.find_type("Items").expect("Items");
        assert_eq!(
            names(&builder, &builder.interfaces(items)),
            vec!["Collection", "Countable"]
        );
    }

    #[test]
    fn test_effective_methods_include_inherited() {
        let builder = build(&[
            "<?php
            class Base { public function run() {} private function secret() {} protected function helper() {} }
            class Child extends Base { public function run() {} public function extra() {} }",
        ]);
        let child = builder.find_type("Child").expect("Child");
        let base = builder.find_type("Base").expect("Base");
        let table = builder.effective_methods(child).expect("methods");

        assert_eq!(table.names(), vec!["run", "extra", "helper"]);
        assert_eq!(table.get("run").map(|m| m.origin), Some(MethodOrigin::Declared));
        assert_eq!(
            table.get("helper").map(|m| m.origin),
            Some(MethodOrigin::Inherited(base))
        );
        let helper = builder.method_decl(table.get("helper").expect("helper")).expect("decl");
        assert_eq!(helper.name, "helper");
        assert!(builder.is_frozen("Child"));
    }

    #[test]
    fn test_interface_methods_include_extended() {
        let builder = build(&[
            "<?php interface A { function a(); } interface B extends A { function b(); }",
        ]);
        let b = builder.find_type("B").expect("B");
        let table = builder.effective_methods(b).expect("methods");
        assert_eq!(table.names(), vec!["b", "a"]);
        assert!(table.iter().all(|m| m.is_abstract()));
    }

    #[test]
    fn test_method_table_is_cached() {
        let builder = build(&["<?php class A { function f() {} }"]);
        let a = builder.find_type("A").expect("A");
        let first = builder.effective_methods(a).expect("methods");
        let second = builder.effective_methods(a).expect("methods");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cyclic_inheritance_terminates() {
        let builder = build(&["<?php class X extends Y { function x() {} } class Y extends X { function y() {} }"]);
        let x = builder.find_type("X").expect("X");
        let table = builder.effective_methods(x).expect("methods");
        assert!(table.contains("x"));
        assert!(table.contains("y"));
    }

    #[test]
    fn test_cyclic_tables_do_not_depend_on_query_order() {
        let source = "<?php class X extends Y { function x() {} } class Y extends X { function y() {} }";
        for first in ["X", "Y"] {
            let builder = build(&[source]);
            let warm = builder.find_type(first).expect(first);
            builder.effective_methods(warm).expect("methods");

            let x = builder.find_type("X").expect("X");
            let y = builder.find_type("Y").expect("Y");
            assert_eq!(builder.effective_methods(x).expect("x").names(), vec!["x", "y"]);
            assert_eq!(builder.effective_methods(y).expect("y").names(), vec!["y", "x"]);
        }
    }
}
