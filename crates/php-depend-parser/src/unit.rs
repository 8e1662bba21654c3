//! Per-file parse result.
//!
//! A [`SourceUnit`] is self-contained: it owns its AST, the table of
//! deferred type references that AST points into, and summaries of the
//! types and functions it declares. The builder registers a unit as a
//! whole, and the cache stores it as JSON.

use php_depend_types::{Modifiers, Position, TypeKind, NAMESPACE_SEPARATOR};
use serde::{Deserialize, Serialize};

use crate::ast::{Ast, NodeId, RefId};

/// How a deferred reference was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `new X`, `extends X` on a class, `X::` and other class-only spots.
    Class,
    /// Type hints, `instanceof`, `catch` and annotations.
    ClassOrInterface,
    /// `implements X`, `extends X` on an interface.
    Interface,
    Trait,
    /// `self`, bound to the enclosing type while parsing.
    SelfType,
    /// `parent`, bound to the enclosing type's declared parent.
    Parent,
    /// `static`, bound to the enclosing type.
    Static,
}

/// A qualified type name awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    pub kind: ReferenceKind,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub by_ref: bool,
    pub node: NodeId,
    pub doc_comment: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub node: NodeId,
    pub position: Position,
}

/// Class constant or enum case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub node: NodeId,
    pub position: Position,
}

/// Summary of a class, interface, trait or enum declared in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub namespace: Option<String>,
    pub modifiers: Modifiers,
    pub node: NodeId,
    pub parent: Option<RefId>,
    pub interfaces: Vec<RefId>,
    /// `TraitUseStatement` nodes in source order.
    pub trait_uses: Vec<NodeId>,
    pub methods: Vec<MethodDecl>,
    pub properties: Vec<PropertyDecl>,
    pub constants: Vec<ConstantDecl>,
    pub cases: Vec<ConstantDecl>,
    pub backing_type: Option<String>,
    pub doc_comment: Option<String>,
    pub position: Position,
}

impl TypeDecl {
    pub fn fqn(&self) -> String {
        qualify(self.namespace.as_deref(), &self.name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub namespace: Option<String>,
    pub by_ref: bool,
    pub node: NodeId,
    pub doc_comment: Option<String>,
    pub position: Position,
}

impl FunctionDecl {
    pub fn fqn(&self) -> String {
        qualify(self.namespace.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub ast: Ast,
    pub root: NodeId,
    pub references: Vec<TypeReference>,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<FunctionDecl>,
    /// Namespace names opened in this file, in order of first appearance.
    pub namespaces: Vec<Option<String>>,
}

impl SourceUnit {
    pub fn reference(&self, id: RefId) -> &TypeReference {
        &self.references[id.0 as usize]
    }

    /// Reference held by a type-reference node, if any.
    pub fn node_reference(&self, node: NodeId) -> Option<&TypeReference> {
        self.ast.node(node).reference.map(|id| self.reference(id))
    }

    pub fn find_type(&self, fqn: &str) -> Option<&TypeDecl> {
        self.types
            .iter()
            .find(|decl| decl.fqn().eq_ignore_ascii_case(fqn))
    }

    /// Restore parent back-references after deserialization.
    pub fn relink(&mut self) {
        self.ast.relink();
    }
}

pub(crate) fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}{NAMESPACE_SEPARATOR}{name}"),
        None => name.to_string(),
    }
}
