//! Effective method tables.

use std::collections::HashMap;

use php_depend_parser::MethodDecl;
use php_depend_types::Modifiers;

use crate::builder::TypeId;

/// How a method reached a type's effective table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOrigin {
    Declared,
    /// Imported from the named trait, possibly under an alias.
    Trait(TypeId),
    /// Inherited from the named parent class or extended interface.
    Inherited(TypeId),
}

/// One entry of a method table.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveMethod {
    /// Name the method is visible under. Differs from the declared name
    /// when imported through an alias.
    pub name: String,
    /// Type whose body declares the method.
    pub declaring_type: TypeId,
    /// Index into the declaring type's method list.
    pub index: usize,
    /// Declared modifiers, with any visibility change from an alias.
    pub modifiers: Modifiers,
    pub origin: MethodOrigin,
}

impl EffectiveMethod {
    pub(crate) fn declared(owner: TypeId, index: usize, decl: &MethodDecl) -> Self {
        EffectiveMethod {
            name: decl.name.clone(),
            declaring_type: owner,
            index,
            modifiers: decl.modifiers,
            origin: MethodOrigin::Declared,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }

    /// Whether both entries stand for the same declared method.
    pub fn same_declaration(&self, other: &EffectiveMethod) -> bool {
        self.declaring_type == other.declaring_type && self.index == other.index
    }
}

/// Methods of a type keyed by case-insensitive name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodTable {
    methods: Vec<EffectiveMethod>,
    index: HashMap<String, usize>,
}

impl MethodTable {
    pub fn get(&self, name: &str) -> Option<&EffectiveMethod> {
        self.index
            .get(&name.to_lowercase())
            .map(|&slot| &self.methods[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Insert or replace the entry with the same name. Returns the replaced entry.
    pub fn insert(&mut self, method: EffectiveMethod) -> Option<EffectiveMethod> {
        let key = method.name.to_lowercase();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.methods[slot], method)),
            None => {
                self.index.insert(key, self.methods.len());
                self.methods.push(method);
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectiveMethod> {
        self.methods.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|method| method.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
