//! Use-alias table and qualified-name resolution.

use std::collections::HashMap;

use php_depend_types::{UseKind, NAMESPACE_SEPARATOR};

#[derive(Debug, Default)]
struct Scope {
    namespace: Option<String>,
    aliases: HashMap<(UseKind, String), String>,
}

/// Maps short alias names to qualified names, one scope per namespace block.
///
/// Class aliases are case-insensitive. Constant aliases are case-sensitive,
/// as in PHP.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Enter a namespace block. `None` is the global namespace.
    pub fn create_scope(&mut self, namespace: Option<String>) {
        self.scopes.push(Scope {
            namespace: namespace.filter(|ns| !ns.is_empty()),
            aliases: HashMap::new(),
        });
    }

    pub fn destroy_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn namespace(&self) -> Option<&str> {
        self.scopes.last().and_then(|scope| scope.namespace.as_deref())
    }

    /// Register `use <fqn> [as <alias>]`. Without an alias the last
    /// segment of `fqn` is used.
    pub fn add(&mut self, kind: UseKind, fqn: &str, alias: Option<&str>) {
        let fqn = fqn.trim_start_matches(NAMESPACE_SEPARATOR);
        let alias = alias.unwrap_or_else(|| last_segment(fqn));
        let key = (kind, alias_key(kind, alias));
        if self.scopes.is_empty() {
            self.create_scope(None);
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.aliases.insert(key, fqn.to_string());
        }
    }

    pub fn lookup(&self, kind: UseKind, alias: &str) -> Option<&str> {
        let key = (kind, alias_key(kind, alias));
        self.scopes
            .last()
            .and_then(|scope| scope.aliases.get(&key))
            .map(String::as_str)
    }

    /// Qualify a class-like name.
    ///
    /// Tried in order: `namespace\` relative names, aliases of the first
    /// segment, names with a leading separator, and finally the current
    /// namespace prefix.
    pub fn resolve_class(&self, name: &str) -> String {
        if let Some(rest) = strip_namespace_keyword(name) {
            return self.prefixed(rest);
        }
        if !name.starts_with(NAMESPACE_SEPARATOR) {
            let (first, rest) = match name.split_once(NAMESPACE_SEPARATOR) {
                Some((first, rest)) => (first, Some(rest)),
                None => (name, None),
            };
            if let Some(fqn) = self.lookup(UseKind::Class, first) {
                return match rest {
                    Some(rest) => format!("{fqn}{NAMESPACE_SEPARATOR}{rest}"),
                    None => fqn.to_string(),
                };
            }
        }
        if let Some(fqn) = name.strip_prefix(NAMESPACE_SEPARATOR) {
            return fqn.to_string();
        }
        self.prefixed(name)
    }

    /// Qualify a function name.
    ///
    /// Unqualified names without an alias are kept as written, since PHP
    /// falls back to the global function at run time.
    pub fn resolve_function(&self, name: &str) -> String {
        self.resolve_callable(UseKind::Function, name)
    }

    /// Qualify a constant name. Same rules as functions.
    pub fn resolve_constant(&self, name: &str) -> String {
        self.resolve_callable(UseKind::Constant, name)
    }

    fn resolve_callable(&self, kind: UseKind, name: &str) -> String {
        if name.contains(NAMESPACE_SEPARATOR) {
            return self.resolve_class(name);
        }
        match self.lookup(kind, name) {
            Some(fqn) => fqn.to_string(),
            None => name.to_string(),
        }
    }

    /// Name declared in the current namespace.
    pub fn declared_name(&self, short: &str) -> String {
        self.prefixed(short)
    }

    fn prefixed(&self, name: &str) -> String {
        match self.namespace() {
            Some(ns) => format!("{ns}{NAMESPACE_SEPARATOR}{name}"),
            None => name.to_string(),
        }
    }
}

fn alias_key(kind: UseKind, alias: &str) -> String {
    match kind {
        UseKind::Constant => alias.to_string(),
        UseKind::Class | UseKind::Function => alias.to_lowercase(),
    }
}

fn last_segment(fqn: &str) -> &str {
    fqn.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(fqn)
}

fn strip_namespace_keyword(name: &str) -> Option<&str> {
    let prefix = name.get(..10)?;
    if prefix.eq_ignore_ascii_case("namespace\\") {
        Some(&name[10..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.create_scope(Some("App\\Http".to_string()));
        table.add(UseKind::Class, "Vendor\\Lib\\Client", None);
        table.add(UseKind::Class, "\\Vendor\\Models", Some("M"));
        table.add(UseKind::Function, "Vendor\\helper", None);
        table.add(UseKind::Constant, "Vendor\\LIMIT", None);
        table
    }

    #[test]
    fn test_alias_resolution() {
        let table = table();
        assert_eq!(table.resolve_class("Client"), "Vendor\\Lib\\Client");
        assert_eq!(table.resolve_class("client"), "Vendor\\Lib\\Client");
        assert_eq!(table.resolve_class("M\\User"), "Vendor\\Models\\User");
    }

    #[test]
    fn test_namespace_prefix_and_fully_qualified() {
        let table = table();
        assert_eq!(table.resolve_class("Request"), "App\\Http\\Request");
        assert_eq!(table.resolve_class("\\Client"), "Client");
        assert_eq!(
            table.resolve_class("namespace\\Sub\\Foo"),
            "App\\Http\\Sub\\Foo"
        );
    }

    #[test]
    fn test_function_and_constant_resolution() {
        let table = table();
        assert_eq!(table.resolve_function("helper"), "Vendor\\helper");
        assert_eq!(table.resolve_function("strlen"), "strlen");
        assert_eq!(table.resolve_function("\\strlen"), "strlen");
        assert_eq!(table.resolve_constant("LIMIT"), "Vendor\\LIMIT");
        assert_eq!(table.resolve_constant("limit"), "limit");
    }

    #[test]
    fn test_scope_is_destroyed_with_block() {
        let mut table = table();
        table.destroy_scope();
        table.create_scope(None);
        assert_eq!(table.resolve_class("Client"), "Client");
        assert_eq!(table.namespace(), None);
    }
}
