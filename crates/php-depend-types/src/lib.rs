//! Shared types for php-depend.
//!
//! Contains source positions, modifiers and declaration kinds used across the
//! parser, index and driver crates.

use serde::{Deserialize, Serialize};

/// Kind of a named type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl TypeKind {
    /// The PHP keyword that introduces a declaration of this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Trait => "trait",
            TypeKind::Enum => "enum",
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Visibility modifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Modifiers on a declaration (bitflags-style).
///
/// `visibility` is `None` when the source did not spell one out; members
/// without an explicit visibility are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
}

impl Modifiers {
    /// Visibility in effect, defaulting to public.
    pub fn effective_visibility(&self) -> Visibility {
        self.visibility.unwrap_or_default()
    }

    pub fn is_public(&self) -> bool {
        self.effective_visibility() == Visibility::Public
    }

    pub fn is_protected(&self) -> bool {
        self.effective_visibility() == Visibility::Protected
    }

    pub fn is_private(&self) -> bool {
        self.effective_visibility() == Visibility::Private
    }

    /// Copy of these modifiers with the visibility replaced.
    pub fn with_visibility(self, visibility: Visibility) -> Self {
        Modifiers {
            visibility: Some(visibility),
            ..self
        }
    }
}

/// Compact source span of a token or AST node.
///
/// Lines and columns are 1-based; `end_column` is inclusive. A zeroed
/// position means "no source location".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
}

impl Position {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Position {
            start_line,
            end_line,
            start_column,
            end_column,
        }
    }

    /// True when this position carries no location.
    pub fn is_unknown(&self) -> bool {
        self.start_line == 0 && self.end_line == 0
    }

    /// Span from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Position) -> Position {
        Position {
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: other.end_line,
            end_column: other.end_column,
        }
    }

    /// Smallest span covering both positions. Unknown positions are ignored.
    pub fn union(&self, other: &Position) -> Position {
        if self.is_unknown() {
            return *other;
        }
        if other.is_unknown() {
            return *self;
        }
        let (start_line, start_column) = (self.start_line, self.start_column)
            .min((other.start_line, other.start_column));
        let (end_line, end_column) =
            (self.end_line, self.end_column).max((other.end_line, other.end_column));
        Position {
            start_line,
            end_line,
            start_column,
            end_column,
        }
    }

    /// Whether `other` lies completely within this span.
    pub fn contains(&self, other: &Position) -> bool {
        (self.start_line, self.start_column) <= (other.start_line, other.start_column)
            && (self.end_line, self.end_column) >= (other.end_line, other.end_column)
    }

    /// Zero-width position at the start of this span.
    pub fn start(&self) -> Position {
        Position {
            start_line: self.start_line,
            end_line: self.start_line,
            start_column: self.start_column,
            end_column: self.start_column,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_column)
    }
}

/// Kind of a `use` import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseKind {
    Class,
    Function,
    Constant,
}

/// Separator between namespace segments.
pub const NAMESPACE_SEPARATOR: char = '\\';

/// Name of the namespace that holds declarations made outside any namespace.
pub const GLOBAL_NAMESPACE: &str = "+global";

/// Case-insensitive registry key for a qualified name.
///
/// Strips a leading separator and lowercases, so `\Foo\Bar` and `foo\bar`
/// share one key.
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches(NAMESPACE_SEPARATOR).to_lowercase()
}

/// Split a qualified name into its namespace and short name.
///
/// `App\Service\Foo` gives `(Some("App\Service"), "Foo")`.
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    let name = name.trim_start_matches(NAMESPACE_SEPARATOR);
    match name.rfind(NAMESPACE_SEPARATOR) {
        Some(idx) => (Some(&name[..idx]), &name[idx + 1..]),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_default_visibility() {
        let modifiers = Modifiers::default();
        assert!(modifiers.is_public());
        assert_eq!(modifiers.visibility, None);

        let protected = modifiers.with_visibility(Visibility::Protected);
        assert!(protected.is_protected());
        assert!(!protected.is_public());
    }

    #[test]
    fn test_position_union_and_contains() {
        let a = Position::new(1, 5, 1, 10);
        let b = Position::new(2, 1, 3, 4);
        let both = a.union(&b);
        assert_eq!(both, Position::new(1, 5, 3, 4));
        assert!(both.contains(&a));
        assert!(both.contains(&b));
        assert!(!a.contains(&b));
        assert_eq!(Position::default().union(&a), a);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("\\Foo\\Bar"), "foo\\bar");
        assert_eq!(normalize_name("foo\\BAR"), "foo\\bar");
    }

    #[test]
    fn test_split_qualified_name() {
        assert_eq!(
            split_qualified_name("App\\Service\\Foo"),
            (Some("App\\Service"), "Foo")
        );
        assert_eq!(split_qualified_name("\\Foo"), (None, "Foo"));
    }

    #[test]
    fn test_type_kind_display() {
        assert_eq!(TypeKind::Interface.to_string(), "interface");
        assert_eq!(TypeKind::Enum.keyword(), "enum");
    }
}
