//! PHPDoc annotation reader.
//!
//! Pulls the class-like type names out of `@return`, `@var` and `@throws`
//! tags. Scalar and pseudo types are dropped; the parser qualifies what is
//! left and attaches it to the documented declaration.

/// Names that never refer to a declared class.
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    "self", "static", "parent", "$this", "int", "integer", "float", "double", "string", "bool",
    "boolean", "array", "object", "null", "void", "never", "mixed", "callable", "iterable",
    "true", "false", "resource", "scalar", "numeric", "list",
];

/// Class names found in a doc comment, grouped by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocTypes {
    pub returns: Vec<String>,
    pub vars: Vec<String>,
    pub throws: Vec<String>,
}

impl DocTypes {
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty() && self.vars.is_empty() && self.throws.is_empty()
    }
}

/// Parse a doc comment including its `/**` and `*/` markers.
pub fn parse_annotations(comment: &str) -> DocTypes {
    let mut doc = DocTypes::default();
    for line in strip_comment_markers(comment) {
        if line.starts_with('@') {
            parse_tag(&line, &mut doc);
        }
    }
    doc
}

fn strip_comment_markers(comment: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in comment.lines() {
        let trimmed = line.trim();
        let mut stripped = if let Some(rest) = trimmed.strip_prefix("/**") {
            rest.trim()
        } else if trimmed.starts_with("*/") {
            continue;
        } else if let Some(rest) = trimmed.strip_prefix('*') {
            rest.trim_start()
        } else {
            trimmed
        };
        if let Some(rest) = stripped.strip_suffix("*/") {
            stripped = rest.trim_end();
        }
        if !stripped.is_empty() {
            lines.push(stripped.to_string());
        }
    }
    lines
}

fn parse_tag(line: &str, doc: &mut DocTypes) {
    let (tag, rest) = match line.split_once(char::is_whitespace) {
        Some((tag, rest)) => (tag, rest.trim()),
        None => return,
    };
    let target = match tag {
        "@return" => &mut doc.returns,
        "@var" => &mut doc.vars,
        "@throws" => &mut doc.throws,
        _ => return,
    };
    for name in class_names(type_expression(rest)) {
        if !target.contains(&name) {
            target.push(name);
        }
    }
}

/// The type expression at the start of a tag body. Generic arguments may
/// contain spaces, so brackets are balanced before splitting.
fn type_expression(rest: &str) -> &str {
    let mut depth = 0i32;
    for (idx, c) in rest.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth -= 1,
            c if c.is_whitespace() && depth <= 0 => return &rest[..idx],
            _ => {}
        }
    }
    rest
}

/// Class-like names in a type expression such as `?Foo|Bar[]|array<int, Baz>`.
///
/// Generic arguments are ignored; only the outer type names count.
pub fn class_names(expression: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in expression.chars() {
        match c {
            '<' | '{' => depth += 1,
            '>' | '}' => depth -= 1,
            _ if depth > 0 => {}
            '|' | '&' | '(' | ')' => flush(&mut current, &mut names),
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut names);
    names
}

fn flush(current: &mut String, names: &mut Vec<String>) {
    let name = current
        .trim()
        .trim_start_matches('?')
        .trim_end_matches("[]")
        .to_string();
    current.clear();
    if name.is_empty() || !is_class_name(&name) {
        return;
    }
    let lower = name.to_lowercase();
    if BUILTIN_TYPE_NAMES.contains(&lower.as_str()) {
        return;
    }
    if !names.contains(&name) {
        names.push(name);
    }
}

fn is_class_name(name: &str) -> bool {
    name.trim_start_matches('\\')
        .split('\\')
        .all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}
