//! Hand-written recursive-descent parser.
//!
//! The parser never backtracks. Every production is chosen from the next
//! one or two non-comment tokens. Each node is built inside a
//! [`PositionTracker`] scope, and its span is the union of the scope's
//! tokens and its children's spans, so a parent always contains its
//! children.

mod declarations;
mod expressions;
mod statements;

use php_depend_types::{Position, TypeKind, UseKind};
use serde::{Deserialize, Serialize};

use crate::ast::{Ast, NodeId, NodeKind, RefId};
use crate::error::{ParseError, ParseResult};
use crate::stream::TokenStream;
use crate::symbol_table::SymbolTable;
use crate::token::{Token, TokenKind};
use crate::tracker::PositionTracker;
use crate::unit::{FunctionDecl, ReferenceKind, SourceUnit, TypeDecl, TypeReference};

/// Options that change the produced AST. Part of the cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Skip `@return`/`@var`/`@throws` doc-comment types.
    pub ignore_annotations: bool,
}

/// The type declaration whose body is being parsed.
#[derive(Debug, Clone)]
struct TypeContext {
    fqn: String,
    kind: TypeKind,
    parent: Option<String>,
}

pub struct Parser<S: TokenStream> {
    tokens: S,
    file: String,
    options: ParserOptions,
    tracker: PositionTracker,
    symbols: SymbolTable,
    ast: Ast,
    references: Vec<TypeReference>,
    types: Vec<TypeDecl>,
    functions: Vec<FunctionDecl>,
    namespaces: Vec<Option<String>>,
    /// Most recent doc comment not yet claimed by a declaration.
    doc: Option<String>,
    /// `None` entries mark function bodies, where no type is in scope.
    type_stack: Vec<Option<TypeContext>>,
}

impl<S: TokenStream> Parser<S> {
    pub fn new(tokens: S, file: impl Into<String>, options: ParserOptions) -> Self {
        Parser {
            tokens,
            file: file.into(),
            options,
            tracker: PositionTracker::new(),
            symbols: SymbolTable::new(),
            ast: Ast::new(),
            references: Vec::new(),
            types: Vec::new(),
            functions: Vec::new(),
            namespaces: Vec::new(),
            doc: None,
            type_stack: Vec::new(),
        }
    }

    /// Parse the whole stream into a [`SourceUnit`].
    pub fn parse(mut self) -> ParseResult<SourceUnit> {
        let root = self.ast.alloc(NodeKind::CompilationUnit, self.file.clone());
        self.start();
        self.symbols.create_scope(None);

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::OpenTag | TokenKind::CloseTag => {
                    self.advance();
                }
                TokenKind::Namespace if self.peek_next_kind() != TokenKind::Backslash => {
                    self.namespace_declaration(root)?;
                }
                _ => {
                    let statement = self.statement()?;
                    self.ast.attach(root, statement);
                }
            }
        }

        self.finish(root);
        self.symbols.destroy_scope();
        tracing::debug!(
            file = %self.file,
            nodes = self.ast.len(),
            types = self.types.len(),
            functions = self.functions.len(),
            "parsed file"
        );

        Ok(SourceUnit {
            path: self.file,
            ast: self.ast,
            root,
            references: self.references,
            types: self.types,
            functions: self.functions,
            namespaces: self.namespaces,
        })
    }

    // ── Tokens ──────────────────────────────────────────────────────

    /// Consume leading comments, remembering the last doc comment.
    fn consume_comments(&mut self) {
        while self.tokens.peek().kind.is_comment() {
            let token = self.tokens.next();
            if token.kind == TokenKind::DocComment {
                self.doc = Some(token.image.clone());
            }
            self.tracker.add(&token);
        }
    }

    fn peek(&mut self) -> &Token {
        self.consume_comments();
        self.tokens.peek()
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind
    }

    fn peek_next_kind(&mut self) -> TokenKind {
        self.consume_comments();
        self.tokens.peek_next().kind
    }

    /// Consume the next token whatever it is.
    fn advance(&mut self) -> Token {
        self.consume_comments();
        let token = self.tokens.next();
        self.tracker.add(&token);
        self.doc = None;
        token
    }

    fn consume(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.peek_kind() != kind {
            return Err(self.unexpected());
        }
        Ok(self.advance())
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// An identifier or a keyword used as a member name.
    fn consume_name(&mut self) -> ParseResult<Token> {
        if !self.peek_kind().is_name() {
            return Err(self.unexpected());
        }
        Ok(self.advance())
    }

    /// A declared type or function name.
    fn consume_identifier(&mut self) -> ParseResult<Token> {
        match self.peek_kind() {
            TokenKind::Identifier | TokenKind::Enum | TokenKind::Readonly | TokenKind::Match => {
                Ok(self.advance())
            }
            _ => Err(self.unexpected()),
        }
    }

    /// `;` or a `?>` close tag.
    fn terminator(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::CloseTag => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn take_doc(&mut self) -> Option<String> {
        self.doc.take()
    }

    fn unexpected(&mut self) -> ParseError {
        self.consume_comments();
        ParseError::unexpected(&self.file, self.tokens.peek())
    }

    fn invalid_state(&mut self, message: impl Into<String>) -> ParseError {
        let position = self.peek().position;
        ParseError::InvalidState {
            file: self.file.clone(),
            position,
            message: message.into(),
        }
    }

    fn missing_value(&self, at: &Token) -> ParseError {
        ParseError::MissingValue {
            file: self.file.clone(),
            position: at.position,
        }
    }

    // ── Nodes ───────────────────────────────────────────────────────

    fn start(&mut self) {
        self.tracker.push();
    }

    /// Close the node's scope and compute its position.
    fn finish(&mut self, node: NodeId) {
        let span = self.tracker.pop_span();
        self.set_position(node, span);
    }

    /// Grow a node built outside a scope so it covers its children.
    fn cover_children(&mut self, node: NodeId) {
        let own = self.ast.node(node).position;
        self.set_position(node, own);
    }

    fn set_position(&mut self, node: NodeId, span: Position) {
        let position = self
            .ast
            .children(node)
            .iter()
            .fold(span, |acc, &child| acc.union(&self.ast.node(child).position));
        self.ast.node_mut(node).position = position;
    }

    /// A node made of exactly one token.
    fn leaf(&mut self, token_kind: TokenKind, node_kind: NodeKind) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(token_kind)?;
        let node = self.ast.alloc(node_kind, token.image);
        self.finish(node);
        Ok(node)
    }

    fn add_reference(&mut self, node: NodeId, name: String, kind: ReferenceKind) -> RefId {
        let id = RefId(self.references.len() as u32);
        self.references.push(TypeReference { name, kind, node });
        self.ast.node_mut(node).reference = Some(id);
        id
    }

    fn current_type(&self) -> Option<&TypeContext> {
        self.type_stack.last().and_then(Option::as_ref)
    }

    // ── Names and references ────────────────────────────────────────

    /// Whether the next tokens start a (possibly qualified) name.
    fn at_name(&mut self) -> bool {
        match self.peek_kind() {
            TokenKind::Identifier | TokenKind::Backslash => true,
            TokenKind::Namespace => self.peek_next_kind() == TokenKind::Backslash,
            TokenKind::Enum | TokenKind::Readonly => true,
            _ => false,
        }
    }

    /// A name as written: `Foo`, `\Foo\Bar`, `namespace\Foo`.
    ///
    /// Keywords are accepted as segments after the first separator. A
    /// trailing `\` followed by `{` is left for group `use`.
    fn qualified_name(&mut self) -> ParseResult<String> {
        let mut name = String::new();
        if self.peek_kind() == TokenKind::Namespace {
            self.advance();
            self.consume(TokenKind::Backslash)?;
            name.push_str("namespace\\");
        } else if self.consume_if(TokenKind::Backslash) {
            name.push('\\');
        }

        let first = if name.is_empty() {
            self.consume_identifier()?
        } else {
            self.consume_name()?
        };
        name.push_str(&first.image);

        while self.peek_kind() == TokenKind::Backslash && self.peek_next_kind().is_name() {
            self.advance();
            name.push('\\');
            name.push_str(&self.consume_name()?.image);
        }
        Ok(name)
    }

    /// A reference to a class-like type by name, or one of `self`,
    /// `parent` and `static`.
    fn class_reference(
        &mut self,
        node_kind: NodeKind,
        ref_kind: ReferenceKind,
    ) -> ParseResult<NodeId> {
        match self.peek_kind() {
            TokenKind::SelfKeyword => return self.self_reference(),
            TokenKind::Parent => return self.parent_reference(),
            TokenKind::Static => return self.static_reference(),
            _ => {}
        }
        self.start();
        let written = self.qualified_name()?;
        let fqn = self.symbols.resolve_class(&written);
        let node = self.ast.alloc(node_kind, fqn.clone());
        self.add_reference(node, fqn, ref_kind);
        self.finish(node);
        Ok(node)
    }

    fn self_reference(&mut self) -> ParseResult<NodeId> {
        let Some(context) = self.current_type().cloned() else {
            return Err(self.invalid_state("self used outside of a class scope"));
        };
        let node = self.leaf(TokenKind::SelfKeyword, NodeKind::SelfReference)?;
        self.add_reference(node, context.fqn, ReferenceKind::SelfType);
        Ok(node)
    }

    /// `parent` binds to the declared parent of the enclosing type. Inside
    /// a trait the parent is only known once the trait is used, so the
    /// node carries no reference.
    fn parent_reference(&mut self) -> ParseResult<NodeId> {
        let Some(context) = self.current_type().cloned() else {
            return Err(self.invalid_state("parent used outside of a class scope"));
        };
        if context.kind == TypeKind::Trait {
            return self.leaf(TokenKind::Parent, NodeKind::ParentReference);
        }
        let Some(parent) = context.parent else {
            return Err(self.invalid_state(format!(
                "parent used in {} {} without a parent class",
                context.kind, context.fqn
            )));
        };
        let node = self.leaf(TokenKind::Parent, NodeKind::ParentReference)?;
        self.add_reference(node, parent, ReferenceKind::Parent);
        Ok(node)
    }

    fn static_reference(&mut self) -> ParseResult<NodeId> {
        let Some(context) = self.current_type().cloned() else {
            return Err(self.invalid_state("static used outside of a class scope"));
        };
        let node = self.leaf(TokenKind::Static, NodeKind::StaticReference)?;
        self.add_reference(node, context.fqn, ReferenceKind::Static);
        Ok(node)
    }

    // ── Namespaces and imports ──────────────────────────────────────

    fn namespace_declaration(&mut self, root: NodeId) -> ParseResult<()> {
        self.start();
        self.consume(TokenKind::Namespace)?;
        let name = if self.peek_kind() == TokenKind::CurlyOpen {
            None
        } else {
            Some(self.qualified_name()?.trim_start_matches('\\').to_string())
        };
        let node = self
            .ast
            .alloc(NodeKind::NamespaceDeclaration, name.clone().unwrap_or_default());
        if !self.namespaces.contains(&name) {
            self.namespaces.push(name.clone());
        }

        self.symbols.destroy_scope();
        self.symbols.create_scope(name);

        if self.consume_if(TokenKind::CurlyOpen) {
            self.statements_until(node, &[TokenKind::CurlyClose])?;
            self.consume(TokenKind::CurlyClose)?;
            self.finish(node);
            self.symbols.destroy_scope();
            self.symbols.create_scope(None);
        } else {
            self.terminator()?;
            self.finish(node);
        }
        self.ast.attach(root, node);
        Ok(())
    }

    /// `use` imports: plain, `function`, `const` and group forms.
    fn use_declaration(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Use)?;
        let node = self.ast.alloc(NodeKind::UseDeclaration, "use");
        let kind = self.use_kind().unwrap_or(UseKind::Class);

        loop {
            let prefix = self.qualified_name()?;
            if self.peek_kind() == TokenKind::Backslash {
                self.advance();
                self.consume(TokenKind::CurlyOpen)?;
                while self.peek_kind() != TokenKind::CurlyClose {
                    let item_kind = self.use_kind().unwrap_or(kind);
                    let name = self.qualified_name()?;
                    let alias = self.use_alias()?;
                    self.symbols
                        .add(item_kind, &format!("{prefix}\\{name}"), alias.as_deref());
                    if !self.consume_if(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::CurlyClose)?;
            } else {
                let alias = self.use_alias()?;
                self.symbols.add(kind, &prefix, alias.as_deref());
            }
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }

        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    fn use_kind(&mut self) -> Option<UseKind> {
        match self.peek_kind() {
            TokenKind::Function => {
                self.advance();
                Some(UseKind::Function)
            }
            TokenKind::Const => {
                self.advance();
                Some(UseKind::Constant)
            }
            _ => None,
        }
    }

    fn use_alias(&mut self) -> ParseResult<Option<String>> {
        if self.consume_if(TokenKind::As) {
            Ok(Some(self.consume_name()?.image))
        } else {
            Ok(None)
        }
    }
}
