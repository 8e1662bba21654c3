use php_depend_types::{Modifiers, TypeKind, Visibility};

use super::{Parser, TypeContext};
use crate::ast::{NodeId, NodeKind};
use crate::error::{ParseError, ParseResult};
use crate::phpdoc;
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use crate::unit::{ConstantDecl, FunctionDecl, MethodDecl, PropertyDecl, ReferenceKind, TypeDecl};

/// Lowercase names of the builtin types accepted in type declarations.
const SCALAR_TYPES: &[&str] = &[
    "int", "float", "bool", "string", "void", "never", "mixed", "object", "null", "false", "true",
];

/// Name given to anonymous classes for `self` and `static` bindings.
pub(crate) const ANONYMOUS_CLASS: &str = "class@anonymous";

/// Which doc-comment tags apply to a declaration.
#[derive(Debug, Clone, Copy)]
enum Annotated {
    Callable,
    Property,
}

/// A promoted constructor parameter.
struct Promoted {
    name: String,
    modifiers: Modifiers,
    node: NodeId,
}

impl<S: TokenStream> Parser<S> {
    // ── Types ───────────────────────────────────────────────────────

    /// `[abstract|final|readonly] class Name [extends P] [implements I, J] { ... }`
    pub(super) fn class_declaration(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        let modifiers = self.modifiers();
        self.consume(TokenKind::Class)?;
        let name = self.consume_identifier()?.image;
        let node = self.ast.alloc(NodeKind::ClassDeclaration, name.clone());
        let mut decl = self.new_type_decl(TypeKind::Class, name, node, modifiers, doc);

        let parent = self.extends_clause(node, &mut decl)?;
        if self.consume_if(TokenKind::Implements) {
            self.interface_list(node, &mut decl)?;
        }
        let context = TypeContext {
            fqn: decl.fqn(),
            kind: TypeKind::Class,
            parent,
        };
        self.type_body(node, &mut decl, context)?;
        self.register_type(node, decl);
        Ok(node)
    }

    /// `interface Name [extends A, B] { ... }`
    pub(super) fn interface_declaration(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        self.consume(TokenKind::Interface)?;
        let name = self.consume_identifier()?.image;
        let node = self.ast.alloc(NodeKind::InterfaceDeclaration, name.clone());
        let mut decl =
            self.new_type_decl(TypeKind::Interface, name, node, Modifiers::default(), doc);
        if self.consume_if(TokenKind::Extends) {
            self.interface_list(node, &mut decl)?;
        }
        let context = TypeContext {
            fqn: decl.fqn(),
            kind: TypeKind::Interface,
            parent: None,
        };
        self.type_body(node, &mut decl, context)?;
        self.register_type(node, decl);
        Ok(node)
    }

    /// `trait Name { ... }`
    pub(super) fn trait_declaration(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        self.consume(TokenKind::Trait)?;
        let name = self.consume_identifier()?.image;
        let node = self.ast.alloc(NodeKind::TraitDeclaration, name.clone());
        let mut decl = self.new_type_decl(TypeKind::Trait, name, node, Modifiers::default(), doc);
        let context = TypeContext {
            fqn: decl.fqn(),
            kind: TypeKind::Trait,
            parent: None,
        };
        self.type_body(node, &mut decl, context)?;
        self.register_type(node, decl);
        Ok(node)
    }

    /// `enum Name [: int|string] [implements I] { case A [= v]; ... }`
    pub(super) fn enum_declaration(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        self.consume(TokenKind::Enum)?;
        let name = self.consume_identifier()?.image;
        let node = self.ast.alloc(NodeKind::EnumDeclaration, name.clone());
        let mut decl = self.new_type_decl(TypeKind::Enum, name, node, Modifiers::default(), doc);
        if self.consume_if(TokenKind::Colon) {
            let backing = self.type_hint()?;
            decl.backing_type = Some(self.ast.image(backing).to_lowercase());
            self.ast.attach(node, backing);
        }
        if self.consume_if(TokenKind::Implements) {
            self.interface_list(node, &mut decl)?;
        }
        let context = TypeContext {
            fqn: decl.fqn(),
            kind: TypeKind::Enum,
            parent: None,
        };
        self.type_body(node, &mut decl, context)?;
        self.register_type(node, decl);
        Ok(node)
    }

    /// `new class(...) extends P implements I { ... }`. Not registered.
    pub(super) fn anonymous_class(&mut self, modifiers: Modifiers) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Class)?;
        let node = self.ast.alloc(NodeKind::AnonymousClass, ANONYMOUS_CLASS);
        self.ast.node_mut(node).modifiers = modifiers;
        if self.peek_kind() == TokenKind::ParenOpen {
            let arguments = self.arguments()?;
            self.ast.attach(node, arguments);
        }
        let mut decl = self.new_type_decl(
            TypeKind::Class,
            ANONYMOUS_CLASS.to_string(),
            node,
            modifiers,
            None,
        );
        decl.namespace = None;
        let parent = self.extends_clause(node, &mut decl)?;
        if self.consume_if(TokenKind::Implements) {
            self.interface_list(node, &mut decl)?;
        }
        let context = TypeContext {
            fqn: ANONYMOUS_CLASS.to_string(),
            kind: TypeKind::Class,
            parent,
        };
        self.type_body(node, &mut decl, context)?;
        self.finish(node);
        Ok(node)
    }

    fn new_type_decl(
        &self,
        kind: TypeKind,
        name: String,
        node: NodeId,
        modifiers: Modifiers,
        doc: Option<String>,
    ) -> TypeDecl {
        TypeDecl {
            kind,
            name,
            namespace: self.symbols.namespace().map(str::to_string),
            modifiers,
            node,
            parent: None,
            interfaces: Vec::new(),
            trait_uses: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
            cases: Vec::new(),
            backing_type: None,
            doc_comment: doc,
            position: Default::default(),
        }
    }

    fn register_type(&mut self, node: NodeId, mut decl: TypeDecl) {
        {
            let data = self.ast.node_mut(node);
            data.modifiers = decl.modifiers;
            data.comment = decl.doc_comment.clone();
        }
        self.finish(node);
        decl.position = self.ast.node(node).position;
        tracing::debug!(kind = %decl.kind, name = %decl.fqn(), "declared type");
        self.types.push(decl);
    }

    /// Optional `extends Parent`. Returns the parent's qualified name.
    fn extends_clause(&mut self, node: NodeId, decl: &mut TypeDecl) -> ParseResult<Option<String>> {
        if !self.consume_if(TokenKind::Extends) {
            return Ok(None);
        }
        let reference = self.class_reference(NodeKind::ClassReference, ReferenceKind::Class)?;
        decl.parent = self.ast.node(reference).reference;
        self.ast.attach(node, reference);
        Ok(decl.parent.map(|id| self.references[id.0 as usize].name.clone()))
    }

    fn interface_list(&mut self, node: NodeId, decl: &mut TypeDecl) -> ParseResult<()> {
        loop {
            let reference = self.class_reference(
                NodeKind::ClassOrInterfaceReference,
                ReferenceKind::Interface,
            )?;
            if let Some(id) = self.ast.node(reference).reference {
                decl.interfaces.push(id);
            }
            self.ast.attach(node, reference);
            if !self.consume_if(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    fn type_body(
        &mut self,
        node: NodeId,
        decl: &mut TypeDecl,
        context: TypeContext,
    ) -> ParseResult<()> {
        self.type_stack.push(Some(context));
        let result = self.members(node, decl);
        self.type_stack.pop();
        result
    }

    fn members(&mut self, node: NodeId, decl: &mut TypeDecl) -> ParseResult<()> {
        self.consume(TokenKind::CurlyOpen)?;
        loop {
            match self.peek_kind() {
                TokenKind::CurlyClose => break,
                TokenKind::Eof => return Err(self.unexpected()),
                TokenKind::AttributeOpen => self.skip_attributes()?,
                TokenKind::Use => {
                    let statement = self.trait_use_statement()?;
                    decl.trait_uses.push(statement);
                    self.ast.attach(node, statement);
                }
                TokenKind::Case if decl.kind == TypeKind::Enum => {
                    let case = self.enum_case(decl)?;
                    self.ast.attach(node, case);
                }
                _ => {
                    let member = self.member(decl)?;
                    self.ast.attach(node, member);
                }
            }
        }
        self.consume(TokenKind::CurlyClose)?;
        Ok(())
    }

    /// A method, property or class constant with its modifiers.
    fn member(&mut self, decl: &mut TypeDecl) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        let modifiers = self.modifiers();
        match self.peek_kind() {
            TokenKind::Const => self.class_constant(decl, modifiers, doc),
            TokenKind::Function => self.method(decl, modifiers, doc),
            _ => self.property(decl, modifiers, doc),
        }
    }

    /// Modifier keywords in any order. `var` means public.
    pub(super) fn modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek_kind() {
                TokenKind::Public | TokenKind::Var => {
                    modifiers.visibility = Some(Visibility::Public)
                }
                TokenKind::Protected => modifiers.visibility = Some(Visibility::Protected),
                TokenKind::Private => modifiers.visibility = Some(Visibility::Private),
                TokenKind::Static => modifiers.is_static = true,
                TokenKind::Abstract => modifiers.is_abstract = true,
                TokenKind::Final => modifiers.is_final = true,
                TokenKind::Readonly => modifiers.is_readonly = true,
                _ => return modifiers,
            }
            self.advance();
        }
    }

    // ── Members ─────────────────────────────────────────────────────

    fn method(
        &mut self,
        decl: &mut TypeDecl,
        mut modifiers: Modifiers,
        doc: Option<String>,
    ) -> ParseResult<NodeId> {
        self.consume(TokenKind::Function)?;
        let by_ref = self.consume_if(TokenKind::Ampersand);
        let name = self.consume_name()?.image;
        let node = self.ast.alloc(NodeKind::MethodDeclaration, name.clone());

        let (parameters, promoted) = self.formal_parameters()?;
        self.ast.attach(node, parameters);
        if self.consume_if(TokenKind::Colon) {
            let return_type = self.type_hint()?;
            self.ast.attach(node, return_type);
        }
        if self.peek_kind() == TokenKind::CurlyOpen {
            let body = self.block()?;
            self.ast.attach(node, body);
        } else {
            self.terminator()?;
            modifiers.is_abstract = true;
        }
        if decl.kind == TypeKind::Interface {
            modifiers.is_abstract = true;
        }

        {
            let data = self.ast.node_mut(node);
            data.modifiers = modifiers;
            data.flags.by_ref = by_ref;
            data.comment = doc.clone();
        }
        self.finish(node);
        self.annotate(node, doc.as_deref(), Annotated::Callable);

        if name.eq_ignore_ascii_case("__construct") {
            for param in promoted {
                let position = self.ast.node(param.node).position;
                decl.properties.push(PropertyDecl {
                    name: param.name,
                    modifiers: param.modifiers,
                    node: param.node,
                    position,
                });
            }
        }
        decl.methods.push(MethodDecl {
            name,
            modifiers,
            by_ref,
            node,
            doc_comment: doc,
            position: self.ast.node(node).position,
        });
        Ok(node)
    }

    /// `[type] $a [= v], $b;`
    fn property(
        &mut self,
        decl: &mut TypeDecl,
        modifiers: Modifiers,
        doc: Option<String>,
    ) -> ParseResult<NodeId> {
        let node = self.ast.alloc(NodeKind::FieldDeclaration, "");
        if self.peek_kind() != TokenKind::Variable {
            let hint = self.type_hint()?;
            self.ast.attach(node, hint);
        }
        loop {
            let declarator = self.variable_declarator()?;
            self.ast.attach(node, declarator);
            let data = self.ast.node(declarator);
            decl.properties.push(PropertyDecl {
                name: data.image.clone(),
                modifiers,
                node: declarator,
                position: data.position,
            });
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::Semicolon)?;
        {
            let data = self.ast.node_mut(node);
            data.modifiers = modifiers;
            data.comment = doc.clone();
        }
        self.finish(node);
        self.annotate(node, doc.as_deref(), Annotated::Property);
        Ok(node)
    }

    /// `$name [= default]`
    pub(super) fn variable_declarator(&mut self) -> ParseResult<NodeId> {
        self.start();
        let variable = self.consume(TokenKind::Variable)?;
        let node = self.ast.alloc(NodeKind::VariableDeclarator, variable.image);
        if self.peek_kind() == TokenKind::Assign {
            let assign = self.advance();
            let value = self.default_value(&assign)?;
            self.ast.attach(node, value);
        }
        self.finish(node);
        Ok(node)
    }

    /// `const [type] A = 1, B = 2;` inside a type body.
    fn class_constant(
        &mut self,
        decl: &mut TypeDecl,
        modifiers: Modifiers,
        doc: Option<String>,
    ) -> ParseResult<NodeId> {
        self.consume(TokenKind::Const)?;
        let node = self.ast.alloc(NodeKind::ConstantDefinition, "const");
        if self.peek_next_kind() != TokenKind::Assign {
            let hint = self.type_hint()?;
            self.ast.attach(node, hint);
        }
        for declarator in self.constant_declarators()? {
            self.ast.attach(node, declarator);
            let data = self.ast.node(declarator);
            decl.constants.push(ConstantDecl {
                name: data.image.clone(),
                modifiers,
                node: declarator,
                position: data.position,
            });
        }
        self.terminator()?;
        {
            let data = self.ast.node_mut(node);
            data.modifiers = modifiers;
            data.comment = doc;
        }
        self.finish(node);
        Ok(node)
    }

    /// `A = 1, B = 2`
    pub(super) fn constant_declarators(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut declarators = Vec::new();
        loop {
            self.start();
            let name = self.consume_name()?;
            let node = self.ast.alloc(NodeKind::ConstantDeclarator, name.image);
            let assign = self.consume(TokenKind::Assign)?;
            let value = self.default_value(&assign)?;
            self.ast.attach(node, value);
            self.finish(node);
            declarators.push(node);
            if !self.consume_if(TokenKind::Comma) {
                return Ok(declarators);
            }
        }
    }

    fn enum_case(&mut self, decl: &mut TypeDecl) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        self.consume(TokenKind::Case)?;
        let name = self.consume_name()?.image;
        let node = self.ast.alloc(NodeKind::EnumCase, name.clone());
        if self.peek_kind() == TokenKind::Assign {
            let assign = self.advance();
            let value = self.default_value(&assign)?;
            self.ast.attach(node, value);
        }
        self.terminator()?;
        self.ast.node_mut(node).comment = doc;
        self.finish(node);
        decl.cases.push(ConstantDecl {
            name,
            modifiers: Modifiers::default().with_visibility(Visibility::Public),
            node,
            position: self.ast.node(node).position,
        });
        Ok(node)
    }

    /// The expression after `=` in a parameter, property or constant.
    pub(super) fn default_value(&mut self, assign: &Token) -> ParseResult<NodeId> {
        match self.optional_expression()? {
            Some(value) => Ok(value),
            None => Err(self.missing_value(assign)),
        }
    }

    // ── Functions ───────────────────────────────────────────────────

    /// `function [&]name(params)[: type] { body }` at statement level.
    pub(super) fn function_declaration(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        self.start();
        self.consume(TokenKind::Function)?;
        let by_ref = self.consume_if(TokenKind::Ampersand);
        let name = self.consume_identifier()?.image;
        let node = self.ast.alloc(NodeKind::FunctionDeclaration, name.clone());

        self.type_stack.push(None);
        let body = self.function_body(node);
        self.type_stack.pop();
        body?;

        {
            let data = self.ast.node_mut(node);
            data.flags.by_ref = by_ref;
            data.comment = doc.clone();
        }
        self.finish(node);
        self.annotate(node, doc.as_deref(), Annotated::Callable);

        let function = FunctionDecl {
            name,
            namespace: self.symbols.namespace().map(str::to_string),
            by_ref,
            node,
            doc_comment: doc,
            position: self.ast.node(node).position,
        };
        tracing::debug!(name = %function.fqn(), "declared function");
        self.functions.push(function);
        Ok(node)
    }

    fn function_body(&mut self, node: NodeId) -> ParseResult<()> {
        let (parameters, _) = self.formal_parameters()?;
        self.ast.attach(node, parameters);
        if self.consume_if(TokenKind::Colon) {
            let return_type = self.type_hint()?;
            self.ast.attach(node, return_type);
        }
        let body = self.block()?;
        self.ast.attach(node, body);
        Ok(())
    }

    /// `(type &...$a = 1, public readonly int $b)`
    fn formal_parameters(&mut self) -> ParseResult<(NodeId, Vec<Promoted>)> {
        self.start();
        self.consume(TokenKind::ParenOpen)?;
        let node = self.ast.alloc(NodeKind::FormalParameters, "");
        let mut promoted = Vec::new();
        while self.peek_kind() != TokenKind::ParenClose {
            self.skip_attributes()?;
            let parameter = self.formal_parameter(&mut promoted)?;
            self.ast.attach(node, parameter);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok((node, promoted))
    }

    pub(super) fn closure_parameters(&mut self) -> ParseResult<NodeId> {
        Ok(self.formal_parameters()?.0)
    }

    fn formal_parameter(&mut self, promoted: &mut Vec<Promoted>) -> ParseResult<NodeId> {
        self.start();
        let node = self.ast.alloc(NodeKind::FormalParameter, "");
        let modifiers = self.modifiers();
        let is_promoted = modifiers.visibility.is_some() || modifiers.is_readonly;

        if !matches!(
            self.peek_kind(),
            TokenKind::Ampersand | TokenKind::Ellipsis | TokenKind::Variable
        ) {
            let hint = self.type_hint()?;
            self.ast.attach(node, hint);
        }
        let by_ref = self.consume_if(TokenKind::Ampersand);
        let variadic = self.consume_if(TokenKind::Ellipsis);
        let declarator = self.variable_declarator()?;
        self.ast.attach(node, declarator);
        let name = self.ast.image(declarator).to_string();

        {
            let data = self.ast.node_mut(node);
            data.image = name.clone();
            data.modifiers = modifiers;
            data.flags.by_ref = by_ref;
            data.flags.variadic = variadic;
            data.flags.promoted = is_promoted;
        }
        self.finish(node);
        if is_promoted {
            promoted.push(Promoted {
                name,
                modifiers,
                node,
            });
        }
        Ok(node)
    }

    // ── Type hints ──────────────────────────────────────────────────

    /// A parameter, property or return type, including `?T`, unions,
    /// intersections and DNF groups such as `(A&B)|null`.
    pub(super) fn type_hint(&mut self) -> ParseResult<NodeId> {
        if self.peek_kind() == TokenKind::Question {
            self.start();
            self.advance();
            let inner = self.single_type()?;
            let span = self.tracker.pop_span();
            self.set_position(inner, span);
            self.ast.node_mut(inner).flags.nullable = true;
            return Ok(inner);
        }

        let first = self.type_part()?;
        match self.peek_kind() {
            TokenKind::Pipe => {
                let node = self.ast.alloc(NodeKind::UnionType, "|");
                self.ast.attach(node, first);
                while self.consume_if(TokenKind::Pipe) {
                    let part = self.type_part()?;
                    self.ast.attach(node, part);
                }
                self.cover_children(node);
                Ok(node)
            }
            TokenKind::Ampersand if self.intersection_follows() => {
                let node = self.ast.alloc(NodeKind::IntersectionType, "&");
                self.ast.attach(node, first);
                while self.peek_kind() == TokenKind::Ampersand && self.intersection_follows() {
                    self.advance();
                    let part = self.single_type()?;
                    self.ast.attach(node, part);
                }
                self.cover_children(node);
                Ok(node)
            }
            _ => Ok(first),
        }
    }

    /// `&` followed by a parameter variable is a by-reference marker.
    fn intersection_follows(&mut self) -> bool {
        !matches!(
            self.peek_next_kind(),
            TokenKind::Variable | TokenKind::Ellipsis
        )
    }

    fn type_part(&mut self) -> ParseResult<NodeId> {
        if self.peek_kind() != TokenKind::ParenOpen {
            return self.single_type();
        }
        self.start();
        self.advance();
        let node = self.ast.alloc(NodeKind::IntersectionType, "&");
        loop {
            let part = self.single_type()?;
            self.ast.attach(node, part);
            if !self.consume_if(TokenKind::Ampersand) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok(node)
    }

    fn single_type(&mut self) -> ParseResult<NodeId> {
        match self.peek_kind() {
            TokenKind::Array => self.leaf(TokenKind::Array, NodeKind::TypeArray),
            TokenKind::Callable => self.leaf(TokenKind::Callable, NodeKind::TypeCallable),
            TokenKind::Static => self.static_reference(),
            TokenKind::SelfKeyword => self.self_reference(),
            TokenKind::Parent => self.parent_reference(),
            kind @ (TokenKind::Null | TokenKind::True | TokenKind::False) => {
                self.leaf(kind, NodeKind::ScalarType)
            }
            TokenKind::Identifier if self.peek_next_kind() != TokenKind::Backslash => {
                let lower = self.peek().image.to_lowercase();
                if lower == "iterable" {
                    self.leaf(TokenKind::Identifier, NodeKind::TypeIterable)
                } else if SCALAR_TYPES.contains(&lower.as_str()) {
                    self.leaf(TokenKind::Identifier, NodeKind::ScalarType)
                } else {
                    self.class_reference(
                        NodeKind::ClassOrInterfaceReference,
                        ReferenceKind::ClassOrInterface,
                    )
                }
            }
            _ => self.class_reference(
                NodeKind::ClassOrInterfaceReference,
                ReferenceKind::ClassOrInterface,
            ),
        }
    }

    // ── Trait composition ───────────────────────────────────────────

    /// `use A, B { A::m insteadof B; B::m as protected n; }`
    fn trait_use_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Use)?;
        let node = self.ast.alloc(NodeKind::TraitUseStatement, "use");
        loop {
            let reference = self.class_reference(NodeKind::TraitReference, ReferenceKind::Trait)?;
            self.ast.attach(node, reference);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        if self.peek_kind() == TokenKind::CurlyOpen {
            let adaptation = self.trait_adaptation()?;
            self.ast.attach(node, adaptation);
        } else {
            self.terminator()?;
        }
        self.finish(node);
        Ok(node)
    }

    fn trait_adaptation(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::CurlyOpen)?;
        let node = self.ast.alloc(NodeKind::TraitAdaptation, "");
        while self.peek_kind() != TokenKind::CurlyClose {
            let item = self.trait_adaptation_item()?;
            self.ast.attach(node, item);
        }
        self.consume(TokenKind::CurlyClose)?;
        self.finish(node);
        Ok(node)
    }

    /// One precedence (`T::m insteadof U`) or alias (`[T::]m as [vis] [n]`).
    ///
    /// Precedence nodes hold the winning trait followed by the excluded
    /// ones. Alias nodes hold the optional source trait and the optional
    /// new name as an `Identifier`; the new visibility is in `modifiers`.
    fn trait_adaptation_item(&mut self) -> ParseResult<NodeId> {
        self.start();
        let (source, method) = self.trait_method_reference()?;

        let node = match self.peek_kind() {
            TokenKind::Insteadof => {
                let Some(winner) = source else {
                    return Err(self.unexpected());
                };
                self.advance();
                let node = self
                    .ast
                    .alloc(NodeKind::TraitAdaptationPrecedence, method.clone());
                self.ast.attach(node, winner);
                loop {
                    let excluded =
                        self.class_reference(NodeKind::TraitReference, ReferenceKind::Trait)?;
                    self.ast.attach(node, excluded);
                    if !self.consume_if(TokenKind::Comma) {
                        break;
                    }
                }
                node
            }
            TokenKind::As => {
                self.advance();
                let node = self.ast.alloc(NodeKind::TraitAdaptationAlias, method.clone());
                if let Some(source) = source {
                    self.ast.attach(node, source);
                }
                let visibility = match self.peek_kind() {
                    TokenKind::Public => Some(Visibility::Public),
                    TokenKind::Protected => Some(Visibility::Protected),
                    TokenKind::Private => Some(Visibility::Private),
                    _ => None,
                };
                if visibility.is_some() {
                    self.advance();
                    self.ast.node_mut(node).modifiers.visibility = visibility;
                }
                let next = self.peek_kind();
                if next.is_name() {
                    let alias = self.leaf(next, NodeKind::Identifier)?;
                    self.ast.attach(node, alias);
                } else if visibility.is_none() {
                    return Err(self.unexpected());
                }
                node
            }
            _ => return Err(self.unexpected()),
        };
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `Trait::method` or a bare `method`.
    fn trait_method_reference(&mut self) -> ParseResult<(Option<NodeId>, String)> {
        if !self.at_name() {
            return Ok((None, self.consume_name()?.image));
        }
        self.start();
        let written = self.qualified_name()?;
        if self.peek_kind() != TokenKind::DoubleColon {
            self.tracker.pop_span();
            return Ok((None, written));
        }
        let fqn = self.symbols.resolve_class(&written);
        let reference = self.ast.alloc(NodeKind::TraitReference, fqn.clone());
        self.add_reference(reference, fqn, ReferenceKind::Trait);
        self.finish(reference);
        self.consume(TokenKind::DoubleColon)?;
        let method = self.consume_name()?.image;
        Ok((Some(reference), method))
    }

    // ── Attributes and annotations ──────────────────────────────────

    /// Skip `#[...]` groups. A doc comment before them stays pending.
    pub(super) fn skip_attributes(&mut self) -> ParseResult<()> {
        let doc = self.doc.take();
        while self.peek_kind() == TokenKind::AttributeOpen {
            self.advance();
            let mut depth = 1;
            while depth > 0 {
                let token = self.advance();
                match token.kind {
                    TokenKind::SquareOpen | TokenKind::AttributeOpen => depth += 1,
                    TokenKind::SquareClose => depth -= 1,
                    TokenKind::Eof => return Err(ParseError::unexpected(&self.file, &token)),
                    _ => {}
                }
            }
        }
        if doc.is_some() {
            self.doc = doc;
        }
        Ok(())
    }

    /// Attach class names from doc-comment tags as annotation references.
    fn annotate(&mut self, node: NodeId, doc: Option<&str>, annotated: Annotated) {
        if self.options.ignore_annotations {
            return;
        }
        let Some(doc) = doc else {
            return;
        };
        let types = phpdoc::parse_annotations(doc);
        let names = match annotated {
            Annotated::Callable => types.returns.into_iter().chain(types.throws).collect(),
            Annotated::Property => types.vars,
        };
        let position = self.ast.node(node).position.start();
        for name in names {
            let fqn = self.symbols.resolve_class(&name);
            let reference = self
                .ast
                .alloc(NodeKind::ClassOrInterfaceReference, fqn.clone());
            {
                let data = self.ast.node_mut(reference);
                data.position = position;
                data.flags.annotation = true;
            }
            self.add_reference(reference, fqn, ReferenceKind::ClassOrInterface);
            self.ast.attach(node, reference);
        }
    }
}
