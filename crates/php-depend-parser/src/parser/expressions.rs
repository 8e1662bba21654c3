//! Expressions.
//!
//! An expression is read as a flat list of operands and operator nodes.
//! Assignments, ternaries and postfix increments restructure the list as
//! they are read; everything else is left flat. A final reduction folds
//! pending unary operators and casts onto the operand that follows them
//! and collapses the list into zero, one or an N-ary `Expression` node.

use php_depend_types::{Modifiers, Position};

use super::Parser;
use crate::ast::{NodeId, NodeKind};
use crate::error::ParseResult;
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use crate::unit::ReferenceKind;

impl<S: TokenStream> Parser<S> {
    /// A required expression.
    pub(super) fn expression(&mut self) -> ParseResult<NodeId> {
        match self.optional_expression()? {
            Some(expression) => Ok(expression),
            None => Err(self.unexpected()),
        }
    }

    /// An expression, or `None` when the next token cannot start one.
    pub(super) fn optional_expression(&mut self) -> ParseResult<Option<NodeId>> {
        let list = self.expression_list()?;
        Ok(self.reduce(list))
    }

    fn expression_list(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut list: Vec<NodeId> = Vec::new();
        loop {
            let kind = self.peek_kind();
            let node = match kind {
                _ if kind.is_assignment() => {
                    let Some(target) = list.pop().filter(|&last| !self.is_operator(last)) else {
                        return Err(self.unexpected());
                    };
                    self.assignment(target)?
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    match list.last().copied().filter(|&last| self.is_storable(last)) {
                        Some(target) => {
                            list.pop();
                            self.postfix_expression(target)
                        }
                        None => self.prefix_expression()?,
                    }
                }
                TokenKind::Plus | TokenKind::Minus if self.expects_operand(&list) => {
                    self.leaf(kind, NodeKind::UnaryExpression)?
                }
                TokenKind::Plus | TokenKind::Minus => self.leaf(kind, NodeKind::Operator)?,
                TokenKind::BooleanNot | TokenKind::Tilde | TokenKind::At => {
                    self.leaf(kind, NodeKind::UnaryExpression)?
                }
                TokenKind::Cast => self.cast()?,
                _ if kind.is_binary_operator() => self.leaf(kind, NodeKind::Operator)?,
                TokenKind::BooleanAnd => self.leaf(kind, NodeKind::BooleanAndExpression)?,
                TokenKind::BooleanOr => self.leaf(kind, NodeKind::BooleanOrExpression)?,
                TokenKind::LogicalAnd => self.leaf(kind, NodeKind::LogicalAndExpression)?,
                TokenKind::LogicalOr => self.leaf(kind, NodeKind::LogicalOrExpression)?,
                TokenKind::LogicalXor => self.leaf(kind, NodeKind::LogicalXorExpression)?,
                TokenKind::Question if !list.is_empty() => self.conditional()?,
                TokenKind::Instanceof if !list.is_empty() => self.instance_of()?,
                _ if self.expects_operand(&list) && self.starts_operand(kind) => self.operand()?,
                _ => break,
            };
            list.push(node);
        }
        Ok(list)
    }

    /// Fold pending unary nodes onto their operand and collapse the list.
    fn reduce(&mut self, list: Vec<NodeId>) -> Option<NodeId> {
        let mut folded: Vec<NodeId> = Vec::with_capacity(list.len());
        for id in list.into_iter().rev() {
            if self.is_pending_unary(id) {
                if let Some(operand) = folded.last().copied() {
                    if !self.is_operator(operand) {
                        folded.pop();
                        self.ast.attach(id, operand);
                        self.cover_children(id);
                    }
                }
            }
            folded.push(id);
        }
        folded.reverse();

        match folded.len() {
            0 => None,
            1 => Some(folded[0]),
            _ => {
                let node = self.ast.alloc(NodeKind::Expression, "");
                self.ast.attach_all(node, folded);
                self.cover_children(node);
                Some(node)
            }
        }
    }

    fn is_pending_unary(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::UnaryExpression | NodeKind::CastExpression
        ) && self.ast.children(id).is_empty()
    }

    fn is_operator(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::Operator
                | NodeKind::BooleanAndExpression
                | NodeKind::BooleanOrExpression
                | NodeKind::LogicalAndExpression
                | NodeKind::LogicalOrExpression
                | NodeKind::LogicalXorExpression
        )
    }

    /// Whether the next token begins an operand rather than an operator.
    fn expects_operand(&self, list: &[NodeId]) -> bool {
        match list.last() {
            None => true,
            Some(&last) => self.is_operator(last) || self.is_pending_unary(last),
        }
    }

    /// Locations an increment can apply to in postfix position.
    fn is_storable(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::Variable
                | NodeKind::VariableVariable
                | NodeKind::CompoundVariable
                | NodeKind::FunctionPostfix
                | NodeKind::MemberPrimaryPrefix
                | NodeKind::ArrayIndexExpression
        )
    }

    fn starts_operand(&mut self, kind: TokenKind) -> bool {
        use TokenKind::*;
        match kind {
            Variable | Dollar | Identifier | Backslash | LNumber | DNumber
            | ConstantEncapsedString | EncapsedString | Heredoc | Nowdoc | ShellExec | Null
            | True | False | ParenOpen | SquareOpen | Array | List | New | Clone | Function
            | Fn | Static | SelfKeyword | Parent | Isset | Empty | Eval | Exit | Include
            | IncludeOnce | Require | RequireOnce | Print | Yield | Throw | Match | Enum
            | Readonly => true,
            Namespace => self.peek_next_kind() == Backslash,
            _ => false,
        }
    }

    // ── Operators ───────────────────────────────────────────────────

    /// `target = value`, `target =& value` and compound assignments.
    fn assignment(&mut self, target: NodeId) -> ParseResult<NodeId> {
        let token = self.advance();
        let mut image = token.image;
        if token.kind == TokenKind::Assign && self.consume_if(TokenKind::Ampersand) {
            image = "=&".to_string();
        }
        let node = self.ast.alloc(NodeKind::AssignmentExpression, image);
        self.ast.attach(node, target);
        let value = self.expression()?;
        self.ast.attach(node, value);
        self.cover_children(node);
        Ok(node)
    }

    fn postfix_expression(&mut self, target: NodeId) -> NodeId {
        let token = self.advance();
        let node = self.ast.alloc(NodeKind::PostfixExpression, token.image);
        self.ast.attach(node, target);
        self.set_position(node, token.position);
        node
    }

    fn prefix_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        let token = self.advance();
        let kind = if token.kind == TokenKind::Increment {
            NodeKind::PreIncrementExpression
        } else {
            NodeKind::PreDecrementExpression
        };
        let node = self.ast.alloc(kind, token.image);
        let operand = self.operand()?;
        self.ast.attach(node, operand);
        self.finish(node);
        Ok(node)
    }

    /// `(int)` and friends, normalized to lowercase without blanks.
    fn cast(&mut self) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(TokenKind::Cast)?;
        let image: String = token
            .image
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let node = self.ast.alloc(NodeKind::CastExpression, image);
        self.finish(node);
        Ok(node)
    }

    /// `? then : else` following the condition, or the short `?:` form.
    fn conditional(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Question)?;
        let node = self.ast.alloc(NodeKind::ConditionalExpression, "?");
        if !self.consume_if(TokenKind::Colon) {
            let then = self.expression()?;
            self.ast.attach(node, then);
            self.consume(TokenKind::Colon)?;
        }
        let otherwise = self.expression()?;
        self.ast.attach(node, otherwise);
        self.finish(node);
        Ok(node)
    }

    fn instance_of(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Instanceof)?;
        let node = self.ast.alloc(NodeKind::InstanceOfExpression, "instanceof");
        let class = match self.peek_kind() {
            TokenKind::Variable | TokenKind::Dollar | TokenKind::ParenOpen => self.operand()?,
            _ => self.class_reference(
                NodeKind::ClassOrInterfaceReference,
                ReferenceKind::ClassOrInterface,
            )?,
        };
        self.ast.attach(node, class);
        self.finish(node);
        Ok(node)
    }

    // ── Operands ────────────────────────────────────────────────────

    /// A primary expression followed by any member, index and call postfixes.
    pub(super) fn operand(&mut self) -> ParseResult<NodeId> {
        let primary = self.primary()?;
        self.postfix_chain(primary, true)
    }

    fn postfix_chain(&mut self, mut node: NodeId, allow_call: bool) -> ParseResult<NodeId> {
        loop {
            node = match self.peek_kind() {
                TokenKind::Arrow | TokenKind::NullsafeArrow => {
                    self.member_access(node, allow_call)?
                }
                TokenKind::DoubleColon => self.static_access(node, allow_call)?,
                TokenKind::SquareOpen => self.index_access(node)?,
                TokenKind::ParenOpen if allow_call => {
                    self.start();
                    let call = self.ast.alloc(NodeKind::FunctionPostfix, "");
                    self.ast.attach(call, node);
                    let arguments = self.arguments()?;
                    self.ast.attach(call, arguments);
                    self.finish(call);
                    call
                }
                _ => return Ok(node),
            };
        }
    }

    /// `left->name`, `left?->name(...)`, `left->$name`, `left->{expr}`.
    fn member_access(&mut self, left: NodeId, allow_call: bool) -> ParseResult<NodeId> {
        self.start();
        let arrow = self.advance();
        let node = self.ast.alloc(NodeKind::MemberPrimaryPrefix, arrow.image);
        self.ast.node_mut(node).flags.nullsafe = arrow.kind == TokenKind::NullsafeArrow;
        self.ast.attach(node, left);

        self.start();
        let (image, child) = match self.peek_kind() {
            TokenKind::Variable => {
                let variable = self.leaf(TokenKind::Variable, NodeKind::Variable)?;
                (self.ast.image(variable).to_string(), Some(variable))
            }
            TokenKind::CurlyOpen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(TokenKind::CurlyClose)?;
                (String::new(), Some(expression))
            }
            kind if kind.is_name() => (self.advance().image, None),
            _ => return Err(self.unexpected()),
        };
        let is_call = allow_call && self.peek_kind() == TokenKind::ParenOpen;
        let kind = if is_call {
            NodeKind::MethodPostfix
        } else {
            NodeKind::PropertyPostfix
        };
        let postfix = self.ast.alloc(kind, image);
        if let Some(child) = child {
            self.ast.attach(postfix, child);
        }
        if is_call {
            let arguments = self.arguments()?;
            self.ast.attach(postfix, arguments);
        }
        self.finish(postfix);

        self.ast.attach(node, postfix);
        self.finish(node);
        Ok(node)
    }

    /// `left::CONST`, `left::$prop`, `left::method()`, `left::class`.
    fn static_access(&mut self, left: NodeId, allow_call: bool) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::DoubleColon)?;
        let node = self.ast.alloc(NodeKind::MemberPrimaryPrefix, "::");
        self.ast.attach(node, left);

        self.start();
        let postfix = match self.peek_kind() {
            TokenKind::Class => {
                let token = self.advance();
                self.ast.alloc(NodeKind::ClassFqnPostfix, token.image)
            }
            TokenKind::Variable => {
                let variable = self.leaf(TokenKind::Variable, NodeKind::Variable)?;
                let image = self.ast.image(variable).to_string();
                let kind = if allow_call && self.peek_kind() == TokenKind::ParenOpen {
                    NodeKind::MethodPostfix
                } else {
                    NodeKind::PropertyPostfix
                };
                let postfix = self.ast.alloc(kind, image);
                self.ast.attach(postfix, variable);
                postfix
            }
            TokenKind::CurlyOpen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(TokenKind::CurlyClose)?;
                let postfix = self.ast.alloc(NodeKind::MethodPostfix, "");
                self.ast.attach(postfix, expression);
                postfix
            }
            kind if kind.is_name() => {
                let token = self.advance();
                let kind = if self.peek_kind() == TokenKind::ParenOpen {
                    NodeKind::MethodPostfix
                } else {
                    NodeKind::ConstantPostfix
                };
                self.ast.alloc(kind, token.image)
            }
            _ => return Err(self.unexpected()),
        };
        if self.ast.kind(postfix) == NodeKind::MethodPostfix {
            let arguments = self.arguments()?;
            self.ast.attach(postfix, arguments);
        }
        self.finish(postfix);

        self.ast.attach(node, postfix);
        self.finish(node);
        Ok(node)
    }

    /// `left[index]`, or `left[]` when appending.
    fn index_access(&mut self, left: NodeId) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::SquareOpen)?;
        let node = self.ast.alloc(NodeKind::ArrayIndexExpression, "[");
        self.ast.attach(node, left);
        if self.peek_kind() != TokenKind::SquareClose {
            let index = self.expression()?;
            self.ast.attach(node, index);
        }
        self.consume(TokenKind::SquareClose)?;
        self.finish(node);
        Ok(node)
    }

    fn primary(&mut self) -> ParseResult<NodeId> {
        let kind = self.peek_kind();
        match kind {
            TokenKind::Variable => self.leaf(kind, NodeKind::Variable),
            TokenKind::Dollar => self.variable_variable(),
            TokenKind::LNumber
            | TokenKind::DNumber
            | TokenKind::ConstantEncapsedString
            | TokenKind::Nowdoc
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False => self.leaf(kind, NodeKind::Literal),
            TokenKind::EncapsedString => self.interpolated(kind, NodeKind::StringLiteral),
            TokenKind::Heredoc => self.interpolated(kind, NodeKind::HeredocString),
            TokenKind::ShellExec => self.interpolated(kind, NodeKind::ShellExec),
            TokenKind::ParenOpen => {
                self.start();
                self.advance();
                let node = self.ast.alloc(NodeKind::Expression, "(");
                let inner = self.expression()?;
                self.ast.attach(node, inner);
                self.consume(TokenKind::ParenClose)?;
                self.finish(node);
                Ok(node)
            }
            TokenKind::SquareOpen => self.array_literal(),
            TokenKind::Array if self.peek_next_kind() == TokenKind::ParenOpen => {
                self.array_literal()
            }
            TokenKind::List => self.list_expression(),
            TokenKind::New => self.allocation(),
            TokenKind::Clone => {
                self.start();
                self.advance();
                let node = self.ast.alloc(NodeKind::CloneExpression, "clone");
                let operand = self.operand()?;
                self.ast.attach(node, operand);
                self.finish(node);
                Ok(node)
            }
            TokenKind::Function => self.closure(),
            TokenKind::Fn => self.arrow_function(),
            TokenKind::Static => match self.peek_next_kind() {
                TokenKind::Function => self.closure(),
                TokenKind::Fn => self.arrow_function(),
                _ => self.static_reference(),
            },
            TokenKind::SelfKeyword => self.self_reference(),
            TokenKind::Parent => self.parent_reference(),
            TokenKind::Isset => self.isset_expression(),
            TokenKind::Empty => self.parenthesized_keyword(NodeKind::EmptyExpression),
            TokenKind::Eval => self.parenthesized_keyword(NodeKind::EvalExpression),
            TokenKind::Exit => self.exit_expression(),
            TokenKind::Include | TokenKind::IncludeOnce => {
                self.keyword_expression(NodeKind::IncludeExpression)
            }
            TokenKind::Require | TokenKind::RequireOnce => {
                self.keyword_expression(NodeKind::RequireExpression)
            }
            TokenKind::Print => self.keyword_expression(NodeKind::PrintExpression),
            TokenKind::Throw => self.keyword_expression(NodeKind::ThrowExpression),
            TokenKind::Yield => self.yield_expression(),
            TokenKind::Match if self.peek_next_kind() == TokenKind::ParenOpen => {
                self.match_expression()
            }
            _ if self.at_name() || kind == TokenKind::Match => self.name_expression(),
            _ => Err(self.unexpected()),
        }
    }

    /// A function call, a class reference before `::`, or a constant.
    fn name_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        let written = self.qualified_name()?;
        let node = match self.peek_kind() {
            TokenKind::ParenOpen => {
                let name = self.symbols.resolve_function(&written);
                let node = self.ast.alloc(NodeKind::FunctionPostfix, name);
                let arguments = self.arguments()?;
                self.ast.attach(node, arguments);
                node
            }
            TokenKind::DoubleColon => {
                let fqn = self.symbols.resolve_class(&written);
                let node = self.ast.alloc(NodeKind::ClassReference, fqn.clone());
                self.add_reference(node, fqn, ReferenceKind::Class);
                node
            }
            _ => {
                let name = self.symbols.resolve_constant(&written);
                self.ast.alloc(NodeKind::ConstantReference, name)
            }
        };
        self.finish(node);
        Ok(node)
    }

    /// `$name` or a variable variable.
    pub(super) fn simple_variable(&mut self) -> ParseResult<NodeId> {
        match self.peek_kind() {
            TokenKind::Variable => self.leaf(TokenKind::Variable, NodeKind::Variable),
            TokenKind::Dollar => self.variable_variable(),
            _ => Err(self.unexpected()),
        }
    }

    /// `$$name` or `${expr}`.
    fn variable_variable(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Dollar)?;
        let node = if self.consume_if(TokenKind::CurlyOpen) {
            let node = self.ast.alloc(NodeKind::CompoundVariable, "$");
            let expression = self.expression()?;
            self.ast.attach(node, expression);
            self.consume(TokenKind::CurlyClose)?;
            node
        } else {
            let node = self.ast.alloc(NodeKind::VariableVariable, "$");
            let inner = self.simple_variable()?;
            self.ast.attach(node, inner);
            node
        };
        self.finish(node);
        Ok(node)
    }

    /// A string that embeds variables. Each `$name` becomes a `Variable` child.
    fn interpolated(&mut self, token_kind: TokenKind, node_kind: NodeKind) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(token_kind)?;
        let node = self.ast.alloc(node_kind, token.image.clone());
        for (name, position) in embedded_variables(&token) {
            let variable = self.ast.alloc(NodeKind::Variable, name);
            self.ast.node_mut(variable).position = position;
            self.ast.attach(node, variable);
        }
        self.finish(node);
        Ok(node)
    }

    // ── Arrays ──────────────────────────────────────────────────────

    /// `[...]` or `array(...)`.
    fn array_literal(&mut self) -> ParseResult<NodeId> {
        self.start();
        let (image, close) = if self.consume_if(TokenKind::SquareOpen) {
            ("[", TokenKind::SquareClose)
        } else {
            self.consume(TokenKind::Array)?;
            self.consume(TokenKind::ParenOpen)?;
            ("array", TokenKind::ParenClose)
        };
        let node = self.ast.alloc(NodeKind::ArrayLiteral, image);
        self.array_elements(node, close)?;
        self.consume(close)?;
        self.finish(node);
        Ok(node)
    }

    /// `list($a, , [$b, $c])`
    fn list_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::List)?;
        self.consume(TokenKind::ParenOpen)?;
        let node = self.ast.alloc(NodeKind::ListExpression, "list");
        self.array_elements(node, TokenKind::ParenClose)?;
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok(node)
    }

    fn array_elements(&mut self, node: NodeId, close: TokenKind) -> ParseResult<()> {
        while self.peek_kind() != close {
            if self.consume_if(TokenKind::Comma) {
                continue;
            }
            let element = self.array_element()?;
            self.ast.attach(node, element);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// `value`, `key => value`, `&$ref`, `key => &$ref` or `...$spread`.
    fn array_element(&mut self) -> ParseResult<NodeId> {
        self.start();
        let node = self.ast.alloc(NodeKind::ArrayElement, "");
        if self.consume_if(TokenKind::Ellipsis) {
            self.ast.node_mut(node).flags.variadic = true;
        } else if self.peek_kind() != TokenKind::Ampersand {
            let first = self.expression()?;
            self.ast.attach(node, first);
            if !self.consume_if(TokenKind::DoubleArrow) {
                self.finish(node);
                return Ok(node);
            }
        }
        if self.consume_if(TokenKind::Ampersand) {
            self.ast.node_mut(node).flags.by_ref = true;
        }
        let value = self.expression()?;
        self.ast.attach(node, value);
        self.finish(node);
        Ok(node)
    }

    // ── Allocation and closures ─────────────────────────────────────

    /// `new Name(...)`, `new $var`, `new (expr)`, `new static` and
    /// anonymous classes.
    fn allocation(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::New)?;
        let node = self.ast.alloc(NodeKind::AllocationExpression, "new");

        let class = match self.peek_kind() {
            TokenKind::Class => self.anonymous_class(Modifiers::default())?,
            TokenKind::Readonly | TokenKind::Final | TokenKind::Abstract
                if self.peek_next_kind() == TokenKind::Class =>
            {
                let modifiers = self.modifiers();
                self.anonymous_class(modifiers)?
            }
            TokenKind::Variable | TokenKind::Dollar => {
                let variable = self.simple_variable()?;
                self.postfix_chain(variable, false)?
            }
            TokenKind::ParenOpen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(TokenKind::ParenClose)?;
                expression
            }
            _ => self.class_reference(NodeKind::ClassReference, ReferenceKind::Class)?,
        };
        self.ast.attach(node, class);

        if self.ast.kind(class) != NodeKind::AnonymousClass
            && self.peek_kind() == TokenKind::ParenOpen
        {
            let arguments = self.arguments()?;
            self.ast.attach(node, arguments);
        }
        self.finish(node);
        Ok(node)
    }

    /// `[static] function [&](params) [use (...)] [: type] { body }`
    fn closure(&mut self) -> ParseResult<NodeId> {
        self.start();
        let is_static = self.consume_if(TokenKind::Static);
        self.consume(TokenKind::Function)?;
        let by_ref = self.consume_if(TokenKind::Ampersand);
        let node = self.ast.alloc(NodeKind::Closure, "function");
        {
            let flags = &mut self.ast.node_mut(node).flags;
            flags.static_closure = is_static;
            flags.by_ref = by_ref;
        }

        let parameters = self.closure_parameters()?;
        self.ast.attach(node, parameters);

        if self.peek_kind() == TokenKind::Use {
            self.start();
            self.advance();
            let uses = self.ast.alloc(NodeKind::ClosureUses, "use");
            self.consume(TokenKind::ParenOpen)?;
            while self.peek_kind() != TokenKind::ParenClose {
                self.start();
                let by_ref = self.consume_if(TokenKind::Ampersand);
                let token = self.consume(TokenKind::Variable)?;
                let variable = self.ast.alloc(NodeKind::Variable, token.image);
                self.ast.node_mut(variable).flags.by_ref = by_ref;
                self.finish(variable);
                self.ast.attach(uses, variable);
                if !self.consume_if(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::ParenClose)?;
            self.finish(uses);
            self.ast.attach(node, uses);
        }

        if self.consume_if(TokenKind::Colon) {
            let return_type = self.type_hint()?;
            self.ast.attach(node, return_type);
        }
        let body = self.block()?;
        self.ast.attach(node, body);
        self.finish(node);
        Ok(node)
    }

    /// `[static] fn [&](params) [: type] => expression`
    fn arrow_function(&mut self) -> ParseResult<NodeId> {
        self.start();
        let is_static = self.consume_if(TokenKind::Static);
        self.consume(TokenKind::Fn)?;
        let by_ref = self.consume_if(TokenKind::Ampersand);
        let node = self.ast.alloc(NodeKind::ArrowFunction, "fn");
        {
            let flags = &mut self.ast.node_mut(node).flags;
            flags.static_closure = is_static;
            flags.by_ref = by_ref;
        }
        let parameters = self.closure_parameters()?;
        self.ast.attach(node, parameters);
        if self.consume_if(TokenKind::Colon) {
            let return_type = self.type_hint()?;
            self.ast.attach(node, return_type);
        }
        self.consume(TokenKind::DoubleArrow)?;
        let body = self.expression()?;
        self.ast.attach(node, body);
        self.finish(node);
        Ok(node)
    }

    // ── Calls ───────────────────────────────────────────────────────

    /// `(a, name: b, ...$rest)` or the first-class callable form `(...)`.
    pub(super) fn arguments(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::ParenOpen)?;
        let node = self.ast.alloc(NodeKind::Arguments, "");
        if self.peek_kind() == TokenKind::Ellipsis
            && self.peek_next_kind() == TokenKind::ParenClose
        {
            self.advance();
            self.ast.node_mut(node).flags.variadic = true;
        }
        while self.peek_kind() != TokenKind::ParenClose {
            let argument = self.argument()?;
            self.ast.attach(node, argument);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok(node)
    }

    fn argument(&mut self) -> ParseResult<NodeId> {
        if self.peek_kind().is_name() && self.peek_next_kind() == TokenKind::Colon {
            self.start();
            let name = self.advance();
            self.consume(TokenKind::Colon)?;
            let node = self.ast.alloc(NodeKind::NamedArgument, name.image);
            let value = self.expression()?;
            self.ast.attach(node, value);
            self.finish(node);
            return Ok(node);
        }
        if self.peek_kind() != TokenKind::Ellipsis {
            return self.expression();
        }
        self.start();
        self.advance();
        let value = self.expression()?;
        let span = self.tracker.pop_span();
        self.set_position(value, span);
        self.ast.node_mut(value).flags.variadic = true;
        Ok(value)
    }

    fn isset_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Isset)?;
        let node = self.ast.alloc(NodeKind::IssetExpression, "isset");
        self.consume(TokenKind::ParenOpen)?;
        while self.peek_kind() != TokenKind::ParenClose {
            let value = self.expression()?;
            self.ast.attach(node, value);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok(node)
    }

    /// `empty(expr)` and `eval(expr)`.
    fn parenthesized_keyword(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        self.start();
        let keyword = self.advance();
        let node = self.ast.alloc(kind, keyword.image.to_lowercase());
        self.consume(TokenKind::ParenOpen)?;
        let value = self.expression()?;
        self.ast.attach(node, value);
        self.consume(TokenKind::ParenClose)?;
        self.finish(node);
        Ok(node)
    }

    /// `exit`, `exit(1)`, `die("message")`.
    fn exit_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        let keyword = self.consume(TokenKind::Exit)?;
        let node = self
            .ast
            .alloc(NodeKind::ExitExpression, keyword.image.to_lowercase());
        if self.consume_if(TokenKind::ParenOpen) {
            if let Some(value) = self.optional_expression()? {
                self.ast.attach(node, value);
            }
            self.consume(TokenKind::ParenClose)?;
        }
        self.finish(node);
        Ok(node)
    }

    /// `include`, `require`, `print` and `throw`, each taking one expression.
    fn keyword_expression(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        self.start();
        let keyword = self.advance();
        let node = self.ast.alloc(kind, keyword.image.to_lowercase());
        let value = self.expression()?;
        self.ast.attach(node, value);
        self.finish(node);
        Ok(node)
    }

    /// `yield`, `yield value`, `yield key => value` and `yield from source`.
    fn yield_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Yield)?;
        let delegates = self.peek_kind() == TokenKind::Identifier
            && self.peek().image.eq_ignore_ascii_case("from");
        if delegates {
            self.advance();
            let node = self.ast.alloc(NodeKind::YieldExpression, "yield from");
            let source = self.expression()?;
            self.ast.attach(node, source);
            self.finish(node);
            return Ok(node);
        }

        let node = self.ast.alloc(NodeKind::YieldExpression, "yield");
        if let Some(first) = self.optional_expression()? {
            self.ast.attach(node, first);
            if self.consume_if(TokenKind::DoubleArrow) {
                let value = self.expression()?;
                self.ast.attach(node, value);
            }
        }
        self.finish(node);
        Ok(node)
    }

    /// `match (subject) { a, b => x, default => y }`
    fn match_expression(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Match)?;
        let node = self.ast.alloc(NodeKind::MatchExpression, "match");
        self.consume(TokenKind::ParenOpen)?;
        let subject = self.expression()?;
        self.ast.attach(node, subject);
        self.consume(TokenKind::ParenClose)?;

        self.start();
        self.consume(TokenKind::CurlyOpen)?;
        let block = self.ast.alloc(NodeKind::MatchBlock, "");
        while self.peek_kind() != TokenKind::CurlyClose {
            let entry = self.match_entry()?;
            self.ast.attach(block, entry);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::CurlyClose)?;
        self.finish(block);
        self.ast.attach(node, block);
        self.finish(node);
        Ok(node)
    }

    fn match_entry(&mut self) -> ParseResult<NodeId> {
        self.start();
        let node = self.ast.alloc(NodeKind::MatchEntry, "");
        if self.consume_if(TokenKind::Default) {
            self.ast.node_mut(node).image = "default".to_string();
            self.consume_if(TokenKind::Comma);
        } else {
            loop {
                let condition = self.expression()?;
                self.ast.attach(node, condition);
                if !self.consume_if(TokenKind::Comma)
                    || self.peek_kind() == TokenKind::DoubleArrow
                {
                    break;
                }
            }
        }
        self.consume(TokenKind::DoubleArrow)?;
        let result = self.expression()?;
        self.ast.attach(node, result);
        self.finish(node);
        Ok(node)
    }
}

/// `$name` occurrences inside a double-quoted string, heredoc or backtick
/// token, with their source positions. `${name}` counts as `$name`.
fn embedded_variables(token: &Token) -> Vec<(String, Position)> {
    let chars: Vec<char> = token.image.chars().collect();
    let mut positions = Vec::with_capacity(chars.len());
    let (mut line, mut column) = (token.position.start_line, token.position.start_column);
    for &c in &chars {
        positions.push((line, column));
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    let is_start = |c: &char| c.is_alphabetic() || *c == '_';
    let is_part = |c: &char| c.is_alphanumeric() || *c == '_';

    let mut variables = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '$' => {
                let braced = chars.get(i + 1) == Some(&'{');
                let name_start = if braced { i + 2 } else { i + 1 };
                let mut end = name_start;
                if chars.get(end).is_some_and(is_start) {
                    end += 1;
                    while chars.get(end).is_some_and(is_part) {
                        end += 1;
                    }
                }
                if end == name_start {
                    i += 1;
                    continue;
                }
                let name: String = std::iter::once('$')
                    .chain(chars[name_start..end].iter().copied())
                    .collect();
                let last = if braced && chars.get(end) == Some(&'}') {
                    end
                } else {
                    end - 1
                };
                let (start_line, start_column) = positions[i];
                let (end_line, end_column) = positions[last];
                variables.push((
                    name,
                    Position::new(start_line, start_column, end_line, end_column),
                ));
                i = last + 1;
            }
            _ => i += 1,
        }
    }
    variables
}

#[cfg(test)]
mod tests {
    use php_depend_types::Position;

    use super::super::tests::{parse, parse_err};
    use crate::ast::{NodeId, NodeKind};
    use crate::error::ParseError;
    use crate::unit::{ReferenceKind, SourceUnit};

    /// The expression of the first statement in the file.
    fn first_expression(unit: &SourceUnit) -> NodeId {
        let statement = unit
            .ast
            .find_first_of_type(unit.root, NodeKind::Statement)
            .expect("statement");
        unit.ast.children(statement)[0]
    }

    fn kinds(unit: &SourceUnit, ids: &[NodeId]) -> Vec<NodeKind> {
        ids.iter().map(|&id| unit.ast.kind(id)).collect()
    }

    #[test]
    fn test_flat_list_with_unary_fold() {
        let unit = parse("<?php -$a + !$b * (int) $c;");
        let expression = first_expression(&unit);
        let ast = &unit.ast;
        assert_eq!(ast.kind(expression), NodeKind::Expression);
        let children = ast.children(expression).to_vec();
        assert_eq!(
            kinds(&unit, &children),
            vec![
                NodeKind::UnaryExpression,
                NodeKind::Operator,
                NodeKind::UnaryExpression,
                NodeKind::Operator,
                NodeKind::CastExpression,
            ]
        );
        assert_eq!(ast.image(children[4]), "(int)");
        let cast_operand = ast.children(children[4])[0];
        assert_eq!(ast.image(cast_operand), "$c");
        assert!(ast.position_violations().is_empty());
    }

    #[test]
    fn test_postfix_and_prefix_increment() {
        let unit = parse("<?php $a++; ++$a; $o->count--; $x[0]++; $a + ++$b;");
        let ast = &unit.ast;
        let postfix = ast.find_all_of_type(unit.root, NodeKind::PostfixExpression);
        assert_eq!(postfix.len(), 3);
        assert_eq!(
            ast.kind(ast.children(postfix[1])[0]),
            NodeKind::MemberPrimaryPrefix
        );
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::PreIncrementExpression)
                .len(),
            2
        );
    }

    #[test]
    fn test_binary_minus_after_operand() {
        let unit = parse("<?php $a - -1;");
        let expression = first_expression(&unit);
        let children = unit.ast.children(expression).to_vec();
        assert_eq!(
            kinds(&unit, &children),
            vec![
                NodeKind::Variable,
                NodeKind::Operator,
                NodeKind::UnaryExpression
            ]
        );
    }

    #[test]
    fn test_assignments() {
        let unit = parse("<?php $a = &$b; $c .= 'x'; $d = $e = 1;");
        let ast = &unit.ast;
        let assignments = ast.find_all_of_type(unit.root, NodeKind::AssignmentExpression);
        let images: Vec<&str> = assignments.iter().map(|&id| ast.image(id)).collect();
        assert_eq!(images, vec!["=&", ".=", "=", "="]);
        let nested = ast.children(assignments[2])[1];
        assert_eq!(ast.kind(nested), NodeKind::AssignmentExpression);
    }

    #[test]
    fn test_unary_wraps_assignment() {
        let unit = parse("<?php !$a = f();");
        let expression = first_expression(&unit);
        let ast = &unit.ast;
        assert_eq!(ast.kind(expression), NodeKind::UnaryExpression);
        assert_eq!(
            ast.kind(ast.children(expression)[0]),
            NodeKind::AssignmentExpression
        );
    }

    #[test]
    fn test_member_chains() {
        let unit = parse("<?php $a?->b()->c[1]->{$d}($e);");
        let ast = &unit.ast;
        let prefixes = ast.find_all_of_type(unit.root, NodeKind::MemberPrimaryPrefix);
        assert_eq!(prefixes.len(), 3);
        let nullsafe = prefixes
            .iter()
            .filter(|&&id| ast.node(id).flags.nullsafe)
            .count();
        assert_eq!(nullsafe, 1);
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::MethodPostfix).len(),
            2
        );
        assert!(ast
            .find_first_of_type(unit.root, NodeKind::ArrayIndexExpression)
            .is_some());
        assert!(ast.position_violations().is_empty());
    }

    #[test]
    fn test_static_members_and_class_constants() {
        let unit = parse("<?php namespace N; use X\\Y; Y::make(); Z::$cache; Y::VERSION; Y::class;");
        let ast = &unit.ast;
        let classes: Vec<&str> = ast
            .find_all_of_type(unit.root, NodeKind::ClassReference)
            .into_iter()
            .map(|id| ast.image(id))
            .collect();
        assert_eq!(classes, vec!["X\\Y", "N\\Z", "X\\Y", "X\\Y"]);
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::ConstantPostfix).len(),
            1
        );
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::ClassFqnPostfix).len(),
            1
        );
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::PropertyPostfix).len(),
            1
        );
        assert!(unit
            .references
            .iter()
            .all(|r| r.kind == ReferenceKind::Class));
    }

    #[test]
    fn test_function_names() {
        let unit = parse(
            "<?php namespace App; use function Lib\\helper; strlen($s); helper(); \\App\\run(); Sub\\go(); PHP_EOL;",
        );
        let ast = &unit.ast;
        let calls: Vec<&str> = ast
            .find_all_of_type(unit.root, NodeKind::FunctionPostfix)
            .into_iter()
            .map(|id| ast.image(id))
            .collect();
        assert_eq!(calls, vec!["strlen", "Lib\\helper", "App\\run", "App\\Sub\\go"]);
        let constant = ast
            .find_first_of_type(unit.root, NodeKind::ConstantReference)
            .expect("constant");
        assert_eq!(ast.image(constant), "PHP_EOL");
    }

    #[test]
    fn test_allocations() {
        let unit = parse(
            "<?php class A { function f() { new B(1); new static; new self(); new $cls->name(); new (get())(); } }",
        );
        let ast = &unit.ast;
        let allocations = ast.find_all_of_type(unit.root, NodeKind::AllocationExpression);
        assert_eq!(allocations.len(), 5);
        let first = ast.children(allocations[0]).to_vec();
        assert_eq!(
            kinds(&unit, &first),
            vec![NodeKind::ClassReference, NodeKind::Arguments]
        );
        let dynamic = ast.children(allocations[3]).to_vec();
        assert_eq!(
            kinds(&unit, &dynamic),
            vec![NodeKind::MemberPrimaryPrefix, NodeKind::Arguments]
        );
    }

    #[test]
    fn test_closures() {
        let unit = parse(
            "<?php $f = function &($a) use ($b, &$c): int { return $a; }; $g = fn(int $x): int => $x * 2;",
        );
        let ast = &unit.ast;
        let closure = ast
            .find_first_of_type(unit.root, NodeKind::Closure)
            .expect("closure");
        assert!(ast.node(closure).flags.by_ref);
        let uses = ast
            .find_first_of_type(closure, NodeKind::ClosureUses)
            .expect("uses");
        let by_ref: Vec<bool> = ast
            .children(uses)
            .iter()
            .map(|&id| ast.node(id).flags.by_ref)
            .collect();
        assert_eq!(by_ref, vec![false, true]);
        assert!(ast
            .find_first_of_type(unit.root, NodeKind::ArrowFunction)
            .is_some());
    }

    #[test]
    fn test_arguments() {
        let unit = parse("<?php f(1, name: $v, ...$rest); $h = strlen(...);");
        let ast = &unit.ast;
        let named = ast
            .find_first_of_type(unit.root, NodeKind::NamedArgument)
            .expect("named");
        assert_eq!(ast.image(named), "name");
        let arguments = ast.find_all_of_type(unit.root, NodeKind::Arguments);
        assert_eq!(ast.children(arguments[0]).len(), 3);
        let spread = ast.children(arguments[0])[2];
        assert!(ast.node(spread).flags.variadic);
        assert!(ast.node(arguments[1]).flags.variadic);
        assert!(ast.children(arguments[1]).is_empty());
    }

    #[test]
    fn test_embedded_variables_have_positions() {
        let unit = parse("<?php\necho \"Hi $name, {$user->id} ${x}\";");
        let ast = &unit.ast;
        let string = ast
            .find_first_of_type(unit.root, NodeKind::StringLiteral)
            .expect("string");
        let variables: Vec<(&str, Position)> = ast
            .children(string)
            .iter()
            .map(|&id| (ast.image(id), ast.node(id).position))
            .collect();
        assert_eq!(
            variables,
            vec![
                ("$name", Position::new(2, 10, 2, 14)),
                ("$user", Position::new(2, 18, 2, 22)),
                ("$x", Position::new(2, 29, 2, 32)),
            ]
        );
        assert!(ast.position_violations().is_empty());
    }

    #[test]
    fn test_match_and_ternary() {
        let unit = parse(
            "<?php $r = match ($v) { 1, 2 => 'low', default => $a ? 'x' : ($b ?: 'y') };",
        );
        let ast = &unit.ast;
        let entries = ast.find_all_of_type(unit.root, NodeKind::MatchEntry);
        assert_eq!(entries.len(), 2);
        assert_eq!(ast.children(entries[0]).len(), 3);
        assert_eq!(ast.image(entries[1]), "default");
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::ConditionalExpression)
                .len(),
            2
        );
    }

    #[test]
    fn test_arrays_and_destructuring() {
        let unit = parse("<?php [$a, [$b]] = $pair; list(, $c) = $x; $m = ['k' => &$v, ...$rest];");
        let ast = &unit.ast;
        assert_eq!(
            ast.find_all_of_type(unit.root, NodeKind::ArrayLiteral).len(),
            3
        );
        let list = ast
            .find_first_of_type(unit.root, NodeKind::ListExpression)
            .expect("list");
        assert_eq!(ast.children(list).len(), 1);
        let elements = ast.find_all_of_type(unit.root, NodeKind::ArrayElement);
        let by_ref = elements
            .iter()
            .filter(|&&id| ast.node(id).flags.by_ref)
            .count();
        assert_eq!(by_ref, 1);
    }

    #[test]
    fn test_keyword_expressions() {
        let unit = parse(
            "<?php function g() { yield 1; yield $k => $v; yield from h(); }
            $x = isset($a, $b) && !empty($c) or exit(1);
            require_once __DIR__ . '/a.php';
            $y = $z ?? throw new E();
            print 'p';
            $q = clone $obj;
            $o instanceof Foo;",
        );
        let ast = &unit.ast;
        let yields = ast.find_all_of_type(unit.root, NodeKind::YieldExpression);
        assert_eq!(yields.len(), 3);
        assert_eq!(ast.children(yields[1]).len(), 2);
        assert_eq!(ast.image(yields[2]), "yield from");
        for kind in [
            NodeKind::IssetExpression,
            NodeKind::EmptyExpression,
            NodeKind::ExitExpression,
            NodeKind::RequireExpression,
            NodeKind::ThrowExpression,
            NodeKind::PrintExpression,
            NodeKind::CloneExpression,
            NodeKind::InstanceOfExpression,
            NodeKind::BooleanAndExpression,
            NodeKind::LogicalOrExpression,
        ] {
            assert!(
                ast.find_first_of_type(unit.root, kind).is_some(),
                "missing {kind:?}"
            );
        }
    }

    #[test]
    fn test_missing_operand_is_unexpected_token() {
        let err = parse_err("<?php $a = ;");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }
}
