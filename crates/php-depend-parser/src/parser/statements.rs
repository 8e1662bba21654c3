use super::Parser;
use crate::ast::{NodeId, NodeKind};
use crate::error::ParseResult;
use crate::stream::TokenStream;
use crate::token::TokenKind;
use crate::unit::ReferenceKind;

impl<S: TokenStream> Parser<S> {
    /// Parse statements into `parent` until one of `stop` is next.
    /// Open and close tags between statements are skipped.
    pub(super) fn statements_until(&mut self, parent: NodeId, stop: &[TokenKind]) -> ParseResult<()> {
        loop {
            let kind = self.peek_kind();
            if stop.contains(&kind) {
                return Ok(());
            }
            match kind {
                TokenKind::Eof => return Err(self.unexpected()),
                TokenKind::OpenTag | TokenKind::CloseTag => {
                    self.advance();
                }
                _ => {
                    let statement = self.statement()?;
                    self.ast.attach(parent, statement);
                }
            }
        }
    }

    /// `{ statements }`
    pub(super) fn block(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::CurlyOpen)?;
        let node = self.ast.alloc(NodeKind::Scope, "");
        self.statements_until(node, &[TokenKind::CurlyClose])?;
        self.consume(TokenKind::CurlyClose)?;
        self.finish(node);
        Ok(node)
    }

    /// Statements of an alternative-syntax body such as `if (...): ... endif;`.
    fn alternative_block(&mut self, stop: &[TokenKind]) -> ParseResult<NodeId> {
        self.start();
        let node = self.ast.alloc(NodeKind::Scope, "");
        self.statements_until(node, stop)?;
        self.finish(node);
        Ok(node)
    }

    /// Body after a loop header: a statement, or `:` ... `end<keyword>;`.
    fn loop_body(&mut self, end: TokenKind) -> ParseResult<NodeId> {
        if !self.consume_if(TokenKind::Colon) {
            return self.statement();
        }
        let body = self.alternative_block(&[end])?;
        self.consume(end)?;
        self.terminator()?;
        Ok(body)
    }

    pub(super) fn statement(&mut self) -> ParseResult<NodeId> {
        match self.peek_kind() {
            TokenKind::CurlyOpen => self.block(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Foreach => self.foreach_statement(),
            TokenKind::Switch => self.switch_statement(),
            TokenKind::Break => self.jump_statement(TokenKind::Break, NodeKind::BreakStatement),
            TokenKind::Continue => {
                self.jump_statement(TokenKind::Continue, NodeKind::ContinueStatement)
            }
            TokenKind::Return => self.jump_statement(TokenKind::Return, NodeKind::ReturnStatement),
            TokenKind::Echo => self.echo_statement(TokenKind::Echo),
            TokenKind::OpenTagWithEcho => self.echo_statement(TokenKind::OpenTagWithEcho),
            TokenKind::InlineHtml => self.leaf(TokenKind::InlineHtml, NodeKind::InlineHtml),
            TokenKind::Global => self.global_statement(),
            TokenKind::Unset => self.unset_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Throw => self.throw_statement(),
            TokenKind::Goto => self.goto_statement(),
            TokenKind::Declare => self.declare_statement(),
            TokenKind::Use => self.use_declaration(),
            TokenKind::Const => self.constant_definition(),
            TokenKind::Semicolon => self.leaf(TokenKind::Semicolon, NodeKind::Statement),
            TokenKind::HaltCompiler => self.halt_compiler(),
            TokenKind::AttributeOpen => {
                self.skip_attributes()?;
                self.statement()
            }
            TokenKind::Function => match self.peek_next_kind() {
                TokenKind::ParenOpen => self.expression_statement(),
                _ => self.function_declaration(),
            },
            TokenKind::Abstract | TokenKind::Final | TokenKind::Class => self.class_declaration(),
            TokenKind::Readonly
                if matches!(
                    self.peek_next_kind(),
                    TokenKind::Class | TokenKind::Final | TokenKind::Abstract
                ) =>
            {
                self.class_declaration()
            }
            TokenKind::Interface => self.interface_declaration(),
            TokenKind::Trait => self.trait_declaration(),
            TokenKind::Enum if self.peek_next_kind() == TokenKind::Identifier => {
                self.enum_declaration()
            }
            TokenKind::Static => match self.peek_next_kind() {
                TokenKind::DoubleColon
                | TokenKind::ParenOpen
                | TokenKind::Function
                | TokenKind::Fn => self.expression_statement(),
                _ => self.static_variable_declaration(),
            },
            TokenKind::Identifier if self.peek_next_kind() == TokenKind::Colon => {
                self.label_statement()
            }
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        let node = self.ast.alloc(NodeKind::Statement, "");
        let expression = self.expression()?;
        self.ast.attach(node, expression);
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `( expression )` as used by control structures.
    fn parenthesized_expression(&mut self) -> ParseResult<NodeId> {
        self.consume(TokenKind::ParenOpen)?;
        let expression = self.expression()?;
        self.consume(TokenKind::ParenClose)?;
        Ok(expression)
    }

    /// Comma separated expressions attached to `node`.
    fn expressions_into(&mut self, node: NodeId) -> ParseResult<()> {
        loop {
            let expression = self.expression()?;
            self.ast.attach(node, expression);
            if !self.consume_if(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    // ── Control structures ──────────────────────────────────────────

    fn if_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::If)?;
        let node = self.ast.alloc(NodeKind::IfStatement, "if");
        let condition = self.parenthesized_expression()?;
        self.ast.attach(node, condition);

        if self.consume_if(TokenKind::Colon) {
            let stop = [TokenKind::Elseif, TokenKind::Else, TokenKind::Endif];
            let body = self.alternative_block(&stop)?;
            self.ast.attach(node, body);
            loop {
                match self.peek_kind() {
                    TokenKind::Elseif => {
                        self.start();
                        self.advance();
                        let branch = self.ast.alloc(NodeKind::ElseIfStatement, "elseif");
                        let condition = self.parenthesized_expression()?;
                        self.ast.attach(branch, condition);
                        self.consume(TokenKind::Colon)?;
                        let body = self.alternative_block(&stop)?;
                        self.ast.attach(branch, body);
                        self.finish(branch);
                        self.ast.attach(node, branch);
                    }
                    TokenKind::Else => {
                        self.start();
                        self.advance();
                        let branch = self.ast.alloc(NodeKind::ElseStatement, "else");
                        self.consume(TokenKind::Colon)?;
                        let body = self.alternative_block(&[TokenKind::Endif])?;
                        self.ast.attach(branch, body);
                        self.finish(branch);
                        self.ast.attach(node, branch);
                    }
                    _ => break,
                }
            }
            self.consume(TokenKind::Endif)?;
            self.terminator()?;
        } else {
            let body = self.statement()?;
            self.ast.attach(node, body);
            loop {
                match self.peek_kind() {
                    TokenKind::Elseif => {
                        self.start();
                        self.advance();
                        let branch = self.ast.alloc(NodeKind::ElseIfStatement, "elseif");
                        let condition = self.parenthesized_expression()?;
                        self.ast.attach(branch, condition);
                        let body = self.statement()?;
                        self.ast.attach(branch, body);
                        self.finish(branch);
                        self.ast.attach(node, branch);
                    }
                    TokenKind::Else => {
                        self.start();
                        self.advance();
                        let branch = self.ast.alloc(NodeKind::ElseStatement, "else");
                        let body = self.statement()?;
                        self.ast.attach(branch, body);
                        self.finish(branch);
                        self.ast.attach(node, branch);
                        break;
                    }
                    _ => break,
                }
            }
        }
        self.finish(node);
        Ok(node)
    }

    fn while_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::While)?;
        let node = self.ast.alloc(NodeKind::WhileStatement, "while");
        let condition = self.parenthesized_expression()?;
        self.ast.attach(node, condition);
        let body = self.loop_body(TokenKind::Endwhile)?;
        self.ast.attach(node, body);
        self.finish(node);
        Ok(node)
    }

    fn do_while_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Do)?;
        let node = self.ast.alloc(NodeKind::DoWhileStatement, "do");
        let body = self.statement()?;
        self.ast.attach(node, body);
        self.consume(TokenKind::While)?;
        let condition = self.parenthesized_expression()?;
        self.ast.attach(node, condition);
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `for (init; condition; update) body`
    fn for_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::For)?;
        let node = self.ast.alloc(NodeKind::ForStatement, "for");
        self.consume(TokenKind::ParenOpen)?;

        if self.peek_kind() != TokenKind::Semicolon {
            self.start();
            let init = self.ast.alloc(NodeKind::ForInit, "");
            self.expressions_into(init)?;
            self.finish(init);
            self.ast.attach(node, init);
        }
        self.consume(TokenKind::Semicolon)?;
        if self.peek_kind() != TokenKind::Semicolon {
            self.expressions_into(node)?;
        }
        self.consume(TokenKind::Semicolon)?;
        if self.peek_kind() != TokenKind::ParenClose {
            self.start();
            let update = self.ast.alloc(NodeKind::ForUpdate, "");
            self.expressions_into(update)?;
            self.finish(update);
            self.ast.attach(node, update);
        }
        self.consume(TokenKind::ParenClose)?;

        let body = self.loop_body(TokenKind::Endfor)?;
        self.ast.attach(node, body);
        self.finish(node);
        Ok(node)
    }

    /// `foreach (subject as [$key =>] [&]$value) body`
    fn foreach_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Foreach)?;
        let node = self.ast.alloc(NodeKind::ForeachStatement, "foreach");
        self.consume(TokenKind::ParenOpen)?;
        let subject = self.expression()?;
        self.ast.attach(node, subject);
        self.consume(TokenKind::As)?;
        let first = self.foreach_target()?;
        self.ast.attach(node, first);
        if self.consume_if(TokenKind::DoubleArrow) {
            let value = self.foreach_target()?;
            self.ast.attach(node, value);
        }
        self.consume(TokenKind::ParenClose)?;
        let body = self.loop_body(TokenKind::Endforeach)?;
        self.ast.attach(node, body);
        self.finish(node);
        Ok(node)
    }

    fn foreach_target(&mut self) -> ParseResult<NodeId> {
        if self.peek_kind() != TokenKind::Ampersand {
            return self.expression();
        }
        self.start();
        self.advance();
        let target = self.expression()?;
        let span = self.tracker.pop_span();
        self.set_position(target, span);
        self.ast.node_mut(target).flags.by_ref = true;
        Ok(target)
    }

    /// `switch (subject) { case x: ... default: ... }` and the `endswitch` form.
    fn switch_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Switch)?;
        let node = self.ast.alloc(NodeKind::SwitchStatement, "switch");
        let subject = self.parenthesized_expression()?;
        self.ast.attach(node, subject);

        let close = if self.consume_if(TokenKind::Colon) {
            TokenKind::Endswitch
        } else {
            self.consume(TokenKind::CurlyOpen)?;
            TokenKind::CurlyClose
        };
        self.consume_if(TokenKind::Semicolon);

        let stop = [
            TokenKind::Case,
            TokenKind::Default,
            TokenKind::CurlyClose,
            TokenKind::Endswitch,
        ];
        loop {
            let kind = self.peek_kind();
            if kind == close {
                break;
            }
            let label = match kind {
                TokenKind::Case => {
                    self.start();
                    self.advance();
                    let label = self.ast.alloc(NodeKind::SwitchLabel, "case");
                    let value = self.expression()?;
                    self.ast.attach(label, value);
                    label
                }
                TokenKind::Default => {
                    self.start();
                    self.advance();
                    self.ast.alloc(NodeKind::SwitchLabel, "default")
                }
                TokenKind::OpenTag | TokenKind::CloseTag => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.unexpected()),
            };
            if !self.consume_if(TokenKind::Colon) {
                self.consume(TokenKind::Semicolon)?;
            }
            self.statements_until(label, &stop)?;
            self.finish(label);
            self.ast.attach(node, label);
        }
        self.consume(close)?;
        if close == TokenKind::Endswitch {
            self.terminator()?;
        }
        self.finish(node);
        Ok(node)
    }

    /// `break`, `continue` and `return` with an optional expression.
    fn jump_statement(&mut self, keyword: TokenKind, kind: NodeKind) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(keyword)?;
        let node = self.ast.alloc(kind, token.image.to_lowercase());
        if !matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::CloseTag
        ) {
            let value = self.expression()?;
            self.ast.attach(node, value);
        }
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `echo a, b;` or `<?= a, b ?>`.
    fn echo_statement(&mut self, keyword: TokenKind) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(keyword)?;
        let node = self
            .ast
            .alloc(NodeKind::EchoStatement, token.image.trim().to_lowercase());
        self.expressions_into(node)?;
        if !(keyword == TokenKind::OpenTagWithEcho && self.peek_kind() == TokenKind::Eof) {
            self.terminator()?;
        }
        self.finish(node);
        Ok(node)
    }

    fn global_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Global)?;
        let node = self.ast.alloc(NodeKind::GlobalStatement, "global");
        loop {
            let variable = self.simple_variable()?;
            self.ast.attach(node, variable);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `static $a = 1, $b;` inside a function body.
    fn static_variable_declaration(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Static)?;
        let node = self.ast.alloc(NodeKind::StaticVariableDeclaration, "static");
        loop {
            let declarator = self.variable_declarator()?;
            self.ast.attach(node, declarator);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    fn unset_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Unset)?;
        let node = self.ast.alloc(NodeKind::UnsetStatement, "unset");
        self.consume(TokenKind::ParenOpen)?;
        while self.peek_kind() != TokenKind::ParenClose {
            let target = self.expression()?;
            self.ast.attach(node, target);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `try { } catch (A | B $e) { } finally { }`
    fn try_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Try)?;
        let node = self.ast.alloc(NodeKind::TryStatement, "try");
        let body = self.block()?;
        self.ast.attach(node, body);

        while self.peek_kind() == TokenKind::Catch {
            self.start();
            self.advance();
            let catch = self.ast.alloc(NodeKind::CatchStatement, "catch");
            self.consume(TokenKind::ParenOpen)?;
            loop {
                let class = self.class_reference(
                    NodeKind::ClassOrInterfaceReference,
                    ReferenceKind::ClassOrInterface,
                )?;
                self.ast.attach(catch, class);
                if !self.consume_if(TokenKind::Pipe) {
                    break;
                }
            }
            if self.peek_kind() == TokenKind::Variable {
                let variable = self.leaf(TokenKind::Variable, NodeKind::Variable)?;
                self.ast.attach(catch, variable);
            }
            self.consume(TokenKind::ParenClose)?;
            let body = self.block()?;
            self.ast.attach(catch, body);
            self.finish(catch);
            self.ast.attach(node, catch);
        }

        if self.peek_kind() == TokenKind::Finally {
            self.start();
            self.advance();
            let finally = self.ast.alloc(NodeKind::FinallyStatement, "finally");
            let body = self.block()?;
            self.ast.attach(finally, body);
            self.finish(finally);
            self.ast.attach(node, finally);
        }
        self.finish(node);
        Ok(node)
    }

    fn throw_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Throw)?;
        let node = self.ast.alloc(NodeKind::ThrowStatement, "throw");
        let value = self.expression()?;
        self.ast.attach(node, value);
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    fn goto_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Goto)?;
        let label = self.consume(TokenKind::Identifier)?;
        let node = self.ast.alloc(NodeKind::GotoStatement, label.image);
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    fn label_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        let label = self.consume(TokenKind::Identifier)?;
        let node = self.ast.alloc(NodeKind::LabelStatement, label.image);
        self.consume(TokenKind::Colon)?;
        self.finish(node);
        Ok(node)
    }

    /// `declare(strict_types=1);`, `declare(ticks=1) { }` or the `enddeclare` form.
    fn declare_statement(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Declare)?;
        let node = self.ast.alloc(NodeKind::DeclareStatement, "declare");
        self.consume(TokenKind::ParenOpen)?;
        loop {
            self.start();
            let name = self.consume_name()?;
            let directive = self.ast.alloc(NodeKind::ConstantDeclarator, name.image);
            self.consume(TokenKind::Assign)?;
            let value = self.expression()?;
            self.ast.attach(directive, value);
            self.finish(directive);
            self.ast.attach(node, directive);
            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::ParenClose)?;

        match self.peek_kind() {
            TokenKind::CurlyOpen => {
                let body = self.block()?;
                self.ast.attach(node, body);
            }
            TokenKind::Colon => {
                self.advance();
                let body = self.alternative_block(&[TokenKind::Enddeclare])?;
                self.ast.attach(node, body);
                self.consume(TokenKind::Enddeclare)?;
                self.terminator()?;
            }
            _ => self.terminator()?,
        }
        self.finish(node);
        Ok(node)
    }

    /// Top-level `const A = 1, B = 2;`
    fn constant_definition(&mut self) -> ParseResult<NodeId> {
        self.start();
        self.consume(TokenKind::Const)?;
        let node = self.ast.alloc(NodeKind::ConstantDefinition, "const");
        for declarator in self.constant_declarators()? {
            self.ast.attach(node, declarator);
        }
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }

    /// `__halt_compiler();` The data after it arrives as inline HTML.
    fn halt_compiler(&mut self) -> ParseResult<NodeId> {
        self.start();
        let token = self.consume(TokenKind::HaltCompiler)?;
        let node = self.ast.alloc(NodeKind::Statement, token.image);
        self.consume(TokenKind::ParenOpen)?;
        self.consume(TokenKind::ParenClose)?;
        self.terminator()?;
        self.finish(node);
        Ok(node)
    }
}
