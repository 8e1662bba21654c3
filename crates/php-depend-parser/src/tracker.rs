use php_depend_types::Position;

use crate::token::Token;

/// Records the tokens consumed while building each node.
///
/// Scopes nest: a token consumed while an inner scope is open belongs to
/// every enclosing scope as well. Tokens are kept in one log and each
/// scope remembers where it started.
#[derive(Debug, Default)]
pub struct PositionTracker {
    log: Vec<Token>,
    scopes: Vec<usize>,
}

impl PositionTracker {
    pub fn new() -> Self {
        PositionTracker::default()
    }

    /// Open a recording scope.
    pub fn push(&mut self) {
        self.scopes.push(self.log.len());
    }

    /// Record a consumed token. Ignored when no scope is open.
    pub fn add(&mut self, token: &Token) {
        if !self.scopes.is_empty() {
            self.log.push(token.clone());
        }
    }

    /// Close the innermost scope and return its tokens.
    pub fn pop(&mut self) -> Vec<Token> {
        let start = self.scopes.pop().unwrap_or(self.log.len());
        let tokens = self.log[start..].to_vec();
        self.trim();
        tokens
    }

    /// Close the innermost scope and return the span of its tokens.
    pub fn pop_span(&mut self) -> Position {
        let start = self.scopes.pop().unwrap_or(self.log.len());
        let position = span(&self.log[start..]);
        self.trim();
        position
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn trim(&mut self) {
        if self.scopes.is_empty() {
            self.log.clear();
        }
    }
}

/// Span from the first to the last non-comment token.
///
/// Leading and trailing comments are dropped so that an attached doc
/// comment does not widen the node. Unknown for an empty list.
pub fn span(tokens: &[Token]) -> Position {
    let mut code = tokens.iter().filter(|token| !token.kind.is_comment());
    let Some(first) = code.next() else {
        return Position::default();
    };
    let last = code.last().unwrap_or(first);
    first.position.to(&last.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn token(kind: TokenKind, line: u32, start: u32, end: u32) -> Token {
        Token::new(kind, "x", Position::new(line, start, line, end))
    }

    #[test]
    fn test_nested_scopes_share_tokens() {
        let mut tracker = PositionTracker::new();
        tracker.push();
        tracker.add(&token(TokenKind::Function, 1, 1, 8));
        tracker.push();
        tracker.add(&token(TokenKind::Identifier, 1, 10, 12));
        let inner = tracker.pop();
        assert_eq!(inner.len(), 1);
        tracker.add(&token(TokenKind::CurlyClose, 3, 1, 1));
        assert_eq!(tracker.pop_span(), Position::new(1, 1, 3, 1));
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_trailing_comments_are_trimmed() {
        let mut tracker = PositionTracker::new();
        tracker.push();
        tracker.add(&token(TokenKind::DocComment, 1, 1, 10));
        tracker.add(&token(TokenKind::Identifier, 2, 1, 3));
        tracker.add(&token(TokenKind::Semicolon, 2, 4, 4));
        tracker.add(&token(TokenKind::Comment, 2, 6, 20));
        assert_eq!(tracker.pop_span(), Position::new(2, 1, 2, 4));
    }

    #[test]
    fn test_empty_scope_is_unknown() {
        let mut tracker = PositionTracker::new();
        tracker.push();
        assert!(tracker.pop_span().is_unknown());
        tracker.add(&token(TokenKind::Identifier, 1, 1, 1));
        assert!(tracker.pop().is_empty());
    }
}
