use php_depend_types::Position;

use crate::token::{Token, TokenKind};

/// The parser's view of a token sequence.
///
/// Implementations must keep returning an `Eof` token once the sequence
/// is exhausted.
pub trait TokenStream {
    /// The next token, comments included, without consuming it.
    fn peek(&self) -> &Token;

    /// The first non-comment token after the next non-comment token.
    fn peek_next(&self) -> &Token;

    /// Consume and return the next token.
    fn next(&mut self) -> Token;
}

/// Token stream over an owned vector, as produced by [`crate::lexer::tokenize`].
pub struct VecTokenStream {
    tokens: Vec<Token>,
    index: usize,
    eof: Token,
}

impl VecTokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens
            .last()
            .map(|token| token.position)
            .unwrap_or_default();
        let eof = Token::eof(Position::new(
            end.end_line,
            end.end_column,
            end.end_line,
            end.end_column,
        ));
        VecTokenStream {
            tokens,
            index: 0,
            eof,
        }
    }

    fn get(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    fn skip_comments(&self, mut index: usize) -> usize {
        while self.get(index).kind.is_comment() {
            index += 1;
        }
        index
    }
}

impl TokenStream for VecTokenStream {
    fn peek(&self) -> &Token {
        self.get(self.index)
    }

    fn peek_next(&self) -> &Token {
        let first = self.skip_comments(self.index);
        if self.get(first).kind == TokenKind::Eof {
            return self.get(first);
        }
        self.get(self.skip_comments(first + 1))
    }

    fn next(&mut self) -> Token {
        let token = self.get(self.index).clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_peek_next_skips_comments() {
        let tokens = tokenize("<?php static /* c */ ::").expect("tokenize");
        let mut stream = VecTokenStream::new(tokens);
        assert_eq!(stream.next().kind, TokenKind::OpenTag);
        assert_eq!(stream.peek().kind, TokenKind::Static);
        assert_eq!(stream.peek_next().kind, TokenKind::DoubleColon);
    }

    #[test]
    fn test_exhausted_stream_repeats_eof() {
        let mut stream = VecTokenStream::new(Vec::new());
        assert_eq!(stream.next().kind, TokenKind::Eof);
        assert_eq!(stream.next().kind, TokenKind::Eof);
        assert_eq!(stream.peek_next().kind, TokenKind::Eof);
    }
}
