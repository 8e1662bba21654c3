use php_depend_types::Position;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated heredoc")]
    UnterminatedHeredoc,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at {line}:{column}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub line: u32,
    pub column: u32,
}

/// A grammar error. Fatal to the file being parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{file}:{position}: unexpected token '{image}' ({kind:?})")]
    UnexpectedToken {
        file: String,
        position: Position,
        kind: TokenKind,
        image: String,
    },
    #[error("{file}:{position}: unexpected end of token stream")]
    StreamExhausted { file: String, position: Position },
    #[error("{file}:{position}: {message}")]
    InvalidState {
        file: String,
        position: Position,
        message: String,
    },
    #[error("{file}:{position}: missing default value")]
    MissingValue { file: String, position: Position },
    #[error("{file}: {source}")]
    Lex {
        file: String,
        #[source]
        source: LexError,
    },
}

impl ParseError {
    /// Error for `token` appearing where the grammar did not allow it.
    /// An end-of-stream token gives `StreamExhausted`.
    pub fn unexpected(file: &str, token: &Token) -> Self {
        if token.kind == TokenKind::Eof {
            return ParseError::StreamExhausted {
                file: file.to_string(),
                position: token.position,
            };
        }
        ParseError::UnexpectedToken {
            file: file.to_string(),
            position: token.position,
            kind: token.kind,
            image: token.image.clone(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::StreamExhausted { position, .. }
            | ParseError::InvalidState { position, .. }
            | ParseError::MissingValue { position, .. } => *position,
            ParseError::Lex { source, .. } => {
                Position::new(source.line, source.column, source.line, source.column)
            }
        }
    }

    pub fn file(&self) -> &str {
        match self {
            ParseError::UnexpectedToken { file, .. }
            | ParseError::StreamExhausted { file, .. }
            | ParseError::InvalidState { file, .. }
            | ParseError::MissingValue { file, .. }
            | ParseError::Lex { file, .. } => file,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
