//! PHP front end for php-depend.
//!
//! Tokenizes PHP source, parses it with a recursive-descent parser into an
//! arena AST and summarizes each file as a [`SourceUnit`] ready to be
//! registered with the builder.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod phpdoc;
pub mod stream;
pub mod symbol_table;
pub mod token;
pub mod tracker;
pub mod unit;

pub use ast::{Ast, Node, NodeFlags, NodeId, NodeKind, RefId};
pub use error::{LexError, LexErrorKind, ParseError, ParseResult};
pub use parser::{Parser, ParserOptions};
pub use stream::{TokenStream, VecTokenStream};
pub use token::{Token, TokenKind};
pub use unit::{
    ConstantDecl, FunctionDecl, MethodDecl, PropertyDecl, ReferenceKind, SourceUnit, TypeDecl,
    TypeReference,
};

/// Tokenize and parse one file.
pub fn parse_source(
    path: &str,
    source: &str,
    options: ParserOptions,
) -> Result<SourceUnit, ParseError> {
    let tokens = lexer::tokenize(source).map_err(|source| ParseError::Lex {
        file: path.to_string(),
        source,
    })?;
    Parser::new(VecTokenStream::new(tokens), path, options).parse()
}
