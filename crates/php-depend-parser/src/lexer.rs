//! Reference PHP tokenizer.
//!
//! Splits a file into inline HTML and PHP segments and runs the
//! [`TokenKind`] DFA over each PHP segment. Line and column numbers are
//! computed through a [`Rope`] so that multi-byte characters count as a
//! single column.

use logos::Logos;
use php_depend_types::Position;
use ropey::Rope;

use crate::error::{LexError, LexErrorKind};
use crate::token::{Token, TokenKind};

/// Tokenize a complete PHP file. The result always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let rope = Rope::from_str(source);
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let Some((tag_start, tag_len, kind)) = find_open_tag(&source[offset..]) else {
            push(&rope, source, &mut tokens, TokenKind::InlineHtml, offset, source.len());
            offset = source.len();
            break;
        };
        let tag_start = offset + tag_start;
        if tag_start > offset {
            push(&rope, source, &mut tokens, TokenKind::InlineHtml, offset, tag_start);
        }
        push(&rope, source, &mut tokens, kind, tag_start, tag_start + tag_len);
        offset = lex_php(source, tag_start + tag_len, &rope, &mut tokens)?;
    }

    let (line, column) = line_col(&rope, offset);
    tokens.push(Token::eof(Position::new(line, column, line, column)));
    Ok(tokens)
}

/// Find the next `<?php` or `<?=` tag. Returns (offset, length, kind).
fn find_open_tag(text: &str) -> Option<(usize, usize, TokenKind)> {
    let mut search = 0;
    while let Some(found) = text[search..].find("<?") {
        let start = search + found;
        let rest = &text[start + 2..];
        if rest.starts_with('=') {
            return Some((start, 3, TokenKind::OpenTagWithEcho));
        }
        if rest.get(..3).is_some_and(|tag| tag.eq_ignore_ascii_case("php")) {
            let after = &rest[3..];
            if after.is_empty() {
                return Some((start, 5, TokenKind::OpenTag));
            }
            if after.starts_with("\r\n") {
                return Some((start, 7, TokenKind::OpenTag));
            }
            if after.starts_with([' ', '\t', '\n', '\r']) {
                return Some((start, 6, TokenKind::OpenTag));
            }
        }
        search = start + 2;
    }
    None
}

/// Lex one PHP segment starting at byte `start`. Returns the byte offset
/// where inline HTML resumes.
fn lex_php(
    source: &str,
    start: usize,
    rope: &Rope,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let mut lexer = TokenKind::lexer(&source[start..]);
    let mut halted = false;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (from, to) = (start + span.start, start + span.end);

        let kind = match result {
            Ok(kind) => kind,
            Err(()) => {
                let (line, column) = line_col(rope, from);
                return Err(LexError {
                    kind: classify_failure(&source[from..]),
                    line,
                    column,
                });
            }
        };

        match kind {
            TokenKind::CloseTag => {
                let end = swallow_newline(source, to);
                push(rope, source, tokens, kind, from, end);
                if halted {
                    return Ok(rest_as_html(rope, source, tokens, end));
                }
                return Ok(end);
            }
            TokenKind::Semicolon if halted => {
                push(rope, source, tokens, kind, from, to);
                return Ok(rest_as_html(rope, source, tokens, to));
            }
            TokenKind::HaltCompiler => {
                halted = true;
                push(rope, source, tokens, kind, from, to);
            }
            _ => {
                let kind = refine(kind, &source[from..to]);
                push(rope, source, tokens, kind, from, to);
            }
        }
    }
    Ok(source.len())
}

/// Everything after `__halt_compiler();` is raw data.
fn rest_as_html(rope: &Rope, source: &str, tokens: &mut Vec<Token>, from: usize) -> usize {
    if from < source.len() {
        push(rope, source, tokens, TokenKind::InlineHtml, from, source.len());
    }
    source.len()
}

fn swallow_newline(source: &str, end: usize) -> usize {
    let rest = &source[end..];
    if rest.starts_with("\r\n") {
        end + 2
    } else if rest.starts_with('\n') {
        end + 1
    } else {
        end
    }
}

/// Split kinds the DFA cannot tell apart on its own.
fn refine(kind: TokenKind, image: &str) -> TokenKind {
    match kind {
        TokenKind::Comment if image.starts_with("/**") && image.len() > 4 => TokenKind::DocComment,
        TokenKind::ConstantEncapsedString if image.starts_with('"') && has_interpolation(image) => {
            TokenKind::EncapsedString
        }
        TokenKind::Heredoc if image.trim_start_matches("<<<").trim_start().starts_with('\'') => {
            TokenKind::Nowdoc
        }
        other => other,
    }
}

/// Whether a double-quoted string or heredoc body embeds a variable.
pub fn has_interpolation(image: &str) -> bool {
    let bytes = image.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => {
                if let Some(&next) = bytes.get(i + 1) {
                    if next == b'_' || next == b'{' || next.is_ascii_alphabetic() || next >= 0x80 {
                        return true;
                    }
                }
                i += 1;
            }
            b'{' if bytes.get(i + 1) == Some(&b'$') => return true,
            _ => i += 1,
        }
    }
    false
}

fn classify_failure(rest: &str) -> LexErrorKind {
    if rest.starts_with("/*") {
        LexErrorKind::UnterminatedComment
    } else if rest.starts_with("<<<") {
        LexErrorKind::UnterminatedHeredoc
    } else if rest.starts_with(['\'', '"', '`']) {
        LexErrorKind::UnterminatedString
    } else {
        LexErrorKind::UnexpectedCharacter
    }
}

fn push(
    rope: &Rope,
    source: &str,
    tokens: &mut Vec<Token>,
    kind: TokenKind,
    from: usize,
    to: usize,
) {
    tokens.push(Token::new(kind, &source[from..to], span_position(rope, from, to)));
}

/// Position of the byte range `from..to`, end column inclusive.
pub fn span_position(rope: &Rope, from: usize, to: usize) -> Position {
    let (start_line, start_column) = line_col(rope, from);
    let (end_line, end_column) = if to > from {
        line_col(rope, to - 1)
    } else {
        (start_line, start_column)
    };
    Position::new(start_line, start_column, end_line, end_column)
}

/// 1-based (line, column) of a byte offset.
pub fn line_col(rope: &Rope, byte: usize) -> (u32, u32) {
    let byte = byte.min(rope.len_bytes());
    let line = rope.byte_to_line(byte);
    let column = rope.byte_to_char(byte) - rope.line_to_char(line);
    (line as u32 + 1, column as u32 + 1)
}
