//! PHP token kinds and the token value handed to the parser.
//!
//! [`TokenKind`] derives its DFA with [`logos`]. A few kinds are never
//! produced by the DFA directly (`InlineHtml`, open tags, `DocComment`,
//! `Nowdoc`, `EncapsedString`, `Eof`); the tokenizer assigns them while
//! post-processing raw matches.

use logos::Logos;
use php_depend_types::Position;
use serde::{Deserialize, Serialize};

/// A single token with its source text and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub image: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, image: impl Into<String>, position: Position) -> Self {
        Token {
            kind,
            image: image.into(),
            position,
        }
    }

    /// End-of-stream sentinel located at `position`.
    pub fn eof(position: Position) -> Self {
        Token::new(TokenKind::Eof, "", position)
    }

    pub fn start_line(&self) -> u32 {
        self.position.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.position.end_line
    }

    pub fn start_column(&self) -> u32 {
        self.position.start_column
    }

    pub fn end_column(&self) -> u32 {
        self.position.end_column
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Line comments end at a newline or right before a `?>` close tag.
fn line_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let rest = lex.remainder();
    let newline = rest.find('\n').unwrap_or(rest.len());
    let end = match rest[..newline].find("?>") {
        Some(close) => close,
        None => newline,
    };
    lex.bump(end);
    true
}

fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(idx) => {
            lex.bump(idx + 2);
            true
        }
        None => false,
    }
}

/// Consume a heredoc/nowdoc body up to and including its closing label.
///
/// The closing label may be indented and must not be followed by an
/// identifier character.
fn heredoc(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let label: String = lex
        .slice()
        .trim_start_matches("<<<")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    let mut offset = 0;
    for line in lex.remainder().split_inclusive('\n') {
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(after) = trimmed.strip_prefix(label.as_str()) {
            if !after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
                let indent = line.len() - trimmed.len();
                lex.bump(offset + indent + label.len());
                return true;
            }
        }
        offset += line.len();
    }
    false
}

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

/// Kind tag of a PHP token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ── Stream structure ────────────────────────────────────────────
    InlineHtml,
    OpenTag,
    OpenTagWithEcho,
    #[token("?>")]
    CloseTag,
    Eof,

    // ── Comments ────────────────────────────────────────────────────
    #[regex(r"//|#", line_comment)]
    #[regex(r"/\*", block_comment)]
    Comment,
    DocComment,

    // ── Keywords ────────────────────────────────────────────────────
    #[token("abstract", ignore(case))]
    Abstract,
    #[token("array", ignore(case))]
    Array,
    #[token("as", ignore(case))]
    As,
    #[token("break", ignore(case))]
    Break,
    #[token("callable", ignore(case))]
    Callable,
    #[token("case", ignore(case))]
    Case,
    #[token("catch", ignore(case))]
    Catch,
    #[token("class", ignore(case))]
    Class,
    #[token("clone", ignore(case))]
    Clone,
    #[token("const", ignore(case))]
    Const,
    #[token("continue", ignore(case))]
    Continue,
    #[token("declare", ignore(case))]
    Declare,
    #[token("default", ignore(case))]
    Default,
    #[token("do", ignore(case))]
    Do,
    #[token("echo", ignore(case))]
    Echo,
    #[token("else", ignore(case))]
    Else,
    #[token("elseif", ignore(case))]
    Elseif,
    #[token("empty", ignore(case))]
    Empty,
    #[token("enddeclare", ignore(case))]
    Enddeclare,
    #[token("endfor", ignore(case))]
    Endfor,
    #[token("endforeach", ignore(case))]
    Endforeach,
    #[token("endif", ignore(case))]
    Endif,
    #[token("endswitch", ignore(case))]
    Endswitch,
    #[token("endwhile", ignore(case))]
    Endwhile,
    #[token("enum", ignore(case))]
    Enum,
    #[token("eval", ignore(case))]
    Eval,
    #[token("exit", ignore(case))]
    #[token("die", ignore(case))]
    Exit,
    #[token("extends", ignore(case))]
    Extends,
    #[token("final", ignore(case))]
    Final,
    #[token("finally", ignore(case))]
    Finally,
    #[token("fn", ignore(case))]
    Fn,
    #[token("for", ignore(case))]
    For,
    #[token("foreach", ignore(case))]
    Foreach,
    #[token("function", ignore(case))]
    Function,
    #[token("global", ignore(case))]
    Global,
    #[token("goto", ignore(case))]
    Goto,
    #[token("__halt_compiler", ignore(case))]
    HaltCompiler,
    #[token("if", ignore(case))]
    If,
    #[token("implements", ignore(case))]
    Implements,
    #[token("include", ignore(case))]
    Include,
    #[token("include_once", ignore(case))]
    IncludeOnce,
    #[token("instanceof", ignore(case))]
    Instanceof,
    #[token("insteadof", ignore(case))]
    Insteadof,
    #[token("interface", ignore(case))]
    Interface,
    #[token("isset", ignore(case))]
    Isset,
    #[token("list", ignore(case))]
    List,
    #[token("match", ignore(case))]
    Match,
    #[token("namespace", ignore(case))]
    Namespace,
    #[token("new", ignore(case))]
    New,
    #[token("print", ignore(case))]
    Print,
    #[token("private", ignore(case))]
    Private,
    #[token("protected", ignore(case))]
    Protected,
    #[token("public", ignore(case))]
    Public,
    #[token("readonly", ignore(case))]
    Readonly,
    #[token("require", ignore(case))]
    Require,
    #[token("require_once", ignore(case))]
    RequireOnce,
    #[token("return", ignore(case))]
    Return,
    #[token("static", ignore(case))]
    Static,
    #[token("switch", ignore(case))]
    Switch,
    #[token("throw", ignore(case))]
    Throw,
    #[token("trait", ignore(case))]
    Trait,
    #[token("try", ignore(case))]
    Try,
    #[token("unset", ignore(case))]
    Unset,
    #[token("use", ignore(case))]
    Use,
    #[token("var", ignore(case))]
    Var,
    #[token("while", ignore(case))]
    While,
    #[token("yield", ignore(case))]
    Yield,
    #[token("self", ignore(case))]
    SelfKeyword,
    #[token("parent", ignore(case))]
    Parent,
    #[token("null", ignore(case))]
    Null,
    #[token("true", ignore(case))]
    True,
    #[token("false", ignore(case))]
    False,
    #[token("and", ignore(case))]
    LogicalAnd,
    #[token("or", ignore(case))]
    LogicalOr,
    #[token("xor", ignore(case))]
    LogicalXor,

    // ── Names and literals ──────────────────────────────────────────
    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Identifier,
    #[regex(r"\$[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Variable,
    #[regex(r"0[xX][0-9a-fA-F]+(_[0-9a-fA-F]+)*")]
    #[regex(r"0[bB][01]+(_[01]+)*")]
    #[regex(r"0[oO][0-7]+(_[0-7]+)*")]
    #[regex(r"[0-9]+(_[0-9]+)*")]
    LNumber,
    #[regex(r"[0-9]*(_[0-9]+)*\.[0-9]+(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?")]
    #[regex(r"[0-9]+(_[0-9]+)*\.([eE][+-]?[0-9]+(_[0-9]+)*)?")]
    #[regex(r"[0-9]+(_[0-9]+)*[eE][+-]?[0-9]+(_[0-9]+)*")]
    DNumber,
    #[regex(r"'([^'\\]|\\(.|\n))*'")]
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    ConstantEncapsedString,
    EncapsedString,
    #[regex(r"`([^`\\]|\\(.|\n))*`")]
    ShellExec,
    #[regex(
        r#"<<<[ \t]*([a-zA-Z_][a-zA-Z0-9_]*|"[a-zA-Z_][a-zA-Z0-9_]*"|'[a-zA-Z_][a-zA-Z0-9_]*')\r?\n"#,
        heredoc
    )]
    Heredoc,
    Nowdoc,
    #[regex(
        r"\([ \t]*(int|integer|bool|boolean|float|double|real|string|binary|array|object|unset)[ \t]*\)",
        ignore(case)
    )]
    Cast,

    // ── Punctuation ─────────────────────────────────────────────────
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("::")]
    DoubleColon,
    #[token("\\")]
    Backslash,
    #[token("?")]
    Question,
    #[token("?->")]
    NullsafeArrow,
    #[token("->")]
    Arrow,
    #[token("=>")]
    DoubleArrow,
    #[token("...")]
    Ellipsis,
    #[token("$")]
    Dollar,
    #[token("{")]
    CurlyOpen,
    #[token("}")]
    CurlyClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    SquareOpen,
    #[token("]")]
    SquareClose,
    #[token("#[")]
    AttributeOpen,
    #[token("@")]
    At,

    // ── Assignment operators ────────────────────────────────────────
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token(".=")]
    ConcatAssign,
    #[token("%=")]
    ModAssign,
    #[token("**=")]
    PowAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    ShiftLeftAssign,
    #[token(">>=")]
    ShiftRightAssign,
    #[token("??=")]
    CoalesceAssign,

    // ── Operators ───────────────────────────────────────────────────
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mul,
    #[token("/")]
    Div,
    #[token("%")]
    Mod,
    #[token("**")]
    Pow,
    #[token(".")]
    Concat,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    BooleanNot,
    #[token("&&")]
    BooleanAnd,
    #[token("||")]
    BooleanOr,
    #[token("??")]
    Coalesce,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("==")]
    IsEqual,
    #[token("!=")]
    #[token("<>")]
    IsNotEqual,
    #[token("===")]
    IsIdentical,
    #[token("!==")]
    IsNotIdentical,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<=>")]
    Spaceship,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::DocComment)
    }

    /// Reserved and semi-reserved words. PHP accepts these as member names
    /// and as segments of qualified names.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Abstract
                | Array
                | As
                | Break
                | Callable
                | Case
                | Catch
                | Class
                | Clone
                | Const
                | Continue
                | Declare
                | Default
                | Do
                | Echo
                | Else
                | Elseif
                | Empty
                | Enddeclare
                | Endfor
                | Endforeach
                | Endif
                | Endswitch
                | Endwhile
                | Enum
                | Eval
                | Exit
                | Extends
                | Final
                | Finally
                | Fn
                | For
                | Foreach
                | Function
                | Global
                | Goto
                | HaltCompiler
                | If
                | Implements
                | Include
                | IncludeOnce
                | Instanceof
                | Insteadof
                | Interface
                | Isset
                | List
                | Match
                | Namespace
                | New
                | Print
                | Private
                | Protected
                | Public
                | Readonly
                | Require
                | RequireOnce
                | Return
                | Static
                | Switch
                | Throw
                | Trait
                | Try
                | Unset
                | Use
                | Var
                | While
                | Yield
                | SelfKeyword
                | Parent
                | Null
                | True
                | False
                | LogicalAnd
                | LogicalOr
                | LogicalXor
        )
    }

    /// Identifier or keyword: anything usable as a member or segment name.
    pub fn is_name(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }

    pub fn is_assignment(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Assign
                | PlusAssign
                | MinusAssign
                | MulAssign
                | DivAssign
                | ConcatAssign
                | ModAssign
                | PowAssign
                | AndAssign
                | OrAssign
                | XorAssign
                | ShiftLeftAssign
                | ShiftRightAssign
                | CoalesceAssign
        )
    }

    /// Binary operators that produce a plain operator node in an expression.
    pub fn is_binary_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Mul | Div
                | Mod
                | Pow
                | Concat
                | Ampersand
                | Pipe
                | Caret
                | Coalesce
                | ShiftLeft
                | ShiftRight
                | IsEqual
                | IsNotEqual
                | IsIdentical
                | IsNotIdentical
                | Less
                | Greater
                | LessOrEqual
                | GreaterOrEqual
                | Spaceship
        )
    }

    pub fn is_visibility(self) -> bool {
        matches!(
            self,
            TokenKind::Public | TokenKind::Protected | TokenKind::Private
        )
    }

    /// Tokens that start a string or scalar literal.
    pub fn is_literal(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            LNumber
                | DNumber
                | ConstantEncapsedString
                | EncapsedString
                | ShellExec
                | Heredoc
                | Nowdoc
                | Null
                | True
                | False
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source)
            .map(|result| result.expect("valid token"))
            .collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("CLASS Class class"),
            vec![TokenKind::Class, TokenKind::Class, TokenKind::Class]
        );
        assert_eq!(kinds("classes"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("?-> ?? ??= ?> <=> ==="),
            vec![
                TokenKind::NullsafeArrow,
                TokenKind::Coalesce,
                TokenKind::CoalesceAssign,
                TokenKind::CloseTag,
                TokenKind::Spaceship,
                TokenKind::IsIdentical,
            ]
        );
    }

    #[test]
    fn test_comments_and_attributes() {
        assert_eq!(
            kinds("# note\n#[Attr] // x\n/* y */"),
            vec![
                TokenKind::Comment,
                TokenKind::AttributeOpen,
                TokenKind::Identifier,
                TokenKind::SquareClose,
                TokenKind::Comment,
                TokenKind::Comment,
            ]
        );
    }

    #[test]
    fn test_line_comment_stops_before_close_tag() {
        assert_eq!(
            kinds("// comment ?>"),
            vec![TokenKind::Comment, TokenKind::CloseTag]
        );
    }

    #[test]
    fn test_numbers_and_casts() {
        assert_eq!(
            kinds("0x1F 1_000 1.5 .5 1e3 (int) ( string )"),
            vec![
                TokenKind::LNumber,
                TokenKind::LNumber,
                TokenKind::DNumber,
                TokenKind::DNumber,
                TokenKind::DNumber,
                TokenKind::Cast,
                TokenKind::Cast,
            ]
        );
    }

    #[test]
    fn test_heredoc_body_is_one_token() {
        let source = "<<<EOT\nline $a\n  EOT;";
        assert_eq!(kinds(source), vec![TokenKind::Heredoc, TokenKind::Semicolon]);
    }

    #[test]
    fn test_keyword_classification() {
        assert!(TokenKind::Enum.is_keyword());
        assert!(TokenKind::Identifier.is_name());
        assert!(!TokenKind::Variable.is_name());
        assert!(TokenKind::CoalesceAssign.is_assignment());
        assert!(TokenKind::Spaceship.is_binary_operator());
    }
}
