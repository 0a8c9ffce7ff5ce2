//! Token definitions for the Loom lexer
//!
//! One token vocabulary covers the whole language surface: word-like kinds
//! (identifiers plus the soft keywords), typed literals, punctuation and
//! operators, the six island sub-kinds, the navigation-path block, and the
//! source-location file markers. The parser never re-tokenizes anything;
//! island boundaries in particular are decided here, not by the parser.

use logos::Logos;
use loom_core::errors::{LexerError, LoomError, LoomErrorI};
use loom_core::shared::SpanInfo;
use serde::{Deserialize, Serialize};

/// Convert a logos span to line/column span info
fn logos_span_to_span_info(source: &str, span: logos::Span) -> SpanInfo {
    SpanInfo::from_byte_offsets(source, span.start, span.end)
}

/// Process string literal escape sequences
fn process_string_escapes(s: &str) -> Result<String, String> {
    // Remove quotes
    let inner = &s[1..s.len() - 1];
    let mut result = String::new();
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some(other) => {
                    return Err(format!("\\{}", other));
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    Ok(result)
}

fn island_start_name(slice: &str) -> String {
    // Shape is '#Name {': strip the hash and the opening brace
    slice[1..slice.len() - 1].trim_end().to_string()
}

/// Loom tokens
#[derive(Logos, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip line comments
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")] // Skip block comments
pub enum Token {
    // Soft keywords: lexed as their own kinds but contextually valid as
    // identifiers (see `is_identifier_like`)
    #[token("let", priority = 3)]
    Let,
    #[token("all", priority = 3)]
    All,
    #[token("allVersions", priority = 3)]
    AllVersions,
    #[token("allVersionsInRange", priority = 3)]
    AllVersionsInRange,
    #[token("new", priority = 3)]
    New,

    // Boolean literals
    #[token("true", priority = 3)]
    True,
    #[token("false", priority = 3)]
    False,

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    // Literals
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| lex.slice().to_string())]
    String(String),
    #[regex(r"[0-9]+", |lex| lex.slice().to_string(), priority = 2)]
    Integer(String),
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string(), priority = 3)]
    Float(String),
    #[regex(r"[0-9]+(\.[0-9]+)?[dD]", |lex| { let s = lex.slice(); s[..s.len()-1].to_string() }, priority = 4)]
    Decimal(String),
    #[regex(r"0x[0-9a-fA-F]+", |lex| lex.slice()[2..].to_string(), priority = 5)]
    Byte(String),
    #[regex(r"%[0-9]{4}-[0-9]{2}-[0-9]{2}", |lex| lex.slice()[1..].to_string())]
    Date(String),
    #[regex(r"%[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?", |lex| lex.slice()[1..].to_string())]
    StrictTime(String),
    #[token("%latest")]
    Latest,

    // Navigation path block: an opaque '#/.../#' reference
    #[regex(r"#/[^#\n]*#", |lex| lex.slice().to_string())]
    NavigationPath(String),

    // Island sub-kinds. IslandStart is produced by the token DFA; the rest
    // are emitted by the island sub-scanner in `lex()`.
    #[regex(r"#[a-zA-Z][a-zA-Z0-9_]*[ \t]*\{", |lex| island_start_name(lex.slice()))]
    IslandStart(String),
    IslandContent(String),
    IslandHash,
    IslandBraceOpen,
    IslandBraceClose,
    IslandEnd,

    // Source-location file markers: '?[path' ... ']?'
    #[regex(r"\?\[[^:\n\]]*", |lex| lex.slice()[2..].to_string())]
    FileName(String),
    #[token("]?")]
    FileNameEnd,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("::")]
    PathSeparator,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,

    // Operators
    #[token("->")]
    Arrow,
    #[token("|")]
    Pipe,
    #[token("||")]
    OrOr,
    #[token("&&")]
    AndAnd,
    #[token("!")]
    Not,
    #[token("=")]
    Equal,
    #[token("==")]
    TestEqual,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessOrEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterOrEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("@")]
    At,
    #[token("~")]
    Tilde,
    #[token("$")]
    Dollar,

    // End-of-stream marker
    Eof,
}

impl Token {
    /// True for every word-like kind the `identifier` rule accepts. The
    /// soft keywords stay usable as property and variable names.
    pub fn is_identifier_like(&self) -> bool {
        matches!(
            self,
            Token::Ident(_)
                | Token::Let
                | Token::All
                | Token::AllVersions
                | Token::AllVersionsInRange
                | Token::New
        )
    }

    /// The identifier text of a word-like token, if it is one
    pub fn identifier_text(&self) -> Option<&str> {
        match self {
            Token::Ident(s) => Some(s),
            Token::Let => Some("let"),
            Token::All => Some("all"),
            Token::AllVersions => Some("allVersions"),
            Token::AllVersionsInRange => Some("allVersionsInRange"),
            Token::New => Some("new"),
            _ => None,
        }
    }
}

/// Scan the interior of an island block, emitting island sub-tokens until
/// the closing '}#'. Returns the number of bytes consumed, or an error when
/// the stream ends before the island closes.
///
/// Brace pairs inside the island are surfaced as IslandBraceOpen/Close so a
/// downstream extension parser can recover nesting; everything between the
/// structural characters is raw content.
fn scan_island(
    source: &str,
    base: usize,
    rest: &str,
    tokens: &mut Vec<(Token, SpanInfo)>,
) -> Result<usize, LoomErrorI> {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0usize;
    let mut content_start = 0usize;

    let mut flush = |from: usize, to: usize, tokens: &mut Vec<(Token, SpanInfo)>| {
        if to > from {
            let span = SpanInfo::from_byte_offsets(source, base + from, base + to);
            tokens.push((Token::IslandContent(rest[from..to].to_string()), span));
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                flush(content_start, i, tokens);
                let span = SpanInfo::from_byte_offsets(source, base + i, base + i + 1);
                tokens.push((Token::IslandBraceOpen, span));
                depth += 1;
                i += 1;
                content_start = i;
            }
            b'}' => {
                if depth == 0 && bytes.get(i + 1) == Some(&b'#') {
                    flush(content_start, i, tokens);
                    let span = SpanInfo::from_byte_offsets(source, base + i, base + i + 2);
                    tokens.push((Token::IslandEnd, span));
                    return Ok(i + 2);
                }
                flush(content_start, i, tokens);
                let span = SpanInfo::from_byte_offsets(source, base + i, base + i + 1);
                tokens.push((Token::IslandBraceClose, span));
                depth = depth.saturating_sub(1);
                i += 1;
                content_start = i;
            }
            b'#' => {
                flush(content_start, i, tokens);
                let span = SpanInfo::from_byte_offsets(source, base + i, base + i + 1);
                tokens.push((Token::IslandHash, span));
                i += 1;
                content_start = i;
            }
            _ => {
                i += 1;
            }
        }
    }

    Err(LoomError::ELexerError(
        LexerError::UnterminatedIsland,
        SpanInfo::from_byte_offsets(source, base, base + bytes.len()),
    ))
}

/// Main lexing function - the primary public API
///
/// Returns the full token stream with span information, terminated by an
/// explicit `Eof` marker.
pub fn lex(source: &str) -> Result<Vec<(Token, SpanInfo)>, LoomErrorI> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(mut token) => {
                let span = logos_span_to_span_info(source, lexer.span());

                // Process string literals for escape sequences
                if let Token::String(ref s) = token {
                    match process_string_escapes(s) {
                        Ok(processed) => {
                            token = Token::String(processed);
                        }
                        Err(err) => {
                            return Err(LoomError::ELexerError(
                                LexerError::InvalidEscape(err),
                                span,
                            ));
                        }
                    }
                }

                let entering_island = matches!(token, Token::IslandStart(_));
                tokens.push((token, span));

                // The token DFA only recognizes the island opener; the
                // interior is scanned here and the DFA resumes after '}#'
                if entering_island {
                    let base = lexer.span().end;
                    let consumed = scan_island(source, base, lexer.remainder(), &mut tokens)?;
                    lexer.bump(consumed);
                }
            }
            Err(_) => {
                let span = logos_span_to_span_info(source, lexer.span());
                let slice = &source[lexer.span()];

                // Determine specific error type
                let error = if slice.starts_with('\'') && (slice.len() == 1 || !slice.ends_with('\'')) {
                    LexerError::UnterminatedString
                } else if slice.chars().any(|c| c.is_numeric()) {
                    LexerError::InvalidNumber(slice.to_string())
                } else if slice.contains('\\') {
                    LexerError::InvalidEscape(slice.to_string())
                } else {
                    LexerError::InvalidToken(slice.to_string())
                };

                return Err(LoomError::ELexerError(error, span));
            }
        }
    }

    let end = source.len();
    tokens.push((
        Token::Eof,
        SpanInfo::from_byte_offsets(source, end, end),
    ));

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .filter(|t| !matches!(t, Token::Eof))
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = kinds("let x = $y + 1");

        let expected = [
            Token::Let,
            Token::Ident("x".to_string()),
            Token::Equal,
            Token::Dollar,
            Token::Ident("y".to_string()),
            Token::Plus,
            Token::Integer("1".to_string()),
        ];

        assert_eq!(tokens.len(), expected.len());
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token, &expected[i], "Token {} mismatch", i);
        }
    }

    #[test]
    fn test_qualified_name_tokens() {
        let tokens = kinds("x::y::Foo");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".to_string()),
                Token::PathSeparator,
                Token::Ident("y".to_string()),
                Token::PathSeparator,
                Token::Ident("Foo".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds(r"'hello world'");
        assert_eq!(tokens, vec![Token::String("hello world".to_string())]);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r"'a\nb\t\'c\''");
        assert_eq!(tokens, vec![Token::String("a\nb\t'c'".to_string())]);
    }

    #[test]
    fn test_string_escape_errors() {
        let result = lex(r"'bad\qescape'");
        match result.unwrap_err() {
            LoomError::ELexerError(LexerError::InvalidEscape(msg), _) => {
                assert_eq!(msg, "\\q");
            }
            other => panic!("Expected InvalidEscape, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("42 3.14 2.5d 7d 0x1F");
        assert_eq!(
            tokens,
            vec![
                Token::Integer("42".to_string()),
                Token::Float("3.14".to_string()),
                Token::Decimal("2.5".to_string()),
                Token::Decimal("7".to_string()),
                Token::Byte("1F".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_does_not_eat_float() {
        let tokens = kinds("1..5");
        assert_eq!(
            tokens,
            vec![
                Token::Integer("1".to_string()),
                Token::DotDot,
                Token::Integer("5".to_string()),
            ]
        );
    }

    #[test]
    fn test_dates_and_latest() {
        let tokens = kinds("%2023-01-15 %2023-01-15T10:30:00 %latest");
        assert_eq!(
            tokens,
            vec![
                Token::Date("2023-01-15".to_string()),
                Token::StrictTime("2023-01-15T10:30:00".to_string()),
                Token::Latest,
            ]
        );
    }

    #[test]
    fn test_multiplicity_tokens() {
        let tokens = kinds("[1..*]");
        assert_eq!(
            tokens,
            vec![
                Token::BracketOpen,
                Token::Integer("1".to_string()),
                Token::DotDot,
                Token::Star,
                Token::BracketClose,
            ]
        );
    }

    #[test]
    fn test_soft_keywords_lex_as_keywords() {
        let tokens = kinds("let all allVersions allVersionsInRange new");
        assert_eq!(
            tokens,
            vec![
                Token::Let,
                Token::All,
                Token::AllVersions,
                Token::AllVersionsInRange,
                Token::New,
            ]
        );
        for token in &tokens {
            assert!(token.is_identifier_like());
        }
        assert_eq!(tokens[1].identifier_text(), Some("all"));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("-> == != <= >= && || | ! < >");
        assert_eq!(
            tokens,
            vec![
                Token::Arrow,
                Token::TestEqual,
                Token::NotEqual,
                Token::LessOrEqual,
                Token::GreaterOrEqual,
                Token::AndAnd,
                Token::OrOr,
                Token::Pipe,
                Token::Not,
                Token::LessThan,
                Token::GreaterThan,
            ]
        );
    }

    #[test]
    fn test_nested_generics_close_as_two_tokens() {
        let tokens = kinds("List<List<Foo>>");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("List".to_string()),
                Token::LessThan,
                Token::Ident("List".to_string()),
                Token::LessThan,
                Token::Ident("Foo".to_string()),
                Token::GreaterThan,
                Token::GreaterThan,
            ]
        );
    }

    #[test]
    fn test_comments_ignored() {
        let tokens = kinds("42 // trailing\n/* block\ncomment */ 7");
        assert_eq!(
            tokens,
            vec![
                Token::Integer("42".to_string()),
                Token::Integer("7".to_string()),
            ]
        );
    }

    #[test]
    fn test_island_block() {
        let tokens = kinds("#SQL{ select * from { nested } t }# 1");
        assert_eq!(
            tokens,
            vec![
                Token::IslandStart("SQL".to_string()),
                Token::IslandContent(" select * from ".to_string()),
                Token::IslandBraceOpen,
                Token::IslandContent(" nested ".to_string()),
                Token::IslandBraceClose,
                Token::IslandContent(" t ".to_string()),
                Token::IslandEnd,
                Token::Integer("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_island_hash_inside() {
        let tokens = kinds("#Ext{a # b}#");
        assert_eq!(
            tokens,
            vec![
                Token::IslandStart("Ext".to_string()),
                Token::IslandContent("a ".to_string()),
                Token::IslandHash,
                Token::IslandContent(" b".to_string()),
                Token::IslandEnd,
            ]
        );
    }

    #[test]
    fn test_unterminated_island() {
        let result = lex("#Ext{ never closed");
        match result.unwrap_err() {
            LoomError::ELexerError(LexerError::UnterminatedIsland, _) => {}
            other => panic!("Expected UnterminatedIsland, got {:?}", other),
        }
    }

    #[test]
    fn test_navigation_path_block() {
        let tokens = kinds("#/Person/name#");
        assert_eq!(
            tokens,
            vec![Token::NavigationPath("#/Person/name#".to_string())]
        );
    }

    #[test]
    fn test_file_name_marker() {
        let tokens = kinds("?[/models/person.loom:1,2,3,4,5,6]?");
        assert_eq!(tokens[0], Token::FileName("/models/person.loom".to_string()));
        assert_eq!(tokens[1], Token::Colon);
        assert_eq!(tokens.last().unwrap(), &Token::FileNameEnd);
    }

    #[test]
    fn test_eof_marker_is_appended() {
        let tokens = lex("1").unwrap();
        assert_eq!(tokens.last().unwrap().0, Token::Eof);
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = lex("a\n  b").unwrap();
        let (_, span) = &tokens[1];
        assert_eq!(span.start_line, 2);
        assert_eq!(span.start_column, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let result = lex("'no closing quote");
        match result.unwrap_err() {
            LoomError::ELexerError(LexerError::UnterminatedString, _) => {}
            other => panic!("Expected UnterminatedString, got {:?}", other),
        }
    }
}
