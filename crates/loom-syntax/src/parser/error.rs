//! Parser error construction helpers

use loom_core::errors::{LoomError, LoomErrorI, ParseError};
use loom_core::shared::SpanInfo;

use crate::lexer::Token;

pub type Result<T> = std::result::Result<T, LoomErrorI>;

/// Human-readable description of a token for error messages
pub fn describe_token(token: &Token) -> String {
    match token {
        Token::Eof => "end of input".to_string(),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::String(s) => format!("string '{}'", s),
        Token::Integer(n) => format!("integer {}", n),
        Token::Float(n) => format!("float {}", n),
        Token::Decimal(n) => format!("decimal {}d", n),
        Token::Date(d) => format!("date %{}", d),
        Token::StrictTime(t) => format!("time %{}", t),
        Token::Byte(b) => format!("byte 0x{}", b),
        Token::Let => "'let'".to_string(),
        Token::All => "'all'".to_string(),
        Token::AllVersions => "'allVersions'".to_string(),
        Token::AllVersionsInRange => "'allVersionsInRange'".to_string(),
        Token::New => "'new'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Latest => "'%latest'".to_string(),
        Token::NavigationPath(p) => format!("navigation path {}", p),
        Token::IslandStart(name) => format!("'#{}{{'", name),
        Token::IslandContent(_) => "island content".to_string(),
        Token::IslandHash => "'#'".to_string(),
        Token::IslandBraceOpen => "'{'".to_string(),
        Token::IslandBraceClose => "'}'".to_string(),
        Token::IslandEnd => "'}#'".to_string(),
        Token::FileName(f) => format!("'?[{}'", f),
        Token::FileNameEnd => "']?'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Semicolon => "';'".to_string(),
        Token::Colon => "':'".to_string(),
        Token::PathSeparator => "'::'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::DotDot => "'..'".to_string(),
        Token::Arrow => "'->'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::OrOr => "'||'".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::Not => "'!'".to_string(),
        Token::Equal => "'='".to_string(),
        Token::TestEqual => "'=='".to_string(),
        Token::NotEqual => "'!='".to_string(),
        Token::LessThan => "'<'".to_string(),
        Token::LessOrEqual => "'<='".to_string(),
        Token::GreaterThan => "'>'".to_string(),
        Token::GreaterOrEqual => "'>='".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::At => "'@'".to_string(),
        Token::Tilde => "'~'".to_string(),
        Token::Dollar => "'$'".to_string(),
    }
}

/// A terminal-level mismatch: recoverable
pub fn unexpected_token(expected: &str, found: &Token, info: SpanInfo) -> LoomErrorI {
    LoomError::EParseError(
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: describe_token(found),
        },
        info,
    )
}

/// A structural mismatch: no alternative of `rule` matches here. These
/// propagate rather than recover.
pub fn no_viable_alternative(rule: &str, found: &Token, info: SpanInfo) -> LoomErrorI {
    LoomError::EParseError(
        ParseError::NoViableAlternative {
            rule: rule.to_string(),
            found: describe_token(found),
        },
        info,
    )
}

/// A free-form structural error
pub fn syntax_error(message: impl Into<String>, info: SpanInfo) -> LoomErrorI {
    LoomError::EParseError(ParseError::SyntaxError(message.into()), info)
}
