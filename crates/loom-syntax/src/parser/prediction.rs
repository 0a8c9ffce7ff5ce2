//! Token-level lookahead predicates
//!
//! Several grammar positions admit more than one alternative and the
//! winning one is always the first that matches. These predicates decide
//! which alternative that is by scanning tokens only - no node is built
//! and no diagnostic is reported, so a failed prediction leaves no trace.

use loom_core::shared::SpanInfo;

use crate::lexer::Token;

/// A read-only cursor over the token stream, used for speculation
pub(super) struct Scanner<'a> {
    tokens: &'a [(Token, SpanInfo)],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(tokens: &'a [(Token, SpanInfo)], pos: usize) -> Self {
        Self { tokens, pos }
    }

    pub(super) fn peek(&self) -> &'a Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |(token, _)| token)
    }

    pub(super) fn peek_at(&self, offset: usize) -> &'a Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&Token::Eof, |(token, _)| token)
    }

    pub(super) fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Consume `token` if it is next
    pub(super) fn eat(&mut self, token: &Token) -> bool {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume a word-like token if one is next
    pub(super) fn eat_identifier(&mut self) -> bool {
        if self.peek().is_identifier_like() {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume a qualified name: `::`? ident (`::` ident)*
    pub(super) fn eat_qualified_name(&mut self) -> bool {
        self.eat(&Token::PathSeparator);
        if !self.eat_identifier() {
            return false;
        }
        while matches!(self.peek(), Token::PathSeparator) {
            if !self.peek_at(1).is_identifier_like() {
                break;
            }
            self.bump();
            self.bump();
        }
        true
    }
}

/// At an opening `[`: true when the bracket encloses a slice, i.e. a `..`
/// occurs at nesting depth zero before the matching `]`. Otherwise the
/// bracket is an array literal (or an index when postfix).
pub(super) fn slice_ahead(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    debug_assert!(matches!(tokens.get(pos), Some((Token::BracketOpen, _))));
    let mut depth = 0usize;
    let mut scanner = Scanner::new(tokens, pos + 1);
    loop {
        match scanner.peek() {
            Token::Eof => return false,
            Token::BracketOpen | Token::ParenOpen | Token::BraceOpen => depth += 1,
            Token::BracketClose if depth == 0 => return false,
            Token::BracketClose | Token::ParenClose | Token::BraceClose => {
                depth = depth.saturating_sub(1);
            }
            Token::DotDot if depth == 0 => return true,
            _ => {}
        }
        scanner.bump();
    }
}

/// At a `let` token: true when the shape `let name =` follows, which is
/// what distinguishes a let statement from `let` used as an identifier.
pub(super) fn let_statement_ahead(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    let scanner = Scanner::new(tokens, pos);
    matches!(scanner.peek(), Token::Let)
        && scanner.peek_at(1).is_identifier_like()
        && matches!(scanner.peek_at(2), Token::Equal)
}

/// At an opening `{` in expression position: true when a `|` occurs at
/// nesting depth zero before the matching `}`, i.e. the block carries an
/// explicit lambda parameter list (possibly empty).
pub(super) fn lambda_pipe_ahead(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    debug_assert!(matches!(tokens.get(pos), Some((Token::BraceOpen, _))));
    let mut depth = 0usize;
    let mut scanner = Scanner::new(tokens, pos + 1);
    loop {
        match scanner.peek() {
            Token::Eof => return false,
            Token::BracketOpen | Token::ParenOpen | Token::BraceOpen => depth += 1,
            Token::BraceClose if depth == 0 => return false,
            Token::BracketClose | Token::ParenClose | Token::BraceClose => {
                depth = depth.saturating_sub(1);
            }
            Token::Pipe if depth == 0 => return true,
            _ => {}
        }
        scanner.bump();
    }
}

/// At the start of a potential all-function call: true when a qualified
/// name followed by `.` and one of the accessor keywords follows. This is
/// what separates `Person.all()` from a plain class reference with a
/// property access.
pub(super) fn all_function_ahead(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    let mut scanner = Scanner::new(tokens, pos);
    if !scanner.eat_qualified_name() {
        return false;
    }
    if !scanner.eat(&Token::Dot) {
        return false;
    }
    matches!(
        scanner.peek(),
        Token::All | Token::AllVersions | Token::AllVersionsInRange
    ) && matches!(scanner.peek_at(1), Token::ParenOpen)
}

/// At the start of a potential enum-reference instance value: true for a
/// qualified name followed by `.` and an identifier (not an accessor call).
pub(super) fn enum_reference_ahead(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    let mut scanner = Scanner::new(tokens, pos);
    if !scanner.eat_qualified_name() {
        return false;
    }
    scanner.eat(&Token::Dot) && scanner.peek().is_identifier_like()
}

/// Inside `<...>` type arguments, at the current token: true when only
/// multiplicity arguments remain, i.e. the argument list begins with `|`.
pub(super) fn multiplicity_arguments_next(tokens: &[(Token, SpanInfo)], pos: usize) -> bool {
    matches!(Scanner::new(tokens, pos).peek(), Token::Pipe)
}
