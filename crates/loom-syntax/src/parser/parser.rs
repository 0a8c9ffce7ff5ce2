//! Recursive-descent parser for the Loom language
//!
//! One function per grammar production, mutually recursive, driven by a
//! single cursor over the pre-lexed token stream. Where several
//! alternatives could match, the predicates in `prediction` pick one by
//! scanning ahead without consuming anything; the first alternative (in
//! declaration order) that admits a viable continuation wins.
//!
//! Error handling is two-tier. A mismatch on one specific expected token
//! recovers locally in [`Parser::consume`]: drop the offending token when
//! that exposes the expected one, otherwise report and continue as if the
//! token were present. Exactly one diagnostic is recorded per mismatch.
//! When no alternative of a rule matches at all, the rule aborts with a
//! structural error that propagates to the nearest enclosing code block,
//! which resynchronizes at the next `;` so later statements still parse.

use compact_str::CompactString;
use loom_core::errors::{LoomError, LoomErrorI, ParseError};
use loom_core::names::QualifiedName;
use loom_core::shared::SpanInfo;

use crate::lexer::{lex, Token};

use super::arena::ExprArena;
use super::ast::{
    AllForm, ArithmeticOp, BooleanOp, CodeBlock, EqualityOp, Expr, ExprId, FunctionTypeParameter,
    InstanceAtomicValue, InstanceLiteral, InstanceValue, IslandBlock, IslandPart, Lambda,
    LambdaParameter, Literal, MilestoningArg, Multiplicity, MultiplicityBound, OperationPart,
    PropertyAssignment, SourceInfoMarker, Statement, Type, TypeAnnotation,
};
use super::error::{no_viable_alternative, syntax_error, unexpected_token, Result};
use super::extension::ExtensionRegistry;
use super::prediction;

/// Everything a successful parse produces: the root node, the arena its
/// expressions live in, and any diagnostics recovered along the way. An
/// empty `diagnostics` list means the input was fully well-formed.
#[derive(Debug)]
pub struct ParseOutput<T> {
    pub node: T,
    pub arena: ExprArena,
    pub diagnostics: Vec<LoomErrorI>,
}

/// The parser state: token cursor, expression arena, and the append-only
/// diagnostics list.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<(Token, SpanInfo)>,
    position: usize,
    arena: ExprArena,
    errors: Vec<LoomErrorI>,
    extensions: ExtensionRegistry,
}

impl Parser {
    /// Lex `source` and build a parser over the resulting stream
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self::from_tokens(lex(source)?))
    }

    /// Build a parser over an already-lexed stream
    pub fn from_tokens(mut tokens: Vec<(Token, SpanInfo)>) -> Self {
        if !matches!(tokens.last(), Some((Token::Eof, _))) {
            let span = tokens.last().map_or_else(SpanInfo::empty, |(_, s)| *s);
            tokens.push((Token::Eof, span));
        }
        Parser {
            tokens,
            position: 0,
            arena: ExprArena::new(),
            errors: Vec::new(),
            extensions: ExtensionRegistry::new(),
        }
    }

    /// Attach island extensions for `#Name{...}#` blocks
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn current_token(&self) -> &Token {
        &self.tokens[self.position].0
    }

    fn current_span(&self) -> SpanInfo {
        self.tokens[self.position].1
    }

    fn at_eof(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current_token()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Match one specific expected token, with tier-1 recovery on
    /// mismatch: drop the offending token when the expected one directly
    /// follows it, otherwise record the mismatch and proceed as if the
    /// expected token were present. One diagnostic per mismatch; the
    /// cursor never moves backwards.
    fn consume(&mut self, expected: &Token, description: &str) -> SpanInfo {
        if self.check(expected) {
            let span = self.current_span();
            self.advance();
            return span;
        }

        let span = self.current_span();
        self.errors
            .push(unexpected_token(description, self.current_token(), span));

        if !self.at_eof() {
            if let Some((next, _)) = self.tokens.get(self.position + 1) {
                if std::mem::discriminant(next) == std::mem::discriminant(expected) {
                    // Deletion: skip the unexpected token, take the match
                    self.advance();
                    let span = self.current_span();
                    self.advance();
                    return span;
                }
            }
        }
        // Insertion: continue as if the expected token had been written
        span
    }

    /// One word-like token; soft keywords qualify. A mismatch here is
    /// structural - there is no sensible token to synthesize.
    fn parse_identifier(&mut self) -> Result<(CompactString, SpanInfo)> {
        let span = self.current_span();
        if let Some(text) = self.current_token().identifier_text() {
            let name = CompactString::from(text);
            self.advance();
            Ok((name, span))
        } else {
            Err(unexpected_token("identifier", self.current_token(), span))
        }
    }

    fn parse_u32(&mut self, description: &str) -> Result<(u32, SpanInfo)> {
        let span = self.current_span();
        if let Token::Integer(text) = self.current_token() {
            let value = text
                .parse::<u32>()
                .map_err(|_| syntax_error(format!("integer out of range: {}", text), span))?;
            self.advance();
            Ok((value, span))
        } else {
            Err(unexpected_token(description, self.current_token(), span))
        }
    }

    // ------------------------------------------------------------------
    // Names and types
    // ------------------------------------------------------------------

    /// qualifiedName = `::`? identifier (`::` identifier)*
    pub fn parse_qualified_name(&mut self) -> Result<(QualifiedName, SpanInfo)> {
        let start = self.current_span();
        let absolute = self.eat(&Token::PathSeparator);
        let (first, mut end) = self.parse_identifier()?;
        let mut segments = vec![first];

        while matches!(self.current_token(), Token::PathSeparator) {
            // Stop before a trailing `::` that no identifier follows; the
            // caller may own it (e.g. nothing does today, but the scanner
            // in prediction uses the same rule)
            let next = self
                .tokens
                .get(self.position + 1)
                .map(|(t, _)| t.is_identifier_like());
            if next != Some(true) {
                break;
            }
            self.advance();
            let (segment, span) = self.parse_identifier()?;
            segments.push(segment);
            end = span;
        }

        let name = segments.pop().unwrap_or_default();
        Ok((
            QualifiedName {
                path: segments,
                name,
                absolute,
            },
            SpanInfo::combine(start, end),
        ))
    }

    /// type = qualifiedName generics? | functionType | unitName
    pub fn parse_type(&mut self) -> Result<Type> {
        if self.check(&Token::BraceOpen) {
            return self.parse_function_type();
        }
        if !self.current_token().is_identifier_like()
            && !matches!(self.current_token(), Token::PathSeparator)
        {
            return Err(no_viable_alternative(
                "type",
                self.current_token(),
                self.current_span(),
            ));
        }

        let (name, _) = self.parse_qualified_name()?;

        if self.eat(&Token::Tilde) {
            let (unit, _) = self.parse_identifier()?;
            return Ok(Type::Unit {
                measure: name,
                unit,
            });
        }

        let (type_arguments, multiplicity_arguments) = if self.check(&Token::LessThan) {
            self.parse_generic_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Type::Class {
            name,
            type_arguments,
            multiplicity_arguments,
        })
    }

    /// `{` (functionTypePureType (`,` functionTypePureType)*)? `->` type multiplicity `}`
    fn parse_function_type(&mut self) -> Result<Type> {
        self.consume(&Token::BraceOpen, "'{'");

        let mut parameters = Vec::new();
        if !self.check(&Token::Arrow) {
            parameters.push(self.parse_function_type_parameter()?);
            while self.eat(&Token::Comma) {
                parameters.push(self.parse_function_type_parameter()?);
            }
        }
        self.consume(&Token::Arrow, "'->'");
        let return_type = Box::new(self.parse_type()?);
        let return_multiplicity = self.parse_multiplicity()?;
        self.consume(&Token::BraceClose, "'}'");

        Ok(Type::Function {
            parameters,
            return_type,
            return_multiplicity,
        })
    }

    fn parse_function_type_parameter(&mut self) -> Result<FunctionTypeParameter> {
        let ty = self.parse_type()?;
        let multiplicity = self.parse_multiplicity()?;
        Ok(FunctionTypeParameter { ty, multiplicity })
    }

    /// `<` typeArguments? (`|` multiplicityArguments)? `>` - the argument
    /// list may open directly with `|` when only multiplicity arguments
    /// are given, which is what the lookahead decides.
    fn parse_generic_arguments(&mut self) -> Result<(Vec<Type>, Vec<Multiplicity>)> {
        self.consume(&Token::LessThan, "'<'");

        let mut type_arguments = Vec::new();
        let mut multiplicity_arguments = Vec::new();

        if !prediction::multiplicity_arguments_next(&self.tokens, self.position)
            && !self.check(&Token::GreaterThan)
        {
            type_arguments.push(self.parse_type()?);
            while self.eat(&Token::Comma) {
                type_arguments.push(self.parse_type()?);
            }
        }

        if self.eat(&Token::Pipe) {
            multiplicity_arguments.push(self.parse_multiplicity_argument()?);
            while self.eat(&Token::Comma) {
                multiplicity_arguments.push(self.parse_multiplicity_argument()?);
            }
        }

        self.consume(&Token::GreaterThan, "'>'");
        Ok((type_arguments, multiplicity_arguments))
    }

    /// multiplicity = `[` multiplicityArgument `]`
    pub fn parse_multiplicity(&mut self) -> Result<Multiplicity> {
        self.consume(&Token::BracketOpen, "'['");
        let argument = self.parse_multiplicity_argument()?;
        self.consume(&Token::BracketClose, "']'");
        Ok(argument)
    }

    /// multiplicityArgument = `*` | INTEGER (`..` (INTEGER | `*`))? | identifier
    fn parse_multiplicity_argument(&mut self) -> Result<Multiplicity> {
        match self.current_token() {
            Token::Star => {
                self.advance();
                Ok(Multiplicity::Bounds {
                    from: None,
                    to: MultiplicityBound::Many,
                })
            }
            Token::Integer(_) => {
                let (lower, lower_span) = self.parse_u32("multiplicity bound")?;
                if !self.eat(&Token::DotDot) {
                    // A bare [n] is exactly n: no separate bounds recorded
                    return Ok(Multiplicity::Bounds {
                        from: None,
                        to: MultiplicityBound::Finite(lower),
                    });
                }
                let to = if self.eat(&Token::Star) {
                    MultiplicityBound::Many
                } else {
                    let (upper, upper_span) = self.parse_u32("multiplicity upper bound")?;
                    if lower > upper {
                        return Err(LoomError::EParseError(
                            ParseError::InvalidMultiplicity { lower, upper },
                            SpanInfo::combine(lower_span, upper_span),
                        ));
                    }
                    MultiplicityBound::Finite(upper)
                };
                Ok(Multiplicity::Bounds {
                    from: Some(lower),
                    to,
                })
            }
            t if t.is_identifier_like() => {
                let (name, _) = self.parse_identifier()?;
                Ok(Multiplicity::Parameter(name))
            }
            _ => Err(no_viable_alternative(
                "multiplicityArgument",
                self.current_token(),
                self.current_span(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Code blocks and statements
    // ------------------------------------------------------------------

    /// codeBlock = programLine (`;` programLine)* `;`?
    ///
    /// Statements are separated, not terminated; a trailing semicolon is
    /// tolerated. At least one statement is required. On a structural
    /// error inside a statement the block records it and resynchronizes
    /// at the next `;`, so several independent errors can surface from
    /// one parse.
    pub fn parse_code_block(&mut self, stop_at_brace: bool) -> Result<CodeBlock> {
        let start = self.current_span();
        let mut statements = Vec::new();

        loop {
            if self.block_ended(stop_at_brace) {
                break;
            }
            match self.parse_program_line() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize_statement(stop_at_brace);
                    continue;
                }
            }
            if self.eat(&Token::Semicolon) {
                continue;
            }
            if self.block_ended(stop_at_brace) {
                break;
            }
            let err = unexpected_token("';'", self.current_token(), self.current_span());
            self.errors.push(err);
            self.synchronize_statement(stop_at_brace);
        }

        if statements.is_empty() {
            return Err(LoomError::EParseError(ParseError::EmptyCodeBlock, start));
        }
        Ok(CodeBlock { statements })
    }

    fn block_ended(&self, stop_at_brace: bool) -> bool {
        self.at_eof() || (stop_at_brace && matches!(self.current_token(), Token::BraceClose))
    }

    /// Skip to just past the next statement separator. Always makes
    /// progress, so recovery cannot loop.
    fn synchronize_statement(&mut self, stop_at_brace: bool) {
        while !self.block_ended(stop_at_brace) {
            if self.eat(&Token::Semicolon) {
                return;
            }
            self.advance();
        }
    }

    /// programLine = letExpression | combinedExpression
    fn parse_program_line(&mut self) -> Result<Statement> {
        if prediction::let_statement_ahead(&self.tokens, self.position) {
            self.parse_let_statement()
        } else {
            Ok(Statement::Expression(self.parse_combined_expression()?))
        }
    }

    /// letExpression = `let` identifier `=` combinedExpression
    fn parse_let_statement(&mut self) -> Result<Statement> {
        let start = self.consume(&Token::Let, "'let'");
        let (name, _) = self.parse_identifier()?;
        self.consume(&Token::Equal, "'='");
        let value = self.parse_combined_expression()?;
        let info = SpanInfo::combine(start, self.arena.span(value));
        Ok(Statement::Let { name, value, info })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// combinedExpression = expression (arithmeticPart | booleanPart)*
    ///
    /// Operator chaining is flat and strictly left to right. A run of one
    /// operator becomes one part with its operands flattened; switching
    /// operator starts a new part. There is no precedence climbing:
    /// `2 + 3 * 4` groups as `(2 + 3) * 4`.
    pub fn parse_combined_expression(&mut self) -> Result<ExprId> {
        let first = self.parse_expression()?;
        let mut parts: Vec<OperationPart> = Vec::new();
        let mut end = self.arena.span(first);

        loop {
            if let Some(op) = arithmetic_op(self.current_token()) {
                let op_token = self.current_token().clone();
                let mut operands = Vec::new();
                while std::mem::discriminant(self.current_token())
                    == std::mem::discriminant(&op_token)
                {
                    self.advance();
                    let operand = self.parse_expression()?;
                    end = self.arena.span(operand);
                    operands.push(operand);
                }
                parts.push(OperationPart::Arithmetic { op, operands });
            } else if let Some(op) = boolean_op(self.current_token()) {
                let op_token = self.current_token().clone();
                let mut operands = Vec::new();
                while std::mem::discriminant(self.current_token())
                    == std::mem::discriminant(&op_token)
                {
                    self.advance();
                    let operand = self.parse_expression()?;
                    end = self.arena.span(operand);
                    operands.push(operand);
                }
                parts.push(OperationPart::Boolean { op, operands });
            } else {
                break;
            }
        }

        if parts.is_empty() {
            return Ok(first);
        }
        let info = SpanInfo::combine(self.arena.span(first), end);
        Ok(self.arena.alloc(Expr::Combined { first, parts }, info))
    }

    /// expression = base postfix* equalityTail?
    fn parse_expression(&mut self) -> Result<ExprId> {
        self.parse_expression_inner(true)
    }

    fn parse_expression_inner(&mut self, allow_equality: bool) -> Result<ExprId> {
        let base = self.parse_base_expression()?;
        let mut expr = self.parse_postfix_chain(base)?;

        if allow_equality {
            let op = match self.current_token() {
                Token::TestEqual => Some(EqualityOp::Equal),
                Token::NotEqual => Some(EqualityOp::NotEqual),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                let right = self.parse_arithmetic_only()?;
                let info =
                    SpanInfo::combine(self.arena.span(expr), self.arena.span(right));
                expr = self.arena.alloc(
                    Expr::Equality {
                        left: expr,
                        op,
                        right,
                    },
                    info,
                );
            }
        }
        Ok(expr)
    }

    /// The equality right side admits arithmetic chaining but no boolean
    /// parts and no further equality.
    fn parse_arithmetic_only(&mut self) -> Result<ExprId> {
        let first = self.parse_expression_inner(false)?;
        let mut parts: Vec<OperationPart> = Vec::new();
        let mut end = self.arena.span(first);

        while let Some(op) = arithmetic_op(self.current_token()) {
            let op_token = self.current_token().clone();
            let mut operands = Vec::new();
            while std::mem::discriminant(self.current_token()) == std::mem::discriminant(&op_token)
            {
                self.advance();
                let operand = self.parse_expression_inner(false)?;
                end = self.arena.span(operand);
                operands.push(operand);
            }
            parts.push(OperationPart::Arithmetic { op, operands });
        }

        if parts.is_empty() {
            return Ok(first);
        }
        let info = SpanInfo::combine(self.arena.span(first), end);
        Ok(self.arena.alloc(Expr::Combined { first, parts }, info))
    }

    /// atomicExpression and friends. Alternative order matters: the first
    /// alternative whose lookahead is viable wins.
    fn parse_base_expression(&mut self) -> Result<ExprId> {
        let span = self.current_span();
        match self.current_token() {
            Token::IslandStart(_) => self.parse_island(),
            Token::String(_)
            | Token::Integer(_)
            | Token::Float(_)
            | Token::Decimal(_)
            | Token::Date(_)
            | Token::StrictTime(_)
            | Token::Byte(_)
            | Token::True
            | Token::False => {
                let literal = self.parse_literal()?;
                Ok(self.arena.alloc(Expr::Literal(literal), span))
            }
            Token::New => {
                let instance = self.parse_instance_literal()?;
                let info = SpanInfo::combine(span, self.previous_span());
                Ok(self.arena.alloc(Expr::Instance(Box::new(instance)), info))
            }
            Token::Dollar => {
                self.advance();
                let (name, end) = self.parse_identifier()?;
                Ok(self
                    .arena
                    .alloc(Expr::Variable(name), SpanInfo::combine(span, end)))
            }
            Token::Not => {
                self.advance();
                let operand = self.parse_expression()?;
                let info = SpanInfo::combine(span, self.arena.span(operand));
                Ok(self.arena.alloc(Expr::Not(operand), info))
            }
            Token::Minus | Token::Plus => {
                let negative = matches!(self.current_token(), Token::Minus);
                self.advance();
                let operand = self.parse_expression_inner(false)?;
                let info = SpanInfo::combine(span, self.arena.span(operand));
                Ok(self
                    .arena
                    .alloc(Expr::Signed { negative, operand }, info))
            }
            Token::BracketOpen => {
                if prediction::slice_ahead(&self.tokens, self.position) {
                    self.parse_slice()
                } else {
                    self.parse_array()
                }
            }
            Token::BraceOpen => self.parse_lambda(),
            Token::NavigationPath(path) => {
                let path = CompactString::from(path.as_str());
                self.advance();
                Ok(self.arena.alloc(Expr::NavigationPath(path), span))
            }
            Token::ParenOpen => {
                self.advance();
                let inner = self.parse_combined_expression()?;
                let end = self.consume(&Token::ParenClose, "')'");
                Ok(self
                    .arena
                    .alloc(Expr::Paren(inner), SpanInfo::combine(span, end)))
            }
            t if t.is_identifier_like() || matches!(t, Token::PathSeparator) => {
                if prediction::all_function_ahead(&self.tokens, self.position) {
                    self.parse_all_function()
                } else {
                    let (name, info) = self.parse_qualified_name()?;
                    Ok(self.arena.alloc(Expr::ClassReference(name), info))
                }
            }
            _ => Err(no_viable_alternative(
                "atomicExpression",
                self.current_token(),
                span,
            )),
        }
    }

    fn previous_span(&self) -> SpanInfo {
        self.tokens
            .get(self.position.saturating_sub(1))
            .map_or_else(SpanInfo::empty, |(_, s)| *s)
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let span = self.current_span();
        let literal = match self.current_token() {
            Token::String(s) => Literal::String(CompactString::from(s.as_str())),
            Token::Integer(text) => {
                let value = text
                    .parse::<i64>()
                    .map_err(|_| syntax_error(format!("integer out of range: {}", text), span))?;
                Literal::Integer(value)
            }
            Token::Float(text) => Literal::Float(CompactString::from(text.as_str())),
            Token::Decimal(text) => Literal::Decimal(CompactString::from(text.as_str())),
            Token::Date(text) => Literal::Date(CompactString::from(text.as_str())),
            Token::StrictTime(text) => Literal::StrictTime(CompactString::from(text.as_str())),
            Token::Byte(text) => Literal::Byte(CompactString::from(text.as_str())),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            other => {
                return Err(no_viable_alternative("literal", other, span));
            }
        };
        self.advance();
        Ok(literal)
    }

    /// sliceExpression = `[` combinedExpression `..` combinedExpression `]`
    fn parse_slice(&mut self) -> Result<ExprId> {
        let start = self.consume(&Token::BracketOpen, "'['");
        let from = self.parse_combined_expression()?;
        self.consume(&Token::DotDot, "'..'");
        let to = self.parse_combined_expression()?;
        let end = self.consume(&Token::BracketClose, "']'");
        Ok(self
            .arena
            .alloc(Expr::Slice { from, to }, SpanInfo::combine(start, end)))
    }

    /// expressionsArray = `[` (combinedExpression (`,` combinedExpression)*)? `]`
    fn parse_array(&mut self) -> Result<ExprId> {
        let start = self.consume(&Token::BracketOpen, "'['");
        let mut elements = Vec::new();
        if !self.check(&Token::BracketClose) {
            elements.push(self.parse_combined_expression()?);
            while self.eat(&Token::Comma) {
                elements.push(self.parse_combined_expression()?);
            }
        }
        let end = self.consume(&Token::BracketClose, "']'");
        Ok(self
            .arena
            .alloc(Expr::Array(elements), SpanInfo::combine(start, end)))
    }

    /// lambdaFunction = `{` (lambdaParam (`,` lambdaParam)*)? `|` codeBlock `}`
    fn parse_lambda(&mut self) -> Result<ExprId> {
        let open_position = self.position;
        let start = self.consume(&Token::BraceOpen, "'{'");

        let mut parameters = Vec::new();
        if !self.check(&Token::Pipe)
            && prediction::lambda_pipe_ahead(&self.tokens, open_position)
        {
            parameters.push(self.parse_lambda_parameter()?);
            while self.eat(&Token::Comma) {
                parameters.push(self.parse_lambda_parameter()?);
            }
        }
        self.consume(&Token::Pipe, "'|'");
        let body = self.parse_code_block(true)?;
        let end = self.consume(&Token::BraceClose, "'}'");

        let lambda = Lambda { parameters, body };
        Ok(self
            .arena
            .alloc(Expr::Lambda(Box::new(lambda)), SpanInfo::combine(start, end)))
    }

    /// lambdaParam = identifier (`:` type multiplicity)?
    fn parse_lambda_parameter(&mut self) -> Result<LambdaParameter> {
        let (name, info) = self.parse_identifier()?;
        let annotation = if self.eat(&Token::Colon) {
            let ty = self.parse_type()?;
            let multiplicity = self.parse_multiplicity()?;
            Some(TypeAnnotation { ty, multiplicity })
        } else {
            None
        };
        Ok(LambdaParameter {
            name,
            annotation,
            info,
        })
    }

    /// Postfix chain: `.name`, `.name(args)`, `->fn(args)`, `[index]`,
    /// left-associative and unbounded.
    fn parse_postfix_chain(&mut self, base: ExprId) -> Result<ExprId> {
        let mut expr = base;
        loop {
            match self.current_token() {
                Token::Dot => {
                    self.advance();
                    let (name, name_span) = self.parse_identifier()?;
                    let mut end = name_span;
                    let arguments = if self.check(&Token::ParenOpen) {
                        self.advance();
                        let args = self.parse_argument_list()?;
                        end = self.consume(&Token::ParenClose, "')'");
                        Some(args)
                    } else {
                        None
                    };
                    let info = SpanInfo::combine(self.arena.span(expr), end);
                    expr = self.arena.alloc(
                        Expr::Property {
                            base: expr,
                            name,
                            arguments,
                        },
                        info,
                    );
                }
                Token::Arrow => {
                    self.advance();
                    let (function, _) = self.parse_qualified_name()?;
                    self.consume(&Token::ParenOpen, "'('");
                    let arguments = self.parse_argument_list()?;
                    let end = self.consume(&Token::ParenClose, "')'");
                    let info = SpanInfo::combine(self.arena.span(expr), end);
                    expr = self.arena.alloc(
                        Expr::FunctionApplication {
                            base: expr,
                            function,
                            arguments,
                        },
                        info,
                    );
                }
                Token::BracketOpen => {
                    self.advance();
                    let index = self.parse_combined_expression()?;
                    let end = self.consume(&Token::BracketClose, "']'");
                    let info = SpanInfo::combine(self.arena.span(expr), end);
                    expr = self
                        .arena
                        .alloc(Expr::Index { base: expr, index }, info);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<ExprId>> {
        let mut arguments = Vec::new();
        if !self.check(&Token::ParenClose) {
            arguments.push(self.parse_combined_expression()?);
            while self.eat(&Token::Comma) {
                arguments.push(self.parse_combined_expression()?);
            }
        }
        Ok(arguments)
    }

    // ------------------------------------------------------------------
    // All-instance accessors (milestoning)
    // ------------------------------------------------------------------

    /// allFunction / allVersionsFunction / allVersionsInRangeFunction /
    /// allFunctionWithMilestoning. The accessor keyword picks the form;
    /// the arity rules differ per form: `all()` takes none, `all(d)` and
    /// `all(d, d)` are the milestoned forms, `allVersions()` takes none,
    /// and `allVersionsInRange(d, d)` requires exactly two.
    fn parse_all_function(&mut self) -> Result<ExprId> {
        let start = self.current_span();
        let (class, _) = self.parse_qualified_name()?;
        self.consume(&Token::Dot, "'.'");

        let (form, milestoning, end) = match self.current_token().clone() {
            Token::All => {
                self.advance();
                self.consume(&Token::ParenOpen, "'('");
                if self.check(&Token::ParenClose) {
                    let end = self.consume(&Token::ParenClose, "')'");
                    (AllForm::All, Vec::new(), end)
                } else {
                    let mut milestoning = vec![self.parse_milestoning_arg()?];
                    if self.eat(&Token::Comma) {
                        milestoning.push(self.parse_milestoning_arg()?);
                    }
                    let end = self.consume(&Token::ParenClose, "')'");
                    (AllForm::AllWithMilestoning, milestoning, end)
                }
            }
            Token::AllVersions => {
                self.advance();
                self.consume(&Token::ParenOpen, "'('");
                let end = self.consume(&Token::ParenClose, "')'");
                (AllForm::AllVersions, Vec::new(), end)
            }
            Token::AllVersionsInRange => {
                self.advance();
                self.consume(&Token::ParenOpen, "'('");
                let first = self.parse_milestoning_arg()?;
                // Exactly two dates; a single argument is a hard error,
                // not something recovery may paper over
                if !self.check(&Token::Comma) {
                    return Err(unexpected_token(
                        "',' (allVersionsInRange takes exactly two date arguments)",
                        self.current_token(),
                        self.current_span(),
                    ));
                }
                self.advance();
                let second = self.parse_milestoning_arg()?;
                let end = self.consume(&Token::ParenClose, "')'");
                (AllForm::AllVersionsInRange, vec![first, second], end)
            }
            other => {
                return Err(no_viable_alternative(
                    "allFunction",
                    &other,
                    self.current_span(),
                ));
            }
        };

        Ok(self.arena.alloc(
            Expr::AllFunction {
                class,
                form,
                milestoning,
            },
            SpanInfo::combine(start, end),
        ))
    }

    /// milestoningArg = `%latest` | DATE | STRICTTIME | `$` identifier
    fn parse_milestoning_arg(&mut self) -> Result<MilestoningArg> {
        let span = self.current_span();
        match self.current_token().clone() {
            Token::Latest => {
                self.advance();
                Ok(MilestoningArg::Latest)
            }
            Token::Date(text) | Token::StrictTime(text) => {
                self.advance();
                Ok(MilestoningArg::Date(CompactString::from(text)))
            }
            Token::Dollar => {
                self.advance();
                let (name, _) = self.parse_identifier()?;
                Ok(MilestoningArg::Variable(name))
            }
            other => Err(no_viable_alternative("milestoningArg", &other, span)),
        }
    }

    // ------------------------------------------------------------------
    // Instance literals
    // ------------------------------------------------------------------

    /// instance = `new` qualifiedName generics? identifier? sourceInfo?
    ///            (`@` qualifiedName)? `(` assignments? `)`
    pub fn parse_instance_literal(&mut self) -> Result<InstanceLiteral> {
        self.consume(&Token::New, "'new'");
        let (class, _) = self.parse_qualified_name()?;

        let (type_arguments, multiplicity_arguments) = if self.check(&Token::LessThan) {
            self.parse_generic_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };

        let name = if self.current_token().is_identifier_like() {
            let (name, _) = self.parse_identifier()?;
            Some(name)
        } else {
            None
        };

        let source_info = if matches!(self.current_token(), Token::FileName(_)) {
            Some(self.parse_source_info_marker()?)
        } else {
            None
        };

        let mixin = if self.eat(&Token::At) {
            let (mixin, _) = self.parse_qualified_name()?;
            Some(mixin)
        } else {
            None
        };

        self.consume(&Token::ParenOpen, "'('");
        let mut assignments = Vec::new();
        if !self.check(&Token::ParenClose) && !self.at_eof() {
            assignments.push(self.parse_property_assignment()?);
            while self.eat(&Token::Comma) {
                assignments.push(self.parse_property_assignment()?);
            }
        }
        self.consume(&Token::ParenClose, "')'");

        Ok(InstanceLiteral {
            class,
            type_arguments,
            multiplicity_arguments,
            name,
            source_info,
            mixin,
            assignments,
        })
    }

    /// The fixed debug-location block:
    /// `?[` file `:` INT `,` INT `,` INT `,` INT `,` INT `,` INT `]?`
    fn parse_source_info_marker(&mut self) -> Result<SourceInfoMarker> {
        let file = match self.current_token() {
            Token::FileName(f) => CompactString::from(f.as_str()),
            other => {
                return Err(unexpected_token(
                    "source file marker",
                    other,
                    self.current_span(),
                ));
            }
        };
        self.advance();
        self.consume(&Token::Colon, "':'");

        let (start_line, _) = self.parse_u32("line number")?;
        let mut rest = [0u32; 5];
        for slot in &mut rest {
            self.consume(&Token::Comma, "','");
            let (value, _) = self.parse_u32("line or column number")?;
            *slot = value;
        }
        self.consume(&Token::FileNameEnd, "']?'");

        Ok(SourceInfoMarker {
            file,
            start_line,
            start_column: rest[0],
            line: rest[1],
            column: rest[2],
            end_line: rest[3],
            end_column: rest[4],
        })
    }

    /// propertyAssignment = identifier `=` instanceRightSide
    fn parse_property_assignment(&mut self) -> Result<PropertyAssignment> {
        let (property, start) = self.parse_identifier()?;
        self.consume(&Token::Equal, "'='");
        let value = self.parse_instance_value()?;
        let info = SpanInfo::combine(start, self.previous_span());
        Ok(PropertyAssignment {
            property,
            value,
            info,
        })
    }

    /// instanceRightSide = atomic | `[` (atomic (`,` atomic)*)? `]`
    fn parse_instance_value(&mut self) -> Result<InstanceValue> {
        if self.eat(&Token::BracketOpen) {
            let mut values = Vec::new();
            if !self.check(&Token::BracketClose) {
                values.push(self.parse_instance_atomic_value()?);
                while self.eat(&Token::Comma) {
                    values.push(self.parse_instance_atomic_value()?);
                }
            }
            self.consume(&Token::BracketClose, "']'");
            Ok(InstanceValue::Vector(values))
        } else {
            Ok(InstanceValue::Single(self.parse_instance_atomic_value()?))
        }
    }

    /// instanceAtomicRightSide = literal | enumReference | instance
    fn parse_instance_atomic_value(&mut self) -> Result<InstanceAtomicValue> {
        match self.current_token() {
            Token::String(_)
            | Token::Integer(_)
            | Token::Float(_)
            | Token::Decimal(_)
            | Token::Date(_)
            | Token::StrictTime(_)
            | Token::Byte(_)
            | Token::True
            | Token::False => Ok(InstanceAtomicValue::Literal(self.parse_literal()?)),
            Token::New => Ok(InstanceAtomicValue::Instance(Box::new(
                self.parse_instance_literal()?,
            ))),
            t if (t.is_identifier_like() || matches!(t, Token::PathSeparator))
                && prediction::enum_reference_ahead(&self.tokens, self.position) =>
            {
                let (enumeration, _) = self.parse_qualified_name()?;
                self.consume(&Token::Dot, "'.'");
                let (value, _) = self.parse_identifier()?;
                Ok(InstanceAtomicValue::EnumReference { enumeration, value })
            }
            _ => Err(no_viable_alternative(
                "instanceAtomicRightSide",
                self.current_token(),
                self.current_span(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Islands
    // ------------------------------------------------------------------

    /// islandDefinition: regroup the lexer's island tokens without
    /// interpreting them; the lexer already found the matching `}#`. When
    /// an extension is registered for the island's name, it parses the
    /// content into a structured fragment.
    fn parse_island(&mut self) -> Result<ExprId> {
        let start = self.current_span();
        let name = match self.current_token() {
            Token::IslandStart(name) => CompactString::from(name.as_str()),
            other => {
                return Err(unexpected_token("island start", other, start));
            }
        };
        self.advance();

        let mut parts = Vec::new();
        let end;
        loop {
            match self.current_token() {
                Token::IslandContent(text) => {
                    parts.push(IslandPart::Content(CompactString::from(text.as_str())));
                    self.advance();
                }
                Token::IslandBraceOpen => {
                    parts.push(IslandPart::BraceOpen);
                    self.advance();
                }
                Token::IslandBraceClose => {
                    parts.push(IslandPart::BraceClose);
                    self.advance();
                }
                Token::IslandHash => {
                    parts.push(IslandPart::Hash);
                    self.advance();
                }
                Token::IslandEnd => {
                    end = self.current_span();
                    self.advance();
                    break;
                }
                other => {
                    return Err(unexpected_token("island content or '}#'", other, self.current_span()));
                }
            }
        }

        let info = SpanInfo::combine(start, end);
        let block = IslandBlock { name, parts };
        let fragment = match self.extensions.get(&block.name) {
            Some(extension) => Some(extension.parse(&block, info)?),
            None => None,
        };
        Ok(self.arena.alloc(Expr::Island { block, fragment }, info))
    }

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    fn finish<T>(self, node: T) -> ParseOutput<T> {
        ParseOutput {
            node,
            arena: self.arena,
            diagnostics: self.errors,
        }
    }

    /// Require that the whole stream was consumed
    fn expect_eof(&mut self) {
        if !self.at_eof() {
            let err = unexpected_token("end of input", self.current_token(), self.current_span());
            self.errors.push(err);
        }
    }
}

fn arithmetic_op(token: &Token) -> Option<ArithmeticOp> {
    match token {
        Token::Plus => Some(ArithmeticOp::Add),
        Token::Minus => Some(ArithmeticOp::Subtract),
        Token::Star => Some(ArithmeticOp::Multiply),
        Token::Slash => Some(ArithmeticOp::Divide),
        Token::LessThan => Some(ArithmeticOp::LessThan),
        Token::LessOrEqual => Some(ArithmeticOp::LessOrEqual),
        Token::GreaterThan => Some(ArithmeticOp::GreaterThan),
        Token::GreaterOrEqual => Some(ArithmeticOp::GreaterOrEqual),
        _ => None,
    }
}

fn boolean_op(token: &Token) -> Option<BooleanOp> {
    match token {
        Token::AndAnd => Some(BooleanOp::And),
        Token::OrOr => Some(BooleanOp::Or),
        _ => None,
    }
}

// ----------------------------------------------------------------------
// Public entry points, one per start rule
// ----------------------------------------------------------------------

/// Parse a full code block (the usual translation-unit start rule). `Ok`
/// means the block was structurally parseable; recovered diagnostics, if
/// any, ride along in the output.
pub fn parse(source: &str) -> Result<ParseOutput<CodeBlock>> {
    let mut parser = Parser::new(source)?;
    let block = parser.parse_code_block(false)?;
    Ok(parser.finish(block))
}

/// Parse a single combined expression
pub fn parse_expression(source: &str) -> Result<ParseOutput<ExprId>> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_combined_expression()?;
    parser.expect_eof();
    Ok(parser.finish(expr))
}

/// Parse one instance literal
pub fn parse_instance(source: &str) -> Result<ParseOutput<InstanceLiteral>> {
    let mut parser = Parser::new(source)?;
    let instance = parser.parse_instance_literal()?;
    parser.expect_eof();
    Ok(parser.finish(instance))
}

/// Parse a type reference
pub fn parse_type(source: &str) -> Result<Type> {
    let mut parser = Parser::new(source)?;
    let ty = parser.parse_type()?;
    parser.expect_eof();
    if let Some(err) = parser.errors.into_iter().next() {
        return Err(err);
    }
    Ok(ty)
}

/// Best-effort parse for tooling: always returns every diagnostic, plus
/// the partial output when the start rule completed at all.
pub fn parse_with_diagnostics(source: &str) -> (Option<ParseOutput<CodeBlock>>, Vec<LoomErrorI>) {
    let mut parser = match Parser::new(source) {
        Ok(parser) => parser,
        Err(err) => return (None, vec![err]),
    };
    match parser.parse_code_block(false) {
        Ok(block) => {
            let output = parser.finish(block);
            let diagnostics = output.diagnostics.clone();
            (Some(output), diagnostics)
        }
        Err(err) => {
            let mut diagnostics = parser.errors;
            diagnostics.push(err);
            (None, diagnostics)
        }
    }
}
