//! Typed AST for the Loom language
//!
//! One sum type per grammar category, one variant per alternative. Every
//! expression node lives in the [`ExprArena`](super::arena::ExprArena) and
//! is referenced by `ExprId`; the non-expression categories (types,
//! multiplicities, instance literals) are plain owned values since their
//! recursion is shallow.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

pub use super::arena::ExprId;
pub use loom_core::names::QualifiedName;
pub use loom_core::shared::SpanInfo;

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(CompactString),
    Integer(i64),
    /// Raw digits, kept textual so printing round-trips exactly
    Float(CompactString),
    /// Raw digits without the `d` suffix
    Decimal(CompactString),
    /// `%2023-01-15`, stored without the leading `%`
    Date(CompactString),
    /// `%2023-01-15T10:30:00`, stored without the leading `%`
    StrictTime(CompactString),
    Boolean(bool),
    /// Raw hex digits without the `0x` prefix
    Byte(CompactString),
}

/// Upper bound of a multiplicity range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiplicityBound {
    Finite(u32),
    /// `*`
    Many,
}

/// A cardinality constraint on a type occurrence.
///
/// The grammar's surface shape is kept so `[3]`, `[3..3]`, `[*]` and
/// `[0..*]` stay distinguishable; `lower()`/`upper()` give the semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    /// A named multiplicity parameter such as `[m]`
    Parameter(CompactString),
    /// `[to]`, `[from..to]`, `[*]`, `[from..*]`
    Bounds {
        from: Option<u32>,
        to: MultiplicityBound,
    },
}

impl Multiplicity {
    /// Effective lower bound; `None` for a named parameter
    pub fn lower(&self) -> Option<u32> {
        match self {
            Multiplicity::Parameter(_) => None,
            Multiplicity::Bounds { from: Some(n), .. } => Some(*n),
            // A bare [n] means exactly n; a bare [*] means zero or more
            Multiplicity::Bounds {
                from: None,
                to: MultiplicityBound::Finite(n),
            } => Some(*n),
            Multiplicity::Bounds {
                from: None,
                to: MultiplicityBound::Many,
            } => Some(0),
        }
    }

    /// Effective upper bound; `None` for unbounded or a named parameter
    pub fn upper(&self) -> Option<u32> {
        match self {
            Multiplicity::Parameter(_) => None,
            Multiplicity::Bounds {
                to: MultiplicityBound::Finite(n),
                ..
            } => Some(*n),
            Multiplicity::Bounds {
                to: MultiplicityBound::Many,
                ..
            } => None,
        }
    }

    /// The common `[1]` multiplicity
    pub fn one() -> Self {
        Multiplicity::Bounds {
            from: None,
            to: MultiplicityBound::Finite(1),
        }
    }
}

/// One parameter position of a function type: `Type[mult]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTypeParameter {
    pub ty: Type,
    pub multiplicity: Multiplicity,
}

/// Type references: exactly one of the three shapes holds per instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// `a::b::Class<T, U|m>`
    Class {
        name: QualifiedName,
        type_arguments: Vec<Type>,
        multiplicity_arguments: Vec<Multiplicity>,
    },
    /// `{A[1], B[*] -> C[1]}`
    Function {
        parameters: Vec<FunctionTypeParameter>,
        return_type: Box<Type>,
        return_multiplicity: Multiplicity,
    },
    /// `Mass~Gram`
    Unit {
        measure: QualifiedName,
        unit: CompactString,
    },
}

/// A type + multiplicity annotation, as written on lambda parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub ty: Type,
    pub multiplicity: Multiplicity,
}

/// Lambda parameter: `name` or `name: Type[mult]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParameter {
    pub name: CompactString,
    pub annotation: Option<TypeAnnotation>,
    pub info: SpanInfo,
}

/// `{params | codeBlock}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub parameters: Vec<LambdaParameter>,
    pub body: CodeBlock,
}

/// Statements separated by `;`, at least one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub statements: Vec<Statement>,
}

/// One program line of a code block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Let {
        name: CompactString,
        value: ExprId,
        info: SpanInfo,
    },
    Expression(ExprId),
}

/// Arithmetic-part operators (includes comparisons; the grammar treats
/// them all as one flat chaining family)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::LessThan => "<",
            ArithmeticOp::LessOrEqual => "<=",
            ArithmeticOp::GreaterThan => ">",
            ArithmeticOp::GreaterOrEqual => ">=",
        }
    }
}

/// Boolean-part operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BooleanOp::And => "&&",
            BooleanOp::Or => "||",
        }
    }
}

/// Equality operators of the trailing equality tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqualityOp {
    Equal,
    NotEqual,
}

impl EqualityOp {
    pub fn symbol(self) -> &'static str {
        match self {
            EqualityOp::Equal => "==",
            EqualityOp::NotEqual => "!=",
        }
    }
}

/// One operator part of a combined expression: a run of one operator and
/// the operands it consumed, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationPart {
    Arithmetic {
        op: ArithmeticOp,
        operands: Vec<ExprId>,
    },
    Boolean {
        op: BooleanOp,
        operands: Vec<ExprId>,
    },
}

/// The four "all instances" accessor forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllForm {
    /// `.all()` with no milestoning arguments
    All,
    /// `.all(date)` or `.all(date, date)`
    AllWithMilestoning,
    /// `.allVersions()`
    AllVersions,
    /// `.allVersionsInRange(date, date)` - exactly two
    AllVersionsInRange,
}

/// A milestoning date argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MilestoningArg {
    /// The `%latest` marker
    Latest,
    /// A date literal, stored without the leading `%`
    Date(CompactString),
    /// `$variable`
    Variable(CompactString),
}

/// An opaque island block: raw foreign content plus its brace structure,
/// exactly as delimited by the lexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandBlock {
    pub name: CompactString,
    pub parts: Vec<IslandPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IslandPart {
    Content(CompactString),
    BraceOpen,
    BraceClose,
    Hash,
}

/// The fixed 6-integer source-location marker embedded in instance
/// literals: `?[file:startLine,startColumn,line,column,endLine,endColumn]?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfoMarker {
    pub file: CompactString,
    pub start_line: u32,
    pub start_column: u32,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// `new a::B<T|1> alias ?[...]? @a::Mixin (p = 1, q = [1, 2])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceLiteral {
    pub class: QualifiedName,
    pub type_arguments: Vec<Type>,
    pub multiplicity_arguments: Vec<Multiplicity>,
    pub name: Option<CompactString>,
    pub source_info: Option<SourceInfoMarker>,
    pub mixin: Option<QualifiedName>,
    pub assignments: Vec<PropertyAssignment>,
}

/// `property = value` inside an instance literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAssignment {
    pub property: CompactString,
    pub value: InstanceValue,
    pub info: SpanInfo,
}

/// An instance property value, single or vector-wrapped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceValue {
    Single(InstanceAtomicValue),
    Vector(Vec<InstanceAtomicValue>),
}

/// One atomic instance value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceAtomicValue {
    Literal(Literal),
    /// `colours::Colour.RED`
    EnumReference {
        enumeration: QualifiedName,
        value: CompactString,
    },
    /// A nested object instance
    Instance(Box<InstanceLiteral>),
}

/// Expression nodes, arena-allocated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// `$name`
    Variable(CompactString),
    /// A bare class/enumeration/element reference
    ClassReference(QualifiedName),
    /// `Class.all(...)` / `.allVersions(...)` / `.allVersionsInRange(...)`
    AllFunction {
        class: QualifiedName,
        form: AllForm,
        milestoning: Vec<MilestoningArg>,
    },
    /// `new ...(...)`
    Instance(Box<InstanceLiteral>),
    Lambda(Box<Lambda>),
    /// `[a, b, c]`
    Array(Vec<ExprId>),
    /// `[from..to]`
    Slice { from: ExprId, to: ExprId },
    /// `!expr`
    Not(ExprId),
    /// `-expr` / `+expr`
    Signed { negative: bool, operand: ExprId },
    /// `(combinedExpression)`
    Paren(ExprId),
    /// Flat left-to-right operator chaining: `first` followed by operator
    /// parts in source order. There is NO precedence climbing here - a run
    /// of one operator is one part, switching operator starts a new part,
    /// and parts evaluate strictly left to right, so `2 + 3 * 4` is
    /// `[+ [2,3]] [* [4]]`, i.e. `(2 + 3) * 4`.
    Combined {
        first: ExprId,
        parts: Vec<OperationPart>,
    },
    /// `.name` or `.name(args)` postfix
    Property {
        base: ExprId,
        name: CompactString,
        arguments: Option<Vec<ExprId>>,
    },
    /// `->fn(args)` postfix
    FunctionApplication {
        base: ExprId,
        function: QualifiedName,
        arguments: Vec<ExprId>,
    },
    /// `[index]` postfix
    Index { base: ExprId, index: ExprId },
    /// Trailing `==` / `!=` with an arithmetic-only right side
    Equality {
        left: ExprId,
        op: EqualityOp,
        right: ExprId,
    },
    /// An embedded foreign-language block; `fragment` is present when a
    /// registered extension parsed the content
    Island {
        block: IslandBlock,
        fragment: Option<serde_json::Value>,
    },
    /// An opaque `#/.../#` navigation path, stored verbatim
    NavigationPath(CompactString),
}
