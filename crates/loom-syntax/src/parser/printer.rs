//! Canonical source reconstruction
//!
//! Renders a parse result back to Loom source in a single normalized
//! layout. Printing a successfully parsed tree and reparsing the output
//! yields an equivalent tree, which is what the round-trip tests lean on.

use std::fmt::Write;

use super::arena::ExprArena;
use super::ast::{
    AllForm, CodeBlock, Expr, ExprId, InstanceAtomicValue, InstanceLiteral, InstanceValue,
    IslandPart, Lambda, Literal, MilestoningArg, Multiplicity, MultiplicityBound, OperationPart,
    Statement, Type,
};

/// Prints expressions out of one arena
pub struct Printer<'a> {
    arena: &'a ExprArena,
}

impl<'a> Printer<'a> {
    pub fn new(arena: &'a ExprArena) -> Self {
        Printer { arena }
    }

    pub fn code_block(&self, block: &CodeBlock) -> String {
        let rendered: Vec<String> = block
            .statements
            .iter()
            .map(|statement| self.statement(statement))
            .collect();
        rendered.join("; ")
    }

    pub fn statement(&self, statement: &Statement) -> String {
        match statement {
            Statement::Let { name, value, .. } => {
                format!("let {} = {}", name, self.expr(*value))
            }
            Statement::Expression(expr) => self.expr(*expr),
        }
    }

    pub fn expr(&self, id: ExprId) -> String {
        match self.arena.get(id) {
            Expr::Literal(literal) => print_literal(literal),
            Expr::Variable(name) => format!("${}", name),
            Expr::ClassReference(name) => name.to_string(),
            Expr::AllFunction {
                class,
                form,
                milestoning,
            } => {
                let keyword = match form {
                    AllForm::All | AllForm::AllWithMilestoning => "all",
                    AllForm::AllVersions => "allVersions",
                    AllForm::AllVersionsInRange => "allVersionsInRange",
                };
                let args: Vec<String> = milestoning.iter().map(print_milestoning_arg).collect();
                format!("{}.{}({})", class, keyword, args.join(", "))
            }
            Expr::Instance(instance) => self.instance(instance),
            Expr::Lambda(lambda) => self.lambda(lambda),
            Expr::Array(elements) => {
                let rendered: Vec<String> = elements.iter().map(|e| self.expr(*e)).collect();
                format!("[{}]", rendered.join(", "))
            }
            Expr::Slice { from, to } => {
                format!("[{}..{}]", self.expr(*from), self.expr(*to))
            }
            Expr::Not(operand) => format!("!{}", self.expr(*operand)),
            Expr::Signed { negative, operand } => {
                format!("{}{}", if *negative { "-" } else { "+" }, self.expr(*operand))
            }
            Expr::Paren(inner) => format!("({})", self.expr(*inner)),
            Expr::Combined { first, parts } => {
                let mut out = self.expr(*first);
                for part in parts {
                    let (symbol, operands) = match part {
                        OperationPart::Arithmetic { op, operands } => (op.symbol(), operands),
                        OperationPart::Boolean { op, operands } => (op.symbol(), operands),
                    };
                    for operand in operands {
                        let _ = write!(out, " {} {}", symbol, self.expr(*operand));
                    }
                }
                out
            }
            Expr::Property {
                base,
                name,
                arguments,
            } => match arguments {
                Some(args) => {
                    let rendered: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
                    format!("{}.{}({})", self.expr(*base), name, rendered.join(", "))
                }
                None => format!("{}.{}", self.expr(*base), name),
            },
            Expr::FunctionApplication {
                base,
                function,
                arguments,
            } => {
                let rendered: Vec<String> = arguments.iter().map(|a| self.expr(*a)).collect();
                format!("{}->{}({})", self.expr(*base), function, rendered.join(", "))
            }
            Expr::Index { base, index } => {
                format!("{}[{}]", self.expr(*base), self.expr(*index))
            }
            Expr::Equality { left, op, right } => {
                format!("{} {} {}", self.expr(*left), op.symbol(), self.expr(*right))
            }
            Expr::Island { block, .. } => {
                let mut out = format!("#{}{{", block.name);
                for part in &block.parts {
                    match part {
                        IslandPart::Content(text) => out.push_str(text),
                        IslandPart::BraceOpen => out.push('{'),
                        IslandPart::BraceClose => out.push('}'),
                        IslandPart::Hash => out.push('#'),
                    }
                }
                out.push_str("}#");
                out
            }
            Expr::NavigationPath(path) => path.to_string(),
        }
    }

    pub fn lambda(&self, lambda: &Lambda) -> String {
        let params: Vec<String> = lambda
            .parameters
            .iter()
            .map(|param| match &param.annotation {
                Some(annotation) => format!(
                    "{}: {}{}",
                    param.name,
                    print_type(&annotation.ty),
                    print_multiplicity(&annotation.multiplicity)
                ),
                None => param.name.to_string(),
            })
            .collect();
        if params.is_empty() {
            format!("{{|{}}}", self.code_block(&lambda.body))
        } else {
            format!("{{{} | {}}}", params.join(", "), self.code_block(&lambda.body))
        }
    }

    pub fn instance(&self, instance: &InstanceLiteral) -> String {
        let mut out = format!("new {}", instance.class);
        out.push_str(&print_generic_arguments(
            &instance.type_arguments,
            &instance.multiplicity_arguments,
        ));
        if let Some(name) = &instance.name {
            let _ = write!(out, " {}", name);
        }
        if let Some(marker) = &instance.source_info {
            let _ = write!(
                out,
                " ?[{}:{},{},{},{},{},{}]?",
                marker.file,
                marker.start_line,
                marker.start_column,
                marker.line,
                marker.column,
                marker.end_line,
                marker.end_column
            );
        }
        if let Some(mixin) = &instance.mixin {
            let _ = write!(out, " @{}", mixin);
        }
        let assignments: Vec<String> = instance
            .assignments
            .iter()
            .map(|assignment| {
                format!(
                    "{} = {}",
                    assignment.property,
                    self.instance_value(&assignment.value)
                )
            })
            .collect();
        let _ = write!(out, "({})", assignments.join(", "));
        out
    }

    fn instance_value(&self, value: &InstanceValue) -> String {
        match value {
            InstanceValue::Single(atomic) => self.instance_atomic(atomic),
            InstanceValue::Vector(values) => {
                let rendered: Vec<String> =
                    values.iter().map(|v| self.instance_atomic(v)).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }

    fn instance_atomic(&self, value: &InstanceAtomicValue) -> String {
        match value {
            InstanceAtomicValue::Literal(literal) => print_literal(literal),
            InstanceAtomicValue::EnumReference { enumeration, value } => {
                format!("{}.{}", enumeration, value)
            }
            InstanceAtomicValue::Instance(instance) => self.instance(instance),
        }
    }
}

pub fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => format!("'{}'", escape_string(s)),
        Literal::Integer(n) => n.to_string(),
        Literal::Float(raw) => raw.to_string(),
        Literal::Decimal(raw) => format!("{}d", raw),
        Literal::Date(d) => format!("%{}", d),
        Literal::StrictTime(t) => format!("%{}", t),
        Literal::Boolean(b) => b.to_string(),
        Literal::Byte(hex) => format!("0x{}", hex),
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn print_milestoning_arg(arg: &MilestoningArg) -> String {
    match arg {
        MilestoningArg::Latest => "%latest".to_string(),
        MilestoningArg::Date(date) => format!("%{}", date),
        MilestoningArg::Variable(name) => format!("${}", name),
    }
}

pub fn print_multiplicity(multiplicity: &Multiplicity) -> String {
    match multiplicity {
        Multiplicity::Parameter(name) => format!("[{}]", name),
        Multiplicity::Bounds { from: None, to } => match to {
            MultiplicityBound::Finite(n) => format!("[{}]", n),
            MultiplicityBound::Many => "[*]".to_string(),
        },
        Multiplicity::Bounds { from: Some(from), to } => match to {
            MultiplicityBound::Finite(n) => format!("[{}..{}]", from, n),
            MultiplicityBound::Many => format!("[{}..*]", from),
        },
    }
}

pub fn print_type(ty: &Type) -> String {
    match ty {
        Type::Class {
            name,
            type_arguments,
            multiplicity_arguments,
        } => format!(
            "{}{}",
            name,
            print_generic_arguments(type_arguments, multiplicity_arguments)
        ),
        Type::Function {
            parameters,
            return_type,
            return_multiplicity,
        } => {
            let params: Vec<String> = parameters
                .iter()
                .map(|p| format!("{}{}", print_type(&p.ty), print_multiplicity(&p.multiplicity)))
                .collect();
            format!(
                "{{{} -> {}{}}}",
                params.join(", "),
                print_type(return_type),
                print_multiplicity(return_multiplicity)
            )
        }
        Type::Unit { measure, unit } => format!("{}~{}", measure, unit),
    }
}

fn print_generic_arguments(type_arguments: &[Type], multiplicity_arguments: &[Multiplicity]) -> String {
    if type_arguments.is_empty() && multiplicity_arguments.is_empty() {
        return String::new();
    }
    let types: Vec<String> = type_arguments.iter().map(print_type).collect();
    let mut out = format!("<{}", types.join(", "));
    if !multiplicity_arguments.is_empty() {
        let mults: Vec<String> = multiplicity_arguments
            .iter()
            .map(|m| {
                // Multiplicity arguments inside <> carry no brackets
                let bracketed = print_multiplicity(m);
                bracketed[1..bracketed.len() - 1].to_string()
            })
            .collect();
        let _ = write!(out, "|{}", mults.join(", "));
    }
    out.push('>');
    out
}
