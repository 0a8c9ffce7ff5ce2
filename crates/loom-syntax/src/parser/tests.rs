//! Parser unit tests

use loom_core::errors::{LoomError, ParseError};
use loom_core::names::QualifiedName;

use super::ast::{
    AllForm, ArithmeticOp, Expr, InstanceAtomicValue, InstanceValue, Literal, MilestoningArg,
    Multiplicity, MultiplicityBound, OperationPart, Statement, Type,
};
use super::parser::{
    parse, parse_expression, parse_instance, parse_type, parse_with_diagnostics, ParseOutput,
    Parser,
};
use super::ExprId;

fn expr(source: &str) -> ParseOutput<ExprId> {
    let output = parse_expression(source).unwrap();
    assert!(
        output.diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        output.diagnostics
    );
    output
}

fn multiplicity(source: &str) -> Multiplicity {
    Parser::new(source).unwrap().parse_multiplicity().unwrap()
}

#[test]
fn test_qualified_name() {
    let output = expr("x::y::Foo");
    match output.arena.get(output.node) {
        Expr::ClassReference(name) => {
            assert_eq!(name, &QualifiedName::qualified(["x", "y"], "Foo"));
        }
        other => panic!("Expected class reference, got {:?}", other),
    }
}

#[test]
fn test_absolute_qualified_name() {
    let output = expr("::x::Foo");
    match output.arena.get(output.node) {
        Expr::ClassReference(name) => {
            assert!(name.absolute);
            assert_eq!(name.path, vec!["x"]);
            assert_eq!(name.name, "Foo");
        }
        other => panic!("Expected class reference, got {:?}", other),
    }
}

#[test]
fn test_multiplicity_range_unbounded() {
    let m = multiplicity("[1..*]");
    assert_eq!(
        m,
        Multiplicity::Bounds {
            from: Some(1),
            to: MultiplicityBound::Many,
        }
    );
    assert_eq!(m.lower(), Some(1));
    assert_eq!(m.upper(), None);
}

#[test]
fn test_multiplicity_single_bound() {
    // A bare [3] means exactly 3, with no separate from/to recorded
    let m = multiplicity("[3]");
    assert_eq!(
        m,
        Multiplicity::Bounds {
            from: None,
            to: MultiplicityBound::Finite(3),
        }
    );
    assert_eq!(m.lower(), Some(3));
    assert_eq!(m.upper(), Some(3));
}

#[test]
fn test_multiplicity_star_and_parameter() {
    assert_eq!(multiplicity("[*]").lower(), Some(0));
    assert_eq!(multiplicity("[*]").upper(), None);
    assert_eq!(multiplicity("[m]"), Multiplicity::Parameter("m".into()));
}

#[test]
fn test_multiplicity_lower_exceeds_upper() {
    let result = Parser::new("[5..2]").unwrap().parse_multiplicity();
    match result.unwrap_err() {
        LoomError::EParseError(ParseError::InvalidMultiplicity { lower: 5, upper: 2 }, _) => {}
        other => panic!("Expected InvalidMultiplicity, got {:?}", other),
    }
}

#[test]
fn test_lambda_with_typed_parameter() {
    let output = expr("{x: Integer[1] | $x + 1}");
    let lambda = match output.arena.get(output.node) {
        Expr::Lambda(lambda) => lambda,
        other => panic!("Expected lambda, got {:?}", other),
    };
    assert_eq!(lambda.parameters.len(), 1);
    let param = &lambda.parameters[0];
    assert_eq!(param.name, "x");
    let annotation = param.annotation.as_ref().unwrap();
    assert_eq!(
        annotation.ty,
        Type::Class {
            name: QualifiedName::bare("Integer"),
            type_arguments: vec![],
            multiplicity_arguments: vec![],
        }
    );
    assert_eq!(annotation.multiplicity, Multiplicity::one());

    assert_eq!(lambda.body.statements.len(), 1);
    let body = match &lambda.body.statements[0] {
        Statement::Expression(id) => *id,
        other => panic!("Expected expression statement, got {:?}", other),
    };
    match output.arena.get(body) {
        Expr::Combined { first, parts } => {
            assert_eq!(output.arena.get(*first), &Expr::Variable("x".into()));
            assert_eq!(parts.len(), 1);
            match &parts[0] {
                OperationPart::Arithmetic { op, operands } => {
                    assert_eq!(*op, ArithmeticOp::Add);
                    assert_eq!(operands.len(), 1);
                    assert_eq!(
                        output.arena.get(operands[0]),
                        &Expr::Literal(Literal::Integer(1))
                    );
                }
                other => panic!("Expected arithmetic part, got {:?}", other),
            }
        }
        other => panic!("Expected combined expression, got {:?}", other),
    }
}

#[test]
fn test_zero_parameter_lambda() {
    let output = expr("{| 1 + 2}");
    match output.arena.get(output.node) {
        Expr::Lambda(lambda) => {
            assert!(lambda.parameters.is_empty());
            assert_eq!(lambda.body.statements.len(), 1);
        }
        other => panic!("Expected lambda, got {:?}", other),
    }
}

#[test]
fn test_empty_lambda_body_is_an_error() {
    let result = parse_expression("{|}");
    match result.unwrap_err() {
        LoomError::EParseError(ParseError::EmptyCodeBlock, _) => {}
        other => panic!("Expected EmptyCodeBlock, got {:?}", other),
    }
}

#[test]
fn test_instance_literal_basic() {
    let output = parse_instance("new x::Foo(a = 1, b = 2)").unwrap();
    assert!(output.diagnostics.is_empty());
    let instance = &output.node;
    assert_eq!(instance.class, QualifiedName::qualified(["x"], "Foo"));
    assert!(instance.type_arguments.is_empty());
    assert!(instance.multiplicity_arguments.is_empty());
    assert!(instance.name.is_none());
    assert!(instance.mixin.is_none());
    assert_eq!(instance.assignments.len(), 2);
    assert_eq!(instance.assignments[0].property, "a");
    assert_eq!(
        instance.assignments[0].value,
        InstanceValue::Single(InstanceAtomicValue::Literal(Literal::Integer(1)))
    );
    assert_eq!(instance.assignments[1].property, "b");
}

#[test]
fn test_instance_literal_full_form() {
    let output = parse_instance(
        "new a::B<T|1> alias ?[/f.loom:1,2,3,4,5,6]? @a::Mixin(p = 1, q = [1, 2])",
    )
    .unwrap();
    assert!(output.diagnostics.is_empty());
    let instance = &output.node;
    assert_eq!(instance.class, QualifiedName::qualified(["a"], "B"));
    assert_eq!(instance.type_arguments.len(), 1);
    assert_eq!(
        instance.multiplicity_arguments,
        vec![Multiplicity::Bounds {
            from: None,
            to: MultiplicityBound::Finite(1),
        }]
    );
    assert_eq!(instance.name.as_deref(), Some("alias"));
    let marker = instance.source_info.as_ref().unwrap();
    assert_eq!(marker.file, "/f.loom");
    assert_eq!(marker.start_line, 1);
    assert_eq!(marker.end_column, 6);
    assert_eq!(
        instance.mixin,
        Some(QualifiedName::qualified(["a"], "Mixin"))
    );
    assert_eq!(instance.assignments.len(), 2);
    match &instance.assignments[1].value {
        InstanceValue::Vector(values) => assert_eq!(values.len(), 2),
        other => panic!("Expected vector value, got {:?}", other),
    }
}

#[test]
fn test_instance_enum_reference_value() {
    let output = parse_instance("new x::Foo(c = colours::Colour.RED)").unwrap();
    match &output.node.assignments[0].value {
        InstanceValue::Single(InstanceAtomicValue::EnumReference { enumeration, value }) => {
            assert_eq!(
                enumeration,
                &QualifiedName::qualified(["colours"], "Colour")
            );
            assert_eq!(value, "RED");
        }
        other => panic!("Expected enum reference, got {:?}", other),
    }
}

#[test]
fn test_nested_instance_value() {
    let output = parse_instance("new x::Foo(inner = new x::Bar(n = 'deep'))").unwrap();
    match &output.node.assignments[0].value {
        InstanceValue::Single(InstanceAtomicValue::Instance(inner)) => {
            assert_eq!(inner.class, QualifiedName::qualified(["x"], "Bar"));
        }
        other => panic!("Expected nested instance, got {:?}", other),
    }
}

#[test]
fn test_all_with_two_milestoning_args() {
    let output = expr("Person.all(%latest, %latest)");
    match output.arena.get(output.node) {
        Expr::AllFunction {
            class,
            form,
            milestoning,
        } => {
            assert_eq!(class, &QualifiedName::bare("Person"));
            assert_eq!(*form, AllForm::AllWithMilestoning);
            assert_eq!(
                milestoning,
                &vec![MilestoningArg::Latest, MilestoningArg::Latest]
            );
        }
        other => panic!("Expected all function, got {:?}", other),
    }
}

#[test]
fn test_all_second_milestoning_arg_is_optional() {
    let output = expr("Person.all(%latest)");
    match output.arena.get(output.node) {
        Expr::AllFunction { milestoning, .. } => assert_eq!(milestoning.len(), 1),
        other => panic!("Expected all function, got {:?}", other),
    }
}

#[test]
fn test_bare_all_and_all_versions() {
    let output = expr("Person.all()");
    match output.arena.get(output.node) {
        Expr::AllFunction {
            form, milestoning, ..
        } => {
            assert_eq!(*form, AllForm::All);
            assert!(milestoning.is_empty());
        }
        other => panic!("Expected all function, got {:?}", other),
    }

    let output = expr("Person.allVersions()");
    match output.arena.get(output.node) {
        Expr::AllFunction { form, .. } => assert_eq!(*form, AllForm::AllVersions),
        other => panic!("Expected all function, got {:?}", other),
    }
}

#[test]
fn test_all_versions_in_range_requires_two_args() {
    let output = expr("Person.allVersionsInRange(%2023-01-01, %latest)");
    match output.arena.get(output.node) {
        Expr::AllFunction {
            form, milestoning, ..
        } => {
            assert_eq!(*form, AllForm::AllVersionsInRange);
            assert_eq!(milestoning.len(), 2);
            assert_eq!(
                milestoning[0],
                MilestoningArg::Date("2023-01-01".into())
            );
        }
        other => panic!("Expected all function, got {:?}", other),
    }

    // One argument is a hard failure, not recoverable
    assert!(parse_expression("Person.allVersionsInRange(%latest)").is_err());
}

#[test]
fn test_milestoning_variable_arg() {
    let output = expr("Person.all($businessDate)");
    match output.arena.get(output.node) {
        Expr::AllFunction { milestoning, .. } => {
            assert_eq!(
                milestoning,
                &vec![MilestoningArg::Variable("businessDate".into())]
            );
        }
        other => panic!("Expected all function, got {:?}", other),
    }
}

#[test]
fn test_missing_close_paren_recovers_with_one_error() {
    let output = parse_instance("new x::Foo(a = 1, b = 2").unwrap();
    assert_eq!(output.diagnostics.len(), 1);
    assert!(output.diagnostics[0]
        .to_string()
        .contains("expected ')', found end of input"));
    assert_eq!(output.node.assignments.len(), 2);
}

#[test]
fn test_flat_left_to_right_chaining() {
    // No precedence climbing: 2 + 3 * 4 groups as (2 + 3) * 4, i.e. a
    // '+' part followed by a '*' part
    let output = expr("2 + 3 * 4");
    match output.arena.get(output.node) {
        Expr::Combined { parts, .. } => {
            assert_eq!(parts.len(), 2);
            match (&parts[0], &parts[1]) {
                (
                    OperationPart::Arithmetic { op: a, operands: x },
                    OperationPart::Arithmetic { op: b, operands: y },
                ) => {
                    assert_eq!(*a, ArithmeticOp::Add);
                    assert_eq!(x.len(), 1);
                    assert_eq!(*b, ArithmeticOp::Multiply);
                    assert_eq!(y.len(), 1);
                }
                other => panic!("Expected two arithmetic parts, got {:?}", other),
            }
        }
        other => panic!("Expected combined expression, got {:?}", other),
    }
}

#[test]
fn test_same_operator_run_is_flattened() {
    let output = expr("1 + 2 + 3");
    match output.arena.get(output.node) {
        Expr::Combined { parts, .. } => {
            assert_eq!(parts.len(), 1);
            match &parts[0] {
                OperationPart::Arithmetic { op, operands } => {
                    assert_eq!(*op, ArithmeticOp::Add);
                    assert_eq!(operands.len(), 2);
                }
                other => panic!("Expected arithmetic part, got {:?}", other),
            }
        }
        other => panic!("Expected combined expression, got {:?}", other),
    }
}

#[test]
fn test_boolean_parts_and_comparison() {
    let output = expr("$a < 3 && $b");
    match output.arena.get(output.node) {
        Expr::Combined { parts, .. } => {
            assert_eq!(parts.len(), 2);
            assert!(matches!(
                parts[0],
                OperationPart::Arithmetic {
                    op: ArithmeticOp::LessThan,
                    ..
                }
            ));
            assert!(matches!(parts[1], OperationPart::Boolean { .. }));
        }
        other => panic!("Expected combined expression, got {:?}", other),
    }
}

#[test]
fn test_equality_tail() {
    let output = expr("$x.name == 'Fred'");
    match output.arena.get(output.node) {
        Expr::Equality { left, right, .. } => {
            assert!(matches!(output.arena.get(*left), Expr::Property { .. }));
            assert_eq!(
                output.arena.get(*right),
                &Expr::Literal(Literal::String("Fred".into()))
            );
        }
        other => panic!("Expected equality, got {:?}", other),
    }
}

#[test]
fn test_postfix_property_chain() {
    let output = expr("$p.address.street");
    match output.arena.get(output.node) {
        Expr::Property { base, name, .. } => {
            assert_eq!(name, "street");
            assert!(matches!(output.arena.get(*base), Expr::Property { .. }));
        }
        other => panic!("Expected property access, got {:?}", other),
    }
}

#[test]
fn test_function_application_postfix() {
    let output = expr("Person.all()->filter({p | $p.age > 30})");
    match output.arena.get(output.node) {
        Expr::FunctionApplication {
            base,
            function,
            arguments,
        } => {
            assert!(matches!(output.arena.get(*base), Expr::AllFunction { .. }));
            assert_eq!(function, &QualifiedName::bare("filter"));
            assert_eq!(arguments.len(), 1);
        }
        other => panic!("Expected function application, got {:?}", other),
    }
}

#[test]
fn test_index_postfix_and_slice() {
    let output = expr("$xs[0]");
    assert!(matches!(
        output.arena.get(output.node),
        Expr::Index { .. }
    ));

    let output = expr("[1..5]");
    match output.arena.get(output.node) {
        Expr::Slice { from, to } => {
            assert_eq!(output.arena.get(*from), &Expr::Literal(Literal::Integer(1)));
            assert_eq!(output.arena.get(*to), &Expr::Literal(Literal::Integer(5)));
        }
        other => panic!("Expected slice, got {:?}", other),
    }

    let output = expr("[1, 2, 3]");
    match output.arena.get(output.node) {
        Expr::Array(elements) => assert_eq!(elements.len(), 3),
        other => panic!("Expected array, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_expression_accepts_postfix() {
    let output = expr("(1 + 2).toString()");
    match output.arena.get(output.node) {
        Expr::Property {
            base,
            name,
            arguments,
        } => {
            assert_eq!(name, "toString");
            assert_eq!(arguments.as_deref(), Some(&[][..]));
            assert!(matches!(output.arena.get(*base), Expr::Paren(_)));
        }
        other => panic!("Expected property call, got {:?}", other),
    }
}

#[test]
fn test_not_and_signed() {
    let output = expr("!$flag");
    assert!(matches!(output.arena.get(output.node), Expr::Not(_)));

    let output = expr("-5");
    match output.arena.get(output.node) {
        Expr::Signed { negative, operand } => {
            assert!(negative);
            assert_eq!(
                output.arena.get(*operand),
                &Expr::Literal(Literal::Integer(5))
            );
        }
        other => panic!("Expected signed expression, got {:?}", other),
    }
}

#[test]
fn test_literals() {
    for (source, expected) in [
        ("'hi'", Literal::String("hi".into())),
        ("42", Literal::Integer(42)),
        ("3.14", Literal::Float("3.14".into())),
        ("2.5d", Literal::Decimal("2.5".into())),
        ("%2023-01-15", Literal::Date("2023-01-15".into())),
        ("true", Literal::Boolean(true)),
        ("0x1F", Literal::Byte("1F".into())),
    ] {
        let output = expr(source);
        assert_eq!(
            output.arena.get(output.node),
            &Expr::Literal(expected),
            "literal {:?}",
            source
        );
    }
}

#[test]
fn test_soft_keyword_as_property_name() {
    let output = expr("$x.all");
    match output.arena.get(output.node) {
        Expr::Property { name, .. } => assert_eq!(name, "all"),
        other => panic!("Expected property access, got {:?}", other),
    }
}

#[test]
fn test_let_statements_in_code_block() {
    let output = parse("let x = 1; let y = $x + 2; $y").unwrap();
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.node.statements.len(), 3);
    match &output.node.statements[0] {
        Statement::Let { name, .. } => assert_eq!(name, "x"),
        other => panic!("Expected let statement, got {:?}", other),
    }
    assert!(matches!(
        output.node.statements[2],
        Statement::Expression(_)
    ));
}

#[test]
fn test_trailing_semicolon_tolerated() {
    let output = parse("1 + 2;").unwrap();
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.node.statements.len(), 1);
}

#[test]
fn test_code_block_resynchronizes_per_statement() {
    let (output, diagnostics) = parse_with_diagnostics("let x = ; let y = 2");
    assert_eq!(diagnostics.len(), 1);
    let output = output.unwrap();
    // The broken first statement is dropped; the second still parses
    assert_eq!(output.node.statements.len(), 1);
    match &output.node.statements[0] {
        Statement::Let { name, .. } => assert_eq!(name, "y"),
        other => panic!("Expected let statement, got {:?}", other),
    }
}

#[test]
fn test_no_viable_alternative_propagates() {
    let result = parse_expression(", 1");
    match result.unwrap_err() {
        err @ LoomError::EParseError(ParseError::NoViableAlternative { .. }, _) => {
            assert!(err.is_structural());
        }
        other => panic!("Expected NoViableAlternative, got {:?}", other),
    }
}

#[test]
fn test_island_without_extension_keeps_raw_span() {
    let output = expr("#SQL{select * from t}#");
    match output.arena.get(output.node) {
        Expr::Island { block, fragment } => {
            assert_eq!(block.name, "SQL");
            assert!(fragment.is_none());
            assert!(!block.parts.is_empty());
        }
        other => panic!("Expected island, got {:?}", other),
    }
}

#[test]
fn test_navigation_path_expression() {
    let output = expr("#/Person/name#");
    assert_eq!(
        output.arena.get(output.node),
        &Expr::NavigationPath("#/Person/name#".into())
    );
}

#[test]
fn test_type_start_rule() {
    assert_eq!(
        parse_type("Mass~Gram").unwrap(),
        Type::Unit {
            measure: QualifiedName::bare("Mass"),
            unit: "Gram".into(),
        }
    );

    match parse_type("{A[1], B[*] -> C[1]}").unwrap() {
        Type::Function {
            parameters,
            return_type,
            return_multiplicity,
        } => {
            assert_eq!(parameters.len(), 2);
            assert_eq!(
                *return_type,
                Type::Class {
                    name: QualifiedName::bare("C"),
                    type_arguments: vec![],
                    multiplicity_arguments: vec![],
                }
            );
            assert_eq!(return_multiplicity, Multiplicity::one());
        }
        other => panic!("Expected function type, got {:?}", other),
    }

    match parse_type("a::List<Foo|m>").unwrap() {
        Type::Class {
            type_arguments,
            multiplicity_arguments,
            ..
        } => {
            assert_eq!(type_arguments.len(), 1);
            assert_eq!(
                multiplicity_arguments,
                vec![Multiplicity::Parameter("m".into())]
            );
        }
        other => panic!("Expected class type, got {:?}", other),
    }
}

#[test]
fn test_multiplicity_only_generic_arguments() {
    match parse_type("Property<|1>").unwrap() {
        Type::Class {
            type_arguments,
            multiplicity_arguments,
            ..
        } => {
            assert!(type_arguments.is_empty());
            assert_eq!(multiplicity_arguments.len(), 1);
        }
        other => panic!("Expected class type, got {:?}", other),
    }
}

#[test]
fn test_determinism() {
    let source = "let r = Person.all()->filter({p | $p.age > 30}); $r.name";
    let a = parse(source).unwrap();
    let b = parse(source).unwrap();
    assert_eq!(format!("{:?}", a.node), format!("{:?}", b.node));
    assert_eq!(a.arena, b.arena);
}
