use metafield::{Evaluator, Expression, ParseError};

fn eval_xyz(text: &str, x: f64, y: f64, z: f64) -> f64 {
    let mut expr = Expression::compile(text).unwrap();
    expr.variables_mut().set_values([("x", x), ("y", y), ("z", z)]);
    expr.evaluate()
}

#[test]
fn precedence_and_parentheses() {
    assert_eq!(eval_xyz("x+y*z", 1., 2., 3.), 7.);
    assert_eq!(eval_xyz("(x+y)*z", 1., 2., 3.), 9.);
}

#[test]
fn unary_minus_shares_priority_with_power() {
    // encounter order breaks the tie, so the sign is applied first
    assert_eq!(eval_xyz("-x^2", 3., 0., 0.), 9.);
    assert_eq!(eval_xyz("-(x^2)", 3., 0., 0.), -9.);
    assert_eq!(eval_xyz("2^3^2", 0., 0., 0.), 64.);
}

#[test]
fn closed_expressions_are_referentially_transparent() {
    let expr = Expression::compile("sqrt(2) * arctg(3) - exp(0.5) @ 2 + abs(-7)/3").unwrap();
    let first = expr.evaluate();
    let mut evaluator = Evaluator::new();
    for _ in 0..100 {
        assert_eq!(expr.evaluate().to_bits(), first.to_bits());
        assert_eq!(evaluator.evaluate(&expr, &[]).to_bits(), first.to_bits());
    }
}

#[test]
fn variable_writes_need_no_recompile() {
    let mut expr = Expression::compile("r^2 / (x^2 + y^2 + z^2)").unwrap();
    expr.variables_mut().set_values([("r", 30.), ("x", 15.)]);
    assert_eq!(expr.evaluate(), 4.);
    expr.variables_mut().set("r", 15.);
    assert_eq!(expr.evaluate(), 1.);
}

#[test]
fn degenerate_math_is_a_value() {
    assert!(eval_xyz("1/x", 0., 0., 0.).is_infinite());
    assert!(eval_xyz("sqrt(x)", -1., 0., 0.).is_nan());
    assert!(eval_xyz("arccos(x)", 2., 0., 0.).is_nan());
}

#[test]
fn lexer_errors() {
    assert_eq!(
        Expression::compile("x $ y"),
        Err(ParseError::UnexpectedCharacter {
            character: '$',
            position: 2
        })
    );
    assert_eq!(
        Expression::compile("1.2.3"),
        Err(ParseError::MalformedNumber { position: 0 })
    );
    assert!(matches!(
        Expression::compile("x + ."),
        Err(ParseError::MalformedNumber { .. })
    ));
}

#[test]
fn display_shows_source_text() {
    let expr = Expression::compile("sin(x) * r").unwrap();
    assert_eq!(expr.to_string(), "sin(x) * r");
    assert_eq!(expr.postfix(), "x sin r *");
}
