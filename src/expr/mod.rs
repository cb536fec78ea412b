//! Infix expressions compiled to postfix (RPN) and evaluated on a value stack.
//!
//! ```text
//! "x+y*z"  ──tokenize──▶  x + y * z  ──shunting-yard──▶  x y z * +
//! ```
//!
//! Operator priorities, low to high: `+ -`, `* /`, then `^ @`, unary minus and
//! named functions. Equal priorities associate to the left, so `-x^2`
//! evaluates as `(-x)^2` and `2^3^2` as `(2^3)^2`.

pub mod lexer;
pub mod token;
pub mod variables;

use std::fmt;

use crate::error::ParseError;

use lexer::{Lexeme, LexemeKind, tokenize};
use token::{BinaryOp, StackedOp, Token, UnaryOp};
pub use variables::{COORDINATE_NAMES, VariableStore};

/// Initial capacity of the evaluation stack. Deeper expressions still work,
/// the stack simply grows.
pub const EXECUTION_STACK_SIZE: usize = 120;

/// A compiled expression: postfix tokens plus the variables they refer to.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    tokens: Vec<Token>,
    variables: VariableStore,
}

impl Expression {
    /// Compiles infix `text`.
    ///
    /// Every identifier that is not a known function becomes a variable with
    /// value `0`, registered in order of first appearance.
    pub fn compile(text: &str) -> Result<Self, ParseError> {
        let lexemes = tokenize(text)?;
        if lexemes.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut variables = VariableStore::new();
        let tokens = to_postfix(&lexemes, &mut variables)?;

        Ok(Self {
            source: text.to_string(),
            tokens,
            variables,
        })
    }

    /// The infix text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    /// Space separated postfix form, with variables shown by name.
    pub fn postfix(&self) -> String {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Number(n) => n.to_string(),
                Token::Variable(slot) => self
                    .variables
                    .names()
                    .nth(*slot)
                    .unwrap_or("?")
                    .to_string(),
                Token::Unary(op) => op.to_string(),
                Token::Binary(op) => op.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Evaluates with the values currently held in [`variables`](Expression::variables).
    ///
    /// Allocates a fresh stack; use an [`Evaluator`] in loops.
    pub fn evaluate(&self) -> f64 {
        Evaluator::new().evaluate(self, self.variables.values())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Reusable evaluation stack.
///
/// One evaluator per thread; the stack is cleared after every evaluation so its
/// allocation is kept across calls.
#[derive(Debug)]
pub struct Evaluator {
    stack: Vec<f64>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(EXECUTION_STACK_SIZE),
        }
    }

    /// Runs `expression` with `bindings` as the value of each variable slot.
    ///
    /// `bindings` must hold at least as many values as the expression has
    /// variables. NaN and infinities are ordinary results.
    pub fn evaluate(&mut self, expression: &Expression, bindings: &[f64]) -> f64 {
        for token in &expression.tokens {
            match *token {
                Token::Number(n) => self.stack.push(n),
                Token::Variable(slot) => {
                    let value = bindings.get(slot).copied().unwrap_or(f64::NAN);
                    self.stack.push(value);
                }
                Token::Unary(op) => {
                    let operand = self.pop();
                    self.stack.push(op.apply(operand));
                }
                Token::Binary(op) => {
                    let right = self.pop();
                    let left = self.pop();
                    self.stack.push(op.apply(left, right));
                }
            }
        }

        debug_assert_eq!(self.stack.len(), 1, "postfix stack must end with one value");
        let result = self.pop();
        self.stack.clear();
        result
    }

    #[inline]
    fn pop(&mut self) -> f64 {
        // compile() only accepts well-formed expressions, so the stack never underflows
        self.stack.pop().unwrap_or(f64::NAN)
    }
}

/// Shunting-yard conversion with a grammar check.
///
/// `expect_operand` tracks whether the next lexeme must start an operand
/// (number, variable, function, `(` or unary minus) or continue after one
/// (binary operator or `)`).
fn to_postfix(lexemes: &[Lexeme], variables: &mut VariableStore) -> Result<Vec<Token>, ParseError> {
    let mut output: Vec<Token> = Vec::with_capacity(lexemes.len());
    let mut operators: Vec<StackedOp> = Vec::new();
    let mut open_parens: Vec<usize> = Vec::new();
    let mut expect_operand = true;

    for lexeme in lexemes {
        let unexpected = || ParseError::UnexpectedToken {
            token: lexeme.kind.describe(),
            position: lexeme.position,
        };

        match (&lexeme.kind, expect_operand) {
            (LexemeKind::Number(n), true) => {
                output.push(Token::Number(*n));
                expect_operand = false;
            }
            (LexemeKind::Identifier(name), true) => match UnaryOp::function(name) {
                Some(function) => operators.push(StackedOp::Unary(function)),
                None => {
                    output.push(Token::Variable(variables.add(name, 0.0)));
                    expect_operand = false;
                }
            },
            (LexemeKind::Operator('('), true) => {
                operators.push(StackedOp::OpenParen);
                open_parens.push(lexeme.position);
            }
            (LexemeKind::Operator('-'), true) => {
                operators.push(StackedOp::Unary(UnaryOp::Negate));
            }
            (LexemeKind::Operator(')'), false) => {
                if open_parens.pop().is_none() {
                    return Err(ParseError::UnbalancedParenthesis {
                        position: lexeme.position,
                    });
                }
                while let Some(op) = operators.pop() {
                    match op.token() {
                        Some(token) => output.push(token),
                        None => break,
                    }
                }
            }
            (LexemeKind::Operator(symbol), false) => {
                let op = BinaryOp::from_symbol(*symbol).ok_or_else(unexpected)?;
                while let Some(&top) = operators.last() {
                    if op.priority() > top.priority() {
                        break;
                    }
                    operators.pop();
                    if let Some(token) = top.token() {
                        output.push(token);
                    }
                }
                operators.push(StackedOp::Binary(op));
                expect_operand = true;
            }
            _ => return Err(unexpected()),
        }
    }

    if expect_operand {
        return Err(ParseError::UnexpectedEnd);
    }
    if let Some(position) = open_parens.pop() {
        return Err(ParseError::UnbalancedParenthesis { position });
    }

    while let Some(op) = operators.pop() {
        if let Some(token) = op.token() {
            output.push(token);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, bindings: &[(&str, f64)]) -> f64 {
        let mut expr = Expression::compile(text).unwrap();
        for (name, value) in bindings {
            expr.variables_mut().set(name, *value);
        }
        expr.evaluate()
    }

    #[test]
    fn precedence_and_parentheses() {
        let xyz = [("x", 1.0), ("y", 2.0), ("z", 3.0)];
        assert_eq!(eval("x+y*z", &xyz), 7.0);
        assert_eq!(eval("(x+y)*z", &xyz), 9.0);
        assert_eq!(eval("x-y-z", &xyz), -4.0);
        assert_eq!(eval("z/y/x", &xyz), 1.5);
    }

    #[test]
    fn postfix_rendering() {
        assert_eq!(Expression::compile("x+y*z").unwrap().postfix(), "x y z * +");
        assert_eq!(Expression::compile("(x+y)*z").unwrap().postfix(), "x y + z *");
        assert_eq!(Expression::compile("-x^2").unwrap().postfix(), "x neg 2 ^");
        assert_eq!(Expression::compile("2^-x").unwrap().postfix(), "2 x neg ^");
        assert_eq!(Expression::compile("sin(x)^2").unwrap().postfix(), "x sin 2 ^");
    }

    #[test]
    fn unary_minus_binds_like_power() {
        // equal priority, encounter order decides: (-x)^2
        assert_eq!(eval("-x^2", &[("x", 3.0)]), 9.0);
        assert_eq!(eval("0-x^2", &[("x", 3.0)]), -9.0);
        assert_eq!(eval("2*-x", &[("x", 3.0)]), -6.0);
        assert_eq!(eval("--x", &[("x", 3.0)]), 3.0);
    }

    #[test]
    fn power_is_left_associative() {
        assert_eq!(eval("2^3^2", &[]), 64.0);
    }

    #[test]
    fn prefix_operators_nest() {
        assert_eq!(eval("2^-x", &[("x", 1.0)]), 0.5);
        assert_eq!(eval("abs -x", &[("x", 4.0)]), 4.0);
        assert!((eval("2^sin(x)", &[("x", 0.0)]) - 1.0).abs() < 1e-12);
        assert!((eval("sqrt abs(x)", &[("x", -16.0)]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn functions_and_atan2() {
        assert!((eval("cos(0)+exp(0)", &[]) - 2.0).abs() < 1e-12);
        assert!((eval("arctg(1)*4", &[]) - std::f64::consts::PI).abs() < 1e-12);
        assert!((eval("1 @ 1", &[]) - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert!(eval("arccos(2)", &[]).is_nan());
    }

    #[test]
    fn variables_register_in_first_occurrence_order() {
        let expr = Expression::compile("r*x + k/x + r").unwrap();
        let names: Vec<_> = expr.variables().names().collect();
        assert_eq!(names, vec!["r", "x", "k"]);
        assert!(expr.variables().values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let expr = Expression::compile("sin(1.3)*exp(0.7)/3").unwrap();
        let mut evaluator = Evaluator::new();
        let first = evaluator.evaluate(&expr, &[]);
        for _ in 0..10 {
            assert_eq!(evaluator.evaluate(&expr, &[]).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn deep_expressions_outgrow_the_initial_stack() {
        let text = format!("{}1{}", "(1+".repeat(200), ")".repeat(200));
        assert_eq!(eval(&text, &[]), 201.0);
    }

    #[test]
    fn grammar_errors() {
        assert_eq!(Expression::compile(""), Err(ParseError::Empty));
        assert_eq!(Expression::compile("   "), Err(ParseError::Empty));
        assert_eq!(Expression::compile("x+"), Err(ParseError::UnexpectedEnd));
        assert_eq!(Expression::compile("sin"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(
            Expression::compile("x y"),
            Err(ParseError::UnexpectedToken { position: 2, .. })
        ));
        assert!(matches!(
            Expression::compile("*x"),
            Err(ParseError::UnexpectedToken { position: 0, .. })
        ));
        assert!(matches!(
            Expression::compile("2(x)"),
            Err(ParseError::UnexpectedToken { position: 1, .. })
        ));
        assert!(matches!(
            Expression::compile("+x"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_eq!(
            Expression::compile("(x+1"),
            Err(ParseError::UnbalancedParenthesis { position: 0 })
        );
        assert_eq!(
            Expression::compile("x+1)"),
            Err(ParseError::UnbalancedParenthesis { position: 3 })
        );
        assert!(matches!(
            Expression::compile("()"),
            Err(ParseError::UnexpectedToken { position: 1, .. })
        ));
    }
}
