use std::fmt;

/// Operator binding strength used while converting infix to postfix.
///
/// Only the ordering matters: an incoming binary operator pops every stacked
/// operator whose priority is lower or equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Open parenthesis; never popped by an operator.
    Lowest,
    /// `+ -`
    Low,
    /// `* /`
    Middle,
    /// `^ @`, unary minus and every named function.
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Sin,
    Cos,
    ArcCos,
    ArcTg,
    Sqrt,
    Exp,
    Abs,
}

impl UnaryOp {
    /// Looks up a named function. Anything else is a variable.
    pub fn function(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "arccos" => Some(Self::ArcCos),
            "arctg" => Some(Self::ArcTg),
            "sqrt" => Some(Self::Sqrt),
            "exp" => Some(Self::Exp),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    #[inline]
    pub fn apply(self, operand: f64) -> f64 {
        match self {
            Self::Negate => -operand,
            Self::Sin => operand.sin(),
            Self::Cos => operand.cos(),
            Self::ArcCos => operand.acos(),
            Self::ArcTg => operand.atan(),
            Self::Sqrt => operand.sqrt(),
            Self::Exp => operand.exp(),
            Self::Abs => operand.abs(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "neg",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::ArcCos => "arccos",
            Self::ArcTg => "arctg",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Abs => "abs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    /// `y @ x`, the two-argument arctangent.
    ArcTangent2,
}

impl BinaryOp {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            '^' => Some(Self::Power),
            '@' => Some(Self::ArcTangent2),
            _ => None,
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            Self::Add | Self::Subtract => Priority::Low,
            Self::Multiply | Self::Divide => Priority::Middle,
            Self::Power | Self::ArcTangent2 => Priority::High,
        }
    }

    /// `left` is the operand that was pushed first.
    #[inline]
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Subtract => left - right,
            Self::Multiply => left * right,
            Self::Divide => left / right,
            Self::Power => left.powf(right),
            Self::ArcTangent2 => left.atan2(right),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
            Self::Power => '^',
            Self::ArcTangent2 => '@',
        }
    }
}

/// One element of a compiled postfix expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    /// Slot in the owning expression's [`VariableStore`](super::VariableStore).
    Variable(usize),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// Entries of the operator stack during compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StackedOp {
    OpenParen,
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl StackedOp {
    pub(crate) fn priority(self) -> Priority {
        match self {
            Self::OpenParen => Priority::Lowest,
            Self::Unary(_) => Priority::High,
            Self::Binary(op) => op.priority(),
        }
    }

    /// The postfix token this operator becomes once popped.
    pub(crate) fn token(self) -> Option<Token> {
        match self {
            Self::OpenParen => None,
            Self::Unary(op) => Some(Token::Unary(op)),
            Self::Binary(op) => Some(Token::Binary(op)),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_are_ordered() {
        assert!(Priority::Lowest < Priority::Low);
        assert!(BinaryOp::Add.priority() < BinaryOp::Multiply.priority());
        assert!(BinaryOp::Divide.priority() < BinaryOp::Power.priority());
        assert_eq!(StackedOp::Unary(UnaryOp::Negate).priority(), Priority::High);
        assert_eq!(StackedOp::OpenParen.priority(), Priority::Lowest);
    }

    #[test]
    fn functions_are_recognized_by_name() {
        assert_eq!(UnaryOp::function("arctg"), Some(UnaryOp::ArcTg));
        assert_eq!(UnaryOp::function("tan"), None);
        assert_eq!(UnaryOp::function("x"), None);
    }

    #[test]
    fn domain_violations_are_values() {
        assert!(UnaryOp::ArcCos.apply(2.0).is_nan());
        assert!(UnaryOp::Sqrt.apply(-1.0).is_nan());
        assert!(BinaryOp::Divide.apply(1.0, 0.0).is_infinite());
        assert_eq!(BinaryOp::Subtract.apply(5.0, 3.0), 2.0);
        assert_eq!(BinaryOp::ArcTangent2.apply(1.0, 0.0), std::f64::consts::FRAC_PI_2);
    }
}
