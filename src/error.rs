use derive_more::{Display, From};

use crate::{field::MetaObjectId, grid::Dimensions};

pub type Result<T> = core::result::Result<T, MetaFieldError>;

#[derive(Clone, Debug, Display, From, PartialEq)]
pub enum MetaFieldError {
    /// The infix text could not be compiled.
    #[from]
    #[display("parse error: {_0}")]
    Parse(ParseError),
    /// Grid arithmetic between grids of different point counts.
    #[display("grid mismatch: expected {expected}, found {found}")]
    GridMismatch {
        expected: Dimensions,
        found: Dimensions,
    },
    /// Every axis needs at least two points to hold one cell.
    #[display("invalid grid dimensions {x}x{y}x{z}")]
    InvalidDimensions { x: usize, y: usize, z: usize },
    #[display("no meta-object with id {_0}")]
    UnknownMetaObject(MetaObjectId),
}

impl std::error::Error for MetaFieldError {}

/// Reasons an infix expression is rejected. Positions are byte offsets into the source text.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum ParseError {
    #[display("expression is empty")]
    Empty,
    #[display("unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[display("malformed number at {position}")]
    MalformedNumber { position: usize },
    #[display("unexpected '{token}' at {position}")]
    UnexpectedToken { token: String, position: usize },
    #[display("expression ends where an operand is expected")]
    UnexpectedEnd,
    #[display("unbalanced parenthesis at {position}")]
    UnbalancedParenthesis { position: usize },
}

impl std::error::Error for ParseError {}
