//! Scalar fields built from meta-objects, each an infix expression of `x`, `y`
//! and `z`, and the Marching Cubes machinery that turns them into triangles.
//!
//! ```rust,ignore
//! let mut field = Field::new(Dimensions::uniform(32))?;
//! let ball = field.add_expression("r^2 / (x^2 + y^2 + z^2)")?;
//! field.set_variable(ball, "r", 30.)?;
//!
//! let mut polygonizer = Polygonizer::new(field.grid());
//! polygonizer.set_normal_mode(NormalMode::Smooth);
//! let triangles = polygonizer.shared_triangles();
//! ```

pub mod cell;
pub mod error;
pub mod expr;
pub mod field;
pub mod grid;
pub mod interp;
pub mod mesh;
pub mod polygonizer;
#[cfg(feature = "bevy")]
pub mod render;
pub mod tables;
pub mod types;
pub mod utils;

pub use error::{MetaFieldError, ParseError, Result};
pub use expr::{Evaluator, Expression};
pub use field::{
    Field, FieldObject, FieldSnapshot, MetaObject, MetaObjectId, MetaObjectSnapshot, Predefined,
    Source,
};
pub use grid::{Dimensions, Grid};
pub use polygonizer::{NormalMode, Polygonizer, PolygonizerConfig, Triangulation};
