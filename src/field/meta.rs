use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    expr::{COORDINATE_NAMES, Evaluator, Expression},
    grid::Dimensions,
    types::{Point, Value},
};

use super::{
    MetaObjectId,
    object::{FieldObject, GridPair},
};

/// Squared distance below which [`Predefined::InverseSquare`] stops growing.
const MIN_SQUARED_DISTANCE: Value = 1e-4;

/// Hard-coded field terms that skip expression evaluation entirely.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predefined {
    /// `radius² / |p|²`, centred on the origin. Equals 1 on the sphere of `radius`.
    InverseSquare { radius: Value },
}

impl Default for Predefined {
    fn default() -> Self {
        Self::InverseSquare { radius: 30. }
    }
}

impl Predefined {
    #[inline]
    pub fn value_at(&self, p: Point) -> Value {
        match *self {
            Self::InverseSquare { radius } => {
                let d2 = p.coords.norm_squared().max(MIN_SQUARED_DISTANCE);
                radius * radius / d2
            }
        }
    }
}

/// What a meta-object evaluates.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Expression(Expression),
    Predefined(Predefined),
}

impl From<Expression> for Source {
    fn from(expression: Expression) -> Self {
        Self::Expression(expression)
    }
}

impl From<Predefined> for Source {
    fn from(predefined: Predefined) -> Self {
        Self::Predefined(predefined)
    }
}

/// Per-thread evaluation state for one [`Source`].
///
/// Expression sources keep their own stack and a copy of the variable values
/// with the coordinate slots overwritten on every sample.
pub enum Sampler<'a> {
    Expression {
        expression: &'a Expression,
        evaluator: Evaluator,
        bindings: Vec<f64>,
        coordinates: [Option<usize>; 3],
    },
    Predefined(&'a Predefined),
}

impl<'a> Sampler<'a> {
    pub fn new(source: &'a Source) -> Self {
        match source {
            Source::Expression(expression) => {
                let variables = expression.variables();
                Self::Expression {
                    expression,
                    evaluator: Evaluator::new(),
                    bindings: variables.values().to_vec(),
                    coordinates: COORDINATE_NAMES.map(|name| variables.slot(name)),
                }
            }
            Source::Predefined(predefined) => Self::Predefined(predefined),
        }
    }

    #[inline]
    pub fn sample(&mut self, p: Point) -> Value {
        match self {
            Self::Expression {
                expression,
                evaluator,
                bindings,
                coordinates,
            } => {
                for (slot, value) in coordinates.iter().zip([p.x, p.y, p.z]) {
                    if let Some(slot) = slot {
                        bindings[*slot] = value as f64;
                    }
                }
                evaluator.evaluate(expression, bindings) as Value
            }
            Self::Predefined(predefined) => predefined.value_at(p),
        }
    }
}

/// One additive term of a [`Field`](super::Field), cached on its own pair of grids.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaObject {
    id: MetaObjectId,
    source: Source,
    grids: GridPair,
}

impl MetaObject {
    /// Creates the meta-object and samples it once.
    pub(crate) fn new(id: MetaObjectId, source: Source, dimensions: Dimensions) -> Result<Self> {
        let mut meta_object = Self {
            id,
            source,
            grids: GridPair::new(dimensions)?,
        };
        meta_object.resample();
        Ok(meta_object)
    }

    pub fn id(&self) -> MetaObjectId {
        self.id
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn expression(&self) -> Option<&Expression> {
        match &self.source {
            Source::Expression(expression) => Some(expression),
            Source::Predefined(_) => None,
        }
    }

    /// Human readable form: the infix text or the predefined term.
    pub fn description(&self) -> String {
        match &self.source {
            Source::Expression(expression) => expression.source().to_string(),
            Source::Predefined(predefined) => format!("{predefined:?}"),
        }
    }

    /// Adjustable parameters, i.e. expression variables other than `x`, `y`, `z`.
    pub fn user_variables(&self) -> Vec<(String, f64)> {
        match &self.source {
            Source::Expression(expression) => expression
                .variables()
                .user_variables()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            Source::Predefined(_) => Vec::new(),
        }
    }

    /// Sets a user variable. Does not resample; returns `false` for unknown names
    /// and for the coordinates, which are bound per sample.
    pub fn set_variable(&mut self, name: &str, value: f64) -> bool {
        if COORDINATE_NAMES.contains(&name) {
            return false;
        }
        match &mut self.source {
            Source::Expression(expression) => expression.variables_mut().set(name, value),
            Source::Predefined(_) => false,
        }
    }

    /// Replaces the source. Does not resample.
    pub fn set_source(&mut self, source: Source) {
        self.source = source;
    }

    /// Replaces the expression, keeping the values of user variables whose names
    /// survive. Does not resample.
    pub fn set_expression(&mut self, mut expression: Expression) {
        let carried = self.user_variables();
        let count = expression
            .variables_mut()
            .set_values(carried.iter().map(|(name, value)| (name.as_str(), *value)));
        log::debug!(
            "meta-object {} now `{}`, {count} variable value(s) carried over",
            self.id,
            expression.source()
        );
        self.source = Source::Expression(expression);
    }

    /// Resizes both grids and resamples. Only the owning field may do this, so
    /// members never drift out of step with its grid.
    pub(crate) fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<()> {
        self.grids.set_dimensions(dimensions)?;
        self.resample();
        Ok(())
    }
}

impl FieldObject for MetaObject {
    fn value_at(&self, point: Point) -> Value {
        Sampler::new(&self.source).sample(point)
    }

    fn grids(&self) -> &GridPair {
        &self.grids
    }

    fn grids_mut(&mut self) -> &mut GridPair {
        &mut self.grids
    }

    fn resample(&mut self) {
        let source = &self.source;
        self.grids
            .current_mut()
            .fill_with(|| Sampler::new(source), |sampler, p| sampler.sample(p));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn meta(text: &str) -> MetaObject {
        let source = Source::Expression(Expression::compile(text).unwrap());
        MetaObject::new(MetaObjectId(1), source, Dimensions::uniform(5)).unwrap()
    }

    #[test]
    fn samples_on_creation() {
        let m = meta("x + 2*y - z");
        let grid = m.grid();
        for (x, y, z) in [(0, 0, 0), (4, 1, 3), (2, 2, 2)] {
            let p = grid.coord(x, y, z);
            assert_relative_eq!(grid.get(x, y, z), p.x + 2. * p.y - p.z);
        }
    }

    #[test]
    fn value_at_binds_coordinates() {
        let m = meta("x*y*z + r");
        assert_relative_eq!(m.value_at(Point::new(1., 2., 3.)), 6.);
    }

    #[test]
    fn user_variables_exclude_coordinates() {
        let mut m = meta("r / sqrt(x^2 + y^2 + z^2) + k");
        assert_eq!(
            m.user_variables(),
            vec![("r".to_string(), 0.), ("k".to_string(), 0.)]
        );
        assert!(m.set_variable("r", 30.));
        assert!(!m.set_variable("x", 1.));
        assert!(!m.set_variable("missing", 1.));
        assert_relative_eq!(m.value_at(Point::new(3., 4., 0.)), 6.);
    }

    #[test]
    fn set_expression_carries_matching_variables() {
        let mut m = meta("r*x + k");
        m.set_variable("r", 2.);
        m.set_variable("k", 5.);
        m.set_expression(Expression::compile("r*y + q").unwrap());
        assert_eq!(
            m.user_variables(),
            vec![("r".to_string(), 2.), ("q".to_string(), 0.)]
        );
    }

    #[test]
    fn inverse_square_term() {
        let term = Predefined::default();
        assert_relative_eq!(term.value_at(Point::new(30., 0., 0.)), 1.);
        assert_relative_eq!(term.value_at(Point::new(0., 15., 0.)), 4.);
        assert!(term.value_at(Point::origin()).is_finite());

        let m = MetaObject::new(MetaObjectId(2), term.into(), Dimensions::uniform(3)).unwrap();
        assert!(m.user_variables().is_empty());
        assert_eq!(m.description(), "InverseSquare { radius: 30.0 }");
    }

    #[test]
    fn resize_resamples() {
        let mut m = meta("1");
        m.set_dimensions(Dimensions::new(2, 3, 4)).unwrap();
        assert_eq!(m.grid().point_count(), 24);
        assert!(m.grid().iter().all(|v| *v == 1.));
    }
}
