//! Scalar fields built as a sum of meta-objects.
//!
//! Every [`MetaObject`] caches its samples on its own [`GridPair`]; the [`Field`]
//! holds the elementwise sum. Changing one member only costs that member's
//! resample plus two grid passes:
//!
//! ```text
//!   member.swap()            previous ← stale samples
//!   member.resample()        current  ← fresh samples
//!   field -= member.previous
//!   field += member.current
//! ```

pub mod meta;
pub mod object;
pub mod snapshot;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MetaFieldError, Result},
    expr::Expression,
    grid::Dimensions,
    types::{Point, Value},
};

pub use meta::{MetaObject, Predefined, Sampler, Source};
pub use object::{FieldObject, GridPair, Slot};
pub use snapshot::{FieldSnapshot, MetaObjectSnapshot};

/// Stable handle to a member of a [`Field`]. Never reused within one field.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display("#{_0}")]
pub struct MetaObjectId(u64);

/// Ordered collection of meta-objects and the grid of their sum.
///
/// The field only ever reads and writes the `current` grid of its pair. The pair
/// exists so that a field and its members share the [`FieldObject`] seam; the
/// back buffer is resized along with it and otherwise left zeroed.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    grids: GridPair,
    members: Vec<MetaObject>,
    next_id: u64,
}

impl Field {
    /// An empty field; its grid is all zeros.
    pub fn new(dimensions: Dimensions) -> Result<Self> {
        Ok(Self {
            grids: GridPair::new(dimensions)?,
            members: Vec::new(),
            next_id: 0,
        })
    }

    /// Members in insertion order.
    pub fn meta_objects(&self) -> &[MetaObject] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn meta_object(&self, id: MetaObjectId) -> Result<&MetaObject> {
        Ok(&self.members[self.index_of(id)?])
    }

    /// Direct access to a member. The field grid is not touched; call
    /// [`update_meta_object`](Field::update_meta_object) after changing it.
    pub fn meta_object_mut(&mut self, id: MetaObjectId) -> Result<&mut MetaObject> {
        let index = self.index_of(id)?;
        Ok(&mut self.members[index])
    }

    fn index_of(&self, id: MetaObjectId) -> Result<usize> {
        self.members
            .iter()
            .position(|member| member.id() == id)
            .ok_or(MetaFieldError::UnknownMetaObject(id))
    }

    /// Samples `source` once and adds it to the field grid.
    pub fn add_meta_object(&mut self, source: Source) -> Result<MetaObjectId> {
        let id = MetaObjectId(self.next_id);
        let member = MetaObject::new(id, source, self.dimensions())?;
        self.grids.current_mut().add_grid(member.grid())?;
        self.next_id += 1;

        log::debug!("added meta-object {id} `{}`", member.description());
        self.members.push(member);
        Ok(id)
    }

    /// Compiles `text` and adds it. Nothing changes on a parse error.
    pub fn add_expression(&mut self, text: &str) -> Result<MetaObjectId> {
        let expression = Expression::compile(text)?;
        self.add_meta_object(Source::Expression(expression))
    }

    /// Removes a member and its contribution. Rebuilds the sum instead when the
    /// member held non-finite samples.
    pub fn remove_meta_object(&mut self, id: MetaObjectId) -> Result<MetaObject> {
        let index = self.index_of(id)?;
        if !self.members[index].grid().is_finite() {
            // inf - inf and NaN - NaN can not be undone by subtraction
            let member = self.members.remove(index);
            log::debug!("removed meta-object {id} with non-finite samples, rebuilding");
            self.rebuild()?;
            return Ok(member);
        }
        self.grids
            .current_mut()
            .subtract_grid(self.members[index].grid())?;

        log::debug!("removed meta-object {id}");
        Ok(self.members.remove(index))
    }

    /// Resamples one member and patches the field grid with the difference.
    ///
    /// Falls back to [`rebuild`](Field::rebuild) when the member's old samples hold
    /// NaN or infinities, since those can not be subtracted back out.
    pub fn update_meta_object(&mut self, id: MetaObjectId) -> Result<()> {
        let index = self.index_of(id)?;
        let _span = tracing::debug_span!("update_meta_object", %id).entered();

        let member = &mut self.members[index];
        member.grids_mut().swap();
        member.resample();

        let member = &self.members[index];
        if !member.grids().previous().is_finite() {
            log::debug!("meta-object {id} had non-finite samples, rebuilding the field");
            return self.rebuild();
        }
        let field = self.grids.current_mut();
        field.subtract_grid(member.grids().previous())?;
        field.add_grid(member.grids().current())?;
        Ok(())
    }

    /// Recompiles a member from `text`, keeping values of same-named variables.
    ///
    /// On a parse error the member and the field are left untouched.
    pub fn set_expression(&mut self, id: MetaObjectId, text: &str) -> Result<()> {
        let index = self.index_of(id)?;
        let expression = Expression::compile(text).inspect_err(|e| {
            log::warn!("meta-object {id} keeps its expression, `{text}` does not parse: {e}")
        })?;
        self.members[index].set_expression(expression);
        self.update_meta_object(id)
    }

    /// Replaces a member's source outright.
    pub fn set_source(&mut self, id: MetaObjectId, source: Source) -> Result<()> {
        self.meta_object_mut(id)?.set_source(source);
        self.update_meta_object(id)
    }

    /// Sets one user variable and updates the field if the name exists.
    pub fn set_variable(&mut self, id: MetaObjectId, name: &str, value: f64) -> Result<bool> {
        let known = self.meta_object_mut(id)?.set_variable(name, value);
        if known {
            self.update_meta_object(id)?;
        } else {
            log::debug!("meta-object {id} has no variable `{name}`");
        }
        Ok(known)
    }

    /// Sets several user variables with a single update. Returns how many names
    /// were known.
    pub fn set_variables(&mut self, id: MetaObjectId, values: &[(&str, f64)]) -> Result<usize> {
        let member = self.meta_object_mut(id)?;
        let count = values
            .iter()
            .filter(|(name, value)| member.set_variable(name, *value))
            .count();
        if count > 0 {
            self.update_meta_object(id)?;
        }
        Ok(count)
    }

    /// Resizes the field and every member, then rebuilds the sum.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<()> {
        let dimensions = dimensions.validate()?;
        if dimensions == self.dimensions() {
            return Ok(());
        }
        let _span = tracing::debug_span!("set_dimensions", %dimensions).entered();

        for member in &mut self.members {
            member.set_dimensions(dimensions)?;
        }
        self.grids.set_dimensions(dimensions)?;
        self.rebuild()?;

        log::debug!("field resized to {dimensions}");
        Ok(())
    }

    pub fn set_uniform_dimension(&mut self, n: usize) -> Result<()> {
        self.set_dimensions(Dimensions::uniform(n))
    }

    pub fn set_x_dimension(&mut self, x: usize) -> Result<()> {
        self.set_dimensions(Dimensions { x, ..self.dimensions() })
    }

    pub fn set_y_dimension(&mut self, y: usize) -> Result<()> {
        self.set_dimensions(Dimensions { y, ..self.dimensions() })
    }

    pub fn set_z_dimension(&mut self, z: usize) -> Result<()> {
        self.set_dimensions(Dimensions { z, ..self.dimensions() })
    }

    /// Recomputes the field grid as the sum of the members' cached grids.
    ///
    /// Clears accumulated rounding from many incremental updates.
    pub fn rebuild(&mut self) -> Result<()> {
        let field = self.grids.current_mut();
        field.zeroize();
        for member in &self.members {
            field.add_grid(member.grid())?;
        }
        Ok(())
    }
}

impl FieldObject for Field {
    fn value_at(&self, point: Point) -> Value {
        self.members.iter().map(|member| member.value_at(point)).sum()
    }

    fn grids(&self) -> &GridPair {
        &self.grids
    }

    fn grids_mut(&mut self) -> &mut GridPair {
        &mut self.grids
    }

    /// Evaluates every member at every point, ignoring their cached grids.
    fn resample(&mut self) {
        let members = &self.members;
        self.grids.current_mut().fill_with(
            || {
                members
                    .iter()
                    .map(|member| Sampler::new(member.source()))
                    .collect::<Vec<_>>()
            },
            |samplers, p| samplers.iter_mut().map(|sampler| sampler.sample(p)).sum(),
        );
    }
}
