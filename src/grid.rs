use derive_more::Display;
use ndarray::{Array3, ArrayView3, Axis, Zip};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::{
    error::{MetaFieldError, Result},
    types::{CompiledFunction, Point, Value},
};

/// Half the extent of the sampled box along the longest axis.
pub const HALF_EXTENT: Value = 50.0;

/// Default number of points per axis.
pub const DEFAULT_DIMENSION: usize = 18;

/// Number of lattice points along each axis.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{x}x{y}x{z}")]
pub struct Dimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::uniform(DEFAULT_DIMENSION)
    }
}

impl Dimensions {
    /// Dimensions without validation; see [`validate`](Dimensions::validate).
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub const fn uniform(n: usize) -> Self {
        Self::new(n, n, n)
    }

    /// Every axis needs two points to enclose at least one cell.
    pub fn validate(self) -> Result<Self> {
        if self.x < 2 || self.y < 2 || self.z < 2 {
            return Err(MetaFieldError::InvalidDimensions {
                x: self.x,
                y: self.y,
                z: self.z,
            });
        }
        Ok(self)
    }

    pub fn point_count(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn cell_count(&self) -> usize {
        self.x.saturating_sub(1) * self.y.saturating_sub(1) * self.z.saturating_sub(1)
    }

    fn longest(&self) -> usize {
        self.x.max(self.y).max(self.z)
    }

    /// `(z, y, x)` shape used by the backing array.
    fn shape(&self) -> (usize, usize, usize) {
        (self.z, self.y, self.x)
    }
}

/// A lattice of scalar samples centred on the origin.
///
/// All axes share one step, `2 * HALF_EXTENT / longest axis`, so voxels stay cubic
/// even when the point counts differ per axis.
///
/// Values are stored as `values[[z, y, x]]` in standard layout, so the flat scan
/// order is x fastest, then y, then z.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    dimensions: Dimensions,
    step: Value,
    min: Point,
    values: Array3<Value>,
}

impl Grid {
    /// Creates a zero-filled grid.
    pub fn new(dimensions: Dimensions) -> Result<Self> {
        let dimensions = dimensions.validate()?;
        let mut grid = Self {
            dimensions,
            step: 0.,
            min: Point::origin(),
            values: Array3::zeros(dimensions.shape()),
        };
        grid.calculate_steps();
        Ok(grid)
    }

    /// Half extent of one axis, `0.5 * dim * step`, computed without the rounding
    /// noise of multiplying by an inexact step.
    fn half_extent(&self, dim: usize) -> Value {
        HALF_EXTENT * dim as Value / self.dimensions.longest() as Value
    }

    fn calculate_steps(&mut self) {
        self.step = (2. * HALF_EXTENT) / self.dimensions.longest() as Value;
        let axis_min = |dim: usize| -self.half_extent(dim).floor();
        let min = Point::new(
            axis_min(self.dimensions.x),
            axis_min(self.dimensions.y),
            axis_min(self.dimensions.z),
        );
        self.min = min;
    }

    /// Changes the point counts, reallocating zero-filled storage.
    ///
    /// The step is recomputed for every axis since it depends on the longest one.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<()> {
        let dimensions = dimensions.validate()?;
        self.dimensions = dimensions;
        self.values = Array3::zeros(dimensions.shape());
        self.calculate_steps();
        Ok(())
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn point_count(&self) -> usize {
        self.dimensions.point_count()
    }

    pub fn cell_count(&self) -> usize {
        self.dimensions.cell_count()
    }

    pub fn step(&self) -> Value {
        self.step
    }

    /// Coordinates of lattice point `(0, 0, 0)`.
    pub fn min(&self) -> Point {
        self.min
    }

    /// Upper bound of the sampled box, `ceil(0.5 * dim * step)` per axis.
    pub fn max(&self) -> Point {
        let axis_max = |dim: usize| self.half_extent(dim).ceil();
        Point::new(
            axis_max(self.dimensions.x),
            axis_max(self.dimensions.y),
            axis_max(self.dimensions.z),
        )
    }

    /// Flat index of lattice point `(x, y, z)` in scan order.
    #[inline]
    pub fn point_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dimensions.x * (y + self.dimensions.y * z)
    }

    /// World-space position of lattice point `(x, y, z)`.
    #[inline]
    pub fn coord(&self, x: usize, y: usize, z: usize) -> Point {
        Point::new(
            self.min.x + x as Value * self.step,
            self.min.y + y as Value * self.step,
            self.min.z + z as Value * self.step,
        )
    }

    /// Returns the sample at lattice point `(x, y, z)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[z, y, x]]
    }

    /// Sets the sample at lattice point `(x, y, z)`.
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: Value) {
        self.values[[z, y, x]] = v
    }

    /// Read-only view indexed `[[z, y, x]]`.
    pub fn values(&self) -> ArrayView3<'_, Value> {
        self.values.view()
    }

    /// Samples in scan order (x fastest).
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Whether every sample is neither NaN nor infinite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    pub fn zeroize(&mut self) {
        self.values.fill(0.);
    }

    /// Fills the grid by evaluating `function` at every lattice point.
    pub fn fill(&mut self, function: &CompiledFunction<'_>) {
        self.fill_with(|| (), |_, p| function(p));
    }

    /// Fills the grid in parallel, one z-slab per task.
    ///
    /// `init` runs once per slab to build scratch state (an evaluation stack,
    /// variable bindings) that `sample` may mutate. Values are stored as
    /// produced, NaN included. The result does not depend on scheduling.
    pub fn fill_with<S, I, F>(&mut self, init: I, sample: F)
    where
        I: Fn() -> S + Sync,
        F: Fn(&mut S, Point) -> Value + Sync,
    {
        let _span = tracing::debug_span!("grid_fill", points = self.point_count()).entered();
        let (min, step) = (self.min, self.step);

        self.values
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(z, mut slab)| {
                let mut scratch = init();
                let pz = min.z + z as Value * step;
                for ((y, x), value) in slab.indexed_iter_mut() {
                    let p = Point::new(min.x + x as Value * step, min.y + y as Value * step, pz);
                    *value = sample(&mut scratch, p);
                }
            });
    }

    /// Adds `other` elementwise. Both grids must have the same dimensions.
    pub fn add_grid(&mut self, other: &Grid) -> Result<()> {
        self.check_same_dimensions(other)?;
        Zip::from(&mut self.values)
            .and(&other.values)
            .for_each(|a, &b| *a += b);
        Ok(())
    }

    /// Subtracts `other` elementwise. Both grids must have the same dimensions.
    pub fn subtract_grid(&mut self, other: &Grid) -> Result<()> {
        self.check_same_dimensions(other)?;
        Zip::from(&mut self.values)
            .and(&other.values)
            .for_each(|a, &b| *a -= b);
        Ok(())
    }

    fn check_same_dimensions(&self, other: &Grid) -> Result<()> {
        if self.dimensions != other.dimensions {
            log::error!(
                "grid arithmetic between {} ({} points) and {} ({} points)",
                self.dimensions,
                self.point_count(),
                other.dimensions,
                other.point_count()
            );
            return Err(MetaFieldError::GridMismatch {
                expected: self.dimensions,
                found: other.dimensions,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    #[test]
    fn default_grid_spans_fifty_units() {
        let grid = Grid::new(Dimensions::default()).unwrap();
        assert_eq!(grid.point_count(), 18 * 18 * 18);
        assert_eq!(grid.cell_count(), 17 * 17 * 17);
        assert_relative_eq!(grid.step(), 100. / 18.);
        assert_relative_eq!(grid.min().x, -50.);
        assert_relative_eq!(grid.max().x, 50.);
    }

    #[test]
    fn step_is_shared_by_all_axes() {
        let grid = Grid::new(Dimensions::new(20, 10, 4)).unwrap();
        assert_relative_eq!(grid.step(), 5.);
        assert_relative_eq!(grid.min().x, -50.);
        assert_relative_eq!(grid.min().y, -25.);
        assert_relative_eq!(grid.min().z, -10.);
        assert_relative_eq!(grid.coord(1, 1, 1).z, -5.);
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert_eq!(
            Grid::new(Dimensions::new(1, 4, 4)),
            Err(MetaFieldError::InvalidDimensions { x: 1, y: 4, z: 4 })
        );
    }

    #[test]
    fn resize_reallocates_zeroed_storage() {
        let mut grid = Grid::new(Dimensions::uniform(3)).unwrap();
        grid.fill(&|_| 7.);
        grid.set_dimensions(Dimensions::new(4, 5, 6)).unwrap();
        assert_eq!(grid.point_count(), 4 * 5 * 6);
        assert_eq!(grid.iter().count(), grid.point_count());
        assert!(grid.iter().all(|v| *v == 0.));
        assert_relative_eq!(grid.step(), 100. / 6.);
    }

    #[test]
    fn fill_uses_x_fastest_scan_order() {
        let mut grid = Grid::new(Dimensions::new(3, 2, 2)).unwrap();
        let (min, step) = (grid.min(), grid.step());
        grid.fill(&|p| {
            let x = ((p.x - min.x) / step).round();
            let y = ((p.y - min.y) / step).round();
            let z = ((p.z - min.z) / step).round();
            x + 3. * (y + 2. * z)
        });
        for (i, v) in grid.iter().enumerate() {
            assert_eq!(*v, i as Value);
        }
        assert_eq!(grid.point_index(2, 1, 1), 11);
        assert_eq!(grid.get(2, 1, 1), 11.);
    }

    #[test]
    fn fill_keeps_nan_samples() {
        let mut grid = Grid::new(Dimensions::uniform(2)).unwrap();
        assert!(grid.is_finite());
        grid.fill(&|_| Value::NAN);
        assert!(grid.iter().all(|v| v.is_nan()));
        assert!(!grid.is_finite());
    }

    #[test]
    fn fill_accepts_borrowing_closures() {
        let mut grid = Grid::new(Dimensions::uniform(3)).unwrap();
        let offset: Value = 4.;
        let shift = |p: Point| p.y + offset;
        grid.fill(&shift);
        assert_relative_eq!(grid.get(0, 2, 0), grid.coord(0, 2, 0).y + 4.);
    }

    #[test]
    fn add_and_subtract() {
        let mut a = Grid::new(Dimensions::uniform(3)).unwrap();
        let mut b = Grid::new(Dimensions::uniform(3)).unwrap();
        a.fill(&|p| p.x);
        b.fill(&|_| 2.);
        a.add_grid(&b).unwrap();
        assert_relative_eq!(a.get(0, 0, 0), -50. + 2.);
        a.subtract_grid(&b).unwrap();
        a.subtract_grid(&b).unwrap();
        assert_abs_diff_eq!(a.get(2, 0, 0), a.coord(2, 0, 0).x - 2., epsilon = 1e-4);
    }

    #[test]
    fn mismatched_arithmetic_is_an_error_and_no_op() {
        let mut a = Grid::new(Dimensions::uniform(3)).unwrap();
        let mut b = Grid::new(Dimensions::uniform(4)).unwrap();
        b.fill(&|_| 1.);
        assert!(matches!(
            a.add_grid(&b),
            Err(MetaFieldError::GridMismatch { .. })
        ));
        assert!(a.subtract_grid(&b).is_err());
        assert!(a.iter().all(|v| *v == 0.));
    }
}
