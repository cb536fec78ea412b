use crate::{
    error::Result,
    grid::{Dimensions, Grid},
    types::{Point, Value},
};

/// Which of the two buffers in a [`GridPair`] is visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Front,
    Back,
}

impl Slot {
    fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Front => 0,
            Self::Back => 1,
        }
    }
}

/// Two same-sized grids: the current samples and the snapshot before the last swap.
///
/// ```text
///   swap ──▶ current ⇄ previous
/// ```
///
/// Keeping the old samples around lets a [`Field`](super::Field) remove a member's
/// stale contribution after the member has already been resampled.
#[derive(Clone, Debug, PartialEq)]
pub struct GridPair {
    grids: [Grid; 2],
    current: Slot,
}

impl GridPair {
    /// Two zero-filled grids.
    pub fn new(dimensions: Dimensions) -> Result<Self> {
        Ok(Self {
            grids: [Grid::new(dimensions)?, Grid::new(dimensions)?],
            current: Slot::Front,
        })
    }

    pub fn current(&self) -> &Grid {
        &self.grids[self.current.index()]
    }

    pub fn current_mut(&mut self) -> &mut Grid {
        &mut self.grids[self.current.index()]
    }

    pub fn previous(&self) -> &Grid {
        &self.grids[self.current.other().index()]
    }

    pub fn slot(&self) -> Slot {
        self.current
    }

    /// Makes the previous grid current and vice versa.
    pub fn swap(&mut self) {
        self.current = self.current.other();
    }

    pub fn dimensions(&self) -> Dimensions {
        self.current().dimensions()
    }

    /// Resizes both buffers. Their contents are zeroed.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<()> {
        for grid in &mut self.grids {
            grid.set_dimensions(dimensions)?;
        }
        Ok(())
    }
}

/// Something that can be evaluated anywhere in space and cached on a grid.
///
/// Implemented by [`MetaObject`](super::MetaObject) and [`Field`](super::Field).
pub trait FieldObject {
    /// Field value at an arbitrary point.
    fn value_at(&self, point: Point) -> Value;

    fn grids(&self) -> &GridPair;

    fn grids_mut(&mut self) -> &mut GridPair;

    /// Samples [`value_at`](FieldObject::value_at) into the current grid.
    fn resample(&mut self);

    /// The externally visible grid.
    fn grid(&self) -> &Grid {
        self.grids().current()
    }

    fn dimensions(&self) -> Dimensions {
        self.grids().dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_alternates_buffers() {
        let mut pair = GridPair::new(Dimensions::uniform(2)).unwrap();
        pair.current_mut().set(0, 0, 0, 1.);
        assert_eq!(pair.slot(), Slot::Front);

        pair.swap();
        assert_eq!(pair.slot(), Slot::Back);
        assert_eq!(pair.current().get(0, 0, 0), 0.);
        assert_eq!(pair.previous().get(0, 0, 0), 1.);

        pair.swap();
        assert_eq!(pair.current().get(0, 0, 0), 1.);
    }

    #[test]
    fn resize_touches_both_buffers() {
        let mut pair = GridPair::new(Dimensions::uniform(2)).unwrap();
        pair.set_dimensions(Dimensions::new(3, 4, 5)).unwrap();
        assert_eq!(pair.current().point_count(), 60);
        assert_eq!(pair.previous().point_count(), 60);
    }
}
