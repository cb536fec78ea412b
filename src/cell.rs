use crate::{
    grid::Grid,
    mesh::with_flat_normal,
    polygonizer::Triangulation,
    tables::TETRAHEDRA,
    types::{Point, TriangleWithNormals, Value},
    utils::{get_corner_positions, get_corner_values, march_cube, march_tetrahedron},
};

/// One cube of the lattice: its 8 corners, their samples and the triangles last
/// emitted for them.
///
/// Corners follow the table ordering: 0..3 counter-clockwise on the lower z
/// face starting at `(x, y, z)`, 4..7 the same one step up.
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    position: [usize; 3],
    points: [Point; 8],
    values: [Value; 8],
    triangles: Vec<TriangleWithNormals>,
}

impl GridCell {
    /// Cell whose lowest corner is lattice point `(x, y, z)`.
    pub fn new(grid: &Grid, x: usize, y: usize, z: usize) -> Self {
        Self {
            position: [x, y, z],
            points: get_corner_positions(grid, x, y, z),
            values: get_corner_values(grid, x, y, z),
            triangles: Vec::new(),
        }
    }

    /// Free-standing cell from explicit corners.
    pub fn from_corners(points: [Point; 8], values: [Value; 8]) -> Self {
        Self {
            position: [0; 3],
            points,
            values,
            triangles: Vec::new(),
        }
    }

    pub fn position(&self) -> [usize; 3] {
        self.position
    }

    pub fn points(&self) -> &[Point; 8] {
        &self.points
    }

    pub fn values(&self) -> &[Value; 8] {
        &self.values
    }

    /// Re-reads the corner samples from `grid` and forgets the old triangles.
    pub fn refresh_values(&mut self, grid: &Grid) {
        let [x, y, z] = self.position;
        self.values = get_corner_values(grid, x, y, z);
        self.triangles.clear();
    }

    /// Replaces the cached triangles with a fresh polygonization at `iso`.
    pub fn triangulate(&mut self, iso: Value, strategy: Triangulation) {
        let mut raw = Vec::new();
        match strategy {
            Triangulation::MarchingCubes => march_cube(&self.points, &self.values, iso, &mut raw),
            Triangulation::MarchingTetrahedra => {
                for tetrahedron in TETRAHEDRA {
                    march_tetrahedron(&self.points, &self.values, tetrahedron, iso, &mut raw);
                }
            }
        }
        self.triangles.clear();
        self.triangles.extend(raw.into_iter().map(with_flat_normal));
    }

    /// Triangles from the last [`triangulate`](GridCell::triangulate), with flat normals.
    pub fn triangles(&self) -> &[TriangleWithNormals] {
        &self.triangles
    }

    pub fn has_triangles(&self) -> bool {
        !self.triangles.is_empty()
    }
}
