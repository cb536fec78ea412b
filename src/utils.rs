use crate::{
    grid::Grid,
    interp::interpolate_cross_point,
    tables::{CORNER_OFFSETS, CORNER_POINT_INDICES, EDGE_TABLE, TRI_TABLE},
    types::{Point, Triangle, Value},
};

/// Computes the marching cubes state bitmask for a voxel or tetrahedron.
///
/// Each corner maps to one bit. A bit is set when the corner's value is
/// **strictly below** `iso` (i.e. "inside" the surface):
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 inside?
/// ```
///
/// NaN compares false and therefore counts as outside.
#[inline]
pub fn get_state(corner_values: &[Value], iso: Value) -> usize {
    corner_values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < iso)
        .fold(0, |state, (i, _)| state | 1 << i)
}

/// Returns the 8 world-space corner positions of the cell at lattice index `(x, y, z)`.
#[inline]
pub fn get_corner_positions(grid: &Grid, x: usize, y: usize, z: usize) -> [Point; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| grid.coord(x + dx, y + dy, z + dz))
}

/// Returns the samples at the 8 corners of the cell at lattice index `(x, y, z)`.
#[inline]
pub fn get_corner_values(grid: &Grid, x: usize, y: usize, z: usize) -> [Value; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| grid.get(x + dx, y + dy, z + dz))
}

/// Interpolates the crossing point along each edge of the voxel that the surface cuts.
///
/// `edges_mask` is a 12-bit field from `EDGE_TABLE`; a set bit means that edge is active.
#[inline]
pub fn get_edge_midpoints(
    edges_mask: u16,
    corner_positions: &[Point; 8],
    corner_values: &[Value; 8],
    iso: Value,
) -> [Option<Point>; 12] {
    let mut edge_points: [Option<Point>; 12] = [None; 12];

    for (i, [a, b]) in CORNER_POINT_INDICES.iter().enumerate() {
        if (edges_mask & (1 << i)) == 0 {
            continue;
        }
        let (a, b) = (*a as usize, *b as usize);
        edge_points[i] = Some(interpolate_cross_point(
            iso,
            corner_positions[a],
            corner_positions[b],
            corner_values[a],
            corner_values[b],
        ));
    }

    edge_points
}

/// Appends the triangles listed in `TRI_TABLE[state]` to `out`.
///
/// `TRI_TABLE[state]` contains edge indices in groups of three, terminated by `-1`:
/// ```text
/// TRI_TABLE[state] = [e0, e1, e2,  e3, e4, e5,  -1, ...]
///                     \___tri0__/   \___tri1__/
/// ```
#[inline]
pub fn triangle_verts_from_state(
    edge_points: &[Option<Point>; 12],
    state: usize,
    out: &mut Vec<Triangle>,
) {
    for triple in TRI_TABLE[state].chunks_exact(3).take_while(|t| t[0] != -1) {
        let vertex = |k: usize| edge_points[triple[k] as usize];
        if let (Some(a), Some(b), Some(c)) = (vertex(0), vertex(1), vertex(2)) {
            out.push([a, b, c]);
        }
    }
}

/// Polygonizes one cube, appending 0 to 5 triangles to `out`.
pub fn march_cube(points: &[Point; 8], values: &[Value; 8], iso: Value, out: &mut Vec<Triangle>) {
    let state = get_state(values, iso);
    let edges_mask = EDGE_TABLE[state];
    if edges_mask == 0 {
        return;
    }
    let edge_points = get_edge_midpoints(edges_mask, points, values, iso);
    triangle_verts_from_state(&edge_points, state, out);
}

/// Polygonizes the tetrahedron with corners `[v0, v1, v2, v3]` (cube corner indices),
/// appending 0 to 2 triangles to `out`. Complementary states share a case.
pub fn march_tetrahedron(
    points: &[Point; 8],
    values: &[Value; 8],
    [v0, v1, v2, v3]: [usize; 4],
    iso: Value,
    out: &mut Vec<Triangle>,
) {
    let state = get_state(&[values[v0], values[v1], values[v2], values[v3]], iso);
    let cross = |a: usize, b: usize| interpolate_cross_point(iso, points[a], points[b], values[a], values[b]);

    match state {
        0x01 | 0x0e => out.push([cross(v0, v1), cross(v0, v2), cross(v0, v3)]),
        0x02 | 0x0d => out.push([cross(v1, v0), cross(v1, v3), cross(v1, v2)]),
        0x04 | 0x0b => out.push([cross(v2, v0), cross(v2, v1), cross(v2, v3)]),
        0x08 | 0x07 => out.push([cross(v3, v0), cross(v3, v2), cross(v3, v1)]),
        0x03 | 0x0c => {
            let (a, b, c) = (cross(v0, v3), cross(v0, v2), cross(v1, v3));
            out.push([a, b, c]);
            out.push([c, cross(v1, v2), b]);
        }
        0x05 | 0x0a => {
            let (a, b, c) = (cross(v0, v1), cross(v2, v3), cross(v0, v3));
            out.push([a, b, c]);
            out.push([a, cross(v1, v2), b]);
        }
        0x06 | 0x09 => {
            let (a, b, c) = (cross(v0, v1), cross(v1, v3), cross(v2, v3));
            out.push([a, b, c]);
            out.push([a, cross(v0, v2), c]);
        }
        // all inside or all outside
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::tables::TETRAHEDRA;

    fn unit_cube() -> [Point; 8] {
        CORNER_OFFSETS.map(|[x, y, z]| Point::new(x as Value, y as Value, z as Value))
    }

    #[test]
    fn state_uses_strict_comparison() {
        assert_eq!(get_state(&[1., 2., 3., 1.9], 2.), 0b1001);
        assert_eq!(get_state(&[Value::NAN; 8], 2.), 0);
        assert_eq!(get_state(&[0.; 8], 2.), 255);
    }

    #[test]
    fn single_outside_corner() {
        let mut values = [1.; 8];
        values[0] = 3.;
        let mut out = Vec::new();
        march_cube(&unit_cube(), &values, 2., &mut out);

        assert_eq!(get_state(&values, 2.), 254);
        assert_eq!(out.len(), 1);
        let [a, b, c] = out[0];
        assert_relative_eq!(a, Point::new(0.5, 0., 0.));
        assert_relative_eq!(b, Point::new(0., 0.5, 0.));
        assert_relative_eq!(c, Point::new(0., 0., 0.5));
    }

    #[test]
    fn uniform_cells_are_empty() {
        let mut out = Vec::new();
        march_cube(&unit_cube(), &[5.; 8], 2., &mut out);
        march_cube(&unit_cube(), &[0.; 8], 2., &mut out);
        for tet in TETRAHEDRA {
            march_tetrahedron(&unit_cube(), &[5.; 8], tet, 2., &mut out);
        }
        assert!(out.is_empty());
    }

    #[test]
    fn every_tetrahedron_state_yields_expected_count() {
        let points = unit_cube();
        let tet = [0, 1, 2, 4];
        for state in 0..16usize {
            let mut values = [3.; 8];
            for (bit, corner) in tet.iter().enumerate() {
                if state & (1 << bit) != 0 {
                    values[*corner] = 1.;
                }
            }
            let mut out = Vec::new();
            march_tetrahedron(&points, &values, tet, 2., &mut out);
            let expected = match state.count_ones() {
                0 | 4 => 0,
                1 | 3 => 1,
                _ => 2,
            };
            assert_eq!(out.len(), expected, "state {state:#06b}");
        }
    }
}
