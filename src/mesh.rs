use crate::{
    interp::nearly_equal,
    types::{NormalVertex, Point, Triangle, TriangleWithNormals, Value, Vector},
};

/// Computes the unit face normal `(b - a) × (c - a)`.
///
/// Returns the zero vector if the triangle is degenerate.
pub fn flat_normal([a, b, c]: &Triangle) -> Vector {
    let cross = (b - a).cross(&(c - a));
    let nrm = cross.norm();
    if nrm == 0.0 || !nrm.is_finite() {
        Vector::zeros()
    } else {
        cross / nrm
    }
}

/// Attaches the face normal to all three vertices.
pub fn with_flat_normal(triangle: Triangle) -> TriangleWithNormals {
    let normal = flat_normal(&triangle);
    triangle.map(|position| NormalVertex::new(position, normal))
}

/// Per-axis comparison within [`PRECISION`](crate::interp::PRECISION).
#[inline]
pub fn equal_points(a: &Point, b: &Point) -> bool {
    nearly_equal(a.x, b.x) && nearly_equal(a.y, b.y) && nearly_equal(a.z, b.z)
}

/// Whether `point` is one of the triangle's corners.
#[inline]
pub fn is_vertex(point: &Point, triangle: &TriangleWithNormals) -> bool {
    triangle.iter().any(|v| equal_points(point, &v.position))
}

/// Averages the face normals of every triangle in `candidates` that has `point`
/// as a corner, then normalizes. Zero when nothing contributes.
pub fn smooth_normal<'a, I>(point: &Point, candidates: I) -> Vector
where
    I: IntoIterator<Item = &'a TriangleWithNormals>,
{
    let (sum, count) = candidates
        .into_iter()
        .filter(|triangle| is_vertex(point, triangle))
        .fold((Vector::zeros(), 0usize), |(sum, count), triangle| {
            (sum + triangle[0].normal, count + 1)
        });

    if count == 0 {
        return Vector::zeros();
    }
    let average = sum / count as Value;
    let nrm = average.norm();
    if nrm == 0.0 { Vector::zeros() } else { average / nrm }
}

/// Flat vertex buffers ready for a GPU mesh.
///
/// Every three consecutive vertices form one triangle; `indices` are sequential.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedMesh {
    /// Vertex positions: `[[x, y, z], ...]`
    pub vertices: Vec<[f32; 3]>,
    /// One normal per vertex.
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl GeneratedMesh {
    pub fn from_triangles(triangles: &[TriangleWithNormals]) -> Self {
        let count = triangles.len() * 3;
        let mut mesh = Self {
            vertices: Vec::with_capacity(count),
            normals: Vec::with_capacity(count),
            indices: (0..count as u32).collect(),
        };
        for vertex in triangles.iter().flatten() {
            mesh.vertices.push(vertex.position.coords.into());
            mesh.normals.push(vertex.normal.into());
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn xy_triangle() -> Triangle {
        [
            Point::new(0., 0., 0.),
            Point::new(2., 0., 0.),
            Point::new(0., 2., 0.),
        ]
    }

    #[test]
    fn flat_normal_is_unit_and_right_handed() {
        assert_relative_eq!(flat_normal(&xy_triangle()), Vector::z());
        let [a, b, c] = xy_triangle();
        assert_relative_eq!(flat_normal(&[a, c, b]), -Vector::z());
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let p = Point::new(1., 1., 1.);
        assert_eq!(flat_normal(&[p, p, p]), Vector::zeros());
        let line = [Point::origin(), Point::new(1., 0., 0.), Point::new(2., 0., 0.)];
        assert_eq!(flat_normal(&line), Vector::zeros());
    }

    #[test]
    fn vertex_matching_uses_tolerance() {
        let t = with_flat_normal(xy_triangle());
        assert!(is_vertex(&Point::new(2.00005, 0., 0.), &t));
        assert!(!is_vertex(&Point::new(2.001, 0., 0.), &t));
    }

    #[test]
    fn smooth_normal_averages_adjacent_faces() {
        let a = with_flat_normal(xy_triangle());
        let b = with_flat_normal([
            Point::new(0., 0., 0.),
            Point::new(0., 0., 2.),
            Point::new(2., 0., 0.),
        ]);
        let far = with_flat_normal([
            Point::new(5., 5., 5.),
            Point::new(6., 5., 5.),
            Point::new(5., 6., 5.),
        ]);
        let n = smooth_normal(&Point::origin(), [&a, &b, &far]);
        let expected = (Vector::z() + Vector::y()).normalize();
        assert_relative_eq!(n, expected, epsilon = 1e-6);
        assert_eq!(smooth_normal(&Point::new(9., 9., 9.), [&a]), Vector::zeros());
    }

    #[test]
    fn generated_mesh_is_flat_and_sequential() {
        let mesh = GeneratedMesh::from_triangles(&[with_flat_normal(xy_triangle())]);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1], [2., 0., 0.]);
        assert_eq!(mesh.normals[2], [0., 0., 1.]);
    }
}
