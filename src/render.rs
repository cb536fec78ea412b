//! Hand-off of polygonizer output to Bevy.

use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
};

use crate::{mesh::GeneratedMesh, types::TriangleWithNormals};

impl From<GeneratedMesh> for Mesh {
    /// The three vertex data Vecs are **moved** directly into the Bevy mesh with no copies.
    fn from(generated: GeneratedMesh) -> Self {
        let mut bevy_mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        );

        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, generated.vertices);
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, generated.normals);
        bevy_mesh.insert_indices(Indices::U32(generated.indices));
        bevy_mesh
    }
}

/// Builds a triangle-list mesh with one vertex per triangle corner.
///
/// ```rust,ignore
/// let mesh = build_mesh(polygonizer.triangles());
/// commands.spawn(Mesh3d(meshes.add(mesh)));
/// ```
pub fn build_mesh(triangles: &[TriangleWithNormals]) -> Mesh {
    GeneratedMesh::from_triangles(triangles).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mesh::with_flat_normal, types::Point};

    #[test]
    fn mesh_has_positions_normals_and_indices() {
        let triangle = with_flat_normal([
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        ]);
        let mesh = build_mesh(&[triangle, triangle]);
        assert_eq!(mesh.count_vertices(), 6);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().map(|i| i.len()), Some(6));
    }
}
