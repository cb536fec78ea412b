use nalgebra::{Point3, Vector3};

/// Scalar field value at a point in space.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// A scalar field function: maps a [`Point`] to a [`Value`].
///
/// Values **strictly below** the polygonizer's iso level are considered "inside" the surface.
pub type CompiledFunction<'a> = dyn Fn(Point) -> Value + Sync + 'a;

/// Three vertex positions.
pub type Triangle = [Point; 3];

/// A triangle vertex together with its shading normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalVertex {
    pub position: Point,
    pub normal: Vector,
}

impl NormalVertex {
    pub fn new(position: Point, normal: Vector) -> Self {
        Self { position, normal }
    }
}

/// Three vertices, each carrying its own normal.
pub type TriangleWithNormals = [NormalVertex; 3];
