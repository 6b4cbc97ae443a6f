//! Geometry sources indexed by the accelerator.
//!
//! A [`Shape`] owns its primitives; the accelerator only ever refers to them
//! through `(ShapeId, primitive)` pairs and asks the shape for bounds,
//! centroids, single-primitive hits and, for the winning hit only, the full
//! differential geometry.

mod mesh;

pub use mesh::TriangleMesh;

use std::fmt;

use qbvh_math::{Aabb, Point3};

use crate::intersect::TriangleHit;
use crate::{Intersection, Ray};

/// Identifier handed out by [`BinQbvh::add_shape`](crate::BinQbvh::add_shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

impl ShapeId {
    /// Index into the accelerator's shape list.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One primitive inside one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapePrimitive {
    /// Owning shape.
    pub shape: ShapeId,
    /// Primitive index inside the shape.
    pub primitive: u32,
    /// SIMD pack holding this primitive, once leaves are packed.
    pub pack: Option<u32>,
}

impl ShapePrimitive {
    /// Reference to `primitive` of `shape`, not yet packed.
    pub fn new(shape: ShapeId, primitive: u32) -> Self {
        Self {
            shape,
            primitive,
            pack: None,
        }
    }
}

/// Four triangles' vertices in structure-of-arrays layout.
///
/// `x[vertex][lane]` is the x coordinate of vertex `vertex` of the triangle
/// in lane `lane`; `y` and `z` likewise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriangleSoa {
    /// X coordinates.
    pub x: [[f32; 4]; 3],
    /// Y coordinates.
    pub y: [[f32; 4]; 3],
    /// Z coordinates.
    pub z: [[f32; 4]; 3],
}

impl TriangleSoa {
    /// Write one triangle into lane `lane`.
    pub fn set_lane(&mut self, lane: usize, vertices: [&Point3; 3]) {
        for (i, p) in vertices.iter().enumerate() {
            self.x[i][lane] = p.x;
            self.y[i][lane] = p.y;
            self.z[i][lane] = p.z;
        }
    }
}

/// Capability interface for anything the accelerator can index.
///
/// Primitive ids passed in are always in `0..primitive_count()`; the
/// accelerator checks this at build time.
pub trait Shape: Send + Sync {
    /// Number of primitives. Negative counts are rejected by the builder.
    fn primitive_count(&self) -> i32;

    /// Bounding box of one primitive.
    fn bbox(&self, primitive: u32) -> Aabb;

    /// Centroid of one primitive.
    fn centroid(&self, primitive: u32) -> Point3;

    /// Scalar ray test against one primitive. `t` is not range-checked.
    fn intersect(&self, primitive: u32, ray: &Ray) -> Option<TriangleHit>;

    /// Write one primitive's vertices into lane `lane` of `out`.
    fn vertices_soa(&self, lane: usize, primitive: u32, out: &mut TriangleSoa);

    /// Fill shading data for a hit at `ray.at(ray.tmax)` with barycentrics `u`, `v`.
    fn fill_intersection(&self, out: &mut Intersection, ray: &Ray, u: f32, v: f32, primitive: u32);

    /// Append every primitive of this shape, tagged with `shape`.
    fn emit_primitives(&self, shape: ShapeId, out: &mut Vec<ShapePrimitive>) {
        let count = u32::try_from(self.primitive_count()).unwrap_or(0);
        out.extend((0..count).map(|primitive| ShapePrimitive::new(shape, primitive)));
    }
}
