//! Geometry kernels.
//!
//! Stateless ray/triangle, ray/box and overlap tests. Each test has a scalar
//! form and a 4-wide form over [`wide::f32x4`] lanes; the two agree on every
//! hit/no-hit decision.

mod aabb;
mod overlap;
mod triangle;

pub use aabb::{ray_aabb, ray_aabb_batch4};
pub use overlap::{aabb_aabb, aabb_aabb_batch4, sphere_aabb, sphere_aabb_batch4};
pub use triangle::{ray_triangle, ray_triangle_batch4, TriangleHit, TriangleHit4};
