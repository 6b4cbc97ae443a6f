#![warn(missing_docs)]

//! Quad BVH ray intersection for triangle scenes.
//!
//! This crate answers nearest-hit and any-hit ray queries against scenes made
//! of [`Shape`]s. Shapes are indexed by a four-way bounding volume hierarchy
//! built with a surface area heuristic and traversed four child boxes at a
//! time using `wide` lane vectors.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray segment with optional screen-space differentials
//! - [`intersect`] - Scalar and 4-wide ray/triangle, ray/box and overlap tests
//! - [`shape`] - The [`Shape`] capability trait and [`TriangleMesh`]
//! - [`Intersection`] - Differential geometry at the nearest hit
//! - [`bvh`] - The [`BinQbvh`] accelerator
//!
//! # Example
//!
//! ```
//! use qbvh_math::{Point3, Vec3};
//! use qbvh_raytrace::{BinQbvh, Ray, TriangleMesh};
//!
//! let cube = TriangleMesh::cuboid(Point3::new(-0.5, -0.5, -0.5), Point3::new(0.5, 0.5, 0.5));
//! let mut bvh = BinQbvh::new();
//! bvh.add_shape(&cube);
//! bvh.build().unwrap();
//!
//! let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
//! let hit = bvh.intersect_nearest(&ray).unwrap();
//! assert!((hit.t - 4.5).abs() < 1e-6);
//! ```

mod config;
mod error;
mod intersection;
mod ray;

pub mod bvh;
pub mod intersect;
pub mod shape;

pub use bvh::{BinQbvh, TraversalStack};
pub use config::BvhConfig;
pub use error::{BvhError, MeshError, Result};
pub use intersection::Intersection;
pub use ray::{Ray, RayDifferentials, RAY_EPSILON};
pub use shape::{Shape, ShapeId, ShapePrimitive, TriangleMesh, TriangleSoa};
