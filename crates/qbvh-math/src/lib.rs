#![warn(missing_docs)]

//! Math types for the qbvh ray tracer.
//!
//! Thin wrappers around nalgebra providing single-precision points,
//! vectors and helpers, plus the bounding-box and 4-lane SIMD types the
//! acceleration structure is built on.

use nalgebra::{Vector2, Vector3};

pub mod aabb;
pub mod lanes;

pub use aabb::{Aabb, Aabb4};
pub use lanes::{move_mask, Vec3x4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A point in 2D texture space.
pub type Point2 = nalgebra::Point2<f32>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f32>;

/// Machine epsilon used by the intersection kernels.
pub const F32_EPSILON: f32 = f32::EPSILON;

/// Squared-length threshold below which a vector is treated as zero.
pub const DOT_EPSILON: f32 = 1.0e-6;

/// Check if a scalar is effectively zero.
#[inline]
pub fn is_zero(x: f32) -> bool {
    x.abs() < F32_EPSILON
}

/// Normalize `v`, returning the zero vector when `v` has (near) zero length.
pub fn normalize_checked(v: &Vec3) -> Vec3 {
    let l2 = v.norm_squared();
    if l2 > DOT_EPSILON * DOT_EPSILON {
        v / l2.sqrt()
    } else {
        Vec3::zeros()
    }
}

/// Build two unit vectors that complete `n` to a right-handed orthonormal basis.
///
/// `n` must be unit length. Returns `(b0, b1)` with `b0 × b1 = n`.
pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
    let b0 = if n.x.abs() > n.y.abs() {
        let inv = 1.0 / (n.x * n.x + n.z * n.z).sqrt();
        Vec3::new(-n.z * inv, 0.0, n.x * inv)
    } else {
        let inv = 1.0 / (n.y * n.y + n.z * n.z).sqrt();
        Vec3::new(0.0, n.z * inv, -n.y * inv)
    };
    let b1 = n.cross(&b0);
    (b0, b1)
}

/// Solve the 2x2 linear system `a * x = b`.
///
/// Returns `None` if the matrix is singular or the solution is not finite.
pub fn solve_linear_system_2x2(a: [[f32; 2]; 2], b: [f32; 2]) -> Option<(f32, f32)> {
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    if det.abs() < 1.0e-10 {
        return None;
    }
    let inv = 1.0 / det;
    let x0 = (a[1][1] * b[0] - a[0][1] * b[1]) * inv;
    let x1 = (a[0][0] * b[1] - a[1][0] * b[0]) * inv;
    if x0.is_finite() && x1.is_finite() {
        Some((x0, x1))
    } else {
        None
    }
}
