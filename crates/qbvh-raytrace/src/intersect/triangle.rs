//! Ray-triangle intersection (single-sided Möller–Trumbore).
//!
//! The scalar and 4-wide forms perform the same floating-point operations in
//! the same order, so they agree exactly on which triangles are hit.

use qbvh_math::{move_mask, Point3, Vec3, Vec3x4, F32_EPSILON};
use wide::{f32x4, CmpLe, CmpLt};

use crate::Ray;

/// Hit on a single triangle: ray parameter and barycentrics of `v1`, `v2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the ray.
    pub t: f32,
    /// Barycentric weight of the second vertex.
    pub u: f32,
    /// Barycentric weight of the third vertex.
    pub v: f32,
}

/// Result of testing one ray against four triangles.
///
/// Lanes whose bit is clear in `mask` hold unspecified values.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit4 {
    /// Parameters along the ray.
    pub t: f32x4,
    /// Barycentric weights of the second vertices.
    pub u: f32x4,
    /// Barycentric weights of the third vertices.
    pub v: f32x4,
    /// Bit `i` set when lane `i` was hit.
    pub mask: u8,
}

impl TriangleHit4 {
    /// Hit of lane `lane`, if its mask bit is set.
    pub fn lane(&self, lane: usize) -> Option<TriangleHit> {
        if self.mask & (1 << lane) == 0 {
            return None;
        }
        Some(TriangleHit {
            t: self.t.to_array()[lane],
            u: self.u.to_array()[lane],
            v: self.v.to_array()[lane],
        })
    }
}

#[inline]
fn dot3(a: &Vec3, b: &Vec3) -> f32 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

#[inline]
fn cross3(a: &Vec3, b: &Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Intersect a ray with the front face of triangle `(v0, v1, v2)`.
///
/// Front faces wind counter-clockwise as seen from the ray origin. Back-facing
/// and grazing triangles (determinant `<= F32_EPSILON`) are rejected, as are
/// hits outside the triangle. `t` is not range-checked.
pub fn ray_triangle(ray: &Ray, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<TriangleHit> {
    let d0 = v1 - v0;
    let d1 = v2 - v0;

    let c = cross3(&ray.direction, &d1);
    let det = dot3(&c, &d0);
    if !(F32_EPSILON < det) {
        return None;
    }

    let tvec = ray.origin - v0;
    let u = dot3(&c, &tvec);
    if !(0.0 <= u && u <= det) {
        return None;
    }

    let q = cross3(&tvec, &d0);
    let v = dot3(&ray.direction, &q);
    if !(0.0 <= v && u + v <= det) {
        return None;
    }

    let inv_det = 1.0 / det;
    let t = dot3(&d1, &q) * inv_det;
    Some(TriangleHit {
        t,
        u: u * inv_det,
        v: v * inv_det,
    })
}

/// Intersect one ray (broadcast to four lanes) with four triangles.
///
/// `vx[i]`, `vy[i]`, `vz[i]` hold the coordinates of vertex `i` of each of
/// the four triangles.
pub fn ray_triangle_batch4(
    origin: &Vec3x4,
    direction: &Vec3x4,
    vx: &[f32x4; 3],
    vy: &[f32x4; 3],
    vz: &[f32x4; 3],
) -> TriangleHit4 {
    let v0 = Vec3x4::new(vx[0], vy[0], vz[0]);
    let d0 = Vec3x4::new(vx[1], vy[1], vz[1]) - v0;
    let d1 = Vec3x4::new(vx[2], vy[2], vz[2]) - v0;

    let c = direction.cross(&d1);
    let det = c.dot(&d0);
    let front = f32x4::splat(F32_EPSILON).cmp_lt(det);

    let tvec = *origin - v0;
    let u = c.dot(&tvec);
    let inside_u = f32x4::ZERO.cmp_le(u) & u.cmp_le(det);

    let q = tvec.cross(&d0);
    let v = direction.dot(&q);
    let inside_v = f32x4::ZERO.cmp_le(v) & (u + v).cmp_le(det);

    let inv_det = f32x4::ONE / det;
    let t = d1.dot(&q) * inv_det;

    TriangleHit4 {
        t,
        u: u * inv_det,
        v: v * inv_det,
        mask: move_mask(front & inside_u & inside_v),
    }
}
