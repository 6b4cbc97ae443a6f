//! Box/box and sphere/box overlap predicates.

use qbvh_math::{move_mask, Aabb, Aabb4, Point3, Vec3x4};
use wide::{f32x4, CmpLe};

/// Test if two boxes overlap. Touching counts as overlap.
#[inline]
pub fn aabb_aabb(b0: &Aabb, b1: &Aabb) -> bool {
    b0.overlaps(b1)
}

/// Test four box pairs at once; bit `i` is set when lane `i` overlaps.
pub fn aabb_aabb_batch4(b0: &Aabb4, b1: &Aabb4) -> u8 {
    let mut mask = f32x4::splat(0.0).cmp_le(f32x4::splat(0.0));
    for axis in 0..3 {
        mask = mask & b0.bounds[0][axis].cmp_le(b1.bounds[1][axis]);
        mask = mask & b1.bounds[0][axis].cmp_le(b0.bounds[1][axis]);
    }
    move_mask(mask)
}

/// Test whether a sphere overlaps a box.
///
/// Conservative: checks the center against the box grown by `radius`, so
/// spheres near a box corner may report overlap without touching it.
pub fn sphere_aabb(center: &Point3, radius: f32, aabb: &Aabb) -> bool {
    (0..3).all(|i| aabb.bmin[i] - radius <= center[i] && center[i] <= aabb.bmax[i] + radius)
}

/// Test four spheres against four boxes (lane-wise), with the same
/// conservative rule as [`sphere_aabb`].
pub fn sphere_aabb_batch4(center: &Vec3x4, radius: f32x4, boxes: &Aabb4) -> u8 {
    let mut mask = f32x4::splat(0.0).cmp_le(f32x4::splat(0.0));
    for axis in 0..3 {
        let c = center.axis(axis);
        mask = mask & (boxes.bounds[0][axis] - radius).cmp_le(c);
        mask = mask & c.cmp_le(boxes.bounds[1][axis] + radius);
    }
    move_mask(mask)
}
