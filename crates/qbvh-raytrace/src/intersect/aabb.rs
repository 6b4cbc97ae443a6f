//! Ray-box slab tests.

use qbvh_math::{move_mask, Aabb4, Point3, Vec3x4, F32_EPSILON};
use wide::{f32x4, CmpGe, CmpGt, CmpLt, CmpNe};

use crate::Ray;

/// Slab-test a ray against a box.
///
/// Starts from the ray's `[tmin, tmax]` range and clips it per axis. Axes the
/// ray is (nearly) parallel to only pass when the origin lies inside that
/// slab. Returns the clipped `(tmin, tmax)` on a hit.
pub fn ray_aabb(ray: &Ray, bmin: &Point3, bmax: &Point3) -> Option<(f32, f32)> {
    let mut tmin = ray.tmin;
    let mut tmax = ray.tmax;

    for i in 0..3 {
        if ray.direction[i].abs() < F32_EPSILON {
            if ray.origin[i] < bmin[i] || bmax[i] < ray.origin[i] {
                return None;
            }
            continue;
        }

        let inv_d = ray.inv_direction()[i];
        let t1 = (bmin[i] - ray.origin[i]) * inv_d;
        let t2 = (bmax[i] - ray.origin[i]) * inv_d;
        let (near, far) = if t1 > t2 { (t2, t1) } else { (t1, t2) };
        if near > tmin {
            tmin = near;
        }
        if far < tmax {
            tmax = far;
        }

        if tmin > tmax || tmax < 0.0 {
            return None;
        }
    }
    Some((tmin, tmax))
}

/// Slab-test one ray against four boxes at once.
///
/// `sign[axis]` selects which face is near (`bounds[sign]`) and which is far
/// (`bounds[1 - sign]`), so no per-lane swap is needed. Axes the ray is
/// (nearly) parallel to only pass lanes whose origin lies inside that slab,
/// matching [`ray_aabb`]. Returns bit `i` set when box `i` overlaps
/// `[tmin, tmax]` along the ray.
#[inline]
pub fn ray_aabb_batch4(
    tmin: f32x4,
    tmax: f32x4,
    origin: &Vec3x4,
    direction: &Vec3x4,
    inv_direction: &Vec3x4,
    sign: [usize; 3],
    boxes: &Aabb4,
) -> u8 {
    let mut tmin = tmin;
    let mut tmax = tmax;
    let mut outside = f32x4::ZERO.cmp_ne(f32x4::ZERO);
    for (axis, &s) in sign.iter().enumerate() {
        let o = origin.axis(axis);
        let inv = inv_direction.axis(axis);
        let lo = boxes.bounds[0][axis];
        let hi = boxes.bounds[1][axis];

        let parallel = direction.axis(axis).abs().cmp_lt(f32x4::splat(F32_EPSILON));
        outside = outside | (parallel & (o.cmp_lt(lo) | o.cmp_gt(hi)));

        let near = tmin.max((boxes.bounds[s][axis] - o) * inv);
        let far = tmax.min((boxes.bounds[1 - s][axis] - o) * inv);
        tmin = parallel.blend(tmin, near);
        tmax = parallel.blend(tmax, far);
    }
    move_mask(tmax.cmp_ge(tmin) & !outside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qbvh_math::{Aabb, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit() -> (Point3, Point3) {
        (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_aabb_hit() {
        let (bmin, bmax) = unit();
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let (t0, t1) = ray_aabb(&ray, &bmin, &bmax).unwrap();
        assert_relative_eq!(t0, 5.0, epsilon = 1e-6);
        assert_relative_eq!(t1, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_aabb_parallel_outside_slab() {
        let (bmin, bmax) = unit();
        let ray = Ray::new(Point3::new(-5.0, 5.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_aabb(&ray, &bmin, &bmax).is_none());
    }

    #[test]
    fn test_ray_aabb_behind() {
        let (bmin, bmax) = unit();
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(ray_aabb(&ray, &bmin, &bmax).is_none());
    }

    #[test]
    fn test_ray_aabb_inside() {
        let (bmin, bmax) = unit();
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 1.0, 0.0));
        let (t0, t1) = ray_aabb(&ray, &bmin, &bmax).unwrap();
        assert_eq!(t0, 0.0);
        assert_relative_eq!(t1, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_aabb_respects_tmax() {
        let (bmin, bmax) = unit();
        let ray = Ray::with_range(
            Point3::new(-5.0, 0.5, 0.5),
            Vec3::new(1.0, 0.0, 0.0),
            0.0,
            4.0,
            0.0,
        );
        assert!(ray_aabb(&ray, &bmin, &bmax).is_none());
    }

    #[test]
    fn test_batch_axis_parallel_ray() {
        let boxes = [
            Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            Aabb::new(Point3::new(0.0, 2.0, 0.0), Point3::new(1.0, 3.0, 1.0)),
            Aabb::new(Point3::new(-3.0, 0.0, 0.0), Point3::new(-2.0, 1.0, 1.0)),
            Aabb::empty(),
        ];
        let packed = Aabb4::from_boxes(&boxes, 0.0);
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let mask = ray_aabb_batch4(
            f32x4::splat(0.0),
            f32x4::splat(ray.tmax),
            &Vec3x4::splat(&ray.origin.coords),
            &Vec3x4::splat(&ray.direction),
            &Vec3x4::splat(ray.inv_direction()),
            ray.sign(),
            &packed,
        );
        assert_eq!(mask, 0b0101);
    }

    /// Compare the batch mask against four scalar tests; returns the hit count.
    fn assert_batch_matches(ray: &Ray, boxes: &[Aabb; 4]) -> usize {
        let packed = Aabb4::from_boxes(boxes, 0.0);
        let mask = ray_aabb_batch4(
            f32x4::splat(ray.tmin),
            f32x4::splat(ray.tmax),
            &Vec3x4::splat(&ray.origin.coords),
            &Vec3x4::splat(&ray.direction),
            &Vec3x4::splat(ray.inv_direction()),
            ray.sign(),
            &packed,
        );
        let mut hits = 0;
        for (lane, b) in boxes.iter().enumerate() {
            let scalar = ray_aabb(ray, &b.bmin, &b.bmax).is_some();
            hits += usize::from(scalar);
            assert_eq!(
                scalar,
                mask & (1 << lane) != 0,
                "lane {lane}, origin {:?}, direction {:?}",
                ray.origin,
                ray.direction
            );
        }
        hits
    }

    #[test]
    fn test_batch_agrees_with_scalar() {
        let mut rng = StdRng::seed_from_u64(11);
        let coord = |rng: &mut StdRng| rng.gen_range(-10.0f32..10.0);
        let mut hits = 0;
        for _ in 0..2000 {
            let origin = Point3::new(coord(&mut rng), coord(&mut rng), coord(&mut rng));
            let dir = Vec3::new(coord(&mut rng), coord(&mut rng), coord(&mut rng));
            let ray = Ray::with_range(origin, dir, 0.0, f32::MAX, 0.0);

            let boxes: [Aabb; 4] = std::array::from_fn(|_| {
                let a = Point3::new(coord(&mut rng), coord(&mut rng), coord(&mut rng));
                let b = Point3::new(coord(&mut rng), coord(&mut rng), coord(&mut rng));
                Aabb::from_points([&a, &b])
            });
            hits += assert_batch_matches(&ray, &boxes);
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_batch_agrees_with_scalar_for_degenerate_directions() {
        let boxes = [
            Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0)),
            Aabb::new(Point3::new(-1.0, 4.0, 4.0), Point3::new(0.0, 6.0, 6.0)),
            Aabb::new(Point3::new(-0.5, 0.0, 0.0), Point3::new(-0.5, 10.0, 10.0)),
            Aabb::new(Point3::new(2.0, 2.0, 2.0), Point3::new(3.0, 3.0, 3.0)),
        ];
        let origins = [
            Point3::new(-0.5, 5.0, 5.0),
            Point3::new(5.0, 5.0, 5.0),
            Point3::new(0.0, 5.0, 5.0),
            Point3::new(-0.5, 12.0, 5.0),
            Point3::new(2.5, 2.5, -4.0),
        ];
        let directions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1e-9, 0.0, 0.0),
            Vec3::new(-1e-9, 0.0, -0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1e-9, 1.0, 0.0),
        ];
        for origin in origins {
            for direction in directions {
                for tmin in [0.0, 1e-5] {
                    let ray = Ray::with_range(origin, direction, tmin, f32::MAX, 0.0);
                    assert_batch_matches(&ray, &boxes);
                }
            }
        }

        // Origin left of the big box with no motion along x.
        let ray = Ray::new(Point3::new(-0.5, 5.0, 5.0), Vec3::new(1e-9, 0.0, 0.0));
        let packed = Aabb4::from_boxes(&[boxes[0]; 4], 0.0);
        let mask = ray_aabb_batch4(
            f32x4::splat(ray.tmin),
            f32x4::splat(ray.tmax),
            &Vec3x4::splat(&ray.origin.coords),
            &Vec3x4::splat(&ray.direction),
            &Vec3x4::splat(ray.inv_direction()),
            ray.sign(),
            &packed,
        );
        assert_eq!(mask, 0);
    }
}
