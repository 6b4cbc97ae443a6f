//! Ray representation.

use qbvh_math::{Point3, Vec3, F32_EPSILON};

/// Default minimum accepted hit distance.
pub const RAY_EPSILON: f32 = 1.0e-5;

/// Auxiliary rays offset by one pixel in x and y, used to estimate texture
/// footprints at the hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayDifferentials {
    /// Origin of the ray offset in screen x.
    pub rx_origin: Point3,
    /// Direction of the ray offset in screen x.
    pub rx_direction: Vec3,
    /// Origin of the ray offset in screen y.
    pub ry_origin: Point3,
    /// Direction of the ray offset in screen y.
    pub ry_direction: Vec3,
}

/// A ray segment `origin + t * direction` for `t` in `[tmin, tmax]`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Direction of the ray; not required to be unit length.
    pub direction: Vec3,
    /// Reciprocal of direction components for slab tests.
    inv_direction: Vec3,
    /// Start of the valid parameter range.
    pub tmin: f32,
    /// End of the valid parameter range; shrinks as closer hits are found.
    pub tmax: f32,
    /// Hits at `t <= epsilon` are rejected as self-intersections.
    pub epsilon: f32,
    /// Optional screen-space differentials.
    pub differentials: Option<RayDifferentials>,
}

impl Ray {
    /// Create an unbounded ray (`tmin = 0`, `tmax = f32::MAX`).
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, 0.0, f32::MAX, RAY_EPSILON)
    }

    /// Create a ray with an explicit parameter range and self-hit epsilon.
    pub fn with_range(origin: Point3, direction: Vec3, tmin: f32, tmax: f32, epsilon: f32) -> Self {
        Self {
            origin,
            direction,
            inv_direction: inverse_direction(&direction),
            tmin,
            tmax,
            epsilon,
            differentials: None,
        }
    }

    /// Attach screen-space differentials.
    pub fn with_differentials(mut self, differentials: RayDifferentials) -> Self {
        self.differentials = Some(differentials);
        self
    }

    /// Replace the direction, keeping the reciprocal in sync.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
        self.inv_direction = inverse_direction(&direction);
    }

    /// Precomputed reciprocal direction.
    #[inline]
    pub fn inv_direction(&self) -> &Vec3 {
        &self.inv_direction
    }

    /// Sign of each direction component: 0 if `>= 0`, 1 if negative.
    #[inline]
    pub fn sign(&self) -> [usize; 3] {
        [
            usize::from(self.direction.x < 0.0),
            usize::from(self.direction.y < 0.0),
            usize::from(self.direction.z < 0.0),
        ]
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }
}

/// Component-wise reciprocal. Components within epsilon of zero map to
/// `±f32::MAX`, signed consistently with [`Ray::sign`], so slab tests never
/// divide by zero or produce NaN.
fn inverse_direction(d: &Vec3) -> Vec3 {
    d.map(|c| {
        if c.abs() < F32_EPSILON {
            if c >= 0.0 {
                f32::MAX
            } else {
                -f32::MAX
            }
        } else {
            1.0 / c
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(2.5);
        assert!((p.x - 5.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_inv_direction_sentinel() {
        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, -0.0, 1.0e-9));
        let inv = ray.inv_direction();
        assert_eq!(inv.x, f32::MAX);
        // -0.0 counts as non-negative for traversal, so the sentinel is positive too.
        assert_eq!(inv.y, f32::MAX);
        assert_eq!(inv.z, f32::MAX);
        assert_eq!(ray.sign(), [0, 0, 0]);

        let ray = Ray::new(Point3::origin(), Vec3::new(-1.0e-9, -2.0, 4.0));
        let inv = ray.inv_direction();
        assert_eq!(inv.x, -f32::MAX);
        assert_eq!(inv.y, -0.5);
        assert_eq!(inv.z, 0.25);
        assert_eq!(ray.sign(), [1, 1, 0]);
    }

    #[test]
    fn test_zero_direction_is_finite() {
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vec3::zeros());
        assert!(ray.inv_direction().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_set_direction() {
        let mut ray = Ray::new(Point3::origin(), Vec3::x());
        ray.set_direction(Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(ray.inv_direction().y, 0.25);
        assert_eq!(ray.inv_direction().x, f32::MAX);
    }
}
