//! Surface interaction record produced for the nearest hit.

use qbvh_math::{orthonormal_basis, solve_linear_system_2x2, Point2, Point3, Vec3};

use crate::ray::RAY_EPSILON;
use crate::shape::ShapeId;
use crate::Ray;

/// Differential geometry at a ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Parameter along the ray.
    pub t: f32,
    /// World-space hit point.
    pub point: Point3,
    /// Interpolated (shading) normal.
    pub shading_normal: Vec3,
    /// Normal of the underlying primitive.
    pub geometric_normal: Vec3,
    /// First tangent-frame axis, perpendicular to the shading normal.
    pub binormal0: Vec3,
    /// Second tangent-frame axis.
    pub binormal1: Vec3,
    /// Partial derivative of the position in u.
    pub dpdu: Vec3,
    /// Partial derivative of the position in v.
    pub dpdv: Vec3,
    /// Partial derivative of the normal in u.
    pub dndu: Vec3,
    /// Partial derivative of the normal in v.
    pub dndv: Vec3,
    /// Texture coordinates.
    pub uv: Point2,
    /// Change in u per screen-space x step.
    pub dudx: f32,
    /// Change in v per screen-space x step.
    pub dvdx: f32,
    /// Change in u per screen-space y step.
    pub dudy: f32,
    /// Change in v per screen-space y step.
    pub dvdy: f32,
    /// Change in position per screen-space x step.
    pub dpdx: Vec3,
    /// Change in position per screen-space y step.
    pub dpdy: Vec3,
    /// Shape that was hit.
    pub shape: Option<ShapeId>,
    /// Primitive within the shape.
    pub primitive: u32,
    /// True when the screen-space derivatives above are meaningful.
    pub has_differentials: bool,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            t: 0.0,
            point: Point3::origin(),
            shading_normal: Vec3::z(),
            geometric_normal: Vec3::z(),
            binormal0: Vec3::x(),
            binormal1: Vec3::y(),
            dpdu: Vec3::zeros(),
            dpdv: Vec3::zeros(),
            dndu: Vec3::zeros(),
            dndv: Vec3::zeros(),
            uv: Point2::origin(),
            dudx: 0.0,
            dvdx: 0.0,
            dudy: 0.0,
            dvdy: 0.0,
            dpdx: Vec3::zeros(),
            dpdy: Vec3::zeros(),
            shape: None,
            primitive: 0,
            has_differentials: false,
        }
    }
}

impl Intersection {
    /// Build the binormal frame from `dpdu` and the shading normal.
    ///
    /// Falls back to an arbitrary orthonormal basis when `dpdu` is (nearly)
    /// parallel to the normal.
    pub fn build_frame(&mut self) {
        let n = self.shading_normal;
        let b0 = qbvh_math::normalize_checked(&self.dpdu);
        let b1 = b0.cross(&n);
        let l2 = b1.norm_squared();
        if l2 > qbvh_math::DOT_EPSILON {
            self.binormal1 = b1 / l2.sqrt();
            self.binormal0 = self.binormal1.cross(&n);
        } else {
            let (b0, b1) = orthonormal_basis(&n);
            self.binormal0 = b0;
            self.binormal1 = b1;
        }
    }

    /// Project a world-space vector into the (binormal0, binormal1, normal) frame.
    pub fn world_to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(
            v.dot(&self.binormal0),
            v.dot(&self.binormal1),
            v.dot(&self.shading_normal),
        )
    }

    /// Inverse of [`Intersection::world_to_local`].
    pub fn local_to_world(&self, v: &Vec3) -> Vec3 {
        self.binormal0 * v.x + self.binormal1 * v.y + self.shading_normal * v.z
    }

    /// Spawn a ray leaving the surface, offset along the geometric normal.
    pub fn next_ray(&self, direction: Vec3, tmax: f32) -> Ray {
        let origin = self.point + self.geometric_normal * RAY_EPSILON;
        Ray::with_range(origin, direction, 0.0, tmax, RAY_EPSILON)
    }

    /// Zero all screen-space derivatives.
    pub fn clear_differentials(&mut self) {
        self.has_differentials = false;
        self.dudx = 0.0;
        self.dvdx = 0.0;
        self.dudy = 0.0;
        self.dvdy = 0.0;
        self.dpdx = Vec3::zeros();
        self.dpdy = Vec3::zeros();
    }

    /// Estimate screen-space derivatives from the ray's differentials.
    ///
    /// Intersects both offset rays with the tangent plane at the hit point and
    /// solves for the uv change along the most stable pair of axes.
    pub fn compute_differentials(&mut self, ray: &Ray) {
        let Some(diff) = ray.differentials else {
            self.clear_differentials();
            return;
        };

        let n = self.geometric_normal;
        let d = n.dot(&self.point.coords);
        let ndrx = n.dot(&diff.rx_direction);
        let ndry = n.dot(&diff.ry_direction);
        if qbvh_math::is_zero(ndrx) || qbvh_math::is_zero(ndry) {
            self.clear_differentials();
            return;
        }

        let tx = -(n.dot(&diff.rx_origin.coords) - d) / ndrx;
        let ty = -(n.dot(&diff.ry_origin.coords) - d) / ndry;
        let px = diff.rx_origin + diff.rx_direction * tx;
        let py = diff.ry_origin + diff.ry_direction * ty;

        self.dpdx = px - self.point;
        self.dpdy = py - self.point;
        self.has_differentials = true;

        // Drop the axis the normal is most aligned with.
        let abs = n.abs();
        let dim = if abs.x > abs.y && abs.x > abs.z {
            [1, 2]
        } else if abs.y > abs.z {
            [0, 2]
        } else {
            [0, 1]
        };

        let a = [
            [self.dpdu[dim[0]], self.dpdv[dim[0]]],
            [self.dpdu[dim[1]], self.dpdv[dim[1]]],
        ];
        let bx = [self.dpdx[dim[0]], self.dpdx[dim[1]]];
        let by = [self.dpdy[dim[0]], self.dpdy[dim[1]]];

        (self.dudx, self.dvdx) = solve_linear_system_2x2(a, bx).unwrap_or((0.0, 0.0));
        (self.dudy, self.dvdy) = solve_linear_system_2x2(a, by).unwrap_or((0.0, 0.0));
    }
}
