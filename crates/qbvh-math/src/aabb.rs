//! Axis-aligned bounding boxes.
//!
//! [`Aabb`] is the scalar box used during construction; [`Aabb4`] packs four
//! boxes lane-wise so one ray can be slab-tested against all of them at once.

use wide::f32x4;

use crate::{Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub bmin: Point3,
    /// Maximum corner.
    pub bmax: Point3,
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(bmin: Point3, bmax: Point3) -> Self {
        Self { bmin, bmax }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    ///
    /// Only ever combined via [`Aabb::extend`] / [`Aabb::include_point`].
    pub fn empty() -> Self {
        Self {
            bmin: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            bmax: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// True once the box has been extended by at least one point.
    pub fn is_valid(&self) -> bool {
        self.bmin.x <= self.bmax.x && self.bmin.y <= self.bmax.y && self.bmin.z <= self.bmax.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.bmin.x = self.bmin.x.min(p.x);
        self.bmin.y = self.bmin.y.min(p.y);
        self.bmin.z = self.bmin.z.min(p.z);
        self.bmax.x = self.bmax.x.max(p.x);
        self.bmax.y = self.bmax.y.max(p.y);
        self.bmax.z = self.bmax.z.max(p.z);
    }

    /// Expand this AABB to include another box.
    pub fn extend(&mut self, other: &Aabb) {
        self.bmin.x = self.bmin.x.min(other.bmin.x);
        self.bmin.y = self.bmin.y.min(other.bmin.y);
        self.bmin.z = self.bmin.z.min(other.bmin.z);
        self.bmax.x = self.bmax.x.max(other.bmax.x);
        self.bmax.y = self.bmax.y.max(other.bmax.y);
        self.bmax.z = self.bmax.z.max(other.bmax.z);
    }

    /// Expand the AABB by `delta` on every face.
    pub fn expand(&mut self, delta: f32) {
        self.bmin.x -= delta;
        self.bmin.y -= delta;
        self.bmin.z -= delta;
        self.bmax.x += delta;
        self.bmax.y += delta;
        self.bmax.z += delta;
    }

    /// Edge lengths.
    pub fn extent(&self) -> Vec3 {
        self.bmax - self.bmin
    }

    /// Box center.
    pub fn centroid(&self) -> Point3 {
        nalgebra::center(&self.bmin, &self.bmax)
    }

    /// Half of the surface area, used as the SAH cost proxy.
    pub fn half_area(&self) -> f32 {
        half_area(&self.extent())
    }

    /// Axis with the largest extent. Ties resolve to the smallest axis index.
    pub fn max_extent_axis(&self) -> usize {
        let ext = self.extent();
        let axis = if ext.x < ext.y { 1 } else { 0 };
        if ext.z > ext[axis] {
            2
        } else {
            axis
        }
    }

    /// Test whether `p` lies inside the box (boundary inclusive).
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| self.bmin[i] <= p[i] && p[i] <= self.bmax[i])
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.bmin.x <= other.bmax.x
            && self.bmax.x >= other.bmin.x
            && self.bmin.y <= other.bmax.y
            && self.bmax.y >= other.bmin.y
            && self.bmin.z <= other.bmax.z
            && self.bmax.z >= other.bmin.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Half surface area of a box with the given edge lengths.
#[inline]
pub fn half_area(extent: &Vec3) -> f32 {
    extent.x * extent.y + extent.y * extent.z + extent.z * extent.x
}

/// Four boxes in lane layout: `bounds[0]` holds the minima and `bounds[1]`
/// the maxima, each as one `f32x4` per axis with lane `i` belonging to box `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb4 {
    /// `[min | max][axis]`, four boxes per lane vector.
    pub bounds: [[f32x4; 3]; 2],
}

impl Aabb4 {
    /// Four inverted boxes; no ray ever hits them.
    pub fn empty() -> Self {
        Self {
            bounds: [
                [f32x4::splat(f32::MAX); 3],
                [f32x4::splat(-f32::MAX); 3],
            ],
        }
    }

    /// Pack four boxes, growing each face outward by `epsilon`.
    pub fn from_boxes(boxes: &[Aabb; 4], epsilon: f32) -> Self {
        let mut bb = [[[0.0f32; 4]; 3]; 2];
        for axis in 0..3 {
            for (lane, b) in boxes.iter().enumerate() {
                bb[0][axis][lane] = b.bmin[axis] - epsilon;
                bb[1][axis][lane] = b.bmax[axis] + epsilon;
            }
        }
        Self {
            bounds: bb.map(|side| side.map(f32x4::from)),
        }
    }

    /// Unpack box `lane`.
    pub fn lane(&self, lane: usize) -> Aabb {
        let min = self.bounds[0].map(|v| v.to_array()[lane]);
        let max = self.bounds[1].map(|v| v.to_array()[lane]);
        Aabb::new(
            Point3::new(min[0], min[1], min[2]),
            Point3::new(max[0], max[1], max[2]),
        )
    }
}

impl Default for Aabb4 {
    fn default() -> Self {
        Self::empty()
    }
}
