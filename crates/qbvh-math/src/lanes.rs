//! Four-lane vector math over [`wide::f32x4`].
//!
//! Kernels written against these helpers process four rays, boxes or
//! triangles per instruction on any target `wide` supports, with a scalar
//! fallback where no SIMD unit exists.

use std::ops::Sub;

use wide::f32x4;

use crate::Vec3;

/// Three coordinates, four lanes each (structure-of-arrays).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3x4 {
    /// X coordinates.
    pub x: f32x4,
    /// Y coordinates.
    pub y: f32x4,
    /// Z coordinates.
    pub z: f32x4,
}

impl Vec3x4 {
    /// Construct from three lane vectors.
    #[inline]
    pub fn new(x: f32x4, y: f32x4, z: f32x4) -> Self {
        Self { x, y, z }
    }

    /// Broadcast one vector to all four lanes.
    #[inline]
    pub fn splat(v: &Vec3) -> Self {
        Self {
            x: f32x4::splat(v.x),
            y: f32x4::splat(v.y),
            z: f32x4::splat(v.z),
        }
    }

    /// Lane vector for `axis` (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> f32x4 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Lane-wise dot product, summed as `(x + y) + z`.
    #[inline]
    pub fn dot(&self, rhs: &Vec3x4) -> f32x4 {
        let tx = self.x * rhs.x;
        let ty = self.y * rhs.y;
        let tz = self.z * rhs.z;
        (tx + ty) + tz
    }

    /// Lane-wise cross product.
    #[inline]
    pub fn cross(&self, rhs: &Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Extract lane `lane` as a scalar vector.
    pub fn lane(&self, lane: usize) -> Vec3 {
        Vec3::new(
            self.x.to_array()[lane],
            self.y.to_array()[lane],
            self.z.to_array()[lane],
        )
    }
}

impl Sub for Vec3x4 {
    type Output = Vec3x4;

    #[inline]
    fn sub(self, rhs: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// Collapse a lane mask (all-ones / all-zeros per lane) to its low 4 bits.
#[inline]
pub fn move_mask(mask: f32x4) -> u8 {
    (mask.move_mask() & 0x0F) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use wide::CmpLt;

    #[test]
    fn test_dot_cross_match_scalar() {
        let a = [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-1.0, 0.5, 2.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(4.0, -3.0, 0.25),
        ];
        let b = [
            Vec3::new(0.5, -1.0, 2.0),
            Vec3::new(3.0, 1.0, -1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-2.0, 2.0, 8.0),
        ];
        let pack = |v: &[Vec3; 4]| {
            Vec3x4::new(
                f32x4::from(v.map(|p| p.x)),
                f32x4::from(v.map(|p| p.y)),
                f32x4::from(v.map(|p| p.z)),
            )
        };
        let (la, lb) = (pack(&a), pack(&b));
        let dot = la.dot(&lb).to_array();
        let cross = la.cross(&lb);
        for i in 0..4 {
            assert_eq!(dot[i], a[i].x * b[i].x + a[i].y * b[i].y + a[i].z * b[i].z);
            assert_eq!(cross.lane(i), a[i].cross(&b[i]));
        }
    }

    #[test]
    fn test_move_mask() {
        let v = f32x4::from([1.0, -1.0, 2.0, -2.0]);
        assert_eq!(move_mask(v.cmp_lt(f32x4::ZERO)), 0b1010);
        assert_eq!(move_mask(f32x4::ZERO.cmp_lt(f32x4::ONE)), 0b1111);
    }

    #[test]
    fn test_splat_axis() {
        let v = Vec3x4::splat(&Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.axis(1).to_array(), [2.0; 4]);
        assert_eq!(v.lane(3), Vec3::new(1.0, 2.0, 3.0));
    }
}
