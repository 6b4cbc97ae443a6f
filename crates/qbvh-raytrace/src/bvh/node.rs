//! Node and leaf-pack storage.

use qbvh_math::{Aabb, Aabb4};
use wide::f32x4;

use crate::shape::TriangleSoa;

/// Padding applied to every child box; also the half-area below which a
/// box is treated as flat during construction.
pub const NODE_EPSILON: f32 = 1.0e-6;

/// Reference from a node slot to what lies below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    /// Index into the node array.
    Internal(u32),
    /// Range of the reordered primitive array.
    Leaf {
        /// First primitive.
        start: u32,
        /// Number of primitives, never zero.
        count: u32,
    },
    /// Unused slot.
    Empty,
}

impl ChildRef {
    /// Leaf over `count` primitives, or [`ChildRef::Empty`] when there are none.
    pub fn leaf(start: u32, count: u32) -> Self {
        if count == 0 {
            Self::Empty
        } else {
            Self::Leaf { start, count }
        }
    }
}

/// Interior node with four children.
///
/// Children 0 and 1 come from the lower half of the top split, 2 and 3
/// from the upper half. `axis` holds the top, left and right split axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Child boxes, padded by [`NODE_EPSILON`].
    pub bbox: Aabb4,
    /// Child references.
    pub children: [ChildRef; 4],
    /// Split axes: top, children 0/1, children 2/3.
    pub axis: [u8; 3],
}

impl Node {
    /// Node with four empty children.
    pub fn cleared() -> Self {
        Self {
            bbox: Aabb4::empty(),
            children: [ChildRef::Empty; 4],
            axis: [0; 3],
        }
    }

    /// Node over four child boxes.
    pub fn new(boxes: &[Aabb; 4], children: [ChildRef; 4], axis: [u8; 3]) -> Self {
        Self {
            bbox: Aabb4::from_boxes(boxes, NODE_EPSILON),
            children,
            axis,
        }
    }
}

/// Four triangles of one leaf in lane layout, for the 4-wide leaf test.
///
/// Lanes past the end of the leaf are zero, a degenerate triangle no ray hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive4Pack {
    /// `x[vertex]`, four triangles per lane vector.
    pub x: [f32x4; 3],
    /// `y[vertex]`.
    pub y: [f32x4; 3],
    /// `z[vertex]`.
    pub z: [f32x4; 3],
}

impl From<&TriangleSoa> for Primitive4Pack {
    fn from(soa: &TriangleSoa) -> Self {
        Self {
            x: soa.x.map(f32x4::from),
            y: soa.y.map(f32x4::from),
            z: soa.z.map(f32x4::from),
        }
    }
}
