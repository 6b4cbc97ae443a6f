//! Nearest-hit and any-hit queries.

use qbvh_math::Vec3x4;
use wide::f32x4;

use super::node::ChildRef;
use super::BinQbvh;
use crate::intersect::{ray_aabb_batch4, ray_triangle_batch4};
use crate::{Intersection, Ray};

/// Near-to-far child order, indexed by `sign[axis0] | sign[axis1] << 1 | sign[axis2] << 2`.
///
/// The top split separates children {0, 1} from {2, 3}; the second and third
/// splits separate 0 from 1 and 2 from 3. A negative ray direction along a
/// split axis visits the upper side first.
pub(super) const TRAVERSAL_ORDER: [[u8; 4]; 8] = [
    [0, 1, 2, 3],
    [2, 3, 0, 1],
    [1, 0, 2, 3],
    [2, 3, 1, 0],
    [0, 1, 3, 2],
    [3, 2, 0, 1],
    [1, 0, 3, 2],
    [3, 2, 1, 0],
];

/// Per-query node stack. Reuse one across queries to avoid reallocating.
#[derive(Debug, Clone, Default)]
pub struct TraversalStack {
    entries: Vec<ChildRef>,
}

impl TraversalStack {
    /// Empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries the stack can hold without growing.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

/// Ray broadcast to four lanes.
struct RayLanes {
    origin: Vec3x4,
    direction: Vec3x4,
    inv_direction: Vec3x4,
    tmin: f32x4,
    sign: [usize; 3],
}

impl RayLanes {
    fn new(ray: &Ray) -> Self {
        Self {
            origin: Vec3x4::splat(&ray.origin.coords),
            direction: Vec3x4::splat(&ray.direction),
            inv_direction: Vec3x4::splat(ray.inv_direction()),
            tmin: f32x4::splat(ray.epsilon),
            sign: ray.sign(),
        }
    }
}

/// Closest accepted hit so far: slot in the primitive array and barycentrics.
#[derive(Debug, Clone, Copy)]
struct LeafHit {
    slot: usize,
    u: f32,
    v: f32,
}

impl<'a> BinQbvh<'a> {
    /// Stack sized for this tree's depth.
    pub fn traversal_stack(&self) -> TraversalStack {
        TraversalStack::with_capacity(3 * self.depth as usize + 1)
    }

    /// Find the closest hit with `ray.epsilon < t < ray.tmax`.
    pub fn intersect_nearest(&self, ray: &Ray) -> Option<Intersection> {
        self.intersect_nearest_with(ray, &mut self.traversal_stack())
    }

    /// [`BinQbvh::intersect_nearest`] with a caller-owned stack.
    pub fn intersect_nearest_with(&self, ray: &Ray, stack: &mut TraversalStack) -> Option<Intersection> {
        let mut r = *ray;
        let hit = self.traverse(&mut r, stack, false)?;

        let p = self.primitives[hit.slot];
        let mut isect = Intersection::default();
        self.shapes[p.shape.index()].fill_intersection(&mut isect, &r, hit.u, hit.v, p.primitive);
        isect.t = r.tmax;
        isect.shape = Some(p.shape);
        isect.primitive = p.primitive;
        Some(isect)
    }

    /// Test whether anything is hit with `ray.epsilon < t < ray.tmax`.
    ///
    /// Stops at the first accepted hit, which need not be the closest.
    pub fn intersect_any(&self, ray: &Ray) -> bool {
        self.intersect_any_with(ray, &mut self.traversal_stack())
    }

    /// [`BinQbvh::intersect_any`] with a caller-owned stack.
    pub fn intersect_any_with(&self, ray: &Ray, stack: &mut TraversalStack) -> bool {
        let mut r = *ray;
        self.traverse(&mut r, stack, true).is_some()
    }

    /// Walk the tree near-to-far, shrinking `ray.tmax` at every accepted hit.
    fn traverse(&self, ray: &mut Ray, stack: &mut TraversalStack, any: bool) -> Option<LeafHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let lanes = RayLanes::new(ray);
        let mut best = None;

        stack.entries.clear();
        stack.entries.push(ChildRef::Internal(0));
        while let Some(child) = stack.entries.pop() {
            match child {
                ChildRef::Empty => {}
                ChildRef::Leaf { start, count } => {
                    let (start, count) = (start as usize, count as usize);
                    let found = match self.primitives[start].pack {
                        Some(pack) => self.test_packed(ray, &lanes, start, count, pack as usize),
                        None => self.test_scalar(ray, start, count),
                    };
                    if found.is_some() {
                        best = found;
                        if any {
                            break;
                        }
                    }
                }
                ChildRef::Internal(index) => {
                    let node = &self.nodes[index as usize];
                    let hit = ray_aabb_batch4(
                        lanes.tmin,
                        f32x4::splat(ray.tmax),
                        &lanes.origin,
                        &lanes.direction,
                        &lanes.inv_direction,
                        lanes.sign,
                        &node.bbox,
                    );
                    if hit == 0 {
                        continue;
                    }

                    let [a0, a1, a2] = node.axis.map(|a| lanes.sign[a as usize]);
                    let order = &TRAVERSAL_ORDER[a0 | a1 << 1 | a2 << 2];
                    for &c in order.iter().rev() {
                        let c = c as usize;
                        if hit & (1 << c) != 0 && node.children[c] != ChildRef::Empty {
                            stack.entries.push(node.children[c]);
                        }
                    }
                }
            }
        }
        best
    }

    fn test_scalar(&self, ray: &mut Ray, start: usize, count: usize) -> Option<LeafHit> {
        let mut found = None;
        for slot in start..start + count {
            let p = self.primitives[slot];
            let Some(hit) = self.shapes[p.shape.index()].intersect(p.primitive, ray) else {
                continue;
            };
            if ray.epsilon < hit.t && hit.t < ray.tmax {
                ray.tmax = hit.t;
                found = Some(LeafHit {
                    slot,
                    u: hit.u,
                    v: hit.v,
                });
            }
        }
        found
    }

    fn test_packed(
        &self,
        ray: &mut Ray,
        lanes: &RayLanes,
        start: usize,
        count: usize,
        first_pack: usize,
    ) -> Option<LeafHit> {
        let mut found = None;
        let packs = &self.packs[first_pack..first_pack + count.div_ceil(4)];
        for (i, pack) in packs.iter().enumerate() {
            let hits = ray_triangle_batch4(&lanes.origin, &lanes.direction, &pack.x, &pack.y, &pack.z);
            let used = (count - 4 * i).min(4);
            for lane in 0..used {
                let Some(hit) = hits.lane(lane) else {
                    continue;
                };
                if ray.epsilon < hit.t && hit.t < ray.tmax {
                    ray.tmax = hit.t;
                    found = Some(LeafHit {
                        slot: start + 4 * i + lane,
                        u: hit.u,
                        v: hit.v,
                    });
                }
            }
        }
        found
    }
}
