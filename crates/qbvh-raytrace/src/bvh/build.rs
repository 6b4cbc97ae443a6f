//! SAH construction.
//!
//! Each node is produced by three binary splits: one of the whole range,
//! then one of each half. A split is a median cut, an exact SAH sweep over
//! every cut point, or a binned SAH estimate, depending on depth, box area
//! and range size.

use log::trace;
use qbvh_math::{aabb::half_area, Aabb};

use super::node::{ChildRef, Node, Primitive4Pack, NODE_EPSILON};
use crate::config::BvhConfig;
use crate::error::{BvhError, Result};
use crate::shape::{Shape, ShapeId, ShapePrimitive, TriangleSoa};

/// Collect and validate every primitive of every shape.
pub(super) fn triangulate(shapes: &[&dyn Shape]) -> Result<Vec<ShapePrimitive>> {
    let mut total = 0usize;
    for (id, shape) in shapes.iter().enumerate() {
        let count = shape.primitive_count();
        if count < 0 {
            return Err(BvhError::NegativePrimitiveCount {
                shape: id as u32,
                count,
            });
        }
        total += count as usize;
    }

    let mut primitives = Vec::with_capacity(total);
    for (id, shape) in shapes.iter().enumerate() {
        let shape_id = ShapeId(id as u32);
        let count = shape.primitive_count();
        let first = primitives.len();
        shape.emit_primitives(shape_id, &mut primitives);

        for p in &mut primitives[first..] {
            if p.shape != shape_id {
                return Err(BvhError::ShapeMismatch {
                    expected: shape_id.0,
                    found: p.shape.0,
                });
            }
            if i64::from(p.primitive) >= i64::from(count) {
                return Err(BvhError::PrimitiveOutOfRange {
                    shape: shape_id.0,
                    primitive: p.primitive,
                    count,
                });
            }
            p.pack = None;
        }
    }

    if primitives.len() > u32::MAX as usize {
        return Err(BvhError::TooManyPrimitives(primitives.len()));
    }
    Ok(primitives)
}

/// One binary split of a primitive range.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: u8,
    num_l: usize,
    num_r: usize,
    bbox_l: Aabb,
    bbox_r: Aabb,
}

/// Output of [`Builder::run`].
pub(super) struct Built {
    pub nodes: Vec<Node>,
    /// Primitive indices in leaf order.
    pub order: Vec<u32>,
    pub depth: u32,
}

/// Scratch state for one build. Dropped when the build finishes.
pub(super) struct Builder<'c> {
    config: &'c BvhConfig,
    /// Permutation of primitive indices; ranges of it become leaves.
    order: Vec<u32>,
    /// Centroid coordinates, one array per axis.
    centroids: [Vec<f32>; 3],
    bboxes: Vec<Aabb>,
    nodes: Vec<Node>,
    depth: u32,
    suffix: Vec<Aabb>,
    min_bins: Vec<u32>,
    max_bins: Vec<u32>,
}

impl<'c> Builder<'c> {
    /// Cache centroids and boxes for every primitive.
    pub fn new(config: &'c BvhConfig, shapes: &[&dyn Shape], primitives: &[ShapePrimitive]) -> Self {
        let n = primitives.len();
        let mut centroids = [Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n)];
        let mut bboxes = Vec::with_capacity(n);
        for p in primitives {
            let shape = shapes[p.shape.index()];
            let c = shape.centroid(p.primitive);
            for (axis, keys) in centroids.iter_mut().enumerate() {
                keys.push(c[axis]);
            }
            bboxes.push(shape.bbox(p.primitive));
        }

        let bins = config.num_bins as usize;
        Self {
            config,
            order: (0..n as u32).collect(),
            centroids,
            bboxes,
            nodes: Vec::new(),
            depth: 0,
            suffix: Vec::new(),
            min_bins: vec![0; bins],
            max_bins: vec![0; bins],
        }
    }

    /// Build the tree. The root is always node 0.
    pub fn run(mut self) -> Built {
        let n = self.order.len();
        let bbox = self.range_bbox(0, n);
        self.nodes.push(Node::cleared());
        self.depth = 1;

        if n <= self.config.min_leaf_primitives as usize {
            let empty = Aabb::empty();
            self.nodes[0] = Node::new(
                &[bbox, empty, empty, empty],
                [ChildRef::leaf(0, n as u32), ChildRef::Empty, ChildRef::Empty, ChildRef::Empty],
                [0; 3],
            );
        } else {
            self.construct(0, n, 0, &bbox, 1);
        }

        Built {
            nodes: self.nodes,
            order: self.order,
            depth: self.depth,
        }
    }

    fn construct(&mut self, start: usize, count: usize, node: usize, bbox: &Aabb, depth: u32) {
        let (top, left, right) = if depth > self.config.max_binning_depth {
            let top = self.split_mid(start, count, bbox);
            let left = self.split_mid(start, top.num_l, &top.bbox_l);
            let right = self.split_mid(start + top.num_l, top.num_r, &top.bbox_r);
            (top, left, right)
        } else {
            let top = self.split(start, count, bbox);
            let left = self.split(start, top.num_l, &top.bbox_l);
            let right = self.split(start + top.num_l, top.num_r, &top.bbox_r);
            (top, left, right)
        };

        let starts = [
            start,
            start + left.num_l,
            start + top.num_l,
            start + top.num_l + right.num_l,
        ];
        let counts = [left.num_l, left.num_r, right.num_l, right.num_r];
        let boxes = [left.bbox_l, left.bbox_r, right.bbox_l, right.bbox_r];

        let mut children = [ChildRef::Empty; 4];
        for (i, child) in children.iter_mut().enumerate() {
            *child = if counts[i] <= self.config.min_leaf_primitives as usize {
                ChildRef::leaf(starts[i] as u32, counts[i] as u32)
            } else {
                self.nodes.push(Node::cleared());
                ChildRef::Internal((self.nodes.len() - 1) as u32)
            };
        }
        self.nodes[node] = Node::new(&boxes, children, [top.axis, left.axis, right.axis]);

        let depth = depth + 1;
        for (i, child) in children.iter().enumerate() {
            if let ChildRef::Internal(index) = *child {
                self.construct(starts[i], counts[i], index as usize, &boxes[i], depth);
            }
        }
        self.depth = self.depth.max(depth);
    }

    fn split(&mut self, start: usize, count: usize, bbox: &Aabb) -> Split {
        let area = bbox.half_area();
        if area <= NODE_EPSILON {
            self.split_mid(start, count, bbox)
        } else if count < self.config.num_bins as usize {
            self.split_sah(start, count, bbox, 1.0 / area)
        } else {
            self.split_binned(start, count, bbox, area)
        }
    }

    fn sort_range(&mut self, start: usize, count: usize, axis: usize) {
        let keys = &self.centroids[axis];
        self.order[start..start + count]
            .sort_unstable_by(|&a, &b| keys[a as usize].total_cmp(&keys[b as usize]));
    }

    fn range_bbox(&self, start: usize, end: usize) -> Aabb {
        let mut bbox = Aabb::empty();
        for &i in &self.order[start..end] {
            bbox.extend(&self.bboxes[i as usize]);
        }
        bbox
    }

    /// Halve the range along the box's longest axis.
    fn split_mid(&mut self, start: usize, count: usize, bbox: &Aabb) -> Split {
        let axis = bbox.max_extent_axis();
        self.sort_range(start, count, axis);

        let num_l = count / 2;
        let mid = start + num_l;
        Split {
            axis: axis as u8,
            num_l,
            num_r: count - num_l,
            bbox_l: self.range_bbox(start, mid),
            bbox_r: self.range_bbox(mid, start + count),
        }
    }

    /// Try every cut along the longest axis.
    fn split_sah(&mut self, start: usize, count: usize, bbox: &Aabb, inv_area: f32) -> Split {
        let axis = bbox.max_extent_axis();
        let keys = &self.centroids[axis];
        self.order[start..start + count]
            .sort_by(|&a, &b| keys[a as usize].total_cmp(&keys[b as usize]));

        // suffix[k] bounds primitives start + k .. start + count.
        self.suffix.clear();
        self.suffix.resize(count + 1, Aabb::empty());
        for k in (0..count).rev() {
            let mut b = self.suffix[k + 1];
            b.extend(&self.bboxes[self.order[start + k] as usize]);
            self.suffix[k] = b;
        }

        let kt = self.config.sah_traversal_cost;
        let ki = self.config.sah_intersection_cost;
        let mut best = count / 2;
        let mut best_cost = f32::MAX;
        let mut left = Aabb::empty();
        for m in 1..count {
            left.extend(&self.bboxes[self.order[start + m - 1] as usize]);
            let area_l = left.half_area();
            let area_r = self.suffix[m].half_area();
            let cost = kt + ki * inv_area * (area_l * m as f32 + area_r * (count - m) as f32);
            if cost < best_cost {
                best = m;
                best_cost = cost;
            }
        }

        Split {
            axis: axis as u8,
            num_l: best,
            num_r: count - best,
            bbox_l: self.range_bbox(start, start + best),
            bbox_r: self.suffix[best],
        }
    }

    /// Estimate SAH cost at bin boundaries on all three axes, then partition
    /// around the cheapest boundary.
    fn split_binned(&mut self, start: usize, count: usize, bbox: &Aabb, area: f32) -> Split {
        let bins = self.config.num_bins as usize;
        let kt = self.config.sah_traversal_cost;
        let ki = self.config.sah_intersection_cost;
        let inv_area = 1.0 / area;
        let extent = bbox.extent();
        let unit = extent / bins as f32;
        // Sample every `step`-th primitive of the sorted range.
        let step = ((count as f32).log10() as usize).max(1);

        let mut best: Option<(usize, usize)> = None;
        let mut best_cost = f32::MAX;
        for axis in 0..3 {
            if unit[axis].abs() < NODE_EPSILON {
                continue;
            }
            self.sort_range(start, count, axis);

            let inv_unit = 1.0 / unit[axis];
            let bmin = bbox.bmin[axis];
            self.min_bins.fill(0);
            self.max_bins.fill(0);
            for &i in self.order[start..start + count].iter().step_by(step) {
                let b = &self.bboxes[i as usize];
                let lo = (((b.bmin[axis] - bmin) * inv_unit) as usize).min(bins - 1);
                let hi = (((b.bmax[axis] - bmin) * inv_unit) as usize).min(bins - 1);
                self.min_bins[lo] += 1;
                self.max_bins[hi] += 1;
            }

            let bin_left = self.min_bins.iter().position(|&c| c > 0).unwrap_or(0);
            let bin_right = self.max_bins.iter().rposition(|&c| c > 0).unwrap_or(bins - 1);

            let mut n_l = 0u32;
            let mut n_r: u32 = self.max_bins.iter().sum();
            for m in bin_left..=bin_right {
                let mut e = extent;
                e[axis] = unit[axis] * m as f32;
                let area_l = half_area(&e);
                e[axis] = extent[axis] - e[axis];
                let area_r = half_area(&e);

                let cost = kt + ki * inv_area * (area_l * n_l as f32 + area_r * n_r as f32);
                if cost < best_cost {
                    best = Some((axis, m));
                    best_cost = cost;
                }
                n_l += self.min_bins[m];
                n_r -= self.max_bins[m];
            }
        }

        let Some((axis, bin)) = best else {
            trace!("binned split of {count} primitives found no axis, using median");
            return self.split_mid(start, count, bbox);
        };

        let separate = unit[axis] * bin as f32 + bbox.bmin[axis];
        let keys = &self.centroids[axis];
        let range = &mut self.order[start..start + count];
        let mut left = 0;
        let mut right = count;
        while left < right {
            if keys[range[left] as usize] < separate {
                left += 1;
            } else {
                right -= 1;
                range.swap(left, right);
            }
        }

        if left == 0 || left == count {
            trace!("binned split of {count} primitives degenerated on axis {axis}, using median");
            return self.split_mid(start, count, bbox);
        }

        Split {
            axis: axis as u8,
            num_l: left,
            num_r: count - left,
            bbox_l: self.range_bbox(start, start + left),
            bbox_r: self.range_bbox(start + left, start + count),
        }
    }
}

/// Pack every leaf's triangles four at a time, recording each primitive's pack.
pub(super) fn pack_leaves(
    nodes: &[Node],
    shapes: &[&dyn Shape],
    primitives: &mut [ShapePrimitive],
) -> Vec<Primitive4Pack> {
    let mut packs = Vec::with_capacity(primitives.len().div_ceil(4));
    for node in nodes {
        for child in &node.children {
            let ChildRef::Leaf { start, count } = *child else {
                continue;
            };
            let leaf = &mut primitives[start as usize..(start + count) as usize];
            for chunk in leaf.chunks_mut(4) {
                let mut soa = TriangleSoa::default();
                for (lane, p) in chunk.iter_mut().enumerate() {
                    shapes[p.shape.index()].vertices_soa(lane, p.primitive, &mut soa);
                    p.pack = Some(packs.len() as u32);
                }
                packs.push(Primitive4Pack::from(&soa));
            }
        }
    }
    packs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::TriangleMesh;
    use qbvh_math::Point3;

    fn strip(n: usize) -> TriangleMesh {
        let mut points = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..n {
            let x = i as f32 * 2.0;
            let base = points.len() as u32;
            points.push(Point3::new(x, 0.0, 0.0));
            points.push(Point3::new(x + 1.0, 0.0, 0.0));
            points.push(Point3::new(x, 1.0, 0.0));
            triangles.push([base, base + 1, base + 2]);
        }
        TriangleMesh::new(points, triangles, None, None).unwrap()
    }

    fn build(mesh: &TriangleMesh, config: &BvhConfig) -> (Vec<ShapePrimitive>, Built) {
        let shapes: Vec<&dyn Shape> = vec![mesh];
        let primitives = triangulate(&shapes).unwrap();
        let built = Builder::new(config, &shapes, &primitives).run();
        (primitives, built)
    }

    /// Every primitive lands in exactly one leaf.
    fn leaf_coverage(built: &Built) -> Vec<u32> {
        let mut seen = vec![0u32; built.order.len()];
        for node in &built.nodes {
            for child in &node.children {
                if let ChildRef::Leaf { start, count } = *child {
                    for slot in start..start + count {
                        seen[built.order[slot as usize] as usize] += 1;
                    }
                }
            }
        }
        seen
    }

    #[test]
    fn test_small_scene_is_single_leaf() {
        let mesh = strip(10);
        let (_, built) = build(&mesh, &BvhConfig::default());
        assert_eq!(built.nodes.len(), 1);
        assert_eq!(built.depth, 1);
        assert_eq!(built.nodes[0].children[0], ChildRef::Leaf { start: 0, count: 10 });
        assert_eq!(built.nodes[0].children[1], ChildRef::Empty);
    }

    #[test]
    fn test_every_primitive_in_one_leaf() {
        let mesh = strip(500);
        for config in [
            BvhConfig::default(),
            BvhConfig {
                max_binning_depth: 0,
                ..Default::default()
            },
            BvhConfig {
                min_leaf_primitives: 1,
                num_bins: 4,
                ..Default::default()
            },
        ] {
            let (_, built) = build(&mesh, &config);
            assert!(built.nodes.len() > 1);
            assert!(leaf_coverage(&built).iter().all(|&c| c == 1));
            for node in &built.nodes {
                for child in &node.children {
                    if let ChildRef::Leaf { count, .. } = child {
                        assert!(*count <= config.min_leaf_primitives);
                    }
                }
            }
        }
    }

    #[test]
    fn test_child_boxes_enclose_leaf_primitives() {
        let mesh = strip(200);
        let (primitives, built) = build(&mesh, &BvhConfig::default());
        for node in &built.nodes {
            for (lane, child) in node.children.iter().enumerate() {
                let ChildRef::Leaf { start, count } = *child else {
                    continue;
                };
                let bbox = node.bbox.lane(lane);
                for slot in start..start + count {
                    let p = primitives[built.order[slot as usize] as usize];
                    let b = mesh.bbox(p.primitive);
                    assert!(bbox.contains(&b.bmin) && bbox.contains(&b.bmax));
                }
            }
        }
    }

    #[test]
    fn test_coincident_primitives_terminate() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = TriangleMesh::new(points, vec![[0, 1, 2]; 300], None, None).unwrap();
        let (_, built) = build(&mesh, &BvhConfig::default());
        assert!(leaf_coverage(&built).iter().all(|&c| c == 1));
    }

    #[test]
    fn test_collinear_slivers_split_at_median() {
        // Every vertex lies on the x axis, so each box has zero area.
        let mut points = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..64u32 {
            let x = i as f32 * 2.0;
            points.push(Point3::new(x, 0.0, 0.0));
            points.push(Point3::new(x + 1.0, 0.0, 0.0));
            points.push(Point3::new(x + 0.5, 0.0, 0.0));
            triangles.push([3 * i, 3 * i + 1, 3 * i + 2]);
        }
        let mesh = TriangleMesh::new(points, triangles, None, None).unwrap();
        let config = BvhConfig {
            min_leaf_primitives: 4,
            ..Default::default()
        };
        let (primitives, built) = build(&mesh, &config);

        assert_eq!(built.nodes.len(), 5);
        assert!(leaf_coverage(&built).iter().all(|&c| c == 1));
        assert!(built.nodes[0]
            .children
            .iter()
            .all(|c| matches!(c, ChildRef::Internal(_))));

        // Median cuts along x leave each leaf a contiguous run of four slivers.
        for node in &built.nodes[1..] {
            assert_eq!(node.axis, [0, 0, 0]);
            for child in &node.children {
                let ChildRef::Leaf { start, count } = *child else {
                    panic!("expected a leaf, got {child:?}");
                };
                assert_eq!(count, 4);
                let mut ids: Vec<u32> = (start..start + count)
                    .map(|slot| primitives[built.order[slot as usize] as usize].primitive)
                    .collect();
                ids.sort_unstable();
                assert_eq!(ids[3] - ids[0], 3);
            }
        }
    }

    #[test]
    fn test_pack_leaves() {
        let mesh = strip(37);
        let config = BvhConfig {
            min_leaf_primitives: 6,
            ..Default::default()
        };
        let (primitives, built) = build(&mesh, &config);
        let shapes: Vec<&dyn Shape> = vec![&mesh];
        let mut ordered: Vec<ShapePrimitive> =
            built.order.iter().map(|&i| primitives[i as usize]).collect();
        let packs = pack_leaves(&built.nodes, &shapes, &mut ordered);

        let mut expected = 0;
        for node in &built.nodes {
            for child in &node.children {
                if let ChildRef::Leaf { count, .. } = child {
                    expected += count.div_ceil(4) as usize;
                }
            }
        }
        assert_eq!(packs.len(), expected);
        assert!(ordered.iter().all(|p| p.pack.is_some()));
    }
}
