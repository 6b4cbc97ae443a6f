//! Quad-branching BVH over registered shapes.
//!
//! Built once with a surface area heuristic, then queried from any number
//! of threads. Every node has four children whose boxes are tested against
//! a ray in one 4-wide slab test.

mod build;
mod node;
mod traverse;


pub use node::{ChildRef, Node, Primitive4Pack, NODE_EPSILON};
pub use traverse::TraversalStack;

use log::debug;

use crate::config::BvhConfig;
use crate::error::Result;
use crate::shape::{Shape, ShapeId, ShapePrimitive};

/// Quad BVH accelerator.
///
/// Borrows its shapes; they must outlive the accelerator. Queries before a
/// successful [`BinQbvh::build`] report no hit.
pub struct BinQbvh<'a> {
    config: BvhConfig,
    shapes: Vec<&'a dyn Shape>,
    nodes: Vec<Node>,
    primitives: Vec<ShapePrimitive>,
    packs: Vec<Primitive4Pack>,
    depth: u32,
}

impl<'a> BinQbvh<'a> {
    /// Create an empty accelerator with default settings.
    pub fn new() -> Self {
        Self {
            config: BvhConfig::default(),
            shapes: Vec::new(),
            nodes: Vec::new(),
            primitives: Vec::new(),
            packs: Vec::new(),
            depth: 0,
        }
    }

    /// Create an empty accelerator with custom settings.
    pub fn with_config(config: BvhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Register a shape. Takes effect at the next [`BinQbvh::build`].
    pub fn add_shape(&mut self, shape: &'a dyn Shape) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(shape);
        id
    }

    /// Forget every shape and discard the tree built over them.
    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
        self.reset();
    }

    /// Build the tree from the registered shapes, replacing any previous one.
    ///
    /// On error the accelerator is left empty.
    pub fn build(&mut self) -> Result<()> {
        self.reset();

        let primitives = build::triangulate(&self.shapes)?;
        let built = build::Builder::new(&self.config, &self.shapes, &primitives).run();

        let mut ordered: Vec<ShapePrimitive> = built
            .order
            .iter()
            .map(|&i| primitives[i as usize])
            .collect();
        if self.config.pack_leaves {
            self.packs = build::pack_leaves(&built.nodes, &self.shapes, &mut ordered);
        }

        self.nodes = built.nodes;
        self.primitives = ordered;
        self.depth = built.depth;

        debug!(
            "built quad BVH: {} shapes, {} primitives, {} nodes, {} packs, depth {}",
            self.shapes.len(),
            self.primitives.len(),
            self.nodes.len(),
            self.packs.len(),
            self.depth
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.primitives.clear();
        self.packs.clear();
        self.depth = 0;
    }

    /// Construction settings.
    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    /// Deepest level reached during construction (the root is level 1).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of nodes; zero before a build.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of indexed primitives.
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Number of 4-wide leaf packs.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Number of registered shapes.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl Default for BinQbvh<'_> {
    fn default() -> Self {
        Self::new()
    }
}
