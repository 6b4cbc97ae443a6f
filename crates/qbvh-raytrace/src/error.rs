//! Error types for shapes and acceleration-structure construction.

use thiserror::Error;

/// Errors raised while assembling a triangle mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Triangle index.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A per-vertex attribute array does not match the vertex count.
    #[error("{attribute} has {found} entries, expected {expected}")]
    AttributeCount {
        /// Attribute name.
        attribute: &'static str,
        /// Number of vertices.
        expected: usize,
        /// Number of attribute entries supplied.
        found: usize,
    },

    /// The mesh has more triangles than a primitive id can address.
    #[error("mesh has {0} triangles, more than a primitive id can address")]
    TooManyTriangles(usize),
}

/// Errors that can occur while building the BVH.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// A shape reported a negative primitive count.
    #[error("shape {shape} reports a negative primitive count ({count})")]
    NegativePrimitiveCount {
        /// Shape id.
        shape: u32,
        /// Reported count.
        count: i32,
    },

    /// A shape emitted a primitive id outside `0..primitive_count()`.
    #[error("shape {shape} emitted primitive {primitive}, but has {count} primitives")]
    PrimitiveOutOfRange {
        /// Shape id.
        shape: u32,
        /// Emitted primitive id.
        primitive: u32,
        /// Reported primitive count.
        count: i32,
    },

    /// A shape emitted primitives tagged with another shape's id.
    #[error("shape {expected} emitted a primitive tagged with shape {found}")]
    ShapeMismatch {
        /// Id the shape was registered under.
        expected: u32,
        /// Id found on the emitted primitive.
        found: u32,
    },

    /// The scene holds more primitives than a leaf reference can address.
    #[error("scene has {0} primitives, more than a leaf can address")]
    TooManyPrimitives(usize),

    /// Invalid build configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mesh assembly failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Result type for BVH operations.
pub type Result<T> = std::result::Result<T, BvhError>;
