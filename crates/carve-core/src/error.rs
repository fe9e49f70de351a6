//! Error types for Carve

use crate::node::NodeId;
use std::fmt;
use thiserror::Error;

/// Result type alias using Carve's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The three flat tables produced by a compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Primitives,
    Transforms,
    Operations,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Table::Primitives => "primitive",
            Table::Transforms => "transform",
            Table::Operations => "operation",
        })
    }
}

/// Errors that can occur while editing or compiling a scene
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A compiled table does not fit its configured capacity
    #[error("Capacity exceeded: {count} {table} entries, limit is {capacity}")]
    CapacityExceeded {
        table: Table,
        count: usize,
        capacity: usize,
    },

    /// A compiled table does not fit the fixed uniform block
    #[error("Uniform block overflow: {count} {table} entries, block holds {capacity}")]
    UniformOverflow {
        table: Table,
        count: usize,
        capacity: usize,
    },

    /// The id does not refer to a live node
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Primitive leaves cannot own children
    #[error("Node {0} cannot have children")]
    NotAContainer(NodeId),

    /// The synthetic root cannot be moved or removed
    #[error("The root node cannot be moved or removed")]
    RootImmutable,

    /// A node cannot become its own parent
    #[error("Node {0} cannot be its own parent")]
    SelfParent(NodeId),

    /// Subtract marking requested on a node whose parent is not a difference
    #[error("Node {0} is not a child of a difference node")]
    NotDifferenceChild(NodeId),

    /// The node cannot take on the requested kind
    #[error("Node {0} cannot become a {1}")]
    KindChange(NodeId, &'static str),

    /// A descriptor was not interned before operations referenced it
    #[error("Missing {0} descriptor for node {1}")]
    MissingDescriptor(Table, NodeId),
}
