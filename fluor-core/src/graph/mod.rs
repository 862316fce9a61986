//! Dependency Graph
//!
//! The dependency graph is not a standalone registry: edges live inside the
//! cells themselves (each cached cell's nucleus records its callees strongly
//! and its callers weakly). This module provides the type-erased node
//! surface those edges are made of.

mod node;

pub use node::NodeRef;

pub(crate) use node::{distinct, CellNode, NodeKey};
