// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by scene mutations.

use thiserror::Error;

use crate::types::{NodeId, NodeKind};

/// Error type for scene mutations.
///
/// Validation happens before any state changes. A failed call leaves the
/// scene as it was, except that a multi-child `add` keeps the children
/// accepted before the failing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The handle does not refer to a live node.
    #[error("node {0:?} is not live")]
    StaleNode(NodeId),
    /// The node is a shape and cannot hold children.
    #[error("node {0:?} is not a container")]
    NotAContainer(NodeId),
    /// The container variant does not accept this kind of child.
    #[error("a {parent} cannot hold a {child} child")]
    InvalidChild {
        /// Kind of the receiving container.
        parent: NodeKind,
        /// Kind of the rejected child.
        child: NodeKind,
    },
    /// The child is the container itself or one of its ancestors.
    #[error("adding {child:?} to {parent:?} would create a cycle")]
    Cycle {
        /// The receiving container.
        parent: NodeId,
        /// The rejected child.
        child: NodeId,
    },
    /// The node is a container, but the operation needs a shape.
    #[error("node {0:?} is not a shape")]
    NotAShape(NodeId),
    /// The operation only applies to layers.
    #[error("node {0:?} is not a layer")]
    NotALayer(NodeId),
    /// The node's client rect is empty, so there is nothing to cache.
    #[error("cannot cache node {0:?}: width or height is zero")]
    EmptyCache(NodeId),
}
