// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural notifications, queued on the scene until drained.

use crate::types::NodeId;

/// A structural change observed by [`crate::Scene::drain_events`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    /// `child` was appended to `parent`.
    Added {
        /// The receiving container.
        parent: NodeId,
        /// The new child.
        child: NodeId,
    },
    /// `child` was detached from `parent` and is still alive.
    Removed {
        /// The former parent.
        parent: NodeId,
        /// The detached node.
        child: NodeId,
    },
    /// `node` was destroyed; its handle is now stale.
    Destroyed {
        /// The destroyed node.
        node: NodeId,
    },
}
