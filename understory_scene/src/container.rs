// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree mutation: adding, removing, destroying, reordering, and cloning.
//!
//! Every operation here restores the link invariant before returning: for a
//! container `c` and the child `k` at position `i` of its children,
//! `k.parent == Some(c)` and `k.index == i`.

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::error::SceneError;
use crate::events::SceneEvent;
use crate::node::{ContainerData, NodeRef, Payload};
use crate::scene::Scene;
use crate::surface::Surface;
use crate::types::NodeId;

impl<S: Surface> Scene<S> {
    /// Append `children` to `parent`, in order.
    ///
    /// A child that already has a different parent is moved here; a child
    /// already under `parent` is left where it is. Each child is validated
    /// before anything about it changes, so a failing child leaves the scene
    /// as the previous children left it.
    ///
    /// Returns `self` for chaining.
    ///
    /// ## Errors
    ///
    /// - [`SceneError::StaleNode`] if `parent` or a child is not live.
    /// - [`SceneError::NotAContainer`] if `parent` is a shape.
    /// - [`SceneError::Cycle`] if a child is `parent` or one of its ancestors.
    /// - [`SceneError::InvalidChild`] if the container variant rejects the
    ///   child's kind.
    pub fn add(&mut self, parent: NodeId, children: &[NodeId]) -> Result<&mut Self, SceneError> {
        for &child in children {
            self.add_one(parent, child)?;
        }
        Ok(self)
    }

    /// Move `id` under `container`. Same as adding a single child.
    pub fn move_to(&mut self, id: NodeId, container: NodeId) -> Result<(), SceneError> {
        self.add_one(container, id)
    }

    fn add_one(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let kind = self
            .live(parent)?
            .container()
            .ok_or(SceneError::NotAContainer(parent))?
            .kind;
        let child_node = self.live(child)?;
        let child_kind = child_node.kind();
        let old_parent = child_node.parent;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        if old_parent == Some(parent) {
            return Ok(());
        }
        kind.validate_add(child_kind)?;

        if let Some(old) = old_parent {
            log::trace!("moving {child:?} from {old:?} to {parent:?}");
            self.detach(child);
            self.emit(SceneEvent::Removed { parent: old, child });
            self.request_draw(old);
        }
        self.clear_caches_for_move(child);
        self.attach(parent, child);
        self.emit(SceneEvent::Added { parent, child });
        self.request_draw(child);
        Ok(())
    }

    /// Append without validation or notifications.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let siblings = &mut self.container_unchecked_mut(parent).children;
        let index = siblings.len();
        siblings.push(child);
        let node = self.node_mut(child);
        node.parent = Some(parent);
        node.index = index;
    }

    /// Unlink `id` from its parent and renumber the following siblings.
    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = node.parent?;
        let index = node.index;
        let siblings = &mut self.container_unchecked_mut(parent).children;
        debug_assert_eq!(siblings.get(index), Some(&id), "child index out of sync");
        siblings.remove(index);
        self.renumber(parent, index);
        let node = self.node_mut(id);
        node.parent = None;
        node.index = 0;
        Some(parent)
    }

    fn renumber(&mut self, parent: NodeId, from: usize) {
        for i in from..self.node(parent).children().len() {
            let child = self.node(parent).children()[i];
            self.node_mut(child).index = i;
        }
    }

    fn container_unchecked_mut(&mut self, id: NodeId) -> &mut ContainerData {
        self.node_mut(id)
            .container_mut()
            .expect("parent links always point at containers")
    }

    /// Detach `id` from its parent. The node stays alive and can be added again.
    ///
    /// Detached nodes are left as they are.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.live(id)?;
        if let Some(parent) = self.detach(id) {
            self.clear_caches_for_move(id);
            self.emit(SceneEvent::Removed { parent, child: id });
            self.request_draw(parent);
        }
        Ok(())
    }

    /// Detach every child of `container`. The children stay alive.
    pub fn remove_children(&mut self, container: NodeId) -> Result<(), SceneError> {
        let children = core::mem::take(&mut self.container_data_mut(container)?.children);
        if children.is_empty() {
            return Ok(());
        }
        // Unlink everything first; there is nothing left to renumber.
        for &child in &children {
            let node = self.node_mut(child);
            node.parent = None;
            node.index = 0;
        }
        for child in children {
            self.clear_caches_for_move(child);
            self.emit(SceneEvent::Removed {
                parent: container,
                child,
            });
        }
        self.request_draw(container);
        Ok(())
    }

    /// Destroy `id` and its whole subtree; every handle into it becomes stale.
    ///
    /// Descendants are destroyed before their ancestors.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.live(id)?;
        let parent = self.detach(id);
        self.destroy_detached(id);
        if let Some(parent) = parent {
            self.request_draw(parent);
        }
        Ok(())
    }

    /// Destroy every child of `container` and their subtrees.
    pub fn destroy_children(&mut self, container: NodeId) -> Result<(), SceneError> {
        let children = core::mem::take(&mut self.container_data_mut(container)?.children);
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            let node = self.node_mut(child);
            node.parent = None;
            node.index = 0;
            self.destroy_detached(child);
        }
        self.request_draw(container);
        Ok(())
    }

    fn destroy_detached(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match &mut self.node_mut(id).payload {
            Payload::Container(c) => core::mem::take(&mut c.children),
            Payload::Shape(_) => Vec::new(),
        };
        for child in children {
            let node = self.node_mut(child);
            node.parent = None;
            node.index = 0;
            self.destroy_detached(child);
        }
        self.free(id);
        self.emit(SceneEvent::Destroyed { node: id });
    }

    // --- z-order ---

    /// Move `id` to the end of its parent's children, painting it last.
    ///
    /// Returns whether the order changed.
    pub fn move_to_top(&mut self, id: NodeId) -> bool {
        self.reposition(id, |_, len| Some(len - 1))
    }

    /// Move `id` to the start of its parent's children, painting it first.
    ///
    /// Returns whether the order changed.
    pub fn move_to_bottom(&mut self, id: NodeId) -> bool {
        self.reposition(id, |_, _| Some(0))
    }

    /// Swap `id` with the sibling painted after it.
    ///
    /// Returns whether the order changed.
    pub fn move_up(&mut self, id: NodeId) -> bool {
        self.reposition(id, |index, len| (index + 1 < len).then_some(index + 1))
    }

    /// Swap `id` with the sibling painted before it.
    ///
    /// Returns whether the order changed.
    pub fn move_down(&mut self, id: NodeId) -> bool {
        self.reposition(id, |index, _| index.checked_sub(1))
    }

    /// Move `id` to position `z` among its siblings.
    ///
    /// Positions outside `0..len` are rejected with a warning. Returns whether
    /// the order changed.
    pub fn set_z_index(&mut self, id: NodeId, z: usize) -> bool {
        self.reposition(id, |_, len| {
            if z >= len {
                log::warn!("z-index {z} out of range for {id:?}; expected 0..{len}");
                return None;
            }
            Some(z)
        })
    }

    fn reposition(
        &mut self,
        id: NodeId,
        target: impl FnOnce(usize, usize) -> Option<usize>,
    ) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let Some(parent) = node.parent else {
            log::warn!("{id:?} has no parent; z-order unchanged");
            return false;
        };
        let from = node.index;
        let len = self.node(parent).children().len();
        let Some(to) = target(from, len) else {
            return false;
        };
        if to == from {
            return false;
        }
        let siblings = &mut self.container_unchecked_mut(parent).children;
        let child = siblings.remove(from);
        siblings.insert(to, child);
        self.renumber(parent, from.min(to));
        self.request_draw(parent);
        true
    }

    // --- queries ---

    /// Returns true if `id` is a live container with at least one child.
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children_of(id).is_empty()
    }

    /// Children of `id` accepted by `filter`, in paint order.
    pub fn children_filtered(
        &self,
        id: NodeId,
        filter: impl Fn(NodeRef<'_>) -> bool,
    ) -> Vec<NodeId> {
        self.children_of(id)
            .iter()
            .copied()
            .filter(|&child| filter(NodeRef::new(child, self.node(child))))
            .collect()
    }

    /// Returns true if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Deep-copy `id` and its subtree into new, detached nodes.
    ///
    /// Copies get fresh handles and hit keys, share clip callbacks with the
    /// original, and start uncached. No events are queued for the copy.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        let attrs = node.attrs.clone();
        let (payload, is_shape) = match &node.payload {
            Payload::Container(c) => (Payload::Container(c.childless_copy()), false),
            Payload::Shape(s) => (Payload::Shape(s.clone()), true),
        };
        let children: SmallVec<[NodeId; 8]> = node.children().iter().copied().collect();

        let copy = self.insert(attrs, payload);
        if is_shape {
            self.assign_hit_key(copy);
        }
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                self.attach(copy, child_copy);
            }
        }
        Some(copy)
    }
}
