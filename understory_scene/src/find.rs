// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree search.

use alloc::vec::Vec;

use kurbo::Point;

use crate::node::{Node, NodeRef, Payload};
use crate::scene::Scene;
use crate::selector::Selector;
use crate::surface::Surface;
use crate::types::NodeId;

impl<S: Surface> Scene<S> {
    /// Walk the descendants of `id` in pre-order, calling `f` on each.
    ///
    /// When `f` returns `true` the walk stops and `true` is returned.
    pub(crate) fn descendants(
        &self,
        id: NodeId,
        f: &mut dyn FnMut(NodeId, &Node) -> bool,
    ) -> bool {
        for &child in self.children_of(id) {
            let node = self.node(child);
            if f(child, node) {
                return true;
            }
            if !node.children().is_empty() && self.descendants(child, f) {
                return true;
            }
        }
        false
    }

    /// All descendants of `id` matching `selector`, in pre-order.
    ///
    /// `id` itself is never part of the result.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use understory_scene::{NodeAttrs, Scene};
    ///
    /// let mut scene = Scene::new();
    /// let layer = scene.create_layer(NodeAttrs::default());
    /// let a = scene.create_group(NodeAttrs { id: Some("foo".into()), ..NodeAttrs::default() });
    /// let b = scene.create_group(NodeAttrs { name: Some("bar".into()), ..NodeAttrs::default() });
    /// scene.add(layer, &[a]).unwrap().add(a, &[b]).unwrap();
    ///
    /// assert_eq!(scene.find(layer, "#foo, .bar"), vec![a, b]);
    /// assert_eq!(scene.find_one(layer, ".bar"), Some(b));
    /// ```
    pub fn find<'a>(&self, id: NodeId, selector: impl Into<Selector<'a>>) -> Vec<NodeId> {
        let selector = selector.into();
        let mut found = Vec::new();
        self.descendants(id, &mut |child, node| {
            if selector.matches(NodeRef::new(child, node)) {
                found.push(child);
            }
            false
        });
        found
    }

    /// The first descendant of `id` matching `selector`, in pre-order.
    ///
    /// The walk stops at the first match.
    pub fn find_one<'a>(&self, id: NodeId, selector: impl Into<Selector<'a>>) -> Option<NodeId> {
        let selector = selector.into();
        let mut found = None;
        self.descendants(id, &mut |child, node| {
            if selector.matches(NodeRef::new(child, node)) {
                found = Some(child);
                return true;
            }
            false
        });
        found
    }

    /// Every visible descendant shape of `id` whose geometry contains the
    /// world-space `point`, in pre-order.
    ///
    /// This tests geometry directly and ignores clips and caches; use
    /// [`Scene::get_intersection`] for the topmost shape as drawn.
    pub fn get_all_intersections(&self, id: NodeId, point: Point) -> Vec<NodeId> {
        let mut hits = Vec::new();
        self.descendants(id, &mut |child, node| {
            if let Payload::Shape(shape) = &node.payload
                && self.is_visible(child)
                && let Some(world) = self.absolute_transform(child, None)
                && world.determinant() != 0.0
                && shape.hit_test_local(world.inverse() * point).is_some()
            {
                hits.push(child);
            }
            false
        });
        hits
    }
}
