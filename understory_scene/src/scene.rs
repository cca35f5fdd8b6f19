// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node arena: creation, liveness, attributes, and derived world values.

use alloc::vec::Vec;
use core::cell::{Ref, RefCell};

use hashbrown::{HashMap, HashSet};
use kurbo::{Affine, Point};
use smallvec::SmallVec;

use crate::error::SceneError;
use crate::events::SceneEvent;
use crate::node::{ContainerData, MemoAttr, Node, NodeRef, Payload};
use crate::shape::ShapeData;
use crate::surface::{Recorder, Surface};
use crate::types::{CompositeOp, ContainerKind, NodeAttrs, NodeFlags, NodeId, NodeKind};

/// Largest key that fits in the 24 color bits of a hit surface.
const MAX_HIT_KEY: u32 = 0x00ff_ffff;

/// The scene and hit surfaces owned by a layer.
#[derive(Clone, Debug, Default)]
pub struct LayerSurfaces<S> {
    /// Destination of the scene pass.
    pub scene: S,
    /// Destination of the hit pass.
    pub hit: S,
}

/// A retained-mode scene graph.
///
/// Nodes live in a generational arena and are addressed by [`NodeId`]. A
/// container's child list is the only ownership record; each child keeps a
/// non-owning parent handle and its index in that list.
///
/// The type parameter `S` is the surface type owned by layers. It defaults
/// to [`Recorder`], so most callers can use [`Scene`] without naming it.
/// Explicit surfaces passed to [`Scene::draw_scene`] and [`Scene::draw_hit`]
/// can be any [`Surface`].
///
/// ## Example
///
/// ```rust
/// use kurbo::Rect;
/// use understory_scene::{Geometry, NodeAttrs, Rgba8, Scene, ShapeData};
///
/// let mut scene = Scene::new();
/// let layer = scene.create_layer(NodeAttrs::default());
/// let group = scene.create_group(NodeAttrs::default());
/// let rect = scene.create_shape(
///     NodeAttrs::default(),
///     ShapeData::filled(Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Rgba8::BLACK),
/// );
/// scene.add(layer, &[group]).unwrap().add(group, &[rect]).unwrap();
///
/// assert_eq!(scene.children_of(group), &[rect]);
/// assert_eq!(scene.index_of(rect), Some(0));
/// assert!(scene.is_draw_pending(layer));
/// ```
pub struct Scene<S: Surface = Recorder> {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    events: Vec<SceneEvent>,
    pending_draws: HashSet<NodeId>,
    hit_keys: HashMap<u32, NodeId>,
    next_hit_key: u32,
    surfaces: HashMap<NodeId, RefCell<LayerSurfaces<S>>>,
}

impl<S: Surface> core::fmt::Debug for Scene<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("pending_draws", &self.pending_draws.len())
            .field("queued_events", &self.events.len())
            .field("layers_with_surfaces", &self.surfaces.len())
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Default for Scene<S> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            events: Vec::new(),
            pending_draws: HashSet::new(),
            hit_keys: HashMap::new(),
            next_hit_key: 1,
            surfaces: HashMap::new(),
        }
    }
}

impl Scene {
    /// Create an empty scene whose layers own [`Recorder`] surfaces.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Surface> Scene<S> {
    /// Create a detached stage.
    pub fn create_stage(&mut self, attrs: NodeAttrs) -> NodeId {
        self.insert(attrs, Payload::Container(ContainerData::new(ContainerKind::Stage)))
    }

    /// Create a detached layer.
    pub fn create_layer(&mut self, attrs: NodeAttrs) -> NodeId {
        self.insert(attrs, Payload::Container(ContainerData::new(ContainerKind::Layer)))
    }

    /// Create a detached group.
    pub fn create_group(&mut self, attrs: NodeAttrs) -> NodeId {
        self.insert(attrs, Payload::Container(ContainerData::new(ContainerKind::Group)))
    }

    /// Create a detached shape and assign it a hit key.
    pub fn create_shape(&mut self, attrs: NodeAttrs, shape: ShapeData) -> NodeId {
        let id = self.insert(attrs, Payload::Shape(shape));
        self.assign_hit_key(id);
        id
    }

    pub(crate) fn insert(&mut self, attrs: NodeAttrs, payload: Payload) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, attrs, payload));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, attrs, payload)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Free a slot. The caller has already unlinked the node.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.get_mut(id.idx())?.take()?;
        if let Some(key) = node.hit_key {
            self.hit_keys.remove(&key);
        }
        self.pending_draws.remove(&id);
        self.surfaces.remove(&id);
        self.free_list.push(id.idx());
        Some(node)
    }

    pub(crate) fn assign_hit_key(&mut self, id: NodeId) {
        // Keys are painted into 24 color bits; skip keys still in use after wrap-around.
        for _ in 0..MAX_HIT_KEY {
            let key = self.next_hit_key;
            self.next_hit_key = if key >= MAX_HIT_KEY { 1 } else { key + 1 };
            if !self.hit_keys.contains_key(&key) {
                self.hit_keys.insert(key, id);
                self.node_mut(id).hit_key = Some(key);
                return;
            }
        }
        log::warn!("hit keys exhausted; {id:?} will not be pickable");
    }

    /// The live shape painted with `key` by the hit pass.
    pub(crate) fn shape_for_hit_key(&self, key: u32) -> Option<NodeId> {
        self.hit_keys
            .get(&key)
            .copied()
            .filter(|id| self.is_alive(*id))
    }

    // --- liveness and lookup ---

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    pub(crate) fn live(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.get(id).ok_or(SceneError::StaleNode(id))
    }

    pub(crate) fn container_data_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut ContainerData, SceneError> {
        self.node_opt_mut(id)
            .ok_or(SceneError::StaleNode(id))?
            .container_mut()
            .ok_or(SceneError::NotAContainer(id))
    }

    /// A read-only view of a live node.
    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|n| NodeRef::new(id, n))
    }

    /// The kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Returns the parent of a node if live, or `None` for detached nodes or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Returns the position of an attached node among its siblings.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.get(id).filter(|n| n.parent.is_some()).map(|n| n.index)
    }

    /// Get the children of a node, or empty slice if node is stale or a shape.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => node.children(),
            None => &[],
        }
    }

    /// The nearest layer at or above `id`.
    pub fn layer_of(&self, id: NodeId) -> Option<NodeId> {
        self.nearest_of_kind(id, NodeKind::Layer)
    }

    /// The stage at or above `id`.
    pub fn stage_of(&self, id: NodeId) -> Option<NodeId> {
        self.nearest_of_kind(id, NodeKind::Stage)
    }

    fn nearest_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur)?;
            if node.kind() == kind {
                return Some(cur);
            }
            current = node.parent;
        }
        None
    }

    /// `id` followed by its ancestors, stopping before `top` (or at the root).
    ///
    /// Empty when `id` is `top`.
    pub(crate) fn chain_below(&self, id: NodeId, top: Option<NodeId>) -> SmallVec<[NodeId; 16]> {
        let mut chain = SmallVec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if Some(cur) == top {
                break;
            }
            chain.push(cur);
            current = self.node(cur).parent;
        }
        chain
    }

    // --- attributes ---

    /// Update the local transform.
    pub fn set_local_transform(&mut self, id: NodeId, tf: Affine) {
        if let Some(n) = self.node_opt_mut(id)
            && n.attrs.local_transform != tf
        {
            n.attrs.local_transform = tf;
            self.clear_self_and_descendant_cache(id, Some(MemoAttr::Transform));
            self.request_draw(id);
        }
    }

    /// Replace the translation of the local transform.
    pub fn set_position(&mut self, id: NodeId, position: Point) {
        if let Some(n) = self.get(id) {
            let tf = n.attrs.local_transform.with_translation(position.to_vec2());
            self.set_local_transform(id, tf);
        }
    }

    /// Update the opacity.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f64) {
        if let Some(n) = self.node_opt_mut(id)
            && n.attrs.opacity != opacity
        {
            n.attrs.opacity = opacity;
            self.clear_self_and_descendant_cache(id, Some(MemoAttr::Opacity));
            self.request_draw(id);
        }
    }

    /// Show or hide a node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.set_flag(id, NodeFlags::VISIBLE, visible, MemoAttr::Visible);
    }

    /// Include or exclude a node from the hit pass.
    pub fn set_pickable(&mut self, id: NodeId, pickable: bool) {
        self.set_flag(id, NodeFlags::PICKABLE, pickable, MemoAttr::Pickable);
    }

    fn set_flag(&mut self, id: NodeId, flag: NodeFlags, on: bool, attr: MemoAttr) {
        if let Some(n) = self.node_opt_mut(id)
            && n.attrs.flags.contains(flag) != on
        {
            n.attrs.flags.set(flag, on);
            self.clear_self_and_descendant_cache(id, Some(attr));
            self.request_draw(id);
        }
    }

    /// Update the `id` attribute.
    pub fn set_id(&mut self, id: NodeId, value: Option<&str>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.attrs.id = value.map(Into::into);
        }
    }

    /// Update the `name` attribute.
    pub fn set_name(&mut self, id: NodeId, value: Option<&str>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.attrs.name = value.map(Into::into);
        }
    }

    /// Update the composite operation.
    pub fn set_composite_op(&mut self, id: NodeId, op: CompositeOp) {
        if let Some(n) = self.node_opt_mut(id)
            && n.attrs.composite != op
        {
            n.attrs.composite = op;
            self.request_draw(id);
        }
    }

    /// Replace the geometry and style of a shape.
    pub fn set_shape(&mut self, id: NodeId, shape: ShapeData) -> Result<(), SceneError> {
        let node = self.node_opt_mut(id).ok_or(SceneError::StaleNode(id))?;
        let Payload::Shape(current) = &mut node.payload else {
            return Err(SceneError::NotAShape(id));
        };
        *current = shape;
        self.request_draw(id);
        Ok(())
    }

    /// Choose whether a layer clears its surface before drawing.
    pub fn set_clear_before_draw(&mut self, id: NodeId, clear: bool) -> Result<(), SceneError> {
        let container = self.container_data_mut(id)?;
        if container.kind != ContainerKind::Layer {
            return Err(SceneError::NotALayer(id));
        }
        container.clear_before_draw = clear;
        Ok(())
    }

    // --- derived values ---

    /// Transform from `id`'s local space into `top`'s local space.
    ///
    /// With `top = None` this is the world transform. With `top = Some(id)`
    /// it is the identity: the node is treated as the root.
    pub fn absolute_transform(&self, id: NodeId, top: Option<NodeId>) -> Option<Affine> {
        self.get(id)?;
        Some(
            self.chain_below(id, top)
                .iter()
                .rev()
                .fold(Affine::IDENTITY, |acc, n| {
                    acc * self.node(*n).attrs.local_transform
                }),
        )
    }

    /// Product of opacities from `id` up to, but excluding, `top`.
    pub fn absolute_opacity(&self, id: NodeId, top: Option<NodeId>) -> Option<f64> {
        self.get(id)?;
        Some(
            self.chain_below(id, top)
                .iter()
                .map(|n| self.node(*n).attrs.opacity)
                .product(),
        )
    }

    /// Returns true if the node and every ancestor are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.flag_within(id, None, NodeFlags::VISIBLE)
    }

    /// Returns true if the node and every ancestor are pickable.
    pub fn is_pickable(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.flag_within(id, None, NodeFlags::PICKABLE)
    }

    /// Returns true if `flag` is set on `id` and on every ancestor strictly
    /// below `top`. Always true when `id` is `top`.
    pub(crate) fn flag_within(&self, id: NodeId, top: Option<NodeId>, flag: NodeFlags) -> bool {
        self.chain_below(id, top)
            .iter()
            .all(|n| self.node(*n).attrs.flags.contains(flag))
    }

    /// Visibility used by the draw path: memoized for world draws.
    pub(crate) fn visible_within(&self, id: NodeId, top: Option<NodeId>) -> bool {
        match top {
            None => self.memo_visible(id),
            Some(_) => self.flag_within(id, top, NodeFlags::VISIBLE),
        }
    }

    /// Returns true if the node takes part in a hit pass rooted at `top`.
    pub(crate) fn should_draw_hit(&self, id: NodeId, top: Option<NodeId>) -> bool {
        match top {
            Some(_) => {
                self.flag_within(id, top, NodeFlags::VISIBLE)
                    && self.flag_within(id, top, NodeFlags::PICKABLE)
            }
            None => self.memo_visible(id) && self.memo_pickable(id),
        }
    }

    /// World transform through the memo cells.
    pub(crate) fn memo_transform(&self, id: NodeId) -> Affine {
        let node = self.node(id);
        if let Some(tf) = node.memo.transform.get() {
            return tf;
        }
        let parent = node.parent.map_or(Affine::IDENTITY, |p| self.memo_transform(p));
        let tf = parent * node.attrs.local_transform;
        node.memo.transform.set(Some(tf));
        tf
    }

    /// World opacity through the memo cells.
    pub(crate) fn memo_opacity(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        if let Some(o) = node.memo.opacity.get() {
            return o;
        }
        let o = node.attrs.opacity * node.parent.map_or(1.0, |p| self.memo_opacity(p));
        node.memo.opacity.set(Some(o));
        o
    }

    /// World visibility through the memo cells.
    pub(crate) fn memo_visible(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if let Some(v) = node.memo.visible.get() {
            return v;
        }
        let v = node.is_visible_flag() && node.parent.is_none_or(|p| self.memo_visible(p));
        node.memo.visible.set(Some(v));
        v
    }

    /// World pickability through the memo cells.
    pub(crate) fn memo_pickable(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if let Some(v) = node.memo.pickable.get() {
            return v;
        }
        let v = node.is_pickable_flag() && node.parent.is_none_or(|p| self.memo_pickable(p));
        node.memo.pickable.set(Some(v));
        v
    }

    /// Transform used by the draw path: memoized for world draws.
    pub(crate) fn draw_transform(&self, id: NodeId, top: Option<NodeId>) -> Affine {
        match top {
            None => self.memo_transform(id),
            Some(_) => self
                .absolute_transform(id, top)
                .unwrap_or(Affine::IDENTITY),
        }
    }

    /// Opacity used by the draw path: memoized for world draws.
    pub(crate) fn draw_opacity(&self, id: NodeId, top: Option<NodeId>) -> f64 {
        match top {
            None => self.memo_opacity(id),
            Some(_) => self.absolute_opacity(id, top).unwrap_or(1.0),
        }
    }

    // --- events and redraw requests ---

    pub(crate) fn emit(&mut self, event: SceneEvent) {
        log::trace!("{event:?}");
        self.events.push(event);
    }

    /// Take all queued structural events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        core::mem::take(&mut self.events)
    }

    /// Mark the layer that displays `id` as needing a redraw.
    ///
    /// A node under a stage but outside any layer marks every layer of that
    /// stage. Detached nodes mark nothing.
    pub(crate) fn request_draw(&mut self, id: NodeId) {
        if let Some(layer) = self.layer_of(id) {
            self.pending_draws.insert(layer);
        } else if let Some(stage) = self.stage_of(id) {
            let layers: SmallVec<[NodeId; 8]> = self.children_of(stage).iter().copied().collect();
            self.pending_draws.extend(layers);
        }
    }

    /// Returns true if `layer` has an outstanding redraw request.
    pub fn is_draw_pending(&self, layer: NodeId) -> bool {
        self.pending_draws.contains(&layer)
    }

    /// Take the set of layers with outstanding redraw requests.
    pub fn take_pending_draws(&mut self) -> Vec<NodeId> {
        self.pending_draws.drain().collect()
    }

    // --- layer surfaces ---

    /// Give a layer its own scene and hit surfaces.
    ///
    /// Draw calls on the layer or its descendants that pass no explicit surface
    /// draw into these.
    pub fn attach_surfaces(&mut self, layer: NodeId, scene: S, hit: S) -> Result<(), SceneError> {
        if self.live(layer)?.kind() != NodeKind::Layer {
            return Err(SceneError::NotALayer(layer));
        }
        self.surfaces
            .insert(layer, RefCell::new(LayerSurfaces { scene, hit }));
        self.request_draw(layer);
        Ok(())
    }

    /// Take a layer's surfaces back.
    pub fn detach_surfaces(&mut self, layer: NodeId) -> Option<LayerSurfaces<S>> {
        self.surfaces.remove(&layer).map(RefCell::into_inner)
    }

    /// Borrow a layer's surfaces.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a draw of the same layer.
    pub fn layer_surfaces(&self, layer: NodeId) -> Option<Ref<'_, LayerSurfaces<S>>> {
        self.surfaces.get(&layer).map(RefCell::borrow)
    }

    pub(crate) fn layer_surface_cell(&self, layer: NodeId) -> Option<&RefCell<LayerSurfaces<S>>> {
        self.surfaces.get(&layer)
    }
}
