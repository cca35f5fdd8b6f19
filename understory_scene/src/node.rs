// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node slots: attributes, tree links, payloads, and memoized derived values.

use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::Affine;

use crate::cache::CacheState;
use crate::clip::{ClipFn, ClipRect};
use crate::shape::ShapeData;
use crate::types::{ContainerKind, NodeAttrs, NodeFlags, NodeId, NodeKind};

/// Derived values that can be invalidated independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MemoAttr {
    Transform,
    Opacity,
    Visible,
    Pickable,
}

/// Lazily computed world-space values, used by the draw path.
#[derive(Clone, Debug, Default)]
pub(crate) struct Memo {
    pub(crate) transform: Cell<Option<Affine>>,
    pub(crate) opacity: Cell<Option<f64>>,
    pub(crate) visible: Cell<Option<bool>>,
    pub(crate) pickable: Cell<Option<bool>>,
}

impl Memo {
    /// Forget `attr`, or every value when `None`.
    pub(crate) fn clear(&self, attr: Option<MemoAttr>) {
        match attr {
            Some(MemoAttr::Transform) => self.transform.set(None),
            Some(MemoAttr::Opacity) => self.opacity.set(None),
            Some(MemoAttr::Visible) => self.visible.set(None),
            Some(MemoAttr::Pickable) => self.pickable.set(None),
            None => {
                self.transform.set(None);
                self.opacity.set(None);
                self.visible.set(None);
                self.pickable.set(None);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ContainerData {
    pub(crate) kind: ContainerKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) clip: ClipRect,
    pub(crate) clip_fn: Option<ClipFn>,
    pub(crate) clear_before_draw: bool,
}

impl ContainerData {
    pub(crate) fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            clip: ClipRect::default(),
            clip_fn: None,
            clear_before_draw: true,
        }
    }

    /// Copy of the configuration without any children.
    pub(crate) fn childless_copy(&self) -> Self {
        Self {
            children: Vec::new(),
            clip_fn: self.clip_fn.clone(),
            ..*self
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Payload {
    Container(ContainerData),
    Shape(ShapeData),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) generation: u32,
    /// Non-owning back-reference; the parent's `children` owns the link.
    pub(crate) parent: Option<NodeId>,
    /// Position in the parent's `children`; zero when detached.
    pub(crate) index: usize,
    pub(crate) attrs: NodeAttrs,
    pub(crate) payload: Payload,
    pub(crate) memo: Memo,
    pub(crate) cache: CacheState,
    /// Key painted by the hit pass; shapes only.
    pub(crate) hit_key: Option<u32>,
}

impl Node {
    pub(crate) fn new(generation: u32, attrs: NodeAttrs, payload: Payload) -> Self {
        Self {
            generation,
            parent: None,
            index: 0,
            attrs,
            payload,
            memo: Memo::default(),
            cache: CacheState::Uncached,
            hit_key: None,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match &self.payload {
            Payload::Container(c) => c.kind.node_kind(),
            Payload::Shape(_) => NodeKind::Shape,
        }
    }

    pub(crate) fn container(&self) -> Option<&ContainerData> {
        match &self.payload {
            Payload::Container(c) => Some(c),
            Payload::Shape(_) => None,
        }
    }

    pub(crate) fn container_mut(&mut self) -> Option<&mut ContainerData> {
        match &mut self.payload {
            Payload::Container(c) => Some(c),
            Payload::Shape(_) => None,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.payload {
            Payload::Container(c) => &c.children,
            Payload::Shape(_) => &[],
        }
    }

    pub(crate) fn is_visible_flag(&self) -> bool {
        self.attrs.flags.contains(NodeFlags::VISIBLE)
    }

    pub(crate) fn is_pickable_flag(&self) -> bool {
        self.attrs.flags.contains(NodeFlags::PICKABLE)
    }
}

/// A read-only view of one node, handed to selector predicates and clip
/// functions.
#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'a> {
    handle: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(handle: NodeId, node: &'a Node) -> Self {
        Self { handle, node }
    }

    /// The node's handle.
    pub fn handle(&self) -> NodeId {
        self.handle
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&'a str> {
        self.node.attrs.id.as_deref()
    }

    /// The `name` attribute (whitespace-separated names).
    pub fn name(&self) -> Option<&'a str> {
        self.node.attrs.name.as_deref()
    }

    /// Returns true if `name` is one of the node's names.
    pub fn has_name(&self, name: &str) -> bool {
        self.node.attrs.has_name(name)
    }

    /// All attributes.
    pub fn attrs(&self) -> &'a NodeAttrs {
        &self.node.attrs
    }

    /// Node type.
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Class name: the geometry class for shapes, the type name otherwise.
    pub fn class_name(&self) -> &'static str {
        match &self.node.payload {
            Payload::Container(c) => c.kind.node_kind().type_name(),
            Payload::Shape(s) => s.geometry.class_name(),
        }
    }

    /// Parent container, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent
    }

    /// Position among the parent's children.
    pub fn index(&self) -> usize {
        self.node.index
    }

    /// Children in paint order; empty for shapes.
    pub fn children(&self) -> &'a [NodeId] {
        self.node.children()
    }

    /// Shape data, for leaves.
    pub fn shape(&self) -> Option<&'a ShapeData> {
        match &self.node.payload {
            Payload::Shape(s) => Some(s),
            Payload::Container(_) => None,
        }
    }

    /// Returns true if the node's own `VISIBLE` flag is set.
    pub fn visible(&self) -> bool {
        self.node.is_visible_flag()
    }
}
