// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: node identifiers, flags, kinds, and attributes.

use alloc::string::String;
use core::fmt;

use kurbo::Affine;

use crate::error::SceneError;

/// Identifier for a node in the scene (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and hit participation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (participates in the scene pass and client rects).
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in the hit pass).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Coarse node type, as matched by bare selector clauses such as `"Group"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root container; only accepts layers.
    Stage,
    /// A container owning its own scene and hit surfaces.
    Layer,
    /// A plain grouping container.
    Group,
    /// A leaf drawable.
    Shape,
}

impl NodeKind {
    /// The type name used by selectors.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Layer => "Layer",
            Self::Group => "Group",
            Self::Shape => "Shape",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The container variants and their accepted-child policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// See [`NodeKind::Stage`].
    Stage,
    /// See [`NodeKind::Layer`].
    Layer,
    /// See [`NodeKind::Group`].
    Group,
}

impl ContainerKind {
    /// The node kind of this container variant.
    pub const fn node_kind(self) -> NodeKind {
        match self {
            Self::Stage => NodeKind::Stage,
            Self::Layer => NodeKind::Layer,
            Self::Group => NodeKind::Group,
        }
    }

    /// Check whether a child of kind `child` may be added to this container.
    ///
    /// Stages only hold layers; layers and groups hold groups and shapes.
    pub fn validate_add(self, child: NodeKind) -> Result<(), SceneError> {
        let accepted = match self {
            Self::Stage => matches!(child, NodeKind::Layer),
            Self::Layer | Self::Group => matches!(child, NodeKind::Group | NodeKind::Shape),
        };
        if accepted {
            Ok(())
        } else {
            Err(SceneError::InvalidChild {
                parent: self.node_kind(),
                child,
            })
        }
    }
}

/// Composite (blend) operation applied when painting onto a surface.
///
/// Mirrors the 2D canvas `globalCompositeOperation` set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Paint over existing content (the default).
    #[default]
    SourceOver,
    /// Keep new content only where it overlaps existing content.
    SourceIn,
    /// Keep new content only where it does not overlap.
    SourceOut,
    /// Paint new content only over existing content.
    SourceAtop,
    /// Paint new content behind existing content.
    DestinationOver,
    /// Keep existing content where it overlaps new content.
    DestinationIn,
    /// Keep existing content where it does not overlap new content.
    DestinationOut,
    /// Keep existing content only over new content.
    DestinationAtop,
    /// Add color values.
    Lighter,
    /// Show only new content.
    Copy,
    /// Exclusive or of the two.
    Xor,
    /// Multiply blend.
    Multiply,
    /// Screen blend.
    Screen,
    /// Overlay blend.
    Overlay,
    /// Darken blend.
    Darken,
    /// Lighten blend.
    Lighten,
    /// Difference blend.
    Difference,
}

/// An 8-bit-per-channel RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Encode a 24-bit hit key as an opaque color.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Each channel takes one byte of the 24-bit key."
    )]
    pub(crate) const fn from_hit_key(key: u32) -> Self {
        Self::rgb((key >> 16) as u8, (key >> 8) as u8, key as u8)
    }

    /// Decode the 24-bit hit key carried by an opaque color.
    pub(crate) const fn hit_key(self) -> Option<u32> {
        if self.a != 255 {
            return None;
        }
        Some(((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32)
    }
}

/// Per-node attributes supplied at creation.
///
/// Use struct-update syntax with [`NodeAttrs::default`] to set only what you need.
#[derive(Clone, Debug)]
pub struct NodeAttrs {
    /// Optional identifier, matched by `#id` selector clauses.
    pub id: Option<String>,
    /// Optional whitespace-separated list of names, matched by `.name` clauses.
    pub name: Option<String>,
    /// Local transform relative to the parent.
    pub local_transform: Affine,
    /// Opacity in `0.0..=1.0`, multiplied down the tree.
    pub opacity: f64,
    /// Visibility and hit participation.
    pub flags: NodeFlags,
    /// Composite operation used when this node paints into its parent.
    pub composite: CompositeOp,
}

impl Default for NodeAttrs {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            local_transform: Affine::IDENTITY,
            opacity: 1.0,
            flags: NodeFlags::default(),
            composite: CompositeOp::SourceOver,
        }
    }
}

impl NodeAttrs {
    /// Returns true if `name` is one of the whitespace-separated names.
    pub fn has_name(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|names| names.split_whitespace().any(|n| n == name))
    }
}
