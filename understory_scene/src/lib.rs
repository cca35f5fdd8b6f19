// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scene: a Kurbo-native retained-mode 2D scene graph.
//!
//! Understory Scene is the composite-node layer of a canvas-style renderer.
//!
//! - Represents a tree of stages, layers, groups, and leaf shapes with local transforms,
//!   opacity, visibility, and composite operations.
//! - Keeps parent/child/index links consistent under adds, moves, removals, and destruction.
//! - Finds nodes by `#id`, `.name`, or type selectors, or by predicate.
//! - Draws a scene pass and a hit pass through a [`Surface`] trait, composing container clips
//!   and composite operations across nested transforms.
//! - Caches subtrees as replayable bitmaps and aggregates client rects.
//!
//! ## Node kinds
//!
//! A [`Stage`](NodeKind::Stage) holds layers. A [`Layer`](NodeKind::Layer) owns a scene surface
//! and a hit surface and holds groups and shapes. A [`Group`](NodeKind::Group) holds groups and
//! shapes. Shapes are leaves. Adding a node to a container that does not accept its kind fails
//! with [`SceneError::InvalidChild`] and changes nothing.
//!
//! ## Drawing
//!
//! [`Scene::draw_scene`] and [`Scene::draw_hit`] walk a subtree. At each container the walk
//! either replays the container's cached bitmap or draws its children inside the container's
//! clip. Shapes in the hit pass are painted in a color encoding their hit key, and
//! [`Scene::get_intersection`] reads the topmost key back. Both passes draw into an explicit
//! surface or into the surfaces attached to the owning layer with [`Scene::attach_surfaces`].
//!
//! Mutations never draw. They mark the affected layer as pending; a frame driver calls
//! [`Scene::draw_pending`] when it is ready to repaint.
//!
//! [`Recorder`] is the built-in surface. It records each call as a [`DrawCommand`], producing a
//! [`DisplayList`] that can be replayed onto another surface or picked at a point. Cached
//! [`Bitmap`]s are display lists as well.
//!
//! ## Caching
//!
//! [`Scene::cache`] records a node's scene and hit output. A cached node is opaque: changing
//! an ancestor only moves the bitmap, and derived values below it are left alone until the
//! cache is released with [`Scene::clear_cache`].
//!
//! ## API overview
//!
//! - [`Scene`]: the node arena and every operation.
//! - [`NodeId`]: generational handle of a node; stale handles are detected.
//! - [`NodeAttrs`]: per-node attributes supplied at creation.
//! - [`ShapeData`], [`Geometry`], [`ShapeStyle`]: leaf content.
//! - [`Selector`]: string pattern or predicate for [`Scene::find`] and [`Scene::find_one`].
//! - [`ClientRectConfig`]: options for [`Scene::client_rect`].
//! - [`CacheConfig`]: options for [`Scene::cache`].
//! - [`SceneEvent`]: structural notifications, drained with [`Scene::drain_events`].
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_scene::{Geometry, NodeAttrs, Recorder, Rgba8, Scene, ShapeData};
//!
//! let mut scene = Scene::new();
//! let stage = scene.create_stage(NodeAttrs::default());
//! let layer = scene.create_layer(NodeAttrs::default());
//! let button = scene.create_shape(
//!     NodeAttrs { id: Some("ok".into()), ..NodeAttrs::default() },
//!     ShapeData::filled(Geometry::Rect(Rect::new(10.0, 10.0, 90.0, 40.0)), Rgba8::rgb(0, 128, 0)),
//! );
//! scene.add(stage, &[layer]).unwrap().add(layer, &[button]).unwrap();
//! scene.attach_surfaces(layer, Recorder::new(), Recorder::new()).unwrap();
//!
//! scene.draw_pending();
//! assert!(!scene.layer_surfaces(layer).unwrap().scene.commands().is_empty());
//!
//! assert_eq!(scene.find_one(stage, "#ok"), Some(button));
//! assert_eq!(scene.get_intersection(stage, Point::new(50.0, 20.0)), Some(button));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bounds;
mod cache;
mod clip;
mod container;
mod error;
mod events;
mod find;
mod node;
mod render;
mod scene;
mod selector;
mod shape;
mod surface;
mod types;
mod util;

pub use bounds::ClientRectConfig;
pub use cache::{CacheConfig, CachedBitmaps};
pub use clip::{ClipFn, ClipRect};
pub use error::SceneError;
pub use events::SceneEvent;
pub use node::NodeRef;
pub use scene::{LayerSurfaces, Scene};
pub use selector::{Pattern, Selector};
pub use shape::{Geometry, HitKind, Shadow, ShapeData, ShapeStyle, Stroke};
pub use surface::{Bitmap, DisplayList, DrawCommand, Recorder, Surface};
pub use types::{CompositeOp, ContainerKind, NodeAttrs, NodeFlags, NodeId, NodeKind, Rgba8};
