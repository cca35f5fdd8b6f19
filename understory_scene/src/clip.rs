// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container clipping: a local clip rectangle or a clip path callback.

use alloc::rc::Rc;
use core::fmt;

use kurbo::Rect;

use crate::error::SceneError;
use crate::node::NodeRef;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::types::NodeId;

/// Clip rectangle in the container's local space.
///
/// Clipping is active only when both `width` and `height` are non-zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width; zero disables clipping.
    pub width: f64,
    /// Height; zero disables clipping.
    pub height: f64,
}

impl ClipRect {
    /// Build a clip rectangle from its four components.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if this rectangle clips.
    pub fn is_active(&self) -> bool {
        self.width != 0.0 && self.height != 0.0
    }

    /// The rectangle as a Kurbo [`Rect`].
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// A clip path callback.
///
/// It receives the surface with the container's transform applied and a path
/// already begun; it should add path segments and nothing else. The scene
/// commits the clip afterwards.
#[derive(Clone)]
pub struct ClipFn(Rc<dyn Fn(&mut dyn Surface, NodeRef<'_>)>);

impl ClipFn {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&mut dyn Surface, NodeRef<'_>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub(crate) fn call(&self, surface: &mut dyn Surface, node: NodeRef<'_>) {
        (self.0)(surface, node);
    }
}

impl fmt::Debug for ClipFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClipFn").finish_non_exhaustive()
    }
}

impl<S: Surface> Scene<S> {
    /// The clip rectangle of a container, or `None` for shapes and stale ids.
    pub fn clip(&self, id: NodeId) -> Option<ClipRect> {
        self.get(id).and_then(|n| n.container()).map(|c| c.clip)
    }

    /// Replace the clip rectangle of a container.
    pub fn set_clip(&mut self, id: NodeId, clip: ClipRect) -> Result<(), SceneError> {
        self.update_clip(id, |c| *c = clip)
    }

    /// Set the left edge of the clip rectangle.
    pub fn set_clip_x(&mut self, id: NodeId, x: f64) -> Result<(), SceneError> {
        self.update_clip(id, |c| c.x = x)
    }

    /// Set the top edge of the clip rectangle.
    pub fn set_clip_y(&mut self, id: NodeId, y: f64) -> Result<(), SceneError> {
        self.update_clip(id, |c| c.y = y)
    }

    /// Set the clip width; zero disables clipping.
    pub fn set_clip_width(&mut self, id: NodeId, width: f64) -> Result<(), SceneError> {
        self.update_clip(id, |c| c.width = width)
    }

    /// Set the clip height; zero disables clipping.
    pub fn set_clip_height(&mut self, id: NodeId, height: f64) -> Result<(), SceneError> {
        self.update_clip(id, |c| c.height = height)
    }

    /// The clip callback of a container.
    pub fn clip_fn(&self, id: NodeId) -> Option<&ClipFn> {
        self.get(id)
            .and_then(|n| n.container())
            .and_then(|c| c.clip_fn.as_ref())
    }

    /// Install or remove a clip callback. When present it takes precedence
    /// over the clip rectangle.
    pub fn set_clip_fn(&mut self, id: NodeId, clip_fn: Option<ClipFn>) -> Result<(), SceneError> {
        self.container_data_mut(id)?.clip_fn = clip_fn;
        self.request_draw(id);
        Ok(())
    }

    fn update_clip(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut ClipRect),
    ) -> Result<(), SceneError> {
        let container = self.container_data_mut(id)?;
        let before = container.clip;
        f(&mut container.clip);
        if container.clip != before {
            self.request_draw(id);
        }
        Ok(())
    }
}
