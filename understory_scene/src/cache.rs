// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree caching and cache invalidation.
//!
//! A cached node replays a recorded [`Bitmap`] instead of recursing into its
//! children. The bitmap is authoritative until it is released: attribute
//! changes above a cached node only move where the bitmap is placed, and
//! invalidation never descends below a cached node.

use kurbo::{Affine, Rect};

use crate::bounds::ClientRectConfig;
use crate::error::SceneError;
use crate::node::MemoAttr;
use crate::render::Pass;
use crate::scene::Scene;
use crate::surface::{Bitmap, Recorder, Surface};
use crate::types::NodeId;

/// Cache slot of a node.
#[derive(Clone, Debug, Default)]
pub(crate) enum CacheState {
    /// Draws recurse normally.
    #[default]
    Uncached,
    /// Draws replay these bitmaps.
    Cached(CachedBitmaps),
}

impl CacheState {
    pub(crate) fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub(crate) fn bitmap(&self, pass: Pass) -> Option<&Bitmap> {
        match (self, pass) {
            (Self::Cached(c), Pass::Scene) => Some(&c.scene),
            (Self::Cached(c), Pass::Hit) => Some(&c.hit),
            (Self::Uncached, _) => None,
        }
    }
}

/// The scene and hit bitmaps recorded by [`Scene::cache`].
#[derive(Clone, Debug, PartialEq)]
pub struct CachedBitmaps {
    /// Output of the scene pass.
    pub scene: Bitmap,
    /// Output of the hit pass.
    pub hit: Bitmap,
}

/// Options for [`Scene::cache`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CacheConfig {
    /// Padding added on every side of the cached area.
    pub offset: f64,
    /// Area to cache in the node's local space. Defaults to the node's
    /// untransformed client rect.
    pub rect: Option<Rect>,
}

impl<S: Surface> Scene<S> {
    /// Record the node's scene and hit output into bitmaps.
    ///
    /// Later draws of the node replay the bitmaps instead of drawing the
    /// subtree. Changes inside the subtree are not picked up until the node
    /// is cached again or [`Scene::clear_cache`] is called.
    ///
    /// Memoized world values of nodes below a cached node are not refreshed
    /// while it stays cached. [`Scene::draw_scene`], [`Scene::draw_hit`], and
    /// [`Scene::get_intersection`] started inside the subtree with no `top`
    /// read those values. Draw with an explicit `top`, or release the cache,
    /// to use current ones.
    ///
    /// Fails with [`SceneError::EmptyCache`] when the area to cache has zero
    /// width or height.
    pub fn cache(&mut self, id: NodeId, config: CacheConfig) -> Result<(), SceneError> {
        let parent = self.live(id)?.parent;
        let area = match config.rect {
            Some(rect) => rect,
            None => {
                let local = ClientRectConfig {
                    skip_transform: true,
                    relative_to: parent,
                    ..ClientRectConfig::default()
                };
                self.client_rect(id, &local).unwrap_or(Rect::ZERO)
            }
        };
        if area.width() == 0.0 || area.height() == 0.0 {
            log::warn!("cannot cache {id:?}: width or height is zero");
            return Err(SceneError::EmptyCache(id));
        }
        let area = area.inflate(config.offset, config.offset);

        self.clear_cache(id);

        let shift = Affine::translate(-area.origin().to_vec2());
        let record = |pass| {
            let mut rec = Recorder::for_cache();
            rec.transform(shift);
            self.draw_node(id, pass, &mut rec, Some(id));
            Bitmap::new(area.origin(), area.size(), rec.finish())
        };
        let bitmaps = CachedBitmaps {
            scene: record(Pass::Scene),
            hit: record(Pass::Hit),
        };
        log::debug!("cached {id:?} over {area:?}");
        self.node_mut(id).cache = CacheState::Cached(bitmaps);
        self.request_draw(id);
        Ok(())
    }

    /// Release the node's bitmaps, if any, and forget derived values in its
    /// subtree.
    pub fn clear_cache(&mut self, id: NodeId) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        let was_cached = node.cache.is_cached();
        node.cache = CacheState::Uncached;
        self.clear_self_and_descendant_cache(id, None);
        if was_cached {
            self.request_draw(id);
        }
    }

    /// Returns true if the node currently replays bitmaps.
    pub fn is_cached(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.cache.is_cached())
    }

    /// The bitmaps of a cached node.
    pub fn cached_bitmaps(&self, id: NodeId) -> Option<&CachedBitmaps> {
        match &self.get(id)?.cache {
            CacheState::Cached(bitmaps) => Some(bitmaps),
            CacheState::Uncached => None,
        }
    }

    /// Forget `attr` (or every derived value) on `id` and its descendants,
    /// without descending below a cached descendant.
    ///
    /// The cached node's own values are cleared, so its placement follows
    /// the change while its bitmap content stays as recorded.
    pub(crate) fn clear_self_and_descendant_cache(&self, id: NodeId, attr: Option<MemoAttr>) {
        let node = self.node(id);
        node.memo.clear(attr);
        if node.cache.is_cached() {
            return;
        }
        for &child in node.children() {
            self.clear_self_and_descendant_cache(child, attr);
        }
    }

    /// Drop everything a node cached under its previous parent.
    pub(crate) fn clear_caches_for_move(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if node.cache.is_cached() {
            log::trace!("releasing cache of {id:?} on reparent");
        }
        node.cache = CacheState::Uncached;
        self.clear_self_and_descendant_cache(id, None);
    }
}
