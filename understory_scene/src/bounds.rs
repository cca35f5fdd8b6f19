// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client rects: the axis-aligned box enclosing a node's visible content.

use kurbo::{Affine, Rect};

use crate::node::Payload;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::types::{NodeFlags, NodeId};
use crate::util::{is_degenerate, transform_rect_bbox};

/// Options for [`Scene::client_rect`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientRectConfig {
    /// Return the rect in the node's local space.
    pub skip_transform: bool,
    /// Ignore shape shadows.
    pub skip_shadow: bool,
    /// Ignore shape strokes.
    pub skip_stroke: bool,
    /// Express the rect in this node's space instead of world space.
    pub relative_to: Option<NodeId>,
}

impl<S: Surface> Scene<S> {
    /// Smallest axis-aligned rect enclosing the visible content of `id`.
    ///
    /// For containers, invisible children and empty subtrees are ignored; a
    /// container with no visible shape reports [`Rect::ZERO`]. Rotated or
    /// skewed results are conservative. Returns `None` for stale ids.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use kurbo::{Affine, Rect, Vec2};
    /// use understory_scene::{ClientRectConfig, Geometry, NodeAttrs, Rgba8, Scene, ShapeData};
    ///
    /// let mut scene = Scene::new();
    /// let group = scene.create_group(NodeAttrs {
    ///     local_transform: Affine::translate(Vec2::new(100.0, 0.0)),
    ///     ..NodeAttrs::default()
    /// });
    /// let rect = scene.create_shape(
    ///     NodeAttrs::default(),
    ///     ShapeData::filled(Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Rgba8::BLACK),
    /// );
    /// scene.add(group, &[rect]).unwrap();
    ///
    /// let world = scene.client_rect(group, &ClientRectConfig::default());
    /// assert_eq!(world, Some(Rect::new(100.0, 0.0, 110.0, 10.0)));
    ///
    /// let local = ClientRectConfig { skip_transform: true, ..ClientRectConfig::default() };
    /// assert_eq!(scene.client_rect(group, &local), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    /// ```
    pub fn client_rect(&self, id: NodeId, config: &ClientRectConfig) -> Option<Rect> {
        let node = self.get(id)?;
        let local = match &node.payload {
            Payload::Shape(shape) => shape.painted_rect(config.skip_stroke, config.skip_shadow),
            Payload::Container(_) => {
                let rect = self.container_rect(id, config);
                if is_degenerate(rect) {
                    // Empty results are not moved into the target frame.
                    return Some(Rect::ZERO);
                }
                rect
            }
        };
        if config.skip_transform {
            return Some(local);
        }
        Some(transform_rect_bbox(
            self.transform_to(id, config.relative_to),
            local,
        ))
    }

    /// Union of the visible children's rects in the container's own space.
    fn container_rect(&self, id: NodeId, config: &ClientRectConfig) -> Rect {
        let child_config = ClientRectConfig {
            skip_transform: false,
            relative_to: Some(id),
            ..*config
        };
        let mut bounds: Option<Rect> = None;
        for &child in self.children_of(id) {
            if !self.node(child).is_visible_flag() {
                continue;
            }
            let Some(rect) = self.client_rect(child, &child_config) else {
                continue;
            };
            if is_degenerate(rect) {
                continue;
            }
            bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
        }

        // Accumulated bounds only count when some shape is actually shown
        // with this container as the visibility root.
        let has_visible_shape = self.descendants(id, &mut |shape, node| {
            matches!(node.payload, Payload::Shape(_))
                && self.flag_within(shape, Some(id), NodeFlags::VISIBLE)
        });
        match bounds {
            Some(rect) if has_visible_shape => rect,
            _ => Rect::ZERO,
        }
    }

    /// Transform from `id`'s space into `target`'s space (world when `None`).
    fn transform_to(&self, id: NodeId, target: Option<NodeId>) -> Affine {
        let Some(target) = target else {
            return self.absolute_transform(id, None).unwrap_or(Affine::IDENTITY);
        };
        if target == id || self.is_ancestor_of(target, id) {
            return self
                .absolute_transform(id, Some(target))
                .unwrap_or(Affine::IDENTITY);
        }
        // Unrelated frame: go through world space.
        let Some(target_world) = self.absolute_transform(target, None) else {
            log::debug!("client rect relative to stale {target:?}; using world space");
            return self.absolute_transform(id, None).unwrap_or(Affine::IDENTITY);
        };
        let world = self.absolute_transform(id, None).unwrap_or(Affine::IDENTITY);
        target_world.inverse() * world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    use crate::shape::{Geometry, ShapeData, Stroke};
    use crate::types::{NodeAttrs, Rgba8};

    fn rect_shape(scene: &mut Scene, rect: Rect, visible: bool) -> NodeId {
        let id = scene.create_shape(
            NodeAttrs::default(),
            ShapeData::filled(Geometry::Rect(rect), Rgba8::BLACK),
        );
        scene.set_visible(id, visible);
        id
    }

    #[test]
    fn invisible_children_are_ignored() {
        let mut scene = Scene::new();
        let group = scene.create_group(NodeAttrs::default());
        let a = rect_shape(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), true);
        let b = rect_shape(&mut scene, Rect::new(5.0, 5.0, 15.0, 15.0), false);
        scene.add(group, &[a, b]).unwrap();

        assert_eq!(
            scene.client_rect(group, &ClientRectConfig::default()),
            Some(Rect::new(0.0, 0.0, 10.0, 10.0))
        );
    }

    #[test]
    fn empty_and_all_invisible_containers_are_zero() {
        let mut scene = Scene::new();
        let empty = scene.create_group(NodeAttrs {
            local_transform: Affine::translate(Vec2::new(50.0, 50.0)),
            ..NodeAttrs::default()
        });
        assert_eq!(
            scene.client_rect(empty, &ClientRectConfig::default()),
            Some(Rect::ZERO)
        );

        let hidden = scene.create_group(NodeAttrs::default());
        let a = rect_shape(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), false);
        let b = rect_shape(&mut scene, Rect::new(20.0, 0.0, 30.0, 10.0), false);
        scene.add(hidden, &[a, b]).unwrap();
        assert_eq!(
            scene.client_rect(hidden, &ClientRectConfig::default()),
            Some(Rect::ZERO)
        );
    }

    #[test]
    fn nested_invisible_container_hides_deep_leaves() {
        let mut scene = Scene::new();
        let outer = scene.create_group(NodeAttrs::default());
        let hidden = scene.create_group(NodeAttrs::default());
        let inner = scene.create_group(NodeAttrs::default());
        let deep = rect_shape(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), true);
        scene
            .add(outer, &[hidden])
            .unwrap()
            .add(hidden, &[inner])
            .unwrap()
            .add(inner, &[deep])
            .unwrap();
        scene.set_visible(hidden, false);
        assert_eq!(
            scene.client_rect(outer, &ClientRectConfig::default()),
            Some(Rect::ZERO)
        );

        // A visible sibling restores real bounds; the hidden branch still
        // contributes nothing.
        let sibling = rect_shape(&mut scene, Rect::new(100.0, 100.0, 110.0, 120.0), true);
        scene.add(outer, &[sibling]).unwrap();
        assert_eq!(
            scene.client_rect(outer, &ClientRectConfig::default()),
            Some(Rect::new(100.0, 100.0, 110.0, 120.0))
        );

        scene.set_visible(hidden, true);
        assert_eq!(
            scene.client_rect(outer, &ClientRectConfig::default()),
            Some(Rect::new(0.0, 0.0, 110.0, 120.0))
        );
    }

    #[test]
    fn nested_transforms_and_relative_frames() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs {
            local_transform: Affine::translate(Vec2::new(1000.0, 0.0)),
            ..NodeAttrs::default()
        });
        let group = scene.create_group(NodeAttrs {
            local_transform: Affine::scale(2.0),
            ..NodeAttrs::default()
        });
        let shape = rect_shape(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), true);
        scene.set_position(shape, kurbo::Point::new(5.0, 0.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();

        assert_eq!(
            scene.client_rect(group, &ClientRectConfig::default()),
            Some(Rect::new(1010.0, 0.0, 1030.0, 20.0))
        );
        let in_layer = ClientRectConfig {
            relative_to: Some(layer),
            ..ClientRectConfig::default()
        };
        assert_eq!(
            scene.client_rect(group, &in_layer),
            Some(Rect::new(10.0, 0.0, 30.0, 20.0))
        );
        let local = ClientRectConfig {
            skip_transform: true,
            ..ClientRectConfig::default()
        };
        assert_eq!(
            scene.client_rect(group, &local),
            Some(Rect::new(5.0, 0.0, 15.0, 10.0))
        );

        // A frame outside the ancestor chain goes through world space.
        let other = scene.create_group(NodeAttrs {
            local_transform: Affine::translate(Vec2::new(1000.0, 0.0)),
            ..NodeAttrs::default()
        });
        let unrelated = ClientRectConfig {
            relative_to: Some(other),
            ..ClientRectConfig::default()
        };
        assert_eq!(
            scene.client_rect(group, &unrelated),
            Some(Rect::new(10.0, 0.0, 30.0, 20.0))
        );
    }

    #[test]
    fn stroke_flags_propagate_to_children() {
        let mut scene = Scene::new();
        let group = scene.create_group(NodeAttrs::default());
        let mut data = ShapeData::filled(Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Rgba8::BLACK);
        data.style.stroke = Some(Stroke {
            color: Rgba8::BLACK,
            width: 2.0,
        });
        let shape = scene.create_shape(NodeAttrs::default(), data);
        scene.add(group, &[shape]).unwrap();

        assert_eq!(
            scene.client_rect(group, &ClientRectConfig::default()),
            Some(Rect::new(-1.0, -1.0, 11.0, 11.0))
        );
        let no_stroke = ClientRectConfig {
            skip_stroke: true,
            ..ClientRectConfig::default()
        };
        assert_eq!(
            scene.client_rect(group, &no_stroke),
            Some(Rect::new(0.0, 0.0, 10.0, 10.0))
        );
    }

    #[test]
    fn stale_ids_have_no_rect() {
        let mut scene = Scene::new();
        let group = scene.create_group(NodeAttrs::default());
        scene.destroy(group).unwrap();
        assert_eq!(scene.client_rect(group, &ClientRectConfig::default()), None);
    }
}
