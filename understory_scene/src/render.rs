// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene and hit passes.
//!
//! Both passes share one recursive walk. At each container the walk either
//! replays the container's cached bitmap for the pass or draws the children,
//! wrapping them in the container's clip and, for the scene pass, its
//! composite operation. The hit pass paints every shape in a color that
//! encodes the shape's hit key; [`Scene::get_intersection`] reads it back.
//!
//! `top` makes a subtree render as if it were the root: transforms,
//! opacity, and visibility are evaluated relative to it.

use kurbo::{Affine, Point};

use crate::node::{ContainerData, Node, NodeRef, Payload};
use crate::scene::Scene;
use crate::shape::ShapeData;
use crate::surface::{Bitmap, Recorder, Surface};
use crate::types::{CompositeOp, ContainerKind, NodeId, NodeKind, Rgba8};

/// Which output a draw produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    /// Visible pixels.
    Scene,
    /// Hit-key colors.
    Hit,
}

impl<S: Surface> Scene<S> {
    /// Draw the scene pass of `id`.
    ///
    /// With `surface = None` the pass goes to the scene surface of the layer
    /// containing `id`; a stage draws each of its layers that way. Nothing
    /// is drawn when no surface can be found.
    pub fn draw_scene(&self, id: NodeId, surface: Option<&mut dyn Surface>, top: Option<NodeId>) {
        self.draw(id, Pass::Scene, surface, top);
    }

    /// Draw the hit pass of `id`.
    ///
    /// Surface resolution is the same as for [`Scene::draw_scene`], using the
    /// layer's hit surface.
    pub fn draw_hit(&self, id: NodeId, surface: Option<&mut dyn Surface>, top: Option<NodeId>) {
        self.draw(id, Pass::Hit, surface, top);
    }

    fn draw(&self, id: NodeId, pass: Pass, surface: Option<&mut dyn Surface>, top: Option<NodeId>) {
        let Some(node) = self.get(id) else {
            return;
        };
        if let Some(surface) = surface {
            self.draw_node(id, pass, surface, top);
            return;
        }
        if let Some(layer) = self.layer_of(id)
            && let Some(cell) = self.layer_surface_cell(layer)
        {
            match cell.try_borrow_mut() {
                Ok(mut surfaces) => {
                    let surface: &mut dyn Surface = match pass {
                        Pass::Scene => &mut surfaces.scene,
                        Pass::Hit => &mut surfaces.hit,
                    };
                    self.draw_node(id, pass, surface, top);
                }
                Err(_) => log::warn!("surfaces of {layer:?} are borrowed; skipping draw of {id:?}"),
            }
            return;
        }
        if node.kind() == NodeKind::Stage {
            for &layer in node.children() {
                self.draw(layer, pass, None, top);
            }
            return;
        }
        log::debug!("no {pass:?} surface for {id:?}; nothing drawn");
    }

    pub(crate) fn draw_node(
        &self,
        id: NodeId,
        pass: Pass,
        surface: &mut dyn Surface,
        top: Option<NodeId>,
    ) {
        let node = self.node(id);
        match &node.payload {
            Payload::Container(container) => {
                self.draw_container(id, node, container, pass, surface, top);
            }
            Payload::Shape(shape) => self.draw_shape(id, node, shape, pass, surface, top),
        }
    }

    fn draw_container(
        &self,
        id: NodeId,
        node: &Node,
        container: &ContainerData,
        pass: Pass,
        surface: &mut dyn Surface,
        top: Option<NodeId>,
    ) {
        if container.kind == ContainerKind::Layer
            && container.clear_before_draw
            && !surface.is_cache()
        {
            surface.clear();
        }
        // Relative to `top`, so a hidden container still records its own
        // cache while hidden descendants stay out of it.
        let gate = match pass {
            Pass::Scene => self.visible_within(id, top),
            Pass::Hit => self.should_draw_hit(id, top),
        };
        if !gate {
            return;
        }
        if let Some(bitmap) = node.cache.bitmap(pass) {
            self.draw_cached(id, node, bitmap, pass, surface, top);
            return;
        }
        self.draw_children(id, node, container, pass, surface, top);
    }

    fn draw_children(
        &self,
        id: NodeId,
        node: &Node,
        container: &ContainerData,
        pass: Pass,
        surface: &mut dyn Surface,
        top: Option<NodeId>,
    ) {
        let has_clip = container.clip_fn.is_some() || container.clip.is_active();
        if has_clip {
            let tf = self.draw_transform(id, top);
            surface.save();
            surface.transform(tf);
            surface.begin_path();
            match &container.clip_fn {
                Some(clip_fn) => clip_fn.call(surface, NodeRef::new(id, node)),
                None => surface.rect(container.clip.to_rect()),
            }
            surface.clip();
            if tf.determinant() == 0.0 {
                // Nothing inside a collapsed clip can be seen.
                surface.restore();
                return;
            }
            surface.transform(tf.inverse());
        }

        let has_composition = pass == Pass::Scene
            && top != Some(id)
            && node.attrs.composite != CompositeOp::SourceOver;
        if has_composition {
            surface.save();
            surface.set_composite_op(node.attrs.composite);
        }

        for &child in &container.children {
            self.draw_node(child, pass, surface, top);
        }

        if has_composition {
            surface.restore();
        }
        if has_clip {
            surface.restore();
        }
    }

    fn draw_shape(
        &self,
        id: NodeId,
        node: &Node,
        shape: &ShapeData,
        pass: Pass,
        surface: &mut dyn Surface,
        top: Option<NodeId>,
    ) {
        let caching_self = top == Some(id);
        let gate = match pass {
            Pass::Scene => self.visible_within(id, top),
            Pass::Hit => self.should_draw_hit(id, top),
        };
        if !gate {
            return;
        }
        if let Some(bitmap) = node.cache.bitmap(pass) {
            self.draw_cached(id, node, bitmap, pass, surface, top);
            return;
        }
        match pass {
            Pass::Scene => {
                surface.save();
                surface.transform(self.draw_transform(id, top));
                if !caching_self {
                    surface.set_global_alpha(self.draw_opacity(id, top));
                    surface.set_composite_op(node.attrs.composite);
                }
                shape.draw_scene(surface);
                surface.restore();
            }
            Pass::Hit => {
                let Some(key) = node.hit_key else {
                    return;
                };
                surface.save();
                surface.transform(self.draw_transform(id, top));
                shape.draw_hit(surface, Rgba8::from_hit_key(key));
                surface.restore();
            }
        }
    }

    /// Blit a cached bitmap at the node's position.
    fn draw_cached(
        &self,
        id: NodeId,
        node: &Node,
        bitmap: &Bitmap,
        pass: Pass,
        surface: &mut dyn Surface,
        top: Option<NodeId>,
    ) {
        surface.save();
        surface.transform(self.draw_transform(id, top));
        if pass == Pass::Scene {
            surface.set_global_alpha(self.draw_opacity(id, top));
            surface.set_composite_op(node.attrs.composite);
        }
        surface.transform(Affine::translate(bitmap.origin().to_vec2()));
        surface.draw_bitmap(bitmap);
        surface.restore();
    }

    /// Draw every layer with an outstanding redraw request into its own
    /// surfaces, then forget the requests.
    pub fn draw_pending(&mut self) {
        for layer in self.take_pending_draws() {
            if !self.is_alive(layer) {
                continue;
            }
            log::trace!("redrawing {layer:?}");
            self.draw_scene(layer, None, None);
            self.draw_hit(layer, None, None);
        }
    }

    /// The topmost shape drawn at the world-space `point` by the hit pass
    /// of `id`.
    ///
    /// Clips, transforms, and cached hit bitmaps are honored exactly as
    /// drawn. Invisible and unpickable shapes are never returned.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use kurbo::{Point, Rect};
    /// use understory_scene::{Geometry, NodeAttrs, Rgba8, Scene, ShapeData};
    ///
    /// let mut scene = Scene::new();
    /// let layer = scene.create_layer(NodeAttrs::default());
    /// let square = |scene: &mut Scene, x: f64| {
    ///     scene.create_shape(
    ///         NodeAttrs::default(),
    ///         ShapeData::filled(Geometry::Rect(Rect::new(x, 0.0, x + 20.0, 20.0)), Rgba8::BLACK),
    ///     )
    /// };
    /// let below = square(&mut scene, 0.0);
    /// let above = square(&mut scene, 10.0);
    /// scene.add(layer, &[below, above]).unwrap();
    ///
    /// assert_eq!(scene.get_intersection(layer, Point::new(5.0, 5.0)), Some(below));
    /// assert_eq!(scene.get_intersection(layer, Point::new(15.0, 5.0)), Some(above));
    /// assert_eq!(scene.get_intersection(layer, Point::new(50.0, 5.0)), None);
    /// ```
    pub fn get_intersection(&self, id: NodeId, point: Point) -> Option<NodeId> {
        let node = self.get(id)?;
        if node.kind() == NodeKind::Stage {
            // Each layer has its own hit output; the topmost layer wins.
            return node
                .children()
                .iter()
                .rev()
                .find_map(|&layer| self.get_intersection(layer, point));
        }
        let mut rec = Recorder::new();
        self.draw_node(id, Pass::Hit, &mut rec, None);
        let color = rec.finish().pick(point)?;
        self.shape_for_hit_key(color.hit_key()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::{Rect, Vec2};

    use crate::cache::CacheConfig;
    use crate::clip::{ClipFn, ClipRect};
    use crate::shape::Geometry;
    use crate::surface::DrawCommand;
    use crate::types::NodeAttrs;

    const RED: Rgba8 = Rgba8::rgb(255, 0, 0);

    fn square(scene: &mut Scene, rect: Rect) -> NodeId {
        scene.create_shape(NodeAttrs::default(), ShapeData::filled(Geometry::Rect(rect), RED))
    }

    fn record(scene: &Scene, id: NodeId, pass: Pass) -> Vec<DrawCommand> {
        let mut rec = Recorder::new();
        match pass {
            Pass::Scene => scene.draw_scene(id, Some(&mut rec), None),
            Pass::Hit => scene.draw_hit(id, Some(&mut rec), None),
        }
        rec.finish().commands().to_vec()
    }

    fn count(cmds: &[DrawCommand], wanted: &DrawCommand) -> usize {
        cmds.iter().filter(|c| *c == wanted).count()
    }

    #[test]
    fn shapes_draw_with_world_transform_and_opacity() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs {
            opacity: 0.5,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_position(shape, Point::new(3.0, 4.0));
        scene.add(layer, &[shape]).unwrap();

        let cmds = record(&scene, layer, Pass::Scene);
        assert_eq!(cmds[0], DrawCommand::Save);
        assert_eq!(
            cmds[1],
            DrawCommand::Transform(Affine::translate(Vec2::new(3.0, 4.0)))
        );
        assert_eq!(cmds[2], DrawCommand::SetGlobalAlpha(0.5));
        assert_eq!(cmds[3], DrawCommand::SetCompositeOp(CompositeOp::SourceOver));
        assert!(cmds.contains(&DrawCommand::Fill(RED)));
        assert_eq!(cmds.last(), Some(&DrawCommand::Restore));
    }

    #[test]
    fn inactive_clip_adds_no_state() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene
            .set_clip(group, ClipRect::new(20.0, 20.0, 20.0, 20.0))
            .unwrap();
        let clipped = record(&scene, group, Pass::Scene);
        assert_eq!(count(&clipped, &DrawCommand::Clip), 1);

        scene.set_clip_width(group, 0.0).unwrap();
        scene.set_clip_height(group, 0.0).unwrap();
        let unclipped = record(&scene, group, Pass::Scene);
        assert_eq!(count(&unclipped, &DrawCommand::Clip), 0);
        // Only the shape's own save/restore pair remains.
        assert_eq!(count(&unclipped, &DrawCommand::Save), 1);
        assert_eq!(count(&unclipped, &DrawCommand::Restore), 1);
    }

    #[test]
    fn clip_is_set_in_container_space_then_undone() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let tf = Affine::translate(Vec2::new(100.0, 50.0));
        let group = scene.create_group(NodeAttrs {
            local_transform: tf,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        let clip = ClipRect::new(0.0, 0.0, 5.0, 5.0);
        scene.set_clip(group, clip).unwrap();

        let cmds = record(&scene, group, Pass::Scene);
        assert_eq!(
            &cmds[..6],
            &[
                DrawCommand::Save,
                DrawCommand::Transform(tf),
                DrawCommand::BeginPath,
                DrawCommand::Rect(clip.to_rect()),
                DrawCommand::Clip,
                DrawCommand::Transform(tf.inverse()),
            ]
        );
        // Children still draw with their own world transform.
        assert_eq!(cmds[6], DrawCommand::Save);
        assert_eq!(cmds[7], DrawCommand::Transform(tf));
        assert_eq!(cmds.last(), Some(&DrawCommand::Restore));

        // Points outside the clip do not hit.
        assert_eq!(scene.get_intersection(layer, Point::new(102.0, 52.0)), Some(shape));
        assert_eq!(scene.get_intersection(layer, Point::new(108.0, 58.0)), None);
    }

    #[test]
    fn clip_fn_takes_precedence() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene
            .set_clip(group, ClipRect::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        scene
            .set_clip_fn(
                group,
                Some(ClipFn::new(|surface, node| {
                    assert_eq!(node.kind(), NodeKind::Group);
                    surface.rect(Rect::new(0.0, 0.0, 2.0, 2.0));
                })),
            )
            .unwrap();

        let cmds = record(&scene, group, Pass::Scene);
        assert_eq!(cmds[3], DrawCommand::Rect(Rect::new(0.0, 0.0, 2.0, 2.0)));
        assert_eq!(count(&cmds, &DrawCommand::Rect(Rect::new(0.0, 0.0, 100.0, 100.0))), 0);
    }

    #[test]
    fn composite_wraps_children_inside_clip() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs {
            composite: CompositeOp::Multiply,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene
            .set_clip(group, ClipRect::new(0.0, 0.0, 5.0, 5.0))
            .unwrap();

        let cmds = record(&scene, group, Pass::Scene);
        let composite = cmds
            .iter()
            .position(|c| *c == DrawCommand::SetCompositeOp(CompositeOp::Multiply))
            .unwrap();
        assert_eq!(cmds[composite - 1], DrawCommand::Save);
        assert!(composite > 5, "composite is applied after the clip");
        // Composite restore, then clip restore.
        assert_eq!(&cmds[cmds.len() - 2..], &[DrawCommand::Restore, DrawCommand::Restore]);
        assert_eq!(count(&cmds, &DrawCommand::Save), count(&cmds, &DrawCommand::Restore));

        // The hit pass never composites.
        let hit = record(&scene, group, Pass::Hit);
        assert!(!hit.contains(&DrawCommand::SetCompositeOp(CompositeOp::Multiply)));
    }

    #[test]
    fn degenerate_clip_transform_skips_children() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs {
            local_transform: Affine::scale_non_uniform(0.0, 1.0),
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene
            .set_clip(group, ClipRect::new(0.0, 0.0, 5.0, 5.0))
            .unwrap();

        let cmds = record(&scene, group, Pass::Scene);
        assert!(!cmds.contains(&DrawCommand::Fill(RED)));
        assert_eq!(count(&cmds, &DrawCommand::Save), count(&cmds, &DrawCommand::Restore));
    }

    #[test]
    fn invisible_and_unpickable_nodes_are_skipped() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();

        scene.set_pickable(group, false);
        assert!(record(&scene, layer, Pass::Hit).is_empty());
        assert!(!record(&scene, layer, Pass::Scene).is_empty());
        assert_eq!(scene.get_intersection(layer, Point::new(5.0, 5.0)), None);

        scene.set_pickable(group, true);
        scene.set_visible(group, false);
        assert!(record(&scene, layer, Pass::Scene).is_empty());
        assert!(record(&scene, layer, Pass::Hit).is_empty());
    }

    #[test]
    fn cached_container_replays_without_recursing() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs {
            local_transform: Affine::translate(Vec2::new(100.0, 0.0)),
            opacity: 0.5,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(10.0, 10.0, 20.0, 20.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene.cache(group, CacheConfig::default()).unwrap();
        let bitmaps = scene.cached_bitmaps(group).unwrap().clone();

        let cmds = record(&scene, layer, Pass::Scene);
        assert_eq!(
            cmds,
            vec![
                DrawCommand::Save,
                DrawCommand::Transform(Affine::translate(Vec2::new(100.0, 0.0))),
                DrawCommand::SetGlobalAlpha(0.5),
                DrawCommand::SetCompositeOp(CompositeOp::SourceOver),
                DrawCommand::Transform(Affine::translate(Vec2::new(10.0, 10.0))),
                DrawCommand::DrawBitmap(bitmaps.scene.clone()),
                DrawCommand::Restore,
            ]
        );
        // The bitmap itself was recorded without the group's opacity.
        let inner = bitmaps.scene.display_list().commands();
        assert!(inner.contains(&DrawCommand::SetGlobalAlpha(1.0)));
        assert!(!inner.contains(&DrawCommand::SetGlobalAlpha(0.5)));

        // Picking goes through the cached hit bitmap.
        assert_eq!(scene.get_intersection(layer, Point::new(115.0, 15.0)), Some(shape));
        assert_eq!(scene.get_intersection(layer, Point::new(15.0, 15.0)), None);
    }

    #[test]
    fn hidden_container_can_still_be_cached() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene.set_visible(group, false);
        scene
            .cache(
                group,
                CacheConfig {
                    rect: Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
                    ..CacheConfig::default()
                },
            )
            .unwrap();

        let bitmaps = scene.cached_bitmaps(group).unwrap();
        assert!(bitmaps.scene.display_list().commands().contains(&DrawCommand::Fill(RED)));
        // It is still hidden in the layer.
        assert!(record(&scene, layer, Pass::Scene).is_empty());
    }

    #[test]
    fn hidden_cached_descendant_stays_out_of_parent_cache() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let outer = scene.create_group(NodeAttrs::default());
        let hidden = scene.create_group(NodeAttrs::default());
        let shown = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        let secret = square(&mut scene, Rect::new(20.0, 0.0, 30.0, 10.0));
        scene
            .add(layer, &[outer])
            .unwrap()
            .add(outer, &[shown, hidden])
            .unwrap()
            .add(hidden, &[secret])
            .unwrap();
        scene.cache(hidden, CacheConfig::default()).unwrap();
        scene.set_visible(hidden, false);

        let is_bitmap = |c: &DrawCommand| matches!(c, DrawCommand::DrawBitmap(_));
        assert!(!record(&scene, layer, Pass::Scene).iter().any(is_bitmap));

        scene.cache(outer, CacheConfig::default()).unwrap();
        let bitmaps = scene.cached_bitmaps(outer).unwrap();
        let scene_cmds = bitmaps.scene.display_list().commands();
        assert!(!scene_cmds.iter().any(is_bitmap), "hidden bitmap leaked");
        assert_eq!(count(scene_cmds, &DrawCommand::Fill(RED)), 1);
        assert!(!bitmaps.hit.display_list().commands().iter().any(is_bitmap));
    }

    #[test]
    fn cache_leaves_own_composite_to_replay() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs {
            composite: CompositeOp::Multiply,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();

        let multiply = DrawCommand::SetCompositeOp(CompositeOp::Multiply);
        assert_eq!(count(&record(&scene, layer, Pass::Scene), &multiply), 1);

        scene.cache(group, CacheConfig::default()).unwrap();
        let bitmap = scene.cached_bitmaps(group).unwrap().scene.clone();
        assert_eq!(count(bitmap.display_list().commands(), &multiply), 0);

        let cmds = record(&scene, layer, Pass::Scene);
        let op_at = cmds.iter().position(|c| *c == multiply).unwrap();
        let blit_at = cmds
            .iter()
            .position(|c| *c == DrawCommand::DrawBitmap(bitmap.clone()))
            .unwrap();
        assert!(op_at < blit_at, "composite is applied before the blit");
        assert_eq!(count(&cmds, &multiply), 1);
    }

    #[test]
    fn layers_clear_their_surfaces() {
        let mut scene = Scene::new();
        let stage = scene.create_stage(NodeAttrs::default());
        let layer = scene.create_layer(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(stage, &[layer]).unwrap().add(layer, &[shape]).unwrap();
        scene
            .attach_surfaces(layer, Recorder::new(), Recorder::new())
            .unwrap();

        scene.draw_pending();
        let first = scene.layer_surfaces(layer).unwrap().scene.commands().to_vec();
        assert!(first.contains(&DrawCommand::Fill(RED)));
        assert!(!scene.is_draw_pending(layer));

        // Drawing again replaces rather than appends.
        scene.draw_scene(stage, None, None);
        assert_eq!(scene.layer_surfaces(layer).unwrap().scene.commands(), &first[..]);

        scene.set_clear_before_draw(layer, false).unwrap();
        scene.draw_scene(stage, None, None);
        assert_eq!(
            scene.layer_surfaces(layer).unwrap().scene.commands().len(),
            first.len() * 2
        );

        let hit = scene.layer_surfaces(layer).unwrap().hit.commands().to_vec();
        assert!(hit.contains(&DrawCommand::Fill(Rgba8::from_hit_key(
            scene.node(shape).hit_key.unwrap()
        ))));
    }

    #[test]
    fn stage_picks_topmost_layer() {
        let mut scene = Scene::new();
        let stage = scene.create_stage(NodeAttrs::default());
        let bottom = scene.create_layer(NodeAttrs::default());
        let top = scene.create_layer(NodeAttrs::default());
        let a = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = square(&mut scene, Rect::new(5.0, 5.0, 15.0, 15.0));
        scene
            .add(stage, &[bottom, top])
            .unwrap()
            .add(bottom, &[a])
            .unwrap()
            .add(top, &[b])
            .unwrap();

        assert_eq!(scene.get_intersection(stage, Point::new(2.0, 2.0)), Some(a));
        assert_eq!(scene.get_intersection(stage, Point::new(7.0, 7.0)), Some(b));
        scene.set_visible(top, false);
        assert_eq!(scene.get_intersection(stage, Point::new(7.0, 7.0)), Some(a));
    }

    #[test]
    fn nodes_without_surfaces_draw_nothing() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[shape]).unwrap();
        // No surface anywhere: logged and ignored.
        scene.draw_scene(shape, None, None);
        scene.draw_pending();
        assert!(scene.layer_surfaces(layer).is_none());
    }

    #[test]
    fn top_renders_subtree_as_root() {
        let mut scene = Scene::new();
        let layer = scene.create_layer(NodeAttrs::default());
        let group = scene.create_group(NodeAttrs {
            local_transform: Affine::translate(Vec2::new(100.0, 0.0)),
            opacity: 0.5,
            ..NodeAttrs::default()
        });
        let shape = square(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.add(layer, &[group]).unwrap().add(group, &[shape]).unwrap();
        scene.set_visible(layer, false);

        let mut rec = Recorder::new();
        scene.draw_scene(group, Some(&mut rec), Some(group));
        let cmds = rec.finish();
        assert_eq!(cmds.commands()[1], DrawCommand::Transform(Affine::IDENTITY));
        assert_eq!(cmds.commands()[2], DrawCommand::SetGlobalAlpha(1.0));
    }
}
