// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surfaces, recorded display lists, and cached bitmaps.
//!
//! The scene draws through the [`Surface`] trait, which models a 2D canvas
//! context: a save/restore state stack, an affine transform, a current path,
//! clipping, compositing, and bitmap blits. Backends implement it for their
//! own canvases.
//!
//! [`Recorder`] is the in-crate implementation. It records every call as a
//! [`DrawCommand`], and the finished [`DisplayList`] is also the payload of a
//! cached [`Bitmap`]. [`DisplayList::pick`] answers "which hit color is on top
//! at this point", which is how hit-pass output is read back.

use alloc::rc::Rc;
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, BezPath, ParamCurveNearest, PathEl, Point, Rect, Shape as _, Size};
use smallvec::SmallVec;

use crate::shape::Shadow;
use crate::types::{CompositeOp, Rgba8};

/// Tolerance used when flattening rectangles into paths.
const PATH_TOLERANCE: f64 = 0.1;

/// A 2D drawing context.
///
/// Transforms compose with the current transform, as with a canvas context.
/// Path coordinates are interpreted in the transform active when they are
/// added.
pub trait Surface {
    /// Push the current state (transform, clip, alpha, composite op, shadow).
    fn save(&mut self);
    /// Pop the most recently saved state.
    fn restore(&mut self);
    /// Erase all content.
    fn clear(&mut self);
    /// Multiply the current transform by `affine`.
    fn transform(&mut self, affine: Affine);
    /// Start a new current path.
    fn begin_path(&mut self);
    /// Add a rectangle to the current path.
    fn rect(&mut self, rect: Rect);
    /// Add an arbitrary path to the current path.
    fn append_path(&mut self, path: &BezPath);
    /// Intersect the clip region with the current path.
    fn clip(&mut self);
    /// Set the alpha applied to subsequent painting.
    fn set_global_alpha(&mut self, alpha: f64);
    /// Set the composite operation applied to subsequent painting.
    fn set_composite_op(&mut self, op: CompositeOp);
    /// Set or clear the shadow applied to subsequent painting.
    fn set_shadow(&mut self, shadow: Option<&Shadow>);
    /// Fill the current path.
    fn fill(&mut self, color: Rgba8);
    /// Stroke the current path.
    fn stroke(&mut self, color: Rgba8, width: f64);
    /// Blit a cached bitmap at the origin of the current transform.
    fn draw_bitmap(&mut self, bitmap: &Bitmap);
    /// Returns true if this surface is the target of cache production.
    ///
    /// Containers skip their visibility gate when drawing into a cache target.
    fn is_cache(&self) -> bool {
        false
    }
}

/// One recorded [`Surface`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// [`Surface::save`].
    Save,
    /// [`Surface::restore`].
    Restore,
    /// [`Surface::transform`].
    Transform(Affine),
    /// [`Surface::begin_path`].
    BeginPath,
    /// [`Surface::rect`].
    Rect(Rect),
    /// [`Surface::append_path`].
    AppendPath(BezPath),
    /// [`Surface::clip`].
    Clip,
    /// [`Surface::set_global_alpha`].
    SetGlobalAlpha(f64),
    /// [`Surface::set_composite_op`].
    SetCompositeOp(CompositeOp),
    /// [`Surface::set_shadow`].
    SetShadow(Option<Shadow>),
    /// [`Surface::fill`].
    Fill(Rgba8),
    /// [`Surface::stroke`].
    Stroke {
        /// Stroke color.
        color: Rgba8,
        /// Stroke width in the current transform's units.
        width: f64,
    },
    /// [`Surface::draw_bitmap`].
    DrawBitmap(Bitmap),
}

/// An immutable, replayable sequence of draw commands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    /// The recorded commands, in order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Replay the list onto another surface.
    pub fn replay(&self, surface: &mut dyn Surface) {
        for cmd in &self.commands {
            match cmd {
                DrawCommand::Save => surface.save(),
                DrawCommand::Restore => surface.restore(),
                DrawCommand::Transform(a) => surface.transform(*a),
                DrawCommand::BeginPath => surface.begin_path(),
                DrawCommand::Rect(r) => surface.rect(*r),
                DrawCommand::AppendPath(p) => surface.append_path(p),
                DrawCommand::Clip => surface.clip(),
                DrawCommand::SetGlobalAlpha(a) => surface.set_global_alpha(*a),
                DrawCommand::SetCompositeOp(op) => surface.set_composite_op(*op),
                DrawCommand::SetShadow(s) => surface.set_shadow(s.as_ref()),
                DrawCommand::Fill(c) => surface.fill(*c),
                DrawCommand::Stroke { color, width } => surface.stroke(*color, *width),
                DrawCommand::DrawBitmap(b) => surface.draw_bitmap(b),
            }
        }
    }

    /// Return the color painted last (topmost) at `point`.
    ///
    /// Fills test the current path, strokes test the distance to the path
    /// against half the transformed stroke width. Clip regions and nested
    /// bitmap bounds are honored. Alpha and composite operations are
    /// ignored; this is meant for hit-pass output, which paints opaque keys.
    pub fn pick(&self, point: Point) -> Option<Rgba8> {
        let mut clips = Vec::new();
        let mut hit = None;
        self.pick_into(point, Affine::IDENTITY, &mut clips, &mut hit);
        hit
    }

    fn pick_into(
        &self,
        point: Point,
        base: Affine,
        clips: &mut Vec<BezPath>,
        hit: &mut Option<Rgba8>,
    ) {
        let floor = clips.len();
        let mut tf = base;
        let mut saved: SmallVec<[(Affine, usize); 8]> = SmallVec::new();
        let mut path = BezPath::new();

        for cmd in &self.commands {
            match cmd {
                DrawCommand::Save => saved.push((tf, clips.len())),
                DrawCommand::Restore => {
                    if let Some((prev, n)) = saved.pop() {
                        tf = prev;
                        clips.truncate(n.max(floor));
                    }
                }
                DrawCommand::Transform(a) => tf = tf * *a,
                DrawCommand::BeginPath => path = BezPath::new(),
                DrawCommand::Rect(r) => {
                    path.extend(r.path_elements(PATH_TOLERANCE).map(|el| tf * el));
                }
                DrawCommand::AppendPath(p) => path.extend(p.iter().map(|el: PathEl| tf * el)),
                DrawCommand::Clip => clips.push(path.clone()),
                DrawCommand::Fill(color) => {
                    if path.contains(point) && inside_clips(clips, point) {
                        *hit = Some(*color);
                    }
                }
                DrawCommand::Stroke { color, width } => {
                    let half = 0.5 * width * tf.determinant().abs().sqrt();
                    if near_outline(&path, point, half) && inside_clips(clips, point) {
                        *hit = Some(*color);
                    }
                }
                DrawCommand::DrawBitmap(bitmap) => {
                    let n = clips.len();
                    let bounds = Rect::from_origin_size(Point::ORIGIN, bitmap.size());
                    clips.push(tf * bounds.to_path(PATH_TOLERANCE));
                    bitmap.display_list().pick_into(point, tf, clips, hit);
                    clips.truncate(n);
                }
                DrawCommand::SetGlobalAlpha(_)
                | DrawCommand::SetCompositeOp(_)
                | DrawCommand::SetShadow(_) => {}
            }
        }
        clips.truncate(floor);
    }
}

fn inside_clips(clips: &[BezPath], point: Point) -> bool {
    clips.iter().all(|clip| clip.contains(point))
}

/// Returns true if `point` lies within `half_width` of any segment of `path`.
pub(crate) fn near_outline(path: &BezPath, point: Point, half_width: f64) -> bool {
    if half_width <= 0.0 {
        return false;
    }
    let limit = half_width * half_width;
    path.segments()
        .any(|seg| seg.nearest(point, 1e-6).distance_sq <= limit)
}

/// A cached raster of a subtree.
///
/// The pixels are represented by the [`DisplayList`] recorded while drawing
/// the subtree into a cache target. `origin` is where the bitmap's top-left
/// corner sits in the owning node's local space; the recorded commands are
/// already offset by `-origin`.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    origin: Point,
    size: Size,
    list: Rc<DisplayList>,
}

impl Bitmap {
    /// Wrap a recorded list.
    pub fn new(origin: Point, size: Size, list: DisplayList) -> Self {
        Self {
            origin,
            size,
            list: Rc::new(list),
        }
    }

    /// Top-left corner in the owning node's local space.
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Extent of the bitmap.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The recorded content.
    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    /// Returns true if both handles share the same content allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.list, &other.list)
    }
}

/// A [`Surface`] that records calls into a [`DisplayList`].
///
/// ## Example
///
/// ```rust
/// use kurbo::Rect;
/// use understory_scene::{DrawCommand, Recorder, Rgba8, Surface};
///
/// let mut rec = Recorder::new();
/// rec.begin_path();
/// rec.rect(Rect::new(0.0, 0.0, 10.0, 10.0));
/// rec.fill(Rgba8::BLACK);
///
/// let list = rec.finish();
/// assert_eq!(list.commands().len(), 3);
/// assert_eq!(list.commands()[2], DrawCommand::Fill(Rgba8::BLACK));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    commands: Vec<DrawCommand>,
    cache: bool,
}

impl Recorder {
    /// A recorder for ordinary drawing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder flagged as a cache-production target.
    pub fn for_cache() -> Self {
        Self {
            commands: Vec::new(),
            cache: true,
        }
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recorder empty.
    pub fn take(&mut self) -> DisplayList {
        DisplayList {
            commands: core::mem::take(&mut self.commands),
        }
    }

    /// Consume the recorder and return its list.
    pub fn finish(self) -> DisplayList {
        DisplayList {
            commands: self.commands,
        }
    }
}

impl Surface for Recorder {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn transform(&mut self, affine: Affine) {
        self.commands.push(DrawCommand::Transform(affine));
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Rect(rect));
    }

    fn append_path(&mut self, path: &BezPath) {
        self.commands.push(DrawCommand::AppendPath(path.clone()));
    }

    fn clip(&mut self) {
        self.commands.push(DrawCommand::Clip);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.commands.push(DrawCommand::SetGlobalAlpha(alpha));
    }

    fn set_composite_op(&mut self, op: CompositeOp) {
        self.commands.push(DrawCommand::SetCompositeOp(op));
    }

    fn set_shadow(&mut self, shadow: Option<&Shadow>) {
        self.commands.push(DrawCommand::SetShadow(shadow.copied()));
    }

    fn fill(&mut self, color: Rgba8) {
        self.commands.push(DrawCommand::Fill(color));
    }

    fn stroke(&mut self, color: Rgba8, width: f64) {
        self.commands.push(DrawCommand::Stroke { color, width });
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap) {
        self.commands.push(DrawCommand::DrawBitmap(bitmap.clone()));
    }

    fn is_cache(&self) -> bool {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    const RED: Rgba8 = Rgba8::rgb(255, 0, 0);
    const BLUE: Rgba8 = Rgba8::rgb(0, 0, 255);

    fn filled_rect(rec: &mut Recorder, rect: Rect, color: Rgba8) {
        rec.begin_path();
        rec.rect(rect);
        rec.fill(color);
    }

    #[test]
    fn pick_returns_topmost_fill() {
        let mut rec = Recorder::new();
        filled_rect(&mut rec, Rect::new(0.0, 0.0, 50.0, 50.0), RED);
        filled_rect(&mut rec, Rect::new(25.0, 25.0, 75.0, 75.0), BLUE);
        let list = rec.finish();

        assert_eq!(list.pick(Point::new(10.0, 10.0)), Some(RED));
        assert_eq!(list.pick(Point::new(30.0, 30.0)), Some(BLUE));
        assert_eq!(list.pick(Point::new(90.0, 90.0)), None);
    }

    #[test]
    fn pick_applies_transform_and_restore() {
        let mut rec = Recorder::new();
        rec.save();
        rec.transform(Affine::translate(Vec2::new(100.0, 0.0)));
        filled_rect(&mut rec, Rect::new(0.0, 0.0, 10.0, 10.0), RED);
        rec.restore();
        filled_rect(&mut rec, Rect::new(0.0, 20.0, 10.0, 30.0), BLUE);
        let list = rec.finish();

        assert_eq!(list.pick(Point::new(105.0, 5.0)), Some(RED));
        assert_eq!(list.pick(Point::new(5.0, 5.0)), None);
        assert_eq!(list.pick(Point::new(5.0, 25.0)), Some(BLUE));
    }

    #[test]
    fn pick_honors_clip_until_restore() {
        let mut rec = Recorder::new();
        rec.save();
        rec.begin_path();
        rec.rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        rec.clip();
        filled_rect(&mut rec, Rect::new(0.0, 0.0, 100.0, 100.0), RED);
        rec.restore();
        filled_rect(&mut rec, Rect::new(50.0, 50.0, 60.0, 60.0), BLUE);
        let list = rec.finish();

        assert_eq!(list.pick(Point::new(5.0, 5.0)), Some(RED));
        assert_eq!(list.pick(Point::new(30.0, 30.0)), None);
        assert_eq!(list.pick(Point::new(55.0, 55.0)), Some(BLUE));
    }

    #[test]
    fn pick_strokes_by_distance() {
        let mut rec = Recorder::new();
        rec.begin_path();
        rec.rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        rec.stroke(RED, 4.0);
        let list = rec.finish();

        assert_eq!(list.pick(Point::new(1.0, 50.0)), Some(RED));
        assert_eq!(list.pick(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn pick_descends_into_bitmaps_within_bounds() {
        let mut inner = Recorder::for_cache();
        filled_rect(&mut inner, Rect::new(-20.0, -20.0, 40.0, 40.0), RED);
        let bitmap = Bitmap::new(Point::ORIGIN, Size::new(20.0, 20.0), inner.finish());

        let mut rec = Recorder::new();
        rec.transform(Affine::translate(Vec2::new(100.0, 100.0)));
        rec.draw_bitmap(&bitmap);
        let list = rec.finish();

        assert_eq!(list.pick(Point::new(110.0, 110.0)), Some(RED));
        // Inside the recorded fill but outside the bitmap's extent.
        assert_eq!(list.pick(Point::new(130.0, 130.0)), None);
    }

    #[test]
    fn replay_reproduces_commands() {
        let mut rec = Recorder::new();
        rec.save();
        rec.set_global_alpha(0.5);
        filled_rect(&mut rec, Rect::new(0.0, 0.0, 1.0, 1.0), RED);
        rec.restore();
        let list = rec.finish();

        let mut copy = Recorder::new();
        list.replay(&mut copy);
        assert_eq!(copy.finish(), list);
    }

    #[test]
    fn clear_discards_commands() {
        let mut rec = Recorder::new();
        filled_rect(&mut rec, Rect::new(0.0, 0.0, 1.0, 1.0), RED);
        rec.clear();
        assert!(rec.commands().is_empty());
        assert!(!rec.is_cache());
        assert!(Recorder::for_cache().is_cache());
    }
}
