// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf shapes: geometry, styling, drawing, and precise point tests.
//!
//! A shape's geometry lives in its own local space; the owning node supplies
//! the transform. Scene drawing paints the fill, then the stroke. Hit drawing
//! paints the same outline in the shape's hit color so that a pick on the
//! hit output maps back to the shape.

use kurbo::{BezPath, Circle, Ellipse, Line, Point, Rect, RoundedRect, Shape as _, Vec2};

use crate::surface::{Surface, near_outline};
use crate::types::Rgba8;

/// Tolerance used when converting geometry into paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Geometry of a leaf shape, in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Axis-aligned rectangle.
    Rect(Rect),
    /// Rectangle with rounded corners.
    RoundedRect(RoundedRect),
    /// Circle.
    Circle(Circle),
    /// Ellipse.
    Ellipse(Ellipse),
    /// Straight segment; stroke only.
    Line(Line),
    /// Arbitrary path, filled with the non-zero rule.
    Path(BezPath),
}

impl Geometry {
    /// The class name matched by bare selector clauses, such as `"Rect"`.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Rect(_) => "Rect",
            Self::RoundedRect(_) => "RoundedRect",
            Self::Circle(_) => "Circle",
            Self::Ellipse(_) => "Ellipse",
            Self::Line(_) => "Line",
            Self::Path(_) => "Path",
        }
    }

    /// Local bounding box.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Rect(r) => r.abs(),
            Self::RoundedRect(r) => r.bounding_box(),
            Self::Circle(c) => c.bounding_box(),
            Self::Ellipse(e) => e.bounding_box(),
            Self::Line(l) => l.bounding_box(),
            Self::Path(p) => p.bounding_box(),
        }
    }

    /// Outline as a path.
    pub fn to_path(&self) -> BezPath {
        match self {
            Self::Rect(r) => r.to_path(PATH_TOLERANCE),
            Self::RoundedRect(r) => r.to_path(PATH_TOLERANCE),
            Self::Circle(c) => c.to_path(PATH_TOLERANCE),
            Self::Ellipse(e) => e.to_path(PATH_TOLERANCE),
            Self::Line(l) => l.to_path(PATH_TOLERANCE),
            Self::Path(p) => p.clone(),
        }
    }

    /// Returns true if the geometry encloses an area that can be filled.
    pub fn is_fillable(&self) -> bool {
        !matches!(self, Self::Line(_))
    }

    fn contains(&self, pt: Point) -> bool {
        match self {
            Self::Rect(r) => r.abs().contains(pt),
            Self::RoundedRect(r) => r.contains(pt),
            Self::Circle(c) => c.contains(pt),
            Self::Ellipse(e) => e.contains(pt),
            Self::Line(_) => false,
            Self::Path(p) => p.contains(pt),
        }
    }
}

/// Stroke styling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: Rgba8,
    /// Stroke width in local units.
    pub width: f64,
}

/// Drop shadow styling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    /// Shadow color.
    pub color: Rgba8,
    /// Blur radius.
    pub blur: f64,
    /// Offset from the shape.
    pub offset: Vec2,
    /// Shadow opacity.
    pub opacity: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: Rgba8::BLACK,
            blur: 0.0,
            offset: Vec2::ZERO,
            opacity: 1.0,
        }
    }
}

impl Shadow {
    /// Returns true if the shadow paints anything.
    pub fn is_effective(&self) -> bool {
        self.opacity != 0.0 && (self.color.a != 0 || self.blur != 0.0 || self.offset != Vec2::ZERO)
    }
}

/// Fill, stroke, and shadow of a shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeStyle {
    /// Fill color; `None` leaves the interior unpainted in the scene pass.
    pub fill: Option<Rgba8>,
    /// Outline stroke.
    pub stroke: Option<Stroke>,
    /// Drop shadow.
    pub shadow: Option<Shadow>,
    /// Stroke width used in the hit pass; defaults to the stroke width.
    pub hit_stroke_width: Option<f64>,
}

/// Which part of a shape a point hit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HitKind {
    /// The interior.
    Fill,
    /// The stroked outline.
    Stroke,
}

/// A leaf drawable: geometry plus style.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeData {
    /// Local geometry.
    pub geometry: Geometry,
    /// Styling.
    pub style: ShapeStyle,
}

impl ShapeData {
    /// A shape with a fill color and no stroke.
    pub fn filled(geometry: Geometry, fill: Rgba8) -> Self {
        Self {
            geometry,
            style: ShapeStyle {
                fill: Some(fill),
                ..ShapeStyle::default()
            },
        }
    }

    /// The rect covered by the fill, before stroke and shadow.
    pub fn self_rect(&self) -> Rect {
        self.geometry.bounding_box()
    }

    /// Returns true if a visible stroke is configured.
    pub fn has_stroke(&self) -> bool {
        self.style.stroke.is_some_and(|s| s.width > 0.0)
    }

    fn effective_shadow(&self) -> Option<&Shadow> {
        self.style.shadow.as_ref().filter(|s| s.is_effective())
    }

    fn hit_stroke_width(&self) -> f64 {
        match (self.style.hit_stroke_width, self.style.stroke) {
            (Some(w), _) => w,
            (None, Some(s)) => s.width,
            (None, None) => 0.0,
        }
    }

    /// Local rect covering fill, stroke, and shadow.
    ///
    /// The stroke straddles the outline, so it grows the rect by half its
    /// width on every side. The shadow extends the rect toward its offset and
    /// by its blur radius on every side.
    pub fn painted_rect(&self, skip_stroke: bool, skip_shadow: bool) -> Rect {
        let fill = self.self_rect();
        let stroke_width = match self.style.stroke {
            Some(s) if !skip_stroke && self.has_stroke() => s.width,
            _ => 0.0,
        };
        let shadow = if skip_shadow {
            None
        } else {
            self.effective_shadow()
        };
        let offset = shadow.map_or(Vec2::ZERO, |s| s.offset);
        let blur = shadow.map_or(0.0, |s| s.blur);

        let width = fill.width() + stroke_width + offset.x.abs() + blur * 2.0;
        let height = fill.height() + stroke_width + offset.y.abs() + blur * 2.0;
        let x = fill.x0 - (stroke_width / 2.0 + blur) + offset.x.min(0.0);
        let y = fill.y0 - (stroke_width / 2.0 + blur) + offset.y.min(0.0);
        Rect::new(x, y, x + width, y + height)
    }

    /// Paint the shape in local coordinates for the scene pass.
    pub fn draw_scene(&self, surface: &mut dyn Surface) {
        let path = self.geometry.to_path();
        surface.begin_path();
        surface.append_path(&path);

        let shadow = self.effective_shadow();
        if shadow.is_some() {
            surface.set_shadow(shadow);
        }
        let mut filled = false;
        if let Some(fill) = self.style.fill
            && self.geometry.is_fillable()
        {
            surface.fill(fill);
            filled = true;
        }
        if let Some(stroke) = self.style.stroke
            && self.has_stroke()
        {
            // The fill already cast the shadow.
            if filled && shadow.is_some() {
                surface.set_shadow(None);
            }
            surface.stroke(stroke.color, stroke.width);
        }
    }

    /// Paint the shape in local coordinates for the hit pass using `key`.
    pub fn draw_hit(&self, surface: &mut dyn Surface, key: Rgba8) {
        let path = self.geometry.to_path();
        surface.begin_path();
        surface.append_path(&path);
        if self.geometry.is_fillable() {
            surface.fill(key);
        }
        let width = self.hit_stroke_width();
        if width > 0.0 {
            surface.stroke(key, width);
        }
    }

    /// Test a point given in the shape's local space.
    ///
    /// The interior counts as a hit whether or not a fill color is set, the
    /// same area the hit pass paints.
    pub fn hit_test_local(&self, pt: Point) -> Option<HitKind> {
        if self.geometry.is_fillable() && self.geometry.contains(pt) {
            return Some(HitKind::Fill);
        }
        let half = self.hit_stroke_width() / 2.0;
        if near_outline(&self.geometry.to_path(), pt, half) {
            return Some(HitKind::Stroke);
        }
        None
    }
}
