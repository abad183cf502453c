//! Points, rectangles and affine transforms.
//!
//! Coordinates follow screen conventions: `x` grows to the right, `y` grows
//! downwards, and a positive rotation turns clockwise. [`Affine`] composes
//! like an SVG transform list: in `a.compose(b)`, `b` is applied to points
//! first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    /// The smallest rectangle containing both corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Rect::new(left, top, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// A rotation by a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    /// +90 degrees.
    Clockwise,
    /// -90 degrees.
    CounterClockwise,
}

/// `[a c e; b d f; 0 0 1]`, mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Affine::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(dx: f64, dy: f64) -> Self {
        Affine {
            e: dx,
            f: dy,
            ..Affine::IDENTITY
        }
    }

    pub fn scaling(factor: f64) -> Self {
        Affine {
            a: factor,
            d: factor,
            ..Affine::IDENTITY
        }
    }

    pub fn rotation(turn: QuarterTurn) -> Self {
        let sin = match turn {
            QuarterTurn::Clockwise => 1.0,
            QuarterTurn::CounterClockwise => -1.0,
        };
        Affine {
            a: 0.0,
            b: sin,
            c: -sin,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self` after `inner`: points go through `inner` first.
    pub fn compose(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Affine {
        self.compose(&Affine::translation(dx, dy))
    }

    pub fn scale(&self, factor: f64) -> Affine {
        self.compose(&Affine::scaling(factor))
    }

    pub fn rotate(&self, turn: QuarterTurn) -> Affine {
        self.compose(&Affine::rotation(turn))
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Bounding box of the transformed rectangle. Exact for transforms made
    /// of translations, uniform scales and quarter turns.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        Rect::from_corners(
            self.apply(Point::new(r.left(), r.top())),
            self.apply(Point::new(r.right(), r.bottom())),
        )
    }

    /// Uniform scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Rotation in whole degrees, in `(-180, 180]`.
    pub fn rotation_degrees(&self) -> i32 {
        let degrees = self.b.atan2(self.a).to_degrees().round() as i32;
        if degrees == -180 {
            180
        } else {
            degrees
        }
    }
}
