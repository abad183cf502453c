//! The pan/zoom view transform.
//!
//! Layout coordinates reach the screen through
//! `translate(center) scale(zoom) translate(scroll)`: `scroll` is the layout
//! point shown at `center`, negated, and `zoom` is screen units per layout
//! unit.

use serde::{Deserialize, Serialize};

use crate::geometry::{Affine, Point, Rect};

/// Scroll offset of a fresh view.
pub const DEFAULT_SCROLL: Point = Point::new(-10.0, -100.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Screen point the view is centered on. Also the selection focus.
    pub center: Point,
    pub scroll: Point,
    pub zoom: f64,
}

impl ViewTransform {
    pub fn new(center: Point) -> Self {
        ViewTransform {
            center,
            scroll: DEFAULT_SCROLL,
            zoom: 1.0,
        }
    }

    pub fn affine(&self) -> Affine {
        Affine::translation(self.center.x, self.center.y)
            .scale(self.zoom)
            .translate(self.scroll.x, self.scroll.y)
    }

    pub fn to_screen(&self, p: Point) -> Point {
        self.affine().apply(p)
    }

    pub fn to_screen_rect(&self, r: &Rect) -> Rect {
        self.affine().map_rect(r)
    }

    /// Pans by a screen-space delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.scroll.x += dx / self.zoom;
        self.scroll.y += dy / self.zoom;
    }

    pub fn scale(&mut self, factor: f64) {
        self.zoom *= factor;
    }

    /// Pans so that the middle of `bounds` (layout space) lands on the
    /// center.
    pub fn center_on(&mut self, bounds: &Rect) {
        let mid = self.to_screen_rect(bounds).center();
        self.translate(self.center.x - mid.x, self.center.y - mid.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_view_shows_the_default_scroll() {
        let view = ViewTransform::new(Point::new(100.0, 200.0));
        assert_eq!(view.to_screen(Point::new(10.0, 100.0)), Point::new(100.0, 200.0));
    }

    #[test]
    fn pan_is_in_screen_units() {
        let mut view = ViewTransform::new(Point::default());
        view.scale(2.0);
        let before = view.to_screen(Point::default());
        view.translate(10.0, -4.0);
        let after = view.to_screen(Point::default());
        assert!((after.x - before.x - 10.0).abs() < 1e-9);
        assert!((after.y - before.y + 4.0).abs() < 1e-9);
    }

    #[test]
    fn center_on_brings_the_box_to_the_center() {
        let mut view = ViewTransform::new(Point::new(160.0, 120.0));
        view.scale(0.5);
        let target = Rect::new(300.0, 40.0, 20.0, 10.0);
        view.center_on(&target);
        let mid = view.to_screen_rect(&target).center();
        assert!((mid.x - 160.0).abs() < 1e-9);
        assert!((mid.y - 120.0).abs() < 1e-9);
    }
}
