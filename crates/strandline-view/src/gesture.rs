//! Drag handles as explicit state machines.
//!
//! A [`DragGesture`] is fed press / move / release / tap events and periodic
//! ticks by the host, with the host's clock in milliseconds. While pressed,
//! every tick reports the offset from the press point, so holding a handle
//! away from its rest position keeps scrolling. A press that neither moves
//! nor ends within [`LONG_PRESS_MS`] becomes a long press.
//!
//! [`Dpad`] and [`ZoomPad`] turn drag events into view changes.

use serde::Serialize;

use crate::geometry::Point;
use crate::viewer::ViewTransform;

/// Interval between ticks while a handle is held.
pub const TICK_MS: u64 = 20;
/// Hold time after which an unmoved press becomes a long press.
pub const LONG_PRESS_MS: u64 = 1000;
/// Screen distance a d-pad deflection pans per tick is `1 / DPAD_DIVISOR`
/// of the deflection.
pub const DPAD_DIVISOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GestureEvent {
    /// Handle held at `at`, offset `(dx, dy)` from where it was pressed.
    Drag { dx: f64, dy: f64, at: Point },
    /// Handle let go; it returns to rest.
    Settle,
    LongPress,
    Tap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Pressed {
        start: Point,
        current: Point,
        pressed_at: u64,
        long_press_armed: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    state: DragState,
    long_press: bool,
}

impl DragGesture {
    /// A gesture; `long_press` enables long-press detection.
    pub fn new(long_press: bool) -> Self {
        DragGesture {
            state: DragState::Idle,
            long_press,
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, DragState::Pressed { .. })
    }

    pub fn press(&mut self, at: Point, now: u64) -> GestureEvent {
        self.state = DragState::Pressed {
            start: at,
            current: at,
            pressed_at: now,
            long_press_armed: self.long_press,
        };
        GestureEvent::Drag { dx: 0.0, dy: 0.0, at }
    }

    /// Moving cancels a pending long press.
    pub fn move_to(&mut self, at: Point) {
        if let DragState::Pressed {
            current,
            long_press_armed,
            ..
        } = &mut self.state
        {
            *current = at;
            *long_press_armed = false;
        }
    }

    pub fn release(&mut self) -> Option<GestureEvent> {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Pressed { .. } => Some(GestureEvent::Settle),
            DragState::Idle => None,
        }
    }

    pub fn tap(&mut self) -> GestureEvent {
        if let DragState::Pressed { long_press_armed, .. } = &mut self.state {
            *long_press_armed = false;
        }
        GestureEvent::Tap
    }

    pub fn tick(&mut self, now: u64) -> Option<GestureEvent> {
        let DragState::Pressed {
            start,
            current,
            pressed_at,
            long_press_armed,
        } = self.state
        else {
            return None;
        };
        if long_press_armed && now.saturating_sub(pressed_at) >= LONG_PRESS_MS {
            tracing::debug!("long press after {} ms", now - pressed_at);
            self.state = DragState::Idle;
            return Some(GestureEvent::LongPress);
        }
        Some(GestureEvent::Drag {
            dx: current.x - start.x,
            dy: current.y - start.y,
            at: current,
        })
    }
}

/// A circular pad that pans the view while its handle is deflected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpad {
    pub radius: f64,
    pub handle_radius: f64,
}

impl Dpad {
    /// Clamps a deflection to the pad, returning the handle offset.
    pub fn clamp(&self, dx: f64, dy: f64) -> (f64, f64) {
        let usable = (self.radius - self.handle_radius).max(0.0);
        let len = dx.hypot(dy);
        if len > usable {
            let shrink = usable / len;
            (dx * shrink, dy * shrink)
        } else {
            (dx, dy)
        }
    }

    /// Applies a drag event to the view. Returns the handle offset.
    pub fn apply(&self, event: &GestureEvent, view: &mut ViewTransform) -> (f64, f64) {
        match *event {
            GestureEvent::Drag { dx, dy, .. } => {
                let (dx, dy) = self.clamp(dx, dy);
                view.translate(-dx / DPAD_DIVISOR, -dy / DPAD_DIVISOR);
                (dx, dy)
            }
            _ => (0.0, 0.0),
        }
    }
}

/// An arc-shaped pad; the handle's angle along the arc sets a zoom rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPad {
    pub center: Point,
    /// Degrees, clockwise from straight up.
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ZoomPad {
    /// Angle of `at` around the pad center, clockwise from straight up.
    pub fn angle(&self, at: Point) -> f64 {
        180.0 - (at.x - self.center.x).atan2(at.y - self.center.y).to_degrees()
    }

    /// Zoom factor per tick: 0.9 at the start of the arc, 1.1 at its end.
    pub fn factor(&self, at: Point) -> f64 {
        let pct = (self.angle(at) - self.start_angle) / (self.end_angle - self.start_angle);
        0.9 + pct * 0.2
    }

    /// Applies a drag event to the view. A zero offset means the handle is at
    /// rest and does not zoom.
    pub fn apply(&self, event: &GestureEvent, view: &mut ViewTransform) {
        if let GestureEvent::Drag { dx, dy, at } = *event {
            if dx != 0.0 || dy != 0.0 {
                view.scale(self.factor(at));
            }
        }
    }
}
