//! Cursor selection and traversal over a rebuilt anchor list.

use serde::Serialize;

use crate::anchor::{Anchor, AnchorKind, AnchorTarget};
use crate::geometry::{Point, Rect};
use crate::viewer::ViewTransform;

/// Anchors farther than this (squared screen distance) are never selected.
pub const MAX_SELECT_DISTANCE: f64 = 100_000.0;

/// Squared distance from `focus` to `bounds`. Zero on an axis whenever the
/// focus coordinate lies within the box's span on that axis.
pub fn focus_distance(focus: Point, bounds: &Rect) -> f64 {
    let gap = |p: f64, lo: f64, hi: f64| {
        if p < lo {
            lo - p
        } else if p > hi {
            hi - p
        } else {
            0.0
        }
    };
    let dx = gap(focus.x, bounds.left(), bounds.right());
    let dy = gap(focus.y, bounds.top(), bounds.bottom());
    dx * dx + dy * dy
}

/// Result of re-selecting after a view change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionChange {
    /// The selected anchor is a different one.
    pub changed: bool,
    /// Set when the newly selected anchor's kind differs from the previous
    /// selection's: the input mode should switch to it.
    pub mode: Option<AnchorKind>,
}

/// The anchors of the current layout and which one is selected.
#[derive(Debug, Clone, Default)]
pub struct NavigationSession {
    anchors: Vec<Anchor>,
    current: Option<usize>,
    last_kind: Option<AnchorKind>,
}

impl NavigationSession {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        NavigationSession {
            anchors,
            current: None,
            last_kind: None,
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Anchor> {
        self.current.and_then(|idx| self.anchors.get(idx))
    }

    /// Selects the anchor nearest the view's center, in screen space.
    /// Ties go to the earliest anchor.
    pub fn select_at_focus(&mut self, view: &ViewTransform) -> SelectionChange {
        let mut best = None;
        let mut best_distance = MAX_SELECT_DISTANCE;
        for (idx, anchor) in self.anchors.iter().enumerate() {
            let distance = focus_distance(view.center, &view.to_screen_rect(&anchor.bounds));
            if distance < best_distance {
                best = Some(idx);
                best_distance = distance;
            }
        }
        self.select(best)
    }

    /// Selects an anchor by index (`None` clears the selection).
    pub fn select(&mut self, idx: Option<usize>) -> SelectionChange {
        let idx = idx.filter(|idx| *idx < self.anchors.len());
        let changed = idx != self.current;
        self.current = idx;
        let kind = self.current().map(|anchor| anchor.kind);
        let mode = kind.filter(|kind| Some(*kind) != self.last_kind);
        self.last_kind = kind;
        SelectionChange { changed, mode }
    }

    /// The anchor after the current one, wrapping at the end.
    pub fn next_index(&self) -> Option<usize> {
        if self.anchors.is_empty() {
            return None;
        }
        Some(self.current.map_or(0, |idx| (idx + 1) % self.anchors.len()))
    }

    /// Position of the anchor standing for `target`.
    pub fn position_of(&self, target: &AnchorTarget) -> Option<usize> {
        self.anchors
            .iter()
            .position(|anchor| anchor.target.same_entity(target))
    }

    /// Installs the anchors of a fresh layout and finds the previously
    /// selected entity among them.
    pub fn replace_anchors(&mut self, anchors: Vec<Anchor>) -> Option<usize> {
        let previous = self.current().map(|anchor| anchor.target.clone());
        self.anchors = anchors;
        self.current = previous.and_then(|target| self.position_of(&target));
        self.current
    }

    /// Selects the anchor standing for `target`. When there is none the
    /// selection is left as it was.
    pub fn focus_target(&mut self, target: &AnchorTarget) -> Option<SelectionChange> {
        let Some(idx) = self.position_of(target) else {
            tracing::info!("no anchor for {:?}", target);
            return None;
        };
        Some(self.select(Some(idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strandline_core::{FunctionId, ListId, OpId};

    fn op_anchor(op: u32, x: f64) -> Anchor {
        Anchor::operation(
            AnchorTarget::Operation {
                list: ListId(1),
                op: OpId(op),
            },
            Rect::new(x, 0.0, 10.0, 10.0),
        )
    }

    /// A view that maps layout space 1:1 onto the screen, centered on
    /// `focus`.
    fn view_at(focus: Point) -> ViewTransform {
        ViewTransform {
            center: focus,
            scroll: Point::default(),
            zoom: 1.0,
        }
    }

    #[test]
    fn nearest_anchor_wins() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0), op_anchor(2, 40.0)]);
        let change = session.select_at_focus(&view_at(Point::new(38.0, 5.0)));
        assert_eq!(session.current_index(), Some(1));
        assert!(change.changed);
        assert_eq!(change.mode, Some(AnchorKind::Operation));
    }

    #[test]
    fn ties_keep_the_earliest_anchor() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0), op_anchor(2, 0.0)]);
        session.select_at_focus(&view_at(Point::new(5.0, 5.0)));
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn far_anchors_are_not_selected() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 1000.0)]);
        let change = session.select_at_focus(&view_at(Point::default()));
        assert_eq!(session.current_index(), None);
        assert!(!change.changed);
    }

    #[test]
    fn mode_fires_only_when_kind_changes() {
        let header = Anchor::function_header(FunctionId::new("0"), Rect::new(100.0, 0.0, 10.0, 10.0));
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0), op_anchor(2, 20.0), header]);
        assert_eq!(session.select(Some(0)).mode, Some(AnchorKind::Operation));
        assert_eq!(session.select(Some(1)).mode, None);
        assert_eq!(session.select(Some(2)).mode, Some(AnchorKind::FunctionHeader));
    }

    #[test]
    fn next_wraps_around() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0), op_anchor(2, 20.0)]);
        assert_eq!(session.next_index(), Some(0));
        session.select(Some(1));
        assert_eq!(session.next_index(), Some(0));
        assert_eq!(NavigationSession::default().next_index(), None);
    }

    #[test]
    fn replaced_anchors_are_resolved_by_identity() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0), op_anchor(2, 20.0)]);
        session.select(Some(1));
        // An insertion before op 2 shifts it one place down.
        let idx = session.replace_anchors(vec![op_anchor(1, 0.0), op_anchor(9, 20.0), op_anchor(2, 40.0)]);
        assert_eq!(idx, Some(2));
        assert_eq!(session.current().unwrap().target.op(), Some(OpId(2)));
    }

    #[test]
    fn missing_focus_target_leaves_selection() {
        let mut session = NavigationSession::new(vec![op_anchor(1, 0.0)]);
        session.select(Some(0));
        let missing = AnchorTarget::ListTail { list: ListId(7) };
        assert_eq!(session.focus_target(&missing), None);
        assert_eq!(session.current_index(), Some(0));
    }

    proptest! {
        #[test]
        fn distance_is_zero_inside_the_span(
            x in -500.0f64..500.0,
            y in -500.0f64..500.0,
            w in 0.0f64..200.0,
            h in 0.0f64..200.0,
            tx in 0.0f64..1.0,
            fy in -1000.0f64..1000.0,
        ) {
            let bounds = Rect::new(x, y, w, h);
            // Inside the x span: only the y gap counts.
            let inside_x = Point::new(x + tx * w, fy);
            let dy = if fy < y { y - fy } else if fy > y + h { fy - (y + h) } else { 0.0 };
            prop_assert!((focus_distance(inside_x, &bounds) - dy * dy).abs() < 1e-6);
            // Inside both spans: zero.
            let inside = Point::new(x + tx * w, y + tx * h);
            prop_assert_eq!(focus_distance(inside, &bounds), 0.0);
        }
    }
}
