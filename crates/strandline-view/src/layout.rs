//! Strand layout: geometry and anchors for a strand.
//!
//! A flat strand is laid out top to bottom, one row per item. Alongside the
//! rows runs a production stack: every value an item produces opens a mark
//! at the item's row, and every value a later item consumes closes the most
//! recent open mark with a bracket spanning the rows in between. Items are
//! indented by the number of open marks, so the stack depth is visible as
//! the left margin.
//!
//! Branching items (lambdas, conditionals) lay out each sub-strand on its
//! own and embed it as a band rotated a quarter turn. The rotation
//! direction alternates with recursion depth so nested bands stay readable.
//!
//! Balance problems never abort layout. They are logged, returned as
//! [`Diagnostic`]s and, for conditional branches, drawn as markers.

use serde::Serialize;
use strandline_core::{ListId, OpId};

use crate::anchor::{Anchor, AnchorTarget, GrowAction};
use crate::config::LayoutConfig;
use crate::geometry::{Affine, Point, QuarterTurn, Rect};
use crate::strand::{Strand, StrandBody, StrandItem};

/// Number of bracket shades; brackets cycle through them by stack depth.
pub const BRACKET_SHADES: usize = 4;

/// A drawable primitive, in the frame of the layout that holds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderNode {
    /// Token text. `origin` is the start of the baseline.
    Text {
        origin: Point,
        rotation: i32,
        scale: f64,
        text: String,
    },
    /// The span of one stack value, from the row producing it to the row
    /// consuming it.
    Bracket { rect: Rect, shade: usize },
    /// Separator between consecutive sub-strands of an item.
    Divider { from: Point, to: Point },
    /// A conditional branch whose effect differs from the declared one.
    Marker { center: Point, radius: f64, side: EffectSide },
    /// The "append here" mark at the end of a list.
    TailLine { rect: Rect },
    /// The mark opening a lambda or conditional.
    Header { rect: Rect },
}

impl RenderNode {
    pub fn transformed(self, t: &Affine) -> Self {
        match self {
            RenderNode::Text {
                origin,
                rotation,
                scale,
                text,
            } => RenderNode::Text {
                origin: t.apply(origin),
                rotation: normalize_degrees(rotation + t.rotation_degrees()),
                scale: scale * t.scale_factor(),
                text,
            },
            RenderNode::Bracket { rect, shade } => RenderNode::Bracket {
                rect: t.map_rect(&rect),
                shade,
            },
            RenderNode::Divider { from, to } => RenderNode::Divider {
                from: t.apply(from),
                to: t.apply(to),
            },
            RenderNode::Marker { center, radius, side } => RenderNode::Marker {
                center: t.apply(center),
                radius: radius * t.scale_factor(),
                side,
            },
            RenderNode::TailLine { rect } => RenderNode::TailLine { rect: t.map_rect(&rect) },
            RenderNode::Header { rect } => RenderNode::Header { rect: t.map_rect(&rect) },
        }
    }
}

fn normalize_degrees(degrees: i32) -> i32 {
    let d = degrees.rem_euclid(360);
    if d > 180 {
        d - 360
    } else {
        d
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectSide {
    Consumed,
    Produced,
}

/// A non-fatal problem found during layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Diagnostic {
    /// An item consumed more values than were open in `list`.
    BalanceInconsistency { list: ListId },
    /// Branch `branch` of conditional `cond` (held in `list`) does not match
    /// the conditional's declared effect.
    BranchMismatch {
        list: ListId,
        cond: OpId,
        branch: usize,
        side: EffectSide,
        expected: u32,
        actual: u32,
    },
}

/// Geometry, drawables and anchors of a laid-out strand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrandLayout {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<RenderNode>,
    /// In navigation order.
    pub anchors: Vec<Anchor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StrandLayout {
    /// Moves another layout's contents into this one through `t`.
    pub fn embed(&mut self, other: StrandLayout, t: &Affine) {
        self.nodes
            .extend(other.nodes.into_iter().map(|node| node.transformed(t)));
        self.anchors
            .extend(other.anchors.into_iter().map(|anchor| anchor.transformed(t)));
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Lays out a strand. `recur_depth` is the nesting depth of the strand's
/// band, which picks the rotation of any bands nested inside it.
pub fn layout_strand(strand: &Strand, recur_depth: u32, config: &LayoutConfig) -> StrandLayout {
    let mut layout = match &strand.body {
        StrandBody::Guarded { guard, code } => layout_guarded(guard, code, recur_depth, config),
        StrandBody::Flat { list, items } => {
            let mut state = FlatLayoutState::new(*list, strand.effect.consumed, config);
            for item in items {
                state.item(item, recur_depth);
            }
            state.finish()
        }
    };
    if let Some(cond) = strand.tail_of_conditional {
        if let Some(last) = layout.anchors.last_mut() {
            last.grow = Some(GrowAction::GrowConditional { cond });
        }
    }
    layout
}

/// The guard's layout above the code's layout.
fn layout_guarded(guard: &Strand, code: &Strand, recur_depth: u32, config: &LayoutConfig) -> StrandLayout {
    let guard_layout = layout_strand(guard, recur_depth, config);
    let code_layout = layout_strand(code, recur_depth, config);
    let code_y = guard_layout.height + config.guard_gap;

    let mut layout = StrandLayout {
        width: guard_layout.width.max(code_layout.width),
        height: code_y + code_layout.height,
        ..StrandLayout::default()
    };
    layout.embed(guard_layout, &Affine::IDENTITY);
    layout.embed(code_layout, &Affine::translation(0.0, code_y));
    layout
}

/// Running state of a flat-strand layout.
struct FlatLayoutState<'c> {
    config: &'c LayoutConfig,
    list: ListId,
    y: f64,
    max_x: f64,
    /// Row (y) of each value produced but not yet consumed; top of stack last.
    marks: Vec<f64>,
    layout: StrandLayout,
}

impl<'c> FlatLayoutState<'c> {
    fn new(list: ListId, consumed: u32, config: &'c LayoutConfig) -> Self {
        FlatLayoutState {
            config,
            list,
            y: config.line_margin,
            max_x: 0.0,
            // Inputs of the strand are open from the top edge.
            marks: vec![0.0; consumed as usize],
            layout: StrandLayout::default(),
        }
    }

    fn indent(&self, outdent: u32) -> f64 {
        (self.marks.len() as f64 - f64::from(outdent) + self.config.indent) * self.config.stack_spacing
    }

    fn close_mark(&mut self) {
        let x = self.marks.len() as f64 * self.config.stack_spacing;
        let Some(y1) = self.marks.pop() else {
            tracing::warn!("consumed/produced inconsistency in list {}", self.list);
            self.layout
                .diagnostics
                .push(Diagnostic::BalanceInconsistency { list: self.list });
            return;
        };
        self.layout.nodes.push(RenderNode::Bracket {
            rect: Rect::new(x, y1, self.config.stack_spacing, self.y - y1),
            shade: self.marks.len() % BRACKET_SHADES,
        });
    }

    fn item(&mut self, item: &StrandItem, recur_depth: u32) {
        for _ in 0..item.effect.consumed {
            self.close_mark();
        }
        let start_x = self.indent(item.depth);
        match &item.sub_strands {
            Some(subs) if !subs.is_empty() => self.branching(item, subs, start_x, recur_depth),
            _ => self.leaf(item, start_x),
        }
        for _ in 0..item.effect.produced {
            self.marks.push(self.y);
        }
        self.y += self.config.line_margin;
    }

    fn leaf(&mut self, item: &StrandItem, start_x: f64) {
        let config = self.config;
        self.y += config.line_height;
        let mut word_x = start_x;
        for token in &item.tokens {
            let width = config.token_width(&token.label);
            self.layout.nodes.push(RenderNode::Text {
                origin: Point::new(word_x, self.y - config.text_bump),
                rotation: 0,
                scale: 1.0,
                text: token.label.clone(),
            });
            self.layout.anchors.push(Anchor::operation(
                AnchorTarget::Operation {
                    list: token.source.list,
                    op: token.source.op,
                },
                Rect::new(word_x, self.y - config.line_height, width, config.line_height),
            ));
            let chars = token.label.chars().count().max(1) as f64;
            word_x += width + width / (chars * 2.0);
        }
        self.max_x = self.max_x.max(word_x);
    }

    fn branching(&mut self, item: &StrandItem, subs: &[Strand], start_x: f64, recur_depth: u32) {
        let config = self.config;
        // The header stands for the lambda / conditional operation itself.
        let header = Rect::new(start_x, self.y, config.header_width, config.line_margin);
        self.layout.nodes.push(RenderNode::Header { rect: header });
        if let Some(token) = item.tokens.first() {
            self.layout.anchors.push(Anchor::operation(
                AnchorTarget::Operation {
                    list: token.source.list,
                    op: token.source.op,
                },
                header,
            ));
        }
        self.y += config.line_margin;
        self.max_x = self.max_x.max(start_x + config.header_width);

        for (idx, sub) in subs.iter().enumerate() {
            let mut rec = layout_strand(sub, recur_depth + 1, config);
            let (sub_width, sub_height) = (rec.width, rec.height);
            if item.sync_effects {
                self.check_branch(item, idx, sub, &mut rec);
            }
            if idx != 0 {
                self.layout.nodes.push(RenderNode::Divider {
                    from: Point::new(start_x, self.y),
                    to: Point::new(start_x + sub_height, self.y),
                });
            }
            let transform = if recur_depth % 2 == 0 {
                self.y += sub_width;
                Affine::translation(start_x + sub_height, self.y - sub_width).rotate(QuarterTurn::Clockwise)
            } else {
                let t = Affine::translation(start_x, self.y + sub_width).rotate(QuarterTurn::CounterClockwise);
                self.y += sub_width;
                t
            };
            self.layout.embed(rec, &transform);
            self.max_x = self.max_x.max(start_x + sub_height);
        }
    }

    /// Flags a conditional branch whose effect differs from the declared
    /// one, marking the offending edge of its band.
    fn check_branch(&mut self, item: &StrandItem, idx: usize, sub: &Strand, rec: &mut StrandLayout) {
        let cond = item.tokens.first().map_or(OpId::UNASSIGNED, |t| t.source.op);
        let checks = [
            (EffectSide::Consumed, item.effect.consumed, sub.effect.consumed, 0.0),
            (EffectSide::Produced, item.effect.produced, sub.effect.produced, rec.height),
        ];
        for (side, expected, actual, marker_y) in checks {
            if expected == actual {
                continue;
            }
            tracing::warn!(
                "branch {} of cond {} {} {} values, expected {}",
                idx,
                cond,
                match side {
                    EffectSide::Consumed => "consumes",
                    EffectSide::Produced => "produces",
                },
                actual,
                expected
            );
            rec.nodes.push(RenderNode::Marker {
                center: Point::new(rec.width / 2.0, marker_y),
                radius: self.config.marker_radius,
                side,
            });
            self.layout.diagnostics.push(Diagnostic::BranchMismatch {
                list: self.list,
                cond,
                branch: idx,
                side,
                expected,
                actual,
            });
        }
    }

    fn finish(mut self) -> StrandLayout {
        let config = self.config;
        let tail_x = self.indent(0);
        let tail = Rect::new(tail_x, self.y, config.tail_width, 1.0);
        self.layout.nodes.push(RenderNode::TailLine { rect: tail });
        self.layout
            .anchors
            .push(Anchor::operation(AnchorTarget::ListTail { list: self.list }, tail));
        self.max_x = self.max_x.max(tail_x + config.tail_width);

        while !self.marks.is_empty() {
            self.close_mark();
        }
        self.layout.width = self.max_x;
        self.layout.height = self.y;
        self.layout
    }
}
