//! Whole-module layout and effect annotation.
//!
//! # Architecture
//!
//! - [`annotate_effects`]: recomputes the cached declared effect of every
//!   function of a module from its code strand, callees before callers.
//! - [`layout_module`]: lays out every function of a module and stacks the
//!   results under a title row, each function preceded by a
//!   function-header anchor.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use strandline_core::{CallTarget, FunctionId, ModuleStore, ModuleUrl, StackEffect};

use crate::anchor::Anchor;
use crate::builder::{BuiltinTable, ModuleResolver, StrandBuilder};
use crate::config::LayoutConfig;
use crate::error::ViewError;
use crate::geometry::{Affine, Point, QuarterTurn, Rect};
use crate::layout::{layout_strand, RenderNode, StrandLayout};

// ---------------------------------------------------------------------------
// Effect annotation
// ---------------------------------------------------------------------------

/// Builds the caller -> callee graph over the functions of one module.
///
/// Only local calls are edges; imported functions are annotated in their own
/// module.
pub fn build_call_graph(store: &ModuleStore, url: &ModuleUrl) -> Result<DiGraph<FunctionId, ()>, ViewError> {
    let module = store.module(url)?;
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&FunctionId, NodeIndex> = HashMap::new();
    for fid in module.functions.keys() {
        nodes.insert(fid, graph.add_node(fid.clone()));
    }
    for (fid, function) in &module.functions {
        for list in function.block.lists() {
            for target in list.call_targets() {
                if let CallTarget::Local(callee) = target {
                    if let Some(&to) = nodes.get(callee) {
                        graph.update_edge(nodes[fid], to, ());
                    }
                }
            }
        }
    }
    Ok(graph)
}

/// Recomputes each function's declared effect from its code strand.
///
/// Functions are visited callee-first. Functions on a call cycle are
/// computed against the cached effects of the other members of the cycle,
/// which may be stale; a warning is logged. Functions with an empty body
/// keep their declared effect. Returns the effect of every function in
/// visiting order.
pub fn annotate_effects(
    store: &mut ModuleStore,
    url: &ModuleUrl,
    builtins: &BuiltinTable,
    config: &LayoutConfig,
) -> Result<Vec<(FunctionId, StackEffect)>, ViewError> {
    let graph = build_call_graph(store, url)?;
    let mut annotated = Vec::with_capacity(graph.node_count());

    // tarjan_scc yields components in reverse topological order: callees first.
    for component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1 || graph.contains_edge(component[0], component[0]);
        if cyclic {
            let names: Vec<_> = component.iter().map(|idx| graph[*idx].to_string()).collect();
            tracing::warn!(
                "call cycle in {} through {:?}; using cached effects",
                url,
                names
            );
        }
        for idx in component {
            let fid = &graph[idx];
            let effect = {
                let function = store.function(url, fid)?;
                if function.block.code.is_empty() {
                    function.effect()
                } else {
                    let resolver = ModuleResolver::new(store, url, builtins);
                    StrandBuilder::new(&resolver, config)
                        .code(&function.block.code)?
                        .effect
                }
            };
            let function = store
                .module_mut(url)?
                .function_mut(fid)
                .ok_or_else(|| strandline_core::CoreError::FunctionNotFound {
                    module: url.clone(),
                    function: fid.clone(),
                })?;
            if function.effect() != effect {
                tracing::debug!("function {} in {}: {} -> {}", fid, url, function.effect(), effect);
                function.set_effect(effect);
            }
            annotated.push((fid.clone(), effect));
        }
    }
    Ok(annotated)
}

// ---------------------------------------------------------------------------
// Module layout
// ---------------------------------------------------------------------------

/// Where one function ended up in a module layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionPlacement {
    pub function: FunctionId,
    pub name: String,
    /// Bounds of the function's diagram.
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleLayout {
    pub title: String,
    #[serde(flatten)]
    pub layout: StrandLayout,
    pub functions: Vec<FunctionPlacement>,
}

/// Lays out every function of module `url`, in insertion order.
///
/// Each function's block is laid out on its own, then turned a quarter turn
/// counter-clockwise and scaled so that its band is `10 * ln(width)` tall.
/// The function's name precedes the band, written vertically when it fits.
pub fn layout_module(
    store: &ModuleStore,
    url: &ModuleUrl,
    builtins: &BuiltinTable,
    config: &LayoutConfig,
) -> Result<ModuleLayout, ViewError> {
    let module = store.module(url)?;
    let resolver = ModuleResolver::new(store, url, builtins);
    let builder = StrandBuilder::new(&resolver, config);

    let mut layout = StrandLayout::default();
    layout.nodes.push(RenderNode::Text {
        origin: Point::new(0.0, config.title_height - config.text_bump),
        rotation: 0,
        scale: 1.0,
        text: module.name.clone(),
    });
    layout.width = config.token_width(&module.name);
    let mut functions = Vec::with_capacity(module.functions.len());
    let mut y = config.title_height;

    for (fid, function) in &module.functions {
        let strand = builder.block(&function.block)?;
        let code = layout_strand(&strand, 0, config);
        let code_width = code.width.max(std::f64::consts::E);
        let section_height = code_width.ln() * 10.0;
        let band = Affine::translation(0.0, y + section_height)
            .scale(section_height / code_width)
            .rotate(QuarterTurn::CounterClockwise);
        let bounds = band.map_rect(&Rect::new(0.0, 0.0, code.width, code.height));

        let name_width = config.token_width(&function.name);
        let label = if name_width < section_height {
            Affine::translation(0.0, y + name_width).rotate(QuarterTurn::CounterClockwise)
        } else {
            Affine::translation(-name_width, y + config.line_height)
        };
        layout.nodes.push(RenderNode::Text {
            origin: label.apply(Point::default()),
            rotation: label.rotation_degrees(),
            scale: 1.0,
            text: function.name.clone(),
        });
        let label_box = label.map_rect(&Rect::new(0.0, -config.line_height, name_width, config.line_height));
        layout.anchors.push(Anchor::function_header(fid.clone(), label_box));

        layout.width = layout.width.max(bounds.right());
        layout.embed(code, &band);
        functions.push(FunctionPlacement {
            function: fid.clone(),
            name: function.name.clone(),
            bounds,
        });
        y += section_height;
    }
    layout.height = y;
    tracing::debug!(
        "laid out {} functions of {} ({} anchors)",
        functions.len(),
        url,
        layout.anchors.len()
    );

    Ok(ModuleLayout {
        title: module.name.clone(),
        layout,
        functions,
    })
}
