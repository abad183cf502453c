//! Strand building, layout and navigation.
//!
//! The pipeline runs Block -> [`StrandBuilder`] -> optimized [`Strand`] ->
//! [`layout_strand`] -> render nodes and [`Anchor`]s -> [`NavigationSession`].
//! [`Editor`] ties it to a [`strandline_core::ModuleStore`] and a view
//! transform, and rebuilds everything after each edit.

pub mod anchor;
pub mod builder;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod module_layout;
pub mod optimizer;
pub mod strand;
pub mod viewer;

// Re-export commonly used types
pub use anchor::{Anchor, AnchorKind, AnchorTarget, GrowAction};
pub use builder::{BuiltinTable, EffectResolver, ModuleResolver, Resolution, StrandBuilder};
pub use config::LayoutConfig;
pub use cursor::{focus_distance, NavigationSession, SelectionChange};
pub use editor::{Cut, Editor, Step};
pub use error::ViewError;
pub use geometry::{Affine, Point, Rect};
pub use layout::{layout_strand, Diagnostic, RenderNode, StrandLayout};
pub use module_layout::{annotate_effects, layout_module, ModuleLayout};
pub use strand::{Strand, StrandItem};
pub use viewer::ViewTransform;
