//! Saving and publishing edited modules.
//!
//! Modules must be written in dependency order: a module that refs another
//! module being saved is written after it, so that it can record the hash
//! of what it depends on. The order comes from a topological sort of the
//! ref graph restricted to the modules being saved; a cycle among them is
//! reported as [`CoreError::CircularDependency`].

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::error::CoreError;
use crate::id::ModuleUrl;
use crate::module::{ForkRecord, Module, ModuleRef};
use crate::store::ModuleStore;

/// A module serialized for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedModule {
    pub url: ModuleUrl,
    pub body: String,
    /// Lowercase hex blake3 digest of `body`.
    pub hash: String,
    pub size: u64,
}

impl SavedModule {
    /// A ref to the module as it was saved.
    pub fn saved_ref(&self) -> ModuleRef {
        ModuleRef {
            url: self.url.clone(),
            hash: Some(self.hash.clone()),
            size: Some(self.size),
        }
    }
}

/// Serializes a module the way it is written to disk.
pub fn serialize_module(url: &ModuleUrl, module: &Module) -> Result<SavedModule, CoreError> {
    let body = serde_json::to_string(module)?;
    Ok(SavedModule {
        url: url.clone(),
        hash: content_hash(&body),
        size: body.len() as u64,
        body,
    })
}

pub fn content_hash(body: &str) -> String {
    blake3::hash(body.as_bytes()).to_hex().to_string()
}

/// Orders `urls` so that every module comes after the modules (among
/// `urls`) it refs.
pub fn save_order(store: &ModuleStore, urls: &[ModuleUrl]) -> Result<Vec<ModuleUrl>, CoreError> {
    let mut graph: DiGraph<ModuleUrl, ()> = DiGraph::new();
    let nodes: HashMap<&ModuleUrl, NodeIndex> =
        urls.iter().map(|url| (url, graph.add_node(url.clone()))).collect();

    for url in urls {
        let dependent = nodes[url];
        for module_ref in &store.module(url)?.refs {
            if let Some(&dependency) = nodes.get(&module_ref.url) {
                graph.update_edge(dependency, dependent, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|idx| graph[idx].clone()).collect()),
        Err(_) => {
            let modules = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
                .unwrap_or_default()
                .into_iter()
                .map(|idx| graph[idx].clone())
                .collect();
            Err(CoreError::CircularDependency { modules })
        }
    }
}

/// Serializes `urls` in dependency order, marking each module's
/// work-in-progress flag first.
pub fn save_modules(
    store: &mut ModuleStore,
    urls: &[ModuleUrl],
    work_in_progress: bool,
) -> Result<Vec<SavedModule>, CoreError> {
    let order = save_order(store, urls)?;
    let mut saved = Vec::with_capacity(order.len());
    for url in order {
        let module = store.module_mut(&url)?;
        module.work_in_progress = work_in_progress;
        let written = serialize_module(&url, module)?;
        tracing::debug!("saved {} ({} bytes, hash {})", url, written.size, written.hash);
        saved.push(written);
    }
    Ok(saved)
}

/// Result of publishing a set of modules.
#[derive(Debug, Clone)]
pub struct Published {
    /// The saved (non-work-in-progress) form of each module, in save order.
    pub saved: Vec<SavedModule>,
    /// Old URL -> next-version URL, in the order of the input URLs.
    pub remap: Vec<(ModuleUrl, ModuleUrl)>,
}

/// Publishes `urls`: saves them as finished, then moves each module to a
/// next-version URL with a fork record pointing at what was saved, and
/// rewrites refs between the published modules to the new URLs. Rewritten
/// refs lose their hash and size, since the new versions are unsaved.
pub fn publish(store: &mut ModuleStore, urls: &[ModuleUrl], date: &str) -> Result<Published, CoreError> {
    let saved = save_modules(store, urls, false)?;
    let saved_refs: HashMap<&ModuleUrl, ModuleRef> =
        saved.iter().map(|module| (&module.url, module.saved_ref())).collect();

    let mut remap = Vec::with_capacity(urls.len());
    for url in urls {
        let next = url.next_version();
        let mut module = store
            .remove(url)
            .ok_or_else(|| CoreError::ModuleNotFound { url: url.clone() })?;
        module.forked_from = Some(ForkRecord {
            saved: saved_refs.get(url).cloned(),
            date: date.to_string(),
        });
        store.insert(next.clone(), module);
        remap.push((url.clone(), next));
    }

    let lookup: HashMap<&ModuleUrl, &ModuleUrl> = remap.iter().map(|(old, new)| (old, new)).collect();
    for (_, new) in &remap {
        for module_ref in &mut store.module_mut(new)?.refs {
            if let Some(&rewritten) = lookup.get(&module_ref.url) {
                module_ref.url = rewritten.clone();
                module_ref.hash = None;
                module_ref.size = None;
            }
        }
    }

    Ok(Published { saved, remap })
}
