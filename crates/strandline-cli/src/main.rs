//! Strandline command-line tools.
//!
//! Provides the `strandline` binary, which works on a module bundle: a JSON
//! file of the form `{"modules": {"<url>": <module>, ...}}`. Subcommands lay
//! out a module, print its computed stack effects or its anchors, and print
//! the order in which the bundle's modules must be saved.
//!
//! Output is JSON on stdout. Exit codes: 0 = success, 1 = layout or
//! resolution error, 3 = I/O or JSON error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use strandline_core::save::save_order;
use strandline_core::{Module, ModuleStore, ModuleUrl, StackEffect};
use strandline_view::{annotate_effects, layout_module, BuiltinTable, LayoutConfig};

/// Strandline diagram tools.
#[derive(Parser)]
#[command(name = "strandline", about = "Lay out and inspect stack programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the subcommands that lay out a module.
#[derive(clap::Args)]
struct LayoutArgs {
    /// Path to the module bundle.
    #[arg(short, long)]
    bundle: PathBuf,

    /// URL of the module to work on (default: the first in the bundle).
    #[arg(short, long)]
    module: Option<String>,

    /// Path to a JSON file of built-in functions: {"id": {"label", "numConsumed", "numProduced"}}.
    #[arg(long)]
    builtins: Option<PathBuf>,

    /// Path to a JSON layout configuration; missing keys keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Lay out a module and print the render tree.
    Layout {
        #[command(flatten)]
        args: LayoutArgs,
    },
    /// Compute and print the stack effect of every function of a module.
    Effects {
        #[command(flatten)]
        args: LayoutArgs,
    },
    /// Print the navigable anchors of a module in cursor order.
    Anchors {
        #[command(flatten)]
        args: LayoutArgs,
    },
    /// Print the bundle's modules in dependency order.
    SaveOrder {
        /// Path to the module bundle.
        #[arg(short, long)]
        bundle: PathBuf,
    },
}

#[derive(Deserialize)]
struct Bundle {
    modules: IndexMap<ModuleUrl, Module>,
}

#[derive(Serialize)]
struct EffectLine {
    function: String,
    name: String,
    #[serde(flatten)]
    effect: StackEffect,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Layout { args } => run_layout(&args),
        Commands::Effects { args } => run_effects(&args),
        Commands::Anchors { args } => run_anchors(&args),
        Commands::SaveOrder { bundle } => run_save_order(&bundle),
    };
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_layout(args: &LayoutArgs) -> i32 {
    let session = match Session::open(args) {
        Ok(session) => session,
        Err(code) => return code,
    };
    match layout_module(&session.store, &session.url, &session.builtins, &session.config) {
        Ok(layout) => {
            for diagnostic in &layout.layout.diagnostics {
                tracing::warn!("{:?}", diagnostic);
            }
            print_json(&layout)
        }
        Err(e) => {
            eprintln!("Layout error: {}", e);
            1
        }
    }
}

fn run_effects(args: &LayoutArgs) -> i32 {
    let mut session = match Session::open(args) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let effects = match annotate_effects(&mut session.store, &session.url, &session.builtins, &session.config) {
        Ok(effects) => effects,
        Err(e) => {
            eprintln!("Effect resolution error: {}", e);
            return 1;
        }
    };
    let module = match session.store.module(&session.url) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    // Report in the module's own function order.
    let lines: Vec<EffectLine> = module
        .functions
        .iter()
        .filter_map(|(id, function)| {
            effects
                .iter()
                .find(|(fid, _)| fid == id)
                .map(|(_, effect)| EffectLine {
                    function: id.to_string(),
                    name: function.name.clone(),
                    effect: *effect,
                })
        })
        .collect();
    print_json(&lines)
}

fn run_anchors(args: &LayoutArgs) -> i32 {
    let session = match Session::open(args) {
        Ok(session) => session,
        Err(code) => return code,
    };
    match layout_module(&session.store, &session.url, &session.builtins, &session.config) {
        Ok(layout) => print_json(&layout.layout.anchors),
        Err(e) => {
            eprintln!("Layout error: {}", e);
            1
        }
    }
}

fn run_save_order(bundle_path: &Path) -> i32 {
    let (store, urls) = match load_bundle(bundle_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    match save_order(&store, &urls) {
        Ok(order) => print_json(&order),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Everything a layout subcommand needs, loaded from its arguments.
struct Session {
    store: ModuleStore,
    url: ModuleUrl,
    builtins: BuiltinTable,
    config: LayoutConfig,
}

impl Session {
    /// Loads the bundle, builtins and configuration. On failure the error
    /// has been printed and the exit code is returned.
    fn open(args: &LayoutArgs) -> Result<Session, i32> {
        let (store, urls) = load_bundle(&args.bundle)?;

        let url = match (&args.module, urls.first()) {
            (Some(url), _) => ModuleUrl::new(url.as_str()),
            (None, Some(first)) => first.clone(),
            (None, None) => {
                eprintln!("Error: bundle '{}' holds no modules", args.bundle.display());
                return Err(1);
            }
        };
        if !store.contains(&url) {
            eprintln!("Error: module '{}' is not in the bundle", url);
            return Err(1);
        }

        let builtins = match &args.builtins {
            Some(path) => {
                let text = read_file(path)?;
                serde_json::from_str::<BuiltinTable>(&text).map_err(|e| {
                    eprintln!("Error: invalid builtins file '{}': {}", path.display(), e);
                    3
                })?
            }
            None => BuiltinTable::new(),
        };

        let config = match &args.config {
            Some(path) => {
                let text = read_file(path)?;
                LayoutConfig::from_json(&text).map_err(|e| {
                    eprintln!("Error: invalid config file '{}': {}", path.display(), e);
                    3
                })?
            }
            None => LayoutConfig::default(),
        };

        tracing::debug!("opened {} with {} builtins", url, builtins.len());
        Ok(Session {
            store,
            url,
            builtins,
            config,
        })
    }
}

/// Reads a bundle into a fresh store. Returns the module URLs in bundle
/// order.
fn load_bundle(path: &Path) -> Result<(ModuleStore, Vec<ModuleUrl>), i32> {
    let text = read_file(path)?;
    let bundle: Bundle = serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: invalid bundle '{}': {}", path.display(), e);
        3
    })?;

    let mut store = ModuleStore::new();
    let mut urls = Vec::with_capacity(bundle.modules.len());
    for (url, module) in bundle.modules {
        urls.push(url.clone());
        store.insert(url, module);
    }
    Ok((store, urls))
}

fn read_file(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })
}

/// Prints `value` as pretty JSON; returns the exit code.
fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            3
        }
    }
}
