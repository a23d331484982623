//! AuthorStudio CLI: inspect track changes and edit plot canvases offline.
//!
//! Usage:
//!   authorstudio changes <doc.json>
//!   authorstudio consolidate <doc.json> [--accept ID]... [--reject ID]... [-o OUT]
//!   authorstudio canvas <subcommand> <canvas.json> ...
//!   authorstudio canvas import|export <book> <version> <file> [--db path]

use authorstudio::canvas::EdgeKind;
use authorstudio::config::Config;
use authorstudio::storage::{export_canvas, import_canvas};
use authorstudio::{
    accept, consolidate, extract_changes, reject, CanvasGraph, CanvasKey, CanvasStore, DocNode,
    EdgeAction, NodeId, OpenStore, SqliteStore,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "authorstudio",
    version,
    about = "Track-changes and plot canvas tools for AuthorStudio projects"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tracked changes in a chapter document
    Changes {
        /// Editor JSON snapshot of the chapter
        doc: PathBuf,
        /// Print the change list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply decisions and write the consolidated chapter
    Consolidate {
        doc: PathBuf,
        /// Change id to accept (repeatable)
        #[arg(long = "accept", value_name = "ID")]
        accepts: Vec<String>,
        /// Change id to reject (repeatable)
        #[arg(long = "reject", value_name = "ID")]
        rejects: Vec<String>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect and edit canvas files
    Canvas {
        #[command(subcommand)]
        action: CanvasAction,
    },
}

#[derive(Subcommand)]
enum CanvasAction {
    /// Report invariant violations in a canvas file as stored
    Check { file: PathBuf },
    /// Print the derived edge list
    Edges { file: PathBuf },
    /// Link two nodes
    Connect {
        file: PathBuf,
        source: String,
        target: String,
    },
    /// Convert an edge: delete, parent-child or linked
    Convert {
        file: PathBuf,
        edge_id: String,
        action: String,
    },
    /// Remove a node and every reference to it
    RemoveNode { file: PathBuf, id: String },
    /// Import a canvas file into the database
    Import {
        book: String,
        version: String,
        file: PathBuf,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Export a canvas from the database to a file
    Export {
        book: String,
        version: String,
        file: PathBuf,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn read_document(path: &Path) -> Result<DocNode, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid document '{}': {}", path.display(), e))
}

fn read_canvas(path: &Path) -> Result<CanvasGraph, String> {
    import_canvas(path)
        .map(CanvasGraph::from_data)
        .map_err(|e| format!("cannot load canvas '{}': {}", path.display(), e))
}

fn write_canvas(path: &Path, graph: &CanvasGraph) -> Result<(), String> {
    export_canvas(path, &graph.to_data())
        .map_err(|e| format!("cannot write canvas '{}': {}", path.display(), e))
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let db_path = match db {
        Some(path) => path,
        None => Config::load_default()
            .map_err(|e| e.to_string())?
            .db_path(),
    };
    SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn cmd_changes(path: &Path, json: bool) -> i32 {
    let doc = match read_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let changes = extract_changes(&doc);
    if json {
        return match serde_json::to_string_pretty(&changes) {
            Ok(out) => {
                println!("{}", out);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }
    if changes.is_empty() {
        println!("No tracked changes.");
        return 0;
    }
    println!("{:<16}  {:<9}  {:<16}  {:<9}  TEXT", "ID", "TYPE", "AUTHOR", "STATUS");
    println!("{}", "-".repeat(72));
    for change in changes {
        println!(
            "{:<16}  {:<9}  {:<16}  {:<9}  {}",
            change.id,
            change.change_type.as_str(),
            change.author_name,
            change.resolution.as_str(),
            change.text.replace('\n', " ")
        );
    }
    0
}

fn cmd_consolidate(path: &Path, accepts: &[String], rejects: &[String], output: Option<&Path>) -> i32 {
    let mut doc = match read_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    for id in accepts {
        if doc.find_change(id).is_none() {
            eprintln!("Warning: change '{}' not found", id);
        }
        doc = accept(&doc, id);
    }
    for id in rejects {
        if doc.find_change(id).is_none() {
            eprintln!("Warning: change '{}' not found", id);
        }
        doc = reject(&doc, id);
    }

    let out = match serde_json::to_string_pretty(&consolidate(&doc)) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match output {
        Some(file) => match std::fs::write(file, out) {
            Ok(()) => {
                println!("Wrote {}", file.display());
                0
            }
            Err(e) => {
                eprintln!("Error: cannot write '{}': {}", file.display(), e);
                1
            }
        },
        None => {
            println!("{}", out);
            0
        }
    }
}

fn cmd_canvas_check(path: &Path) -> i32 {
    // Inspect the file as stored; loading a graph repairs it
    let data = match import_canvas(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: cannot load canvas '{}': {}", path.display(), e);
            return 1;
        }
    };
    let violations = CanvasGraph::inspect(&data);
    if violations.is_empty() {
        println!("{} nodes, no violations", data.nodes.len());
        return 0;
    }
    for violation in &violations {
        println!("{}", violation);
    }
    println!("{} violations; loading the canvas repairs them", violations.len());
    1
}

fn cmd_canvas_edges(path: &Path) -> i32 {
    let graph = match read_canvas(path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let edges = graph.derive_edges();
    if edges.is_empty() {
        println!("No edges.");
        return 0;
    }
    println!("{:<12}  {:<28}  {:<28}", "KIND", "SOURCE", "TARGET");
    println!("{}", "-".repeat(72));
    for edge in edges {
        let kind = match edge.kind {
            EdgeKind::ParentChild => "parent",
            EdgeKind::Linked => "linked",
        };
        println!("{:<12}  {:<28}  {:<28}", kind, edge.source.as_str(), edge.target.as_str());
    }
    0
}

fn cmd_canvas_connect(path: &Path, source: &str, target: &str) -> i32 {
    let mut graph = match read_canvas(path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match graph.on_connect(&NodeId::from(source), &NodeId::from(target)) {
        Ok(false) => {
            println!("Already linked");
            0
        }
        Ok(true) => match write_canvas(path, &graph) {
            Ok(()) => {
                println!("Linked {} and {}", source, target);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_canvas_convert(path: &Path, edge_id: &str, action: &str) -> i32 {
    let action: EdgeAction = match action.parse() {
        Ok(action) => action,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut graph = match read_canvas(path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let state = match graph.convert_edge(edge_id, action) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Err(e) = write_canvas(path, &graph) {
        eprintln!("Error: {}", e);
        return 1;
    }
    println!("Edge {} is now {:?}", edge_id, state);
    0
}

fn cmd_canvas_remove_node(path: &Path, id: &str) -> i32 {
    let mut graph = match read_canvas(path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let removed = match graph.remove_node(&NodeId::from(id)) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match write_canvas(path, &graph) {
        Ok(()) => {
            println!("Removed '{}' ({})", removed.name, removed.id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_canvas_import(store: &SqliteStore, key: &CanvasKey, file: &Path) -> i32 {
    // Repair before storing so the database only ever holds consistent canvases
    let graph = match read_canvas(file) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match store.save_canvas(key, &graph.to_data()) {
        Ok(()) => {
            println!("Imported {} nodes into {}", graph.node_count(), key);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_canvas_export(store: &SqliteStore, key: &CanvasKey, file: &Path) -> i32 {
    let data = match store.load_canvas(key) {
        Ok(Some(data)) => data,
        Ok(None) => {
            eprintln!("Error: no canvas stored for {}", key);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match export_canvas(file, &data) {
        Ok(()) => {
            println!("Exported {} to {}", key, file.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn run_store_action(db: Option<PathBuf>, action: impl FnOnce(&SqliteStore) -> i32) -> i32 {
    match open_store(db) {
        Ok(store) => action(&store),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Changes { doc, json } => cmd_changes(&doc, json),
        Commands::Consolidate {
            doc,
            accepts,
            rejects,
            output,
        } => cmd_consolidate(&doc, &accepts, &rejects, output.as_deref()),
        Commands::Canvas { action } => match action {
            CanvasAction::Check { file } => cmd_canvas_check(&file),
            CanvasAction::Edges { file } => cmd_canvas_edges(&file),
            CanvasAction::Connect {
                file,
                source,
                target,
            } => cmd_canvas_connect(&file, &source, &target),
            CanvasAction::Convert {
                file,
                edge_id,
                action,
            } => cmd_canvas_convert(&file, &edge_id, &action),
            CanvasAction::RemoveNode { file, id } => cmd_canvas_remove_node(&file, &id),
            CanvasAction::Import {
                book,
                version,
                file,
                db,
            } => {
                let key = CanvasKey::new(book, version);
                run_store_action(db, |store| cmd_canvas_import(store, &key, &file))
            }
            CanvasAction::Export {
                book,
                version,
                file,
                db,
            } => {
                let key = CanvasKey::new(book, version);
                run_store_action(db, |store| cmd_canvas_export(store, &key, &file))
            }
        },
    };
    std::process::exit(code);
}
