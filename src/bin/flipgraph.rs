use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use flipgraph::{BackendKind, Graph, GraphDocument, NodeId, RenderSettings};

#[derive(Parser, Debug)]
#[command(name = "flipgraph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a graph document.
    Validate(GraphArgs),
    /// Re-export a graph document in canonical form.
    Normalize(NormalizeArgs),
    /// Render one node as a PNG.
    Render(RenderArgs),
    /// Render one node compositionally and print cache statistics.
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct NormalizeArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Compositional,
    Pointwise,
}

impl From<ModeChoice> for BackendKind {
    fn from(mode: ModeChoice) -> Self {
        match mode {
            ModeChoice::Compositional => BackendKind::Compositional,
            ModeChoice::Pointwise => BackendKind::Pointwise,
        }
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Node to render; defaults to the largest id.
    #[arg(long)]
    node: Option<u32>,

    /// Evaluator to use.
    #[arg(long, value_enum, default_value_t = ModeChoice::Compositional)]
    mode: ModeChoice,

    /// Render settings JSON; flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Raster width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Raster height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Point-wise supersampling grid edge.
    #[arg(long)]
    supersample: Option<u32>,

    /// Enable row-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Node to render; defaults to the largest id.
    #[arg(long)]
    node: Option<u32>,

    /// Render settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Normalize(args) => cmd_normalize(args),
        Command::Render(args) => cmd_render(args),
        Command::Stats(args) => cmd_stats(args),
    }
}

fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let doc = GraphDocument::from_path(path)?;
    Graph::from_document(&doc).with_context(|| format!("invalid graph '{}'", path.display()))
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<RenderSettings> {
    let Some(path) = path else {
        return Ok(RenderSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read settings '{}'", path.display()))?;
    RenderSettings::from_json_str(&text)
        .with_context(|| format!("invalid settings '{}'", path.display()))
}

/// The requested node, or the most recently added one.
fn target_node(graph: &Graph, node: Option<u32>) -> NodeId {
    node.map(NodeId)
        .or_else(|| graph.nodes().last().map(|n| n.id))
        .unwrap_or_else(|| graph.root_id())
}

fn cmd_validate(args: GraphArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.in_path)?;
    println!("ok: {} nodes, root {}", graph.len(), graph.root_id());
    Ok(())
}

fn cmd_normalize(args: NormalizeArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.in_path)?;
    let json = graph.to_document().to_json_string_pretty()?;
    match args.out {
        Some(out) => {
            std::fs::write(&out, json + "\n")
                .with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let graph = Arc::new(load_graph(&args.in_path)?);
    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(n) = args.supersample {
        settings.supersample = n;
    }
    if args.parallel {
        settings.threading.parallel = true;
    }
    if args.threads.is_some() {
        settings.threading.threads = args.threads;
    }

    let node = target_node(&graph, args.node);
    let mut backend = flipgraph::create_backend(args.mode.into(), graph, &settings)?;
    let frame = backend.render(node)?;
    if let Some(stats) = backend.pointwise_stats() {
        eprintln!(
            "pointwise: {} samples, {} steps, peak stack {}, {} exhausted pixels",
            stats.samples, stats.steps, stats.peak_stack_depth, stats.exhausted_pixels
        );
    }

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> anyhow::Result<()> {
    let graph = Arc::new(load_graph(&args.in_path)?);
    let settings = load_settings(args.settings.as_deref())?;
    let node = target_node(&graph, args.node);
    let mut backend = flipgraph::create_backend(BackendKind::Compositional, graph, &settings)?;
    backend.render(node)?;
    let stats = backend.cache_stats().unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
