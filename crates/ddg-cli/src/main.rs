use ddg_core::visibility::{self, first_n};
use ddg_core::{
    AssemblerOptions, DdgModel, Density, EdgesAndVertices, FocalNode, GraphAssembler,
    parse_payload,
};
use ddg_layout::{
    Builtin, Edge, GraphvizCommand, LayoutBackend, LayoutDone, LayoutInput, LayoutManager,
    LayoutOptions, Outcome, SizeVertex,
};
use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Graph(ddg_core::Error),
    Layout(Arc<ddg_layout::Error>),
    Cancelled,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Graph(err) => write!(f, "{err}"),
            CliError::Layout(err) => write!(f, "layout failed: {err}"),
            CliError::Cancelled => write!(f, "layout was cancelled"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ddg_core::Error> for CliError {
    fn from(value: ddg_core::Error) -> Self {
        Self::Graph(value)
    }
}

impl From<Arc<ddg_layout::Error>> for CliError {
    fn from(value: Arc<ddg_layout::Error>) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Graph,
    Layout,
    Diff,
}

/// Hops revealed when neither `--visibility` nor `--hops` is given.
const DEFAULT_HOPS: usize = 2;

#[derive(Debug, Default)]
struct Args {
    command: Command,
    positional: Vec<String>,
    pretty: bool,
    focal_service: Option<String>,
    focal_operation: Option<String>,
    visibility: Option<String>,
    next_visibility: Option<String>,
    hops: Option<usize>,
    density: Option<Density>,
    hide_op: bool,
    options: Option<String>,
    rankdir: Option<sirenia::RankDir>,
    ranksep: Option<f64>,
    nodesep: Option<f64>,
    dot_edges: bool,
    graphviz: Option<String>,
    node_width: f64,
    node_height: f64,
}

/// Contents of an `--options` file. Both sections are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    layout: LayoutOptions,
    assembler: AssemblerOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphOut<'a> {
    visibility_key: &'a str,
    #[serde(flatten)]
    graph: &'a EdgesAndVertices,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut<'a> {
    visibility_key: &'a str,
    #[serde(flatten)]
    layout: &'a LayoutDone,
}

fn usage() -> &'static str {
    "ddg-cli\n\
\n\
USAGE:\n\
  ddg-cli [graph] --focal-service <name> [--focal-operation <name>] [--visibility <key>|--hops <n>] [--density ppe|uvd|opl|mc] [--hide-op] [--options <path>] [--pretty] [<payload>|-]\n\
  ddg-cli layout --focal-service <name> [graph flags] [--next-visibility <key>] [--rankdir TB|BT|LR|RL] [--ranksep <in>] [--nodesep <in>] [--dot-edges] [--graphviz <program>] [--node-width <px>] [--node-height <px>] [--pretty] [<payload>|-]\n\
  ddg-cli diff <old-key> <new-key>\n\
\n\
NOTES:\n\
  - If <payload> is omitted or '-', the payload is read from stdin.\n\
  - The payload is a JSON array of paths, each an array of {\"service\", \"operation\"} hops.\n\
  - Without --visibility, every path element within --hops (default 2) of the focal node is shown.\n\
  - layout --next-visibility lays out the first key, then the second one incrementally, and prints the second.\n\
  - --graphviz (or DDG_GRAPHVIZ) runs an external Graphviz binary instead of the builtin engine.\n\
  - RUST_LOG controls diagnostics on stderr (default: warn).\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_num<T: std::str::FromStr>(raw: &str) -> Result<T, CliError> {
    raw.parse::<T>().map_err(|_| CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        node_width: 72.0,
        node_height: 36.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    let mut first = true;
    while let Some(a) = it.next() {
        let leading = std::mem::replace(&mut first, false);
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "graph" if leading => args.command = Command::Graph,
            "layout" if leading => args.command = Command::Layout,
            "diff" if leading => args.command = Command::Diff,
            "--pretty" => args.pretty = true,
            "--hide-op" => args.hide_op = true,
            "--dot-edges" => args.dot_edges = true,
            "--focal-service" => args.focal_service = Some(next_value(&mut it)?.clone()),
            "--focal-operation" => args.focal_operation = Some(next_value(&mut it)?.clone()),
            "--visibility" => args.visibility = Some(next_value(&mut it)?.clone()),
            "--next-visibility" => args.next_visibility = Some(next_value(&mut it)?.clone()),
            "--hops" => args.hops = Some(parse_num(next_value(&mut it)?)?),
            "--density" => {
                args.density = Some(
                    next_value(&mut it)?
                        .parse::<Density>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--options" => args.options = Some(next_value(&mut it)?.clone()),
            "--rankdir" => {
                args.rankdir = Some(
                    next_value(&mut it)?
                        .parse::<sirenia::RankDir>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--ranksep" => args.ranksep = Some(parse_num(next_value(&mut it)?)?),
            "--nodesep" => args.nodesep = Some(parse_num(next_value(&mut it)?)?),
            "--graphviz" => args.graphviz = Some(next_value(&mut it)?.clone()),
            "--node-width" => args.node_width = parse_num(next_value(&mut it)?)?,
            "--node-height" => args.node_height = parse_num(next_value(&mut it)?)?,
            "-" => args.positional.push("-".to_string()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            value => args.positional.push(value.to_string()),
        }
    }

    let max_positional = match args.command {
        Command::Diff => 2,
        Command::Graph | Command::Layout => 1,
    };
    if args.positional.len() > max_positional {
        return Err(CliError::Usage(usage()));
    }
    if !(args.node_width > 0.0 && args.node_height > 0.0) {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load_config(args: &Args) -> Result<Config, CliError> {
    let mut config = match &args.options {
        Some(path) => serde_json::from_str::<Config>(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(density) = args.density {
        config.assembler.density = density;
    }
    if args.hide_op {
        config.assembler.show_op = false;
    }
    if let Some(rankdir) = args.rankdir {
        config.layout.rankdir = rankdir;
    }
    if let Some(ranksep) = args.ranksep {
        config.layout.ranksep = ranksep;
    }
    if let Some(nodesep) = args.nodesep {
        config.layout.nodesep = nodesep;
    }
    if args.dot_edges {
        config.layout.use_dot_edges = true;
    }
    Ok(config)
}

fn build_assembler(args: &Args, config: &Config) -> Result<GraphAssembler, CliError> {
    let Some(service) = args.focal_service.clone() else {
        return Err(CliError::Usage(usage()));
    };
    let text = read_input(args.positional.first().map(String::as_str))?;
    let payload = parse_payload(&text)?;
    let focal = FocalNode::new(service, args.focal_operation.clone());
    let model = DdgModel::new(&payload, &focal)?;
    Ok(GraphAssembler::with_options(
        Arc::new(model),
        config.assembler,
    ))
}

fn initial_key(args: &Args, assembler: &GraphAssembler) -> String {
    match &args.visibility {
        Some(key) => key.clone(),
        None => {
            let hops = args.hops.unwrap_or(DEFAULT_HOPS);
            first_n(assembler.model().visibility_indices_within(hops).end)
        }
    }
}

fn build_backend(args: &Args) -> Arc<dyn LayoutBackend> {
    let program = args
        .graphviz
        .clone()
        .or_else(|| std::env::var("DDG_GRAPHVIZ").ok().filter(|p| !p.trim().is_empty()));
    match program {
        Some(program) => {
            tracing::debug!(%program, "using external Graphviz");
            Arc::new(GraphvizCommand::new(program))
        }
        None => Arc::new(Builtin),
    }
}

fn layout_of(
    manager: &mut LayoutManager,
    input: LayoutInput,
) -> Result<LayoutDone, CliError> {
    let handles = manager.get_layout(input);
    match block_on(handles.layout)? {
        Outcome::Ready(done) => Ok(done),
        Outcome::Cancelled => Err(CliError::Cancelled),
    }
}

fn layout_input(
    graph: &EdgesAndVertices,
    args: &Args,
    previous: Option<&LayoutDone>,
) -> LayoutInput {
    let edges: Vec<Edge> = graph.edges.iter().map(Edge::from).collect();
    let vertices: Vec<SizeVertex> = graph
        .vertices
        .iter()
        .map(|v| SizeVertex::new(v.key.clone(), args.node_width, args.node_height))
        .collect();
    match previous {
        Some(previous) => LayoutInput::from_previous(previous, &edges, &vertices),
        None => LayoutInput::fresh(edges, vertices),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Diff => {
            let (Some(old), Some(new)) = (args.positional.first(), args.positional.get(1)) else {
                return Err(CliError::Usage(usage()));
            };
            let diff = visibility::compare(old, new)?;
            write_json(&diff, args.pretty)
        }
        Command::Graph => {
            let config = load_config(&args)?;
            let mut assembler = build_assembler(&args, &config)?;
            let key = initial_key(&args, &assembler);
            let graph = assembler.get_edges_and_vertices(&key)?;
            write_json(
                &GraphOut {
                    visibility_key: &key,
                    graph: &graph,
                },
                args.pretty,
            )
        }
        Command::Layout => {
            let config = load_config(&args)?;
            let mut assembler = build_assembler(&args, &config)?;
            let mut manager = LayoutManager::with_backend(config.layout, build_backend(&args));

            let key = initial_key(&args, &assembler);
            let graph = assembler.get_edges_and_vertices(&key)?;
            let mut done = layout_of(&mut manager, layout_input(&graph, &args, None))?;
            let mut key = key;

            if let Some(next) = args.next_visibility.clone() {
                let graph = assembler.get_edges_and_vertices(&next)?;
                done = layout_of(&mut manager, layout_input(&graph, &args, Some(&done)))?;
                key = next;
            }
            manager.stop_and_release();

            for warning in &done.warnings {
                tracing::warn!("{warning}");
            }
            write_json(
                &LayoutOut {
                    visibility_key: &key,
                    layout: &done,
                },
                args.pretty,
            )
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        match err {
            CliError::Usage(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
            err => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
    }
}
