use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use async_trait::async_trait;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mmsync::collab::{DiagramRenderer, HeadlessCanvas, StringBuffer};
use mmsync::config::SyncConfig;
use mmsync::error::{Error, RenderError};
use mmsync::graph_parser::parse_graph;
use mmsync::mode::ModeController;
use mmsync::prompt::BlockingPrompt;
use mmsync::sync::SyncController;

#[derive(Parser)]
#[command(
    name = "mmsync",
    about = "Round-trip flowchart text through the graph editor and print the canonical form"
)]
struct Cli {
    /// Input file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Header to use when the input has none
    #[arg(long)]
    header: Option<String>,

    /// Indentation width for node and edge lines
    #[arg(long)]
    indent: Option<usize>,

    /// Print node and edge counts to stderr
    #[arg(long)]
    stats: bool,

    /// Exit with status 1 if the input is not already canonical
    #[arg(long)]
    check: bool,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Stands in for the diagram renderer: validates the text and reports its
/// size.
struct SummaryRenderer;

#[async_trait(?Send)]
impl DiagramRenderer for SummaryRenderer {
    async fn render(&self, _render_id: &str, source: &str) -> Result<String, RenderError> {
        let parsed = parse_graph(source);
        if parsed.header.is_none() {
            return Err(RenderError::Syntax("missing `graph` header".to_string()));
        }
        Ok(format!(
            "{} nodes, {} edges",
            parsed.nodes.len(),
            parsed.edges.len()
        ))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(file: Option<&PathBuf>) -> Result<String, Error> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(Error::Stdin)?;
            Ok(buf)
        }
    }
}

fn load_config(cli: &Cli) -> Result<SyncConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(header) = &cli.header {
        config.default_header = header.clone();
    }
    if let Some(indent) = cli.indent {
        config.indent = indent;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let config = load_config(cli)?;
    let input = read_input(cli.file.as_ref())?;

    let renderer: Rc<dyn DiagramRenderer> = Rc::new(SummaryRenderer);
    let graph = SyncController::new(
        config,
        Rc::clone(&renderer),
        Some(Box::new(HeadlessCanvas::default())),
        Box::new(BlockingPrompt::declining()),
    );
    let mut editor = ModeController::new(Box::new(StringBuffer::new(&input)), graph, renderer);

    futures::executor::block_on(async {
        editor.enter_graph_mode().await;
        editor.enter_text_mode().await;
    });
    let output = editor.document_text();

    if cli.stats {
        match (editor.output().markup(), editor.output().error()) {
            (_, Some(error)) => eprintln!("{error}"),
            (Some(summary), None) => eprintln!("{summary}"),
            (None, None) => {}
        }
    }

    if cli.check {
        if output != input.trim_end() {
            eprintln!("not canonical");
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
