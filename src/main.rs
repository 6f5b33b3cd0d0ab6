//! Facestate CLI
//!
//! Usage:
//!   facestate --trace session.trace          # Replay a candidate trace
//!   facestate --detections < frames.jsonl    # Classify + stabilize detector output
//!   facestate --interactive                  # Type one tag per frame
//!   facestate --serve                        # HTTP API server
//!   facestate --trace t.trace --json         # JSON output

use std::io::{self, BufRead, Write};

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facestate::core::{
    candidate_from_name, run_server, save_report, AssetCatalog, EngineConfig, FramePipeline,
    PriorityClassifier, ReportBuilder, SignalClassifier, StabilityEngine, TraceParser,
};
use facestate::types::{Candidate, FrameDetections, StateOutput};
use facestate::{Result, StabilityError, DEFAULT_ASSET_EXT, PIPELINE_QUEUE_CAPACITY, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "facestate",
    version = VERSION,
    about = "Facestate - stabilize noisy per-frame expression signals for an avatar",
    long_about = "Facestate turns a per-frame stream of expression candidates into a\n\
                  stable avatar state. A new expression is confirmed only after its\n\
                  consecutive-frame count exceeds its threshold; frames with no signal\n\
                  hold the current state.\n\n\
                  Modes:\n  \
                  --trace FILE   Replay a trace script (e.g. 'smile x6', '-', 'think')\n  \
                  --detections   Read FrameDetections as JSON Lines from stdin\n  \
                  --interactive  Type one tag per line ('-' for no signal)\n  \
                  --serve        HTTP API server mode"
)]
struct Args {
    /// Trace script to replay
    #[arg(short, long)]
    trace: Option<String>,

    /// Read detector output (JSON Lines) from stdin
    #[arg(short, long)]
    detections: bool,

    /// Interactive mode - one tag per line from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Engine configuration (JSON); built-in tuning if omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show counters and asset per frame
    #[arg(long)]
    verbose: bool,

    /// Directory holding one asset per tag (<tag>.<ext>)
    #[arg(long)]
    assets_dir: Option<String>,

    /// Asset file extension
    #[arg(long, default_value = DEFAULT_ASSET_EXT)]
    asset_ext: String,

    /// Output size the assets are prepared for, WIDTHxHEIGHT
    #[arg(long, default_value = "640x480", value_parser = parse_size)]
    asset_size: (u32, u32),

    /// Directory for session reports (default: ./reports)
    #[arg(long, default_value = "./reports")]
    report_dir: String,

    /// Disable session report generation
    #[arg(long)]
    no_report: bool,
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(|c| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
    let h = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
    Ok((w, h))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(&args).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays parseable; RUST_LOG overrides the level
fn init_logging(verbose: bool) {
    let default = if verbose { "facestate=debug" } else { "facestate=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: &Args) -> Result<()> {
    if args.serve {
        return run_serve(args).await;
    }

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let catalog = match &args.assets_dir {
        Some(dir) => {
            let catalog = AssetCatalog::from_dir(dir, &config.tags, &args.asset_ext, args.asset_size);
            catalog.verify()?;
            Some(catalog)
        }
        None => None,
    };
    let engine = StabilityEngine::new(config)?;
    let ctx = Output { args, catalog };

    let report = if let Some(path) = &args.trace {
        run_trace(path, engine, &ctx)?
    } else if args.detections {
        run_detections(engine, &ctx).await?
    } else {
        run_interactive(engine, &ctx)?
    };

    if !args.no_report && report.frames() > 0 {
        let path = save_report(&report.finish(), &args.report_dir)?;
        if !args.json {
            println!("{}", format!("Report saved: {}", path).bright_black());
        }
    }
    Ok(())
}

/// Output settings shared by every mode
struct Output<'a> {
    args: &'a Args,
    catalog: Option<AssetCatalog>,
}

impl Output<'_> {
    /// Closing line for interactive mode; none under --json
    fn farewell(&self, frames: u64) -> Option<String> {
        (!self.args.json).then(|| format!("\nSession ended. Frames: {}", frames))
    }

    fn print(&self, output: &StateOutput) {
        if self.args.json {
            match serde_json::to_string(output) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!(error = %e, "could not serialize output"),
            }
            return;
        }

        if self.args.no_color {
            println!("{}", output.to_parseable_string());
        } else {
            println!("{}", output.to_terminal_string());
        }

        if self.args.verbose {
            println!("  counters: {}", output.counters_string());
            if let Some(asset) = self.catalog.as_ref().and_then(|c| c.lookup(&output.state)) {
                println!("  asset: {}", asset.path.display());
            }
        } else if output.changed {
            if let Some(asset) = self.catalog.as_ref().and_then(|c| c.lookup(&output.state)) {
                println!("  → {}", asset.path.display());
            }
        }
    }
}

/// Replay a trace script frame by frame
fn run_trace(path: &str, mut engine: StabilityEngine, out: &Output<'_>) -> Result<ReportBuilder> {
    let text = std::fs::read_to_string(path)?;
    let frames = TraceParser::new().parse_for(&text, engine.config())?;
    info!(frames = frames.len(), path, "replaying trace");

    let mut report = ReportBuilder::new(engine.state().clone());
    for candidate in &frames {
        let output = engine.update(candidate)?;
        report.record(&output);
        out.print(&output);
    }
    Ok(report)
}

/// Detector output on stdin → classifier → pipeline
async fn run_detections(engine: StabilityEngine, out: &Output<'_>) -> Result<ReportBuilder> {
    let classifier = PriorityClassifier::new();
    let mut report = ReportBuilder::new(engine.state().clone());
    let (pipeline, mut outputs) = FramePipeline::spawn_with_outputs(engine, PIPELINE_QUEUE_CAPACITY);

    // Capture side: parse and classify on its own task
    let producer = pipeline.sender();
    let capture = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let detections: FrameDetections = serde_json::from_str(&line).map_err(|e| {
                StabilityError::InvalidTrace {
                    line: line_no,
                    reason: e.to_string(),
                }
            })?;
            if producer.send(classifier.classify(&detections)).await.is_err() {
                break;
            }
        }
        Ok::<_, StabilityError>(())
    });

    // Processing side: print in frame order until capture is done
    let printer = async {
        while let Some(result) = outputs.recv().await {
            match result {
                Ok(output) => {
                    report.record(&output);
                    out.print(&output);
                }
                Err(e) => eprintln!("{} {}", "rejected:".yellow(), e),
            }
        }
    };

    let captured = async move {
        let result = capture
            .await
            .map_err(|e| StabilityError::PipelineClosed(e.to_string()))?;
        pipeline.shutdown().await?;
        result
    };

    let (captured, ()) = tokio::join!(captured, printer);
    captured?;
    Ok(report)
}

/// Run interactive mode
fn run_interactive(mut engine: StabilityEngine, out: &Output<'_>) -> Result<ReportBuilder> {
    // --json keeps stdout to JSON Lines only
    if !out.args.json {
        print_header(engine.config(), out.args.no_color);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut report = ReportBuilder::new(engine.state().clone());

    loop {
        if !out.args.json {
            print!("[{}] > ", engine.state().to_string().color(engine.state().color()));
            stdout.flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            if let Some(line) = out.farewell(engine.frame_count()) {
                println!("{}", line);
            }
            break;
        }
        // Empty line = a frame where nothing was detected
        let candidate = if line.is_empty() {
            Candidate::NoSignal
        } else {
            candidate_from_name(line)
        };

        match engine.update(&candidate) {
            Ok(output) => {
                report.record(&output);
                out.print(&output);
            }
            Err(e) => eprintln!("{} {}", "⚠".yellow(), e),
        }
    }
    Ok(report)
}

/// Print header
fn print_header(config: &EngineConfig, no_color: bool) {
    let title = format!("Facestate v{} - Interactive", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "════════════════════════════════════════".bold());
        println!("  {}", title.bold());
        println!("{}", "════════════════════════════════════════".bold());
    }
    let tags: Vec<String> = config
        .priority
        .iter()
        .map(|t| format!("{}>{}", t, config.thresholds.get(t).copied().unwrap_or_default()))
        .collect();
    println!("Tags (priority, frames to exceed): {}", tags.join("  "));
    println!("Type a tag per frame, '-' or empty for no signal, 'quit' to exit.");
    println!();
}

/// Run HTTP API server
async fn run_serve(args: &Args) -> Result<()> {
    let report_dir = (!args.no_report).then(|| args.report_dir.clone());
    println!("Facestate API v{} on {}", VERSION, args.addr);
    println!("  POST   /session/new        - Create session");
    println!("  GET    /session/:id        - Get status");
    println!("  POST   /session/:id/frame  - Ingest frame");
    println!("  GET    /session/:id/report - Report so far");
    println!("  DELETE /session/:id        - End session");
    println!("  WS     /ws/:id             - Live updates");
    println!("  GET    /health             - Health check");
    run_server(&args.addr, report_dir).await
}
