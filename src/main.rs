//! har-timeline CLI - Request timelines for slide decks
//!
//! Loads a HAR capture, normalizes it and renders or inspects the timeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use har_timeline::{config::TimelineConfig, html, loader, slides::Deck};
use har_timeline_core::{fit_selection, ResourceType, Selection, Timeline};

/// har-timeline: render HAR captures as zoomable request timelines
#[derive(Parser, Debug)]
#[command(name = "har-timeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Deck configuration (tags, layout, slide states)
    #[arg(short, long, global = true, default_value = "timeline.json", env = "HAR_TIMELINE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the HTML timeline
    Render(RenderArgs),

    /// Print the normalized requests
    Records(RecordsArgs),

    /// Compute the zoom that frames a selection
    Fit(FitArgs),

    /// Replay a sequence of slide states
    Walk(WalkArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Path to the HAR capture
    har_file: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "timeline")]
    output_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct RecordsArgs {
    /// Path to the HAR capture
    har_file: PathBuf,

    /// Output format: table or json
    #[arg(long, default_value = "table")]
    format: String,
}

#[derive(Parser, Debug)]
struct FitArgs {
    /// Path to the HAR capture
    har_file: PathBuf,

    /// Frame the requests carrying this tag
    #[arg(long, conflicts_with_all = ["kind", "domain", "state"])]
    tag: Option<String>,

    /// Frame the requests of this type (image, script, style, font, other)
    #[arg(long, conflicts_with_all = ["domain", "state"])]
    kind: Option<ResourceType>,

    /// Frame the requests served from this domain
    #[arg(long, conflicts_with = "state")]
    domain: Option<String>,

    /// Frame the selection of a configured slide state
    #[arg(long)]
    state: Option<String>,

    /// Margin around the selection (0.1 = 10%); defaults to the config's
    #[arg(long)]
    margin: Option<f64>,
}

#[derive(Parser, Debug)]
struct WalkArgs {
    /// Path to the HAR capture
    har_file: PathBuf,

    /// States to enter, in order; defaults to every configured state
    states: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = TimelineConfig::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load config: {:?}", cli.config))?;

    match cli.command {
        Commands::Render(args) => render_command(args, &config).await,
        Commands::Records(args) => records_command(args, &config).await,
        Commands::Fit(args) => fit_command(args, &config).await,
        Commands::Walk(args) => walk_command(args, &config).await,
    }
}

async fn load(har_file: &Path, config: &TimelineConfig) -> Result<Timeline> {
    loader::load_timeline(har_file, config)
        .await
        .with_context(|| format!("Failed to load capture: {:?}", har_file))
}

async fn render_command(args: RenderArgs, config: &TimelineConfig) -> Result<()> {
    let timeline = load(&args.har_file, config).await?;

    let deck = Deck::from_config(&timeline, config);
    let views = deck.state_views();

    html::write_timeline(&timeline, config, &views, &args.output_dir)
        .with_context(|| "Failed to write timeline")?;

    info!(
        "Wrote timeline with {} states to {:?}",
        views.len(),
        args.output_dir
    );

    Ok(())
}

async fn records_command(args: RecordsArgs, config: &TimelineConfig) -> Result<()> {
    let timeline = load(&args.har_file, config).await?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }
        _ => {
            println!(
                "## {} ({} requests, onLoad {:.0} ms)\n",
                timeline.page_id,
                timeline.len(),
                timeline.on_load
            );
            for (index, record) in timeline.records.iter().enumerate() {
                let tags: Vec<&str> = record.active_tags().collect();
                println!(
                    "{:>4}  {:>7.0} {:>7.0}  {:<6}  {}{}",
                    index,
                    record.start,
                    record.end,
                    record.kind,
                    record.url,
                    if tags.is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", tags.join(", "))
                    }
                );
            }
            println!();
            for (kind, count) in timeline.count_by_kind() {
                println!("  - {}: {}", kind, count);
            }
        }
    }

    Ok(())
}

async fn fit_command(args: FitArgs, config: &TimelineConfig) -> Result<()> {
    let timeline = load(&args.har_file, config).await?;

    let (selection, state_margin) = if let Some(name) = &args.state {
        let state = config
            .state(name)
            .with_context(|| format!("State '{}' not found in config", name))?;
        (state.select.clone(), Some(config.margin_for(state)))
    } else if let Some(tag) = args.tag {
        (Selection::Tag(tag), None)
    } else if let Some(kind) = args.kind {
        (Selection::Kind(kind), None)
    } else if let Some(domain) = args.domain {
        (Selection::Domain(domain), None)
    } else {
        (Selection::All, None)
    };

    let margin = args.margin.or(state_margin).unwrap_or(config.margin);
    let scale = fit_selection(&timeline.records, &selection, margin, &config.layout)
        .with_context(|| format!("Cannot frame {}", selection))?;

    println!("{} (margin {}): scale {}", selection, margin, scale);

    Ok(())
}

async fn walk_command(args: WalkArgs, config: &TimelineConfig) -> Result<()> {
    let timeline = load(&args.har_file, config).await?;
    let deck = Deck::from_config(&timeline, config);

    let states = if args.states.is_empty() {
        deck.state_names().to_vec()
    } else {
        args.states
    };

    if states.is_empty() {
        warn!("No slide states configured");
        return Ok(());
    }

    for step in deck.walk(&states)? {
        let highlight = if step.viewport.highlight.is_empty() {
            "-".to_string()
        } else {
            step.viewport.highlight.join(", ")
        };
        println!(
            "{:<20} {:?}  scale {}  highlight {}",
            step.state, step.transition, step.viewport.scale, highlight
        );
        if let Some(err) = &step.viewport.error {
            warn!("{}: {}", step.state, err);
        }
    }

    Ok(())
}
