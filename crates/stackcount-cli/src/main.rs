//! stackcount CLI — command-line interface for stacked-carton counting.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use stackcount::{
    cluster_layers, prepare, ClusterVariant, Detection, ProcessConfig, StackProcessor, TemplateDb,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "stackcount")]
#[command(about = "Count cartons in a palletized stack from object-detector bounding boxes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full counting pipeline over a detections file.
    Count(CliCountArgs),

    /// Run one clustering variant standalone (diagnostic isolation).
    Cluster(CliClusterArgs),

    /// Print the configured pile templates.
    PileInfo(CliPileInfoArgs),
}

#[derive(Debug, Clone, Args)]
struct CliCountArgs {
    /// Path to the detections file (JSON array of detection records).
    #[arg(long)]
    detections: PathBuf,

    /// Path to the pile template database (JSON).
    #[arg(long)]
    piles: PathBuf,

    /// Pile type identifier to count against.
    #[arg(long)]
    pile_id: u32,

    /// Path to write the processing result (JSON). Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write a comprehensive versioned debug dump (JSON).
    #[arg(long)]
    debug_json: Option<PathBuf>,

    /// Minimum detector confidence for a detection to be considered.
    #[arg(long, default_value = "0.65")]
    confidence: f32,

    /// Minimum top-layer coverage ratio for a "full" verdict.
    #[arg(long, default_value = "0.85")]
    coverage_threshold: f32,

    /// Maximum gap coefficient of variation for a "full" verdict.
    #[arg(long, default_value = "0.4")]
    cv_gap_threshold: f32,

    /// Vertical split threshold as a fraction of the median box height.
    #[arg(long, default_value = "0.6")]
    gap_ratio: f32,

    /// Clustering variant to run.
    #[arg(long, value_enum, default_value_t = ClusterVariantArg::BoxRoi)]
    variant: ClusterVariantArg,
}

#[derive(Debug, Clone, Args)]
struct CliClusterArgs {
    /// Path to the detections file (JSON array of detection records).
    #[arg(long)]
    detections: PathBuf,

    /// Minimum detector confidence for a detection to be considered.
    #[arg(long, default_value = "0.65")]
    confidence: f32,

    /// Vertical split threshold as a fraction of the median box height.
    #[arg(long, default_value = "0.6")]
    gap_ratio: f32,

    /// Clustering variant to run.
    #[arg(long, value_enum, default_value_t = ClusterVariantArg::BoxRoi)]
    variant: ClusterVariantArg,
}

#[derive(Debug, Clone, Args)]
struct CliPileInfoArgs {
    /// Path to the pile template database (JSON).
    #[arg(long)]
    piles: PathBuf,

    /// Restrict output to one pile type.
    #[arg(long)]
    pile_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ClusterVariantArg {
    Basic,
    Roi,
    BoxRoi,
}

impl ClusterVariantArg {
    fn to_core(self) -> ClusterVariant {
        match self {
            Self::Basic => ClusterVariant::Basic,
            Self::Roi => ClusterVariant::RoiConstrained,
            Self::BoxRoi => ClusterVariant::BoxRoiConstrained,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count(args) => run_count(&args),
        Commands::Cluster(args) => run_cluster(&args),
        Commands::PileInfo(args) => run_pile_info(&args),
    }
}

fn load_detections(path: &Path) -> CliResult<Vec<Detection>> {
    let data = std::fs::read_to_string(path).map_err(|e| -> CliError {
        format!("failed to read detections {}: {}", path.display(), e).into()
    })?;
    let detections: Vec<Detection> = serde_json::from_str(&data).map_err(|e| -> CliError {
        format!("invalid detections JSON {}: {}", path.display(), e).into()
    })?;
    Ok(detections)
}

// ── count ──────────────────────────────────────────────────────────────

fn run_count(args: &CliCountArgs) -> CliResult<()> {
    let detections = load_detections(&args.detections)?;
    tracing::info!("Loaded {} detections", detections.len());

    let templates = TemplateDb::from_json_file(&args.piles)?;
    tracing::info!("Loaded {} pile templates", templates.n_templates());

    let mut config = ProcessConfig::default();
    config.scene.confidence_threshold = args.confidence;
    config.classify.coverage_threshold = args.coverage_threshold;
    config.classify.cv_gap_threshold = args.cv_gap_threshold;
    config.cluster.gap_ratio = args.gap_ratio;
    config.cluster.variant = args.variant.to_core();

    let processor = StackProcessor::with_config(templates, config);

    let (result, debug_dump) = if args.debug_json.is_some() {
        let (r, d) = processor.process_stack_with_debug(&detections, args.pile_id)?;
        (r, Some(d))
    } else {
        (processor.process_stack(&detections, args.pile_id)?, None)
    };

    tracing::info!(
        "Counted {} cartons across {} layers ({:?} strategy)",
        result.total_count,
        result.n_layers,
        result.strategy,
    );

    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Result written to {}", path.display());
        }
        None => println!("{}", json),
    }

    if let Some(debug_path) = &args.debug_json {
        let dump = debug_dump.expect("debug dump present when debug_json is set");
        let debug_json = serde_json::to_string_pretty(&dump)?;
        std::fs::write(debug_path, &debug_json)?;
        tracing::info!("Debug dump written to {}", debug_path.display());
    }

    Ok(())
}

// ── cluster ────────────────────────────────────────────────────────────

fn run_cluster(args: &CliClusterArgs) -> CliResult<()> {
    let detections = load_detections(&args.detections)?;

    let mut config = ProcessConfig::default();
    config.scene.confidence_threshold = args.confidence;
    config.cluster.gap_ratio = args.gap_ratio;
    config.cluster.variant = args.variant.to_core();

    let scene = prepare(&detections, &config.scene)?;
    let outcome = cluster_layers(&scene.boxes, &scene.roi, &config.cluster);

    println!("clustering: {:?}", config.cluster.variant);
    println!("  boxes in:        {}", outcome.n_boxes_in);
    println!("  rejected:        {}", outcome.n_rejected);
    println!("  split threshold: {:.1} px", outcome.split_threshold_px);
    println!("  layers:          {}", outcome.layers.len());
    for layer in &outcome.layers {
        println!(
            "    layer {}: {} boxes, y=[{:.0}, {:.0}], coverage {:.2}",
            layer.index,
            layer.box_count(),
            layer.y_min,
            layer.y_max,
            layer.coverage,
        );
    }

    Ok(())
}

// ── pile-info ──────────────────────────────────────────────────────────

fn run_pile_info(args: &CliPileInfoArgs) -> CliResult<()> {
    let templates = TemplateDb::from_json_file(&args.piles)?;

    println!("pile template database");
    println!("  configured pile types: {}", templates.n_templates());

    for template in templates.templates() {
        if let Some(only) = args.pile_id {
            if template.pile_id != only {
                continue;
            }
        }
        println!(
            "  pile {}: '{}', {} layers, {} cartons full, per-layer {:?}",
            template.pile_id,
            template.name,
            template.n_layers(),
            template.total(),
            template.layer_counts,
        );
    }

    if let Some(only) = args.pile_id {
        if templates.get(only).is_none() {
            return Err(format!("pile_id {} not found in database", only).into());
        }
    }

    Ok(())
}
