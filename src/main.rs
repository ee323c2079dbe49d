use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use rom_die_reader::die_pipeline::classify::DEFAULT_SAMPLE_COUNT;
use rom_die_reader::die_pipeline::export::FX2500_SPLIT_ROW;
use rom_die_reader::die_pipeline::geometry::presets;
use rom_die_reader::die_pipeline::{
    CalibrationDescriptor, ClassificationStrategy, ClusterConfig, OverrideTable, PhotoReader, Photograph,
    PipelineTimings, ReadConfig, ReferenceDiscriminant, ReportWriter, RomRead, RomReadPipeline, TiffCompression,
};
use rom_die_reader::logger;

#[derive(Parser)]
#[command(name = "rom-die-reader")]
#[command(about = "Read mask ROM contents from calibrated die photographs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one photograph, apply overrides and dump the bits.
    Read(ReadArgs),

    /// Read two photographs and merge them at a split row.
    Combine(CombineArgs),

    /// Write the feature image of a photograph as a TIFF.
    Feature(FeatureArgs),

    /// Derive a reference discriminant from randomly sampled cells.
    Train(TrainArgs),

    /// List the built-in calibration descriptors.
    Presets {
        /// Print each descriptor as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Discriminant,
    Cluster,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    Deflate,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::Deflate => TiffCompression::Deflate,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    /// Classification strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::Cluster)]
    strategy: StrategyArg,

    /// Discriminant JSON written by `train`; required with `--strategy discriminant`.
    #[arg(long)]
    discriminant: Option<PathBuf>,

    /// Patch radius for clustering (default: scaled to the photograph width).
    #[arg(long)]
    radius: Option<usize>,

    /// Z-score patches against their neighbourhood before clustering.
    #[arg(long)]
    normalize: bool,

    /// Centroid updates per tile.
    #[arg(long, default_value = "10")]
    iterations: usize,

    /// Stop a tile early once its squared centroid displacement drops below this.
    #[arg(long)]
    epsilon: Option<f64>,

    /// Tile height and width in cells.
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"])]
    tile_size: Option<Vec<usize>>,

    /// Override file (`row col bit` per line).
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Skip the declared-size check on the photograph.
    #[arg(long)]
    no_validate: bool,

    /// Where to write the dump (default: stdout).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReadArgs {
    /// Descriptor JSON file or preset name.
    photo: String,

    #[command(flatten)]
    classify: ClassifyArgs,

    /// Write an overlay TIFF marking the cells read as 1.
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CombineArgs {
    /// Photograph supplying the rows above the split.
    #[arg(long, default_value = "fx2500-2")]
    top: String,

    /// Photograph supplying the split row and below.
    #[arg(long, default_value = "fx2500")]
    bottom: String,

    #[arg(long, default_value_t = FX2500_SPLIT_ROW)]
    split_row: usize,

    /// Apply the built-in FX-2500 corrections before any override file.
    #[arg(long)]
    fx2500_overrides: bool,

    /// Write an override template listing the cells the photographs disagree on.
    #[arg(long)]
    disagreements: Option<PathBuf>,

    #[command(flatten)]
    classify: ClassifyArgs,
}

#[derive(Debug, Clone, Args)]
struct FeatureArgs {
    /// Descriptor JSON file or preset name.
    photo: String,

    /// Output TIFF path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, value_enum, default_value_t = CompressionArg::Lzw)]
    compression: CompressionArg,
}

#[derive(Debug, Clone, Args)]
struct TrainArgs {
    /// Descriptor JSON file or preset name.
    photo: String,

    /// Output discriminant JSON.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    samples: usize,

    #[arg(long, default_value = "3")]
    radius: usize,

    #[arg(long)]
    normalize: bool,

    /// Threshold on the projection (default: widest gap between samples).
    #[arg(long)]
    threshold: Option<f32>,

    /// Seed for cell sampling.
    #[arg(long, default_value = "0")]
    seed: u64,
}

/// A preset name or a path to a descriptor JSON file.
fn resolve_photo(spec: &str) -> anyhow::Result<CalibrationDescriptor> {
    if let Some(descriptor) = presets::by_name(spec) {
        return Ok(descriptor);
    }
    CalibrationDescriptor::from_json_file(spec)
        .with_context(|| format!("`{spec}` is neither a preset nor a readable descriptor"))
}

fn read_config(args: &ClassifyArgs, base_overrides: OverrideTable) -> anyhow::Result<ReadConfig> {
    let mut overrides = base_overrides;
    if let Some(path) = &args.overrides {
        let table = OverrideTable::from_file(path)
            .with_context(|| format!("loading overrides from {}", path.display()))?;
        overrides.extend_from(&table);
    }

    let strategy = match args.strategy {
        StrategyArg::Discriminant => {
            // The built-in MK-51 constants were fitted to raw intensities and
            // read nearly every cell as 1 on a feature map.
            let Some(path) = &args.discriminant else {
                bail!("--strategy discriminant needs --discriminant (write one with `train`)");
            };
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let discriminant = serde_json::from_str::<ReferenceDiscriminant>(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            ClassificationStrategy::Discriminant(discriminant)
        }
        StrategyArg::Cluster => {
            if args.discriminant.is_some() {
                warn!("--discriminant has no effect with clustering");
            }
            ClassificationStrategy::TileCluster(ClusterConfig {
                iterations: args.iterations,
                convergence_epsilon: args.epsilon,
                ..ClusterConfig::default()
            })
        }
    };

    let mut builder = ReadConfig::builder()
        .strategy(strategy)
        .overrides(overrides)
        .validate_dimensions(!args.no_validate);
    if let Some(radius) = args.radius {
        builder = builder.radius(radius);
    }
    if args.normalize {
        builder = builder.normalize(true);
    }
    if let Some(size) = &args.tile_size {
        let [rows, cols] = size.as_slice() else {
            bail!("--tile-size takes ROWS COLS");
        };
        builder = builder.tile_size(*rows, *cols);
    }
    Ok(builder.build())
}

fn emit_dump<R: PhotoReader, W: ReportWriter>(
    pipeline: &RomReadPipeline<R, W>,
    read: &RomRead,
    out: Option<&Path>,
    timings: &mut PipelineTimings,
) -> anyhow::Result<()> {
    match out {
        Some(path) => pipeline
            .write_dump_with_timings(&read.bits, path, timings)
            .with_context(|| format!("writing dump to {}", path.display())),
        None => {
            println!("{}", pipeline.dump_with_timings(&read.bits, timings));
            Ok(())
        }
    }
}

fn run_read(args: ReadArgs) -> anyhow::Result<()> {
    let descriptor = resolve_photo(&args.photo)?;
    let pipeline = RomReadPipeline::new(read_config(&args.classify, OverrideTable::new())?);

    let (read, mut timings) = pipeline
        .read_photo_with_timings(&descriptor)
        .with_context(|| format!("reading {}", descriptor.name))?;

    for ranking in &read.rankings {
        if let Some(cell) = ranking.borderline.first() {
            info!(row = cell.row, col = cell.col, margin = cell.margin, "Least certain cell");
        }
    }

    if let Some(path) = &args.overlay {
        let photo = pipeline.load(&descriptor)?;
        let mut file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        pipeline.write_overlay_tiff(&photo, &read.bits, true, &mut file)?;
        info!(path = %path.display(), "Wrote overlay");
    }

    emit_dump(&pipeline, &read, args.classify.out.as_deref(), &mut timings)?;
    timings.log_summary();
    Ok(())
}

fn run_combine(args: CombineArgs) -> anyhow::Result<()> {
    let top = resolve_photo(&args.top)?;
    let bottom = resolve_photo(&args.bottom)?;
    let base = if args.fx2500_overrides { OverrideTable::fx2500() } else { OverrideTable::new() };
    let pipeline = RomReadPipeline::new(read_config(&args.classify, base)?);

    let (read, mut timings) = pipeline
        .combine_with_timings(&top, &bottom, args.split_row)
        .with_context(|| format!("combining {} and {}", top.name, bottom.name))?;

    if let Some(path) = &args.disagreements {
        std::fs::write(path, OverrideTable::template(&read.disagreements, &read.raw_bits))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(cells = read.disagreements.len(), path = %path.display(), "Wrote disagreement template");
    }

    emit_dump(&pipeline, &read, args.classify.out.as_deref(), &mut timings)?;
    timings.log_summary();
    Ok(())
}

fn run_feature(args: FeatureArgs) -> anyhow::Result<()> {
    let descriptor = resolve_photo(&args.photo)?;
    let config = ReadConfig::builder().compression(args.compression.into()).build();
    RomReadPipeline::new(config)
        .feature_file(&descriptor, &args.out)
        .with_context(|| format!("writing feature map of {}", descriptor.name))
}

fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let descriptor = resolve_photo(&args.photo)?;
    let photo = Photograph::load(&descriptor).with_context(|| format!("loading {}", descriptor.name))?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let discriminant = ReferenceDiscriminant::train_on_photo(
        &photo,
        args.radius,
        args.normalize,
        args.samples,
        args.threshold,
        &mut rng,
    )?;
    std::fs::write(&args.out, serde_json::to_string_pretty(&discriminant)?)
        .with_context(|| format!("writing {}", args.out.display()))?;
    info!(out = %args.out.display(), threshold = discriminant.threshold, "Saved discriminant");
    Ok(())
}

fn run_presets(json: bool) -> anyhow::Result<()> {
    for descriptor in presets::all() {
        if json {
            println!("{}", descriptor.to_json()?);
        } else {
            println!(
                "{:<12} {}x{}  {}",
                descriptor.name,
                descriptor.width,
                descriptor.height,
                descriptor.path.display()
            );
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Read(args) => run_read(args),
        Commands::Combine(args) => run_combine(args),
        Commands::Feature(args) => run_feature(args),
        Commands::Train(args) => run_train(args),
        Commands::Presets { json } => run_presets(json),
    }
}
