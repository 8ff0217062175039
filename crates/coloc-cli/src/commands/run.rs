use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use coloc_core::io::LoaderConfig;
use coloc_core::pipeline::config::ColocConfig;
use coloc_core::pipeline::params::ParamRecord;
use coloc_core::pipeline::{Orchestrator, PipelineStage, PngSink, ProgressReporter};
use coloc_core::preprocess::{NormalizeScope, Threshold};
use indicatif::{ProgressBar, ProgressStyle};

use crate::summary::{print_run_config, print_run_result};

#[derive(Args)]
pub struct RunArgs {
    /// Input TIFF stack
    #[arg(required_unless_present_any = ["config", "params"])]
    pub file: Option<PathBuf>,

    /// Run config file (TOML); replaces every other option
    #[arg(long, conflicts_with = "params")]
    pub config: Option<PathBuf>,

    /// Flat parameter record (TOML) with in_path, out_path, num_clusts,
    /// min_dist and "Run ..." Y/N flags
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Existing directory that receives the run subdirectory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Cutoff in (0, 1) applied after rescaling, or "off"
    #[arg(long, default_value = "0.5")]
    pub threshold: String,

    /// The two channels to compare, comma-separated
    #[arg(long, value_delimiter = ',', default_value = "0,1")]
    pub channels: Vec<usize>,

    /// Share one min/max per channel across all frames
    #[arg(long)]
    pub per_channel: bool,

    /// Group this many consecutive grayscale pages into one frame
    #[arg(long)]
    pub channels_per_frame: Option<usize>,

    /// Number of strongest ICA pixels to mark (defaults to --num-clusters)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Clusters fitted per channel
    #[arg(long, default_value = "10")]
    pub num_clusters: usize,

    /// Pairing cutoff in pixels (exclusive)
    #[arg(long, default_value = "20")]
    pub max_dist: f64,

    /// Pairing cutoff in microns; needs --pixel-size
    #[arg(long, requires = "pixel_size")]
    pub max_dist_microns: Option<f64>,

    /// Pixel pitch in microns
    #[arg(long)]
    pub pixel_size: Option<f64>,

    /// k-means restarts
    #[arg(long, default_value = "10")]
    pub restarts: usize,

    /// Seed for reproducible clustering
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip intensity correlation analysis
    #[arg(long)]
    pub no_ica: bool,

    /// Skip k-means matching
    #[arg(long)]
    pub no_kmeans: bool,
}

/// Drives an indicatif bar from pipeline stage events.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(1);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.set_message(stage.to_string());
        self.bar.set_length(total_items.unwrap_or(1) as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid {what} {}", path.display()))
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref path) = args.config {
        read_toml::<ColocConfig>(path, "run config")?
    } else if let Some(ref path) = args.params {
        let record: ParamRecord = read_toml(path, "parameter record")?;
        ColocConfig::try_from(record).context("Invalid parameter record")?
    } else {
        build_config_from_args(args)?
    };

    print_run_config(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let mut orchestrator = Orchestrator::new(config.clone())?.with_reporter(reporter.clone());
    let mut sink = PngSink::create(&config.output)
        .with_context(|| format!("Invalid output directory {}", config.output.display()))?;

    let summary = orchestrator.run(&mut sink)?;
    reporter.bar.finish_with_message("Done");

    print_run_result(&summary, sink.dir());
    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> Result<ColocConfig> {
    let Some(ref input) = args.file else {
        bail!("an input stack is required without --config or --params");
    };
    let channels: [usize; 2] = match args.channels.as_slice() {
        &[a, b] => [a, b],
        other => bail!("--channels takes exactly two indices, got {}", other.len()),
    };

    let mut config = ColocConfig::new(input.clone(), args.output.clone());
    config.threshold = Threshold::parse(&args.threshold)?;
    config.channels = channels;
    if args.per_channel {
        config.normalize_scope = NormalizeScope::PerChannel;
    }
    config.loader = LoaderConfig {
        channels_per_frame: args.channels_per_frame,
    };
    config.ica.enabled = !args.no_ica;
    config.ica.top_k = args.top_k;
    config.kmeans.enabled = !args.no_kmeans;
    config.kmeans.num_clusters = args.num_clusters;
    config.kmeans.max_dist = args.max_dist;
    config.kmeans.max_dist_microns = args.max_dist_microns;
    config.kmeans.pixel_size_microns = args.pixel_size;
    config.kmeans.fit.n_init = args.restarts;
    config.kmeans.fit.seed = args.seed;
    Ok(config)
}
