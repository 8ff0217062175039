use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use coloc_core::io::LoaderConfig;
use coloc_core::preprocess::FrameStore;

#[derive(Args)]
pub struct InfoArgs {
    /// Input TIFF stack
    pub file: PathBuf,

    /// Group this many consecutive grayscale pages into one frame
    #[arg(long)]
    pub channels_per_frame: Option<usize>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let loader = LoaderConfig {
        channels_per_frame: args.channels_per_frame,
    };
    let store = FrameStore::open(&args.file, &loader)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let info = store
        .info()
        .context("stack was loaded without source metadata")?;

    println!("File:        {}", info.filename.display());
    println!("Frames:      {}", info.total_frames);
    println!("Channels:    {}", info.channels);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bit depth:   {}", info.bit_depth);
    if info.width != info.height {
        let side = info.width.min(info.height);
        println!("Square:      no (analysis resamples to {side}x{side})");
    }

    let samples = info.total_frames * info.channels * info.width as usize * info.height as usize;
    let total_mb = (samples * info.bit_depth as usize / 8) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
