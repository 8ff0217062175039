/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum number of (frame, channel) slices to resample in parallel.
pub const PARALLEL_SLICE_THRESHOLD: usize = 4;

/// File extensions recognised as multi-page image stacks (lowercase).
pub const STACK_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// Default post-rescale normalization cutoff.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default channel pair compared by both analyses.
pub const DEFAULT_CHANNELS: [usize; 2] = [0, 1];

/// Default number of k-means clusters per channel (also the ICA top-K).
pub const DEFAULT_NUM_CLUSTERS: usize = 10;

/// Default centroid matching cutoff, in pixels.
pub const DEFAULT_MAX_DIST: f64 = 20.0;

/// Number of k-means restarts; the lowest-inertia fit wins.
pub const DEFAULT_KMEANS_RESTARTS: usize = 10;

/// Upper bound on Lloyd iterations per k-means restart.
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 300;

/// Largest centroid shift (pixels, squared sum) still counted as movement.
pub const DEFAULT_KMEANS_TOLERANCE: f64 = 1e-4;

/// Marker circle radius, in pixels, of the rendered annotations.
pub const MARKER_RADIUS: i32 = 5;

/// Prefix of the per-run output subdirectory.
pub const RUN_DIR_PREFIX: &str = "coloc_output_";

/// Name of the per-run report written next to the renderings.
pub const SUMMARY_FILE_NAME: &str = "summary.toml";
