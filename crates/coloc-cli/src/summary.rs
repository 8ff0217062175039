use std::path::Path;

use coloc_core::pipeline::config::ColocConfig;
use coloc_core::pipeline::RunSummary;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_config(config: &ColocConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Colocalization Run"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(18)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    match config.mode() {
        Ok(mode) => println!("  {:<14}{}", s.label.apply_to("Mode"), s.method.apply_to(mode)),
        Err(_) => println!(
            "  {:<14}{}",
            s.label.apply_to("Mode"),
            s.disabled.apply_to("nothing selected")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Channels"),
        s.value.apply_to(format!("{} vs {}", config.channels[0], config.channels[1]))
    );
    println!();

    println!("  {}", s.header.apply_to("Normalization"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(config.threshold)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scope"),
        s.value.apply_to(config.normalize_scope)
    );
    println!();

    if config.ica.enabled {
        println!("  {}", s.header.apply_to("Intensity Correlation"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Top K"),
            s.value.apply_to(config.ica_top_k())
        );
    } else {
        println!(
            "  {:<24}{}",
            s.header.apply_to("Intensity Correlation"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    if config.kmeans.enabled {
        let km = &config.kmeans;
        println!("  {}", s.header.apply_to("K-Means Matching"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Clusters"),
            s.value.apply_to(km.num_clusters)
        );
        let dist = match (km.max_dist_microns, km.pixel_size_microns) {
            (Some(um), Some(px)) => format!("{um} \u{b5}m ({px} \u{b5}m/px)"),
            _ => format!("{} px", km.max_dist),
        };
        println!("    {:<12}{}", s.label.apply_to("Max Dist"), s.value.apply_to(dist));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Restarts"),
            s.value.apply_to(km.fit.n_init)
        );
        if let Some(seed) = km.fit.seed {
            println!("    {:<12}{}", s.label.apply_to("Seed"), s.value.apply_to(seed));
        }
    } else {
        println!(
            "  {:<24}{}",
            s.header.apply_to("K-Means Matching"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();
}

pub fn print_run_result(summary: &RunSummary, dir: Option<&Path>) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!("{} ({}x{})", summary.frames, summary.side, summary.side))
    );
    let pairs: usize = summary.per_frame.iter().filter_map(|f| f.pairs).sum();
    if summary.max_dist.is_some() {
        println!("  {:<14}{}", s.label.apply_to("Pairs"), s.value.apply_to(pairs));
    }
    if summary.degenerate_channels > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Constant"),
            s.warning.apply_to(format!(
                "{} channel slice(s) left unnormalized",
                summary.degenerate_channels
            ))
        );
    }
    if !summary.frames_without_pairs.is_empty() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("No pairs"),
            s.warning.apply_to(format!("frames {:?}", summary.frames_without_pairs))
        );
    }
    if let Some(dir) = dir {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Saved to"),
            s.path.apply_to(dir.display())
        );
    }
    println!();
}
