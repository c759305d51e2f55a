//! Start/end point figure
//!
//! Marks the configured sample start and end measurement points on the
//! scan grid, for checking region definitions before a long summing run.

use std::fs;

use anyhow::Context;
use structopt::StructOpt;
use sum_patterns::{render, Config};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "grid-points",
    about = "Plotting configured sample start/end points on the measurement grid"
)]
struct Opt {
    /// Path to the TOML run configuration
    #[structopt(short, long, default_value = "config.toml")]
    config: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let config = Config::load(&opt.config)
        .with_context(|| format!("loading configuration '{}'", opt.config))?;
    let grid = config.scan_grid()?;
    let render_config = render::RenderConfig::default();

    for number in config.experiment_numbers()? {
        let output = config.output_for(number);
        fs::create_dir_all(&output)
            .with_context(|| format!("creating '{}'", output.display()))?;
        let target = output.join(format!("{number}_start-end_points_map.png"));
        render::grid_points(
            &config.grid.start_points,
            &config.grid.end_points,
            (grid.width(), grid.height()),
            &target,
            &render_config,
        )
        .map_err(|err| anyhow::anyhow!("rendering '{}': {err}", target.display()))?;
        println!("Figure saved to: {}", target.display());
    }
    Ok(())
}
