//! Intensity maps
//!
//! Surveys the per-image maximum and average intensity of a pattern
//! series and renders both as colour maps over the measurement grid.

use std::fs;

use anyhow::Context;
use structopt::StructOpt;
use sum_patterns::{list_patterns, render, Config, IntensitySurvey};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "intensity-maps",
    about = "Mapping SXRD pattern intensities over the measurement grid"
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
        let input = config.input_for(number);
        let output = config.output_for(number);
        let listing = list_patterns(&input)?;
        println!(
            "Experiment {number}: {} patterns under '{}'",
            listing.len(),
            input.display()
        );
        fs::create_dir_all(&output)
            .with_context(|| format!("creating '{}'", output.display()))?;

        let survey = IntensitySurvey::of(&listing)?;
        println!(
            "The average intensity of all diffraction pattern images in the series is: {}",
            survey.grand_mean()
        );

        let (max_map, mean_map) = survey.into_grid(&grid)?;
        let max_target = output.join(format!("{number}_MAX_intensity_map.png"));
        render::intensity_map(&max_map, "Maximum Intensity Map", &max_target, &render_config)
            .map_err(|err| anyhow::anyhow!("rendering '{}': {err}", max_target.display()))?;
        println!("Figure saved to: {}", max_target.display());

        let avg_target = output.join(format!("{number}_AVG_intensity_map.png"));
        render::intensity_map(&mean_map, "Average Intensity Map", &avg_target, &render_config)
            .map_err(|err| anyhow::anyhow!("rendering '{}': {err}", avg_target.display()))?;
        println!("Figure saved to: {}", avg_target.display());
    }
    Ok(())
}
