//! Background subtraction pass
//!
//! Subtracts a scaled reference pattern from every image of a series,
//! one output per input. Each corrected image is written independently,
//! so a failure partway through a series leaves the earlier outputs
//! intact.

use std::fs;

use anyhow::Context;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use structopt::StructOpt;
use sum_patterns::{list_patterns, subtract, Config, Pattern, Subtraction};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "subtract-background",
    about = "Subtracting a scaled background reference from SXRD pattern series"
)]
struct Opt {
    /// Path to the TOML run configuration
    #[structopt(short, long, default_value = "config.toml")]
    config: String,
    /// Render a diagnostic panel of the last (input, reference, output)
    /// triple (requires the `plot` feature)
    #[structopt(long)]
    panel: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let config = Config::load(&opt.config)
        .with_context(|| format!("loading configuration '{}'", opt.config))?;
    let reference_path = config.reference()?;
    let reference = Pattern::read(&reference_path)
        .with_context(|| format!("loading reference '{}'", reference_path.display()))?;
    let subtraction = Subtraction::new(&reference, config.multiplier());

    let mut failures = 0usize;
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

        let experiment = number.to_string();
        let pb = ProgressBar::new(listing.len() as u64);
        failures += listing
            .par_iter()
            .progress_with(pb)
            .map(|path| {
                let corrected = Pattern::read(path).map_err(Into::into).and_then(|p| {
                    subtraction
                        .apply(&p)
                        .map_err(sum_patterns::Error::from)
                });
                match corrected {
                    Ok(corrected) => {
                        let target = subtract::output_path(&output, &experiment, path);
                        match corrected.write(&target) {
                            Ok(()) => {
                                log::info!("written '{}'", target.display());
                                0
                            }
                            Err(err) => {
                                log::error!("{}: {err}", target.display());
                                1
                            }
                        }
                    }
                    Err(err) => {
                        log::error!("{}: {err}", path.display());
                        1
                    }
                }
            })
            .sum::<usize>();

        if opt.panel {
            render_panel(&subtraction, &listing, &output, &experiment, &config)?;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} image(s) failed");
    }
    Ok(())
}

#[cfg(feature = "plot")]
fn render_panel(
    subtraction: &Subtraction,
    listing: &[std::path::PathBuf],
    output: &std::path::Path,
    experiment: &str,
    config: &Config,
) -> anyhow::Result<()> {
    let Some(last) = listing.last() else {
        return Ok(());
    };
    let input = Pattern::read(last)?;
    let reference = Pattern::read(config.reference()?)?;
    let corrected = subtraction.apply(&input)?;
    let v_max = config.intensity_max().unwrap_or(input.max());
    let target = output.join(format!("{experiment}_subtracted_panel.png"));
    sum_patterns::render::subtraction_panels(
        &input,
        &reference,
        &corrected,
        (0, v_max),
        &target,
    )
    .map_err(|err| anyhow::anyhow!("rendering '{}': {err}", target.display()))?;
    println!("Figure saved to: {}", target.display());
    Ok(())
}

#[cfg(not(feature = "plot"))]
fn render_panel(
    _subtraction: &Subtraction,
    _listing: &[std::path::PathBuf],
    _output: &std::path::Path,
    _experiment: &str,
    _config: &Config,
) -> anyhow::Result<()> {
    log::warn!("--panel requires a build with the `plot` feature");
    Ok(())
}
