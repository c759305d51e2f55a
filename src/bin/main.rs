use anyhow::Context;
use structopt::StructOpt;
use sum_patterns::{CancelToken, Config, GridAverage, MissingPolicy, SeriesAverage};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sum-patterns",
    about = "Summing SXRD diffraction pattern images over a measurement grid"
)]
struct Opt {
    /// Path to the TOML run configuration
    #[structopt(short, long, default_value = "config.toml")]
    config: String,
    /// Average the entire image series instead of per-sample grid regions
    #[structopt(long)]
    series: bool,
    /// Abort a sample when a resolved index has no matching image file
    /// instead of skipping it
    #[structopt(long)]
    strict: bool,
    /// Write a grayscale preview PNG next to each summed image
    /// (requires the `plot` feature)
    #[structopt(long)]
    preview: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let config = Config::load(&opt.config)
        .with_context(|| format!("loading configuration '{}'", opt.config))?;
    let grid = config.scan_grid()?;
    let samples = config.samples(&grid)?;
    let missing = if opt.strict {
        MissingPolicy::Fail
    } else {
        MissingPolicy::Skip
    };
    let cancel = CancelToken::new();

    let mut failures = 0usize;
    for number in config.experiment_numbers()? {
        println!("Experiment {number}:");
        if opt.series {
            match SeriesAverage::new()
                .input_dir(config.input_for(number))
                .output_root(config.output_for(number))
                .experiment(number.to_string())
                .cancel_token(cancel.clone())
                .run()
            {
                Ok(report) => {
                    println!(
                        " - {} images averaged into '{}'",
                        report.averaged.sources.len(),
                        report.image.display()
                    );
                    if opt.preview {
                        write_preview(&report.image, &config)?;
                    }
                }
                Err(err) => {
                    failures += 1;
                    log::error!("experiment {number}: {err}");
                }
            }
        } else {
            let outcomes = GridAverage::new(grid)
                .samples(samples.clone())
                .input_dir(config.input_for(number))
                .output_root(config.output_for(number))
                .experiment(number.to_string())
                .missing(missing)
                .cancel_token(cancel.clone())
                .run()?;
            for outcome in outcomes {
                match outcome.result {
                    Ok(report) => {
                        println!(
                            " - sample {}: {} images averaged into '{}'",
                            report.id,
                            report.contributors,
                            report.image.display()
                        );
                        if opt.preview {
                            write_preview(&report.image, &config)?;
                        }
                    }
                    Err(err) => {
                        failures += 1;
                        log::error!("sample {}: {err}", outcome.id);
                    }
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} aggregation(s) failed");
    }
    Ok(())
}

#[cfg(feature = "plot")]
fn write_preview(image: &std::path::Path, config: &Config) -> anyhow::Result<()> {
    let pattern = sum_patterns::Pattern::read(image)?;
    let v_max = config.intensity_max().unwrap_or(pattern.max());
    let target = image.with_extension("png");
    sum_patterns::render::pattern_image(&pattern, (0, v_max), &target)
        .map_err(|err| anyhow::anyhow!("rendering '{}': {err}", target.display()))?;
    println!("Figure saved to: {}", target.display());
    Ok(())
}

#[cfg(not(feature = "plot"))]
fn write_preview(_image: &std::path::Path, _config: &Config) -> anyhow::Result<()> {
    log::warn!("--preview requires a build with the `plot` feature");
    Ok(())
}
