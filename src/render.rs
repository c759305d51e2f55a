//! Rendering collaborator for intensity maps and pattern previews
//!
//! Consumes the raw arrays and `(v_min, v_max)` pairs the aggregation
//! core exposes. All styling travels in an explicit [`RenderConfig`];
//! nothing here touches process-wide state.

use std::{error::Error, path::Path};

use plotters::prelude::*;

use crate::{intensity::GridMap, pattern::Pattern};

/// Stateless figure styling, passed explicitly to every render call
#[derive(Clone, Copy)]
pub struct RenderConfig {
    pub gradient: colorous::Gradient,
    /// Figure size in pixels for map renders
    pub size: (u32, u32),
    pub label_size: u32,
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            gradient: colorous::REDS,
            size: (1600, 800),
            label_size: 24,
        }
    }
}

fn gradient_color(gradient: &colorous::Gradient, value: f64, (lo, hi): (f64, f64)) -> RGBColor {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0f64, 1f64)
    } else {
        0f64
    };
    let c = gradient.eval_continuous(t);
    RGBColor(c.r, c.g, c.b)
}

/// Draws a scalar field over the scan grid as a colour map
///
/// One cell per measurement point, Y increasing downwards to match the
/// acquisition raster.
pub fn intensity_map<P: AsRef<Path>>(
    map: &GridMap,
    title: &str,
    path: P,
    config: &RenderConfig,
) -> Result<(), Box<dyn Error>> {
    let (width, height) = (map.grid().width(), map.grid().height());
    let range = map.range();

    let plot = BitMapBackend::new(path.as_ref(), config.size).into_drawing_area();
    plot.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&plot)
        .caption(title, ("sans-serif", config.label_size + 8))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..width as f64, height as f64..0f64)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("X")
        .y_desc("Y")
        .label_style(("sans-serif", config.label_size))
        .draw()?;
    chart.draw_series((0..height).flat_map(|y| {
        (0..width).map(move |x| (x, y))
    }).map(|(x, y)| {
        let color = gradient_color(&config.gradient, map.at(x, y), range);
        Rectangle::new(
            [(x as f64, y as f64), (x as f64 + 1f64, y as f64 + 1f64)],
            color.filled(),
        )
    }))?;
    plot.present()?;
    Ok(())
}

/// Marks the configured sample start and end points on the grid
pub fn grid_points<P: AsRef<Path>>(
    start_points: &[(u32, u32)],
    end_points: &[(u32, u32)],
    grid_shape: (u32, u32),
    path: P,
    config: &RenderConfig,
) -> Result<(), Box<dyn Error>> {
    let (width, height) = grid_shape;
    let plot = BitMapBackend::new(path.as_ref(), config.size).into_drawing_area();
    plot.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&plot)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..width as f64, height as f64..0f64)?;
    chart
        .configure_mesh()
        .x_desc("X")
        .y_desc("Y")
        .label_style(("sans-serif", config.label_size))
        .draw()?;
    chart.draw_series(
        start_points
            .iter()
            .chain(end_points)
            .map(|&(x, y)| Cross::new((x as f64, y as f64), 8, RED.stroke_width(2))),
    )?;
    plot.present()?;
    Ok(())
}

/// Grayscale preview of a single pattern, clamped to `(v_min, v_max)`
pub fn pattern_image<P: AsRef<Path>>(
    pattern: &Pattern,
    (v_min, v_max): (i32, i32),
    path: P,
) -> Result<(), Box<dyn Error>> {
    let plot =
        BitMapBackend::new(path.as_ref(), pattern.shape()).into_drawing_area();
    fill_grayscale(&plot, pattern, (v_min, v_max))?;
    plot.present()?;
    Ok(())
}

/// Optional subtraction diagnostic: input, reference and output side
/// by side, requested explicitly rather than drawn on every pass
pub fn subtraction_panels<P: AsRef<Path>>(
    input: &Pattern,
    reference: &Pattern,
    output: &Pattern,
    (v_min, v_max): (i32, i32),
    path: P,
) -> Result<(), Box<dyn Error>> {
    let (width, height) = input.shape();
    let plot =
        BitMapBackend::new(path.as_ref(), (width * 3, height)).into_drawing_area();
    let panels = plot.split_evenly((1, 3));
    for (panel, pattern) in panels.iter().zip([input, reference, output]) {
        fill_grayscale(panel, pattern, (v_min, v_max))?;
    }
    plot.present()?;
    Ok(())
}

fn fill_grayscale<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    pattern: &Pattern,
    (v_min, v_max): (i32, i32),
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let span = (v_max - v_min).max(1) as f64;
    let data = pattern.data();
    for y in 0..pattern.height() {
        for x in 0..pattern.width() {
            let value = data[(x + y * pattern.width()) as usize];
            let t = ((value - v_min) as f64 / span).clamp(0f64, 1f64);
            let g = (t * 255f64) as u8;
            area.draw_pixel((x as i32, y as i32), &RGBColor(g, g, g))?;
        }
    }
    Ok(())
}
