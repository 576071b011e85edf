use log::{info, warn};
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;
use tumor_common::SeriesRecord;

/// Population curves on a log axis: scaled tumor and necrotic counts per step.
pub fn plot_population(series: &[SeriesRecord], out_path: &Path) -> Result<(), Box<dyn Error>> {
    let positive = |v: f64| v > 0.0;
    let y_values = series
        .iter()
        .flat_map(|r| [r.tumor_cells, r.necrotic_cells])
        .filter(|&v| positive(v));
    let (y_min, y_max) = y_values.fold((f64::INFINITY, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !y_min.is_finite() {
        warn!("No positive population values; skipping {}.", out_path.display());
        return Ok(());
    }
    let (x_min, x_max) = step_range(series);

    let root = SVGBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Tumor Population", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, ((y_min * 0.5)..(y_max * 2.0)).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("step")
        .y_desc("cells")
        .y_label_formatter(&|v| format!("{:.1e}", v))
        .draw()?;

    let tumor = series
        .iter()
        .filter(|r| positive(r.tumor_cells))
        .map(|r| (r.step as f64, r.tumor_cells));
    chart
        .draw_series(LineSeries::new(tumor, RED))?
        .label("tumor")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    let necrotic = series
        .iter()
        .filter(|r| positive(r.necrotic_cells))
        .map(|r| (r.step as f64, r.necrotic_cells));
    chart
        .draw_series(LineSeries::new(necrotic, BLACK))?
        .label("necrotic")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("Population plot saved to {}", out_path.display());
    Ok(())
}

/// Relative growth rate per step with a zero reference line.
pub fn plot_growth_rate(series: &[SeriesRecord], out_path: &Path) -> Result<(), Box<dyn Error>> {
    if series.is_empty() {
        warn!("Empty series; skipping {}.", out_path.display());
        return Ok(());
    }
    let (x_min, x_max) = step_range(series);
    let mut y_abs = series.iter().map(|r| r.growth_rate.abs()).fold(0.0f64, f64::max);
    y_abs = y_abs.max(1e-4);

    let root = SVGBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Tumor Growth Rate", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, (-y_abs * 1.1)..(y_abs * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("step")
        .y_desc("relative change")
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x_min, 0.0), (x_max, 0.0)],
        BLACK.mix(0.4),
    )))?;
    chart.draw_series(LineSeries::new(
        series.iter().map(|r| (r.step as f64, r.growth_rate)),
        BLUE,
    ))?;

    root.present()?;
    info!("Growth-rate plot saved to {}", out_path.display());
    Ok(())
}

fn step_range(series: &[SeriesRecord]) -> (f64, f64) {
    let first = series.first().map_or(0.0, |r| r.step as f64);
    let last = series.last().map_or(1.0, |r| r.step as f64);
    if last > first {
        (first, last)
    } else {
        (first, first + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_series_gets_a_nonempty_axis() {
        let rows = [SeriesRecord { step: 7, tumor_cells: 1.0, necrotic_cells: 0.0, growth_rate: 0.0 }];
        assert_eq!(step_range(&rows), (7.0, 8.0));
        assert_eq!(step_range(&[]), (0.0, 1.0));
    }
}
