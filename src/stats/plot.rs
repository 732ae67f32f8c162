use std::path::Path;

use anyhow::Result;
use plotters::{
    backend::BitMapBackend,
    chart::ChartBuilder,
    drawing::IntoDrawingArea,
    element::{PathElement, Polygon},
    series::LineSeries,
    style::{Color, IntoFont, Palette, Palette99, BLACK, WHITE},
};

/// A curve over frames, optionally surrounded by a filled band
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: String,
    pub frames: Vec<f64>,
    pub values: Vec<f64>,
    /// Lower and upper bounds of the band
    pub band: Option<(Vec<f64>, Vec<f64>)>,
}

/// One subplot
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub lines: Vec<Line>,
}

const PANEL_SIZE: (u32, u32) = (480, 300);

fn points<'a>(frames: &'a [f64], values: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    frames
        .iter()
        .copied()
        .zip(values.iter().copied())
        .filter(|(_, y)| !y.is_nan())
}

/// Draw `panels` row by row on a `[rows, cols]` grid, y axis in `[0, 1]`, and save a PNG
///
/// Lines share their color across panels by position.
pub fn draw_panels(path: impl AsRef<Path>, grid: [usize; 2], panels: &[Panel]) -> Result<()> {
    let [rows, cols] = grid.map(|n| n.max(1));
    let size = (PANEL_SIZE.0 * cols as u32, PANEL_SIZE.1 * rows as u32);
    let root = BitMapBackend::new(path.as_ref(), size).into_drawing_area();
    root.fill(&WHITE)?;

    for (area, panel) in root.split_evenly((rows, cols)).iter().zip(panels) {
        let max_frame = panel
            .lines
            .iter()
            .flat_map(|line| line.frames.iter().copied())
            .fold(0.0, f64::max)
            .max(1.0);

        let mut chart = ChartBuilder::on(area)
            .caption(&panel.title, ("sans-serif", 16).into_font())
            .margin(8)
            .x_label_area_size(25)
            .y_label_area_size(35)
            .build_cartesian_2d(0.0..max_frame, 0.0..1.0)?;
        chart
            .configure_mesh()
            .x_labels(4)
            .y_labels(5)
            .x_label_formatter(&|x| format!("{:.1e}", x))
            .draw()?;

        for (i, line) in panel.lines.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();

            if let Some((low, high)) = &line.band {
                let mut outline = points(&line.frames, low).collect::<Vec<_>>();
                let upper = points(&line.frames, high).collect::<Vec<_>>();
                outline.extend(upper.into_iter().rev());
                chart.draw_series(std::iter::once(Polygon::new(
                    outline,
                    color.mix(0.3).filled(),
                )))?;
            }

            chart
                .draw_series(LineSeries::new(points(&line.frames, &line.values), &color))?
                .label(line.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], &color));
        }

        chart
            .configure_series_labels()
            .label_font(("sans-serif", 10).into_font())
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
